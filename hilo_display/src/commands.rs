use hilo::{Command, Side};
use std::fmt;

/// Help text listing every command the prompt understands.
pub const COMMANDS_HELP: &str = "\
Commands:
  arm TABLE BOX   Arm a box (e.g., 'arm 1 3')
  buyin AMOUNT    Buy in and deal (e.g., 'buyin 100')
  hi | lo | tie   Pick a side
  confirm         Lock in the chosen side
  reset           Start a new round
  help            Show this text
  quit            Exit
";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line.
    Empty,
    /// A required argument was not given.
    MissingArgument { command: &'static str, usage: &'static str },
    /// An argument is not a valid number.
    InvalidNumber(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty command"),
            Self::MissingArgument { command, usage } => {
                write!(f, "'{command}' needs more arguments (e.g., '{usage}')")
            }
            Self::InvalidNumber(value) => write!(f, "'{value}' is not a valid number"),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{cmd}'. Type 'help' to see available commands"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one line of input. Command words are case-insensitive.
///
/// # Examples
///
/// ```
/// use hilo::{Command, Side};
/// use hilo_display::commands::{Input, parse_command};
///
/// assert_eq!(parse_command("HI"), Ok(Input::Command(Command::Choose { side: Side::Hi })));
/// assert_eq!(
///     parse_command("arm 1 3"),
///     Ok(Input::Command(Command::Arm { table_id: 1, box_id: 3 }))
/// );
/// assert_eq!(parse_command("quit"), Ok(Input::Quit));
/// ```
pub fn parse_command(input: &str) -> Result<Input, ParseError> {
    let parts: Vec<&str> = input.split_ascii_whitespace().collect();
    let Some(first) = parts.first() else {
        return Err(ParseError::Empty);
    };

    let command = match first.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" => return Ok(Input::Quit),
        "reset" => Command::Reset,
        "confirm" => Command::Confirm,
        "hi" => Command::Choose { side: Side::Hi },
        "lo" => Command::Choose { side: Side::Lo },
        "tie" => Command::Choose { side: Side::Tie },
        "arm" => match (parts.get(1), parts.get(2)) {
            (Some(table), Some(slot)) => Command::Arm {
                table_id: parse_number(table)?,
                box_id: parse_number(slot)?,
            },
            _ => {
                return Err(ParseError::MissingArgument {
                    command: "arm",
                    usage: "arm 1 3",
                });
            }
        },
        "buyin" => match parts.get(1) {
            Some(amount) => Command::BuyIn {
                amount: parse_number(amount)?,
            },
            None => {
                return Err(ParseError::MissingArgument {
                    command: "buyin",
                    usage: "buyin 100",
                });
            }
        },
        _ => return Err(ParseError::UnrecognizedCommand(input.trim().to_string())),
    };

    Ok(Input::Command(command))
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::InvalidNumber(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_words() {
        assert_eq!(parse_command("reset"), Ok(Input::Command(Command::Reset)));
        assert_eq!(parse_command("confirm"), Ok(Input::Command(Command::Confirm)));
        assert_eq!(parse_command("help"), Ok(Input::Help));
        assert_eq!(parse_command("exit"), Ok(Input::Quit));
    }

    #[test]
    fn test_parse_sides_case_insensitive() {
        assert_eq!(
            parse_command("Lo"),
            Ok(Input::Command(Command::Choose { side: Side::Lo }))
        );
        assert_eq!(
            parse_command("  TIE  "),
            Ok(Input::Command(Command::Choose { side: Side::Tie }))
        );
    }

    #[test]
    fn test_parse_arm() {
        assert_eq!(
            parse_command("arm 2 5"),
            Ok(Input::Command(Command::Arm {
                table_id: 2,
                box_id: 5
            }))
        );
    }

    #[test]
    fn test_parse_arm_missing_box() {
        assert!(matches!(
            parse_command("arm 2"),
            Err(ParseError::MissingArgument { command: "arm", .. })
        ));
    }

    #[test]
    fn test_parse_arm_negative_table() {
        assert_eq!(
            parse_command("arm -1 2"),
            Err(ParseError::InvalidNumber("-1".to_string()))
        );
    }

    #[test]
    fn test_parse_buyin() {
        assert_eq!(
            parse_command("buyin 100"),
            Ok(Input::Command(Command::BuyIn { amount: 100 }))
        );
        // Negative amounts are passed through; the host clamps them.
        assert_eq!(
            parse_command("buyin -5"),
            Ok(Input::Command(Command::BuyIn { amount: -5 }))
        );
    }

    #[test]
    fn test_parse_buyin_invalid() {
        assert_eq!(
            parse_command("buyin lots"),
            Err(ParseError::InvalidNumber("lots".to_string()))
        );
        assert!(matches!(
            parse_command("buyin"),
            Err(ParseError::MissingArgument { command: "buyin", .. })
        ));
    }

    #[test]
    fn test_parse_empty_and_unknown() {
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
        assert_eq!(
            parse_command("fold now"),
            Err(ParseError::UnrecognizedCommand("fold now".to_string()))
        );
    }

    #[test]
    fn test_error_messages() {
        let error = parse_command("dance").unwrap_err();
        assert!(error.to_string().contains("Type 'help'"));
        let error = parse_command("buyin").unwrap_err();
        assert!(error.to_string().contains("buyin 100"));
    }
}
