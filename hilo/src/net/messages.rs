use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::round::{Command, RoundState};

/// What a connected device is.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Owns the engine; usually also drives the big screen.
    #[serde(alias = "BIG")]
    Host,
    /// Renders state and/or submits player commands.
    #[serde(alias = "TABLE")]
    Display,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Host => "HOST",
            Self::Display => "DISPLAY",
        };
        write!(f, "{repr}")
    }
}

/// A message on the `/ws` connection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum WsMessage {
    /// Sent once by a client right after connecting. Informational only;
    /// the host never acknowledges it.
    Hello {
        role: Role,
        device_id: String,
        #[serde(default)]
        table_id: Option<u32>,
    },
    /// A player command. When `round_id` is set the command is only valid
    /// for that round.
    Cmd {
        #[serde(default)]
        round_id: Option<Uuid>,
        cmd: Command,
    },
    /// The host's current snapshot.
    State { state: RoundState },
}

impl WsMessage {
    #[must_use]
    pub fn hello(role: Role, device_id: impl Into<String>, table_id: Option<u32>) -> Self {
        Self::Hello {
            role,
            device_id: device_id.into(),
            table_id,
        }
    }

    #[must_use]
    pub fn command(cmd: Command) -> Self {
        Self::Cmd {
            round_id: None,
            cmd,
        }
    }

    /// A command bound to a specific round; the host drops it once that
    /// round is over.
    #[must_use]
    pub fn command_for_round(cmd: Command, round_id: Uuid) -> Self {
        Self::Cmd {
            round_id: Some(round_id),
            cmd,
        }
    }

    #[must_use]
    pub fn state(state: RoundState) -> Self {
        Self::State { state }
    }
}

impl fmt::Display for WsMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello {
                role, device_id, ..
            } => write!(f, "hello from {role} {device_id}"),
            Self::Cmd { cmd, .. } => write!(f, "command {cmd}"),
            Self::State { state } => write!(f, "state {} {}", state.round_id, state.stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{Side, Stage};
    use serde_json::json;

    #[test]
    fn test_hello_shape() {
        let msg = WsMessage::hello(Role::Display, "tablet-7", Some(2));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "hello", "role": "DISPLAY", "deviceId": "tablet-7", "tableId": 2})
        );
    }

    #[test]
    fn test_legacy_role_names() {
        let msg: WsMessage =
            serde_json::from_str(r#"{"type":"hello","role":"TABLE","deviceId":"x"}"#).unwrap();
        assert_eq!(msg, WsMessage::hello(Role::Display, "x", None));

        let msg: WsMessage =
            serde_json::from_str(r#"{"type":"hello","role":"BIG","deviceId":"y"}"#).unwrap();
        assert_eq!(msg, WsMessage::hello(Role::Host, "y", None));
    }

    #[test]
    fn test_command_shape() {
        let msg = WsMessage::command(Command::Choose { side: Side::Lo });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "cmd", "roundId": null, "cmd": {"type": "choose", "side": "LO"}})
        );

        let decoded: WsMessage =
            serde_json::from_str(r#"{"type":"cmd","cmd":{"type":"reset"}}"#).unwrap();
        assert_eq!(decoded, WsMessage::command(Command::Reset));
    }

    #[test]
    fn test_state_shape() {
        let state = RoundState::idle(42);
        let value = serde_json::to_value(WsMessage::state(state.clone())).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["state"]["stage"], "IDLE");
        assert_eq!(value["state"]["stageStartedAtMs"], 42);
        assert_eq!(value["state"]["roundId"], state.round_id.to_string());
        assert_eq!(state.stage, Stage::Idle);
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        assert!(serde_json::from_str::<WsMessage>(r#"{"type":"ping"}"#).is_err());
        assert!(
            serde_json::from_str::<WsMessage>(r#"{"type":"cmd","cmd":{"type":"split"}}"#).is_err()
        );
    }
}
