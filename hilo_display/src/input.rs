//! Line input fed from a plain OS thread.
//!
//! A pending `tokio::io::stdin()` read cannot be cancelled and holds up
//! runtime shutdown until Enter is pressed. The reader thread here is
//! detached and dies with the process.

use std::{
    io::{self, BufRead},
    thread,
};

use tokio::sync::mpsc;

/// Lines buffered between the reader thread and the prompt loop.
const LINE_BUFFER: usize = 16;

/// Read `reader` line by line on a new thread. The channel closes on end of
/// input, on a read error, or once the receiver is dropped and the next
/// line arrives.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    let spawned = thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read input: {e}");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        // Dropping the sender closes the channel: no input at all.
        log::error!("Failed to start input thread: {e}");
    }
    rx
}

/// [`spawn_line_reader`] over the process's stdin.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}
