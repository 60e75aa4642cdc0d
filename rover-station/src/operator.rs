//! Operator console on stdin.
//!
//! Lines starting with `/` control the station, everything else is a robot
//! command:
//!
//! | Input | Action |
//! |---|---|
//! | `/quit` | stop the station |
//! | `/restart` | start a new mapping session |
//! | `/save` | write the map image |
//! | `/hold W` | keep sending a drive command (`W`, `A`, `S` or `D`) |
//! | `/release` | stop the held drive command |
//! | `/status` | log link counters and pose |
//! | anything else | sent to the robot |

use crossbeam_channel::{unbounded, Receiver};
use std::io::{self, BufRead};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    Quit,
    Restart,
    Save,
    Hold(char),
    Release,
    Status,
    /// Robot command text
    Command(String),
    /// Console command that could not be understood
    Unknown(String),
}

impl OperatorInput {
    /// Parse one console line, `None` for a blank line
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(console) = line.strip_prefix('/') else {
            return Some(Self::Command(line.to_string()));
        };

        let mut words = console.split_whitespace();
        let input = match (words.next(), words.next()) {
            (Some("quit"), None) => Self::Quit,
            (Some("restart"), None) => Self::Restart,
            (Some("save"), None) => Self::Save,
            (Some("release"), None) => Self::Release,
            (Some("status"), None) => Self::Status,
            (Some("hold"), Some(drive)) => {
                let mut chars = drive.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Hold(c),
                    _ => Self::Unknown(line.to_string()),
                }
            }
            _ => Self::Unknown(line.to_string()),
        };
        Some(input)
    }
}

/// Read stdin lines on a background thread
///
/// The thread only parses and forwards; it ends at end of input or once the
/// receiver is dropped.
pub fn spawn_console() -> io::Result<Receiver<OperatorInput>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("operator-console".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if let Some(input) = OperatorInput::parse(&line) {
                    if tx.send(input).is_err() {
                        break;
                    }
                }
            }
            log::debug!("Operator console closed");
        })?;
    Ok(rx)
}
