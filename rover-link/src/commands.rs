//! Outbound command protocol
//!
//! Operator input is a single command character, optionally followed by a
//! decimal argument. Two families exist:
//!
//! - **Value commands** (`v`, `w`, `s`, `a`, `d` by default) carry a number and
//!   expect exactly one acknowledgment token from the robot. Distances and
//!   angles are converted to wheel encoder ticks before sending.
//! - **Simple commands** are a single character, fire-and-forget.
//!
//! # State machine
//!
//! ```text
//! Idle ──submit value──▶ Sent ──ack──▶ Acked ──▶ Idle
//!                         │
//!                         └─ no ack: resend each tick, after
//!                            max_resends the next tick abandons ──▶ Idle
//! ```
//!
//! A drive command held by the operator (one of `WASD`) is re-sent on every
//! command tick that has no resend to do, which keeps the robot moving.

use crate::config::{CommandConfig, DriveGeometry};
use crate::error::Result;
use crate::protocol::AckToken;
use crate::transport::SharedTransport;
use crossbeam_channel::Receiver;
use std::time::Instant;

/// Operator command rejected before transmission
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("'{command}' needs a numeric argument")]
    MissingArgument { command: char },

    #[error("'{command}' argument '{argument}' is not a number")]
    InvalidArgument { command: char, argument: String },
}

/// How a value command's argument is turned into wire units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Motor speed, sent as given
    Velocity,
    /// Millimeters, sent as encoder ticks
    Linear,
    /// Degrees, sent as encoder ticks
    Angular,
}

/// A command that expects an acknowledgment
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCommand {
    pub command: char,
    pub kind: ValueKind,
    pub argument: f64,
}

impl ValueCommand {
    /// Outbound text without line ending, e.g. `w182`
    pub fn wire_text(&self, drive: &DriveGeometry) -> String {
        match self.kind {
            ValueKind::Velocity => format!("{}{}", self.command, format_number(self.argument)),
            ValueKind::Linear => {
                let ticks = (drive.mm_to_ticks() as f64 * self.argument).trunc() as i64;
                format!("{}{}", self.command, ticks)
            }
            ValueKind::Angular => {
                let ticks = (drive.deg_to_ticks() as f64 * self.argument).trunc() as i64;
                format!("{}{}", self.command, ticks)
            }
        }
    }
}

/// Parsed operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Value(ValueCommand),
    Simple(char),
}

impl Command {
    /// Parse operator text
    ///
    /// Value commands need a numeric argument. For simple commands anything
    /// after the first character is ignored.
    pub fn parse(text: &str, config: &CommandConfig) -> std::result::Result<Self, CommandError> {
        let text = text.trim();
        let mut chars = text.chars();
        let command = chars.next().ok_or(CommandError::Empty)?;

        let kind = if config.velocity_commands.contains(command) {
            ValueKind::Velocity
        } else if config.linear_commands.contains(command) {
            ValueKind::Linear
        } else if config.angular_commands.contains(command) {
            ValueKind::Angular
        } else {
            return Ok(Command::Simple(command));
        };

        let argument = chars.as_str().trim();
        if argument.is_empty() {
            return Err(CommandError::MissingArgument { command });
        }
        let value: f64 = argument
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| CommandError::InvalidArgument {
                command,
                argument: argument.to_string(),
            })?;

        Ok(Command::Value(ValueCommand {
            command,
            kind,
            argument: value,
        }))
    }
}

/// Integral values without a fractional part, others as given
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Acknowledgment tracking for the last value command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandState {
    pub pending: Option<ValueCommand>,
    pub sent: bool,
    pub acked: bool,
    pub retry_count: u32,
}

impl CommandState {
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result of one command tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing to send
    Idle,
    /// Pending command resent, with the retry count after this send
    Resent { command: char, retry: u32 },
    /// Pending command acknowledged and cleared
    Acked { command: char },
    /// Pending command given up after exhausting its resends
    Abandoned { command: char },
    /// Held drive command sent
    DriveSent { command: char },
    /// Something was due but the last send was too recent
    Throttled,
}

/// Sends operator commands and tracks their acknowledgment
pub struct CommandProtocol {
    port: SharedTransport,
    config: CommandConfig,
    drive: DriveGeometry,
    acks: Receiver<AckToken>,
    state: CommandState,
    held_drive: Option<char>,
    last_send: Option<Instant>,
}

impl CommandProtocol {
    pub fn new(
        port: SharedTransport,
        config: CommandConfig,
        drive: DriveGeometry,
        acks: Receiver<AckToken>,
    ) -> Self {
        Self {
            port,
            config,
            drive,
            acks,
            state: CommandState::default(),
            held_drive: None,
            last_send: None,
        }
    }

    pub fn state(&self) -> &CommandState {
        &self.state
    }

    pub fn held_drive(&self) -> Option<char> {
        self.held_drive
    }

    /// Parse and send operator text right away
    ///
    /// A value command becomes the pending command, replacing any previous
    /// one. Rejected input is never transmitted.
    pub fn submit(&mut self, text: &str, now: Instant) -> Result<Command> {
        let command = Command::parse(text, &self.config)?;
        match &command {
            Command::Value(value) => {
                let wire = value.wire_text(&self.drive);
                if let Some(previous) = &self.state.pending {
                    log::debug!("Replacing unacknowledged '{}'", previous.command);
                }
                self.transmit(&wire, now)?;
                self.state = CommandState {
                    pending: Some(value.clone()),
                    sent: true,
                    acked: false,
                    retry_count: 0,
                };
                log::info!("Sent {}", wire);
            }
            Command::Simple(c) => {
                self.transmit(&c.to_string(), now)?;
                log::debug!("Sent {}", c);
            }
        }
        Ok(command)
    }

    /// Mark the pending command acknowledged
    pub fn acknowledge(&mut self) {
        if self.state.sent {
            self.state.acked = true;
        } else {
            log::debug!("Acknowledgment with no command pending");
        }
    }

    /// Start auto-sending a drive command, false if it is not one
    pub fn hold_drive(&mut self, command: char) -> bool {
        if self.config.drive_commands.contains(command) {
            self.held_drive = Some(command);
            true
        } else {
            false
        }
    }

    pub fn release_drive(&mut self) {
        self.held_drive = None;
    }

    /// One command tick: resend, settle or auto-drive
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        while self.acks.try_recv().is_ok() {
            self.acknowledge();
        }

        if let Some(pending) = self.state.pending.clone() {
            if self.state.acked {
                self.state.reset();
                log::debug!("'{}' acknowledged", pending.command);
                return Ok(TickOutcome::Acked {
                    command: pending.command,
                });
            }

            if self.state.retry_count >= self.config.max_resends {
                self.state.reset();
                log::warn!(
                    "'{}' abandoned after {} resends without acknowledgment",
                    pending.command,
                    self.config.max_resends
                );
                return Ok(TickOutcome::Abandoned {
                    command: pending.command,
                });
            }

            if self.throttled(now) {
                return Ok(TickOutcome::Throttled);
            }
            self.transmit(&pending.wire_text(&self.drive), now)?;
            self.state.retry_count += 1;
            return Ok(TickOutcome::Resent {
                command: pending.command,
                retry: self.state.retry_count,
            });
        }

        if let Some(command) = self.held_drive {
            if self.throttled(now) {
                return Ok(TickOutcome::Throttled);
            }
            self.transmit(&command.to_string(), now)?;
            return Ok(TickOutcome::DriveSent { command });
        }

        Ok(TickOutcome::Idle)
    }

    fn throttled(&self, now: Instant) -> bool {
        self.last_send
            .is_some_and(|last| now.saturating_duration_since(last) < self.config.min_send_interval())
    }

    fn transmit(&mut self, text: &str, now: Instant) -> Result<()> {
        let mut line = String::with_capacity(text.len() + self.config.line_ending.len());
        line.push_str(text);
        line.push_str(&self.config.line_ending);

        self.port.lock().send(line.as_bytes())?;
        self.last_send = Some(now);
        Ok(())
    }
}
