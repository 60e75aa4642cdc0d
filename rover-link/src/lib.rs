//! RoverLink - serial radio link to a mapping rover
//!
//! This library owns everything between the serial port and typed telemetry:
//!
//! - `protocol`: wire frames (scan point, encoder sample, acknowledgment) and
//!   the incremental decoder with resynchronization
//! - `reader`: the reader thread with stale-input flushing and per-second
//!   link counters
//! - `queue`: FIFO hand-off of decoded records to the consumer
//! - `commands`: outbound commands with acknowledgment tracking and retries
//! - `link`: start handshake, reader lifecycle and stop sequence
//!
//! Serial I/O goes through the `Transport` trait so everything above it runs
//! against `MockTransport` in tests.

pub mod commands;
pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod queue;
pub mod reader;
pub mod transport;

// Re-export commonly used types
pub use commands::{Command, CommandError, CommandProtocol, TickOutcome};
pub use config::{CommandConfig, DriveGeometry, LinkConfig};
pub use error::{Error, Result};
pub use link::{Link, LinkChannels};
pub use protocol::{AckToken, EncoderSample, ScanPoint, TelemetryRecord};
pub use queue::TelemetryReceiver;
pub use reader::LinkStatus;
