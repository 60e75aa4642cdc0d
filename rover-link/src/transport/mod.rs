//! Transport layer for I/O abstraction

use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Transport shared between the reader thread and the command sender
///
/// The radio link is half-duplex, one lock covers both directions.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Transport trait for the radio link
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    ///
    /// Blocks for at most the configured read timeout; a timeout yields `Ok(0)`.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Write the whole buffer and flush it
    fn send(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            data = &data[n..];
        }
        self.flush()
    }

    /// Number of bytes received but not yet read
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }

    /// Discard everything received but not yet read
    fn clear_input(&mut self) -> Result<()>;
}

/// Wrap a transport for sharing across threads
pub fn shared(transport: impl Transport + 'static) -> SharedTransport {
    Arc::new(Mutex::new(Box::new(transport)))
}
