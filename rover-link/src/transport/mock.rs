//! Mock transport for testing
//!
//! Stands in for the robot end of the radio link: tests queue inbound bytes,
//! script replies to outbound command characters and inspect what was sent.

use super::Transport;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// In-memory transport; clones share the same buffers
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    /// Bytes that arrive right after each input clear, one entry per clear
    after_clear: VecDeque<Vec<u8>>,
    /// Inbound bytes produced whenever the trigger byte is written
    replies: Vec<(u8, Vec<u8>)>,
    /// Writes fail as if the port went away
    fail_writes: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Queue data that shows up after the next input clear
    ///
    /// Models a robot that keeps streaming for a while after being told to stop.
    pub fn inject_after_clear(&self, data: &[u8]) {
        self.inner.lock().after_clear.push_back(data.to_vec());
    }

    /// Answer every write containing `trigger` with `reply`
    pub fn reply_to(&self, trigger: u8, reply: &[u8]) {
        self.inner.lock().replies.push((trigger, reply.to_vec()));
    }

    /// Make every following write fail, or succeed again
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Get all written data
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().write_buffer.clone()
    }

    /// Written data as text
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().write_buffer).into_owned()
    }

    /// Clear written data
    pub fn clear_written(&self) {
        self.inner.lock().write_buffer.clear();
    }

    /// Bytes still waiting to be read
    pub fn pending_read(&self) -> usize {
        self.inner.lock().read_buffer.len()
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let count = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
        }
        inner.write_buffer.extend_from_slice(data);

        let mut inbound = Vec::new();
        for (trigger, reply) in &inner.replies {
            if data.contains(trigger) {
                inbound.extend_from_slice(reply);
            }
        }
        inner.read_buffer.extend(inbound);

        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.inner.lock().read_buffer.len())
    }

    fn clear_input(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.read_buffer.clear();
        if let Some(late) = inner.after_clear.pop_front() {
            inner.read_buffer.extend(late);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_drains_in_order() {
        let mock = MockTransport::new();
        mock.inject_read(&[1, 2, 3, 4, 5]);

        let mut port = mock.clone();
        let mut buf = [0u8; 3];
        assert_eq!(port.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(port.available().unwrap(), 2);
    }

    #[test]
    fn test_reply_and_late_data() {
        let mock = MockTransport::new();
        mock.reply_to(b'l', &[0xAA; 4]);
        mock.inject_after_clear(&[0xBB; 2]);

        let mut port = mock.clone();
        port.write(b"l").unwrap();
        assert_eq!(port.available().unwrap(), 4);

        port.clear_input().unwrap();
        assert_eq!(port.available().unwrap(), 2);
        port.clear_input().unwrap();
        assert_eq!(port.available().unwrap(), 0);
        assert_eq!(mock.written_string(), "l");
    }

    #[test]
    fn test_failing_writes() {
        let mock = MockTransport::new();
        let mut port = mock.clone();

        mock.set_fail_writes(true);
        assert!(port.send(b"w182").is_err());
        assert!(mock.written().is_empty());

        mock.set_fail_writes(false);
        port.send(b"w182").unwrap();
        assert_eq!(mock.written_string(), "w182");
    }
}
