//! Telemetry queue between the reader thread and the station
//!
//! Unbounded FIFO with a single producer and a single consumer. Enqueue never
//! blocks; the consumer checks `len` before draining a full scan cycle.

use crate::protocol::TelemetryRecord;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Create a connected sender/receiver pair
pub fn telemetry_queue() -> (TelemetrySender, TelemetryReceiver) {
    let (tx, rx) = unbounded();
    (TelemetrySender { tx }, TelemetryReceiver { rx })
}

/// Producer half, owned by the reader thread
#[derive(Clone)]
pub struct TelemetrySender {
    tx: Sender<TelemetryRecord>,
}

impl TelemetrySender {
    /// Enqueue a record, returns false once the consumer is gone
    pub fn push(&self, record: TelemetryRecord) -> bool {
        self.tx.send(record).is_ok()
    }
}

/// Consumer half, owned by the scan aggregator
pub struct TelemetryReceiver {
    rx: Receiver<TelemetryRecord>,
}

impl TelemetryReceiver {
    /// Records currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Dequeue without waiting
    pub fn try_pop(&self) -> Option<TelemetryRecord> {
        self.rx.try_recv().ok()
    }

    /// Dequeue, waiting at most `timeout`
    ///
    /// `None` on timeout or once the producer is gone and the queue is empty.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<TelemetryRecord> {
        match self.rx.recv_timeout(timeout) {
            Ok(record) => Some(record),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Discard everything queued, returns how many records were dropped
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AckToken, EncoderSample, ScanPoint};

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = telemetry_queue();
        let records = [
            TelemetryRecord::Scan(ScanPoint::new(200.0, 1.0)),
            TelemetryRecord::Encoder(EncoderSample::new(1, 2, 3)),
            TelemetryRecord::Ack(AckToken),
            TelemetryRecord::Scan(ScanPoint::new(300.0, 2.0)),
        ];
        for record in records {
            assert!(tx.push(record));
        }

        assert_eq!(rx.len(), 4);
        for expected in records {
            assert_eq!(rx.try_pop(), Some(expected));
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_pop_timeout_on_empty_queue() {
        let (_tx, rx) = telemetry_queue();
        assert_eq!(rx.pop_timeout(Duration::from_millis(5)), None);
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let (tx, rx) = telemetry_queue();
        rx.clear();
        drop(rx);
        assert!(!tx.push(TelemetryRecord::Ack(AckToken)));
    }

    #[test]
    fn test_clear() {
        let (tx, rx) = telemetry_queue();
        for i in 0..10 {
            tx.push(TelemetryRecord::Scan(ScanPoint::new(200.0 + i as f32, 0.0)));
        }
        assert_eq!(rx.clear(), 10);
        assert!(rx.is_empty());
    }
}
