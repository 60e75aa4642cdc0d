//! Reader thread for the radio link
//!
//! Owns the inbound half of the link: bounded-wait reads, stale input
//! flushing, frame decoding and record routing. Scan points and encoder
//! samples go to the telemetry queue, acknowledgment tokens to their own
//! channel so the command protocol sees them without touching the queue.
//!
//! # Backpressure
//!
//! If the transport holds more than `stale_frames` frames worth of unread
//! bytes, the data is too old to be useful for mapping: the input is flushed
//! and the dropped frames are counted as `lagged`.

use crate::config::WireConfig;
use crate::error::Result;
use crate::protocol::{AckToken, Decoded, PacketDecoder, TelemetryRecord, SCAN_FRAME_LEN};
use crate::queue::TelemetrySender;
use crate::transport::{SharedTransport, Transport};
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Largest single read
const READ_CHUNK: usize = 256;

/// Link health counters
///
/// The reader increments the current-second counters; `roll` publishes them
/// as the last completed second and starts over.
#[derive(Debug, Default)]
pub struct LinkCounters {
    lagged: AtomicU64,
    missed: AtomicU64,
    total: AtomicU64,
    last_lagged: AtomicU64,
    last_missed: AtomicU64,
    last_total: AtomicU64,
}

impl LinkCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_lagged(&self, frames: u64) {
        self.lagged.fetch_add(frames, Ordering::Relaxed);
    }

    fn add_missed(&self) {
        self.missed.fetch_add(1, Ordering::Relaxed);
    }

    fn add_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters of the second in progress
    pub fn current(&self) -> LinkStatus {
        LinkStatus {
            lagged: self.lagged.load(Ordering::Relaxed),
            missed: self.missed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    /// Counters of the last completed second
    pub fn last_second(&self) -> LinkStatus {
        LinkStatus {
            lagged: self.last_lagged.load(Ordering::Relaxed),
            missed: self.last_missed.load(Ordering::Relaxed),
            total: self.last_total.load(Ordering::Relaxed),
        }
    }

    /// Close the current second and reset its counters
    pub fn roll(&self) -> LinkStatus {
        let status = LinkStatus {
            lagged: self.lagged.swap(0, Ordering::Relaxed),
            missed: self.missed.swap(0, Ordering::Relaxed),
            total: self.total.swap(0, Ordering::Relaxed),
        };
        self.last_lagged.store(status.lagged, Ordering::Relaxed);
        self.last_missed.store(status.missed, Ordering::Relaxed);
        self.last_total.store(status.total, Ordering::Relaxed);
        status
    }
}

/// Snapshot of the link counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStatus {
    /// Frames dropped by stale input flushes
    pub lagged: u64,
    /// Malformed frames
    pub missed: u64,
    /// Well-formed records
    pub total: u64,
}

impl LinkStatus {
    pub fn is_quiet(&self) -> bool {
        self.lagged == 0 && self.missed == 0 && self.total == 0
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Last sec: {} lagged, {} errors out of {} points",
            self.lagged, self.missed, self.total
        )
    }
}

/// Decodes inbound bytes and routes the records
pub struct FrameReader {
    decoder: PacketDecoder,
    telemetry: TelemetrySender,
    acks: Sender<AckToken>,
    counters: Arc<LinkCounters>,
    stale_bytes: usize,
}

impl FrameReader {
    pub fn new(
        wire: WireConfig,
        telemetry: TelemetrySender,
        acks: Sender<AckToken>,
        counters: Arc<LinkCounters>,
    ) -> Self {
        let stale_bytes = wire.stale_frames * SCAN_FRAME_LEN;
        Self {
            decoder: PacketDecoder::new(wire),
            telemetry,
            acks,
            counters,
            stale_bytes,
        }
    }

    /// One read cycle: stale check, bounded read, decode everything buffered
    ///
    /// Returns the number of bytes read.
    pub fn poll(&mut self, port: &mut dyn Transport) -> Result<usize> {
        let unread = port.available()?;
        if unread > self.stale_bytes {
            log::debug!("Flushing {} stale bytes", unread);
            self.counters.add_lagged((unread / SCAN_FRAME_LEN) as u64);
            port.clear_input()?;
            self.decoder.clear();
        }

        let mut chunk = [0u8; READ_CHUNK];
        let want = self.decoder.free().min(READ_CHUNK);
        let n = port.read(&mut chunk[..want])?;
        if n > 0 {
            self.decoder.extend(&chunk[..n]);
            self.dispatch();
        }
        Ok(n)
    }

    fn dispatch(&mut self) {
        while let Some(decoded) = self.decoder.next_frame() {
            match decoded {
                Decoded::Record(TelemetryRecord::Ack(token)) => {
                    self.counters.add_total();
                    // Nobody listening for acks is not an error for the reader
                    let _ = self.acks.send(token);
                }
                Decoded::Record(record) => {
                    self.counters.add_total();
                    self.telemetry.push(record);
                }
                Decoded::Rejected => self.counters.add_missed(),
            }
        }
    }
}

/// Reader loop, runs until `stop` is set
///
/// The transport lock is held only for one bounded read; the command sender
/// writes between reads.
pub(crate) fn reader_loop(
    port: SharedTransport,
    stop: Arc<AtomicBool>,
    mut reader: FrameReader,
    status_interval: Duration,
) {
    let mut last_status = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        let result = {
            let mut port = port.lock();
            reader.poll(&mut **port)
        };

        match result {
            Ok(0) => thread::sleep(Duration::from_millis(1)),
            Ok(_) => {}
            Err(e) => {
                log::error!("Link read error: {}", e);
                thread::sleep(Duration::from_millis(10));
            }
        }

        if last_status.elapsed() >= status_interval {
            last_status = Instant::now();
            let status = reader.counters.roll();
            if !status.is_quiet() {
                log::info!("{}", status);
            }
        }
    }

    log::info!("Reader thread exiting");
}
