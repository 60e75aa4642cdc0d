//! Link lifecycle: open, start handshake, reader thread, shutdown
//!
//! ```text
//! open ──▶ start_streaming ──▶ start ──▶ ... ──▶ shutdown
//!          send 'l' until        spawn            stop flag, grace,
//!          data arrives          reader           join, send 'o', flush
//! ```
//!
//! The robot keeps streaming until told to stop, so a link that was started
//! always sends the stop command on shutdown, also when dropped.

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::protocol::AckToken;
use crate::queue::{telemetry_queue, TelemetryReceiver};
use crate::reader::{reader_loop, FrameReader, LinkCounters, LinkStatus};
use crate::transport::{shared, SerialTransport, SharedTransport, Transport};
use crossbeam_channel::{unbounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Consumer ends handed out by `Link::start`
pub struct LinkChannels {
    pub telemetry: TelemetryReceiver,
    pub acks: Receiver<AckToken>,
}

/// Radio link to one robot
pub struct Link {
    config: LinkConfig,
    port: SharedTransport,
    /// Set to stop the reader thread
    stop: Arc<AtomicBool>,
    counters: Arc<LinkCounters>,
    reader_handle: Option<JoinHandle<()>>,
    /// Robot has been asked to stream and not yet told to stop
    active: bool,
}

impl Link {
    /// Open the serial port named in the configuration
    pub fn open(config: LinkConfig) -> Result<Self> {
        let transport =
            SerialTransport::open(&config.port, config.baud_rate, config.timing.read_timeout())?;
        // Radio needs a moment after the port opens
        thread::sleep(Duration::from_millis(config.timing.port_settle_ms));
        Ok(Self::with_transport(config, transport))
    }

    /// Build a link over an already open transport
    pub fn with_transport(config: LinkConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            port: shared(transport),
            stop: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(LinkCounters::new()),
            reader_handle: None,
            active: false,
        }
    }

    /// Ask the robot to start streaming until it answers
    ///
    /// Fails with `Error::NoResponse` once all attempts are used up.
    pub fn start_streaming(&mut self) -> Result<()> {
        let timing = &self.config.timing;
        let start = self.config.wire.start_command.to_string();

        for attempt in 1..=timing.start_attempts {
            self.port.lock().send(start.as_bytes())?;
            self.active = true;
            log::info!(
                "Start command sent (attempt {}/{}), waiting for response...",
                attempt,
                timing.start_attempts
            );
            thread::sleep(Duration::from_millis(timing.start_response_wait_ms));

            if self.port.lock().available()? > 0 {
                log::info!("Data received, live processing starting");
                return Ok(());
            }
        }

        Err(Error::NoResponse {
            attempts: timing.start_attempts,
        })
    }

    /// Spawn the reader thread
    pub fn start(&mut self) -> Result<LinkChannels> {
        if self.reader_handle.is_some() {
            return Err(Error::Other("Link reader already running".to_string()));
        }

        let (telemetry_tx, telemetry) = telemetry_queue();
        let (ack_tx, acks) = unbounded();
        let reader = FrameReader::new(
            self.config.wire.clone(),
            telemetry_tx,
            ack_tx,
            Arc::clone(&self.counters),
        );

        self.stop.store(false, Ordering::Relaxed);
        let port = Arc::clone(&self.port);
        let stop = Arc::clone(&self.stop);
        let status_interval = self.config.timing.status_interval();
        self.reader_handle = Some(
            thread::Builder::new()
                .name("link-reader".to_string())
                .spawn(move || reader_loop(port, stop, reader, status_interval))
                .map_err(|e| Error::Other(format!("Failed to spawn reader thread: {}", e)))?,
        );
        self.active = true;

        log::info!("Link reader started");
        Ok(LinkChannels { telemetry, acks })
    }

    /// Transport shared with the command sender
    pub fn transport(&self) -> SharedTransport {
        Arc::clone(&self.port)
    }

    pub fn counters(&self) -> Arc<LinkCounters> {
        Arc::clone(&self.counters)
    }

    /// Counters of the last completed second
    pub fn status(&self) -> LinkStatus {
        self.counters.last_second()
    }

    /// Stop the reader and tell the robot to stop streaming
    ///
    /// The stop command and input flush are repeated once if data is still
    /// arriving afterwards; a robot that keeps talking after that is logged
    /// and left alone.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        log::info!("Shutting down link...");
        let timing = self.config.timing.clone();

        self.stop.store(true, Ordering::Relaxed);
        // Let an in-flight read finish before the input is flushed
        thread::sleep(Duration::from_millis(timing.stop_grace_ms));
        if let Some(handle) = self.reader_handle.take() {
            handle.join().map_err(|_| Error::ThreadPanic)?;
        }

        let stop = self.config.wire.stop_command.to_string();
        for attempt in 1..=2 {
            {
                let mut port = self.port.lock();
                port.send(stop.as_bytes())?;
                port.clear_input()?;
            }
            thread::sleep(Duration::from_millis(timing.stop_settle_ms));

            if self.port.lock().available()? == 0 {
                self.active = false;
                log::info!("Robot stopped streaming");
                return Ok(());
            }
            log::debug!("Data still arriving after stop attempt {}", attempt);
        }

        self.active = false;
        log::warn!("Robot still streaming after repeated stop commands");
        Ok(())
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Link shutdown failed: {}", e);
        }
    }
}
