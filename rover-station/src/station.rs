//! The ground station loop.
//!
//! Runs on the main thread next to the link's reader thread. Three periodic
//! tasks share the loop and each runs to completion when due:
//!
//! - **scan** (50ms): drain a scan cycle, localize, draw the map
//! - **render** (500ms): hand the map to the renderer
//! - **command** (100ms): resend, settle or auto-drive robot commands
//!
//! Operator input is handled at the top of every step.

use crate::config::StationConfig;
use crate::error::Result;
use crate::localization::PoseEstimator;
use crate::operator::OperatorInput;
use crate::render::MapRenderer;
use crate::scheduler::Periodic;
use crate::session::Session;
use crossbeam_channel::Receiver;
use rover_link::{CommandProtocol, Link, LinkStatus, TelemetryReceiver, TickOutcome};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub struct Station {
    config: StationConfig,
    link: Link,
    telemetry: TelemetryReceiver,
    commands: CommandProtocol,
    session: Session,
    renderer: Box<dyn MapRenderer>,
    operator: Receiver<OperatorInput>,
    running: Arc<AtomicBool>,
    scan_task: Periodic,
    render_task: Periodic,
    command_task: Periodic,
}

impl Station {
    /// Start the link reader and set up a fresh session
    pub fn new(
        config: StationConfig,
        mut link: Link,
        estimator: Box<dyn PoseEstimator>,
        renderer: Box<dyn MapRenderer>,
        operator: Receiver<OperatorInput>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        config.validate()?;
        let channels = link.start()?;
        let commands = CommandProtocol::new(
            link.transport(),
            config.commands.clone(),
            config.drive.clone(),
            channels.acks,
        );
        let session = Session::new(&config, estimator);
        let schedule = &config.schedule;

        Ok(Self {
            scan_task: Periodic::from_millis(schedule.scan_interval_ms),
            render_task: Periodic::from_millis(schedule.render_interval_ms),
            command_task: Periodic::from_millis(schedule.command_interval_ms),
            config,
            link,
            telemetry: channels.telemetry,
            commands,
            session,
            renderer,
            operator,
            running,
        })
    }

    /// Run until stopped, then shut the link down
    pub fn run(&mut self) -> Result<()> {
        log::info!("Station running");
        while self.running.load(Ordering::Relaxed) {
            self.step(Instant::now())?;
            thread::sleep(Duration::from_millis(1));
        }
        self.link.shutdown()?;
        log::info!("Station stopped");
        Ok(())
    }

    /// One pass over operator input and the due tasks
    pub fn step(&mut self, now: Instant) -> Result<()> {
        self.handle_operator(now)?;
        if !self.running.load(Ordering::Relaxed) {
            return Ok(());
        }

        if self.scan_task.due(now) {
            if let Some(report) = self.session.scan_tick(&self.telemetry) {
                log::trace!(
                    "Cycle {}: {} records, {} bins, {} hits",
                    self.session.cycles(),
                    report.records,
                    report.filled_bins,
                    report.draw.hits
                );
            }
        }

        if self.render_task.due(now) {
            let pose = self.session.pose();
            self.renderer.render(self.session.grid(), pose.as_ref())?;
        }

        if self.command_task.due(now) {
            match self.commands.tick(now) {
                Ok(TickOutcome::Acked { command }) => log::info!("'{}' acknowledged", command),
                Ok(TickOutcome::Abandoned { command }) => {
                    log::warn!("'{}' not acknowledged, giving up", command)
                }
                Ok(TickOutcome::Resent { command, retry }) => {
                    log::debug!("Resent '{}' ({})", command, retry)
                }
                Ok(TickOutcome::DriveSent { .. } | TickOutcome::Throttled | TickOutcome::Idle) => {}
                // The next tick retries the write
                Err(e) => log::error!("Command send failed: {}", e),
            }
        }

        Ok(())
    }

    fn handle_operator(&mut self, now: Instant) -> Result<()> {
        while let Ok(input) = self.operator.try_recv() {
            match input {
                OperatorInput::Quit => {
                    log::info!("Quit requested");
                    self.running.store(false, Ordering::Relaxed);
                    return Ok(());
                }
                OperatorInput::Restart => {
                    self.session.restart();
                    self.scan_task.reset();
                }
                OperatorInput::Save => {
                    if let Err(e) = self.save_map() {
                        log::error!("Saving map failed: {}", e);
                    }
                }
                OperatorInput::Hold(drive) => {
                    if self.commands.hold_drive(drive) {
                        log::info!("Holding '{}'", drive);
                    } else {
                        log::warn!("'{}' is not a drive command", drive);
                    }
                }
                OperatorInput::Release => self.commands.release_drive(),
                OperatorInput::Status => {
                    log::info!("{}", self.link_status());
                    match self.session.pose() {
                        Some(pose) => log::info!(
                            "Pose ({:.0}, {:.0}) mm, {:.1} deg after {} cycles",
                            pose.x_mm,
                            pose.y_mm,
                            pose.theta_deg,
                            self.session.cycles()
                        ),
                        None => log::info!("No pose yet"),
                    }
                }
                OperatorInput::Command(text) => match self.commands.submit(&text, now) {
                    Ok(_) => {}
                    Err(rover_link::Error::Command(e)) => log::warn!("Not sent: {}", e),
                    Err(e) => log::error!("Command send failed: {}", e),
                },
                OperatorInput::Unknown(line) => log::warn!("Unknown console command: {}", line),
            }
        }
        Ok(())
    }

    /// Write the map image into the export directory
    pub fn save_map(&self) -> Result<PathBuf> {
        self.session.grid().save_image(&self.config.map.export_dir)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn commands(&self) -> &CommandProtocol {
        &self.commands
    }

    /// Link counters of the last completed second
    pub fn link_status(&self) -> LinkStatus {
        self.link.status()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
