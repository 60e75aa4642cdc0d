//! Mapping session: everything recreated on (re)start.
//!
//! A session owns the grid, the encoder pairing state and the pose origin.
//! Its first scan cycle drains the queue without waiting for a full cycle,
//! pins the pose origin and treats the robot as standing still.

use crate::aggregator::ScanAggregator;
use crate::config::StationConfig;
use crate::grid::{DrawReport, OccupancyGrid};
use crate::localization::{LocalizationAdapter, Localized, Pose, PoseEstimator};
use rover_link::TelemetryReceiver;

/// Summary of one processed scan cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub localized: Localized,
    pub draw: DrawReport,
    /// Records drained from the queue
    pub records: usize,
    /// Filled bins of the observation vector
    pub filled_bins: usize,
}

pub struct Session {
    config: StationConfig,
    grid: OccupancyGrid,
    aggregator: ScanAggregator,
    adapter: LocalizationAdapter,
    first_run: bool,
    pose: Option<Pose>,
    cycles: u64,
}

impl Session {
    pub fn new(config: &StationConfig, estimator: Box<dyn PoseEstimator>) -> Self {
        Self {
            config: config.clone(),
            grid: OccupancyGrid::new(&config.map),
            aggregator: Self::aggregator(config),
            adapter: LocalizationAdapter::new(estimator, config.drive.clone()),
            first_run: true,
            pose: None,
            cycles: 0,
        }
    }

    fn aggregator(config: &StationConfig) -> ScanAggregator {
        ScanAggregator::new(config.scan.num_samp, config.scan.first_cycle_timeout())
    }

    /// Start over with an empty map and a new origin
    pub fn restart(&mut self) {
        self.grid = OccupancyGrid::new(&self.config.map);
        self.aggregator = Self::aggregator(&self.config);
        self.adapter.reset();
        self.first_run = true;
        self.pose = None;
        self.cycles = 0;
        log::info!("Session restarted");
    }

    /// Process one scan cycle if one is available
    pub fn scan_tick(&mut self, queue: &TelemetryReceiver) -> Option<CycleReport> {
        if !self.aggregator.ready(queue, self.first_run) {
            return None;
        }

        let cycle = self.aggregator.drain_cycle(queue, self.first_run);
        let localized = self.adapter.update(&cycle);
        let draw = self.grid.draw_cycle(&cycle.observation, &localized.pose);

        if self.first_run {
            log::info!(
                "First scan cycle: {} records, {} bins filled",
                cycle.records,
                cycle.observation.filled()
            );
        }
        self.first_run = false;
        self.pose = Some(localized.pose);
        self.cycles += 1;

        Some(CycleReport {
            localized,
            draw,
            records: cycle.records,
            filled_bins: cycle.observation.filled(),
        })
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Latest session-relative pose
    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    /// Scan cycles processed this session
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }
}
