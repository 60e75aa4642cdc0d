//! Occupancy grid with saturating hit counters.
//!
//! # Layout
//!
//! Square grid of side `2 * room_radius_px + 1`, row-major, with the session
//! origin at the center cell. Map `x` grows to the right (columns), map `y`
//! grows upwards, so rows grow with decreasing `y`.
//!
//! # Cell values
//!
//! | Value | Meaning |
//! |---|---|
//! | `0` | never hit |
//! | `1..=max_val` | scan hits, saturating at `max_val` |
//! | `max_val + 1` | robot footprint marker |
//!
//! Marker cells are never incremented by hits. With the footprint trail on
//! (the default) every footprint of the session stays on the map.

mod export;
mod footprint;

pub use footprint::Footprint;

use crate::aggregator::ObservationVector;
use crate::config::MapConfig;
use crate::localization::Pose;

/// Outcome of drawing one scan cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawReport {
    /// Scan points counted into a cell
    pub hits: usize,
    /// Scan points that fell on the robot footprint
    pub masked_points: usize,
    /// Scan points outside the grid
    pub dropped_points: usize,
    /// Footprint cells stamped
    pub marker_cells: usize,
    /// Footprint cells outside the grid
    pub dropped_marker: usize,
}

/// Session occupancy grid
#[derive(Debug)]
pub struct OccupancyGrid {
    size: usize,
    center: f32,
    mm_to_px: f32,
    px_per_m: u32,
    max_val: u16,
    keep_trail: bool,
    /// Row-major storage: index = row * size + col
    cells: Vec<u16>,
    /// Cells of the last footprint, restored when the trail is off
    last_footprint: Vec<(usize, u16)>,
    dropped_points: u64,
    dropped_marker: u64,
}

impl OccupancyGrid {
    pub fn new(config: &MapConfig) -> Self {
        let size = config.grid_size();
        Self {
            size,
            center: config.room_radius_px() as f32,
            mm_to_px: config.mm_to_px(),
            px_per_m: config.px_per_m,
            max_val: config.max_val,
            keep_trail: config.keep_footprint_trail,
            cells: vec![0; size * size],
            last_footprint: Vec::new(),
            dropped_points: 0,
            dropped_marker: 0,
        }
    }

    /// Side length in cells
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn px_per_m(&self) -> u32 {
        self.px_per_m
    }

    pub fn max_val(&self) -> u16 {
        self.max_val
    }

    /// Value stamped for the robot footprint
    pub fn marker_value(&self) -> u16 {
        self.max_val.saturating_add(1)
    }

    /// Cell value, `None` outside the grid
    pub fn get(&self, col: usize, row: usize) -> Option<u16> {
        (col < self.size && row < self.size).then(|| self.cells[row * self.size + col])
    }

    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    /// Scan points dropped off-grid this session
    pub fn dropped_points(&self) -> u64 {
        self.dropped_points
    }

    /// Footprint cells dropped off-grid this session
    pub fn dropped_marker(&self) -> u64 {
        self.dropped_marker
    }

    /// Cells with at least one hit, markers excluded
    pub fn occupied(&self) -> usize {
        let marker = self.marker_value();
        self.cells.iter().filter(|&&v| v > 0 && v != marker).count()
    }

    /// Cells carrying the footprint marker
    pub fn marked(&self) -> usize {
        let marker = self.marker_value();
        self.cells.iter().filter(|&&v| v == marker).count()
    }

    /// Cell of a map position [mm], `None` off-grid
    pub fn to_cell(&self, x_mm: f32, y_mm: f32) -> Option<(usize, usize)> {
        let col = (self.center + x_mm * self.mm_to_px + 0.5).floor();
        let row = (self.center - y_mm * self.mm_to_px + 0.5).floor();
        self.checked_cell(col as i64, row as i64)
    }

    fn checked_cell(&self, col: i64, row: i64) -> Option<(usize, usize)> {
        let in_range = |v: i64| v >= 0 && (v as usize) < self.size;
        (in_range(col) && in_range(row)).then_some((col as usize, row as usize))
    }

    /// Add one hit, saturating at `max_val`; markers are left alone
    ///
    /// Returns false if the cell is off-grid.
    pub fn increment(&mut self, col: usize, row: usize) -> bool {
        if col >= self.size || row >= self.size {
            return false;
        }
        let cell = &mut self.cells[row * self.size + col];
        if *cell < self.max_val {
            *cell += 1;
        }
        true
    }

    /// Stamp the robot footprint at a pose
    pub fn stamp_footprint(&mut self, pose: &Pose, report: &mut DrawReport) {
        if !self.keep_trail {
            for (index, previous) in self.last_footprint.drain(..) {
                self.cells[index] = previous;
            }
        }

        let footprint = Footprint::rotated(pose.theta_deg);
        let center_col = (self.center + pose.x_mm * self.mm_to_px + 0.5).floor() as i64;
        let center_row = (self.center - pose.y_mm * self.mm_to_px + 0.5).floor() as i64;
        let marker = self.marker_value();

        for (d_col, d_row) in footprint.offsets() {
            match self.checked_cell(center_col + d_col, center_row + d_row) {
                Some((col, row)) => {
                    let index = row * self.size + col;
                    if !self.keep_trail && self.cells[index] != marker {
                        self.last_footprint.push((index, self.cells[index]));
                    }
                    self.cells[index] = marker;
                    report.marker_cells += 1;
                }
                None => report.dropped_marker += 1,
            }
        }
        self.dropped_marker += report.dropped_marker as u64;
    }

    /// Draw one cycle: footprint first, then every return of the observation
    pub fn draw_cycle(&mut self, observation: &ObservationVector, pose: &Pose) -> DrawReport {
        let mut report = DrawReport::default();
        self.stamp_footprint(pose, &mut report);
        let marker = self.marker_value();

        for (angle_deg, distance_mm) in observation.returns() {
            let bearing = (angle_deg + pose.theta_deg).to_radians();
            let x = pose.x_mm + distance_mm * bearing.sin();
            let y = pose.y_mm + distance_mm * bearing.cos();
            match self.to_cell(x, y) {
                Some((col, row)) if self.cells[row * self.size + col] == marker => {
                    report.masked_points += 1;
                }
                Some((col, row)) => {
                    self.increment(col, row);
                    report.hits += 1;
                }
                None => report.dropped_points += 1,
            }
        }

        if report.dropped_points > 0 {
            log::debug!("{} scan points off the map", report.dropped_points);
        }
        self.dropped_points += report.dropped_points as u64;
        report
    }
}
