//! Map display boundary.

use crate::error::Result;
use crate::grid::OccupancyGrid;
use crate::localization::Pose;

/// Draws the current map; called on every render tick
pub trait MapRenderer: Send {
    fn render(&mut self, grid: &OccupancyGrid, pose: Option<&Pose>) -> Result<()>;
}

/// Logs a one-line map summary
#[derive(Debug, Default)]
pub struct LogRenderer {
    last_occupied: usize,
}

impl MapRenderer for LogRenderer {
    fn render(&mut self, grid: &OccupancyGrid, pose: Option<&Pose>) -> Result<()> {
        let occupied = grid.occupied();
        let grown = occupied.saturating_sub(self.last_occupied);
        self.last_occupied = occupied;

        match pose {
            Some(pose) => log::info!(
                "Map: {} occupied cells (+{}), robot at ({:.0}, {:.0}) mm, {:.1} deg",
                occupied,
                grown,
                pose.x_mm,
                pose.y_mm,
                pose.theta_deg
            ),
            None => log::debug!("Map: waiting for first scan cycle"),
        }
        Ok(())
    }
}
