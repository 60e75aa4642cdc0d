//! RoverStation - ground station for a mapping rover
//!
//! Turns the telemetry stream of `rover-link` into an occupancy map:
//!
//! ```text
//! link reader ─▶ telemetry queue ─▶ aggregator ─▶ localization ─▶ grid ─▶ renderer
//!                                                                   │
//!                                                                   └─▶ PNG export
//! ```
//!
//! Operator commands travel the other way through the link's command
//! protocol. Pose estimation is pluggable behind [`PoseEstimator`];
//! [`DeadReckoning`] integrates wheel odometry only.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod grid;
pub mod localization;
pub mod odometry;
pub mod operator;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod station;

// Re-export commonly used types
pub use aggregator::{ObservationVector, ScanAggregator, ScanCycle, NO_DATA, OBSERVATION_BINS};
pub use config::StationConfig;
pub use error::{Error, Result};
pub use grid::{DrawReport, OccupancyGrid};
pub use localization::{DeadReckoning, EstimatorPose, LocalizationAdapter, Pose, PoseEstimator};
pub use odometry::{EncoderDelta, MotionDelta};
pub use operator::OperatorInput;
pub use render::{LogRenderer, MapRenderer};
pub use session::Session;
pub use station::Station;
