//! Ground station configuration
//!
//! One TOML file configures the whole station. The `[link]` section is the
//! radio link's own configuration; the rest is station side. Every section
//! falls back to defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! [link]
//! port = "/dev/ttyUSB0"
//!
//! [map]
//! room_radius_m = 8.0
//! px_per_m = 100
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{Error, Result};
use rover_link::{CommandConfig, DriveGeometry, LinkConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete station configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    pub link: LinkConfig,
    pub drive: DriveGeometry,
    pub scan: ScanConfig,
    pub map: MapConfig,
    pub schedule: ScheduleConfig,
    pub commands: CommandConfig,
    pub logging: LoggingConfig,
}

impl StationConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the station cannot run with
    pub fn validate(&self) -> Result<()> {
        self.map.validate()
    }

    /// Load configuration, falling back to defaults if the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Scan cycle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Records drained per scan cycle
    pub num_samp: usize,
    /// Bound on draining the first cycle of a session
    pub first_cycle_timeout_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            num_samp: 400,
            first_cycle_timeout_ms: 500,
        }
    }
}

impl ScanConfig {
    pub fn first_cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.first_cycle_timeout_ms)
    }
}

/// Occupancy map configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MapConfig {
    /// Half the side of the mapped square [m]
    pub room_radius_m: f32,
    /// Map resolution [pixels/m]
    pub px_per_m: u32,
    /// Saturation value of a cell
    pub max_val: u16,
    /// Keep every footprint drawn during the session
    pub keep_footprint_trail: bool,
    /// Directory for exported map images
    pub export_dir: PathBuf,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            room_radius_m: 8.0,
            px_per_m: 100,
            max_val: 10,
            keep_footprint_trail: true,
            export_dir: PathBuf::from("."),
        }
    }
}

impl MapConfig {
    /// `max_val` leaves room for the marker value above it
    pub fn validate(&self) -> Result<()> {
        if self.max_val == 0 || self.max_val == u16::MAX {
            return Err(Error::Config(format!(
                "map.max_val must be between 1 and {}, got {}",
                u16::MAX - 1,
                self.max_val
            )));
        }
        if self.px_per_m == 0 {
            return Err(Error::Config("map.px_per_m must be positive".to_string()));
        }
        Ok(())
    }

    /// Pixels from the grid center to its edge
    pub fn room_radius_px(&self) -> usize {
        (self.room_radius_m * self.px_per_m as f32).round() as usize
    }

    /// Side length of the square grid
    pub fn grid_size(&self) -> usize {
        2 * self.room_radius_px() + 1
    }

    /// [pixels/mm]
    pub fn mm_to_px(&self) -> f32 {
        self.px_per_m as f32 / 1000.0
    }
}

/// Intervals of the cooperative scheduler
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub scan_interval_ms: u64,
    pub render_interval_ms: u64,
    pub command_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 50,
            render_interval_ms: 500,
            command_interval_ms: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
