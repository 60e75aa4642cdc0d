//! Configuration for the rover link
//!
//! Everything the link needs is fixed for the lifetime of one session and
//! passed to each component at construction. All sections deserialize with
//! defaults so a partial TOML file is enough.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Serial link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port of the ground XBee (e.g. `/dev/ttyUSB0`)
    pub port: String,
    /// Baud rate of the radio link
    pub baud_rate: u32,
    /// Wire format constants
    pub wire: WireConfig,
    /// Reader and lifecycle timing
    pub timing: LinkTiming,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 250_000,
            wire: WireConfig::default(),
            timing: LinkTiming::default(),
        }
    }
}

impl LinkConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Wire format constants shared by the robot firmware and the decoder
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WireConfig {
    /// Flag byte: two of them open an encoder frame, four form an ack token
    pub flag_byte: u8,
    /// Terminator byte closing every scan frame
    pub terminator_byte: u8,
    /// Distance resolution [1/mm]; `distance_mm = raw / distance_factor`
    pub distance_factor: f32,
    /// Angle resolution [1/deg]; `angle_deg = raw / angle_factor`
    pub angle_factor: f32,
    /// Scan points at or below this distance are rejected [mm]
    pub min_distance_mm: f32,
    /// Scan points at or above this distance are rejected [mm]
    pub max_distance_mm: f32,
    /// Unread frames after which buffered input is considered stale
    pub stale_frames: usize,
    /// Command telling the robot to start the lidar stream
    pub start_command: char,
    /// Command telling the robot to stop the lidar stream
    pub stop_command: char,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            flag_byte: 0xFE,
            terminator_byte: 0xFF,
            distance_factor: 0.5,
            angle_factor: 8.0,
            min_distance_mm: 100.0,
            max_distance_mm: 6000.0,
            stale_frames: 300,
            start_command: 'l',
            stop_command: 'o',
        }
    }
}

/// Reader and lifecycle timing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkTiming {
    /// Upper bound on a single blocking read
    pub read_timeout_ms: u64,
    /// Pause after opening the port before talking to it
    pub port_settle_ms: u64,
    /// Start commands sent before giving up on the robot
    pub start_attempts: u32,
    /// Time to wait for data after each start command
    pub start_response_wait_ms: u64,
    /// Grace period for an in-flight read after the stop flag is set
    pub stop_grace_ms: u64,
    /// Time to watch for late data after each stop command
    pub stop_settle_ms: u64,
    /// Period of the lagged/missed/total status readout
    pub status_interval_ms: u64,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            read_timeout_ms: 20,
            port_settle_ms: 1000,
            start_attempts: 5,
            start_response_wait_ms: 2000,
            stop_grace_ms: 200,
            stop_settle_ms: 500,
            status_interval_ms: 1000,
        }
    }
}

impl LinkTiming {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

/// Wheel and chassis geometry used for tick conversions
///
/// Encoder ticks relate to wheel revolutions, not robot rotation, so angular
/// conversions go through the turning circle of the wheel track. The
/// `angular_flux` factor is an empirical correction for wheel slip while
/// turning in place.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DriveGeometry {
    /// Encoder ticks per wheel revolution
    pub ticks_per_rev: f32,
    /// Wheel diameter [mm]
    pub wheel_diameter_mm: f32,
    /// Separation of the two wheels [mm]
    pub wheel_track_mm: f32,
    /// Empirical slip correction for rotations
    pub angular_flux: f32,
}

impl Default for DriveGeometry {
    fn default() -> Self {
        Self {
            ticks_per_rev: 1000.0 / 3.0,
            wheel_diameter_mm: 58.2,
            wheel_track_mm: 185.0,
            angular_flux: 1.62,
        }
    }
}

impl DriveGeometry {
    /// Wheel circumference [mm/rev]
    pub fn mm_per_rev(&self) -> f32 {
        PI * self.wheel_diameter_mm
    }

    /// Robot rotation produced by one wheel revolution [deg/rev]
    pub fn deg_per_rev(&self) -> f32 {
        360.0 * self.mm_per_rev() / (PI * self.wheel_track_mm)
    }

    /// [mm/tick]
    pub fn ticks_to_mm(&self) -> f32 {
        self.mm_per_rev() / self.ticks_per_rev
    }

    /// [ticks/mm]
    pub fn mm_to_ticks(&self) -> f32 {
        self.ticks_per_rev / self.mm_per_rev()
    }

    /// [ticks/deg], slip corrected
    pub fn deg_to_ticks(&self) -> f32 {
        self.ticks_per_rev / self.deg_per_rev() * self.angular_flux
    }

    /// [deg/tick], slip corrected
    pub fn ticks_to_deg(&self) -> f32 {
        self.deg_per_rev() / self.ticks_per_rev / self.angular_flux
    }
}

/// Command protocol configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Resends of an unacknowledged value command before it is abandoned
    pub max_resends: u32,
    /// Minimum time between two automatic sends
    pub min_send_interval_ms: u64,
    /// Appended to every outbound command
    pub line_ending: String,
    /// Value commands whose argument is passed through (speed)
    pub velocity_commands: String,
    /// Value commands whose argument is millimeters (forward/back)
    pub linear_commands: String,
    /// Value commands whose argument is degrees (left/right)
    pub angular_commands: String,
    /// Simple commands that may be held for continuous driving
    pub drive_commands: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            max_resends: 3,
            min_send_interval_ms: 50,
            line_ending: String::new(),
            velocity_commands: "v".to_string(),
            linear_commands: "ws".to_string(),
            angular_commands: "ad".to_string(),
            drive_commands: "WASD".to_string(),
        }
    }
}

impl CommandConfig {
    pub fn min_send_interval(&self) -> Duration {
        Duration::from_millis(self.min_send_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = LinkConfig::default();
        assert_eq!(config.baud_rate, 250_000);
        assert_eq!(config.wire.flag_byte, 0xFE);
        assert_eq!(config.wire.terminator_byte, 0xFF);
        assert_eq!(config.wire.stale_frames, 300);
        assert_eq!(config.timing.start_attempts, 5);
    }

    #[test]
    fn test_drive_conversions_are_inverse() {
        let drive = DriveGeometry::default();
        assert_relative_eq!(drive.mm_to_ticks() * drive.ticks_to_mm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(drive.deg_to_ticks() * drive.ticks_to_deg(), 1.0, epsilon = 1e-6);
        // 58.2mm wheel, 1000/3 ticks per revolution
        assert_relative_eq!(drive.ticks_to_mm(), 0.548_52, epsilon = 1e-4);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = LinkConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();
        assert!(toml_string.contains("[wire]"));
        assert!(toml_string.contains("[timing]"));

        let parsed: LinkConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.wire.start_command, 'l');
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_content = r#"
port = "/dev/ttyACM0"

[wire]
distance_factor = 0.25
"#;
        let config: LinkConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.wire.distance_factor, 0.25);
        assert_eq!(config.wire.angle_factor, 8.0);
        assert_eq!(config.baud_rate, 250_000);
    }
}
