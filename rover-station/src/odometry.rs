//! Wheel odometry from encoder samples.
//!
//! Encoder counters and the robot clock are 16-bit and wrap. A raw tick
//! difference beyond half the counter range is taken as a wrap and pulled
//! back by `WRAP_CORRECTION`; the clock only ever wraps forwards, so a small
//! backwards step stays a small negative delta.

use rover_link::{DriveGeometry, EncoderSample};

/// Half range of a 16-bit counter
const HALF_RANGE: i32 = 1 << 15;

/// Wrap correction applied to a raw delta, one short of 2^16
const WRAP_CORRECTION: i32 = (1 << 16) - 1;

/// Tick difference of a wrapping signed 16-bit counter.
#[inline]
pub fn tick_delta(current: i16, previous: i16) -> i32 {
    let raw = current as i32 - previous as i32;
    if raw > HALF_RANGE {
        raw - WRAP_CORRECTION
    } else if raw < -HALF_RANGE {
        raw + WRAP_CORRECTION
    } else {
        raw
    }
}

/// Elapsed milliseconds of the robot's increasing 16-bit clock.
///
/// Only a forward wrap is corrected.
#[inline]
pub fn time_delta(current: u16, previous: u16) -> i32 {
    let raw = current as i32 - previous as i32;
    if raw < -HALF_RANGE {
        raw + WRAP_CORRECTION
    } else {
        raw
    }
}

/// Wraparound-corrected difference of two encoder samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderDelta {
    pub left: i32,
    pub right: i32,
    pub dt_ms: i32,
}

impl EncoderDelta {
    pub fn between(previous: &EncoderSample, current: &EncoderSample) -> Self {
        Self {
            left: tick_delta(current.left_ticks, previous.left_ticks),
            right: tick_delta(current.right_ticks, previous.right_ticks),
            dt_ms: time_delta(current.timestamp_ms, previous.timestamp_ms),
        }
    }
}

/// Motion over one scan cycle, as the pose estimator consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionDelta {
    /// Forward travel [mm]
    pub dxy_mm: f32,
    /// Heading change [deg], positive clockwise
    pub dtheta_deg: f32,
    /// Elapsed time [s]
    pub dt_s: f32,
}

impl MotionDelta {
    pub fn from_encoders(delta: &EncoderDelta, drive: &DriveGeometry) -> Self {
        Self {
            dxy_mm: drive.ticks_to_mm() * (delta.left + delta.right) as f32 / 2.0,
            dtheta_deg: drive.ticks_to_deg() * (delta.left - delta.right) as f32 / 2.0,
            dt_s: delta.dt_ms as f32 / 1000.0,
        }
    }

    pub fn between(previous: &EncoderSample, current: &EncoderSample, drive: &DriveGeometry) -> Self {
        Self::from_encoders(&EncoderDelta::between(previous, current), drive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tick_delta_wraparound() {
        assert_eq!(tick_delta(10, 5), 5);
        assert_eq!(tick_delta(5, 10), -5);
        // Forward across the positive limit
        assert_eq!(tick_delta(-32760, 32760), 15);
        // Backward across it
        assert_eq!(tick_delta(32760, -32760), -15);
        // Exactly half the range is not a wrap
        assert_eq!(tick_delta(32767, -1), 32768);
        assert_eq!(tick_delta(-32768, 0), -32768);
    }

    #[test]
    fn test_time_delta_wraparound() {
        assert_eq!(time_delta(1000, 950), 50);
        assert_eq!(time_delta(30, 65530), 35);
    }

    #[test]
    fn test_time_delta_backwards_step_stays_negative() {
        assert_eq!(time_delta(95, 100), -5);
        let delta = EncoderDelta::between(
            &EncoderSample::new(0, 0, 100),
            &EncoderSample::new(0, 0, 95),
        );
        assert_eq!(delta.dt_ms, -5);
    }

    #[test]
    fn test_encoder_delta_across_boundary() {
        let previous = EncoderSample::new(32760, -32760, 65500);
        let current = EncoderSample::new(-32766, 32766, 14);
        let delta = EncoderDelta::between(&previous, &current);
        assert_eq!(delta.left, 9);
        assert_eq!(delta.right, -9);
        assert_eq!(delta.dt_ms, 49);
    }

    #[test]
    fn test_straight_and_turning_motion() {
        let drive = DriveGeometry::default();

        let straight = MotionDelta::from_encoders(
            &EncoderDelta { left: 100, right: 100, dt_ms: 200 },
            &drive,
        );
        assert_relative_eq!(straight.dxy_mm, 100.0 * drive.ticks_to_mm(), epsilon = 1e-4);
        assert_relative_eq!(straight.dtheta_deg, 0.0);
        assert_relative_eq!(straight.dt_s, 0.2);

        // Left wheel forward, right back: clockwise turn in place
        let turn = MotionDelta::from_encoders(
            &EncoderDelta { left: 50, right: -50, dt_ms: 100 },
            &drive,
        );
        assert_relative_eq!(turn.dxy_mm, 0.0);
        assert_relative_eq!(turn.dtheta_deg, 50.0 * drive.ticks_to_deg(), epsilon = 1e-4);
        assert!(turn.dtheta_deg > 0.0);
    }
}
