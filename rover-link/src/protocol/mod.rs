//! Wire protocol of the rover radio link
//!
//! The robot streams three frame shapes, told apart by their first bytes
//! (`F` = flag byte, `T` = terminator byte):
//!
//! | Frame | Bytes |
//! |---|---|
//! | Scan point | `[W_lo, W_hi, B, T]` |
//! | Encoder sample | `[F, F, l_lo, l_hi, r_lo, r_hi, t_lo, t_hi]` |
//! | Acknowledgment | `[F, F, F, F]` |
//!
//! A scan point packs a 12-bit distance in the low bits of `W` and a 12-bit
//! angle in the high nibble of `W` followed by `B`.

mod decoder;
mod ring_buffer;

pub use decoder::{Decoded, PacketDecoder};
pub use ring_buffer::RingBuffer;

use crate::config::WireConfig;

/// Length of scan and acknowledgment frames
pub const SCAN_FRAME_LEN: usize = 4;

/// Length of encoder frames
pub const ENCODER_FRAME_LEN: usize = 8;

/// Mask of the distance bits in the first 16-bit word
const DISTANCE_MASK: u16 = 0x0FFF;

/// One lidar return
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    pub distance_mm: f32,
    pub angle_deg: f32,
}

impl ScanPoint {
    pub fn new(distance_mm: f32, angle_deg: f32) -> Self {
        Self {
            distance_mm,
            angle_deg,
        }
    }

    /// Decode the first three bytes of a scan frame
    pub fn decode(bytes: [u8; 3], wire: &WireConfig) -> Self {
        let word = u16::from_le_bytes([bytes[0], bytes[1]]);
        let distance_raw = word & DISTANCE_MASK;
        let angle_raw = ((word & !DISTANCE_MASK) >> 12) | ((bytes[2] as u16) << 4);
        Self {
            distance_mm: distance_raw as f32 / wire.distance_factor,
            angle_deg: angle_raw as f32 / wire.angle_factor,
        }
    }

    /// Inside the lidar's usable range
    pub fn is_valid(&self, wire: &WireConfig) -> bool {
        self.distance_mm > wire.min_distance_mm
            && self.distance_mm < wire.max_distance_mm
            && (0.0..=360.0).contains(&self.angle_deg)
    }

    /// Build the wire frame the robot would send for this point
    pub fn encode(&self, wire: &WireConfig) -> [u8; SCAN_FRAME_LEN] {
        let distance_raw = ((self.distance_mm * wire.distance_factor) as u16) & DISTANCE_MASK;
        let angle_raw = ((self.angle_deg * wire.angle_factor) as u16) & 0x0FFF;
        let word = distance_raw | ((angle_raw & 0x000F) << 12);
        let [lo, hi] = word.to_le_bytes();
        [lo, hi, (angle_raw >> 4) as u8, wire.terminator_byte]
    }
}

/// Raw wheel encoder counters and robot clock
///
/// All three fields wrap at 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderSample {
    pub left_ticks: i16,
    pub right_ticks: i16,
    pub timestamp_ms: u16,
}

impl EncoderSample {
    pub fn new(left_ticks: i16, right_ticks: i16, timestamp_ms: u16) -> Self {
        Self {
            left_ticks,
            right_ticks,
            timestamp_ms,
        }
    }

    /// Decode the six payload bytes following the two flag bytes
    pub fn decode(payload: [u8; 6]) -> Self {
        Self {
            left_ticks: i16::from_le_bytes([payload[0], payload[1]]),
            right_ticks: i16::from_le_bytes([payload[2], payload[3]]),
            timestamp_ms: u16::from_le_bytes([payload[4], payload[5]]),
        }
    }

    pub fn encode(&self, wire: &WireConfig) -> [u8; ENCODER_FRAME_LEN] {
        let [l0, l1] = self.left_ticks.to_le_bytes();
        let [r0, r1] = self.right_ticks.to_le_bytes();
        let [t0, t1] = self.timestamp_ms.to_le_bytes();
        [wire.flag_byte, wire.flag_byte, l0, l1, r0, r1, t0, t1]
    }
}

/// The robot accepted the previous value command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckToken;

impl AckToken {
    pub fn encode(wire: &WireConfig) -> [u8; SCAN_FRAME_LEN] {
        [wire.flag_byte; SCAN_FRAME_LEN]
    }
}

/// A decoded inbound frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryRecord {
    Scan(ScanPoint),
    Encoder(EncoderSample),
    Ack(AckToken),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_scan_decode_reference_frame() {
        let wire = WireConfig::default();
        let point = ScanPoint::decode([0x7D, 0x00, 0xB4], &wire);
        assert_abs_diff_eq!(point.distance_mm, 250.0);
        assert_abs_diff_eq!(point.angle_deg, 360.0);
        assert!(point.is_valid(&wire));
    }

    #[test]
    fn test_scan_encode_recovers_within_resolution() {
        let wire = WireConfig::default();
        for &(distance, angle) in &[(101.3, 0.0), (2500.7, 123.45), (5999.0, 359.9), (480.2, 360.0)] {
            let frame = ScanPoint::new(distance, angle).encode(&wire);
            assert_eq!(frame[3], wire.terminator_byte);

            let decoded = ScanPoint::decode([frame[0], frame[1], frame[2]], &wire);
            assert!((decoded.distance_mm - distance).abs() <= 1.0 / wire.distance_factor);
            assert!((decoded.angle_deg - angle).abs() <= 1.0 / wire.angle_factor);
        }
    }

    #[test]
    fn test_scan_validity_bounds() {
        let wire = WireConfig::default();
        assert!(!ScanPoint::new(100.0, 10.0).is_valid(&wire));
        assert!(ScanPoint::new(100.5, 10.0).is_valid(&wire));
        assert!(!ScanPoint::new(6000.0, 10.0).is_valid(&wire));
        assert!(!ScanPoint::new(500.0, 360.5).is_valid(&wire));
    }

    #[test]
    fn test_encoder_frame_layout() {
        let wire = WireConfig::default();
        let sample = EncoderSample::new(-2, 300, 65535);
        let frame = sample.encode(&wire);
        assert_eq!(frame, [0xFE, 0xFE, 0xFE, 0xFF, 0x2C, 0x01, 0xFF, 0xFF]);

        let payload = [frame[2], frame[3], frame[4], frame[5], frame[6], frame[7]];
        assert_eq!(EncoderSample::decode(payload), sample);
    }
}
