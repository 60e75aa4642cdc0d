//! Incremental frame decoder
//!
//! Bytes are appended as they arrive; `next_frame` classifies the front of
//! the buffer once enough bytes are present and consumes exactly one frame.
//! A rejected scan frame puts the decoder into resynchronization, which
//! discards bytes up to and including the next terminator. The decoder never
//! fails: every outcome is either a record, a rejection or "need more data".

use super::ring_buffer::RingBuffer;
use super::{
    AckToken, EncoderSample, ScanPoint, TelemetryRecord, ENCODER_FRAME_LEN, SCAN_FRAME_LEN,
};
use crate::config::WireConfig;

/// Outcome of decoding one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decoded {
    /// Well-formed frame
    Record(TelemetryRecord),
    /// Malformed frame; the decoder is resynchronizing
    Rejected,
}

/// Ring-buffer backed decoder for the rover wire protocol
pub struct PacketDecoder {
    buffer: RingBuffer<4096>,
    wire: WireConfig,
    resyncing: bool,
}

impl PacketDecoder {
    pub fn new(wire: WireConfig) -> Self {
        Self {
            buffer: RingBuffer::new(),
            wire,
            resyncing: false,
        }
    }

    /// Append received bytes, returns how many fit
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        self.buffer.extend(bytes)
    }

    /// Free space for the next read
    pub fn free(&self) -> usize {
        self.buffer.free()
    }

    /// Bytes received but not yet decoded
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered bytes and any resynchronization in progress
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.resyncing = false;
    }

    /// Decode the next frame, `None` when more bytes are needed
    pub fn next_frame(&mut self) -> Option<Decoded> {
        if self.resyncing && !self.skip_to_terminator() {
            return None;
        }

        let head: [u8; SCAN_FRAME_LEN] = self.buffer.peek(0)?;
        let flag = self.wire.flag_byte;

        if head.iter().all(|&b| b == flag) {
            self.buffer.advance(SCAN_FRAME_LEN);
            return Some(Decoded::Record(TelemetryRecord::Ack(AckToken)));
        }

        if head[0] == flag && head[1] == flag {
            let frame: [u8; ENCODER_FRAME_LEN] = self.buffer.peek(0)?;
            self.buffer.advance(ENCODER_FRAME_LEN);
            let payload = [frame[2], frame[3], frame[4], frame[5], frame[6], frame[7]];
            return Some(Decoded::Record(TelemetryRecord::Encoder(
                EncoderSample::decode(payload),
            )));
        }

        self.buffer.advance(SCAN_FRAME_LEN);
        let point = ScanPoint::decode([head[0], head[1], head[2]], &self.wire);
        if head[3] == self.wire.terminator_byte && point.is_valid(&self.wire) {
            Some(Decoded::Record(TelemetryRecord::Scan(point)))
        } else {
            log::trace!("Rejected frame {:02X?}", head);
            self.resyncing = true;
            Some(Decoded::Rejected)
        }
    }

    /// Discard up to and including the next terminator
    ///
    /// Returns false if the buffer ran dry before one was found.
    fn skip_to_terminator(&mut self) -> bool {
        while let Some(byte) = self.buffer.get(0) {
            self.buffer.advance(1);
            if byte == self.wire.terminator_byte {
                self.resyncing = false;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> PacketDecoder {
        PacketDecoder::new(WireConfig::default())
    }

    fn drain(decoder: &mut PacketDecoder) -> Vec<Decoded> {
        std::iter::from_fn(|| decoder.next_frame()).collect()
    }

    #[test]
    fn test_reference_scan_frame() {
        let mut dec = decoder();
        dec.extend(&[0x7D, 0x00, 0xB4, 0xFF]);
        assert_eq!(
            dec.next_frame(),
            Some(Decoded::Record(TelemetryRecord::Scan(ScanPoint::new(250.0, 360.0))))
        );
        assert_eq!(dec.buffered(), 0);
    }

    #[test]
    fn test_four_flags_are_ack() {
        let mut dec = decoder();
        dec.extend(&[0xFE; 4]);
        assert_eq!(
            dec.next_frame(),
            Some(Decoded::Record(TelemetryRecord::Ack(AckToken)))
        );
    }

    #[test]
    fn test_encoder_frame() {
        let mut dec = decoder();
        dec.extend(&[0xFE, 0xFE, 0x10, 0x00, 0xF0, 0xFF, 0xE8, 0x03]);
        assert_eq!(
            dec.next_frame(),
            Some(Decoded::Record(TelemetryRecord::Encoder(EncoderSample::new(
                16, -16, 1000
            ))))
        );
    }

    #[test]
    fn test_split_frames_decode_incrementally() {
        let wire = WireConfig::default();
        let mut dec = decoder();
        let encoder = EncoderSample::new(5, 6, 7).encode(&wire);

        dec.extend(&encoder[..3]);
        assert_eq!(dec.next_frame(), None);
        dec.extend(&encoder[3..6]);
        assert_eq!(dec.next_frame(), None);
        dec.extend(&encoder[6..]);
        assert_eq!(
            dec.next_frame(),
            Some(Decoded::Record(TelemetryRecord::Encoder(EncoderSample::new(5, 6, 7))))
        );

        dec.extend(&[0x7D, 0x00]);
        assert_eq!(dec.next_frame(), None);
        dec.extend(&[0xB4, 0xFF]);
        assert!(matches!(
            dec.next_frame(),
            Some(Decoded::Record(TelemetryRecord::Scan(_)))
        ));
    }

    #[test]
    fn test_resync_after_garbage() {
        let wire = WireConfig::default();
        let mut dec = decoder();
        let good = ScanPoint::new(1000.0, 90.0).encode(&wire);

        // Garbage without a terminator, then a terminator, then a good frame
        dec.extend(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xFF]);
        dec.extend(&good);

        let frames = drain(&mut dec);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Decoded::Rejected);
        match frames[1] {
            Decoded::Record(TelemetryRecord::Scan(point)) => {
                assert_eq!(point.distance_mm, 1000.0);
                assert_eq!(point.angle_deg, 90.0);
            }
            other => panic!("expected scan point, got {:?}", other),
        }
    }

    #[test]
    fn test_resync_survives_split_reads() {
        let wire = WireConfig::default();
        let mut dec = decoder();

        dec.extend(&[0x00, 0x00, 0x00, 0x00, 0x11]);
        assert_eq!(dec.next_frame(), Some(Decoded::Rejected));
        assert_eq!(dec.next_frame(), None);

        dec.extend(&[0x22, 0xFF]);
        dec.extend(&ScanPoint::new(300.0, 45.0).encode(&wire));
        assert!(matches!(
            dec.next_frame(),
            Some(Decoded::Record(TelemetryRecord::Scan(_)))
        ));
    }

    #[test]
    fn test_out_of_range_point_is_rejected() {
        let wire = WireConfig::default();
        let mut dec = decoder();
        // 50mm is inside the wire format but below the lidar's range
        dec.extend(&ScanPoint::new(50.0, 10.0).encode(&wire));
        assert_eq!(dec.next_frame(), Some(Decoded::Rejected));
    }

    #[test]
    fn test_clear_resets_resync() {
        let wire = WireConfig::default();
        let mut dec = decoder();
        dec.extend(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(dec.next_frame(), Some(Decoded::Rejected));

        dec.clear();
        dec.extend(&ScanPoint::new(300.0, 45.0).encode(&wire));
        assert!(matches!(
            dec.next_frame(),
            Some(Decoded::Record(TelemetryRecord::Scan(_)))
        ));
    }
}
