//! Scan aggregation
//!
//! Drains one scan cycle worth of records from the telemetry queue and folds
//! the scan points into a fixed 361-bin observation vector, one bin per whole
//! degree `0..=360`. Encoder samples arriving in the cycle update the current
//! wheel state; the sample current at the end of the previous cycle becomes
//! the previous one, so each cycle yields one bracketing pair.

use rover_link::{EncoderSample, ScanPoint, TelemetryReceiver, TelemetryRecord};
use std::time::{Duration, Instant};

/// Bins of the observation vector
pub const OBSERVATION_BINS: usize = 361;

/// Value of a bin without a return
pub const NO_DATA: f32 = 0.0;

/// Distance per whole degree of bearing [mm]
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationVector {
    bins: [f32; OBSERVATION_BINS],
}

impl ObservationVector {
    pub fn new() -> Self {
        Self {
            bins: [NO_DATA; OBSERVATION_BINS],
        }
    }

    /// Fold a scan point into its bin
    ///
    /// An empty bin takes the distance, a filled one the mean of the old
    /// value and the new distance. Returns false if the bearing rounds
    /// outside `0..=360`.
    pub fn add(&mut self, point: &ScanPoint) -> bool {
        let index = (point.angle_deg + 0.5).floor();
        if !(0.0..=360.0).contains(&index) {
            return false;
        }
        let bin = &mut self.bins[index as usize];
        *bin = if *bin == NO_DATA {
            point.distance_mm
        } else {
            (*bin + point.distance_mm) / 2.0
        };
        true
    }

    /// Distance at a whole-degree bearing, `NO_DATA` if none
    pub fn get(&self, angle_deg: usize) -> f32 {
        self.bins.get(angle_deg).copied().unwrap_or(NO_DATA)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filled() == 0
    }

    /// Bins holding a distance
    pub fn filled(&self) -> usize {
        self.bins.iter().filter(|&&d| d != NO_DATA).count()
    }

    /// `(bearing_deg, distance_mm)` of every filled bin
    pub fn returns(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.bins
            .iter()
            .enumerate()
            .filter(|(_, d)| **d != NO_DATA)
            .map(|(angle, &d)| (angle as f32, d))
    }
}

impl Default for ObservationVector {
    fn default() -> Self {
        Self::new()
    }
}

/// One drained scan cycle
#[derive(Debug, Clone)]
pub struct ScanCycle {
    pub observation: ObservationVector,
    /// Encoder sample current at the end of the previous cycle
    pub previous: EncoderSample,
    /// Latest encoder sample of this cycle
    pub current: EncoderSample,
    /// Records drained
    pub records: usize,
    /// Scan points whose bin fell outside the vector
    pub discarded: usize,
}

/// Builds scan cycles from the telemetry queue
pub struct ScanAggregator {
    num_samp: usize,
    first_cycle_timeout: Duration,
    current: Option<EncoderSample>,
}

impl ScanAggregator {
    pub fn new(num_samp: usize, first_cycle_timeout: Duration) -> Self {
        Self {
            num_samp,
            first_cycle_timeout,
            current: None,
        }
    }

    /// A full cycle is queued, or this is the session's first run
    pub fn ready(&self, queue: &TelemetryReceiver, first_run: bool) -> bool {
        first_run || queue.len() > self.num_samp
    }

    /// Drain `num_samp` records into a cycle
    ///
    /// The whole first run is bounded by `first_cycle_timeout`; a silent or
    /// slow link gives a short cycle rather than a hang. The previous encoder
    /// sample of a first run equals the current one.
    pub fn drain_cycle(&mut self, queue: &TelemetryReceiver, first_run: bool) -> ScanCycle {
        let previous = self.current;
        let mut observation = ObservationVector::new();
        let mut records = 0;
        let mut discarded = 0;
        let deadline = Instant::now() + self.first_cycle_timeout;

        while records < self.num_samp {
            let record = if first_run {
                queue.pop_timeout(deadline.saturating_duration_since(Instant::now()))
            } else {
                queue.try_pop()
            };
            let Some(record) = record else {
                log::warn!(
                    "Scan cycle short: {} of {} records",
                    records,
                    self.num_samp
                );
                break;
            };
            records += 1;

            match record {
                TelemetryRecord::Scan(point) => {
                    if !observation.add(&point) {
                        discarded += 1;
                    }
                }
                TelemetryRecord::Encoder(sample) => self.current = Some(sample),
                TelemetryRecord::Ack(_) => {
                    log::trace!("Acknowledgment in telemetry queue ignored");
                }
            }
        }

        let current = self.current.unwrap_or_default();
        let previous = if first_run {
            current
        } else {
            previous.unwrap_or(current)
        };

        ScanCycle {
            observation,
            previous,
            current,
            records,
            discarded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rover_link::queue::telemetry_queue;

    #[test]
    fn test_vector_is_always_361_bins() {
        let vector = ObservationVector::new();
        assert_eq!(vector.len(), OBSERVATION_BINS);
        assert!(vector.is_empty());
        assert!(vector.as_slice().iter().all(|&d| d == NO_DATA));
    }

    #[test]
    fn test_bin_rounding_and_mean() {
        let mut vector = ObservationVector::new();
        assert!(vector.add(&ScanPoint::new(1000.0, 44.6)));
        assert!(vector.add(&ScanPoint::new(2000.0, 45.4)));
        assert!(vector.add(&ScanPoint::new(700.0, 359.6)));

        assert_relative_eq!(vector.get(45), 1500.0);
        assert_relative_eq!(vector.get(360), 700.0);
        assert_eq!(vector.get(44), NO_DATA);
        assert_eq!(vector.filled(), 2);
    }

    #[test]
    fn test_bearing_outside_vector_discarded() {
        let mut vector = ObservationVector::new();
        assert!(!vector.add(&ScanPoint::new(1000.0, 360.6)));
        assert!(!vector.add(&ScanPoint::new(1000.0, -0.6)));
        assert!(vector.is_empty());
    }

    #[test]
    fn test_drain_exactly_num_samp() {
        let (tx, rx) = telemetry_queue();
        for i in 0..15 {
            tx.push(TelemetryRecord::Scan(ScanPoint::new(500.0, i as f32)));
        }

        let mut aggregator = ScanAggregator::new(10, Duration::from_millis(5));
        assert!(aggregator.ready(&rx, false));

        let cycle = aggregator.drain_cycle(&rx, false);
        assert_eq!(cycle.records, 10);
        assert_eq!(cycle.observation.filled(), 10);
        assert_eq!(cycle.observation.len(), OBSERVATION_BINS);
        assert_eq!(rx.len(), 5);
        assert!(!aggregator.ready(&rx, false));
    }

    #[test]
    fn test_encoder_pair_brackets_cycles() {
        let (tx, rx) = telemetry_queue();
        let mut aggregator = ScanAggregator::new(3, Duration::from_millis(5));

        tx.push(TelemetryRecord::Encoder(EncoderSample::new(10, 10, 100)));
        tx.push(TelemetryRecord::Scan(ScanPoint::new(500.0, 1.0)));
        tx.push(TelemetryRecord::Encoder(EncoderSample::new(20, 25, 150)));
        let first = aggregator.drain_cycle(&rx, true);
        assert_eq!(first.current, EncoderSample::new(20, 25, 150));
        assert_eq!(first.previous, first.current);

        tx.push(TelemetryRecord::Scan(ScanPoint::new(500.0, 2.0)));
        tx.push(TelemetryRecord::Encoder(EncoderSample::new(40, 45, 200)));
        tx.push(TelemetryRecord::Scan(ScanPoint::new(500.0, 3.0)));
        let second = aggregator.drain_cycle(&rx, false);
        assert_eq!(second.previous, EncoderSample::new(20, 25, 150));
        assert_eq!(second.current, EncoderSample::new(40, 45, 200));
    }

    #[test]
    fn test_first_run_on_silent_link_is_short() {
        let (_tx, rx) = telemetry_queue();
        let mut aggregator = ScanAggregator::new(400, Duration::from_millis(2));
        assert!(aggregator.ready(&rx, true));

        let cycle = aggregator.drain_cycle(&rx, true);
        assert_eq!(cycle.records, 0);
        assert_eq!(cycle.observation.len(), OBSERVATION_BINS);
        assert_eq!(cycle.previous, cycle.current);
    }

    #[test]
    fn test_first_run_on_slow_link_is_bounded() {
        let (tx, rx) = telemetry_queue();
        let producer = std::thread::spawn(move || {
            for i in 0..50 {
                if !tx.push(TelemetryRecord::Scan(ScanPoint::new(1000.0, i as f32))) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        });

        // Every record arrives well inside the timeout, the cycle still ends
        let mut aggregator = ScanAggregator::new(400, Duration::from_millis(100));
        let start = Instant::now();
        let cycle = aggregator.drain_cycle(&rx, true);
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
        assert!(cycle.records > 0);
        assert!(cycle.records < 50);

        drop(rx);
        producer.join().unwrap();
    }
}
