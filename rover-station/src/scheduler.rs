//! Cooperative scheduling of the station's periodic tasks.
//!
//! Each task keeps its own interval; the station loop polls every task and
//! runs the due ones to completion, one after the other.

use std::time::{Duration, Instant};

/// Fixed-interval task timer
#[derive(Debug, Clone)]
pub struct Periodic {
    interval: Duration,
    last: Option<Instant>,
}

impl Periodic {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True on the first poll and once per interval after that
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Make the next poll due immediately
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_once_per_interval() {
        let mut task = Periodic::from_millis(100);
        let start = Instant::now();

        assert!(task.due(start));
        assert!(!task.due(start + Duration::from_millis(50)));
        assert!(task.due(start + Duration::from_millis(100)));
        assert!(!task.due(start + Duration::from_millis(150)));
        assert!(task.due(start + Duration::from_millis(230)));
    }

    #[test]
    fn test_reset_makes_due() {
        let mut task = Periodic::from_millis(500);
        let start = Instant::now();
        assert!(task.due(start));
        task.reset();
        assert!(task.due(start + Duration::from_millis(1)));
    }
}
