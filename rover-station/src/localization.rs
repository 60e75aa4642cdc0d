//! Pose estimation boundary and the session-relative pose adapter.
//!
//! The estimator is a black box behind [`PoseEstimator`]: it gets the
//! observation vector and the motion since the last cycle and answers with a
//! pose in its own axis convention, where the first axis points forward
//! (bearing 0) and the second across (bearing +90). The station's map uses
//! the opposite order, `x` across and `y` forward, so the adapter swaps the
//! two back and reports every pose relative to the session's first one.

use crate::aggregator::{ObservationVector, ScanCycle};
use crate::odometry::MotionDelta;
use rover_link::DriveGeometry;
use std::ops::Sub;

/// Robot pose in the map frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Across (bearing +90) [mm]
    pub x_mm: f32,
    /// Forward (bearing 0) [mm]
    pub y_mm: f32,
    /// Heading [deg], positive clockwise
    pub theta_deg: f32,
}

impl Pose {
    pub fn new(x_mm: f32, y_mm: f32, theta_deg: f32) -> Self {
        Self {
            x_mm,
            y_mm,
            theta_deg,
        }
    }
}

impl Sub for Pose {
    type Output = Pose;

    fn sub(self, origin: Pose) -> Pose {
        Pose {
            x_mm: self.x_mm - origin.x_mm,
            y_mm: self.y_mm - origin.y_mm,
            theta_deg: self.theta_deg - origin.theta_deg,
        }
    }
}

/// Pose in the estimator's own axis convention
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EstimatorPose {
    /// Along bearing 0 [mm]
    pub forward_mm: f32,
    /// Along bearing +90 [mm]
    pub across_mm: f32,
    /// Heading [deg], positive clockwise
    pub theta_deg: f32,
}

/// Stateful pose estimator
pub trait PoseEstimator: Send {
    /// Fold in one scan cycle and return the new pose
    fn update(&mut self, observation: &ObservationVector, motion: &MotionDelta) -> EstimatorPose;

    /// Forget everything, as for a freshly created estimator
    fn reset(&mut self);
}

/// Integrates wheel motion, ignores the scan.
///
/// Stands in for a scan-matching localizer; each step moves along the mean of
/// the old and new heading.
#[derive(Debug, Default)]
pub struct DeadReckoning {
    pose: EstimatorPose,
}

impl DeadReckoning {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PoseEstimator for DeadReckoning {
    fn update(&mut self, _observation: &ObservationVector, motion: &MotionDelta) -> EstimatorPose {
        let heading = (self.pose.theta_deg + motion.dtheta_deg / 2.0).to_radians();
        self.pose.forward_mm += motion.dxy_mm * heading.cos();
        self.pose.across_mm += motion.dxy_mm * heading.sin();
        self.pose.theta_deg += motion.dtheta_deg;
        self.pose
    }

    fn reset(&mut self) {
        self.pose = EstimatorPose::default();
    }
}

/// Result of localizing one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Localized {
    /// Session-relative pose
    pub pose: Pose,
    /// Motion fed to the estimator
    pub motion: MotionDelta,
}

/// Drives the estimator and converts its answers to session poses
pub struct LocalizationAdapter {
    estimator: Box<dyn PoseEstimator>,
    drive: DriveGeometry,
    origin: Option<Pose>,
}

impl LocalizationAdapter {
    pub fn new(estimator: Box<dyn PoseEstimator>, drive: DriveGeometry) -> Self {
        Self {
            estimator,
            drive,
            origin: None,
        }
    }

    /// Localize one cycle; the first pose of a session becomes its origin
    pub fn update(&mut self, cycle: &ScanCycle) -> Localized {
        let motion = MotionDelta::between(&cycle.previous, &cycle.current, &self.drive);
        let raw = self.estimator.update(&cycle.observation, &motion);

        let pose = Pose::new(raw.across_mm, raw.forward_mm, raw.theta_deg);
        let origin = *self.origin.get_or_insert(pose);

        Localized {
            pose: pose - origin,
            motion,
        }
    }

    pub fn origin(&self) -> Option<Pose> {
        self.origin
    }

    /// Start a new session
    pub fn reset(&mut self) {
        self.origin = None;
        self.estimator.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rover_link::EncoderSample;

    /// Replays scripted poses
    struct Scripted {
        poses: Vec<EstimatorPose>,
        next: usize,
    }

    impl PoseEstimator for Scripted {
        fn update(&mut self, _: &ObservationVector, _: &MotionDelta) -> EstimatorPose {
            let pose = self.poses[self.next.min(self.poses.len() - 1)];
            self.next += 1;
            pose
        }

        fn reset(&mut self) {
            self.next = 0;
        }
    }

    fn cycle(previous: EncoderSample, current: EncoderSample) -> ScanCycle {
        ScanCycle {
            observation: ObservationVector::new(),
            previous,
            current,
            records: 0,
            discarded: 0,
        }
    }

    #[test]
    fn test_origin_subtraction_and_axis_swap() {
        let estimator = Scripted {
            poses: vec![
                EstimatorPose { forward_mm: 4000.0, across_mm: 3000.0, theta_deg: 10.0 },
                EstimatorPose { forward_mm: 4100.0, across_mm: 2950.0, theta_deg: 25.0 },
            ],
            next: 0,
        };
        let mut adapter = LocalizationAdapter::new(Box::new(estimator), DriveGeometry::default());
        let still = cycle(EncoderSample::default(), EncoderSample::default());

        let first = adapter.update(&still);
        assert_eq!(first.pose, Pose::default());
        assert_eq!(adapter.origin(), Some(Pose::new(3000.0, 4000.0, 10.0)));

        let second = adapter.update(&still);
        assert_relative_eq!(second.pose.x_mm, -50.0);
        assert_relative_eq!(second.pose.y_mm, 100.0);
        assert_relative_eq!(second.pose.theta_deg, 15.0);

        adapter.reset();
        assert_eq!(adapter.origin(), None);
        assert_eq!(adapter.update(&still).pose, Pose::default());
    }

    #[test]
    fn test_motion_passed_to_estimator() {
        let mut adapter =
            LocalizationAdapter::new(Box::new(DeadReckoning::new()), DriveGeometry::default());
        let drive = DriveGeometry::default();

        adapter.update(&cycle(EncoderSample::new(0, 0, 0), EncoderSample::new(0, 0, 0)));
        let moved = adapter.update(&cycle(
            EncoderSample::new(0, 0, 0),
            EncoderSample::new(1000, 1000, 500),
        ));

        let expected = 1000.0 * drive.ticks_to_mm();
        assert_relative_eq!(moved.motion.dxy_mm, expected, epsilon = 1e-3);
        assert_relative_eq!(moved.motion.dt_s, 0.5);
        // Heading 0 is forward: straight up the map
        assert_relative_eq!(moved.pose.x_mm, 0.0, epsilon = 1e-3);
        assert_relative_eq!(moved.pose.y_mm, expected, epsilon = 1e-3);
    }

    #[test]
    fn test_dead_reckoning_turn_then_drive() {
        let mut estimator = DeadReckoning::new();
        let observation = ObservationVector::new();

        estimator.update(&observation, &MotionDelta { dxy_mm: 0.0, dtheta_deg: 90.0, dt_s: 0.1 });
        let pose =
            estimator.update(&observation, &MotionDelta { dxy_mm: 100.0, dtheta_deg: 0.0, dt_s: 0.1 });

        // Clockwise quarter turn faces bearing +90
        assert_relative_eq!(pose.across_mm, 100.0, epsilon = 1e-3);
        assert_relative_eq!(pose.forward_mm, 0.0, epsilon = 1e-3);
        assert_relative_eq!(pose.theta_deg, 90.0);
    }
}
