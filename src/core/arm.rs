use core::f64::consts::PI;

/// 2D point shared by the arm model and the target curves.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Three-segment planar arm anchored below the workspace.
///
/// Joint angles are in half-turns: an output of 1.0 rotates a joint by pi
/// radians. Angles accumulate along the chain, so each segment is oriented
/// relative to the one before it.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmGeometry {
    pub base: Point2,
    pub lengths: [f64; 3],
}

impl Default for ArmGeometry {
    fn default() -> Self {
        Self {
            base: Point2::new(0.0, -2.0),
            lengths: [1.8, 1.2, 0.6],
        }
    }
}

/// Pivot and end-effector positions for one set of joint angles.
#[derive(Debug, Clone, Copy)]
pub struct ArmPose {
    pub pivot1: Point2,
    pub pivot2: Point2,
    pub end: Point2,
}

impl ArmGeometry {
    /// Forward kinematics. Pure; no state.
    pub fn forward(&self, angles: &[f64; 3]) -> ArmPose {
        let a1 = PI * angles[0];
        let a2 = PI * (angles[0] + angles[1]);
        let a3 = PI * (angles[0] + angles[1] + angles[2]);

        let pivot1 = Point2::new(
            self.base.x + self.lengths[0] * a1.sin(),
            self.base.y + self.lengths[0] * a1.cos(),
        );
        let pivot2 = Point2::new(
            pivot1.x + self.lengths[1] * a2.sin(),
            pivot1.y + self.lengths[1] * a2.cos(),
        );
        let end = Point2::new(
            pivot2.x + self.lengths[2] * a3.sin(),
            pivot2.y + self.lengths[2] * a3.cos(),
        );

        ArmPose { pivot1, pivot2, end }
    }

    /// Maximum base-to-end reach.
    pub fn reach(&self) -> f64 {
        self.lengths.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn rest_pose_points_straight_up() {
        let arm = ArmGeometry::default();
        let pose = arm.forward(&[0.0, 0.0, 0.0]);
        assert!((pose.end.x - 0.0).abs() < EPS);
        assert!((pose.end.y - 1.6).abs() < EPS);
    }

    #[test]
    fn half_turn_spot_check() {
        // z = (0.5, 0.5, 0.5): joint 1 at pi/2, joint 2 folds back, joint 3
        // points down. Hand-computed chain.
        let arm = ArmGeometry::default();
        let pose = arm.forward(&[0.5, 0.5, 0.5]);
        assert!((pose.pivot1.x - 1.8).abs() < EPS);
        assert!((pose.pivot1.y - -2.0).abs() < EPS);
        assert!((pose.pivot2.x - 1.8).abs() < EPS);
        assert!((pose.pivot2.y - -3.2).abs() < EPS);
        assert!((pose.end.x - 1.2).abs() < EPS);
        assert!((pose.end.y - -3.2).abs() < EPS);
    }

    #[test]
    fn segment_lengths_preserved() {
        let arm = ArmGeometry::default();
        let pose = arm.forward(&[0.31, -0.12, 0.77]);
        let seg1 = pose.pivot1.distance_sq(&arm.base).sqrt();
        let seg2 = pose.pivot2.distance_sq(&pose.pivot1).sqrt();
        let seg3 = pose.end.distance_sq(&pose.pivot2).sqrt();
        assert!((seg1 - 1.8).abs() < 1e-9);
        assert!((seg2 - 1.2).abs() < 1e-9);
        assert!((seg3 - 0.6).abs() < 1e-9);
    }

    #[test]
    fn reach_is_total_length() {
        assert!((ArmGeometry::default().reach() - 3.6).abs() < EPS);
    }
}
