use core::f64::consts::TAU;

use crate::arm::Point2;

/// A closed parametric curve the end-effector should trace.
///
/// `phase` is trial-relative in [0, 1); one trial covers the full curve,
/// and every trial presents the same curve again.
pub trait TargetCurve {
    fn sample(&self, phase: f64) -> Point2;
}

/// Axis-aligned ellipse.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ellipse {
    pub center: Point2,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl Default for Ellipse {
    fn default() -> Self {
        // Sits inside the default arm's reachable annulus.
        Self {
            center: Point2::new(0.0, 0.2),
            radius_x: 1.2,
            radius_y: 0.8,
        }
    }
}

impl TargetCurve for Ellipse {
    fn sample(&self, phase: f64) -> Point2 {
        let theta = TAU * phase;
        Point2::new(
            self.center.x + self.radius_x * theta.cos(),
            self.center.y + self.radius_y * theta.sin(),
        )
    }
}

/// Rose curve, r = amplitude * cos(petals * theta).
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rose {
    pub center: Point2,
    pub amplitude: f64,
    pub petals: u32,
}

impl Default for Rose {
    fn default() -> Self {
        Self {
            center: Point2::new(0.0, 0.2),
            amplitude: 1.0,
            petals: 3,
        }
    }
}

impl TargetCurve for Rose {
    fn sample(&self, phase: f64) -> Point2 {
        let theta = TAU * phase;
        let r = self.amplitude * (self.petals as f64 * theta).cos();
        Point2::new(
            self.center.x + r * theta.cos(),
            self.center.y + r * theta.sin(),
        )
    }
}

/// Precompute one trial of samples. The simulation indexes the result
/// modulo the trial length, tiling the same curve across every trial.
pub fn sample_trial(curve: &dyn TargetCurve, steps: usize) -> Vec<Point2> {
    (0..steps)
        .map(|k| curve.sample(k as f64 / steps as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmGeometry;

    #[test]
    fn ellipse_starts_on_major_axis() {
        let e = Ellipse::default();
        let p = e.sample(0.0);
        assert!((p.x - (e.center.x + e.radius_x)).abs() < 1e-12);
        assert!((p.y - e.center.y).abs() < 1e-12);
    }

    #[test]
    fn sample_trial_covers_one_period() {
        let e = Ellipse::default();
        let samples = sample_trial(&e, 100);
        assert_eq!(samples.len(), 100);
        assert_eq!(samples[0], e.sample(0.0));
        // The last sample stops short of wrapping back onto the first.
        assert_ne!(samples[99], samples[0]);
    }

    #[test]
    fn default_curves_stay_reachable() {
        let arm = ArmGeometry::default();
        let reach = arm.reach();
        for curve in [
            &Ellipse::default() as &dyn TargetCurve,
            &Rose::default() as &dyn TargetCurve,
        ] {
            for p in sample_trial(curve, 256) {
                let d = p.distance_sq(&arm.base).sqrt();
                assert!(d <= reach, "target point {:?} outside reach", p);
            }
        }
    }

    #[test]
    fn rose_bounded_by_amplitude() {
        let r = Rose::default();
        for p in sample_trial(&r, 256) {
            let d = p.distance_sq(&r.center).sqrt();
            assert!(d <= r.amplitude + 1e-12);
        }
    }
}
