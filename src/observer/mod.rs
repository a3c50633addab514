//! Read-only recording of a run for the reporting boundary.
//!
//! Everything here is display bookkeeping: the closed loop feeds the record
//! one sample per step and nothing flows back into learning. Snapshotting
//! is on-demand and may allocate; the hot loop only appends.

use crate::arm::{ArmPose, Point2};

/// Decay of the short display smooths over outputs and positions.
const OUT_KEEP: f64 = 0.8;
const OUT_BLEND: f64 = 0.2;

/// Decay of the long cost smoother. Far slower than the learning rule's
/// baseline; the two must not be confused.
const COST_KEEP: f64 = 0.9998;
const COST_BLEND: f64 = 0.0002;

/// Per-step arrays for one run, preallocated to the full step count and
/// appended to exactly once per step.
#[derive(Debug, Clone)]
pub struct RunRecord {
    outputs: Vec<[f64; 3]>,
    poses: Vec<ArmPose>,
    distance_sq: Vec<f64>,
    effort: Vec<f64>,
    cost: Vec<f64>,
    // Zero on testing steps; see `w_norm_filled`.
    w_norm: Vec<f64>,

    z_out: Vec<[f64; 3]>,
    pos_out: Vec<Point2>,
    cost_smooth: Vec<f64>,
}

impl RunRecord {
    pub fn new(total_steps: usize) -> Self {
        Self {
            outputs: Vec::with_capacity(total_steps),
            poses: Vec::with_capacity(total_steps),
            distance_sq: Vec::with_capacity(total_steps),
            effort: Vec::with_capacity(total_steps),
            cost: Vec::with_capacity(total_steps),
            w_norm: Vec::with_capacity(total_steps),
            z_out: Vec::with_capacity(total_steps),
            pos_out: Vec::with_capacity(total_steps),
            cost_smooth: Vec::with_capacity(total_steps),
        }
    }

    /// Append one step. The running smooths update incrementally; their
    /// first sample is the raw value.
    pub fn push(
        &mut self,
        z: [f64; 3],
        pose: ArmPose,
        distance_sq: f64,
        effort: f64,
        cost: f64,
        w_norm: f64,
    ) {
        let z_s = match self.z_out.last() {
            Some(prev) => [
                OUT_KEEP * prev[0] + OUT_BLEND * z[0],
                OUT_KEEP * prev[1] + OUT_BLEND * z[1],
                OUT_KEEP * prev[2] + OUT_BLEND * z[2],
            ],
            None => z,
        };
        let pos_s = match self.pos_out.last() {
            Some(prev) => Point2::new(
                OUT_KEEP * prev.x + OUT_BLEND * pose.end.x,
                OUT_KEEP * prev.y + OUT_BLEND * pose.end.y,
            ),
            None => pose.end,
        };
        let cost_s = match self.cost_smooth.last() {
            Some(prev) => COST_KEEP * prev + COST_BLEND * cost,
            None => cost,
        };

        self.outputs.push(z);
        self.poses.push(pose);
        self.distance_sq.push(distance_sq);
        self.effort.push(effort);
        self.cost.push(cost);
        self.w_norm.push(w_norm);
        self.z_out.push(z_s);
        self.pos_out.push(pos_s);
        self.cost_smooth.push(cost_s);
    }

    pub fn len(&self) -> usize {
        self.cost.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cost.is_empty()
    }

    /// Raw joint-angle outputs, one triple per step.
    pub fn outputs(&self) -> &[[f64; 3]] {
        &self.outputs
    }

    pub fn poses(&self) -> &[ArmPose] {
        &self.poses
    }

    /// Squared end-effector distance to the target, per step.
    pub fn distance_sq(&self) -> &[f64] {
        &self.distance_sq
    }

    /// Effort component of the cost, per step.
    pub fn effort(&self) -> &[f64] {
        &self.effort
    }

    /// Total instantaneous cost, per step.
    pub fn cost(&self) -> &[f64] {
        &self.cost
    }

    /// Readout norm as recorded: zero on testing steps.
    pub fn w_norm_raw(&self) -> &[f64] {
        &self.w_norm
    }

    /// Readout norm with zero-fill-forward: a recorded zero takes the
    /// previous value, giving a continuous curve across the testing phase.
    pub fn w_norm_filled(&self) -> Vec<f64> {
        let mut out = self.w_norm.clone();
        for i in 1..out.len() {
            if out[i] == 0.0 {
                out[i] = out[i - 1];
            }
        }
        out
    }

    pub fn smoothed_outputs(&self) -> &[[f64; 3]] {
        &self.z_out
    }

    pub fn smoothed_positions(&self) -> &[Point2] {
        &self.pos_out
    }

    pub fn smoothed_cost(&self) -> &[f64] {
        &self.cost_smooth
    }

    /// Mean total cost over one recorded trial. Zero for a trial not yet
    /// recorded.
    pub fn trial_mean_cost(&self, trial: usize, steps_per_trial: usize) -> f64 {
        let start = trial * steps_per_trial;
        let end = (start + steps_per_trial).min(self.cost.len());
        if start >= end {
            return 0.0;
        }
        let slice = &self.cost[start..end];
        slice.iter().sum::<f64>() / slice.len() as f64
    }

    /// On-demand summary for the reporting boundary.
    pub fn snapshot(&self, steps_per_trial: usize, train_trials: usize) -> RunSnapshot {
        let train_steps = (train_trials * steps_per_trial).min(self.cost.len());
        let mean = |slice: &[f64]| {
            if slice.is_empty() {
                0.0
            } else {
                slice.iter().sum::<f64>() / slice.len() as f64
            }
        };
        let final_w_norm = self.w_norm_filled().last().copied().unwrap_or(0.0);

        RunSnapshot {
            steps: self.len(),
            trials_completed: if steps_per_trial == 0 {
                0
            } else {
                self.len() / steps_per_trial
            },
            final_w_norm,
            mean_training_cost: mean(&self.cost[..train_steps]),
            mean_testing_cost: mean(&self.cost[train_steps..]),
        }
    }
}

/// Read-only run summary. Observers cannot mutate or steer the run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSnapshot {
    pub steps: usize,
    pub trials_completed: usize,
    pub final_w_norm: f64,
    pub mean_training_cost: f64,
    /// Zero when the testing phase is empty.
    pub mean_testing_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmGeometry;

    fn push_cost(record: &mut RunRecord, cost: f64, w_norm: f64) {
        let pose = ArmGeometry::default().forward(&[0.0; 3]);
        record.push([0.0; 3], pose, cost, 0.0, cost, w_norm);
    }

    #[test]
    fn short_smooth_matches_closed_form() {
        let mut record = RunRecord::new(4);
        let pose = ArmGeometry::default().forward(&[0.0; 3]);
        let zs = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [2.0, 2.0, 2.0]];
        for z in zs {
            record.push(z, pose, 0.0, 0.0, 0.0, 0.0);
        }

        let mut expected = zs[0];
        for (i, z) in zs.iter().enumerate() {
            if i > 0 {
                for k in 0..3 {
                    expected[k] = 0.8 * expected[k] + 0.2 * z[k];
                }
            }
            for k in 0..3 {
                assert!((record.smoothed_outputs()[i][k] - expected[k]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn long_smooth_matches_closed_form() {
        let mut record = RunRecord::new(3);
        for cost in [2.0, 4.0, 1.0] {
            push_cost(&mut record, cost, 0.1);
        }
        let s1 = 2.0;
        let s2 = 0.9998 * s1 + 0.0002 * 4.0;
        let s3 = 0.9998 * s2 + 0.0002 * 1.0;
        assert!((record.smoothed_cost()[0] - s1).abs() < 1e-12);
        assert!((record.smoothed_cost()[1] - s2).abs() < 1e-12);
        assert!((record.smoothed_cost()[2] - s3).abs() < 1e-12);
    }

    #[test]
    fn norm_zero_fill_forward() {
        let mut record = RunRecord::new(5);
        for w in [0.5, 0.7, 0.0, 0.0, 0.0] {
            push_cost(&mut record, 1.0, w);
        }
        assert_eq!(record.w_norm_raw()[2], 0.0);
        let filled = record.w_norm_filled();
        assert_eq!(filled, vec![0.5, 0.7, 0.7, 0.7, 0.7]);
    }

    #[test]
    fn snapshot_splits_phase_means() {
        let mut record = RunRecord::new(6);
        for cost in [2.0, 2.0, 2.0, 1.0, 1.0, 1.0] {
            push_cost(&mut record, cost, 0.3);
        }
        let snap = record.snapshot(3, 1);
        assert_eq!(snap.steps, 6);
        assert_eq!(snap.trials_completed, 2);
        assert!((snap.mean_training_cost - 2.0).abs() < 1e-12);
        assert!((snap.mean_testing_cost - 1.0).abs() < 1e-12);
        assert!((snap.final_w_norm - 0.3).abs() < 1e-12);
    }

    #[test]
    fn snapshot_with_empty_testing_phase() {
        let mut record = RunRecord::new(3);
        for cost in [1.0, 2.0, 3.0] {
            push_cost(&mut record, cost, 0.2);
        }
        let snap = record.snapshot(3, 1);
        assert!((snap.mean_training_cost - 2.0).abs() < 1e-12);
        assert_eq!(snap.mean_testing_cost, 0.0);
    }

    #[test]
    fn trial_mean_cost_handles_partial_trials() {
        let mut record = RunRecord::new(4);
        for cost in [1.0, 3.0, 5.0] {
            push_cost(&mut record, cost, 0.0);
        }
        assert!((record.trial_mean_cost(0, 2) - 2.0).abs() < 1e-12);
        assert!((record.trial_mean_cost(1, 2) - 5.0).abs() < 1e-12);
        assert_eq!(record.trial_mean_cost(2, 2), 0.0);
    }
}
