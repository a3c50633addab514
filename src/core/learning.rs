// Reward-modulated Hebbian learning: the readout weights and the running
// traces that turn an instantaneous cost into a weight update without any
// gradient computation.

/// Decay of the short learning traces (`z_bar`, `cost_bar`).
const TRACE_KEEP: f64 = 0.8;
const TRACE_BLEND: f64 = 0.2;

/// Gain on the quarter-power reward modulation.
const MODULATION_GAIN: f64 = 5.0;

/// Annealing curve for the exploration half-width.
const ANNEAL_SCALE: f64 = 0.005;
const ANNEAL_GAIN: f64 = 10.0;

const QUARTER: f64 = 0.25;

/// Linear readout, the only learned parameters in the system.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    units: usize,
    // Row-major 3 x N.
    w: Vec<f64>,
}

impl Readout {
    pub fn zeros(units: usize) -> Self {
        Self {
            units,
            w: vec![0.0; 3 * units],
        }
    }

    /// z = W r.
    pub fn output(&self, r: &[f64]) -> [f64; 3] {
        let mut z = [0.0; 3];
        for (k, zk) in z.iter_mut().enumerate() {
            let row = &self.w[k * self.units..(k + 1) * self.units];
            *zk = row.iter().zip(r.iter()).map(|(w, rj)| w * rj).sum();
        }
        z
    }

    /// W += scale * (dz ⊗ r).
    pub fn rank_one_update(&mut self, scale: f64, dz: &[f64; 3], r: &[f64]) {
        for k in 0..3 {
            let row = &mut self.w[k * self.units..(k + 1) * self.units];
            let g = scale * dz[k];
            for (w, rj) in row.iter_mut().zip(r.iter()) {
                *w += g * rj;
            }
        }
    }

    /// Frobenius norm, recorded each training step as the weight-growth
    /// diagnostic. A stable run keeps it bounded.
    pub fn norm(&self) -> f64 {
        self.w.iter().map(|w| w * w).sum::<f64>().sqrt()
    }

    pub fn weights(&self) -> &[f64] {
        &self.w
    }
}

/// Running reward baselines and the annealed exploration magnitude.
///
/// Every training step blends the fresh output and cost into the traces;
/// the whole struct is left untouched for the testing phase, so reported
/// deviations stay continuous after learning stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardTraces {
    z_bar: [f64; 3],
    cost_bar: f64,
    beta: f64,
}

impl RewardTraces {
    pub fn new() -> Self {
        Self {
            z_bar: [0.0; 3],
            cost_bar: 0.0,
            beta: 0.0,
        }
    }

    /// Exploration half-width for both noise channels.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn z_bar(&self) -> [f64; 3] {
        self.z_bar
    }

    pub fn cost_bar(&self) -> f64 {
        self.cost_bar
    }

    /// Blend the output into its trace and return the deviation z - z_bar.
    pub fn track_output(&mut self, z: &[f64; 3]) -> [f64; 3] {
        let mut dz = [0.0; 3];
        for k in 0..3 {
            self.z_bar[k] = TRACE_KEEP * self.z_bar[k] + TRACE_BLEND * z[k];
            dz[k] = z[k] - self.z_bar[k];
        }
        dz
    }

    /// Deviation against the frozen trace, no update. Testing phase only.
    pub fn deviation(&self, z: &[f64; 3]) -> [f64; 3] {
        [
            z[0] - self.z_bar[0],
            z[1] - self.z_bar[1],
            z[2] - self.z_bar[2],
        ]
    }

    /// Blend the cost into the baseline and return the reward-prediction
    /// error, perf = -(cost - cost_bar). Positive means this step beat the
    /// recent baseline.
    pub fn track_cost(&mut self, cost: f64) -> f64 {
        self.cost_bar = TRACE_KEEP * self.cost_bar + TRACE_BLEND * cost;
        -(cost - self.cost_bar)
    }

    /// First-step initialization: the traces start at the observed values,
    /// so the first reward-prediction error is exactly zero.
    pub fn prime(&mut self, z: &[f64; 3], cost: f64) {
        self.z_bar = *z;
        self.cost_bar = cost;
        self.anneal();
    }

    /// beta = 0.005 * (10 * cost_bar)^(1/4).
    ///
    /// The argument is clamped at zero before exponentiation; a baseline
    /// pushed negative by floating error must not escape as a NaN.
    pub fn anneal(&mut self) {
        self.beta = ANNEAL_SCALE * (ANNEAL_GAIN * self.cost_bar).max(0.0).powf(QUARTER);
    }
}

impl Default for RewardTraces {
    fn default() -> Self {
        Self::new()
    }
}

/// Scalar multiplier for the three-factor update.
///
/// The modulation magnitude is -|perf|^(1/4) in both branches; only the
/// sign applied to the weight step flips with the sign of the
/// reward-prediction error.
pub fn reward_modulation(perf: f64) -> f64 {
    let modulation = -perf.abs().powf(QUARTER);
    if perf >= 0.0 {
        -MODULATION_GAIN * modulation
    } else {
        MODULATION_GAIN * modulation
    }
}

/// Effort term of the instantaneous cost: per-joint weighted deviation
/// from the smoothed output.
pub fn effort_cost(dz: &[f64; 3], weights: &[f64; 3]) -> f64 {
    dz.iter().zip(weights.iter()).map(|(d, w)| w * d.abs()).sum()
}
