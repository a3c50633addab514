use crate::prng::RandomSource;

/// Fixed random recurrent fabric plus its mutable state.
///
/// The connectivity `j` and the feedback projection `q` are generated once
/// and never change afterwards; all learning happens in the readout. State
/// `x` follows a leaky-integrator update and `r = tanh(x)` is what the rest
/// of the system sees.
#[derive(Debug, Clone)]
pub struct Reservoir {
    units: usize,
    // Row-major N x N couplings.
    j: Vec<f64>,
    // Row-major N x 3 feedback weights.
    q: Vec<f64>,
    x: Vec<f64>,
    r: Vec<f64>,
}

impl Reservoir {
    /// Build the fabric from one seeded generator.
    ///
    /// Draw order is fixed: initial state first, then the connectivity
    /// sweep in row-major order (one uniform per candidate entry, two more
    /// per realized entry), then the feedback projection row-major.
    ///
    /// Couplings are Gaussian at sigma = instability / sqrt(p * N), which
    /// puts the spectral radius of `j` near the instability factor.
    pub fn generate<R: RandomSource>(
        units: usize,
        connection_prob: f64,
        instability: f64,
        rng: &mut R,
    ) -> Self {
        let mut x = Vec::with_capacity(units);
        for _ in 0..units {
            x.push(rng.uniform(-0.5, 0.5));
        }

        let sigma = instability / (connection_prob * units as f64).sqrt();
        let mut j = vec![0.0; units * units];
        for slot in j.iter_mut() {
            if rng.next_f64() < connection_prob {
                *slot = sigma * rng.next_gaussian();
            }
        }

        let mut q = Vec::with_capacity(units * 3);
        for _ in 0..units * 3 {
            q.push(rng.uniform(-1.0, 1.0));
        }

        let r = x.iter().map(|v| v.tanh()).collect();
        Self { units, j, q, x, r }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Unit outputs after the nonlinearity (and any exploration noise).
    pub fn activity(&self) -> &[f64] {
        &self.r
    }

    /// One Euler step of the leaky integrator, `leak` = dt/tau:
    ///
    ///   x += leak * (-x + J r_prev + Q feedback)
    ///   r  = tanh(x)
    ///
    /// The recurrent drive reads the previous step's `r`; the nonlinearity
    /// is applied only after every membrane has been updated.
    pub fn advance(&mut self, feedback: &[f64; 3], leak: f64) {
        for i in 0..self.units {
            let row = &self.j[i * self.units..(i + 1) * self.units];
            let mut drive = 0.0;
            for (w, rj) in row.iter().zip(self.r.iter()) {
                drive += w * rj;
            }
            let qrow = &self.q[i * 3..i * 3 + 3];
            drive += qrow[0] * feedback[0] + qrow[1] * feedback[1] + qrow[2] * feedback[2];
            self.x[i] += leak * (-self.x[i] + drive);
        }
        for i in 0..self.units {
            self.r[i] = self.x[i].tanh();
        }
    }

    /// Additive exploration noise on the unit outputs, one bounded draw per
    /// unit. Draws happen even at zero half-width so the generator stream
    /// stays aligned step to step.
    pub fn perturb<R: RandomSource>(&mut self, rng: &mut R, half_width: f64) {
        for r in self.r.iter_mut() {
            *r += rng.symmetric(half_width);
        }
    }

    /// Largest membrane magnitude, for the stability check.
    pub fn max_magnitude(&self) -> f64 {
        self.x.iter().fold(0.0, |m: f64, v| m.max(v.abs()))
    }

    /// True when any membrane potential stopped being a finite number.
    pub fn is_degenerate(&self) -> bool {
        self.x.iter().any(|v| !v.is_finite())
    }
}
