use tracing::{debug, info, warn};

use crate::arm::{ArmGeometry, Point2};
use crate::learning::{effort_cost, reward_modulation, Readout, RewardTraces};
use crate::observer::RunRecord;
use crate::prng::{Prng, RandomSource};
use crate::substrate::Reservoir;
use crate::target::{sample_trial, TargetCurve};

/// Membrane magnitude beyond which the run is declared unstable.
const DIVERGENCE_LIMIT: f64 = 1e6;

/// Testing-phase feedback is the network's own output from this many
/// trials earlier, replayed open loop.
const REPLAY_LOOKBACK_TRIALS: usize = 5;

/// Simulation phase, derived from the step index alone. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Step 0 only: first forward pass, traces primed, no weight update.
    Bootstrap,
    /// Exploration noise on, learning on, feedback from the previous step.
    Training,
    /// Noise off, readout frozen, feedback replayed from recorded history.
    Testing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Reservoir units.
    pub units: usize,
    /// Connection probability inside the reservoir, in (0, 1].
    pub connection_prob: f64,
    /// Target spectral radius of the connectivity. Above 1 the fabric is
    /// unstable without feedback.
    pub instability: f64,
    pub steps_per_trial: usize,
    /// Total trials, training plus testing.
    pub trials: usize,
    /// Leading trials run with exploration and learning. May equal
    /// `trials`, which leaves the testing phase empty.
    pub train_trials: usize,
    pub learning_rate: f64,
    /// Per-joint weights on the effort term of the cost.
    pub effort_weights: [f64; 3],
    /// Integration step and reservoir time constant; the leak is dt/tau.
    pub dt: f64,
    pub tau: f64,
    /// Fixed scale on the reservoir-side exploration noise.
    pub state_noise: f64,
    /// Seed for the run's single generator. `None` falls back to a fixed
    /// default so unconfigured runs stay reproducible.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            units: 1000,
            connection_prob: 0.1,
            instability: 1.5,
            steps_per_trial: 1000,
            trials: 50,
            train_trials: 40,
            learning_rate: 5e-4,
            effort_weights: [0.1, 0.1, 0.1],
            dt: 1.0,
            tau: 10.0,
            state_noise: 1.0,
            seed: Some(1),
        }
    }
}

impl SimConfig {
    /// Small configuration for tests and benches.
    pub fn with_size(units: usize, steps_per_trial: usize) -> Self {
        Self {
            units,
            steps_per_trial,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trials(mut self, train_trials: usize, trials: usize) -> Self {
        self.train_trials = train_trials;
        self.trials = trials;
        self
    }

    pub fn total_steps(&self) -> usize {
        self.trials * self.steps_per_trial
    }

    pub fn train_steps(&self) -> usize {
        self.train_trials * self.steps_per_trial
    }

    /// Phase as a pure function of the step index against the two
    /// trial-count thresholds.
    pub fn phase_at(&self, step: usize) -> Phase {
        if step == 0 {
            Phase::Bootstrap
        } else if step < self.train_steps() {
            Phase::Training
        } else {
            Phase::Testing
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.units == 0 {
            return Err("units must be positive");
        }
        if !(self.connection_prob > 0.0 && self.connection_prob <= 1.0) {
            return Err("connection_prob must be in (0, 1]");
        }
        if !self.instability.is_finite() || self.instability <= 0.0 {
            return Err("instability must be finite and positive");
        }
        if self.steps_per_trial == 0 {
            return Err("steps_per_trial must be positive");
        }
        if self.trials == 0 {
            return Err("trials must be positive");
        }
        if self.train_trials == 0 {
            return Err("train_trials must be positive");
        }
        if self.train_trials > self.trials {
            return Err("train_trials must not exceed trials");
        }
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err("learning_rate must be finite and non-negative");
        }
        if self
            .effort_weights
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err("effort_weights must be finite and non-negative");
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err("dt must be finite and positive");
        }
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err("tau must be finite and positive");
        }
        if !self.state_noise.is_finite() || self.state_noise < 0.0 {
            return Err("state_noise must be finite and non-negative");
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("reservoir diverged at step {step} (|x| = {magnitude:.3e})")]
    Diverged { step: usize, magnitude: f64 },
}

/// One closed-loop run: reservoir, readout, learning traces, target and
/// recorded history in a single object, advanced step by step.
pub struct Simulation<R: RandomSource = Prng> {
    cfg: SimConfig,
    arm: ArmGeometry,
    // One trial of target samples, indexed modulo the trial length.
    target: Vec<Point2>,
    reservoir: Reservoir,
    readout: Readout,
    traces: RewardTraces,
    // Raw outputs for every completed step; the testing phase replays
    // from it.
    history: Vec<[f64; 3]>,
    steps_done: usize,
    rng: R,
    record: RunRecord,
}

impl Simulation<Prng> {
    /// Seeded production run.
    pub fn new(cfg: SimConfig, curve: &dyn TargetCurve) -> Result<Self, RunError> {
        let rng = Prng::new(cfg.seed.unwrap_or(1));
        Self::with_rng(cfg, curve, rng)
    }
}

impl<R: RandomSource> Simulation<R> {
    /// Run with an injected generator. Construction draws in documented
    /// order: initial state, connectivity, feedback projection.
    pub fn with_rng(cfg: SimConfig, curve: &dyn TargetCurve, mut rng: R) -> Result<Self, RunError> {
        cfg.validate().map_err(RunError::InvalidConfig)?;

        let reservoir =
            Reservoir::generate(cfg.units, cfg.connection_prob, cfg.instability, &mut rng);
        let readout = Readout::zeros(cfg.units);
        let target = sample_trial(curve, cfg.steps_per_trial);
        let total = cfg.total_steps();

        Ok(Self {
            arm: ArmGeometry::default(),
            target,
            reservoir,
            readout,
            traces: RewardTraces::new(),
            history: Vec::with_capacity(total),
            steps_done: 0,
            rng,
            record: RunRecord::new(total),
            cfg,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub fn readout(&self) -> &Readout {
        &self.readout
    }

    pub fn traces(&self) -> &RewardTraces {
        &self.traces
    }

    pub fn current_step(&self) -> usize {
        self.steps_done
    }

    pub fn phase(&self) -> Phase {
        self.cfg.phase_at(self.steps_done)
    }

    pub fn is_complete(&self) -> bool {
        self.steps_done >= self.cfg.total_steps()
    }

    /// Feedback vector entering the reservoir this step.
    ///
    /// Training feeds back the previous output. Testing replays the output
    /// recorded `REPLAY_LOOKBACK_TRIALS` trials earlier at the same
    /// trial-relative step; with fewer recorded trials the source clamps
    /// to the earliest trial, so short runs replay trial zero rather than
    /// index out of range.
    fn feedback(&self, phase: Phase) -> [f64; 3] {
        match phase {
            Phase::Bootstrap => [0.0; 3],
            Phase::Training => self.history[self.steps_done - 1],
            Phase::Testing => {
                let trial = self.steps_done / self.cfg.steps_per_trial;
                let offset = self.steps_done % self.cfg.steps_per_trial;
                let source = trial.saturating_sub(REPLAY_LOOKBACK_TRIALS);
                self.history[source * self.cfg.steps_per_trial + offset]
            }
        }
    }

    /// Advance one step. A completed run is left untouched.
    pub fn step(&mut self) -> Result<(), RunError> {
        if self.is_complete() {
            return Ok(());
        }

        let t = self.steps_done;
        let phase = self.cfg.phase_at(t);
        let leak = self.cfg.dt / self.cfg.tau;
        let exploring = phase != Phase::Testing;

        let feedback = self.feedback(phase);
        self.reservoir.advance(&feedback, leak);
        if exploring {
            let half_width = self.cfg.state_noise * self.traces.beta();
            self.reservoir.perturb(&mut self.rng, half_width);
        }

        if self.reservoir.is_degenerate() || self.reservoir.max_magnitude() > DIVERGENCE_LIMIT {
            let magnitude = self.reservoir.max_magnitude();
            warn!(step = t, magnitude, "reservoir left the stable regime");
            return Err(RunError::Diverged { step: t, magnitude });
        }

        let mut z = self.readout.output(self.reservoir.activity());
        if exploring {
            let beta = self.traces.beta();
            for zk in z.iter_mut() {
                *zk += self.rng.symmetric(beta);
            }
        }

        let pose = self.arm.forward(&z);
        let target = self.target[t % self.cfg.steps_per_trial];
        let distance_sq = pose.end.distance_sq(&target);

        let (effort, cost, w_norm) = match phase {
            Phase::Bootstrap => {
                // Traces start at the observed values, so the effort term
                // and the first reward-prediction error are exactly zero.
                let cost = distance_sq;
                self.traces.prime(&z, cost);
                (0.0, cost, self.readout.norm())
            }
            Phase::Training => {
                let dz = self.traces.track_output(&z);
                let effort = effort_cost(&dz, &self.cfg.effort_weights);
                let cost = distance_sq + effort;
                let perf = self.traces.track_cost(cost);
                let scale = 0.5 * self.cfg.learning_rate * reward_modulation(perf);
                self.readout
                    .rank_one_update(scale, &dz, self.reservoir.activity());
                self.traces.anneal();
                (effort, cost, self.readout.norm())
            }
            Phase::Testing => {
                // Cost is still computed against the target for reporting;
                // traces and readout stay frozen. The recorded norm is
                // zero and the recorder fills it forward for display.
                let dz = self.traces.deviation(&z);
                let effort = effort_cost(&dz, &self.cfg.effort_weights);
                (effort, distance_sq + effort, 0.0)
            }
        };

        self.record.push(z, pose, distance_sq, effort, cost, w_norm);
        self.history.push(z);
        self.steps_done += 1;

        if self.steps_done % self.cfg.steps_per_trial == 0 {
            let trial = self.steps_done / self.cfg.steps_per_trial;
            let mean_cost = self
                .record
                .trial_mean_cost(trial - 1, self.cfg.steps_per_trial);
            debug!(trial, phase = ?phase, mean_cost, "trial complete");
        }
        if self.steps_done == self.cfg.train_steps() {
            info!(step = self.steps_done, "training complete, readout frozen");
        }

        Ok(())
    }

    /// Drive the run to completion.
    pub fn run(&mut self) -> Result<(), RunError> {
        info!(
            units = self.cfg.units,
            trials = self.cfg.trials,
            train_trials = self.cfg.train_trials,
            "starting closed-loop run"
        );
        while !self.is_complete() {
            self.step()?;
        }
        info!(final_norm = self.readout.norm(), "run complete");
        Ok(())
    }
}
