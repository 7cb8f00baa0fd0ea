//! Deterministic noise sequence shared by all simulated sensors of a robot.
//!
//! `noisy = value + amplitude * sin(counter * phase_step)`, where `counter`
//! is incremented before every application. The counter is shared: the
//! n-th noise application of the whole robot uses step n, whichever sensor
//! asks for it, so outputs are reproducible given call order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use strider_common::consts::DEFAULT_NOISE_PHASE_STEP;

#[derive(Debug)]
pub struct NoiseSequence {
    counter: AtomicU64,
    phase_step: f64,
}

impl Default for NoiseSequence {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_PHASE_STEP)
    }
}

impl NoiseSequence {
    /// New sequence starting at step 0.
    pub fn new(phase_step: f64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            phase_step,
        }
    }

    pub fn shared(phase_step: f64) -> Arc<Self> {
        Arc::new(Self::new(phase_step))
    }

    /// Perturb `value`. A non-positive amplitude returns `value` untouched
    /// and does not consume a step.
    #[inline]
    pub fn apply(&self, value: f64, amplitude: f64) -> f64 {
        if amplitude <= 0.0 {
            return value;
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        value + amplitude * (n as f64 * self.phase_step).sin()
    }

    /// Number of noise applications so far.
    pub fn position(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Rewind to step 0.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}
