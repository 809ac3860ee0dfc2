//! Seeded fault injection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::ProcessingError;

/// Produces synthetic failures with a fixed probability.
///
/// The random source is seeded, so a given seed yields the same failure
/// sequence on every run.
#[derive(Debug, Clone)]
pub struct FaultInjector {
    probability: f64,
    rng: StdRng,
}

impl FaultInjector {
    /// Creates an injector. `seed == None` seeds from OS entropy.
    #[must_use]
    pub fn new(probability: f64, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng,
        }
    }

    /// An injector that never fails.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0.0, Some(0))
    }

    /// The configured failure probability.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Fails with the configured probability.
    ///
    /// A zero probability never draws from the random source.
    pub fn maybe_fail(&mut self, stage: &str) -> Result<(), ProcessingError> {
        if self.probability > 0.0 && self.rng.gen::<f64>() < self.probability {
            return Err(ProcessingError::Injected(stage.to_string()));
        }
        Ok(())
    }
}
