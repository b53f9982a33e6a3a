//! Compound Poisson-lognormal sampler.
//!
//! One sample is the aggregate loss of one trial: an event count drawn from
//! `Poisson(λ)` followed by that many i.i.d. `Lognormal(μ, σ)` severities,
//! summed. The sampler holds only the immutable distributions; all mutable
//! state lives in the generator passed to [`CompoundSampler::sample`].

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Poisson};

use crate::error::{Result, SimulationError};
use crate::params::SimulationParameters;

/// Aggregate-loss sampler for one frequency/severity pair.
///
/// # Examples
///
/// ```rust
/// use loss_engine::rng::LossRng;
/// use loss_engine::sampler::CompoundSampler;
///
/// let sampler = CompoundSampler::new(5.0, 0.0, 1.0).unwrap();
/// let mut rng = LossRng::from_seed(42);
///
/// let loss = sampler.sample(&mut rng);
/// assert!(loss >= 0.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CompoundSampler {
    /// Event-count distribution; `None` when λ = 0.
    frequency: Option<Poisson<f64>>,
    /// Per-event severity distribution.
    severity: LogNormal<f64>,
}

impl CompoundSampler {
    /// Creates a sampler for `Poisson(lambda)` counts and `Lognormal(mu, sigma)`
    /// severities.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` under the same rules as
    /// [`SimulationParameters::validate`].
    pub fn new(lambda: f64, mu: f64, sigma: f64) -> Result<Self> {
        SimulationParameters::new(lambda, mu, sigma, 0, 0)?;

        let frequency = if lambda > 0.0 {
            Some(
                Poisson::new(lambda)
                    .map_err(|e| SimulationError::invalid("lambda", e.to_string()))?,
            )
        } else {
            None
        };
        let severity =
            LogNormal::new(mu, sigma).map_err(|e| SimulationError::invalid("sigma", e.to_string()))?;

        Ok(Self {
            frequency,
            severity,
        })
    }

    /// Creates a sampler from validated simulation parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the parameters are invalid.
    pub fn from_params(params: &SimulationParameters) -> Result<Self> {
        Self::new(params.lambda(), params.mu(), params.sigma())
    }

    /// Draws one aggregate loss.
    ///
    /// With λ = 0 this returns `0.0` without consuming any generator output.
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let Some(frequency) = &self.frequency else {
            return 0.0;
        };

        let events = frequency.sample(rng) as u64;
        let mut total = 0.0;
        for _ in 0..events {
            total += self.severity.sample(rng);
        }
        total
    }

    /// Fills `out` in ascending index order with independent aggregate losses.
    #[inline]
    pub fn fill<R: Rng + ?Sized>(&self, rng: &mut R, out: &mut [f64]) {
        for value in out.iter_mut() {
            *value = self.sample(rng);
        }
    }
}
