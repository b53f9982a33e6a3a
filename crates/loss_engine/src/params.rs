//! Simulation parameters.
//!
//! This module provides the immutable parameter set for a compound
//! Poisson-lognormal simulation and a builder that validates it.

use crate::error::{Result, SimulationError};

/// Seed used when the builder is not given one explicitly.
pub const DEFAULT_SEED: u64 = 0;

/// Parameters of one compound Poisson-lognormal simulation.
///
/// Immutable once built. Use [`SimulationParametersBuilder`] or
/// [`SimulationParameters::new`] to construct validated instances.
///
/// # Examples
///
/// ```rust
/// use loss_engine::SimulationParameters;
///
/// let params = SimulationParameters::builder()
///     .lambda(5.0)
///     .mu(0.0)
///     .sigma(1.0)
///     .n_samples(10_000)
///     .seed(42)
///     .build()
///     .expect("valid parameters");
///
/// assert_eq!(params.n_samples(), 10_000);
/// assert_eq!(params.seed(), 42);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationParameters {
    /// Poisson frequency rate (expected event count per trial).
    lambda: f64,
    /// Location of the log-severity.
    mu: f64,
    /// Scale of the log-severity.
    sigma: f64,
    /// Number of trials to simulate.
    n_samples: usize,
    /// Base seed for stream derivation.
    seed: u64,
}

impl SimulationParameters {
    /// Creates validated parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidParameter`] if `lambda` is negative,
    /// `sigma` is not strictly positive, or any of them is not finite.
    pub fn new(lambda: f64, mu: f64, sigma: f64, n_samples: usize, seed: u64) -> Result<Self> {
        let params = Self {
            lambda,
            mu,
            sigma,
            n_samples,
            seed,
        };
        params.validate()?;
        Ok(params)
    }

    /// Creates a new parameter builder.
    #[inline]
    pub fn builder() -> SimulationParametersBuilder {
        SimulationParametersBuilder::default()
    }

    /// Returns the Poisson frequency rate.
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Returns the log-severity location.
    #[inline]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Returns the log-severity scale.
    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Returns the number of trials.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Returns the base seed.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns a copy with a different seed.
    #[inline]
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Returns a copy with a different trial count.
    #[inline]
    pub fn with_n_samples(self, n_samples: usize) -> Self {
        Self { n_samples, ..self }
    }

    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if:
    /// - `lambda` is negative or not finite
    /// - `mu` is not finite
    /// - `sigma` is zero, negative or not finite
    pub fn validate(&self) -> Result<()> {
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(SimulationError::invalid(
                "lambda",
                format!("must be finite and non-negative, got {}", self.lambda),
            ));
        }
        if !self.mu.is_finite() {
            return Err(SimulationError::invalid(
                "mu",
                format!("must be finite, got {}", self.mu),
            ));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(SimulationError::invalid(
                "sigma",
                format!("must be finite and positive, got {}", self.sigma),
            ));
        }
        Ok(())
    }
}

/// Builder for [`SimulationParameters`].
///
/// `lambda`, `mu`, `sigma` and `n_samples` are mandatory; `seed` falls back
/// to [`DEFAULT_SEED`].
#[derive(Clone, Debug, Default)]
pub struct SimulationParametersBuilder {
    lambda: Option<f64>,
    mu: Option<f64>,
    sigma: Option<f64>,
    n_samples: Option<usize>,
    seed: Option<u64>,
}

impl SimulationParametersBuilder {
    /// Sets the Poisson frequency rate.
    #[inline]
    pub fn lambda(mut self, lambda: f64) -> Self {
        self.lambda = Some(lambda);
        self
    }

    /// Sets the log-severity location.
    #[inline]
    pub fn mu(mut self, mu: f64) -> Self {
        self.mu = Some(mu);
        self
    }

    /// Sets the log-severity scale.
    #[inline]
    pub fn sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    /// Sets the number of trials.
    #[inline]
    pub fn n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = Some(n_samples);
        self
    }

    /// Sets the base seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if a mandatory field is missing or a value
    /// fails [`SimulationParameters::validate`].
    pub fn build(self) -> Result<SimulationParameters> {
        let lambda = self
            .lambda
            .ok_or_else(|| SimulationError::invalid("lambda", "must be specified"))?;
        let mu = self
            .mu
            .ok_or_else(|| SimulationError::invalid("mu", "must be specified"))?;
        let sigma = self
            .sigma
            .ok_or_else(|| SimulationError::invalid("sigma", "must be specified"))?;
        let n_samples = self
            .n_samples
            .ok_or_else(|| SimulationError::invalid("n_samples", "must be specified"))?;

        SimulationParameters::new(
            lambda,
            mu,
            sigma,
            n_samples,
            self.seed.unwrap_or(DEFAULT_SEED),
        )
    }
}
