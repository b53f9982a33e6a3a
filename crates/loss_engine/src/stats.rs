//! Summary statistics for simulated aggregate-loss samples.
//!
//! Provides empirical moments and tail measures of a loss sample, and the
//! closed-form moments of the compound Poisson-lognormal distribution used to
//! validate it.

use crate::error::{Result, SimulationError};
use crate::params::SimulationParameters;

/// Empirical summary of a loss sample.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleSummary {
    /// Number of samples.
    pub count: usize,
    /// Sample mean.
    pub mean: f64,
    /// Unbiased sample variance (zero for a single sample).
    pub variance: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Standard error of the mean.
    pub std_error: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Share of trials with zero loss.
    pub zero_fraction: f64,
}

impl SampleSummary {
    /// Summarises `samples`; returns `None` for an empty slice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use loss_engine::stats::SampleSummary;
    ///
    /// let summary = SampleSummary::from_samples(&[0.0, 2.0, 4.0]).unwrap();
    /// assert_eq!(summary.mean, 2.0);
    /// assert_eq!(summary.variance, 4.0);
    /// assert_eq!(summary.max, 4.0);
    /// ```
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let zeros = samples.iter().filter(|&&x| x == 0.0).count();

        Some(Self {
            count: n,
            mean,
            variance,
            std_dev,
            std_error: std_dev / (n as f64).sqrt(),
            min,
            max,
            zero_fraction: zeros as f64 / n as f64,
        })
    }

    /// Returns the 95% confidence interval half-width of the mean.
    #[inline]
    pub fn confidence_95(&self) -> f64 {
        1.96 * self.std_error
    }
}

/// Closed-form moments of the compound Poisson-lognormal distribution.
///
/// For `S = X_1 + ... + X_N`, `N ~ Poisson(λ)`, `X_i ~ Lognormal(μ, σ)`:
/// - `E[S] = λ·E[X] = λ·exp(μ + σ²/2)`
/// - `Var[S] = λ·E[X²] = λ·exp(2μ + 2σ²)`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompoundMoments {
    /// Theoretical mean.
    pub mean: f64,
    /// Theoretical variance.
    pub variance: f64,
}

impl CompoundMoments {
    /// Computes the moments for the given parameters.
    pub fn of(params: &SimulationParameters) -> Self {
        Self::new(params.lambda(), params.mu(), params.sigma())
    }

    /// Computes the moments for `λ`, `μ`, `σ`.
    pub fn new(lambda: f64, mu: f64, sigma: f64) -> Self {
        let s2 = sigma * sigma;
        Self {
            mean: lambda * (mu + 0.5 * s2).exp(),
            variance: lambda * (2.0 * mu + 2.0 * s2).exp(),
        }
    }

    /// Theoretical standard deviation.
    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Monte Carlo standard error of the mean of `n` samples.
    #[inline]
    pub fn std_error(&self, n: usize) -> f64 {
        if n == 0 {
            f64::INFINITY
        } else {
            self.std_dev() / (n as f64).sqrt()
        }
    }
}

/// Empirical quantile at level `p` (linear interpolation between order
/// statistics).
///
/// # Errors
///
/// Returns `InvalidParameter` if `samples` is empty or `p` is outside
/// `[0, 1]`.
pub fn quantile(samples: &[f64], p: f64) -> Result<f64> {
    check_level(samples, p)?;
    let sorted = sorted(samples);
    Ok(quantile_sorted(&sorted, p))
}

/// Value at risk: the loss quantile at confidence level `p`.
///
/// # Errors
///
/// Same as [`quantile`].
pub fn value_at_risk(samples: &[f64], p: f64) -> Result<f64> {
    quantile(samples, p)
}

/// Expected shortfall: mean loss over the worst `(1 - p)` share of trials.
///
/// # Errors
///
/// Same as [`quantile`].
///
/// # Examples
///
/// ```rust
/// use loss_engine::stats::expected_shortfall;
///
/// let losses: Vec<f64> = (1..=10).map(f64::from).collect();
/// // Worst 20%: {9, 10}
/// assert_eq!(expected_shortfall(&losses, 0.8).unwrap(), 9.5);
/// ```
pub fn expected_shortfall(samples: &[f64], p: f64) -> Result<f64> {
    check_level(samples, p)?;
    let sorted = sorted(samples);
    let n = sorted.len();
    let start = ((p * n as f64).floor() as usize).min(n - 1);
    let tail = &sorted[start..];
    Ok(tail.iter().sum::<f64>() / tail.len() as f64)
}

fn check_level(samples: &[f64], p: f64) -> Result<()> {
    if samples.is_empty() {
        return Err(SimulationError::invalid("samples", "must not be empty"));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(SimulationError::invalid(
            "level",
            format!("must be in [0, 1], got {}", p),
        ));
    }
    Ok(())
}

fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
