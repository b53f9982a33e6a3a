//! Single-threaded reference simulation.
//!
//! Draws all `N` samples from one stream seeded from the operating system
//! entropy source. Output is not bit-identical to the parallel path; it is
//! used to cross-check the parallel path's distribution.

use tracing::debug;

use crate::error::Result;
use crate::params::SimulationParameters;
use crate::rng::LossRng;
use crate::sampler::CompoundSampler;

/// Runs `n` trials serially on a freshly entropy-seeded stream.
///
/// # Errors
///
/// Returns `InvalidParameter` for invalid parameters, or
/// `StreamInitialisation` if the entropy source is unavailable.
///
/// # Examples
///
/// ```rust
/// let losses = loss_engine::simulate_serial(0.0, 0.0, 1.0, 5).unwrap();
/// assert_eq!(losses, vec![0.0; 5]);
/// ```
pub fn simulate_serial(lambda: f64, mu: f64, sigma: f64, n: usize) -> Result<Vec<f64>> {
    let sampler = CompoundSampler::new(lambda, mu, sigma)?;
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut rng = LossRng::from_entropy()?;
    debug!(n_samples = n, seed = rng.seed(), "serial simulation");
    Ok(run_serial(&sampler, &mut rng, n))
}

/// Runs the trials described by `params` serially on a stream seeded with
/// `params.seed()` on the primary stream.
///
/// Deterministic counterpart of [`simulate_serial`].
///
/// # Errors
///
/// Returns `InvalidParameter` for invalid parameters.
pub fn simulate_serial_seeded(params: &SimulationParameters) -> Result<Vec<f64>> {
    let sampler = CompoundSampler::from_params(params)?;
    let mut rng = LossRng::from_seed(params.seed());
    Ok(run_serial(&sampler, &mut rng, params.n_samples()))
}

fn run_serial(sampler: &CompoundSampler, rng: &mut LossRng, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    sampler.fill(rng, &mut out);
    out
}
