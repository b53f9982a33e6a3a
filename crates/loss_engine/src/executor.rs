//! Parallel simulation executor.
//!
//! The executor partitions the output buffer into disjoint mutable slices,
//! one per worker, and fills each slice on a fixed-size `rayon` pool. Every
//! worker derives and owns its own stream; workers share nothing but the
//! final join.
//!
//! # Architecture
//!
//! ```text
//! ParallelExecutor::run(params)
//! ├── SimulationParameters::validate()
//! ├── partition(N, worker_count)       -> [SampleRange; worker_count]
//! ├── split_at_mut per range           -> disjoint &mut [f64] slices
//! └── pool.install(try_for_each task)
//!     ├── StreamDeriver::derive(seed, index, range)
//!     └── CompoundSampler::fill(stream, slice)
//! ```
//!
//! # Determinism
//!
//! Output depends only on the parameters, the worker count and the stream
//! deriver, never on scheduling order.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, debug_span};

use crate::error::{Result, SimulationError};
use crate::params::SimulationParameters;
use crate::partition::{default_worker_count, partition, SampleRange};
use crate::rng::{PcgStreamDeriver, StreamDeriver, StreamKey};
use crate::sampler::CompoundSampler;

/// One unit of work: a partition index, its range and its output slice.
struct Task<'a> {
    index: usize,
    range: SampleRange,
    out: &'a mut [f64],
}

/// Parallel compound-loss simulation engine.
///
/// Holds a dedicated thread pool of `worker_count` threads that is reused
/// across [`run`](Self::run) calls.
///
/// # Examples
///
/// ```rust
/// use loss_engine::{ParallelExecutor, SimulationParameters};
///
/// let executor = ParallelExecutor::new(4).unwrap();
/// let params = SimulationParameters::new(5.0, 0.0, 1.0, 1_000, 42).unwrap();
///
/// let first = executor.run(&params).unwrap();
/// let second = executor.run(&params).unwrap();
/// assert_eq!(first.len(), 1_000);
/// assert_eq!(first, second);
/// ```
pub struct ParallelExecutor<D = PcgStreamDeriver> {
    deriver: D,
    worker_count: usize,
    pool: ThreadPool,
}

impl ParallelExecutor<PcgStreamDeriver> {
    /// Creates an executor with `worker_count` workers and the default
    /// PCG stream derivation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `worker_count` is zero, or `ThreadPool`
    /// if the pool cannot be built.
    pub fn new(worker_count: usize) -> Result<Self> {
        Self::with_deriver(PcgStreamDeriver::default(), worker_count)
    }

    /// Creates an executor sized to the available hardware parallelism.
    ///
    /// # Errors
    ///
    /// Returns `ThreadPool` if the pool cannot be built.
    pub fn with_default_workers() -> Result<Self> {
        Self::new(default_worker_count())
    }

    /// Creates an executor using the given secondary stream key policy.
    ///
    /// # Errors
    ///
    /// Same as [`ParallelExecutor::new`].
    pub fn with_stream_key(key: StreamKey, worker_count: usize) -> Result<Self> {
        Self::with_deriver(PcgStreamDeriver::new(key), worker_count)
    }
}

impl<D: StreamDeriver> ParallelExecutor<D> {
    /// Creates an executor with a custom stream deriver.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `worker_count` is zero, or `ThreadPool`
    /// if the pool cannot be built.
    pub fn with_deriver(deriver: D, worker_count: usize) -> Result<Self> {
        if worker_count == 0 {
            return Err(SimulationError::invalid(
                "worker_count",
                "must be at least 1",
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("loss-worker-{}", i))
            .build()
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;

        Ok(Self {
            deriver,
            worker_count,
            pool,
        })
    }

    /// Returns the number of workers (and partitions per run).
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Returns the stream deriver.
    #[inline]
    pub fn deriver(&self) -> &D {
        &self.deriver
    }

    /// Runs a simulation and returns the `N` aggregate losses.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for invalid parameters (before any work
    /// starts), or the first `StreamInitialisation` / `WorkerFailure`
    /// raised by a worker. No buffer is returned on failure.
    pub fn run(&self, params: &SimulationParameters) -> Result<Vec<f64>> {
        params.validate()?;
        if params.n_samples() == 0 {
            return Ok(Vec::new());
        }

        let mut out = vec![0.0; params.n_samples()];
        self.fill(params, &mut out)?;
        Ok(out)
    }

    /// Fills a caller-supplied buffer of length `N`.
    ///
    /// On error the buffer contents are unspecified and must not be used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `out.len() != params.n_samples()`, plus
    /// everything [`run`](Self::run) can return.
    pub fn fill(&self, params: &SimulationParameters, out: &mut [f64]) -> Result<()> {
        params.validate()?;
        if out.len() != params.n_samples() {
            return Err(SimulationError::invalid(
                "output",
                format!(
                    "buffer length {} does not match n_samples {}",
                    out.len(),
                    params.n_samples()
                ),
            ));
        }
        if out.is_empty() {
            return Ok(());
        }

        let sampler = CompoundSampler::from_params(params)?;
        let ranges = partition(out.len(), self.worker_count)?;
        let tasks = split_tasks(&ranges, out);
        let seed = params.seed();

        let span = debug_span!(
            "simulate",
            n_samples = params.n_samples(),
            workers = self.worker_count,
            seed
        );
        let _guard = span.enter();
        let start = Instant::now();

        self.pool
            .install(|| {
                tasks
                    .into_par_iter()
                    .try_for_each(|task| self.run_task(&sampler, seed, task))
            })?;

        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "simulation complete");
        Ok(())
    }

    /// Derives the task's stream and fills its slice.
    ///
    /// Panics inside the worker are reported as `WorkerFailure`.
    fn run_task(&self, sampler: &CompoundSampler, seed: u64, task: Task<'_>) -> Result<()> {
        let Task { index, range, out } = task;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
            let mut stream = self.deriver.derive(seed, index, range)?;
            sampler.fill(&mut stream, out);
            Ok(())
        }));

        match outcome {
            Ok(result) => {
                debug!(worker = index, begin = range.begin, end = range.end, "partition filled");
                result
            }
            Err(payload) => Err(SimulationError::WorkerFailure {
                worker: index,
                reason: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl<D> std::fmt::Debug for ParallelExecutor<D>
where
    D: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("deriver", &self.deriver)
            .field("worker_count", &self.worker_count)
            .finish_non_exhaustive()
    }
}

/// Splits `out` into one disjoint slice per non-empty range.
fn split_tasks<'a>(ranges: &[SampleRange], out: &'a mut [f64]) -> Vec<Task<'a>> {
    let mut tasks = Vec::with_capacity(ranges.len());
    let mut rest = out;

    for (index, &range) in ranges.iter().enumerate() {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        rest = tail;
        if !range.is_empty() {
            tasks.push(Task {
                index,
                range,
                out: head,
            });
        }
    }

    debug_assert!(rest.is_empty());
    tasks
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::LossRng;
    use std::sync::Mutex;

    /// Deterministic deriver that records every call and hands out
    /// `LossRng` streams keyed by partition index.
    #[derive(Default)]
    struct RecordingDeriver {
        calls: Mutex<Vec<(u64, usize, SampleRange)>>,
    }

    impl RecordingDeriver {
        fn calls(&self) -> Vec<(u64, usize, SampleRange)> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort_by_key(|c| c.1);
            calls
        }
    }

    impl StreamDeriver for RecordingDeriver {
        type Stream = LossRng;

        fn derive(&self, seed: u64, index: usize, range: SampleRange) -> Result<LossRng> {
            self.calls.lock().unwrap().push((seed, index, range));
            Ok(LossRng::from_seed_and_stream(seed, index as u128))
        }
    }

    /// Deriver that fails for one partition.
    struct FailingDeriver {
        fail_at: usize,
    }

    impl StreamDeriver for FailingDeriver {
        type Stream = LossRng;

        fn derive(&self, seed: u64, index: usize, _range: SampleRange) -> Result<LossRng> {
            if index == self.fail_at {
                Err(SimulationError::StreamInitialisation(format!(
                    "no stream for partition {}",
                    index
                )))
            } else {
                Ok(LossRng::from_seed_and_stream(seed, index as u128))
            }
        }
    }

    /// Deriver whose streams panic when drawn from.
    struct PanickingDeriver;

    struct PanickingRng;

    impl rand::RngCore for PanickingRng {
        fn next_u32(&mut self) -> u32 {
            panic!("stream exhausted")
        }
        fn next_u64(&mut self) -> u64 {
            panic!("stream exhausted")
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("stream exhausted")
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            panic!("stream exhausted")
        }
    }

    impl StreamDeriver for PanickingDeriver {
        type Stream = PanickingRng;

        fn derive(&self, _seed: u64, _index: usize, _range: SampleRange) -> Result<PanickingRng> {
            Ok(PanickingRng)
        }
    }

    fn params(n: usize, seed: u64) -> SimulationParameters {
        SimulationParameters::new(5.0, 0.0, 1.0, n, seed).unwrap()
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            ParallelExecutor::new(0),
            Err(SimulationError::InvalidParameter {
                name: "worker_count",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_samples_derives_nothing() {
        let executor = ParallelExecutor::with_deriver(RecordingDeriver::default(), 4).unwrap();
        let out = executor.run(&params(0, 42)).unwrap();

        assert!(out.is_empty());
        assert!(executor.deriver().calls().is_empty());
    }

    #[test]
    fn test_one_derivation_per_non_empty_range() {
        let executor = ParallelExecutor::with_deriver(RecordingDeriver::default(), 4).unwrap();
        executor.run(&params(10, 7)).unwrap();

        let calls = executor.deriver().calls();
        assert_eq!(
            calls,
            vec![
                (7, 0, SampleRange::new(0, 3)),
                (7, 1, SampleRange::new(3, 6)),
                (7, 2, SampleRange::new(6, 8)),
                (7, 3, SampleRange::new(8, 10)),
            ]
        );
    }

    #[test]
    fn test_empty_trailing_ranges_not_derived() {
        let executor = ParallelExecutor::with_deriver(RecordingDeriver::default(), 6).unwrap();
        let out = executor.run(&params(2, 1)).unwrap();

        assert_eq!(out.len(), 2);
        let indices: Vec<usize> = executor.deriver().calls().iter().map(|c| c.1).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    /// Each slice holds exactly what a serial fill of its own stream gives.
    #[test]
    fn test_slices_match_per_stream_serial_fill() {
        let p = params(103, 99);
        let executor = ParallelExecutor::with_deriver(RecordingDeriver::default(), 4).unwrap();
        let out = executor.run(&p).unwrap();

        let sampler = CompoundSampler::from_params(&p).unwrap();
        for (index, range) in partition(103, 4).unwrap().into_iter().enumerate() {
            let mut rng = LossRng::from_seed_and_stream(99, index as u128);
            let mut expected = vec![0.0; range.len()];
            sampler.fill(&mut rng, &mut expected);
            assert_eq!(&out[range.as_range()], expected.as_slice());
        }
    }

    #[test]
    fn test_stream_failure_surfaces() {
        let executor = ParallelExecutor::with_deriver(FailingDeriver { fail_at: 2 }, 4).unwrap();
        let result = executor.run(&params(100, 0));

        assert!(matches!(
            result,
            Err(SimulationError::StreamInitialisation(_))
        ));
    }

    #[test]
    fn test_worker_panic_becomes_worker_failure() {
        let executor = ParallelExecutor::with_deriver(PanickingDeriver, 2).unwrap();
        let result = executor.run(&params(10, 0));

        match result {
            Err(SimulationError::WorkerFailure { reason, .. }) => {
                assert!(reason.contains("stream exhausted"));
            }
            other => panic!("expected WorkerFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_fill_rejects_length_mismatch() {
        let executor = ParallelExecutor::new(2).unwrap();
        let mut out = vec![0.0; 5];
        let result = executor.fill(&params(6, 0), &mut out);

        assert!(matches!(
            result,
            Err(SimulationError::InvalidParameter { name: "output", .. })
        ));
    }

    #[test]
    fn test_length_mismatch_rejected_before_derivation() {
        let executor = ParallelExecutor::with_deriver(RecordingDeriver::default(), 2).unwrap();
        let mut out = vec![0.0; 3];

        assert!(executor.fill(&params(10, 0), &mut out).is_err());
        assert!(executor.deriver().calls().is_empty());
    }

    #[test]
    fn test_split_tasks_disjoint() {
        let ranges = partition(10, 3).unwrap();
        let mut out = vec![0.0; 10];
        let tasks = split_tasks(&ranges, &mut out);

        assert_eq!(tasks.len(), 3);
        for task in tasks {
            assert_eq!(task.out.len(), task.range.len());
            for v in task.out.iter_mut() {
                *v = task.index as f64;
            }
        }
        assert_eq!(out, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }
}
