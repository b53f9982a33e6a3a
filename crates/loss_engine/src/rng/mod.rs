//! # Random Number Generation Infrastructure
//!
//! Stream-partitioned random number generation for parallel loss
//! simulation.
//!
//! ## Design Rationale
//!
//! - **Ownership**: every worker owns its generator; there is no
//!   process-wide RNG singleton.
//! - **Reproducibility**: a `(seed, stream)` pair fully determines a
//!   generator's sequence.
//! - **Independence**: partitions are separated by PCG stream selector, not
//!   by seed offsets, so sequences of one run never overlap.
//!
//! ## Module Structure
//!
//! - [`LossRng`]: PCG-64 wrapper keyed by `(seed, stream)`
//! - [`StreamDeriver`]: partition-to-stream mapping, swappable in tests
//!
//! ## Usage Example
//!
//! ```rust
//! use loss_engine::partition::SampleRange;
//! use loss_engine::rng::{PcgStreamDeriver, StreamDeriver, StreamKey};
//! use rand::Rng;
//!
//! let deriver = PcgStreamDeriver::new(StreamKey::PartitionIndex);
//! let mut rng = deriver.derive(42, 0, SampleRange::new(0, 500)).unwrap();
//! let u: f64 = rng.gen();
//! assert!((0.0..1.0).contains(&u));
//! ```

mod derive;
mod stream;

pub use derive::{PcgStreamDeriver, StreamDeriver, StreamKey};
pub use stream::{LossRng, PRIMARY_STREAM};
