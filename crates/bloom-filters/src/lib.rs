//! # Bloom Filters
//!
//! Probabilistic set-membership structures with fixed, pre-allocated memory.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure filter logic, no I/O
//!   - `BasicBloomFilter`: bit array, OR-merge
//!   - `CountingBloomFilter`: saturating counters, multiplicity estimates
//!   - `BloomFilter`: tagged variant over both, with binary serialization
//!   - `HashPolicyRegistry`: rebuilds hash policies by name at load time
//!   - `BloomConfig` / `BloomConfigBuilder`: validated sizing configuration
//!
//! - **Codec** (`codec`): typed little-endian byte stream used by serialization
//!
//! ## Invariants
//!
//! - No false negatives: after `add(e)`, `count(e) > 0`
//! - Counters saturate at 2^W - 1 and never wrap
//! - Cell count (and counter width) never change after construction
//! - Merges require identical cell count, counter width and hash policy
//!
//! ## Usage Example
//!
//! ```
//! use bloom_filters::{BasicBloomFilter, BloomFilter};
//!
//! let mut filter = BasicBloomFilter::with_fpr(0.01, 1000)?;
//! filter.add(b"0xABCD");
//! assert!(filter.contains(b"0xABCD"));
//!
//! let bytes = filter.to_bytes()?;
//! let restored = BloomFilter::from_bytes(&bytes)?;
//! assert_eq!(restored.count(b"0xABCD"), 1);
//! # Ok::<(), bloom_filters::FilterError>(())
//! ```
//!
//! ## Concurrency
//!
//! Filters are plain owned values with no interior locking. Share them
//! behind a `Mutex`/`RwLock` if several threads need to mutate one.

pub mod codec;
pub mod domain;
pub mod error;

// Re-exports for convenience
pub use domain::{
    BasicBloomFilter, BloomConfig, BloomConfigBuilder, BloomFilter, CountingBloomFilter,
    FilterKind, HashPolicy, HashPolicyRegistry,
};
pub use error::FilterError;
