//! Domain Layer - Pure filter logic
//!
//! This layer contains:
//! - Sizing mathematics
//! - Hash policies and their registry
//! - Bit and counter storage
//! - Basic and counting Bloom filters
//! - The tagged filter variant and its serialization header
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - No internal locking; callers synchronize shared filters

pub mod bit_vector;
pub mod bloom_filter;
pub mod config;
pub mod counter_vector;
pub mod counting_bloom;
pub mod filter;
pub mod hash_functions;
pub mod parameters;

pub use bit_vector::{BitVector, MAX_BITS};
pub use bloom_filter::BasicBloomFilter;
pub use config::{BloomConfig, BloomConfigBuilder};
pub use counter_vector::{CounterVector, MAX_COUNTER_WIDTH};
pub use counting_bloom::{CountingBloomFilter, DEFAULT_COUNTER_WIDTH};
pub use filter::{BloomFilter, FilterKind};
pub use hash_functions::{
    BaseHashPair, DefaultHashing, DoubleHashing, HashPolicy, HashPolicyRegistry, HashVector,
    Murmur3, PolicyConstructor, Sha256Words, SipHash, DEFAULT_POLICY,
};
pub use parameters::{
    calculate_fpr, calculate_optimal_parameters, optimal_cells, optimal_hash_count,
    BloomFilterParams, MAX_HASH_COUNT,
};
