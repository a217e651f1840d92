//! Bloom filter configuration and validation
//!
//! # Example
//!
//! ```
//! use bloom_filters::{BloomConfigBuilder, FilterKind};
//!
//! let mut filter = BloomConfigBuilder::new()
//!     .kind(FilterKind::Counting)
//!     .target_fpr(0.01)
//!     .capacity(500)
//!     .counter_width(8)
//!     .build()
//!     .and_then(|config| config.build_filter())
//!     .expect("Valid config");
//!
//! filter.add(b"seen");
//! assert!(filter.contains(b"seen"));
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bloom_filter::BasicBloomFilter;
use super::counter_vector::MAX_COUNTER_WIDTH;
use super::counting_bloom::{CountingBloomFilter, DEFAULT_COUNTER_WIDTH};
use super::filter::{BloomFilter, FilterKind};
use super::hash_functions::{HashPolicyRegistry, DEFAULT_POLICY};
use super::parameters::{calculate_optimal_parameters, validate_fpr};
use crate::error::FilterError;

/// Settings needed to size and build a filter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Which variant to build
    pub kind: FilterKind,
    /// Target false positive rate, strictly between 0 and 1
    pub target_fpr: f64,
    /// Expected number of distinct elements
    pub capacity: usize,
    /// Bits per counter (counting filters only)
    pub counter_width: u8,
    /// Registry name of the hash policy
    pub hash_policy: String,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Basic,
            target_fpr: 0.01,
            capacity: 1000,
            counter_width: DEFAULT_COUNTER_WIDTH,
            hash_policy: DEFAULT_POLICY.to_string(),
        }
    }
}

impl BloomConfig {
    /// Validate sizing inputs
    ///
    /// The hash policy name is checked against a registry when the filter
    /// is built.
    pub fn validate(&self) -> Result<(), FilterError> {
        validate_fpr(self.target_fpr)?;

        if self.capacity == 0 {
            return Err(FilterError::InvalidCapacity);
        }

        if self.kind == FilterKind::Counting
            && (self.counter_width == 0 || self.counter_width > MAX_COUNTER_WIDTH)
        {
            return Err(FilterError::InvalidParameters(format!(
                "counter_width must be between 1 and {MAX_COUNTER_WIDTH}, got {}",
                self.counter_width
            )));
        }

        if self.hash_policy.is_empty() {
            return Err(FilterError::InvalidParameters(
                "hash_policy cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Build an empty filter using the built-in hash policies
    pub fn build_filter(&self) -> Result<BloomFilter, FilterError> {
        self.build_filter_with(&HashPolicyRegistry::default())
    }

    /// Build an empty filter, resolving the hash policy through `registry`
    pub fn build_filter_with(
        &self,
        registry: &HashPolicyRegistry,
    ) -> Result<BloomFilter, FilterError> {
        self.validate()?;
        let params = calculate_optimal_parameters(self.target_fpr, self.capacity)?;
        let hash = registry.create(&self.hash_policy, params.hash_count)?;

        debug!(
            kind = %self.kind,
            target_fpr = self.target_fpr,
            capacity = self.capacity,
            expected_fpr = params.expected_fpr,
            "Building Bloom filter from config"
        );

        let filter: BloomFilter = match self.kind {
            FilterKind::Basic => BasicBloomFilter::new(hash, params.cells)?.into(),
            FilterKind::Counting => {
                CountingBloomFilter::new(hash, params.cells, self.counter_width)?.into()
            }
        };
        Ok(filter)
    }

    /// Bytes the backing array will occupy once built
    pub fn memory_bytes(&self) -> Result<usize, FilterError> {
        self.validate()?;
        let params = calculate_optimal_parameters(self.target_fpr, self.capacity)?;
        Ok(match self.kind {
            FilterKind::Basic => params.cells.div_ceil(8),
            FilterKind::Counting => params
                .cells
                .checked_mul(self.counter_width as usize)
                .ok_or_else(|| {
                    FilterError::InvalidParameters(format!(
                        "{} counters of {} bits overflow the address space",
                        params.cells, self.counter_width
                    ))
                })?
                .div_ceil(8),
        })
    }

    /// Builder-style method to set target FPR
    pub fn with_target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = fpr;
        self
    }

    /// Builder-style method to set capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Builder for BloomConfig with validation
///
/// # Example
///
/// ```
/// use bloom_filters::BloomConfigBuilder;
///
/// let config = BloomConfigBuilder::new()
///     .target_fpr(0.001)
///     .capacity(10_000)
///     .hash_policy("double-siphash")
///     .build()
///     .unwrap();
/// assert_eq!(config.capacity, 10_000);
/// ```
#[derive(Default)]
pub struct BloomConfigBuilder {
    kind: Option<FilterKind>,
    target_fpr: Option<f64>,
    capacity: Option<usize>,
    counter_width: Option<u8>,
    hash_policy: Option<String>,
}

impl BloomConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: FilterKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set target false positive rate (must be strictly between 0 and 1)
    pub fn target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = Some(fpr);
        self
    }

    /// Set expected number of distinct elements
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set counter width in bits (1-64)
    pub fn counter_width(mut self, width: u8) -> Self {
        self.counter_width = Some(width);
        self
    }

    pub fn hash_policy(mut self, name: impl Into<String>) -> Self {
        self.hash_policy = Some(name.into());
        self
    }

    /// Build the BloomConfig, validating all parameters
    pub fn build(self) -> Result<BloomConfig, FilterError> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Build without validation
    pub fn build_unchecked(self) -> BloomConfig {
        let defaults = BloomConfig::default();

        BloomConfig {
            kind: self.kind.unwrap_or(defaults.kind),
            target_fpr: self.target_fpr.unwrap_or(defaults.target_fpr),
            capacity: self.capacity.unwrap_or(defaults.capacity),
            counter_width: self.counter_width.unwrap_or(defaults.counter_width),
            hash_policy: self.hash_policy.unwrap_or(defaults.hash_policy),
        }
    }
}
