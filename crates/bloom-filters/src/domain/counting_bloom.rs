//! # Counting Bloom Filter
//!
//! Replaces each bit with a small saturating counter:
//! - Add: increment counters at hashed positions
//! - Count: minimum of the counters at hashed positions
//! - Remove: decrement counters at hashed positions
//!
//! The minimum never undercounts an element that was added, but hash
//! collisions with other elements can inflate it.
//!
//! ## Saturation
//!
//! A counter that reaches 2^width - 1 stays there. Increments past the
//! maximum are dropped and removals leave saturated counters untouched,
//! since their true value is no longer known.

use tracing::{debug, warn};

use super::counter_vector::CounterVector;
use super::filter::{self, ensure_same_policy, BloomFilter, FilterKind};
use super::hash_functions::{validate_hash_count, DefaultHashing, HashPolicy, HashPolicyRegistry};
use super::parameters::calculate_optimal_parameters;
use crate::codec::{FilterReader, FilterWriter};
use crate::error::FilterError;

/// Default counter width in bits
pub const DEFAULT_COUNTER_WIDTH: u8 = 4;

/// Counting Bloom filter with fixed-width saturating counters
#[derive(Debug)]
pub struct CountingBloomFilter {
    hash: Box<dyn HashPolicy>,
    cells: CounterVector,
}

impl Clone for CountingBloomFilter {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash.boxed_clone(),
            cells: self.cells.clone(),
        }
    }
}

impl CountingBloomFilter {
    /// Create a filter with `cells` counters of `width` bits each
    pub fn new(hash: Box<dyn HashPolicy>, cells: usize, width: u8) -> Result<Self, FilterError> {
        validate_hash_count(hash.k())?;
        let counters = CounterVector::new(width, cells)?;
        debug!(
            cells,
            width,
            hash_count = hash.k(),
            policy = hash.name(),
            "Created counting Bloom filter"
        );
        Ok(Self {
            hash,
            cells: counters,
        })
    }

    /// Create a filter sized for `capacity` elements at the target FPR
    pub fn with_fpr(fpr: f64, capacity: usize, width: u8) -> Result<Self, FilterError> {
        let params = calculate_optimal_parameters(fpr, capacity)?;
        Self::new(
            Box::new(DefaultHashing::new(params.hash_count)),
            params.cells,
            width,
        )
    }

    /// Add an element (increment counters)
    pub fn add(&mut self, element: &[u8]) {
        let hashes = self.hash.hash(element);
        self.add_hashes(&hashes);
    }

    /// Estimated number of times `element` was added
    ///
    /// 0 means definitely absent.
    pub fn count(&self, element: &[u8]) -> u64 {
        self.count_hashes(&self.hash.hash(element))
    }

    pub fn contains(&self, element: &[u8]) -> bool {
        self.count(element) > 0
    }

    /// Remove one occurrence of an element (decrement counters)
    ///
    /// Returns false and changes nothing if the element is definitely
    /// absent. Only remove elements that were added: removing a false
    /// positive can introduce false negatives for other elements.
    pub fn remove(&mut self, element: &[u8]) -> bool {
        let hashes = self.hash.hash(element);
        if self.count_hashes(&hashes) == 0 {
            return false;
        }

        let m = self.cells.size() as u64;
        let max = self.cells.max_count();
        for h in &hashes {
            let index = (h % m) as usize;
            if self.cells.count(index) < max {
                self.cells.decrement(index, 1);
            }
        }
        true
    }

    pub(crate) fn add_hashes(&mut self, hashes: &[u64]) {
        let m = self.cells.size() as u64;
        for h in hashes {
            self.cells.increment((h % m) as usize, 1);
        }
    }

    pub(crate) fn count_hashes(&self, hashes: &[u64]) -> u64 {
        let m = self.cells.size() as u64;
        hashes
            .iter()
            .map(|h| self.cells.count((h % m) as usize))
            .min()
            .unwrap_or(0)
    }

    /// Element-wise saturating sum of two filters
    ///
    /// Both filters must have the same cell count, counter width and hash
    /// policy. Counts in the result are never lower than in either operand.
    pub fn merge(
        x: &CountingBloomFilter,
        y: &CountingBloomFilter,
    ) -> Result<CountingBloomFilter, FilterError> {
        if x.cells() != y.cells() || x.counter_width() != y.counter_width() {
            warn!(
                left_cells = x.cells(),
                right_cells = y.cells(),
                left_width = x.counter_width(),
                right_width = y.counter_width(),
                "Rejected merge of counting filters with different shapes"
            );
            return Err(FilterError::IncompatibleMerge(format!(
                "{} counters of {} bits != {} counters of {} bits",
                x.cells(),
                x.counter_width(),
                y.cells(),
                y.counter_width()
            )));
        }
        ensure_same_policy(x.hash.as_ref(), y.hash.as_ref())?;

        let cells = x.cells.saturating_add(&y.cells)?;
        debug!(cells = x.cells(), "Merged counting Bloom filters");
        Ok(Self {
            hash: x.hash.boxed_clone(),
            cells,
        })
    }

    /// Number of counters (m)
    pub fn cells(&self) -> usize {
        self.cells.size()
    }

    /// Bits per counter (W)
    pub fn counter_width(&self) -> u8 {
        self.cells.width()
    }

    /// Saturation value of each counter
    pub fn max_count(&self) -> u64 {
        self.cells.max_count()
    }

    /// Get number of hash functions
    pub fn hash_count(&self) -> usize {
        self.hash.k()
    }

    pub fn policy_name(&self) -> &str {
        self.hash.name()
    }

    pub fn hash_policy(&self) -> &dyn HashPolicy {
        self.hash.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.all_zero()
    }

    /// Clear all counters
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Serialize to the tagged binary layout shared with [`BloomFilter`]
    pub fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        filter::encode(FilterKind::Counting, self.hash.as_ref(), |writer| {
            self.write_payload(writer)
        })
    }

    /// Deserialize using the built-in hash policies
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        Self::from_bytes_with_registry(bytes, &HashPolicyRegistry::default())
    }

    pub fn from_bytes_with_registry(
        bytes: &[u8],
        registry: &HashPolicyRegistry,
    ) -> Result<Self, FilterError> {
        match BloomFilter::from_bytes_with_registry(bytes, registry)? {
            BloomFilter::Counting(filter) => Ok(filter),
            other => Err(FilterError::UnexpectedFilterType {
                expected: FilterKind::Counting.as_str(),
                actual: other.kind().as_str(),
            }),
        }
    }

    pub(crate) fn write_payload(&self, writer: &mut FilterWriter) -> Result<(), FilterError> {
        self.cells.write_to(writer)
    }

    pub(crate) fn read_payload(
        hash: Box<dyn HashPolicy>,
        reader: &mut FilterReader<'_>,
    ) -> Result<Self, FilterError> {
        let cells = CounterVector::read_from(reader)?;
        Ok(Self { hash, cells })
    }
}
