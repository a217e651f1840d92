//! Basic Bloom filter backed by a bit array
//!
//! INVARIANTS:
//! - No false negatives: after `add(e)`, `count(e)` is 1.
//! - Bits are never cleared by `add`; only `clear` resets the filter.
//! - The cell count is fixed for the lifetime of the instance.

use tracing::{debug, warn};

use super::bit_vector::BitVector;
use super::filter::{self, ensure_same_policy, BloomFilter, FilterKind};
use super::hash_functions::{validate_hash_count, DefaultHashing, HashPolicy, HashPolicyRegistry};
use super::parameters::{calculate_fpr, calculate_optimal_parameters};
use crate::codec::{FilterReader, FilterWriter};
use crate::error::FilterError;

/// Bloom filter for probabilistic membership testing
///
/// False positives are possible, false negatives are not. Elements
/// cannot be removed.
#[derive(Debug)]
pub struct BasicBloomFilter {
    hash: Box<dyn HashPolicy>,
    bits: BitVector,
}

impl Clone for BasicBloomFilter {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash.boxed_clone(),
            bits: self.bits.clone(),
        }
    }
}

impl BasicBloomFilter {
    /// Create a filter with `cells` bits using the given hash policy
    pub fn new(hash: Box<dyn HashPolicy>, cells: usize) -> Result<Self, FilterError> {
        validate_hash_count(hash.k())?;
        let bits = BitVector::new(cells)?;
        debug!(
            cells,
            hash_count = hash.k(),
            policy = hash.name(),
            "Created basic Bloom filter"
        );
        Ok(Self { hash, bits })
    }

    /// Create a filter sized for `capacity` elements at the target FPR
    ///
    /// Uses the default double-hashing policy with the optimal hash count.
    pub fn with_fpr(fpr: f64, capacity: usize) -> Result<Self, FilterError> {
        let params = calculate_optimal_parameters(fpr, capacity)?;
        Self::new(Box::new(DefaultHashing::new(params.hash_count)), params.cells)
    }

    /// Insert an element
    ///
    /// After insertion `contains(element)` is guaranteed to return true.
    pub fn add(&mut self, element: &[u8]) {
        let hashes = self.hash.hash(element);
        self.add_hashes(&hashes);
    }

    /// 1 if the element may be present, 0 if it is definitely absent
    pub fn count(&self, element: &[u8]) -> u64 {
        self.count_hashes(&self.hash.hash(element))
    }

    pub fn contains(&self, element: &[u8]) -> bool {
        self.count(element) > 0
    }

    pub(crate) fn add_hashes(&mut self, hashes: &[u64]) {
        let m = self.bits.size() as u64;
        for h in hashes {
            self.bits.set((h % m) as usize);
        }
    }

    pub(crate) fn count_hashes(&self, hashes: &[u64]) -> u64 {
        let m = self.bits.size() as u64;
        let present = hashes.iter().all(|h| self.bits.get((h % m) as usize));
        u64::from(present)
    }

    /// Union of two filters (bitwise OR)
    ///
    /// Both filters must have the same cell count and hash policy. The
    /// result matches every element either operand matches.
    pub fn merge(
        x: &BasicBloomFilter,
        y: &BasicBloomFilter,
    ) -> Result<BasicBloomFilter, FilterError> {
        if x.cells() != y.cells() {
            warn!(
                left = x.cells(),
                right = y.cells(),
                "Rejected merge of basic filters with different cell counts"
            );
            return Err(FilterError::IncompatibleMerge(format!(
                "cell count {} != {}",
                x.cells(),
                y.cells()
            )));
        }
        ensure_same_policy(x.hash.as_ref(), y.hash.as_ref())?;

        let bits = x.bits.union(&y.bits)?;
        debug!(cells = x.cells(), "Merged basic Bloom filters");
        Ok(Self {
            hash: x.hash.boxed_clone(),
            bits,
        })
    }

    /// Size of the bit array (m)
    pub fn cells(&self) -> usize {
        self.bits.size()
    }

    /// Number of hash functions (k)
    pub fn hash_count(&self) -> usize {
        self.hash.k()
    }

    pub fn policy_name(&self) -> &str {
        self.hash.name()
    }

    pub fn hash_policy(&self) -> &dyn HashPolicy {
        self.hash.as_ref()
    }

    /// Get the number of bits set in the filter
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// True if nothing was added since construction or the last clear
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Reset all bits to 0
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// Expected FPR after `n` distinct insertions
    ///
    /// Formula: FPR = (1 - e^(-kn/m))^k
    pub fn estimated_fpr(&self, n: usize) -> f64 {
        calculate_fpr(self.cells(), n, self.hash_count())
    }

    /// Serialize to the tagged binary layout shared with [`BloomFilter`]
    pub fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        filter::encode(FilterKind::Basic, self.hash.as_ref(), |writer| {
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
            BloomFilter::Basic(filter) => Ok(filter),
            other => Err(FilterError::UnexpectedFilterType {
                expected: FilterKind::Basic.as_str(),
                actual: other.kind().as_str(),
            }),
        }
    }

    pub(crate) fn write_payload(&self, writer: &mut FilterWriter) -> Result<(), FilterError> {
        self.bits.write_to(writer)
    }

    pub(crate) fn read_payload(
        hash: Box<dyn HashPolicy>,
        reader: &mut FilterReader<'_>,
    ) -> Result<Self, FilterError> {
        let bits = BitVector::read_from(reader)?;
        Ok(Self { hash, bits })
    }
}
