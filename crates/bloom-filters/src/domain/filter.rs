//! Tagged filter variant and the shared serialization header
//!
//! Serialized layout (little-endian):
//!
//! ```text
//! tag: u8 | k: u16 | name: u64 len + UTF-8 | variant payload
//! ```
//!
//! The hash policy is rebuilt from (k, name) through a registry before the
//! payload is read. No filter is returned unless the payload reads cleanly
//! and the input is fully consumed.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::bloom_filter::BasicBloomFilter;
use super::counting_bloom::CountingBloomFilter;
use super::hash_functions::{HashPolicy, HashPolicyRegistry};
use crate::codec::{FilterReader, FilterWriter};
use crate::error::FilterError;

/// Which variant a serialized filter holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Basic,
    Counting,
}

impl FilterKind {
    /// Wire tag of the variant
    pub const fn tag(self) -> u8 {
        match self {
            FilterKind::Basic => 1,
            FilterKind::Counting => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, FilterError> {
        match tag {
            1 => Ok(FilterKind::Basic),
            2 => Ok(FilterKind::Counting),
            _ => Err(FilterError::UnknownFilterType { tag }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FilterKind::Basic => "basic",
            FilterKind::Counting => "counting",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject merges between filters whose hash policies differ
pub(crate) fn ensure_same_policy(
    x: &dyn HashPolicy,
    y: &dyn HashPolicy,
) -> Result<(), FilterError> {
    if x.is_compatible(y) {
        return Ok(());
    }
    warn!(
        left_policy = x.name(),
        left_k = x.k(),
        right_policy = y.name(),
        right_k = y.k(),
        "Rejected merge of filters with different hash policies"
    );
    Err(FilterError::IncompatibleMerge(format!(
        "hash policy {}(k={}) != {}(k={})",
        x.name(),
        x.k(),
        y.name(),
        y.k()
    )))
}

/// Write the header for `kind` and `policy`, then the variant payload
pub(crate) fn encode<F>(
    kind: FilterKind,
    policy: &dyn HashPolicy,
    payload: F,
) -> Result<Vec<u8>, FilterError>
where
    F: FnOnce(&mut FilterWriter) -> Result<(), FilterError>,
{
    let k = u16::try_from(policy.k()).map_err(|_| {
        FilterError::SerializationError(format!("hash count {} does not fit in u16", policy.k()))
    })?;

    let mut writer = FilterWriter::new();
    writer.write_u8(kind.tag())?;
    writer.write_u16(k)?;
    writer.write_str(policy.name())?;
    payload(&mut writer)?;
    Ok(writer.into_bytes())
}

/// Bloom filter of either variant
///
/// Exposes the operations both variants share; variant-specific ones are
/// reachable through the wrapped filter.
#[derive(Clone, Debug)]
pub enum BloomFilter {
    Basic(BasicBloomFilter),
    Counting(CountingBloomFilter),
}

impl From<BasicBloomFilter> for BloomFilter {
    fn from(filter: BasicBloomFilter) -> Self {
        BloomFilter::Basic(filter)
    }
}

impl From<CountingBloomFilter> for BloomFilter {
    fn from(filter: CountingBloomFilter) -> Self {
        BloomFilter::Counting(filter)
    }
}

impl BloomFilter {
    pub fn kind(&self) -> FilterKind {
        match self {
            BloomFilter::Basic(_) => FilterKind::Basic,
            BloomFilter::Counting(_) => FilterKind::Counting,
        }
    }

    pub fn hash_policy(&self) -> &dyn HashPolicy {
        match self {
            BloomFilter::Basic(f) => f.hash_policy(),
            BloomFilter::Counting(f) => f.hash_policy(),
        }
    }

    /// Number of cells in the backing array
    pub fn cells(&self) -> usize {
        match self {
            BloomFilter::Basic(f) => f.cells(),
            BloomFilter::Counting(f) => f.cells(),
        }
    }

    /// Insert an element
    pub fn add(&mut self, element: &[u8]) {
        let hashes = self.hash_policy().hash(element);
        match self {
            BloomFilter::Basic(f) => f.add_hashes(&hashes),
            BloomFilter::Counting(f) => f.add_hashes(&hashes),
        }
    }

    /// 0 if the element is definitely absent
    ///
    /// Basic filters answer 1 for "possibly present". Counting filters
    /// answer an estimate of the multiplicity that never undercounts.
    pub fn count(&self, element: &[u8]) -> u64 {
        let hashes = self.hash_policy().hash(element);
        match self {
            BloomFilter::Basic(f) => f.count_hashes(&hashes),
            BloomFilter::Counting(f) => f.count_hashes(&hashes),
        }
    }

    pub fn contains(&self, element: &[u8]) -> bool {
        self.count(element) > 0
    }

    pub fn is_empty(&self) -> bool {
        match self {
            BloomFilter::Basic(f) => f.is_empty(),
            BloomFilter::Counting(f) => f.is_empty(),
        }
    }

    pub fn clear(&mut self) {
        match self {
            BloomFilter::Basic(f) => f.clear(),
            BloomFilter::Counting(f) => f.clear(),
        }
    }

    /// Merge two filters of the same variant into a new one
    ///
    /// Basic filters are OR-ed, counting filters are summed with
    /// saturation. Mixing variants is an incompatible merge.
    pub fn merge(x: &BloomFilter, y: &BloomFilter) -> Result<BloomFilter, FilterError> {
        match (x, y) {
            (BloomFilter::Basic(a), BloomFilter::Basic(b)) => {
                BasicBloomFilter::merge(a, b).map(BloomFilter::Basic)
            }
            (BloomFilter::Counting(a), BloomFilter::Counting(b)) => {
                CountingBloomFilter::merge(a, b).map(BloomFilter::Counting)
            }
            _ => {
                warn!(
                    left = %x.kind(),
                    right = %y.kind(),
                    "Rejected merge of different filter variants"
                );
                Err(FilterError::IncompatibleMerge(format!(
                    "cannot merge {} filter with {} filter",
                    x.kind(),
                    y.kind()
                )))
            }
        }
    }

    /// Serialize to the tagged binary layout
    pub fn to_bytes(&self) -> Result<Vec<u8>, FilterError> {
        match self {
            BloomFilter::Basic(f) => f.to_bytes(),
            BloomFilter::Counting(f) => f.to_bytes(),
        }
    }

    /// Deserialize using the built-in hash policies
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FilterError> {
        Self::from_bytes_with_registry(bytes, &HashPolicyRegistry::default())
    }

    /// Deserialize, rebuilding the hash policy through `registry`
    pub fn from_bytes_with_registry(
        bytes: &[u8],
        registry: &HashPolicyRegistry,
    ) -> Result<Self, FilterError> {
        let mut reader = FilterReader::new(bytes);

        let kind = FilterKind::from_tag(reader.read_u8("filter type tag")?)?;
        let k = reader.read_u16("hash count")?;
        let name = reader.read_string("hash policy name")?;
        if k == 0 {
            return Err(FilterError::SerializationError(
                "hash count cannot be 0".to_string(),
            ));
        }
        let hash = registry.create(&name, usize::from(k))?;

        let filter = match kind {
            FilterKind::Basic => {
                BloomFilter::Basic(BasicBloomFilter::read_payload(hash, &mut reader)?)
            }
            FilterKind::Counting => {
                BloomFilter::Counting(CountingBloomFilter::read_payload(hash, &mut reader)?)
            }
        };
        reader.finish()?;

        debug!(
            kind = %kind,
            cells = filter.cells(),
            hash_count = k,
            policy = %name,
            "Deserialized Bloom filter"
        );
        Ok(filter)
    }
}
