//! Hash policies for Bloom filters
//!
//! A policy turns an element into exactly k hash values. All built-in
//! policies use double hashing: h(i) = h1 + i * h2. Two base hashes give
//! k values without k independent computations.
//!
//! Policies are identified by a stable name so a serialized filter can
//! rebuild the same policy from (k, name) through a [`HashPolicyRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;
use std::io::Cursor;
use std::marker::PhantomData;

use sha2::{Digest, Sha256};
use siphasher::sip::SipHasher13;
use tracing::warn;

use super::parameters::MAX_HASH_COUNT;
use crate::error::FilterError;

/// Ordered hash values for one element, one per hash function
pub type HashVector = Vec<u64>;

/// Deterministic source of k hash values per element
pub trait HashPolicy: fmt::Debug + Send + Sync {
    /// Number of hash functions
    fn k(&self) -> usize;

    /// Stable name used to rebuild the policy from serialized form
    fn name(&self) -> &str;

    /// Exactly `k()` hash values for `element`
    fn hash(&self, element: &[u8]) -> HashVector;

    fn boxed_clone(&self) -> Box<dyn HashPolicy>;

    /// Two filters may only be merged when their policies agree
    fn is_compatible(&self, other: &dyn HashPolicy) -> bool {
        self.k() == other.k() && self.name() == other.name()
    }
}

/// Pair of independent 64-bit base hashes feeding [`DoubleHashing`]
pub trait BaseHashPair: fmt::Debug + Send + Sync + 'static {
    /// Registry name of the double-hashing policy built on this pair
    const NAME: &'static str;

    fn hash_pair(element: &[u8]) -> (u64, u64);
}

/// Hash an element with MurmurHash3 using a seed
pub fn murmur_hash(element: &[u8], seed: u32) -> u64 {
    let mut cursor = Cursor::new(element);

    // Use murmur3 128-bit hash and take the lower 64 bits
    let hash = murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0);
    hash as u64
}

/// MurmurHash3 x64/128 with seeds 0 and 1
#[derive(Debug)]
pub struct Murmur3;

impl BaseHashPair for Murmur3 {
    const NAME: &'static str = "double-murmur3";

    fn hash_pair(element: &[u8]) -> (u64, u64) {
        (murmur_hash(element, 0), murmur_hash(element, 1))
    }
}

const SIP_KEYS_1: (u64, u64) = (0x736f_6d65_7073_6575, 0x646f_7261_6e64_6f6d);
const SIP_KEYS_2: (u64, u64) = (0x6c79_6765_6e65_7261, 0x7465_6462_7974_6573);

/// SipHash-1-3 under two fixed key pairs
#[derive(Debug)]
pub struct SipHash;

impl SipHash {
    fn hash_with(element: &[u8], keys: (u64, u64)) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(keys.0, keys.1);
        hasher.write(element);
        hasher.finish()
    }
}

impl BaseHashPair for SipHash {
    const NAME: &'static str = "double-siphash";

    fn hash_pair(element: &[u8]) -> (u64, u64) {
        (
            Self::hash_with(element, SIP_KEYS_1),
            Self::hash_with(element, SIP_KEYS_2),
        )
    }
}

/// First two little-endian words of SHA-256
#[derive(Debug)]
pub struct Sha256Words;

impl BaseHashPair for Sha256Words {
    const NAME: &'static str = "double-sha256";

    fn hash_pair(element: &[u8]) -> (u64, u64) {
        let digest = Sha256::digest(element);
        let mut h1 = [0u8; 8];
        let mut h2 = [0u8; 8];
        h1.copy_from_slice(&digest[0..8]);
        h2.copy_from_slice(&digest[8..16]);
        (u64::from_le_bytes(h1), u64::from_le_bytes(h2))
    }
}

/// Double hashing over a base hash pair
pub struct DoubleHashing<H> {
    k: usize,
    _base: PhantomData<fn() -> H>,
}

/// The policy used when none is named explicitly
pub type DefaultHashing = DoubleHashing<Murmur3>;

/// Registry name of [`DefaultHashing`]
pub const DEFAULT_POLICY: &str = Murmur3::NAME;

impl<H: BaseHashPair> DoubleHashing<H> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            _base: PhantomData,
        }
    }
}

impl<H> Clone for DoubleHashing<H> {
    fn clone(&self) -> Self {
        Self {
            k: self.k,
            _base: PhantomData,
        }
    }
}

impl<H: BaseHashPair> fmt::Debug for DoubleHashing<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoubleHashing")
            .field("name", &H::NAME)
            .field("k", &self.k)
            .finish()
    }
}

impl<H: BaseHashPair> HashPolicy for DoubleHashing<H> {
    fn k(&self) -> usize {
        self.k
    }

    fn name(&self) -> &str {
        H::NAME
    }

    fn hash(&self, element: &[u8]) -> HashVector {
        let (h1, h2) = H::hash_pair(element);
        (0..self.k as u64)
            .map(|i| h1.wrapping_add(i.wrapping_mul(h2)))
            .collect()
    }

    fn boxed_clone(&self) -> Box<dyn HashPolicy> {
        Box::new(self.clone())
    }
}

/// Builds a policy with the given number of hash functions
pub type PolicyConstructor = fn(usize) -> Box<dyn HashPolicy>;

fn construct<H: BaseHashPair>(k: usize) -> Box<dyn HashPolicy> {
    Box::new(DoubleHashing::<H>::new(k))
}

/// Reject hash counts a filter cannot use or serialize
pub fn validate_hash_count(k: usize) -> Result<(), FilterError> {
    if k == 0 || k > MAX_HASH_COUNT {
        return Err(FilterError::InvalidParameters(format!(
            "hash count must be between 1 and {MAX_HASH_COUNT}, got {k}"
        )));
    }
    Ok(())
}

/// Name-keyed constructors used to rebuild policies at load time
///
/// Lookup is strict: a name that was never registered fails with
/// [`FilterError::UnsupportedPolicy`] and is never replaced by a default.
#[derive(Clone, Debug)]
pub struct HashPolicyRegistry {
    constructors: HashMap<String, PolicyConstructor>,
}

impl Default for HashPolicyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Murmur3::NAME, construct::<Murmur3>);
        registry.register(SipHash::NAME, construct::<SipHash>);
        registry.register(Sha256Words::NAME, construct::<Sha256Words>);
        registry
    }
}

impl HashPolicyRegistry {
    /// Registry with the built-in double-hashing policies
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no policies at all
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Add or replace a constructor, returning the previous one
    ///
    /// The constructed policy must report `name` from [`HashPolicy::name`].
    pub fn register(
        &mut self,
        name: impl Into<String>,
        constructor: PolicyConstructor,
    ) -> Option<PolicyConstructor> {
        self.constructors.insert(name.into(), constructor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the policy registered under `name` with `k` hash functions
    ///
    /// The constructed policy must report exactly `name` and `k`.
    pub fn create(&self, name: &str, k: usize) -> Result<Box<dyn HashPolicy>, FilterError> {
        validate_hash_count(k)?;
        let Some(constructor) = self.constructors.get(name) else {
            warn!(policy = name, "Unknown hash policy requested");
            return Err(FilterError::UnsupportedPolicy {
                name: name.to_string(),
            });
        };

        let policy = constructor(k);
        if policy.name() != name || policy.k() != k {
            warn!(
                policy = name,
                k,
                built_policy = policy.name(),
                built_k = policy.k(),
                "Registered constructor built a different hash policy"
            );
            return Err(FilterError::UnsupportedPolicy {
                name: name.to_string(),
            });
        }
        Ok(policy)
    }
}
