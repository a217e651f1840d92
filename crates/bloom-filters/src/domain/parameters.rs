//! Bloom filter sizing mathematics
//!
//! Formulas:
//! - m = ceil(-n*ln(fpr) / (ln(2)^2))  -- minimum cells for a target FPR
//! - k = ceil((m/n) * ln(2))           -- hash functions for a cells/capacity ratio
//! - FPR = (1 - e^(-kn/m))^k           -- expected FPR after n insertions
//!
//! These are design-time targets. Nothing enforces the FPR at runtime.

use std::f64::consts::LN_2;

use super::bit_vector::MAX_BITS;
use crate::error::FilterError;

/// Largest hash count that fits the serialized u16 field
pub const MAX_HASH_COUNT: usize = u16::MAX as usize;

/// Sizing parameters derived from a target FPR and capacity
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilterParams {
    /// Number of cells in the filter (m)
    pub cells: usize,
    /// Number of hash functions (k)
    pub hash_count: usize,
    /// Expected false positive rate once `capacity` elements are added
    pub expected_fpr: f64,
}

/// Reject rates outside the open interval (0, 1), NaN included
pub fn validate_fpr(fpr: f64) -> Result<(), FilterError> {
    if fpr > 0.0 && fpr < 1.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidFPR { fpr })
    }
}

fn validate_capacity(capacity: usize) -> Result<(), FilterError> {
    if capacity == 0 {
        return Err(FilterError::InvalidCapacity);
    }
    Ok(())
}

/// Minimum cell count to hit `fpr` with `capacity` elements
pub fn optimal_cells(fpr: f64, capacity: usize) -> Result<usize, FilterError> {
    validate_fpr(fpr)?;
    validate_capacity(capacity)?;

    let ln2_squared = LN_2 * LN_2;
    let m = (-(capacity as f64) * fpr.ln() / ln2_squared).ceil();
    if !m.is_finite() || m > MAX_BITS as f64 {
        return Err(FilterError::InvalidParameters(format!(
            "cell count {m} for fpr={fpr}, capacity={capacity} exceeds {MAX_BITS}"
        )));
    }
    Ok((m as usize).max(1))
}

/// Hash function count for a given cells-to-capacity ratio
pub fn optimal_hash_count(cells: usize, capacity: usize) -> Result<usize, FilterError> {
    validate_capacity(capacity)?;
    if cells == 0 {
        return Err(FilterError::InvalidParameters(
            "cell count cannot be 0".to_string(),
        ));
    }

    let frac = cells as f64 / capacity as f64;
    let k = (frac * LN_2).ceil() as usize;
    Ok(k.clamp(1, MAX_HASH_COUNT))
}

/// Calculate cells and hash count together for given constraints
pub fn calculate_optimal_parameters(
    fpr: f64,
    capacity: usize,
) -> Result<BloomFilterParams, FilterError> {
    let cells = optimal_cells(fpr, capacity)?;
    let hash_count = optimal_hash_count(cells, capacity)?;

    Ok(BloomFilterParams {
        cells,
        hash_count,
        expected_fpr: calculate_fpr(cells, capacity, hash_count),
    })
}

/// Calculate the false positive rate for given parameters
///
/// Formula: FPR = (1 - e^(-kn/m))^k
pub fn calculate_fpr(m: usize, n: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}
