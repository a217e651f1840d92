//! Packed saturating counters backing the counting Bloom filter
//!
//! Counters are `width` bits wide and packed back to back in one bit array,
//! so a 4-bit vector stores two counters per byte.
//!
//! INVARIANTS:
//! - No counter ever exceeds 2^width - 1. Increments past the maximum
//!   clamp to the maximum instead of wrapping.
//! - The number of counters and their width never change after construction.

use std::ops::Range;

use bitvec::prelude::*;

use super::bit_vector::{check_padding, MAX_BITS};
use crate::codec::{FilterReader, FilterWriter};
use crate::error::FilterError;

/// Widest supported counter
pub const MAX_COUNTER_WIDTH: u8 = 64;

/// Fixed-size array of fixed-width saturating counters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterVector {
    bits: BitVec<u8, Lsb0>,
    width: u8,
    len: usize,
}

fn storage_bits(width: u8, len: usize) -> Result<usize, FilterError> {
    if width == 0 || width > MAX_COUNTER_WIDTH {
        return Err(FilterError::InvalidParameters(format!(
            "counter width must be between 1 and {MAX_COUNTER_WIDTH} bits, got {width}"
        )));
    }
    if len == 0 {
        return Err(FilterError::InvalidParameters(
            "counter vector length cannot be 0".to_string(),
        ));
    }
    match len.checked_mul(width as usize) {
        Some(total) if total <= MAX_BITS => Ok(total),
        _ => Err(FilterError::InvalidParameters(format!(
            "{len} counters of {width} bits exceed the addressable maximum of {MAX_BITS} bits"
        ))),
    }
}

impl CounterVector {
    /// Create `len` zeroed counters of `width` bits each
    pub fn new(width: u8, len: usize) -> Result<Self, FilterError> {
        let total = storage_bits(width, len)?;
        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; total],
            width,
            len,
        })
    }

    /// Number of counters (M)
    pub fn size(&self) -> usize {
        self.len
    }

    /// Bits per counter
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Largest value a counter can hold
    pub fn max_count(&self) -> u64 {
        if self.width == MAX_COUNTER_WIDTH {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    fn slot(&self, index: usize) -> Range<usize> {
        let start = index * self.width as usize;
        start..start + self.width as usize
    }

    /// Current value of the counter at `index`
    ///
    /// # Panics
    /// Panics if `index >= size()`.
    pub fn count(&self, index: usize) -> u64 {
        self.bits[self.slot(index)].load_le::<u64>()
    }

    fn store(&mut self, index: usize, value: u64) {
        let slot = self.slot(index);
        self.bits[slot].store_le::<u64>(value);
    }

    /// Add `delta` to the counter at `index`, clamping at [`max_count`]
    ///
    /// Returns false when the counter saturated.
    ///
    /// [`max_count`]: CounterVector::max_count
    pub fn increment(&mut self, index: usize, delta: u64) -> bool {
        let max = self.max_count();
        let (value, fits) = match self.count(index).checked_add(delta) {
            Some(v) if v <= max => (v, true),
            _ => (max, false),
        };
        self.store(index, value);
        fits
    }

    /// Subtract `delta` from the counter at `index`, clamping at 0
    ///
    /// Returns false when the counter would have gone below zero.
    pub fn decrement(&mut self, index: usize, delta: u64) -> bool {
        let (value, fits) = match self.count(index).checked_sub(delta) {
            Some(v) => (v, true),
            None => (0, false),
        };
        self.store(index, value);
        fits
    }

    /// True if every counter is zero
    pub fn all_zero(&self) -> bool {
        self.bits.not_any()
    }

    /// Reset every counter to zero
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Element-wise saturating sum of two vectors with the same shape
    pub fn saturating_add(&self, other: &CounterVector) -> Result<CounterVector, FilterError> {
        if self.len != other.len {
            return Err(FilterError::IncompatibleMerge(format!(
                "counter count {} != {}",
                self.len, other.len
            )));
        }
        if self.width != other.width {
            return Err(FilterError::IncompatibleMerge(format!(
                "counter width {} != {}",
                self.width, other.width
            )));
        }

        let mut result = self.clone();
        for index in 0..other.len {
            let delta = other.count(index);
            if delta > 0 {
                result.increment(index, delta);
            }
        }
        Ok(result)
    }

    /// Write length, width, then the packed counters
    pub fn write_to(&self, writer: &mut FilterWriter) -> Result<(), FilterError> {
        writer.write_u64(self.len as u64)?;
        writer.write_u8(self.width)?;
        writer.write_bytes(self.bits.as_raw_slice())
    }

    /// Read a vector written by [`CounterVector::write_to`]
    pub fn read_from(reader: &mut FilterReader<'_>) -> Result<Self, FilterError> {
        let len = reader.read_u64("counter count")?;
        let width = reader.read_u8("counter width")?;
        let raw = reader.read_bytes("counter array")?;

        let len = usize::try_from(len).map_err(|_| {
            FilterError::SerializationError(format!("counter count {len} exceeds address space"))
        })?;
        let total = storage_bits(width, len)
            .map_err(|e| FilterError::SerializationError(e.to_string()))?;
        if raw.len() != total.div_ceil(8) {
            return Err(FilterError::SerializationError(format!(
                "counter array holds {} bytes, {} counters of {} bits need {}",
                raw.len(),
                len,
                width,
                total.div_ceil(8)
            )));
        }

        check_padding(&raw, total, "counter array")?;

        let mut bits = BitVec::<u8, Lsb0>::from_vec(raw);
        bits.truncate(total);
        Ok(Self { bits, width, len })
    }
}
