//! Fixed-size bit array backing the basic Bloom filter

use bitvec::prelude::*;

use crate::codec::{FilterReader, FilterWriter};
use crate::error::FilterError;

/// Largest number of bits a single array can address
pub const MAX_BITS: usize = BitSlice::<u8, Lsb0>::MAX_BITS;

/// Reject a raw buffer whose unused high bits in the last byte are set
pub(crate) fn check_padding(raw: &[u8], bits: usize, what: &str) -> Result<(), FilterError> {
    let used = bits % 8;
    match raw.last() {
        Some(&last) if used != 0 && last >> used != 0 => Err(FilterError::SerializationError(
            format!("{what} has nonzero padding bits"),
        )),
        _ => Ok(()),
    }
}

/// Dense bit array of fixed length
///
/// The length is set at construction and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVector {
    bits: BitVec<u8, Lsb0>,
}

impl BitVector {
    /// Create `len` unset bits
    pub fn new(len: usize) -> Result<Self, FilterError> {
        if len == 0 {
            return Err(FilterError::InvalidParameters(
                "bit vector length cannot be 0".to_string(),
            ));
        }
        if len > MAX_BITS {
            return Err(FilterError::InvalidParameters(format!(
                "{len} bits exceed the addressable maximum of {MAX_BITS}"
            )));
        }
        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; len],
        })
    }

    /// Set the bit at `index`
    ///
    /// # Panics
    /// Panics if `index >= size()`.
    pub fn set(&mut self, index: usize) {
        self.bits.set(index, true);
    }

    /// Read the bit at `index`
    ///
    /// # Panics
    /// Panics if `index >= size()`.
    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// Number of bits (M)
    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn not_any(&self) -> bool {
        self.bits.not_any()
    }

    /// Reset every bit to 0
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Bitwise OR of two vectors of the same length
    pub fn union(&self, other: &BitVector) -> Result<BitVector, FilterError> {
        if self.size() != other.size() {
            return Err(FilterError::IncompatibleMerge(format!(
                "bit vector length {} != {}",
                self.size(),
                other.size()
            )));
        }

        // OR the underlying byte slices directly
        let mut result = self.clone();
        for (s, o) in result
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *s |= *o;
        }
        Ok(result)
    }

    /// Write the length followed by the raw LSB-first bytes
    pub fn write_to(&self, writer: &mut FilterWriter) -> Result<(), FilterError> {
        writer.write_u64(self.size() as u64)?;
        writer.write_bytes(self.bits.as_raw_slice())
    }

    /// Read a vector written by [`BitVector::write_to`]
    pub fn read_from(reader: &mut FilterReader<'_>) -> Result<Self, FilterError> {
        let len = reader.read_u64("bit count")?;
        let raw = reader.read_bytes("bit array")?;

        let len = usize::try_from(len).map_err(|_| {
            FilterError::SerializationError(format!("bit count {len} exceeds address space"))
        })?;
        if len == 0 {
            return Err(FilterError::SerializationError(
                "bit count cannot be 0".to_string(),
            ));
        }
        if raw.len() != len.div_ceil(8) {
            return Err(FilterError::SerializationError(format!(
                "bit array holds {} bytes, {} bits need {}",
                raw.len(),
                len,
                len.div_ceil(8)
            )));
        }

        check_padding(&raw, len, "bit array")?;

        let mut bits = BitVec::<u8, Lsb0>::from_vec(raw);
        bits.truncate(len);
        Ok(Self { bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_vector_is_unset() {
        let bits = BitVector::new(100).unwrap();
        assert_eq!(bits.size(), 100);
        assert_eq!(bits.count_ones(), 0);
        assert!(bits.not_any());
        assert!((0..100).all(|i| !bits.get(i)));
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(BitVector::new(0).is_err());
    }

    #[test]
    fn test_set_and_get() {
        let mut bits = BitVector::new(20).unwrap();
        bits.set(0);
        bits.set(19);
        bits.set(19);

        assert!(bits.get(0));
        assert!(bits.get(19));
        assert!(!bits.get(10));
        assert_eq!(bits.count_ones(), 2);

        bits.clear();
        assert!(bits.not_any());
    }

    #[test]
    fn test_union_is_bitwise_or() {
        let mut a = BitVector::new(12).unwrap();
        let mut b = BitVector::new(12).unwrap();
        a.set(1);
        a.set(9);
        b.set(9);
        b.set(11);

        let c = a.union(&b).unwrap();
        let set: Vec<usize> = (0..12).filter(|&i| c.get(i)).collect();
        assert_eq!(set, vec![1, 9, 11]);
    }

    #[test]
    fn test_union_rejects_length_mismatch() {
        let a = BitVector::new(8).unwrap();
        let b = BitVector::new(9).unwrap();
        assert!(matches!(
            a.union(&b),
            Err(FilterError::IncompatibleMerge(_))
        ));
    }

    #[test]
    fn test_serialization_keeps_length_and_bits() {
        let mut bits = BitVector::new(13).unwrap();
        bits.set(3);
        bits.set(12);

        let mut writer = FilterWriter::new();
        bits.write_to(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = FilterReader::new(&bytes);
        let restored = BitVector::read_from(&mut reader).unwrap();
        assert_eq!(restored, bits);
        assert_eq!(restored.size(), 13);
    }

    #[test]
    fn test_length_beyond_addressable_bits_rejected() {
        let err = BitVector::new(MAX_BITS + 1).unwrap_err();
        assert!(err.is_construction(), "got {err:?}");
        assert!(BitVector::new(usize::MAX).is_err());
    }

    #[test]
    fn test_nonzero_padding_rejected() {
        let mut writer = FilterWriter::new();
        writer.write_u64(13).unwrap();
        writer.write_bytes(&[0x00, 0xE0]).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = FilterReader::new(&bytes);
        let err = BitVector::read_from(&mut reader).unwrap_err();
        assert!(err.is_serialization(), "got {err:?}");

        // Only the live bits of the last byte may be set
        let mut writer = FilterWriter::new();
        writer.write_u64(13).unwrap();
        writer.write_bytes(&[0x00, 0x1F]).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = FilterReader::new(&bytes);
        let restored = BitVector::read_from(&mut reader).unwrap();
        assert_eq!(restored.count_ones(), 5);
    }

    #[test]
    fn test_inconsistent_raw_length_rejected() {
        let mut writer = FilterWriter::new();
        writer.write_u64(64).unwrap();
        writer.write_bytes(&[0xFF; 3]).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = FilterReader::new(&bytes);
        assert!(BitVector::read_from(&mut reader).is_err());
    }
}
