//! Byte-stream codec for filter serialization
//!
//! Thin typed wrappers around `bincode` with fixed-width little-endian
//! integers. Strings and byte buffers are written with a u64 length prefix.
//!
//! Every read is bounded by the bytes still available, so a corrupt length
//! prefix fails with an error instead of allocating.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FilterError;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

/// Append-only writer producing the serialized form of a filter
#[derive(Debug, Default)]
pub struct FilterWriter {
    bytes: Vec<u8>,
}

impl FilterWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FilterError> {
        options().serialize_into(&mut self.bytes, value)?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), FilterError> {
        self.write(&value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), FilterError> {
        self.write(&value)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), FilterError> {
        self.write(&value)
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_str(&mut self, value: &str) -> Result<(), FilterError> {
        self.write(value)
    }

    /// Write a length-prefixed byte buffer
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<(), FilterError> {
        self.write(value)
    }

    /// Consume the writer and return the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over serialized filter bytes
#[derive(Debug)]
pub struct FilterReader<'a> {
    input: &'a [u8],
}

impl<'a> FilterReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    fn read<T: DeserializeOwned>(&mut self, field: &'static str) -> Result<T, FilterError> {
        let limit = self.input.len() as u64;
        options()
            .with_limit(limit)
            .deserialize_from(&mut self.input)
            .map_err(|e| FilterError::SerializationError(format!("failed to read {field}: {e}")))
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, FilterError> {
        self.read(field)
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, FilterError> {
        self.read(field)
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, FilterError> {
        self.read(field)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self, field: &'static str) -> Result<String, FilterError> {
        self.read(field)
    }

    /// Read a length-prefixed byte buffer
    pub fn read_bytes(&mut self, field: &'static str) -> Result<Vec<u8>, FilterError> {
        self.read(field)
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Ensure the whole input was consumed
    pub fn finish(self) -> Result<(), FilterError> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(FilterError::SerializationError(format!(
                "{} trailing bytes after filter payload",
                self.input.len()
            )))
        }
    }
}
