//! Bounds-checked little-endian reader over an immutable byte view

use crate::{BridgeError, Result};

/// Read position over a borrowed byte slice.
///
/// Every read returns the decoded value together with the advanced cursor;
/// the underlying bytes are never reinterpreted in place.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// The unread tail of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    fn take<const N: usize>(self) -> Result<([u8; N], Self)> {
        let bytes = self
            .data
            .get(self.position..self.position + N)
            .ok_or_else(|| {
                BridgeError::decode_error(
                    "byte cursor",
                    format!(
                        "need {} bytes at offset {}, only {} available",
                        N,
                        self.position,
                        self.remaining()
                    ),
                )
            })?;

        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok((out, Self { data: self.data, position: self.position + N }))
    }

    pub fn read_u32(self) -> Result<(u32, Self)> {
        let (bytes, next) = self.take::<4>()?;
        Ok((u32::from_le_bytes(bytes), next))
    }

    pub fn read_i32(self) -> Result<(i32, Self)> {
        let (bytes, next) = self.take::<4>()?;
        Ok((i32::from_le_bytes(bytes), next))
    }
}
