//! Binary sample record decoding.
//!
//! A `data/samples` payload is a flat little-endian array of 32-bit words:
//!
//! ```text
//! [start: u32][end: u32][ch0: i32][ch1: i32]...[chN: i32] x (end - start) rows
//! ```
//!
//! Channel values are channel-major within each time row. The channel count
//! is not transmitted; it is derived as `(words - 2) / (end - start)`.
//!
//! Decoding is a pure function of the payload: [`SampleRecord::decode`]
//! borrows the payload and never copies sample data until asked to.

mod cursor;

pub use cursor::ByteCursor;

use crate::{BridgeError, Result};

const WORD: usize = std::mem::size_of::<u32>();
const HEADER_WORDS: usize = 2;

/// One decoded `data/samples` record, borrowing the payload.
#[derive(Debug, Clone, Copy)]
pub struct SampleRecord<'a> {
    /// Absolute device index of the first row
    pub start_index: u32,
    /// Absolute device index one past the last row
    pub end_index: u32,
    pub channel_count: usize,
    data: &'a [u8],
}

impl<'a> SampleRecord<'a> {
    /// Decode a sample payload.
    ///
    /// Fails on payloads shorter than the header, payloads that are not a
    /// whole number of words, degenerate runs (`end == start`) and bodies
    /// that do not divide evenly into `end - start` rows.
    pub fn decode(payload: &'a [u8]) -> Result<Self> {
        if payload.len() % WORD != 0 {
            return Err(BridgeError::decode_error(
                "sample record",
                format!("payload length {} is not a multiple of {}", payload.len(), WORD),
            ));
        }

        let cursor = ByteCursor::new(payload);
        let (start_index, cursor) = cursor.read_u32()?;
        let (end_index, cursor) = cursor.read_u32()?;

        let rows = end_index.wrapping_sub(start_index) as usize;
        if rows == 0 {
            return Err(BridgeError::decode_error(
                "sample record",
                format!("degenerate run: start == end == {}", start_index),
            ));
        }

        let data = cursor.rest();
        let words = data.len() / WORD;
        if words == 0 || words % rows != 0 {
            return Err(BridgeError::decode_error(
                "sample record",
                format!(
                    "{} sample words do not divide into {} rows (start {}, end {})",
                    words, rows, start_index, end_index
                ),
            ));
        }

        Ok(Self { start_index, end_index, channel_count: words / rows, data })
    }

    /// Number of time rows (`end_index - start_index`).
    pub fn row_count(&self) -> usize {
        self.end_index.wrapping_sub(self.start_index) as usize
    }

    /// Total number of decoded integers across all rows.
    pub fn value_count(&self) -> usize {
        self.data.len() / WORD
    }

    /// Raw channel values in payload order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = i32> + 'a {
        self.data
            .chunks_exact(WORD)
            .map(|w| i32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }

    /// Append this record's values to `out`.
    pub fn extend_into(&self, out: &mut Vec<i32>) {
        out.reserve(self.value_count());
        out.extend(self.values());
    }

    /// Raw channel values of one row, or `None` past the end.
    pub fn row(&self, row: usize) -> Option<Vec<i32>> {
        if row >= self.row_count() {
            return None;
        }
        let width = self.channel_count * WORD;
        let bytes = self.data.get(row * width..(row + 1) * width)?;
        Some(bytes.chunks_exact(WORD).map(|w| i32::from_le_bytes([w[0], w[1], w[2], w[3]])).collect())
    }
}

/// Encode a sample payload in the device's wire layout.
///
/// `rows` must all have the same width.
pub fn encode_samples(start_index: u32, rows: &[Vec<i32>]) -> Vec<u8> {
    let channels = rows.first().map_or(0, Vec::len);
    let end_index = start_index.wrapping_add(rows.len() as u32);
    let mut payload = Vec::with_capacity((HEADER_WORDS + channels * rows.len()) * WORD);
    payload.extend_from_slice(&start_index.to_le_bytes());
    payload.extend_from_slice(&end_index.to_le_bytes());
    for value in rows.iter().flatten() {
        payload.extend_from_slice(&value.to_le_bytes());
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn arb_rows()(channels in 1usize..24, rows in 1usize..40)
            (data in prop::collection::vec(prop::collection::vec(any::<i32>(), channels), rows))
            -> Vec<Vec<i32>> {
            data
        }
    }

    proptest! {
        #[test]
        fn prop_decode_recovers_header_and_rows(start in any::<u32>(), rows in arb_rows()) {
            let payload = encode_samples(start, &rows);
            let record = SampleRecord::decode(&payload).unwrap();

            prop_assert_eq!(record.start_index, start);
            prop_assert_eq!(record.end_index, start.wrapping_add(rows.len() as u32));
            prop_assert_eq!(record.channel_count, rows[0].len());
            prop_assert_eq!(record.row_count(), rows.len());

            for (i, expected) in rows.iter().enumerate() {
                let row = record.row(i);
                prop_assert_eq!(row.as_ref(), Some(expected));
            }
            prop_assert!(record.row(rows.len()).is_none());
        }

        #[test]
        fn prop_decode_never_panics_on_garbage(payload in prop::collection::vec(any::<u8>(), 0..256)) {
            if let Ok(record) = SampleRecord::decode(&payload) {
                prop_assert_eq!(record.value_count(), record.row_count() * record.channel_count);
            }
        }
    }

    #[test]
    fn degenerate_run_is_rejected() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&7u32.to_le_bytes());
        payload.extend_from_slice(&7u32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        let err = SampleRecord::decode(&payload).unwrap_err();
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn short_and_ragged_payloads_are_rejected() {
        assert!(SampleRecord::decode(&[]).is_err());
        assert!(SampleRecord::decode(&[0, 0, 0, 0]).is_err());
        assert!(SampleRecord::decode(&[0, 0, 0, 0, 1, 0, 0, 0, 9]).is_err());

        // header claims 3 rows but carries 4 words
        let mut payload = encode_samples(0, &[vec![1, 2], vec![3, 4]]);
        payload[4..8].copy_from_slice(&3u32.to_le_bytes());
        assert!(SampleRecord::decode(&payload).is_err());
    }

    #[test]
    fn header_only_payload_is_rejected() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&2u32.to_le_bytes());
        assert!(SampleRecord::decode(&payload).is_err());
    }

    #[test]
    fn values_are_channel_major_per_row() {
        let payload = encode_samples(0, &[vec![100, 200], vec![150, 250]]);
        let record = SampleRecord::decode(&payload).unwrap();
        assert_eq!(record.channel_count, 2);
        assert_eq!(record.values().collect::<Vec<_>>(), vec![100, 200, 150, 250]);

        let mut out = vec![1];
        record.extend_into(&mut out);
        assert_eq!(out, vec![1, 100, 200, 150, 250]);
    }
}
