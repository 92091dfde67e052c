//! Byte-slice helpers shared by the binary record-header parser and the
//! value decoders. Operates purely on in-memory slices; file I/O lives in
//! `eclfile`.

use crate::error::{EclError, Result};
use crate::FlexString;
use std::convert::TryInto;
use std::str;

pub(crate) fn read_i32(input: &[u8]) -> i32 {
    i32::from_be_bytes(input.try_into().unwrap())
}

pub(crate) fn read_f32(input: &[u8]) -> f32 {
    f32::from_be_bytes(input.try_into().unwrap())
}

pub(crate) fn read_f64(input: &[u8]) -> f64 {
    f64::from_be_bytes(input.try_into().unwrap())
}

pub(crate) fn take(size: usize, input: &[u8]) -> Result<(&[u8], &[u8])> {
    if input.len() < size {
        return Err(EclError::NotEnoughBytes {
            record: String::new(),
            offset: 0,
            expected: size,
            found: input.len(),
        });
    }
    Ok(input.split_at(size))
}

pub(crate) fn take_i32(input: &[u8]) -> Result<(i32, &[u8])> {
    let (left, right) = take(4, input)?;
    Ok((read_i32(left), right))
}

pub(crate) fn take_str(size: usize, input: &[u8]) -> Result<(FlexString, &[u8])> {
    let (left, right) = take(size, input)?;
    let s = str::from_utf8(left).map_err(|source| EclError::InvalidUtf8 {
        record: String::new(),
        offset: 0,
        source,
    })?;
    Ok((FlexString::from(s.trim()), right))
}

/// Extract a single binary sub-block from `input`: a 4-byte header, the
/// payload it names, and a matching 4-byte trailer. Returns the payload and
/// the remaining input.
pub(crate) fn take_block<'a>(record: &str, offset: u64, input: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
    let (head, input) = take_i32(input).map_err(|_| EclError::NotEnoughBytes {
        record: record.to_string(),
        offset,
        expected: 4,
        found: input.len(),
    })?;
    let size = crate::block::check_head_tail(record, offset, head, head)?;
    let _ = size;

    let (data, input) = take(head as usize, input).map_err(|_| EclError::NotEnoughBytes {
        record: record.to_string(),
        offset,
        expected: head as usize,
        found: input.len(),
    })?;

    let (tail, input) = take_i32(input).map_err(|_| EclError::NotEnoughBytes {
        record: record.to_string(),
        offset,
        expected: 4,
        found: input.len(),
    })?;

    crate::block::check_head_tail(record, offset, head, tail)?;
    Ok((data, input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_block_roundtrip() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&8i32.to_be_bytes());
        buf.extend_from_slice(b"ABCDEFGH");
        buf.extend_from_slice(&8i32.to_be_bytes());

        let (data, rest) = take_block("TEST", 0, &buf).unwrap();
        assert_eq!(data, b"ABCDEFGH");
        assert!(rest.is_empty());
    }

    #[test]
    fn take_block_mismatch_errors() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&8i32.to_be_bytes());
        buf.extend_from_slice(b"ABCDEFGH");
        buf.extend_from_slice(&7i32.to_be_bytes());

        let err = take_block("TEST", 0, &buf).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }
}
