//! Test-only byte-level encoders mirroring the decoders in [`crate::eclfile`].
//! Used to build synthetic EGRID/SMSPEC/UNSMRY-shaped files in memory (or on
//! a temp dir) without checking in binary fixtures.
#![cfg(test)]

use crate::block::ArrayType;
use crate::FlexString;

#[derive(Debug, Clone)]
pub(crate) enum TestValue {
    Int(Vec<i32>),
    Real(Vec<f32>),
    Doub(Vec<f64>),
    Logi(Vec<bool>),
    Chars(Vec<String>),
    Message,
}

impl TestValue {
    fn array_type(&self) -> ArrayType {
        match self {
            TestValue::Int(_) => ArrayType::Int,
            TestValue::Real(_) => ArrayType::Real,
            TestValue::Doub(_) => ArrayType::Doub,
            TestValue::Logi(_) => ArrayType::Logi,
            TestValue::Chars(v) => {
                let width = v.iter().map(|s| s.len()).max().unwrap_or(8).max(8);
                ArrayType::Chars(width)
            }
            TestValue::Message => ArrayType::Message,
        }
    }

    fn len(&self) -> usize {
        match self {
            TestValue::Int(v) => v.len(),
            TestValue::Real(v) => v.len(),
            TestValue::Doub(v) => v.len(),
            TestValue::Logi(v) => v.len(),
            TestValue::Chars(v) => v.len(),
            TestValue::Message => 0,
        }
    }

    /// Serialize each element to its fixed-width on-disk byte representation,
    /// without any block framing.
    fn element_bytes(&self) -> Vec<Vec<u8>> {
        match self {
            TestValue::Int(v) => v.iter().map(|x| x.to_be_bytes().to_vec()).collect(),
            TestValue::Real(v) => v.iter().map(|x| x.to_be_bytes().to_vec()).collect(),
            TestValue::Doub(v) => v.iter().map(|x| x.to_be_bytes().to_vec()).collect(),
            TestValue::Logi(v) => v
                .iter()
                .map(|&b| (if b { 1i32 } else { 0i32 }).to_be_bytes().to_vec())
                .collect(),
            TestValue::Chars(v) => {
                let width = match self.array_type() {
                    ArrayType::Chars(n) => n,
                    _ => unreachable!(),
                };
                v.iter()
                    .map(|s| {
                        let mut b = s.as_bytes().to_vec();
                        b.resize(width, b' ');
                        b
                    })
                    .collect()
            }
            TestValue::Message => vec![],
        }
    }

    /// Formatted-text representation of each element, not yet padded.
    fn element_text(&self) -> Vec<String> {
        match self {
            TestValue::Int(v) => v.iter().map(|x| x.to_string()).collect(),
            TestValue::Real(v) => v.iter().map(|x| format!("{:.6E}", x)).collect(),
            TestValue::Doub(v) => v.iter().map(|x| format!("{:.12E}", x)).collect(),
            TestValue::Logi(v) => v
                .iter()
                .map(|&b| if b { "T".to_string() } else { "F".to_string() })
                .collect(),
            TestValue::Chars(v) => v.iter().map(|s| format!("'{}'", s)).collect(),
            TestValue::Message => vec![],
        }
    }
}

fn pad8(name: &str) -> [u8; 8] {
    let mut buf = [b' '; 8];
    let bytes = name.as_bytes();
    buf[..bytes.len()].copy_from_slice(bytes);
    buf
}

/// Append one binary-encoded record (header block + chunked data blocks) to `out`.
pub(crate) fn encode_binary_record(out: &mut Vec<u8>, name: &str, value: &TestValue) {
    let ty = value.array_type();
    let n = value.len();

    // Header block: 16 bytes of payload (8 name + 4 count + 4 type).
    out.extend_from_slice(&16i32.to_be_bytes());
    out.extend_from_slice(&pad8(name));
    out.extend_from_slice(&(n as i32).to_be_bytes());
    let mut type_code = [b' '; 4];
    let code = ty.type_code();
    type_code[..code.len()].copy_from_slice(code.as_bytes());
    out.extend_from_slice(&type_code);
    out.extend_from_slice(&16i32.to_be_bytes());

    if n == 0 {
        return;
    }

    let block_len = ty.binary_block_length();
    let elems = value.element_bytes();
    for chunk in elems.chunks(block_len) {
        let payload_len: usize = chunk.iter().map(|e| e.len()).sum();
        out.extend_from_slice(&(payload_len as i32).to_be_bytes());
        for e in chunk {
            out.extend_from_slice(e);
        }
        out.extend_from_slice(&(payload_len as i32).to_be_bytes());
    }
}

/// Append one formatted-encoded record to `out`.
pub(crate) fn encode_formatted_record(out: &mut Vec<u8>, name: &str, value: &TestValue) {
    let ty = value.array_type();
    let n = value.len();

    out.extend_from_slice(format!("'{:<8}'{:>13}'{}'\n", name, n, ty.type_code()).as_bytes());
    if n == 0 {
        return;
    }

    let block_len = ty.binary_block_length();
    let (num_columns, column_width) = ty.formatted_columns();
    let text = value.element_text();

    for block in text.chunks(block_len) {
        for line in block.chunks(num_columns) {
            for tok in line {
                out.extend_from_slice(format!("{:>width$}", tok, width = column_width).as_bytes());
            }
            out.push(b'\n');
        }
    }
}

pub(crate) fn flex(s: &str) -> FlexString {
    FlexString::from(s)
}
