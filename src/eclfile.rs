//! Block-structured container reader: a single-pass directory scan over a
//! binary or formatted Eclipse file, followed by lazy, on-demand decoding of
//! individual records.
//!
//! The directory holds `{name, type, count, offset}` for every record
//! without ever reading a payload; `load_data`/`get_*` decode a record the
//! first time it's asked for and cache the result.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::binary_parsing as bp;
use crate::block::{self, ArrayType};
use crate::error::{EclError, Result};
use crate::FlexString;

/// Whether a file is Eclipse's big-endian binary encoding or its column
/// formatted ASCII encoding. Inferred from the file extension: a formatted
/// extension always starts with `F` (`.FEGRID`, `.FSMSPEC`, `.FUNSMRY`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EclFileFormat {
    Binary,
    Formatted,
}

impl EclFileFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext.starts_with('F') || ext.starts_with('f') {
            EclFileFormat::Formatted
        } else {
            EclFileFormat::Binary
        }
    }
}

/// The decoded contents of one record, tagged by its on-disk type.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordData {
    Int(Vec<i32>),
    Real(Vec<f32>),
    Doub(Vec<f64>),
    Logi(Vec<bool>),
    Chars(Vec<FlexString>),
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDataKind {
    Int,
    Real,
    Doub,
    Logi,
    Chars,
    Message,
}

impl RecordData {
    pub fn kind(&self) -> RecordDataKind {
        match self {
            RecordData::Int(_) => RecordDataKind::Int,
            RecordData::Real(_) => RecordDataKind::Real,
            RecordData::Doub(_) => RecordDataKind::Doub,
            RecordData::Logi(_) => RecordDataKind::Logi,
            RecordData::Chars(_) => RecordDataKind::Chars,
            RecordData::Message => RecordDataKind::Message,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordData::Int(v) => v.len(),
            RecordData::Real(v) => v.len(),
            RecordData::Doub(v) => v.len(),
            RecordData::Logi(v) => v.len(),
            RecordData::Chars(v) => v.len(),
            RecordData::Message => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn wrong_type(&self, name: &str, expected: &str) -> EclError {
        EclError::WrongType {
            name: name.to_string(),
            expected: expected.to_string(),
            found: format!("{:?}", self.kind()),
        }
    }

    pub fn as_int(&self, name: &str) -> Result<&[i32]> {
        match self {
            RecordData::Int(v) => Ok(v),
            _ => Err(self.wrong_type(name, "INTE")),
        }
    }

    pub fn as_real(&self, name: &str) -> Result<&[f32]> {
        match self {
            RecordData::Real(v) => Ok(v),
            _ => Err(self.wrong_type(name, "REAL")),
        }
    }

    pub fn as_doub(&self, name: &str) -> Result<&[f64]> {
        match self {
            RecordData::Doub(v) => Ok(v),
            _ => Err(self.wrong_type(name, "DOUB")),
        }
    }

    pub fn as_logi(&self, name: &str) -> Result<&[bool]> {
        match self {
            RecordData::Logi(v) => Ok(v),
            _ => Err(self.wrong_type(name, "LOGI")),
        }
    }

    pub fn as_chars(&self, name: &str) -> Result<&[FlexString]> {
        match self {
            RecordData::Chars(v) => Ok(v),
            _ => Err(self.wrong_type(name, "CHAR")),
        }
    }

    fn new_with_capacity(ty: ArrayType, n: usize) -> Self {
        match ty {
            ArrayType::Int => RecordData::Int(Vec::with_capacity(n)),
            ArrayType::Real => RecordData::Real(Vec::with_capacity(n)),
            ArrayType::Doub => RecordData::Doub(Vec::with_capacity(n)),
            ArrayType::Logi => RecordData::Logi(Vec::with_capacity(n)),
            ArrayType::Chars(_) => RecordData::Chars(Vec::with_capacity(n)),
            ArrayType::Message => RecordData::Message,
        }
    }

    fn push_binary_element(&mut self, elem_size: usize, bytes: &[u8]) {
        match self {
            RecordData::Int(v) => v.push(bp::read_i32(bytes)),
            RecordData::Real(v) => v.push(bp::read_f32(bytes)),
            RecordData::Doub(v) => v.push(bp::read_f64(bytes)),
            RecordData::Logi(v) => v.push(bp::read_i32(bytes) != 0),
            RecordData::Chars(v) => {
                let s = String::from_utf8_lossy(bytes);
                v.push(FlexString::from(s.trim_end()));
            }
            RecordData::Message => {}
        }
        let _ = elem_size;
    }

    fn push_formatted_element(&mut self, token: &str) -> Result<()> {
        let t = token.trim();
        match self {
            RecordData::Int(v) => v.push(t.parse().map_err(|_| {
                EclError::InvalidStringLength(format!("bad INTE token {:?}", token))
            })?),
            RecordData::Real(v) => v.push(parse_fortran_float(t)? as f32),
            RecordData::Doub(v) => v.push(parse_fortran_float(t)?),
            RecordData::Logi(v) => v.push(t == "T" || t == "TRUE"),
            RecordData::Chars(v) => v.push(FlexString::from(t.trim_matches('\''))),
            RecordData::Message => {}
        }
        Ok(())
    }
}

/// Fortran formatted floats use `D` or no exponent marker (`1.0E+02`,
/// `1.0D+02`); Rust's parser only understands `E`.
fn parse_fortran_float(s: &str) -> Result<f64> {
    let normalized = s.replace('D', "E").replace('d', "e");
    normalized
        .parse()
        .map_err(|_| EclError::InvalidStringLength(format!("bad float token {:?}", s)))
}

#[derive(Debug, Clone)]
struct RecordInfo {
    name: FlexString,
    array_type: ArrayType,
    count: usize,
    offset: u64,
}

/// A directory of records over a single binary or formatted file, with
/// payloads decoded on demand and cached.
#[derive(Debug)]
pub struct EclFile {
    path: PathBuf,
    format: EclFileFormat,
    directory: Vec<RecordInfo>,
    by_name: HashMap<String, Vec<usize>>,
    cache: Vec<Option<RecordData>>,
}

impl EclFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = EclFileFormat::from_path(&path);
        let file = File::open(&path).map_err(|source| EclError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let directory = build_directory(format, &mut reader)?;

        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, rec) in directory.iter().enumerate() {
            by_name.entry(rec.name.to_string()).or_default().push(idx);
        }
        let cache = vec![None; directory.len()];

        Ok(EclFile {
            path,
            format,
            directory,
            by_name,
            cache,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> EclFileFormat {
        self.format
    }

    pub fn count(&self) -> usize {
        self.directory.len()
    }

    pub fn list(&self) -> impl Iterator<Item = (&str, RecordDataKind, usize)> + '_ {
        self.directory
            .iter()
            .map(|r| (r.name.as_str(), kind_of(r.array_type), r.count))
    }

    pub fn has_key(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Indices of every occurrence of `name`, in file order.
    pub fn indices_of(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn last_index_of(&self, name: &str) -> Result<usize> {
        self.by_name
            .get(name)
            .and_then(|v| v.last().copied())
            .ok_or_else(|| EclError::NotFound(name.to_string()))
    }

    pub fn load_data(&mut self, index: usize) -> Result<&RecordData> {
        if index >= self.directory.len() {
            return Err(EclError::IndexOutOfRange {
                index,
                len: self.directory.len(),
            });
        }
        if self.cache[index].is_none() {
            let record = &self.directory[index];
            let data = load_record(&self.path, self.format, record)?;
            self.cache[index] = Some(data);
        }
        Ok(self.cache[index].as_ref().unwrap())
    }

    pub fn load_by_name(&mut self, name: &str) -> Result<&RecordData> {
        let idx = self.last_index_of(name)?;
        self.load_data(idx)
    }

    pub fn load_all(&mut self) -> Result<()> {
        for idx in 0..self.directory.len() {
            self.load_data(idx)?;
        }
        Ok(())
    }

    pub fn get_int(&mut self, name: &str) -> Result<&[i32]> {
        let idx = self.last_index_of(name)?;
        self.load_data(idx)?.as_int(name)
    }

    pub fn get_real(&mut self, name: &str) -> Result<&[f32]> {
        let idx = self.last_index_of(name)?;
        self.load_data(idx)?.as_real(name)
    }

    pub fn get_doub(&mut self, name: &str) -> Result<&[f64]> {
        let idx = self.last_index_of(name)?;
        self.load_data(idx)?.as_doub(name)
    }

    pub fn get_logi(&mut self, name: &str) -> Result<&[bool]> {
        let idx = self.last_index_of(name)?;
        self.load_data(idx)?.as_logi(name)
    }

    pub fn get_chars(&mut self, name: &str) -> Result<&[FlexString]> {
        let idx = self.last_index_of(name)?;
        self.load_data(idx)?.as_chars(name)
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.cache.get(index).map(|c| c.is_some()).unwrap_or(false)
    }

    pub fn record_meta(&self, index: usize) -> Result<(&str, RecordDataKind, usize, u64)> {
        let r = self.directory.get(index).ok_or(EclError::IndexOutOfRange {
            index,
            len: self.directory.len(),
        })?;
        Ok((r.name.as_str(), kind_of(r.array_type), r.count, r.offset))
    }

    pub fn index_of_last(&self, name: &str) -> Result<usize> {
        self.last_index_of(name)
    }

    /// Read a single element out of a REAL record by seeking directly to its
    /// byte offset, without decoding the rest of the record. Used by
    /// `EGrid`'s partial ZCORN layer streaming. Only supported for binary
    /// files; formatted files must be fully decoded.
    pub fn read_real_element(&self, index: usize, element_pos: usize) -> Result<f32> {
        let (name, kind, count, offset) = self.record_meta(index)?;
        if kind != RecordDataKind::Real {
            return Err(EclError::WrongType {
                name: name.to_string(),
                expected: "REAL".to_string(),
                found: format!("{:?}", kind),
            });
        }
        if element_pos >= count {
            return Err(EclError::IndexOutOfRange {
                index: element_pos,
                len: count,
            });
        }
        if self.format == EclFileFormat::Formatted {
            return Err(EclError::PartialFormattedRead(name.to_string()));
        }
        let byte_off = offset + block::binary_element_offset(element_pos, ArrayType::Real);
        let mut file = File::open(&self.path).map_err(|source| EclError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        file.seek(SeekFrom::Start(byte_off)).map_err(io_err)?;
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf).map_err(io_err)?;
        Ok(bp::read_f32(&buf))
    }

    /// As `read_real_element`, but also supports formatted files by seeking
    /// to the element's text column and parsing it. Used by `ESmry`'s
    /// per-step vector materialization, where both encodings are seekable.
    pub fn read_real_element_any_format(&self, index: usize, element_pos: usize) -> Result<f32> {
        let (name, kind, count, offset) = self.record_meta(index)?;
        if kind != RecordDataKind::Real {
            return Err(EclError::WrongType {
                name: name.to_string(),
                expected: "REAL".to_string(),
                found: format!("{:?}", kind),
            });
        }
        if element_pos >= count {
            return Err(EclError::IndexOutOfRange {
                index: element_pos,
                len: count,
            });
        }
        if self.format == EclFileFormat::Binary {
            return self.read_real_element(index, element_pos);
        }
        let (_, column_width) = ArrayType::Real.formatted_columns();
        let byte_off = offset + block::formatted_element_offset(element_pos, ArrayType::Real);
        let mut file = File::open(&self.path).map_err(|source| EclError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        file.seek(SeekFrom::Start(byte_off)).map_err(io_err)?;
        let mut buf = vec![0u8; column_width];
        file.read_exact(&mut buf).map_err(io_err)?;
        let text = std::str::from_utf8(&buf).map_err(|source| EclError::InvalidUtf8 {
            record: name.to_string(),
            offset: byte_off,
            source,
        })?;
        text.trim()
            .replace('D', "E")
            .replace('d', "e")
            .parse::<f32>()
            .map_err(|_| EclError::InvalidStringLength(format!("bad float token {:?}", text)))
    }
}

fn kind_of(ty: ArrayType) -> RecordDataKind {
    match ty {
        ArrayType::Int => RecordDataKind::Int,
        ArrayType::Real => RecordDataKind::Real,
        ArrayType::Doub => RecordDataKind::Doub,
        ArrayType::Logi => RecordDataKind::Logi,
        ArrayType::Chars(_) => RecordDataKind::Chars,
        ArrayType::Message => RecordDataKind::Message,
    }
}

fn build_directory(format: EclFileFormat, reader: &mut BufReader<File>) -> Result<Vec<RecordInfo>> {
    let mut dir = Vec::new();
    loop {
        let header_start = reader.seek(SeekFrom::Current(0)).map_err(io_err)?;
        let (name, ty, count) = match format {
            EclFileFormat::Binary => {
                let mut hdr = [0u8; 24];
                match reader.read_exact(&mut hdr) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(io_err(e)),
                }
                parse_binary_header(&hdr, header_start)?
            }
            EclFileFormat::Formatted => {
                let mut line = String::new();
                let n = reader.read_line(&mut line).map_err(io_err)?;
                if n == 0 {
                    break;
                }
                if line.trim().is_empty() {
                    continue;
                }
                parse_formatted_header(&line, header_start)?
            }
        };

        let payload_offset = reader.seek(SeekFrom::Current(0)).map_err(io_err)?;
        let span = match format {
            EclFileFormat::Binary => block::size_on_disk_binary(count, ty),
            EclFileFormat::Formatted => block::size_on_disk_formatted(count, ty),
        };
        reader.seek(SeekFrom::Current(span as i64)).map_err(io_err)?;

        dir.push(RecordInfo {
            name,
            array_type: ty,
            count,
            offset: payload_offset,
        });
    }
    Ok(dir)
}

fn io_err(source: std::io::Error) -> EclError {
    EclError::Io {
        path: String::new(),
        source,
    }
}

fn parse_binary_header(hdr: &[u8; 24], offset: u64) -> Result<(FlexString, ArrayType, usize)> {
    let (payload, rest) = bp::take_block("HEADER", offset, hdr)?;
    debug_assert!(rest.is_empty());
    let (name, payload) = bp::take_str(8, payload)?;
    let (count, payload) = bp::take_i32(payload)?;
    let (type_code, _) = bp::take(4, payload)?;
    if count < 0 {
        return Err(EclError::InvalidStringLength(format!(
            "negative element count {} for record {:?}",
            count, name
        )));
    }
    let trimmed: Vec<u8> = type_code.iter().copied().take_while(|&b| b != b' ').collect();
    let ty = ArrayType::from_type_code(&trimmed).map_err(|_| EclError::InvalidDataType {
        record: name.to_string(),
        offset,
        found: String::from_utf8_lossy(type_code).to_string(),
    })?;
    Ok((name, ty, count as usize))
}

/// Split a formatted header/array line into whitespace-delimited tokens,
/// treating `'...'`-quoted runs (which may contain embedded spaces from
/// name padding) as a single token.
fn split_header_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
    let bytes = line.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let c = line[i..].chars().next().unwrap();
        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }
        if c == '\'' {
            let start = i + 1;
            if let Some(end) = line[start..].find('\'') {
                tokens.push(line[start..start + end].to_string());
                i = start + end + 1;
            } else {
                tokens.push(line[start..].to_string());
                i = bytes.len();
            }
        } else {
            let start = i;
            while i < bytes.len() {
                let c = line[i..].chars().next().unwrap();
                if c.is_whitespace() || c == '\'' {
                    break;
                }
                i += c.len_utf8();
            }
            tokens.push(line[start..i].to_string());
        }
    }
    tokens
}

fn parse_formatted_header(line: &str, offset: u64) -> Result<(FlexString, ArrayType, usize)> {
    let tokens = split_header_tokens(line);
    if tokens.len() < 3 {
        return Err(EclError::InvalidStringLength(format!(
            "malformed record header at offset {}: {:?}",
            offset, line
        )));
    }
    let name = FlexString::from(tokens[0].trim());
    let count: i64 = tokens[1]
        .trim()
        .parse()
        .map_err(|_| EclError::InvalidStringLength(format!("bad record count {:?}", tokens[1])))?;
    if count < 0 {
        return Err(EclError::InvalidStringLength(format!(
            "negative element count {} for record {:?}",
            count, name
        )));
    }
    let ty = ArrayType::from_type_code(tokens[2].trim().as_bytes()).map_err(|_| EclError::InvalidDataType {
        record: name.to_string(),
        offset,
        found: tokens[2].clone(),
    })?;
    Ok((name, ty, count as usize))
}

fn load_record(path: &Path, format: EclFileFormat, record: &RecordInfo) -> Result<RecordData> {
    if record.count == 0 {
        return Ok(RecordData::new_with_capacity(record.array_type, 0));
    }
    let span = match format {
        EclFileFormat::Binary => block::size_on_disk_binary(record.count, record.array_type),
        EclFileFormat::Formatted => block::size_on_disk_formatted(record.count, record.array_type),
    };
    let mut file = File::open(path).map_err(|source| EclError::Io {
        path: path.display().to_string(),
        source,
    })?;
    file.seek(SeekFrom::Start(record.offset)).map_err(io_err)?;
    let mut buf = vec![0u8; span as usize];
    file.read_exact(&mut buf).map_err(io_err)?;

    match format {
        EclFileFormat::Binary => decode_binary_body(record, &buf),
        EclFileFormat::Formatted => decode_formatted_body(record, &buf),
    }
}

fn decode_binary_body(record: &RecordInfo, buf: &[u8]) -> Result<RecordData> {
    let elem_size = record.array_type.element_size();
    let mut data = RecordData::new_with_capacity(record.array_type, record.count);
    let mut remaining = record.count;
    let mut pos = 0usize;
    let mut cur_offset = record.offset;

    while remaining > 0 {
        let (payload, _) = bp::take_block(record.name.as_str(), cur_offset, &buf[pos..])?;
        if payload.len() % elem_size != 0 {
            return Err(EclError::UnexpectedLength {
                name: record.name.to_string(),
                expected: format!("multiple of {}", elem_size),
                found: payload.len(),
            });
        }
        let n_in_block = payload.len() / elem_size;
        for chunk in payload.chunks(elem_size) {
            data.push_binary_element(elem_size, chunk);
        }
        remaining -= n_in_block;
        let block_bytes = 8 + payload.len();
        pos += block_bytes;
        cur_offset += block_bytes as u64;
    }
    Ok(data)
}

fn decode_formatted_body(record: &RecordInfo, buf: &[u8]) -> Result<RecordData> {
    let (_, column_width) = record.array_type.formatted_columns();
    let mut data = RecordData::new_with_capacity(record.array_type, record.count);
    let text = std::str::from_utf8(buf).map_err(|source| EclError::InvalidUtf8 {
        record: record.name.to_string(),
        offset: record.offset,
        source,
    })?;

    let mut count = 0usize;
    'outer: for line in text.split('\n') {
        if line.is_empty() {
            continue;
        }
        let mut rest = line;
        while !rest.is_empty() {
            let w = column_width.min(rest.len());
            let (chunk, r) = rest.split_at(w);
            data.push_formatted_element(chunk)?;
            rest = r;
            count += 1;
            if count == record.count {
                break 'outer;
            }
        }
    }
    if count != record.count {
        return Err(EclError::UnexpectedLength {
            name: record.name.to_string(),
            expected: record.count.to_string(),
            found: count,
        });
    }
    Ok(data)
}

fn write_header<W: Write>(w: &mut W, name: &str, count: usize, type_code: &str) -> Result<()> {
    w.write_all(&16i32.to_be_bytes()).map_err(io_err)?;
    let mut buf = [b' '; 8];
    let bytes = name.as_bytes();
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    w.write_all(&buf).map_err(io_err)?;
    w.write_all(&(count as i32).to_be_bytes()).map_err(io_err)?;
    let mut tc = [b' '; 4];
    let tb = type_code.as_bytes();
    let tn = tb.len().min(4);
    tc[..tn].copy_from_slice(&tb[..tn]);
    w.write_all(&tc).map_err(io_err)?;
    w.write_all(&16i32.to_be_bytes()).map_err(io_err)
}

fn write_block_chunks<W: Write>(
    w: &mut W,
    bytes_per_elem: usize,
    block_len: usize,
    total: usize,
    mut write_elem: impl FnMut(&mut W, usize) -> Result<()>,
) -> Result<()> {
    let mut remaining = total;
    let mut start = 0usize;
    while remaining > 0 {
        let n = remaining.min(block_len);
        let payload_len = n * bytes_per_elem;
        w.write_all(&(payload_len as i32).to_be_bytes()).map_err(io_err)?;
        for i in start..start + n {
            write_elem(w, i)?;
        }
        w.write_all(&(payload_len as i32).to_be_bytes()).map_err(io_err)?;
        start += n;
        remaining -= n;
    }
    Ok(())
}

/// Write a binary INTE record in the same framing [`EclFile`] reads back.
/// Used by `ESmry::make_esmry_file` to emit the compact derived container;
/// this crate never writes arbitrary Eclipse output, only this form.
pub fn write_int_record<W: Write>(w: &mut W, name: &str, values: &[i32]) -> Result<()> {
    write_header(w, name, values.len(), "INTE")?;
    write_block_chunks(w, 4, ArrayType::Int.binary_block_length(), values.len(), |w, i| {
        w.write_all(&values[i].to_be_bytes()).map_err(io_err)
    })
}

pub fn write_real_record<W: Write>(w: &mut W, name: &str, values: &[f32]) -> Result<()> {
    write_header(w, name, values.len(), "REAL")?;
    write_block_chunks(w, 4, ArrayType::Real.binary_block_length(), values.len(), |w, i| {
        w.write_all(&values[i].to_be_bytes()).map_err(io_err)
    })
}

/// `width` is the fixed element width (8 for plain `CHAR`, wider for the
/// `C0nn` variant used when values don't fit in 8 bytes, e.g. `ESmry`'s
/// `KEYCHECK` record).
pub fn write_chars_record<W: Write>(w: &mut W, name: &str, values: &[String], width: usize) -> Result<()> {
    let ty = ArrayType::Chars(width);
    write_header(w, name, values.len(), &ty.type_code())?;
    write_block_chunks(w, width, ty.binary_block_length(), values.len(), |w, i| {
        let mut buf = vec![b' '; width];
        let bytes = values[i].as_bytes();
        let n = bytes.len().min(width);
        buf[..n].copy_from_slice(&bytes[..n]);
        w.write_all(&buf).map_err(io_err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{encode_binary_record, encode_formatted_record, TestValue};
    use std::io::Write;

    fn write_temp(bytes: &[u8], suffix: &str) -> tempfile::TempPath {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(bytes).unwrap();
        f.into_temp_path()
    }

    #[test]
    fn binary_roundtrip_multi_record() {
        let mut buf = Vec::new();
        encode_binary_record(&mut buf, "INTEHEAD", &TestValue::Int((0..5).collect()));
        encode_binary_record(
            &mut buf,
            "PORO",
            &TestValue::Real(vec![0.1, 0.2, 0.3, 0.25]),
        );
        encode_binary_record(
            &mut buf,
            "WGNAMES",
            &TestValue::Chars(vec!["PROD1".to_string(), "INJ1".to_string()]),
        );
        let path = write_temp(&buf, ".EGRID");

        let mut f = EclFile::open(&path).unwrap();
        assert_eq!(f.count(), 3);
        assert!(f.has_key("PORO"));
        assert_eq!(f.get_int("INTEHEAD").unwrap(), &[0, 1, 2, 3, 4]);
        assert_eq!(f.get_real("PORO").unwrap(), &[0.1, 0.2, 0.3, 0.25]);
        assert_eq!(f.get_chars("WGNAMES").unwrap()[0].as_str(), "PROD1");
    }

    #[test]
    fn binary_roundtrip_crossing_block_boundary() {
        let values: Vec<i32> = (0..2500).collect();
        let mut buf = Vec::new();
        encode_binary_record(&mut buf, "BIG", &TestValue::Int(values.clone()));
        let path = write_temp(&buf, ".EGRID");

        let mut f = EclFile::open(&path).unwrap();
        assert_eq!(f.get_int("BIG").unwrap(), values.as_slice());
    }

    #[test]
    fn formatted_roundtrip_multi_record() {
        let mut buf = Vec::new();
        encode_formatted_record(&mut buf, "INTEHEAD", &TestValue::Int((0..5).collect()));
        encode_formatted_record(
            &mut buf,
            "PORO",
            &TestValue::Real(vec![0.1, 0.2, 0.3, 0.25]),
        );
        let path = write_temp(&buf, ".FEGRID");

        let mut f = EclFile::open(&path).unwrap();
        assert_eq!(f.format(), EclFileFormat::Formatted);
        assert_eq!(f.get_int("INTEHEAD").unwrap(), &[0, 1, 2, 3, 4]);
        let reals = f.get_real("PORO").unwrap();
        for (a, b) in reals.iter().zip(&[0.1f32, 0.2, 0.3, 0.25]) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn formatted_roundtrip_crossing_block_boundary() {
        let values: Vec<i32> = (0..2500).collect();
        let mut buf = Vec::new();
        encode_formatted_record(&mut buf, "BIG", &TestValue::Int(values.clone()));
        let path = write_temp(&buf, ".FEGRID");

        let mut f = EclFile::open(&path).unwrap();
        assert_eq!(f.get_int("BIG").unwrap(), values.as_slice());
    }

    #[test]
    fn message_record_has_zero_elements() {
        let mut buf = Vec::new();
        encode_binary_record(&mut buf, "STARTSOL", &TestValue::Message);
        let path = write_temp(&buf, ".EGRID");

        let mut f = EclFile::open(&path).unwrap();
        assert_eq!(f.count(), 1);
        let data = f.load_data(0).unwrap();
        assert_eq!(data.kind(), RecordDataKind::Message);
        assert_eq!(data.len(), 0);
    }

    #[test]
    fn repeated_name_keeps_last_occurrence() {
        let mut buf = Vec::new();
        encode_binary_record(&mut buf, "SEQNUM", &TestValue::Int(vec![1]));
        encode_binary_record(&mut buf, "SEQNUM", &TestValue::Int(vec![2]));
        let path = write_temp(&buf, ".UNSMRY");

        let mut f = EclFile::open(&path).unwrap();
        assert_eq!(f.indices_of("SEQNUM"), &[0, 1]);
        assert_eq!(f.get_int("SEQNUM").unwrap(), &[2]);
    }

    #[test]
    fn missing_record_is_not_found() {
        let buf = Vec::new();
        let path = write_temp(&buf, ".EGRID");
        let mut f = EclFile::open(&path).unwrap();
        let err = f.get_int("NOPE").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn wrong_type_access_errors() {
        let mut buf = Vec::new();
        encode_binary_record(&mut buf, "PORO", &TestValue::Real(vec![0.1]));
        let path = write_temp(&buf, ".EGRID");
        let mut f = EclFile::open(&path).unwrap();
        let err = f.get_int("PORO").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::WrongType);
    }
}
