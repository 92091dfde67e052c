//! Restart-chained summary reader: resolves a `SMSPEC` (plus its `RESTART`
//! ancestors) into a flat, keyword-indexed time series read from `UNSMRY`
//! or numbered `.Snnnn`/`.Annnn` result files.
//!
//! Mirrors `EclFile`'s lazy-load discipline one layer up: metadata (column
//! layout, time-step directory) is built eagerly on `open`, vector payloads
//! are decoded on first `get` and cached.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::eclfile::{self, EclFile, EclFileFormat};
use crate::error::{EclError, Result};
use crate::keybuilder::{self, Category, LgrInfo, SummaryNode};
use crate::FlexString;

/// Metadata and column layout of a single SMSPEC file, resolved in isolation
/// from the rest of its restart chain.
#[derive(Debug)]
struct SpecFile {
    path: PathBuf,
    nijk: (usize, usize, usize),
    restart_step: i32,
    restart_root: Option<String>,
    nodes: Vec<SummaryNode>,
    /// Per-column key, `None` where `KeyBuilder` says the column is not
    /// user-addressable.
    keys: Vec<Option<String>>,
    /// key -> local column ordinal, built alongside `keys`.
    column_of: HashMap<String, usize>,
    intehead: Option<(i32, i32)>,
}

impl SpecFile {
    fn open(path: &Path) -> Result<Self> {
        let mut file = EclFile::open(path)?;

        let dimens = file.get_int("DIMENS")?.to_vec();
        if dimens.len() < 6 {
            return Err(EclError::UnexpectedLength {
                name: "DIMENS".to_string(),
                expected: ">=6".to_string(),
                found: dimens.len(),
            });
        }
        let nijk = (dimens[1].max(0) as usize, dimens[2].max(0) as usize, dimens[3].max(0) as usize);
        let restart_step = dimens[5];

        let restart_root = if file.has_key("RESTART") {
            let chunks = file.get_chars("RESTART")?;
            let joined: String = chunks.iter().map(|s| s.as_str()).collect();
            let trimmed = joined.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        } else {
            None
        };

        let keywords = file.get_chars("KEYWORDS")?.to_vec();
        let wgnames = if file.has_key("WGNAMES") {
            file.get_chars("WGNAMES")?.to_vec()
        } else if file.has_key("NAMES") {
            file.get_chars("NAMES")?.to_vec()
        } else {
            vec![FlexString::new(); keywords.len()]
        };
        let nums = if file.has_key("NUMS") {
            file.get_int("NUMS")?.to_vec()
        } else {
            vec![0; keywords.len()]
        };
        let units = if file.has_key("UNITS") {
            file.get_chars("UNITS")?.to_vec()
        } else {
            vec![FlexString::new(); keywords.len()]
        };

        let lgr_names = if file.has_key("LGRS") {
            Some(file.get_chars("LGRS")?.to_vec())
        } else {
            None
        };
        let numlx = if file.has_key("NUMLX") { Some(file.get_int("NUMLX")?.to_vec()) } else { None };
        let numly = if file.has_key("NUMLY") { Some(file.get_int("NUMLY")?.to_vec()) } else { None };
        let numlz = if file.has_key("NUMLZ") { Some(file.get_int("NUMLZ")?.to_vec()) } else { None };

        let intehead = if file.has_key("INTEHEAD") {
            let v = file.get_int("INTEHEAD")?;
            if v.len() >= 2 {
                Some((v[0], v[1]))
            } else {
                None
            }
        } else {
            None
        };

        let n = keywords.len();
        let mut nodes = Vec::with_capacity(n);
        let mut keys = Vec::with_capacity(n);
        let mut column_of = HashMap::new();

        for i in 0..n {
            let raw_keyword = keywords[i].as_str();
            let wgname = wgnames.get(i).cloned().unwrap_or_default();
            let num = nums.get(i).copied().unwrap_or(0);
            let unit = units.get(i).cloned().unwrap_or_default();

            let lgr = lgr_names.as_ref().and_then(|names| {
                let name = names.get(i)?.as_str().trim();
                if name.is_empty() {
                    return None;
                }
                let ijk = (
                    numlx.as_ref().and_then(|v| v.get(i)).copied().unwrap_or(0),
                    numly.as_ref().and_then(|v| v.get(i)).copied().unwrap_or(0),
                    numlz.as_ref().and_then(|v| v.get(i)).copied().unwrap_or(0),
                );
                Some(LgrInfo {
                    name: name.to_string(),
                    ijk,
                })
            });

            let (normalized, _) = keybuilder::normalize_keyword(raw_keyword);
            let category = Category::classify(&normalized);
            let key = keybuilder::build_key_with_dims(raw_keyword, wgname.as_str(), num, lgr.as_ref(), nijk.0, nijk.1);

            if let Some(k) = &key {
                column_of.insert(k.clone(), i);
            }
            nodes.push(SummaryNode {
                keyword: FlexString::from(normalized.as_str()),
                category,
                wgname,
                num,
                unit,
                lgr,
            });
            keys.push(key);
        }

        Ok(SpecFile {
            path: path.to_path_buf(),
            nijk,
            restart_step,
            restart_root,
            nodes,
            keys,
            column_of,
            intehead,
        })
    }

    fn region_names(&self) -> impl Iterator<Item = (i32, &FlexString)> {
        self.nodes
            .iter()
            .filter(|n| {
                n.category == Category::Region
                    && n.num > 0
                    && !n.wgname.trim().is_empty()
                    && n.wgname.trim() != keybuilder::SENTINEL_WGNAME
            })
            .map(|n| (n.num, &n.wgname))
    }
}

/// Try `{dir}/{root}.SMSPEC` then `{dir}/{root}.FSMSPEC`.
fn resolve_restart_path(spec_path: &Path, root: &str) -> Option<PathBuf> {
    let dir = spec_path.parent().unwrap_or_else(|| Path::new("."));
    for ext in ["SMSPEC", "FSMSPEC"] {
        let candidate = dir.join(format!("{}.{}", root, ext));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

fn load_chain(path: &Path, visited: &mut Vec<PathBuf>) -> Result<Vec<SpecFile>> {
    let canon = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if visited.contains(&canon) {
        return Err(EclError::RestartChainCycle(path.display().to_string()));
    }
    visited.push(canon);

    let spec = SpecFile::open(path)?;
    let mut chain = Vec::new();
    if let Some(root) = spec.restart_root.clone() {
        if let Some(parent_path) = resolve_restart_path(path, &root) {
            chain.extend(load_chain(&parent_path, visited)?);
        }
    }
    chain.push(spec);
    Ok(chain)
}

/// Discover the result file(s) for `spec_path`'s root name: a unified
/// `UNSMRY`/`FUNSMRY` if it's present and at least as new as any numbered
/// sibling, else the numbered `.Snnnn`/`.Annnn` series in lexical order.
fn discover_result_files(spec_path: &Path) -> Result<Vec<PathBuf>> {
    let dir = spec_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = spec_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| EclError::InvalidFilePath(spec_path.display().to_string()))?;

    let mut numbered = Vec::new();
    let mut unified: Option<PathBuf> = None;

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(n) => n,
                None => continue,
            };
            let suffix = match name.strip_prefix(stem).and_then(|s| s.strip_prefix('.')) {
                Some(s) => s,
                None => continue,
            };
            if suffix == "UNSMRY" || suffix == "FUNSMRY" {
                unified = Some(entry.path());
            } else if suffix.len() == 5 {
                let (tag, digits) = suffix.split_at(1);
                if (tag == "S" || tag == "A") && digits.chars().all(|c| c.is_ascii_digit()) {
                    numbered.push(entry.path());
                }
            }
        }
    }
    numbered.sort();

    if let Some(u) = &unified {
        let newest_numbered = numbered
            .iter()
            .filter_map(|p| fs::metadata(p).ok().and_then(|m| m.modified().ok()))
            .max();
        let unified_mtime = fs::metadata(u).ok().and_then(|m| m.modified().ok());
        let unified_is_newer = match (unified_mtime, newest_numbered) {
            (Some(u_t), Some(n_t)) => u_t >= n_t,
            _ => true,
        };
        if numbered.is_empty() || unified_is_newer {
            return Ok(vec![u.clone()]);
        }
    }
    Ok(numbered)
}

struct RawStep {
    file_idx: usize,
    params_index: usize,
    mini_step: i32,
    is_report_step: bool,
}

/// Run the `SEQHDR?/MINISTEP/PARAMS` state machine over a run's result
/// files, stopping before `stop_before_ministep` (the next chain member's
/// restart point) if given.
fn scan_result_files(paths: &[PathBuf], stop_before_ministep: Option<i32>) -> Result<(Vec<EclFile>, Vec<RawStep>)> {
    let mut files = Vec::with_capacity(paths.len());
    let mut steps = Vec::new();

    for (file_idx, path) in paths.iter().enumerate() {
        let mut file = EclFile::open(path)?;
        let names: Vec<String> = file.list().map(|(n, _, _)| n.to_string()).collect();

        let mut pending_report = false;
        let mut pending_mini_step: Option<i32> = None;
        let mut stopped = false;

        for (idx, name) in names.iter().enumerate() {
            match name.as_str() {
                "TNAVHEAD" | "TNAVTIME" => {
                    log::debug!("skipping {} record in {}", name, path.display());
                }
                "SEQHDR" if pending_mini_step.is_none() => {
                    pending_report = true;
                }
                "MINISTEP" if pending_mini_step.is_none() => {
                    let v = file.load_data(idx)?.as_int("MINISTEP")?;
                    let step = *v.first().ok_or_else(|| EclError::UnexpectedLength {
                        name: "MINISTEP".to_string(),
                        expected: "1".to_string(),
                        found: 0,
                    })?;
                    if let Some(stop) = stop_before_ministep {
                        if step >= stop {
                            stopped = true;
                            break;
                        }
                    }
                    pending_mini_step = Some(step);
                }
                "PARAMS" if pending_mini_step.is_some() => {
                    steps.push(RawStep {
                        file_idx,
                        params_index: idx,
                        mini_step: pending_mini_step.take().unwrap(),
                        is_report_step: pending_report,
                    });
                    pending_report = false;
                }
                other => {
                    let (_, _, _, offset) = file.record_meta(idx)?;
                    return Err(EclError::UnexpectedRecordName {
                        offset,
                        expected: "SEQHDR, MINISTEP or PARAMS".to_string(),
                        found: other.to_string(),
                    });
                }
            }
        }
        files.push(file);
        if stopped {
            break;
        }
    }
    Ok((files, steps))
}

#[derive(Debug)]
struct TimeStep {
    spec_idx: usize,
    result_file_idx: usize,
    params_index: usize,
    mini_step: i32,
    is_report_step: bool,
    seq_index: Option<usize>,
}

/// A (possibly restart-chained) summary run: every addressable vector under
/// one canonical key, sampled at every time step of the chain.
#[derive(Debug)]
pub struct ESmry {
    specs: Vec<SpecFile>,
    result_files: Vec<EclFile>,
    time_steps: Vec<TimeStep>,
    keys: Vec<String>,
    key_index: HashMap<String, usize>,
    units: Vec<FlexString>,
    vectors: Vec<Option<Vec<f32>>>,
    startdat: NaiveDateTime,
    region_names: HashMap<i32, FlexString>,
}

impl ESmry {
    /// Open `path`, following the `RESTART` chain back to its base run.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(path.as_ref())
    }

    fn build(path: &Path) -> Result<Self> {
        let mut visited = Vec::new();
        let specs = load_chain(path, &mut visited)?;

        let mut keys = Vec::new();
        let mut key_index = HashMap::new();
        let mut units = Vec::new();
        let mut region_names = HashMap::new();
        for spec in &specs {
            for (ordinal, key) in spec.keys.iter().enumerate() {
                if let Some(k) = key {
                    if !key_index.contains_key(k) {
                        key_index.insert(k.clone(), keys.len());
                        keys.push(k.clone());
                        units.push(spec.nodes[ordinal].unit.clone());
                    }
                }
            }
            for (num, name) in spec.region_names() {
                region_names.insert(num, name.clone());
            }
        }

        let mut result_files = Vec::new();
        let mut time_steps = Vec::new();
        let mut report_counter = 0usize;
        for (spec_idx, spec) in specs.iter().enumerate() {
            let stop_before = specs.get(spec_idx + 1).map(|s| s.restart_step);
            let result_paths = discover_result_files(&spec.path)?;
            let base_file_idx = result_files.len();
            let (mut files, raw_steps) = scan_result_files(&result_paths, stop_before)?;
            result_files.append(&mut files);
            for rs in raw_steps {
                let seq_index = if rs.is_report_step {
                    let idx = report_counter;
                    report_counter += 1;
                    Some(idx)
                } else {
                    None
                };
                time_steps.push(TimeStep {
                    spec_idx,
                    result_file_idx: base_file_idx + rs.file_idx,
                    params_index: rs.params_index,
                    mini_step: rs.mini_step,
                    is_report_step: rs.is_report_step,
                    seq_index,
                });
            }
        }

        let startdat = {
            let leaf = specs.first().ok_or_else(|| EclError::MissingRecord("DIMENS".to_string(), path.display().to_string()))?;
            let mut f = EclFile::open(&leaf.path)?;
            let v = f.get_int("STARTDAT")?.to_vec();
            parse_startdat(&v)?
        };

        let n = keys.len();
        Ok(ESmry {
            specs,
            result_files,
            time_steps,
            keys,
            key_index,
            units,
            vectors: vec![None; n],
            startdat,
            region_names,
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn unit(&self, key: &str) -> Option<&str> {
        let idx = *self.key_index.get(key)?;
        Some(self.units[idx].as_str())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    pub fn num_time_steps(&self) -> usize {
        self.time_steps.len()
    }

    pub fn mini_steps(&self) -> Vec<i32> {
        self.time_steps.iter().map(|t| t.mini_step).collect()
    }

    pub fn is_report_step(&self, step: usize) -> bool {
        self.time_steps.get(step).map(|t| t.is_report_step).unwrap_or(false)
    }

    /// Ordinal of a report step among all report steps in the chain, or
    /// `None` if `step` is not one.
    pub fn seq_index(&self, step: usize) -> Option<usize> {
        self.time_steps.get(step).and_then(|t| t.seq_index)
    }

    pub fn region_names(&self) -> &HashMap<i32, FlexString> {
        &self.region_names
    }

    pub fn intehead(&self) -> Option<(i32, i32)> {
        self.specs.last().and_then(|s| s.intehead)
    }

    /// Sample the vector for `key` at every time step, loading and caching
    /// it on first access.
    pub fn get(&mut self, key: &str) -> Result<&[f32]> {
        let idx = *self.key_index.get(key).ok_or_else(|| EclError::KeyNotFound(key.to_string()))?;
        if self.vectors[idx].is_none() {
            let mut values = Vec::with_capacity(self.time_steps.len());
            for ts in &self.time_steps {
                let p = self.specs[ts.spec_idx].column_of.get(key).copied();
                let v = match p {
                    Some(p) => self.result_files[ts.result_file_idx].read_real_element_any_format(ts.params_index, p)?,
                    None => f32::NAN,
                };
                values.push(v);
            }
            self.vectors[idx] = Some(values);
        }
        Ok(self.vectors[idx].as_ref().unwrap())
    }

    /// Decode every time step's `PARAMS` record once, distributing values to
    /// all keys at once. Preferred over repeated `get` when most keys are
    /// needed.
    pub fn load_all(&mut self) -> Result<()> {
        let n = self.keys.len();
        let mut all: Vec<Vec<f32>> = (0..n).map(|_| Vec::with_capacity(self.time_steps.len())).collect();

        for ts in &self.time_steps {
            let values = self.result_files[ts.result_file_idx]
                .load_data(ts.params_index)?
                .as_real("PARAMS")?
                .to_vec();
            let spec = &self.specs[ts.spec_idx];
            for (k, slot) in self.keys.iter().zip(all.iter_mut()) {
                let v = spec
                    .column_of
                    .get(k)
                    .and_then(|&p| values.get(p).copied())
                    .unwrap_or(f32::NAN);
                slot.push(v);
            }
        }

        for (dst, v) in self.vectors.iter_mut().zip(all.into_iter()) {
            *dst = Some(v);
        }
        Ok(())
    }

    /// Calendar date of every time step, derived from `STARTDAT` plus
    /// `TIME[i]` days.
    pub fn dates(&mut self) -> Result<Vec<NaiveDateTime>> {
        let start = self.startdat;
        let time = self.get("TIME")?.to_vec();
        Ok(time
            .iter()
            .map(|&t| start + Duration::microseconds((t as f64 * 86_400_000_000.0).round() as i64))
            .collect())
    }

    /// Write a compact, binary-only derived summary file containing every
    /// vector sampled so far (forcing a full `load_all` first). Only
    /// meaningful for a single, non-restart-chained run: a chain's vectors
    /// are already the union of every ancestor, so there is no single
    /// `RESTART` root left to record.
    pub fn make_esmry_file<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();
        if self.specs.len() != 1 {
            return Err(EclError::InvalidFilePath(format!(
                "make_esmry_file requires a single run, not a {}-member restart chain: {}",
                self.specs.len(),
                path.display()
            )));
        }
        if path.exists() {
            return Ok(false);
        }
        self.load_all()?;

        let mut out = Vec::new();
        let start = self.startdat;
        // Same `[day, month, year, hour, minute, microsecond]` layout as
        // `STARTDAT`, so `parse_startdat` reads either back identically.
        // `parse_startdat` always builds `startdat` with seconds pinned to
        // 0, so only the sub-minute microsecond component survives here.
        let start_record = vec![
            start.day() as i32,
            start.month() as i32,
            start.year(),
            start.hour() as i32,
            start.minute() as i32,
            (start.nanosecond() / 1_000) as i32,
        ];
        eclfile::write_int_record(&mut out, "START", &start_record)?;

        let spec = &self.specs[0];
        if let Some(root) = &spec.restart_root {
            eclfile::write_chars_record(&mut out, "RESTART", &[root.clone()], root.len().max(8))?;
            eclfile::write_int_record(&mut out, "RSTNUM", &[spec.restart_step])?;
        }

        eclfile::write_chars_record(
            &mut out,
            "KEYCHECK",
            &self.keys,
            self.keys.iter().map(|k| k.len()).max().unwrap_or(8).max(8),
        )?;
        let unit_strings: Vec<String> = self.units.iter().map(|u| u.to_string()).collect();
        eclfile::write_chars_record(&mut out, "UNITS", &unit_strings, 8)?;

        let rstep: Vec<i32> = self.time_steps.iter().map(|t| if t.is_report_step { 1 } else { 0 }).collect();
        eclfile::write_int_record(&mut out, "RSTEP", &rstep)?;
        let tstep: Vec<i32> = self.time_steps.iter().map(|t| t.mini_step).collect();
        eclfile::write_int_record(&mut out, "TSTEP", &tstep)?;

        for i in 0..self.keys.len() {
            let values = self.vectors[i].as_ref().expect("load_all populates every vector");
            eclfile::write_real_record(&mut out, &format!("V{}", i), values)?;
        }

        fs::write(path, &out).map_err(|source| EclError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(true)
    }
}

fn parse_startdat(v: &[i32]) -> Result<NaiveDateTime> {
    let day = v.get(0).copied().unwrap_or(1);
    let month = v.get(1).copied().unwrap_or(1);
    let year = v.get(2).copied().unwrap_or(1970);
    let hour = v.get(3).copied().unwrap_or(0);
    let minute = v.get(4).copied().unwrap_or(0);
    let micro = v.get(5).copied().unwrap_or(0);

    let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .ok_or_else(|| EclError::InvalidStringLength(format!("bad STARTDAT date {}-{}-{}", year, month, day)))?;
    let time = NaiveTime::from_hms_micro_opt(hour as u32, minute as u32, 0, micro as u32)
        .ok_or_else(|| EclError::InvalidStringLength(format!("bad STARTDAT time {}:{}:{}.{}", hour, minute, 0, micro)))?;
    Ok(NaiveDateTime::new(date, time))
}

/// Everything [`ESmry::make_esmry_file`] writes, read back in one pass.
pub struct EsmryContents {
    pub keys: Vec<String>,
    pub units: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub start: NaiveDateTime,
    pub restart_root: Option<String>,
    pub restart_step: Option<i32>,
    pub is_report_step: Vec<bool>,
    pub mini_steps: Vec<i32>,
}

/// Read back a file written by [`ESmry::make_esmry_file`]: binary-only,
/// every vector its own single-column record, alongside the `START`,
/// `UNITS`, `RSTEP` and `TSTEP` metadata written alongside them.
pub fn read_esmry_vectors(path: &Path) -> Result<EsmryContents> {
    let mut file = EclFile::open(path)?;
    if file.format() != EclFileFormat::Binary {
        return Err(EclError::InvalidDataType {
            record: "ESMRY".to_string(),
            offset: 0,
            found: "formatted".to_string(),
        });
    }
    let keys: Vec<String> = file.get_chars("KEYCHECK")?.iter().map(|s| s.trim().to_string()).collect();
    let mut vectors = Vec::with_capacity(keys.len());
    for i in 0..keys.len() {
        vectors.push(file.get_real(&format!("V{}", i))?.to_vec());
    }
    let units: Vec<String> = file.get_chars("UNITS")?.iter().map(|s| s.trim().to_string()).collect();
    let start = parse_startdat(file.get_int("START")?)?;
    let (restart_root, restart_step) = if file.has_key("RESTART") {
        let root = file.get_chars("RESTART")?.iter().map(|s| s.as_str()).collect::<String>();
        let root = root.trim().to_string();
        let step = file.get_int("RSTNUM")?.first().copied();
        (Some(root), step)
    } else {
        (None, None)
    };
    let is_report_step = file.get_int("RSTEP")?.iter().map(|&v| v != 0).collect();
    let mini_steps = file.get_int("TSTEP")?.to_vec();

    Ok(EsmryContents {
        keys,
        units,
        vectors,
        start,
        restart_root,
        restart_step,
        is_report_step,
        mini_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{encode_binary_record, TestValue};
    use std::io::Write as _;

    fn write_file(dir: &Path, name: &str, buf: &[u8]) -> PathBuf {
        let p = dir.join(name);
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(buf).unwrap();
        p
    }

    fn spec_bytes(keywords: &[&str], wgnames: &[&str], nums: &[i32], units: &[&str], restart: Option<&str>, restart_step: i32, startdat: [i32; 3]) -> Vec<u8> {
        let n = keywords.len();
        let mut buf = Vec::new();
        encode_binary_record(&mut buf, "DIMENS", &TestValue::Int(vec![n as i32, 1, 1, 1, 0, restart_step]));
        encode_binary_record(&mut buf, "STARTDAT", &TestValue::Int(startdat.to_vec()));
        if let Some(r) = restart {
            encode_binary_record(&mut buf, "RESTART", &TestValue::Chars(vec![r.to_string()]));
        }
        encode_binary_record(&mut buf, "KEYWORDS", &TestValue::Chars(keywords.iter().map(|s| s.to_string()).collect()));
        encode_binary_record(&mut buf, "WGNAMES", &TestValue::Chars(wgnames.iter().map(|s| s.to_string()).collect()));
        encode_binary_record(&mut buf, "NUMS", &TestValue::Int(nums.to_vec()));
        encode_binary_record(&mut buf, "UNITS", &TestValue::Chars(units.iter().map(|s| s.to_string()).collect()));
        buf
    }

    fn unsmry_bytes(steps: &[(bool, i32, Vec<f32>)]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (report, mini_step, params) in steps {
            if *report {
                encode_binary_record(&mut buf, "SEQHDR", &TestValue::Int(vec![0]));
            }
            encode_binary_record(&mut buf, "MINISTEP", &TestValue::Int(vec![*mini_step]));
            encode_binary_record(&mut buf, "PARAMS", &TestValue::Real(params.clone()));
        }
        buf
    }

    #[test]
    fn single_run_reads_vectors_and_dates() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_bytes(
            &["TIME", "WOPR"],
            &["", "OP_1"],
            &[0, 0],
            &["DAYS", "SM3/DAY"],
            None,
            0,
            [1, 1, 2020],
        );
        write_file(dir.path(), "CASE.SMSPEC", &spec);
        let steps = vec![
            (false, 1, vec![1.0, 10.0]),
            (true, 2, vec![2.0, 20.0]),
        ];
        write_file(dir.path(), "CASE.UNSMRY", &unsmry_bytes(&steps));

        let mut sm = ESmry::open(dir.path().join("CASE.SMSPEC")).unwrap();
        assert!(sm.has_key("WOPR:OP_1"));
        assert_eq!(sm.get("WOPR:OP_1").unwrap(), &[10.0, 20.0]);
        assert_eq!(sm.get("TIME").unwrap(), &[1.0, 2.0]);
        assert_eq!(sm.mini_steps(), vec![1, 2]);
        assert_eq!(sm.is_report_step(0), false);
        assert_eq!(sm.is_report_step(1), true);

        let dates = sm.dates().unwrap();
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[0].date(), NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
    }

    #[test]
    fn restart_chain_unions_keys_and_nan_fills() {
        let dir = tempfile::tempdir().unwrap();

        let base_spec = spec_bytes(&["TIME", "WOPR", "WGPR"], &["", "A", "A"], &[0, 0, 0], &["DAYS", "SM3/DAY", "SM3/DAY"], None, 0, [1, 1, 2020]);
        write_file(dir.path(), "BASE.SMSPEC", &base_spec);
        let base_steps = vec![(false, 1, vec![1.0, 10.0, 100.0]), (false, 2, vec![2.0, 20.0, 200.0])];
        write_file(dir.path(), "BASE.UNSMRY", &unsmry_bytes(&base_steps));

        let child_spec = spec_bytes(
            &["TIME", "WOPR", "WWPR"],
            &["", "A", "A"],
            &[0, 0, 0],
            &["DAYS", "SM3/DAY", "SM3/DAY"],
            Some("BASE"),
            2,
            [1, 1, 2020],
        );
        write_file(dir.path(), "CHILD.SMSPEC", &child_spec);
        let child_steps = vec![(false, 3, vec![3.0, 30.0, 300.0])];
        write_file(dir.path(), "CHILD.UNSMRY", &unsmry_bytes(&child_steps));

        let mut sm = ESmry::open(dir.path().join("CHILD.SMSPEC")).unwrap();
        assert_eq!(sm.keys(), &["TIME".to_string(), "WOPR:A".to_string(), "WGPR:A".to_string(), "WWPR:A".to_string()]);
        assert_eq!(sm.num_time_steps(), 3);
        assert_eq!(sm.get("WOPR:A").unwrap(), &[10.0, 20.0, 30.0]);
        let wgpr = sm.get("WGPR:A").unwrap().to_vec();
        assert_eq!(&wgpr[..2], &[100.0, 200.0]);
        assert!(wgpr[2].is_nan());
        let wwpr = sm.get("WWPR:A").unwrap().to_vec();
        assert!(wwpr[0].is_nan() && wwpr[1].is_nan());
        assert_eq!(wwpr[2], 300.0);
    }

    #[test]
    fn region_names_excludes_sentinel_wgname() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_bytes(
            &["TIME", "RPR", "RPR"],
            &["", "NORTH", keybuilder::SENTINEL_WGNAME],
            &[0, 1, 2],
            &["DAYS", "BARSA", "BARSA"],
            None,
            0,
            [1, 1, 2020],
        );
        write_file(dir.path(), "CASE.SMSPEC", &spec);
        write_file(dir.path(), "CASE.UNSMRY", &unsmry_bytes(&[(false, 1, vec![1.0, 10.0, 20.0])]));

        let sm = ESmry::open(dir.path().join("CASE.SMSPEC")).unwrap();
        assert_eq!(sm.region_names().get(&1).map(|s| s.as_str()), Some("NORTH"));
        assert!(!sm.region_names().contains_key(&2));
    }

    #[test]
    fn unexpected_record_in_stream_errors() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_bytes(&["TIME"], &[""], &[0], &["DAYS"], None, 0, [1, 1, 2020]);
        write_file(dir.path(), "CASE.SMSPEC", &spec);
        let mut buf = Vec::new();
        encode_binary_record(&mut buf, "MINISTEP", &TestValue::Int(vec![1]));
        encode_binary_record(&mut buf, "BOGUS", &TestValue::Int(vec![0]));
        write_file(dir.path(), "CASE.UNSMRY", &buf);

        let err = ESmry::open(dir.path().join("CASE.SMSPEC")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }

    #[test]
    fn per_step_seek_matches_bulk_params_read() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_bytes(&["TIME", "WOPR"], &["", "OP_1"], &[0, 0], &["DAYS", "SM3/DAY"], None, 0, [1, 1, 2020]);
        write_file(dir.path(), "CASE.SMSPEC", &spec);
        let steps = vec![(false, 1, vec![1.0, 10.0]), (false, 2, vec![2.0, 20.0]), (false, 3, vec![3.0, 30.0])];
        write_file(dir.path(), "CASE.UNSMRY", &unsmry_bytes(&steps));

        let mut sm = ESmry::open(dir.path().join("CASE.SMSPEC")).unwrap();
        let via_get = sm.get("WOPR:OP_1").unwrap().to_vec();
        let mut sm2 = ESmry::open(dir.path().join("CASE.SMSPEC")).unwrap();
        sm2.load_all().unwrap();
        let via_bulk = sm2.get("WOPR:OP_1").unwrap().to_vec();
        assert_eq!(via_get, via_bulk);
    }

    #[test]
    fn esmry_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_bytes(&["TIME", "WOPR", "WBHP"], &["", "OP_1", "OP_1"], &[0, 0, 0], &["DAYS", "SM3/DAY", "BARSA"], None, 0, [1, 1, 2020]);
        write_file(dir.path(), "CASE.SMSPEC", &spec);
        let steps = vec![
            (false, 1, vec![1.0, 10.0, 200.0]),
            (true, 2, vec![2.0, 20.0, 210.0]),
            (false, 3, vec![3.0, 30.0, 220.0]),
            (false, 4, vec![4.0, 40.0, 230.0]),
            (true, 5, vec![5.0, 50.0, 240.0]),
        ];
        write_file(dir.path(), "CASE.UNSMRY", &unsmry_bytes(&steps));

        let mut sm = ESmry::open(dir.path().join("CASE.SMSPEC")).unwrap();
        let out_path = dir.path().join("CASE.ESMRY");
        assert!(sm.make_esmry_file(&out_path).unwrap());
        assert!(!sm.make_esmry_file(&out_path).unwrap());

        let contents = read_esmry_vectors(&out_path).unwrap();
        assert_eq!(contents.keys, sm.keys());
        assert_eq!(contents.units, vec!["DAYS", "SM3/DAY", "BARSA"]);
        assert_eq!(contents.restart_root, None);
        assert_eq!(contents.restart_step, None);
        assert_eq!(contents.is_report_step, vec![false, true, false, false, true]);
        assert_eq!(contents.mini_steps, vec![1, 2, 3, 4, 5]);
        assert_eq!(contents.start.date(), sm.dates().unwrap()[0].date() - Duration::days(1));

        let wopr_idx = contents.keys.iter().position(|k| k == "WOPR:OP_1").unwrap();
        assert_eq!(contents.vectors[wopr_idx], vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    }
}
