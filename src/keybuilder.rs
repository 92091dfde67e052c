//! Pure functions mapping a raw simulator `(keyword, wgname, num, lgr)`
//! tuple to a canonical user-facing summary key, and the inverse unpacking
//! for block ijk and region-pair nums.
//!
//! Dispatch is driven by the keyword's first character, expressed as a
//! tagged [`Category`] rather than a chain of string-prefix tests.

use crate::FlexString;

/// `WGNAME`/group-name value meaning "not applicable".
pub const SENTINEL_WGNAME: &str = ":+:+:+:+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Field,
    Aquifer,
    Block,
    Completion,
    Connection,
    Group,
    Well,
    Region,
    Segment,
    Node,
    Network,
    Misc,
    LocalBlock,
    LocalWell,
    LocalCompletion,
}

impl Category {
    /// Infer a category from a (already-normalized) keyword's leading
    /// characters. `L`-prefixed keywords are LGR-qualified variants of
    /// Block/Well/Completion.
    pub fn classify(keyword: &str) -> Category {
        let bytes = keyword.as_bytes();
        match bytes.first() {
            Some(b'F') => Category::Field,
            Some(b'A') => Category::Aquifer,
            Some(b'B') => Category::Block,
            Some(b'C') => Category::Completion,
            Some(b'G') => Category::Group,
            Some(b'W') => Category::Well,
            Some(b'R') => Category::Region,
            Some(b'S') => Category::Segment,
            Some(b'N') => Category::Node,
            Some(b'J') => Category::Network,
            Some(b'L') => match bytes.get(1) {
                Some(b'B') => Category::LocalBlock,
                Some(b'C') => Category::LocalCompletion,
                Some(b'W') => Category::LocalWell,
                _ => Category::Misc,
            },
            _ => Category::Misc,
        }
    }
}

/// Attaches an LGR grid name to an otherwise-global summary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LgrInfo {
    pub name: String,
    pub ijk: (i32, i32, i32),
}

/// One resolved summary vector definition: normalized keyword, category,
/// the raw context it carries, and the key string built from them.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryNode {
    pub keyword: FlexString,
    pub category: Category,
    pub wgname: FlexString,
    pub num: i32,
    pub unit: FlexString,
    pub lgr: Option<LgrInfo>,
}

impl SummaryNode {
    pub fn key(&self) -> Option<String> {
        build_key(
            self.keyword.as_str(),
            self.wgname.as_str(),
            self.num,
            self.lgr.as_ref(),
        )
    }
}

/// Strip a trailing `_+digits` completion-number suffix Eclipse appends to
/// some well-completion keywords (`WOPRL__1` -> (`WOPRL`, Some(1))). The
/// extracted number feeds the `num` field used by key building, never the
/// output key itself.
pub fn normalize_keyword(keyword: &str) -> (String, Option<i32>) {
    let trimmed = keyword.trim_end();
    let digit_start = trimmed
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    if digit_start == trimmed.len() {
        // all-digit keyword (pathological); nothing to strip.
        return (trimmed.to_string(), None);
    }
    let digits = &trimmed[digit_start..];
    if digits.is_empty() {
        return (trimmed.to_string(), None);
    }
    let before_digits = &trimmed[..digit_start];
    let underscore_start = before_digits.trim_end_matches('_').len();
    if underscore_start == before_digits.len() {
        // no underscore separator before the digits: not the pattern we strip.
        return (trimmed.to_string(), None);
    }
    let base = &before_digits[..underscore_start];
    match digits.parse::<i32>() {
        Ok(n) => (base.to_string(), Some(n)),
        Err(_) => (trimmed.to_string(), None),
    }
}

/// `BPR`-style block-vector num unpacking: feed the 1-based `num` directly
/// into the 0-based global-index decomposition used by `EGrid`; the result
/// is immediately usable for display without further adjustment.
pub fn unpack_block_ijk(num: i32, nx: usize, ny: usize) -> (i32, i32, i32) {
    let g = num as i64;
    let plane = (nx * ny) as i64;
    let k = g / plane;
    let rest = g % plane;
    let j = rest / nx as i64;
    let i = rest % nx as i64;
    (i as i32, j as i32, k as i32)
}

/// Region-to-region flux/flow keywords pack two region numbers into one
/// `num` as `r1 + 32768*(r2+10)`.
pub fn pack_region_pair(r1: i32, r2: i32) -> i32 {
    r1 + 32768 * (r2 + 10)
}

pub fn unpack_region_pair(num: i32) -> (i32, i32) {
    let r1 = num % 32768;
    let r2 = num / 32768 - 10;
    (r1, r2)
}

/// Region-to-region flux/flow keywords encode a pair `num` at character
/// positions 3-4 or 4-5 (1-based) of the keyword, e.g. `ROFR`, `RGFT`.
/// `RORFR` is an explicit exception and is treated as a plain region vector.
fn is_region_pair_keyword(keyword: &str) -> bool {
    if keyword == "RORFR" {
        return false;
    }
    let at = |start: usize| keyword.get(start..start + 2);
    matches!(at(2), Some("FR") | Some("FT")) || matches!(at(3), Some("FR") | Some("FT"))
}

/// `W[OGWLV][PIGOLCF][RT]L…`: well vectors whose completion number is
/// carried in `num` rather than folded into the key as a string suffix.
fn is_well_completion_pattern(keyword: &str) -> bool {
    let b = keyword.as_bytes();
    b.len() >= 5
        && b[0] == b'W'
        && matches!(b[1], b'O' | b'G' | b'W' | b'L' | b'V')
        && matches!(b[2], b'P' | b'I' | b'G' | b'O' | b'L' | b'C' | b'F')
        && matches!(b[3], b'R' | b'T')
        && b[4] == b'L'
}

/// Build the canonical key string for a vector, or `None` if this column is
/// not user-addressable ("omit" in the dispatch table).
pub fn build_key(raw_keyword: &str, wgname: &str, num: i32, lgr: Option<&LgrInfo>) -> Option<String> {
    let (keyword, suffix_num) = normalize_keyword(raw_keyword);
    let effective_num = if num != 0 { num } else { suffix_num.unwrap_or(0) };
    let wg = wgname.trim();
    let is_sentinel = wg == SENTINEL_WGNAME;

    let category = Category::classify(&keyword);
    match category {
        Category::Aquifer => {
            if effective_num <= 0 {
                None
            } else {
                Some(format!("{}:{}", keyword, effective_num))
            }
        }
        Category::Block => {
            if effective_num <= 0 {
                None
            } else {
                let (i, j, k) = lgr
                    .map(|l| l.ijk)
                    .unwrap_or_else(|| unpack_block_ijk(effective_num, default_nx(), default_ny()));
                Some(format!("{}:{},{},{}", keyword, i, j, k))
            }
        }
        Category::Completion => {
            if effective_num <= 0 {
                None
            } else {
                let (i, j, k) = unpack_block_ijk(effective_num, default_nx(), default_ny());
                Some(format!("{}:{}:{},{},{}", keyword, wg, i, j, k))
            }
        }
        Category::Connection => {
            if effective_num <= 0 {
                None
            } else {
                Some(format!("{}:{}:{}", keyword, wg, effective_num))
            }
        }
        Category::Group => {
            if is_sentinel {
                None
            } else {
                Some(format!("{}:{}", keyword, wg))
            }
        }
        Category::Well => {
            if is_sentinel {
                None
            } else if is_well_completion_pattern(&keyword) {
                Some(format!("{}:{}:{}", keyword, wg, effective_num))
            } else {
                Some(format!("{}:{}", keyword, wg))
            }
        }
        Category::Region => {
            if is_region_pair_keyword(&keyword) {
                let (r1, r2) = unpack_region_pair(effective_num);
                Some(format!("{}:{}-{}", keyword, r1, r2))
            } else if effective_num <= 0 {
                None
            } else {
                Some(format!("{}:{}", keyword, effective_num))
            }
        }
        Category::Segment => {
            if is_sentinel || effective_num <= 0 {
                None
            } else {
                Some(format!("{}:{}:{}", keyword, wg, effective_num))
            }
        }
        Category::Node | Category::Network | Category::Misc | Category::Field => {
            if keyword.is_empty() {
                None
            } else {
                Some(keyword)
            }
        }
        Category::LocalBlock => {
            if effective_num <= 0 {
                None
            } else {
                let name = lgr.map(|l| l.name.as_str()).unwrap_or("");
                let (i, j, k) = lgr
                    .map(|l| l.ijk)
                    .unwrap_or_else(|| unpack_block_ijk(effective_num, default_nx(), default_ny()));
                Some(format!("{}:{}:{},{},{}", keyword, name, i, j, k))
            }
        }
        Category::LocalCompletion => {
            if effective_num <= 0 {
                None
            } else {
                let name = lgr.map(|l| l.name.as_str()).unwrap_or("");
                let (i, j, k) = lgr
                    .map(|l| l.ijk)
                    .unwrap_or_else(|| unpack_block_ijk(effective_num, default_nx(), default_ny()));
                Some(format!("{}:{}:{}:{},{},{}", keyword, name, wg, i, j, k))
            }
        }
        Category::LocalWell => {
            if is_sentinel {
                None
            } else {
                let name = lgr.map(|l| l.name.as_str()).unwrap_or("");
                Some(format!("{}:{}:{}", keyword, name, wg))
            }
        }
    }
}

// `Category::Block`/`Completion` ijk unpacking needs the host grid's (nx, ny)
// when no LGR context supplies its own ijk directly; callers that know the
// grid dimensions should route through `SummaryNode`/`ESmry` rather than
// these bare defaults, which only support keywords with no grid context.
fn default_nx() -> usize {
    1
}
fn default_ny() -> usize {
    1
}

/// Build a key given the well/block grid dimensions explicitly, used by
/// `ESmry` where `(nx, ny)` come from the run's own `DIMENS`/`GRIDHEAD`.
pub fn build_key_with_dims(
    raw_keyword: &str,
    wgname: &str,
    num: i32,
    lgr: Option<&LgrInfo>,
    nx: usize,
    ny: usize,
) -> Option<String> {
    let (keyword, suffix_num) = normalize_keyword(raw_keyword);
    let effective_num = if num != 0 { num } else { suffix_num.unwrap_or(0) };
    match Category::classify(&keyword) {
        Category::Block if effective_num > 0 && lgr.is_none() => {
            let (i, j, k) = unpack_block_ijk(effective_num, nx, ny);
            Some(format!("{}:{},{},{}", keyword, i, j, k))
        }
        Category::Completion if effective_num > 0 => {
            let (i, j, k) = unpack_block_ijk(effective_num, nx, ny);
            Some(format!("{}:{}:{},{},{}", keyword, wgname.trim(), i, j, k))
        }
        Category::LocalBlock if effective_num > 0 && lgr.is_none() => {
            let (i, j, k) = unpack_block_ijk(effective_num, nx, ny);
            Some(format!("{}::{},{},{}", keyword, i, j, k))
        }
        _ => build_key(raw_keyword, wgname, num, lgr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_oil_production_rate() {
        assert_eq!(build_key("WOPR", "OP_1", 0, None), Some("WOPR:OP_1".to_string()));
    }

    #[test]
    fn well_completion_suffix_feeds_num_not_key() {
        // WOPRL__1 normalizes to WOPRL, matches the well-completion pattern
        // (W,O,P,R,L), so num (already 1) surfaces in the key.
        assert_eq!(
            build_key("WOPRL__1", "OP_1", 1, None),
            Some("WOPRL:OP_1:1".to_string())
        );
    }

    #[test]
    fn well_sentinel_wgname_is_omitted() {
        assert_eq!(build_key("WOPR", SENTINEL_WGNAME, 0, None), None);
    }

    #[test]
    fn group_sentinel_is_omitted() {
        assert_eq!(build_key("GOPR", SENTINEL_WGNAME, 0, None), None);
        assert_eq!(build_key("GOPR", "FIELD_GRP", 0, None), Some("GOPR:FIELD_GRP".to_string()));
    }

    #[test]
    fn region_pair_flux_keyword() {
        let num = pack_region_pair(2, 3);
        assert_eq!(unpack_region_pair(num), (2, 3));
        assert_eq!(
            build_key("ROFR", SENTINEL_WGNAME, num, None),
            Some("ROFR:2-3".to_string())
        );
    }

    #[test]
    fn region_rorfr_exception_stays_plain() {
        assert_eq!(build_key("RORFR", SENTINEL_WGNAME, 7, None), Some("RORFR:7".to_string()));
    }

    #[test]
    fn block_pressure_unpacks_ijk() {
        let (i, j, k) = unpack_block_ijk(12675, 20, 10);
        assert_eq!((i, j, k), (15, 3, 63));
        assert_eq!(
            build_key_with_dims("BPR", "", 12675, None, 20, 10),
            Some("BPR:15,3,63".to_string())
        );
    }

    #[test]
    fn aquifer_omits_when_num_not_positive() {
        assert_eq!(build_key("AAQP", "", 0, None), None);
        assert_eq!(build_key("AAQP", "", 3, None), Some("AAQP:3".to_string()));
    }

    #[test]
    fn field_keyword_passes_through() {
        assert_eq!(build_key("FOPR", "", 0, None), Some("FOPR".to_string()));
    }

    #[test]
    fn lgr_well_uses_local_category() {
        let lgr = LgrInfo {
            name: "LGR1".to_string(),
            ijk: (1, 1, 1),
        };
        assert_eq!(
            build_key("LWBHP", "OP_1", 0, Some(&lgr)),
            Some("LWBHP:LGR1:OP_1".to_string())
        );
    }
}
