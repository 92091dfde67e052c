//! Corner-point grid reader layered on an [`EclFile`] directory: header
//! parsing, active/global index maps, pillar+depth corner reconstruction,
//! the map-axes affine transform and NNC cross-validation against INIT.
//!
//! Scope: this type reconstructs the geometry of one grid — the global grid
//! of the EGRID file it was opened from. `LGR`/`ENDLGR` markers are tracked
//! only enough to (a) name the LGRs present and (b) scope `NNCHEAD`-prefixed
//! NNC pairs to global vs. a named LGR; per-LGR sub-grid geometry is not
//! reconstructed (see DESIGN.md).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use std::fmt;

use crate::eclfile::{EclFile, EclFileFormat};
use crate::error::{EclError, Result};
use crate::keybuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridContext {
    Global,
    Lgr(usize),
}

#[derive(Debug, Clone, Copy)]
struct MapAxes {
    origin: (f64, f64),
    unit_x: (f64, f64),
    unit_y: (f64, f64),
}

/// Which index space a cell reference in [`EGrid::cell_dims`] is given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRef {
    Active(usize),
    Global(usize),
}

/// One non-neighbor connection between two active cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NncEntry {
    pub i1: usize,
    pub j1: usize,
    pub k1: usize,
    pub i2: usize,
    pub j2: usize,
    pub k2: usize,
    pub trans: f64,
}

#[derive(Debug)]
pub struct EGrid {
    file: EclFile,
    nijk: (usize, usize, usize),
    numres: usize,
    m_radial: bool,
    res: Vec<usize>,
    host_nijk: Option<(usize, usize, usize)>,
    lgr_names: Vec<String>,
    act_index: Vec<i32>,
    glob_index: Vec<usize>,
    mapaxes: Option<MapAxes>,
    coord_idx: Option<usize>,
    zcorn_idx: Option<usize>,
    #[allow(dead_code)]
    actnum_idx: Option<usize>,
    #[allow(dead_code)]
    coordsys_idx: Option<usize>,
    #[allow(dead_code)]
    hostnum_idx: Option<usize>,
    nnc: HashMap<String, (Vec<i32>, Vec<i32>)>,
}

impl fmt::Display for EGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nx, ny, nz) = self.nijk;
        write!(
            f,
            "EGrid({}, {}x{}x{}, {} active, {} reservoir{})",
            self.file.path().display(),
            nx,
            ny,
            nz,
            self.nactive(),
            self.numres,
            if self.numres == 1 { "" } else { "s" }
        )
    }
}

fn map_units_factor(unit: &str) -> f64 {
    match unit.trim() {
        "FEET" => 0.3048,
        "CM" => 0.01,
        _ => 1.0,
    }
}

fn to_cartesian(r: f64, theta_deg: f64) -> (f64, f64) {
    let theta = theta_deg.to_radians();
    (r * theta.cos(), r * theta.sin())
}

fn interpolate(top: (f64, f64, f64), bot: (f64, f64, f64), z: f64) -> (f64, f64) {
    let (xt, yt, zt) = top;
    let (xb, yb, zb) = bot;
    if (zt - zb).abs() < 1e-12 {
        (xt, yt)
    } else {
        let t = (zt - z) / (zt - zb);
        (xt + (xb - xt) * t, yt + (yb - yt) * t)
    }
}

/// Standard Eclipse ZCORN ordering: each layer k contributes a top slab and
/// a bottom slab, each `2nx * 2ny` values; cell (i,j)'s corner `(di,dj)`
/// sits at grid position `(2i+di, 2j+dj)` within its slab.
fn zcorn_index(i: usize, j: usize, k: usize, di: usize, dj: usize, dk: usize, nx: usize, ny: usize) -> usize {
    let slab = 2 * nx * 2 * ny;
    k * 2 * slab + dk * slab + (2 * j + dj) * (2 * nx) + (2 * i + di)
}

impl EGrid {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = EclFile::open(path)?;
        let names: Vec<(usize, String)> = file.list().enumerate().map(|(i, (n, _, _))| (i, n.to_string())).collect();

        let mut lgr_names = Vec::new();
        let mut grid_context = GridContext::Global;
        let mut nnc_context = "GLOBAL".to_string();

        let mut nijk = (0usize, 0usize, 0usize);
        let mut numres = 1usize;
        let mut m_radial = false;
        let host_nijk = None;
        let mut coord_idx = None;
        let mut zcorn_idx = None;
        let mut actnum_idx = None;
        let mut coordsys_idx = None;
        let mut hostnum_idx = None;
        let mut units_factor = 1.0f64;
        let mut mapaxes = None;
        let mut nnc: HashMap<String, (Vec<i32>, Vec<i32>)> = HashMap::new();

        for (idx, name) in &names {
            match name.as_str() {
                "LGR" => {
                    let chars = file.load_data(*idx)?.as_chars("LGR")?.to_vec();
                    let lgr_name = chars.get(0).map(|s| s.trim().to_string()).unwrap_or_default();
                    lgr_names.push(lgr_name);
                    grid_context = GridContext::Lgr(lgr_names.len() - 1);
                }
                "ENDLGR" => grid_context = GridContext::Global,
                "NNCHEAD" => {
                    let v = file.load_data(*idx)?.as_int("NNCHEAD")?.to_vec();
                    nnc_context = match v.get(1).copied().unwrap_or(0) {
                        n if n > 0 => lgr_names
                            .get((n - 1) as usize)
                            .cloned()
                            .unwrap_or_else(|| "GLOBAL".to_string()),
                        _ => "GLOBAL".to_string(),
                    };
                }
                "MAPUNITS" => {
                    let chars = file.load_data(*idx)?.as_chars("MAPUNITS")?.to_vec();
                    let u = chars.get(0).map(|s| s.to_string()).unwrap_or_default();
                    units_factor = map_units_factor(&u);
                }
                "MAPAXES" => {
                    let reals = file.load_data(*idx)?.as_real("MAPAXES")?.to_vec();
                    if reals.len() >= 6 {
                        let v: Vec<f64> = reals.iter().map(|&x| x as f64 * units_factor).collect();
                        let (x1, y1, x0, y0, x2, y2) = (v[0], v[1], v[2], v[3], v[4], v[5]);
                        let norm = |dx: f64, dy: f64| {
                            let n = (dx * dx + dy * dy).sqrt();
                            if n > 0.0 {
                                (dx / n, dy / n)
                            } else {
                                (dx, dy)
                            }
                        };
                        mapaxes = Some(MapAxes {
                            origin: (x0, y0),
                            unit_x: norm(x2 - x0, y2 - y0),
                            unit_y: norm(x1 - x0, y1 - y0),
                        });
                    }
                }
                "GRIDHEAD" if grid_context == GridContext::Global => {
                    let v = file.load_data(*idx)?.as_int("GRIDHEAD")?.to_vec();
                    if v.len() < 4 {
                        return Err(EclError::UnexpectedLength {
                            name: "GRIDHEAD".to_string(),
                            expected: ">=4".to_string(),
                            found: v.len(),
                        });
                    }
                    nijk = (v[1] as usize, v[2] as usize, v[3] as usize);
                    numres = if v.len() > 23 && v[23] > 0 { v[23] as usize } else { 1 };
                    m_radial = v.len() > 25 && v[25] > 0;
                }
                "COORD" if grid_context == GridContext::Global => coord_idx = Some(*idx),
                "ZCORN" if grid_context == GridContext::Global => zcorn_idx = Some(*idx),
                "ACTNUM" if grid_context == GridContext::Global => actnum_idx = Some(*idx),
                "COORDSYS" if grid_context == GridContext::Global => coordsys_idx = Some(*idx),
                "HOSTNUM" => hostnum_idx = Some(*idx),
                "NNC1" => {
                    let v = file.load_data(*idx)?.as_int("NNC1")?.to_vec();
                    nnc.entry(nnc_context.clone()).or_insert_with(|| (Vec::new(), Vec::new())).0 = v;
                }
                "NNC2" => {
                    let v = file.load_data(*idx)?.as_int("NNC2")?.to_vec();
                    nnc.entry(nnc_context.clone()).or_insert_with(|| (Vec::new(), Vec::new())).1 = v;
                }
                _ => {}
            }
        }

        let (nx, ny, nz) = nijk;
        let ncells = nx * ny * nz;

        let (act_index, glob_index) = if let Some(idx) = actnum_idx {
            let actnum = file.load_data(idx)?.as_int("ACTNUM")?.to_vec();
            let mut act_index = vec![-1i32; ncells];
            let mut glob_index = Vec::new();
            for (g, &a) in actnum.iter().enumerate() {
                if a > 0 {
                    act_index[g] = glob_index.len() as i32;
                    glob_index.push(g);
                }
            }
            (act_index, glob_index)
        } else {
            ((0..ncells as i32).collect(), (0..ncells).collect())
        };

        let mut res = vec![0usize; nz];
        if let Some(idx) = coordsys_idx {
            let v = file.load_data(idx)?.as_int("COORDSYS")?.to_vec();
            for (r, chunk) in v.chunks(6).enumerate() {
                if chunk.len() < 2 {
                    continue;
                }
                let l1 = chunk[0].max(1) as usize;
                let l2 = chunk[1].max(l1 as i32) as usize;
                for l in (l1 - 1)..l2.min(nz) {
                    res[l] = r;
                }
            }
        }

        Ok(EGrid {
            file,
            nijk,
            numres,
            m_radial,
            res,
            host_nijk,
            lgr_names,
            act_index,
            glob_index,
            mapaxes,
            coord_idx,
            zcorn_idx,
            actnum_idx,
            coordsys_idx,
            hostnum_idx,
            nnc,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn nijk(&self) -> (usize, usize, usize) {
        self.nijk
    }

    pub fn numres(&self) -> usize {
        self.numres
    }

    pub fn is_radial(&self) -> bool {
        self.m_radial
    }

    pub fn nactive(&self) -> usize {
        self.glob_index.len()
    }

    pub fn lgr_names(&self) -> &[String] {
        &self.lgr_names
    }

    pub fn host_nijk(&self) -> Option<(usize, usize, usize)> {
        self.host_nijk
    }

    /// Unpack a `BPR`-style block `num` into ijk and check it against this
    /// grid's dimensions, as [`keybuilder::unpack_block_ijk`] itself has no
    /// way to range-check its result.
    pub fn validate_block_num(&self, num: i32) -> Result<(usize, usize, usize)> {
        let (nx, ny, _) = self.nijk;
        let (i, j, k) = keybuilder::unpack_block_ijk(num, nx, ny);
        self.global_index(i as i64, j as i64, k as i64)?;
        Ok((i as usize, j as usize, k as usize))
    }

    pub fn global_index(&self, i: i64, j: i64, k: i64) -> Result<usize> {
        let (nx, ny, nz) = self.nijk;
        if i < 0 || j < 0 || k < 0 || i as usize >= nx || j as usize >= ny || k as usize >= nz {
            return Err(EclError::IjkOutOfRange {
                i,
                j,
                k,
                nx,
                ny,
                nz,
            });
        }
        Ok(i as usize + j as usize * nx + k as usize * nx * ny)
    }

    pub fn ijk_from_global(&self, g: usize) -> Result<(usize, usize, usize)> {
        let (nx, ny, nz) = self.nijk;
        let plane = nx * ny;
        if plane == 0 || g >= nx * ny * nz {
            return Err(EclError::IndexOutOfRange {
                index: g,
                len: nx * ny * nz,
            });
        }
        let k = g / plane;
        let rest = g % plane;
        let j = rest / nx;
        let i = rest % nx;
        Ok((i, j, k))
    }

    pub fn active_index(&self, i: i64, j: i64, k: i64) -> Result<Option<usize>> {
        let g = self.global_index(i, j, k)?;
        Ok(match self.act_index[g] {
            a if a >= 0 => Some(a as usize),
            _ => None,
        })
    }

    pub fn ijk_from_active(&self, a: usize) -> Result<(usize, usize, usize)> {
        let g = *self.glob_index.get(a).ok_or(EclError::IndexOutOfRange {
            index: a,
            len: self.glob_index.len(),
        })?;
        self.ijk_from_global(g)
    }

    fn pillar(&mut self, pi: usize, pj: usize, k: usize) -> Result<((f64, f64, f64), (f64, f64, f64))> {
        let idx = self
            .coord_idx
            .ok_or_else(|| EclError::MissingRecord("COORD".to_string(), self.file.path().display().to_string()))?;
        let coord = self.file.load_data(idx)?.as_real("COORD")?;
        let (nx, ny, _) = self.nijk;
        let reservoir = self.res.get(k).copied().unwrap_or(0);
        let pillars_per_res = (nx + 1) * (ny + 1);
        let pillar_idx = pj * (nx + 1) + pi;
        let base = (reservoir * pillars_per_res + pillar_idx) * 6;
        if base + 6 > coord.len() {
            return Err(EclError::UnexpectedLength {
                name: "COORD".to_string(),
                expected: format!(">= {}", base + 6),
                found: coord.len(),
            });
        }
        let v: Vec<f64> = coord[base..base + 6].iter().map(|&x| x as f64).collect();
        let (xt, yt) = if self.m_radial {
            to_cartesian(v[0], v[1])
        } else {
            (v[0], v[1])
        };
        let (xb, yb) = if self.m_radial {
            to_cartesian(v[3], v[4])
        } else {
            (v[3], v[4])
        };
        Ok(((xt, yt, v[2]), (xb, yb, v[5])))
    }

    /// The eight corners of cell `(i,j,k)`: indices 0-3 are the top face
    /// `(di,dj) = (0,0),(1,0),(0,1),(1,1)`, indices 4-7 the same order on
    /// the bottom face.
    pub fn cell_corners(&mut self, i: usize, j: usize, k: usize) -> Result<[(f64, f64, f64); 8]> {
        let (nx, ny, nz) = self.nijk;
        if i >= nx || j >= ny || k >= nz {
            return Err(EclError::IjkOutOfRange {
                i: i as i64,
                j: j as i64,
                k: k as i64,
                nx,
                ny,
                nz,
            });
        }
        let zcorn_idx = self
            .zcorn_idx
            .ok_or_else(|| EclError::MissingRecord("ZCORN".to_string(), self.file.path().display().to_string()))?;
        let zcorn = self.file.load_data(zcorn_idx)?.as_real("ZCORN")?.to_vec();

        let corners = [(0usize, 0usize), (1, 0), (0, 1), (1, 1)];
        let mut out = [(0.0, 0.0, 0.0); 8];
        for (slot, &(di, dj)) in corners.iter().enumerate() {
            let (top, bot) = self.pillar(i + di, j + dj, k)?;
            for (face, dk) in [(0usize, 0usize), (1, 1)] {
                let zi = zcorn_index(i, j, k, di, dj, dk, nx, ny);
                let z = *zcorn.get(zi).ok_or(EclError::IndexOutOfRange {
                    index: zi,
                    len: zcorn.len(),
                })? as f64;
                let (x, y) = interpolate(top, bot, z);
                out[face * 4 + slot] = (x, y, z);
            }
        }
        Ok(out)
    }

    /// Approximate edge lengths `(dx, dy, dz)` of cell `(i,j,k)`, averaged
    /// over its four parallel edges in each direction from the same corner
    /// reconstruction [`cell_corners`](Self::cell_corners) uses.
    pub fn cell_dims(&mut self, which: CellRef) -> Result<(f64, f64, f64)> {
        let g = match which {
            CellRef::Global(g) => g,
            CellRef::Active(a) => *self.glob_index.get(a).ok_or(EclError::IndexOutOfRange {
                index: a,
                len: self.glob_index.len(),
            })?,
        };
        let (i, j, k) = self.ijk_from_global(g)?;
        let c = self.cell_corners(i, j, k)?;
        let dist = |a: (f64, f64, f64), b: (f64, f64, f64)| {
            ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2) + (a.2 - b.2).powi(2)).sqrt()
        };
        let dx = (dist(c[0], c[1]) + dist(c[2], c[3]) + dist(c[4], c[5]) + dist(c[6], c[7])) / 4.0;
        let dy = (dist(c[0], c[2]) + dist(c[1], c[3]) + dist(c[4], c[6]) + dist(c[5], c[7])) / 4.0;
        let dz = (dist(c[0], c[4]) + dist(c[1], c[5]) + dist(c[2], c[6]) + dist(c[3], c[7])) / 4.0;
        Ok((dx, dy, dz))
    }

    /// Apply the MAPAXES affine transform (identity if none was present).
    pub fn to_map_xy(&self, x: f64, y: f64) -> (f64, f64) {
        match &self.mapaxes {
            None => (x, y),
            Some(m) => (
                m.origin.0 + x * m.unit_x.0 + y * m.unit_y.0,
                m.origin.1 + x * m.unit_x.1 + y * m.unit_y.1,
            ),
        }
    }

    /// Top or bottom corners of every cell in an `(i1..=i2, j1..=j2)` box at
    /// layer `k`, one 4-tuple-of-corners group per cell in row-major
    /// `(j,i)` order. Reads from the cached ZCORN array if already loaded;
    /// otherwise seeks directly to each needed element (binary files only).
    pub fn xyz_layer(
        &mut self,
        k: usize,
        i1: usize,
        i2: usize,
        j1: usize,
        j2: usize,
        bottom: bool,
    ) -> Result<Vec<(f64, f64, f64)>> {
        let zcorn_idx = self
            .zcorn_idx
            .ok_or_else(|| EclError::MissingRecord("ZCORN".to_string(), self.file.path().display().to_string()))?;
        let (nx, ny, _) = self.nijk;
        let dk = if bottom { 1 } else { 0 };
        let corners = [(0usize, 0usize), (1, 0), (0, 1), (1, 1)];

        let loaded = self.file.is_loaded(zcorn_idx);
        let cached: Option<Vec<f32>> = if loaded {
            Some(self.file.load_data(zcorn_idx)?.as_real("ZCORN")?.to_vec())
        } else {
            None
        };

        let mut out = Vec::new();
        for j in j1..=j2 {
            for i in i1..=i2 {
                for &(di, dj) in &corners {
                    let zi = zcorn_index(i, j, k, di, dj, dk, nx, ny);
                    let z = match &cached {
                        Some(buf) => *buf.get(zi).ok_or(EclError::IndexOutOfRange { index: zi, len: buf.len() })?,
                        None => self.file.read_real_element(zcorn_idx, zi)?,
                    };
                    let (top, bot) = self.pillar(i + di, j + dj, k)?;
                    let (x, y) = interpolate(top, bot, z as f64);
                    out.push((x, y, z as f64));
                }
            }
        }
        Ok(out)
    }

    fn init_path(&self) -> PathBuf {
        let mut p = self.file.path().to_path_buf();
        let formatted = self.file.format() == EclFileFormat::Formatted;
        p.set_extension(if formatted { "FINIT" } else { "INIT" });
        p
    }

    /// Load NNC1/NNC2 for the global grid context and cross-validate
    /// transmissibilities against a companion INIT file if one exists next
    /// to the EGRID.
    pub fn load_nnc(&mut self) -> Result<Vec<NncEntry>> {
        let (nnc1, nnc2) = self
            .nnc
            .get("GLOBAL")
            .cloned()
            .unwrap_or_else(|| (Vec::new(), Vec::new()));

        let trans = if self.init_path().exists() {
            let mut init = EclFile::open(self.init_path())?;
            let gridhead = init.get_int("GRIDHEAD")?.to_vec();
            if gridhead.len() >= 4 {
                let other = (gridhead[1] as i32, gridhead[2] as i32, gridhead[3] as i32);
                let mine = (self.nijk.0 as i32, self.nijk.1 as i32, self.nijk.2 as i32);
                if other != mine {
                    return Err(EclError::GridDimsMismatch {
                        grid_file: self.file.path().display().to_string(),
                        grid: mine,
                        other_file: init.path().display().to_string(),
                        other,
                    });
                }
            }
            if init.has_key("ACTNUM") {
                let other_active = init.get_int("ACTNUM")?.iter().filter(|&&a| a > 0).count();
                if other_active != self.nactive() {
                    return Err(EclError::ActiveCountMismatch {
                        grid_file: self.file.path().display().to_string(),
                        grid: self.nactive(),
                        other_file: init.path().display().to_string(),
                        other: other_active,
                    });
                }
            }
            if init.has_key("TRANNNC") {
                let t = init.get_real("TRANNNC")?.to_vec();
                if t.len() != nnc1.len() {
                    return Err(EclError::TranNncLengthMismatch {
                        file: init.path().display().to_string(),
                        expected: nnc1.len(),
                        found: t.len(),
                    });
                }
                Some(t)
            } else {
                None
            }
        } else {
            None
        };

        let mut entries = Vec::with_capacity(nnc1.len());
        for idx in 0..nnc1.len() {
            let g1 = (nnc1[idx] - 1).max(0) as usize;
            let g2 = (nnc2.get(idx).copied().unwrap_or(0) - 1).max(0) as usize;
            let (i1, j1, k1) = self.ijk_from_global(g1)?;
            let (i2, j2, k2) = self.ijk_from_global(g2)?;
            let t = trans.as_ref().map(|v| v[idx] as f64).unwrap_or(-1.0);
            entries.push(NncEntry {
                i1,
                j1,
                k1,
                i2,
                j2,
                k2,
                trans: t,
            });
        }
        Ok(entries)
    }
}
