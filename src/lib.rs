//! Reader for the binary/formatted files written out by the Eclipse family
//! of reservoir simulators: the structured corner-point grid (`EGRID`) and
//! the restart-chained summary time series (`SMSPEC`/`UNSMRY`).
//!
//! The three layers mirror the on-disk structure:
//!
//! - [`eclfile`] is the block-structured container reader: a directory of
//!   named, typed, lazily-loaded array records.
//! - [`egrid`] interprets an `EclFile`'s records as corner-point grid
//!   geometry, active-cell indexing and non-neighbor connections.
//! - [`esmry`] resolves a (possibly restart-chained) summary run into a
//!   flat, keyword-indexed time series.

mod binary_parsing;
pub mod block;
pub mod eclfile;
pub mod egrid;
pub mod error;
pub mod esmry;
pub mod keybuilder;
#[cfg(test)]
mod testutil;

use smallstr::SmallString;

/// Eclipse keyword/name fields are 8-character space-padded strings; most
/// fit inline without a heap allocation.
const FIXED_STRING_LENGTH: usize = 8;
pub type FlexString = SmallString<[u8; FIXED_STRING_LENGTH]>;

pub use eclfile::{EclFile, EclFileFormat, RecordData, RecordDataKind};
pub use egrid::{CellRef, EGrid};
pub use error::{EclError, ErrorKind};
pub use esmry::{EsmryContents, ESmry};

/// Crate's Result type.
pub type Result<T> = std::result::Result<T, error::EclError>;
