//! # smi-grid
//!
//! Grid mask model shared by every stage of the soil moisture index pipeline.
//!
//! A [`GridMask`] marks valid land cells on a `rows × cols` grid and numbers
//! them `0..n_cells` in row-major order. All per-cell arrays (time series,
//! bandwidths, SMI values, drought flags) are packed in that order, which
//! keeps per-stage shape contracts explicit: a cell matrix always has
//! `mask.n_cells()` rows.
//!
//! Missing values are marked with the reserved [`NODATA`] sentinel.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `mask` | Validity mask, packing and 8-connected neighbourhoods |
//! | `nodata` | No-data sentinel helpers |
//! | `basin` | Basin-ID maps and basin-averaged series |
//! | `error` | Error types |

mod basin;
mod error;
mod mask;
mod nodata;

pub use basin::{BasinMap, BasinSeries};
pub use error::GridError;
pub use mask::GridMask;
pub use nodata::{NODATA, is_nodata, normalize_nodata};
