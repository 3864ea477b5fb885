//! # smi-io
//!
//! Read gridded soil moisture from NetCDF files and write the products of a
//! run: bandwidth fields, SMI and inverted soil moisture, drought indicator
//! and cluster ids as NetCDF, plus a JSON drought report. Bridges external
//! file formats into the packed `(n_cells, n_steps)` matrices used by the
//! rest of the workspace.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `reader` | Soil moisture, mask, basin and bandwidth input |
//! | `writer` | NetCDF output on the `(time \| step, y, x)` grid |
//! | `report` | JSON drought report |

mod error;
mod netcdf_read;
mod reader;
mod report;
mod writer;

pub use error::IoError;
pub use reader::{ReaderConfig, SoilMoistureData, read_bandwidths, read_soil_moisture};
pub use report::{
    BasinReport, CellReport, DroughtReport, EstimationReport, RunSummary, to_json, write_report,
};
pub use writer::{
    BANDWIDTH_VAR, CLUSTER_VAR, INDICATOR_VAR, write_bandwidths, write_cluster_ids,
    write_field, write_indicator,
};
