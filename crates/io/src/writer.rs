//! NetCDF output of bandwidths and gridded result fields.
//!
//! Every file shares the layout `(axis, y, x)` where the axis is either the
//! calendar step (`step`) or time (`time`, CF units `days since <first
//! step>` in the period's calendar). Positions outside the mask hold the
//! variable's `_FillValue`.

use std::ops::Range;
use std::path::Path;

use ndarray::{ArrayView2, s};
use smi_calendar::Period;
use smi_drought::IndicatorField;
use smi_grid::{GridMask, NODATA};
use smi_kde::BandwidthField;
use tracing::info;

use crate::error::IoError;

/// Variable holding the bandwidth field.
pub const BANDWIDTH_VAR: &str = "bandwidth";
/// Variable holding drought indicator codes.
pub const INDICATOR_VAR: &str = "drought_indicator";
/// Variable holding cluster (event) ids.
pub const CLUSTER_VAR: &str = "cluster_id";

const TIME_DIM: &str = "time";
const STEP_DIM: &str = "step";
const GRID_DIMS: [&str; 2] = ["y", "x"];

/// Fill value of the indicator variable; matches the no-data flag code.
const INDICATOR_FILL: i8 = -1;
/// Fill value of the cluster-id variable outside the mask.
const CLUSTER_FILL: u32 = u32::MAX;

/// Create `path` with `y`/`x` dimensions and a `time` axis covering
/// `output`.
fn create_time_file(
    path: &Path,
    mask: &GridMask,
    output: &Period,
) -> Result<netcdf::FileMut, IoError> {
    let origin = output.step_date(0).ok_or_else(|| IoError::InvalidTime {
        reason: format!("output period starting {} has no steps", output.start()),
    })?;
    let offsets = (0..output.n_steps())
        .map(|t| {
            output
                .step_date(t)
                .map(|date| output.calendar().days_between(origin, date) as f64)
                .ok_or_else(|| IoError::InvalidTime {
                    reason: format!("time step {t} beyond {}", output.end()),
                })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let mut file = netcdf::create(path)?;
    file.add_dimension(TIME_DIM, output.n_steps())?;
    file.add_dimension(GRID_DIMS[0], mask.rows())?;
    file.add_dimension(GRID_DIMS[1], mask.cols())?;
    {
        let mut var = file.add_variable::<f64>(TIME_DIM, &[TIME_DIM])?;
        let units = format!("days since {origin}");
        var.put_attribute("units", units.as_str())?;
        var.put_attribute("calendar", output.calendar().cf_name())?;
        var.put_values(&offsets, ..)?;
    }
    Ok(file)
}

/// Column range of `output` inside the field's own period.
fn output_range(
    field_period: &Period,
    output: &Period,
    n_cols: usize,
) -> Result<Range<usize>, IoError> {
    if field_period.n_steps() != n_cols {
        return Err(IoError::DimensionMismatch {
            name: TIME_DIM.to_string(),
            expected: field_period.n_steps(),
            got: n_cols,
        });
    }
    Ok(output.range_within(field_period)?)
}

/// Write a bandwidth field as a `(step, y, x)` variable.
///
/// Unusable entries and masked-out positions hold `NODATA`.
///
/// # Errors
///
/// Returns [`IoError`] if the field does not match the mask or the file
/// cannot be written.
pub fn write_bandwidths(
    path: &Path,
    mask: &GridMask,
    field: &BandwidthField,
) -> Result<(), IoError> {
    let grid = mask.unpack_series(field.values(), NODATA)?;

    let mut file = netcdf::create(path)?;
    file.add_dimension(STEP_DIM, field.steps_per_year())?;
    file.add_dimension(GRID_DIMS[0], mask.rows())?;
    file.add_dimension(GRID_DIMS[1], mask.cols())?;
    {
        let mut var =
            file.add_variable::<f64>(BANDWIDTH_VAR, &[STEP_DIM, GRID_DIMS[0], GRID_DIMS[1]])?;
        var.put_attribute("_FillValue", NODATA)?;
        var.put_attribute("long_name", "kernel density bandwidth")?;
        var.put_values(&grid, ..)?;
    }

    info!(
        path = %path.display(),
        n_cells = field.n_cells(),
        n_unusable = field.n_unusable(),
        "wrote bandwidth field"
    );
    Ok(())
}

/// Write the `output` sub-period of a `(n_cells, n_steps)` field covering
/// `field_period` as a `(time, y, x)` variable named `var_name`.
///
/// # Errors
///
/// Returns [`IoError`] if the field does not match the mask or its period,
/// `output` lies outside `field_period`, or the file cannot be written.
pub fn write_field(
    path: &Path,
    mask: &GridMask,
    var_name: &str,
    field: ArrayView2<'_, f64>,
    field_period: &Period,
    output: &Period,
) -> Result<(), IoError> {
    let range = output_range(field_period, output, field.ncols())?;
    let grid = mask.unpack_series(field.slice(s![.., range]), NODATA)?;

    let mut file = create_time_file(path, mask, output)?;
    {
        let mut var = file.add_variable::<f64>(var_name, &[TIME_DIM, GRID_DIMS[0], GRID_DIMS[1]])?;
        var.put_attribute("_FillValue", NODATA)?;
        var.put_values(&grid, ..)?;
    }

    info!(path = %path.display(), var = var_name, n_steps = output.n_steps(), "wrote field");
    Ok(())
}

/// Write drought indicator codes (`1` drought, `0` normal, `-1` no data).
///
/// # Errors
///
/// See [`write_field`].
pub fn write_indicator(
    path: &Path,
    mask: &GridMask,
    indicator: &IndicatorField,
    field_period: &Period,
    output: &Period,
) -> Result<(), IoError> {
    let codes = indicator.codes();
    let range = output_range(field_period, output, codes.ncols())?;
    let grid = mask.unpack_series(codes.slice(s![.., range]), INDICATOR_FILL)?;

    let mut file = create_time_file(path, mask, output)?;
    {
        let mut var =
            file.add_variable::<i8>(INDICATOR_VAR, &[TIME_DIM, GRID_DIMS[0], GRID_DIMS[1]])?;
        var.put_attribute("_FillValue", INDICATOR_FILL)?;
        var.put_attribute("threshold", indicator.threshold())?;
        var.put_values(&grid, ..)?;
    }

    info!(path = %path.display(), n_steps = output.n_steps(), "wrote drought indicator");
    Ok(())
}

/// Write cluster ids (`0` outside any event).
///
/// # Errors
///
/// See [`write_field`].
pub fn write_cluster_ids(
    path: &Path,
    mask: &GridMask,
    ids: ArrayView2<'_, u32>,
    field_period: &Period,
    output: &Period,
) -> Result<(), IoError> {
    let range = output_range(field_period, output, ids.ncols())?;
    let grid = mask.unpack_series(ids.slice(s![.., range]), CLUSTER_FILL)?;

    let mut file = create_time_file(path, mask, output)?;
    {
        let mut var =
            file.add_variable::<u32>(CLUSTER_VAR, &[TIME_DIM, GRID_DIMS[0], GRID_DIMS[1]])?;
        var.put_attribute("_FillValue", CLUSTER_FILL)?;
        var.put_values(&grid, ..)?;
    }

    info!(path = %path.display(), n_steps = output.n_steps(), "wrote cluster ids");
    Ok(())
}
