//! High-level NetCDF reader configuration and orchestration.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use ndarray::{Array2, s};
use smi_calendar::{Calendar, Period, Resolution};
use smi_grid::{BasinMap, GridMask, is_nodata};
use smi_kde::BandwidthField;
use tracing::{debug, info};

use crate::error::IoError;
use crate::netcdf_read;
use crate::writer::BANDWIDTH_VAR;

// ---------------------------------------------------------------------------
// ReaderConfig
// ---------------------------------------------------------------------------

/// Configuration for reading a gridded soil moisture file.
///
/// Use the builder methods (`with_*`) to customise variable names. The
/// [`Default`] implementation expects a `SM` variable on a `time` axis and
/// derives the mask from the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    /// Soil moisture variable laid out as `(time, y, x)`.
    sm_var: String,
    /// NetCDF variable name for the time axis.
    time_var: String,
    /// Optional 2-D mask variable; non-zero valid entries mark land cells.
    mask_var: Option<String>,
    /// Optional 2-D basin-ID variable.
    basin_var: Option<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            sm_var: "SM".into(),
            time_var: "time".into(),
            mask_var: None,
            basin_var: None,
        }
    }
}

impl ReaderConfig {
    /// Set the soil moisture variable name.
    pub fn with_sm_var(mut self, name: impl Into<String>) -> Self {
        self.sm_var = name.into();
        self
    }

    /// Set the time variable name.
    pub fn with_time_var(mut self, name: impl Into<String>) -> Self {
        self.time_var = name.into();
        self
    }

    /// Set the mask variable name, or `None` to derive the mask from the data.
    pub fn with_mask_var(mut self, name: Option<impl Into<String>>) -> Self {
        self.mask_var = name.map(Into::into);
        self
    }

    /// Set the basin-ID variable name, or `None` to skip basin averaging.
    pub fn with_basin_var(mut self, name: Option<impl Into<String>>) -> Self {
        self.basin_var = name.map(Into::into);
        self
    }

    /// Soil moisture variable name.
    pub fn sm_var(&self) -> &str {
        &self.sm_var
    }

    /// Time variable name.
    pub fn time_var(&self) -> &str {
        &self.time_var
    }

    /// Mask variable name, if any.
    pub fn mask_var(&self) -> Option<&str> {
        self.mask_var.as_deref()
    }

    /// Basin-ID variable name, if any.
    pub fn basin_var(&self) -> Option<&str> {
        self.basin_var.as_deref()
    }
}

// ---------------------------------------------------------------------------
// SoilMoistureData
// ---------------------------------------------------------------------------

/// Gridded soil moisture read from a NetCDF file.
#[derive(Debug, Clone)]
pub struct SoilMoistureData {
    /// `[time, y, x]` values with no-data normalised to `NODATA`.
    values: Vec<f64>,
    dates: Vec<NaiveDate>,
    calendar: Calendar,
    mask: GridMask,
    basins: Option<BasinMap>,
}

impl SoilMoistureData {
    /// Grid mask of the file.
    pub fn mask(&self) -> &GridMask {
        &self.mask
    }

    /// Basin map, if a basin variable was read.
    pub fn basins(&self) -> Option<&BasinMap> {
        self.basins.as_ref()
    }

    /// Date of every time step.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Calendar of the time axis.
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Number of time steps.
    pub fn n_steps(&self) -> usize {
        self.dates.len()
    }

    /// Raw `[time, y, x]` values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Period covered by the file at `steps_per_year` resolution, counted in
    /// the file's calendar.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidTime`] if the time axis is not a gap-free
    /// series at that resolution, and [`IoError::Calendar`] for an
    /// unsupported resolution.
    pub fn period(&self, steps_per_year: usize) -> Result<Period, IoError> {
        let (Some(&first), Some(&last)) = (self.dates.first(), self.dates.last()) else {
            return Err(IoError::InvalidTime {
                reason: "time axis is empty".to_string(),
            });
        };
        let period = Period::new(first, last, steps_per_year)?.with_calendar(self.calendar)?;
        if period.n_steps() != self.dates.len() {
            return Err(IoError::InvalidTime {
                reason: format!(
                    "{} time steps do not form a contiguous series of {} steps from {first} to {last}",
                    self.dates.len(),
                    period.n_steps()
                ),
            });
        }
        for (t, date) in self.dates.iter().enumerate() {
            let expected = period.step_date(t).ok_or_else(|| IoError::InvalidTime {
                reason: format!("time step {t} outside {first}..={last}"),
            })?;
            let matches = match period.resolution() {
                Resolution::Monthly => {
                    (date.year(), date.month()) == (expected.year(), expected.month())
                }
                Resolution::Daily => *date == expected,
            };
            if !matches {
                return Err(IoError::InvalidTime {
                    reason: format!("time step {t} is {date}, expected {expected}"),
                });
            }
        }
        Ok(period)
    }

    /// Packs the sub-period `sub` of the file into a `(n_cells, n_steps)`
    /// matrix.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Calendar`] if `sub` is not inside `file_period` and
    /// [`IoError::Grid`] on shape mismatches.
    pub fn cells(&self, file_period: &Period, sub: &Period) -> Result<Array2<f64>, IoError> {
        let range = sub.range_within(file_period)?;
        let all = self.mask.pack_series(&self.values, self.n_steps())?;
        Ok(all.slice(s![.., range]).to_owned())
    }
}

/// Read gridded soil moisture from a NetCDF file.
///
/// The soil moisture variable must be laid out as `(time, y, x)`. Without a
/// mask variable, a cell is valid if it holds data at any time step. With a
/// mask variable, non-zero valid entries mark the cells.
///
/// # Errors
///
/// Returns [`IoError`] on missing variables, dimension mismatches, time-axis
/// conversion failures, or an empty mask.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_soil_moisture(path: &Path, config: &ReaderConfig) -> Result<SoilMoistureData, IoError> {
    let file = netcdf_read::open_file(path)?;

    let (values, [nt, ny, nx]) = netcdf_read::read_3d_f64(&file, &config.sm_var, path)?;
    let (dates, calendar) = netcdf_read::read_time_axis(&file, &config.time_var, path)?;
    if dates.len() != nt {
        return Err(IoError::DimensionMismatch {
            name: config.time_var.clone(),
            expected: nt,
            got: dates.len(),
        });
    }

    let mask = match &config.mask_var {
        Some(name) => {
            let grid = read_grid(&file, name, path, ny, nx)?;
            let valid = grid.iter().map(|&v| !is_nodata(v) && v != 0.0).collect();
            GridMask::new(ny, nx, valid)?
        }
        None => GridMask::from_series(ny, nx, nt, &values)?,
    };

    let basins = match &config.basin_var {
        Some(name) => {
            let grid = read_grid(&file, name, path, ny, nx)?;
            let ids: Vec<i32> = grid
                .iter()
                .map(|&v| if is_nodata(v) { 0 } else { v.round() as i32 })
                .collect();
            Some(BasinMap::from_grid(&mask, &ids)?)
        }
        None => None,
    };

    info!(
        nt,
        ny,
        nx,
        n_cells = mask.n_cells(),
        %calendar,
        n_basins = basins.as_ref().map_or(0, |b| b.basin_ids().len()),
        "read soil moisture"
    );

    Ok(SoilMoistureData {
        values,
        dates,
        calendar,
        mask,
        basins,
    })
}

/// Reads a 2-D `(y, x)` variable and checks it against the grid shape.
fn read_grid(
    file: &netcdf::File,
    name: &str,
    path: &Path,
    ny: usize,
    nx: usize,
) -> Result<Vec<f64>, IoError> {
    let (grid, [gy, gx]) = netcdf_read::read_2d_f64(file, name, path)?;
    if gy != ny {
        return Err(IoError::DimensionMismatch {
            name: format!("{name} y"),
            expected: ny,
            got: gy,
        });
    }
    if gx != nx {
        return Err(IoError::DimensionMismatch {
            name: format!("{name} x"),
            expected: nx,
            got: gx,
        });
    }
    Ok(grid)
}

/// Read a bandwidth field written by [`crate::write_bandwidths`].
///
/// The file holds a `(step, y, x)` variable; grid positions outside `mask`
/// are dropped and the rest become a `(n_cells, steps_per_year)` field.
///
/// # Errors
///
/// Returns [`IoError`] if the variable is missing, its grid does not match
/// the mask, or its step count differs from `steps_per_year`.
pub fn read_bandwidths(
    path: &Path,
    mask: &GridMask,
    steps_per_year: usize,
) -> Result<BandwidthField, IoError> {
    let file = netcdf_read::open_file(path)?;
    let (values, [ns, ny, nx]) = netcdf_read::read_3d_f64(&file, BANDWIDTH_VAR, path)?;

    for (name, expected, got) in [
        ("step", steps_per_year, ns),
        ("y", mask.rows(), ny),
        ("x", mask.cols(), nx),
    ] {
        if expected != got {
            return Err(IoError::DimensionMismatch {
                name: format!("{BANDWIDTH_VAR} {name}"),
                expected,
                got,
            });
        }
    }

    let packed = mask.pack_series(&values, ns)?;
    let field = BandwidthField::from_values(packed)?;
    debug!(
        n_cells = field.n_cells(),
        n_unusable = field.n_unusable(),
        "read bandwidth field"
    );
    Ok(field)
}
