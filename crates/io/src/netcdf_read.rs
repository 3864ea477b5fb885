//! Low-level NetCDF extraction helpers.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use netcdf::AttributeValue;
use smi_calendar::Calendar;
use smi_grid::{NODATA, normalize_nodata};

use crate::error::IoError;

/// Open a NetCDF file at `path`, returning [`IoError::FileNotFound`] if the
/// path does not exist on disk.
pub(crate) fn open_file(path: &Path) -> Result<netcdf::File, IoError> {
    if !path.exists() {
        return Err(IoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(netcdf::open(path)?)
}

fn variable<'f>(
    file: &'f netcdf::File,
    name: &str,
    path: &Path,
) -> Result<netcdf::Variable<'f>, IoError> {
    file.variable(name).ok_or_else(|| IoError::MissingVariable {
        name: name.to_string(),
        path: path.to_path_buf(),
    })
}

/// Numeric value of a scalar attribute, if present.
fn numeric_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|&x| f64::from(x)),
        _ => None,
    }
}

fn string_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Replace `_FillValue`/`missing_value` matches and non-finite values by
/// [`NODATA`]. Returns the number of no-data values.
fn apply_fill(var: &netcdf::Variable<'_>, data: &mut [f64]) -> usize {
    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| numeric_attribute(var, name))
        .collect();
    normalize_nodata(data);
    let mut n = 0;
    for v in data.iter_mut() {
        if fills.contains(v) {
            *v = NODATA;
        }
        if *v == NODATA {
            n += 1;
        }
    }
    n
}

/// Read a 2-D variable as `f64`, with fill values mapped to [`NODATA`].
///
/// Returns the flattened row-major data and the shape `[ny, nx]`.
pub(crate) fn read_2d_f64(
    file: &netcdf::File,
    var_name: &str,
    path: &Path,
) -> Result<(Vec<f64>, [usize; 2]), IoError> {
    let var = variable(file, var_name, path)?;
    let dims = var.dimensions();
    if dims.len() != 2 {
        return Err(IoError::DimensionMismatch {
            name: format!("{var_name} dimensions"),
            expected: 2,
            got: dims.len(),
        });
    }
    let shape = [dims[0].len(), dims[1].len()];
    let mut data = var.get_values::<f64, _>(..)?;
    apply_fill(&var, &mut data);
    Ok((data, shape))
}

/// Read a 3-D variable as `f64`, with fill values mapped to [`NODATA`].
///
/// Returns the flattened data together with the shape `[nt, ny, nx]`
/// derived from the variable's dimensions.
pub(crate) fn read_3d_f64(
    file: &netcdf::File,
    var_name: &str,
    path: &Path,
) -> Result<(Vec<f64>, [usize; 3]), IoError> {
    let var = variable(file, var_name, path)?;

    let dims = var.dimensions();
    if dims.len() != 3 {
        return Err(IoError::DimensionMismatch {
            name: format!("{var_name} dimensions"),
            expected: 3,
            got: dims.len(),
        });
    }

    let nt = dims[0].len();
    let ny = dims[1].len();
    let nx = dims[2].len();

    let mut data = var.get_values::<f64, _>(..)?;
    let n_nodata = apply_fill(&var, &mut data);
    tracing::debug!(var = var_name, nt, ny, nx, n_nodata, "read 3-D variable");
    Ok((data, [nt, ny, nx]))
}

/// Unit of a CF time offset, in seconds.
fn unit_seconds(unit: &str) -> Option<f64> {
    match unit {
        "days" | "day" | "d" => Some(86_400.0),
        "hours" | "hour" | "h" => Some(3_600.0),
        "minutes" | "minute" | "min" => Some(60.0),
        "seconds" | "second" | "s" => Some(1.0),
        _ => None,
    }
}

/// Parsed CF time units: `"<unit> since <date>[ <time>]"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimeAxis {
    seconds_per_unit: f64,
    origin: NaiveDateTime,
    calendar: Calendar,
}

impl TimeAxis {
    /// Parse a units string and a calendar name.
    pub(crate) fn parse(units: &str, calendar: &str) -> Result<Self, IoError> {
        let parts: Vec<&str> = units.split_whitespace().collect();
        if parts.len() < 3 || parts[1] != "since" {
            return Err(IoError::InvalidTime {
                reason: format!("unexpected time units format: '{units}'"),
            });
        }
        let seconds_per_unit = unit_seconds(parts[0]).ok_or_else(|| IoError::InvalidTime {
            reason: format!("unsupported time unit '{}'", parts[0]),
        })?;

        let date_str = parts[2].get(..10).unwrap_or(parts[2]);
        let date =
            NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| IoError::InvalidTime {
                reason: format!("failed to parse base date '{date_str}': {e}"),
            })?;
        let origin = match parts.get(3) {
            Some(time) => {
                let time = time.trim_end_matches('Z');
                chrono::NaiveTime::parse_from_str(time, "%H:%M:%S")
                    .or_else(|_| chrono::NaiveTime::parse_from_str(time, "%H:%M"))
                    .map(|t| date.and_time(t))
                    .map_err(|e| IoError::InvalidTime {
                        reason: format!("failed to parse base time '{time}': {e}"),
                    })?
            }
            None => date.and_time(chrono::NaiveTime::MIN),
        };

        Ok(Self {
            seconds_per_unit,
            origin,
            calendar: Calendar::parse(calendar)?,
        })
    }

    /// Convert a time offset to the date it falls on.
    pub(crate) fn date(&self, offset: f64) -> Result<NaiveDate, IoError> {
        if !offset.is_finite() {
            return Err(IoError::InvalidTime {
                reason: format!("non-finite time offset {offset}"),
            });
        }
        let seconds = (offset * self.seconds_per_unit).round() as i64;
        let overflow = || IoError::InvalidTime {
            reason: format!("date overflow adding {offset} to {}", self.origin),
        };
        match self.calendar {
            Calendar::Gregorian => self
                .origin
                .checked_add_signed(TimeDelta::seconds(seconds))
                .map(|dt| dt.date())
                .ok_or_else(overflow),
            Calendar::NoLeap => {
                let origin_secs = self.origin.time().signed_duration_since(chrono::NaiveTime::MIN);
                let days = (seconds + origin_secs.num_seconds()).div_euclid(86_400);
                self.calendar
                    .add_days(self.origin.date(), days)
                    .ok_or_else(overflow)
            }
        }
    }

    /// Calendar the offsets are counted in.
    pub(crate) fn calendar(&self) -> Calendar {
        self.calendar
    }
}

/// Read the time axis of `time_var` and return the date of every step
/// together with the axis calendar.
///
/// The `units` attribute is required; `calendar` defaults to `"standard"`.
pub(crate) fn read_time_axis(
    file: &netcdf::File,
    time_var: &str,
    path: &Path,
) -> Result<(Vec<NaiveDate>, Calendar), IoError> {
    let var = variable(file, time_var, path)?;

    let units = string_attribute(&var, "units").ok_or_else(|| IoError::InvalidTime {
        reason: format!("time variable '{time_var}' has no string 'units' attribute"),
    })?;
    let calendar = string_attribute(&var, "calendar").unwrap_or_else(|| "standard".to_string());
    let axis = TimeAxis::parse(&units, &calendar)?;

    let offsets = var.get_values::<f64, _>(..)?;
    let dates = offsets
        .iter()
        .map(|&o| axis.date(o))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((dates, axis.calendar()))
}
