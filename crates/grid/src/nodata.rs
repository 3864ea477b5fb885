//! The reserved no-data sentinel.

/// Reserved value marking an invalid or unavailable observation.
///
/// Every array handed to or returned by the pipeline uses this value for
/// missing entries.
pub const NODATA: f64 = -9999.0;

/// Returns `true` if `value` is the no-data sentinel or is not finite.
///
/// Input files sometimes carry NaN instead of a fill value, so non-finite
/// values are treated as missing too.
#[inline]
pub fn is_nodata(value: f64) -> bool {
    !value.is_finite() || value == NODATA
}

/// Replaces NaN and infinite values with [`NODATA`], in place.
///
/// Returns the number of values that were replaced.
pub fn normalize_nodata(values: &mut [f64]) -> usize {
    let mut n = 0;
    for v in values.iter_mut() {
        if !v.is_finite() {
            *v = NODATA;
            n += 1;
        }
    }
    n
}
