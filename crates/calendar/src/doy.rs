//! No-leap day-of-year index for daily calendar steps.

use chrono::{Datelike, NaiveDate};

/// Day-of-year on which each month starts in a 365-day year
/// (index 0 unused, index 1 = January starts at DOY 1, ...).
const MONTH_START_DOY: [u16; 13] = [0, 1, 32, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Number of days in each month of a 365-day year (index 0 unused).
const DAYS_PER_MONTH: [u8; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Number of daily calendar steps per year.
pub const DAYS_PER_YEAR: usize = 365;

/// Returns the 0-based no-leap day-of-year index (0..=364) of `date`.
///
/// 29 February shares the index of 28 February, so leap and common years
/// map onto the same 365 calendar steps.
pub fn noleap_doy_index(date: NaiveDate) -> usize {
    let month = date.month() as usize;
    let day = (date.day() as u8).min(DAYS_PER_MONTH[month]);
    (MONTH_START_DOY[month] + day as u16 - 2) as usize
}
