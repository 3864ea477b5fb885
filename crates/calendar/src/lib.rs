//! # smi-calendar
//!
//! Periods and calendar-step arithmetic for monthly and daily series.
//!
//! A [`Period`] covers an inclusive date range at a fixed [`Resolution`].
//! Every time step maps to a calendar step (month index for monthly data,
//! no-leap day-of-year index for daily data), which selects the seasonal
//! sample a kernel density is fitted to.
//!
//! ## Quick Start
//!
//! ```
//! use smi_calendar::Period;
//!
//! let estimation = Period::from_ymd((1951, 1, 1), (2010, 12, 31), 12).unwrap();
//! let evaluation = Period::from_ymd((2003, 1, 1), (2003, 12, 31), 12).unwrap();
//!
//! assert_eq!(estimation.n_steps(), 720);
//! assert_eq!(evaluation.calendar_step(5), 5); // June
//! assert_eq!(evaluation.range_within(&estimation).unwrap(), 624..636);
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `period` | Period, resolution and calendar-step mapping |
//! | `calendar` | Gregorian and 365-day day arithmetic |
//! | `doy` | No-leap day-of-year index |
//! | `error` | Error types |

mod calendar;
mod doy;
mod error;
mod period;

pub use calendar::Calendar;
pub use doy::{DAYS_PER_YEAR, noleap_doy_index};
pub use error::CalendarError;
pub use period::{Period, Resolution};
