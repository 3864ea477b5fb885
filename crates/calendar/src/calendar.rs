//! Day arithmetic in the calendars a CF time axis may declare.

use std::fmt;

use chrono::{Datelike, NaiveDate, TimeDelta};

use crate::doy::{DAYS_PER_YEAR, noleap_doy_index};
use crate::error::CalendarError;

/// Calendar used to count days.
///
/// `NoLeap` years always have 365 days; 29 February does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Calendar {
    /// Proleptic Gregorian calendar.
    #[default]
    Gregorian,
    /// 365-day calendar.
    NoLeap,
}

impl Calendar {
    /// Resolves a CF `calendar` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::UnsupportedCalendar`] for anything other than
    /// the Gregorian and 365-day names.
    pub fn parse(name: &str) -> Result<Self, CalendarError> {
        match name.to_ascii_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(Self::Gregorian),
            "noleap" | "365_day" => Ok(Self::NoLeap),
            other => Err(CalendarError::UnsupportedCalendar {
                name: other.to_string(),
            }),
        }
    }

    /// CF attribute value written to output files.
    pub fn cf_name(self) -> &'static str {
        match self {
            Self::Gregorian => "standard",
            Self::NoLeap => "noleap",
        }
    }

    /// Returns `true` if `date` exists in this calendar.
    pub fn has_date(self, date: NaiveDate) -> bool {
        self == Self::Gregorian || !(date.month() == 2 && date.day() == 29)
    }

    /// Day number of `date`, counted in this calendar from an arbitrary
    /// fixed origin.
    pub fn day_serial(self, date: NaiveDate) -> i64 {
        match self {
            Self::Gregorian => i64::from(date.num_days_from_ce()),
            Self::NoLeap => {
                i64::from(date.year()) * DAYS_PER_YEAR as i64 + noleap_doy_index(date) as i64
            }
        }
    }

    /// Days from `from` to `to` in this calendar.
    pub fn days_between(self, from: NaiveDate, to: NaiveDate) -> i64 {
        self.day_serial(to) - self.day_serial(from)
    }

    /// Adds `days` to `base`, or `None` on overflow.
    pub fn add_days(self, base: NaiveDate, days: i64) -> Option<NaiveDate> {
        match self {
            Self::Gregorian => base.checked_add_signed(TimeDelta::try_days(days)?),
            Self::NoLeap => {
                let year_len = DAYS_PER_YEAR as i64;
                let serial = self.day_serial(base).checked_add(days)?;
                let year = i32::try_from(serial.div_euclid(year_len)).ok()?;
                let doy = serial.rem_euclid(year_len) as u32;
                // Skip 29 February in leap years.
                let ordinal = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() && doy >= 59 {
                    doy + 2
                } else {
                    doy + 1
                };
                NaiveDate::from_yo_opt(year, ordinal)
            }
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cf_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_cf_names() {
        assert_eq!(Calendar::parse("standard"), Ok(Calendar::Gregorian));
        assert_eq!(Calendar::parse("Proleptic_Gregorian"), Ok(Calendar::Gregorian));
        assert_eq!(Calendar::parse("365_day"), Ok(Calendar::NoLeap));
        assert_eq!(Calendar::parse("noleap"), Ok(Calendar::NoLeap));
        assert!(matches!(
            Calendar::parse("360_day"),
            Err(CalendarError::UnsupportedCalendar { .. })
        ));
    }

    #[test]
    fn leap_year_length() {
        let (start, end) = (d(2000, 1, 1), d(2001, 1, 1));
        assert_eq!(Calendar::Gregorian.days_between(start, end), 366);
        assert_eq!(Calendar::NoLeap.days_between(start, end), 365);
    }

    #[test]
    fn noleap_addition_skips_feb29() {
        let cal = Calendar::NoLeap;
        assert_eq!(cal.add_days(d(2000, 2, 28), 1), Some(d(2000, 3, 1)));
        assert_eq!(cal.add_days(d(2000, 2, 28), 365), Some(d(2001, 2, 28)));
        assert_eq!(cal.add_days(d(2000, 1, 1), -1), Some(d(1999, 12, 31)));
        assert_eq!(
            Calendar::Gregorian.add_days(d(2000, 2, 28), 1),
            Some(d(2000, 2, 29))
        );
    }

    #[test]
    fn feb29_exists_only_in_gregorian() {
        assert!(Calendar::Gregorian.has_date(d(2000, 2, 29)));
        assert!(!Calendar::NoLeap.has_date(d(2000, 2, 29)));
        assert!(Calendar::NoLeap.has_date(d(2000, 3, 1)));
    }
}
