//! Error types for the smi-calendar crate.

use chrono::NaiveDate;

use crate::calendar::Calendar;

/// Error type for all fallible operations in the smi-calendar crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalendarError {
    /// Returned when the number of calendar steps per year is unsupported.
    #[error("unsupported calendar steps per year: {steps} (must be 12, 365 or 366)")]
    InvalidStepsPerYear {
        /// The rejected step count.
        steps: usize,
    },

    /// Returned when a year/month/day triple is not a valid date.
    #[error("invalid date: {year:04}-{month:02}-{day:02}")]
    InvalidDate {
        /// Year component.
        year: i32,
        /// Month component.
        month: u32,
        /// Day component.
        day: u32,
    },

    /// Returned when a period ends before it starts.
    #[error("period end {end} precedes start {start}")]
    EmptyPeriod {
        /// First day of the period.
        start: NaiveDate,
        /// Last day of the period.
        end: NaiveDate,
    },

    /// Returned when two periods use different calendar resolutions.
    #[error("inconsistent periods: {steps_a} vs {steps_b} calendar steps per year")]
    InconsistentResolution {
        /// Steps per year of the first period.
        steps_a: usize,
        /// Steps per year of the second period.
        steps_b: usize,
    },

    /// Returned when a CF calendar name is not supported.
    #[error("unsupported calendar '{name}' (must be standard, gregorian, proleptic_gregorian, noleap or 365_day)")]
    UnsupportedCalendar {
        /// The rejected calendar name.
        name: String,
    },

    /// Returned when a date does not exist in the period's calendar.
    #[error("{date} does not exist in the {calendar} calendar")]
    DateNotInCalendar {
        /// The rejected date.
        date: NaiveDate,
        /// Calendar of the period.
        calendar: Calendar,
    },

    /// Returned when two periods count days in different calendars.
    #[error("inconsistent periods: {calendar_a} vs {calendar_b} calendar")]
    InconsistentCalendar {
        /// Calendar of the first period.
        calendar_a: Calendar,
        /// Calendar of the second period.
        calendar_b: Calendar,
    },

    /// Returned when a period is not contained in an enclosing period.
    #[error("period {inner_start}..={inner_end} lies outside {outer_start}..={outer_end}")]
    OutsidePeriod {
        /// Start of the inner period.
        inner_start: NaiveDate,
        /// End of the inner period.
        inner_end: NaiveDate,
        /// Start of the enclosing period.
        outer_start: NaiveDate,
        /// End of the enclosing period.
        outer_end: NaiveDate,
    },
}
