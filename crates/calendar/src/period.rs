//! Time periods and their calendar-step mapping.

use std::ops::Range;

use chrono::{Datelike, Months, NaiveDate, TimeDelta};

use crate::calendar::Calendar;
use crate::doy::{DAYS_PER_YEAR, noleap_doy_index};
use crate::error::CalendarError;

/// Temporal resolution of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// One value per calendar month (12 calendar steps per year).
    Monthly,
    /// One value per day (365 calendar steps per year, 29 February folded
    /// into 28 February).
    Daily,
}

impl Resolution {
    /// Resolves a calendar-step count into a resolution.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidStepsPerYear`] unless `steps` is 12,
    /// 365 or 366.
    pub fn from_steps_per_year(steps: usize) -> Result<Self, CalendarError> {
        match steps {
            12 => Ok(Self::Monthly),
            365 | 366 => Ok(Self::Daily),
            _ => Err(CalendarError::InvalidStepsPerYear { steps }),
        }
    }

    /// Number of calendar steps per year.
    pub fn steps_per_year(self) -> usize {
        match self {
            Self::Monthly => 12,
            Self::Daily => DAYS_PER_YEAR,
        }
    }
}

/// An inclusive range of dates sampled at a fixed [`Resolution`].
///
/// Time step `t` of a monthly period is the `t`-th month counted from the
/// start month; time step `t` of a daily period is the `t`-th day of its
/// [`Calendar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
    resolution: Resolution,
    calendar: Calendar,
}

impl Period {
    /// Creates a Gregorian period from inclusive start and end dates.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidStepsPerYear`] for unsupported step
    /// counts and [`CalendarError::EmptyPeriod`] if `end < start`.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        steps_per_year: usize,
    ) -> Result<Self, CalendarError> {
        let resolution = Resolution::from_steps_per_year(steps_per_year)?;
        if end < start {
            return Err(CalendarError::EmptyPeriod { start, end });
        }
        Ok(Self {
            start,
            end,
            resolution,
            calendar: Calendar::Gregorian,
        })
    }

    /// Counts the period's days in `calendar` instead.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::DateNotInCalendar`] if the start or end date
    /// does not exist in `calendar`.
    pub fn with_calendar(mut self, calendar: Calendar) -> Result<Self, CalendarError> {
        for date in [self.start, self.end] {
            if !calendar.has_date(date) {
                return Err(CalendarError::DateNotInCalendar { date, calendar });
            }
        }
        self.calendar = calendar;
        Ok(self)
    }

    /// Creates a period from year/month/day components.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidDate`] for impossible dates, plus the
    /// errors of [`Period::new`].
    pub fn from_ymd(
        start: (i32, u32, u32),
        end: (i32, u32, u32),
        steps_per_year: usize,
    ) -> Result<Self, CalendarError> {
        Self::new(ymd(start)?, ymd(end)?, steps_per_year)
    }

    /// First day of the period.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the period.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Temporal resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Calendar the period's days are counted in.
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Number of calendar steps per year.
    pub fn steps_per_year(&self) -> usize {
        self.resolution.steps_per_year()
    }

    /// Number of time steps covered by the period.
    pub fn n_steps(&self) -> usize {
        match self.resolution {
            Resolution::Monthly => (month_serial(self.end) - month_serial(self.start) + 1) as usize,
            Resolution::Daily => (self.calendar.days_between(self.start, self.end) + 1) as usize,
        }
    }

    /// Date of time step `t` (the first of the month for monthly periods).
    ///
    /// Returns `None` if `t` is beyond the end of the period.
    pub fn step_date(&self, t: usize) -> Option<NaiveDate> {
        if t >= self.n_steps() {
            return None;
        }
        match self.resolution {
            Resolution::Monthly => self
                .start
                .with_day(1)?
                .checked_add_months(Months::new(u32::try_from(t).ok()?)),
            Resolution::Daily => self
                .calendar
                .add_days(self.start, i64::try_from(t).ok()?),
        }
    }

    /// Calendar step (`0..steps_per_year()`) of time step `t`.
    pub fn calendar_step(&self, t: usize) -> usize {
        match self.resolution {
            Resolution::Monthly => (self.start.month0() as usize + t) % 12,
            Resolution::Daily => match self.calendar {
                Calendar::Gregorian => noleap_doy_index(self.start + TimeDelta::days(t as i64)),
                Calendar::NoLeap => (noleap_doy_index(self.start) + t) % DAYS_PER_YEAR,
            },
        }
    }

    /// Calendar step of every time step, in order.
    pub fn calendar_steps(&self) -> Vec<usize> {
        (0..self.n_steps()).map(|t| self.calendar_step(t)).collect()
    }

    /// Returns `true` if both periods share the same resolution and
    /// calendar.
    pub fn is_consistent_with(&self, other: &Period) -> bool {
        self.resolution == other.resolution && self.calendar == other.calendar
    }

    /// Returns `true` if `other` lies entirely inside this period.
    pub fn contains(&self, other: &Period) -> bool {
        self.is_consistent_with(other) && other.start >= self.start && other.end <= self.end
    }

    /// Time-step range of this period inside the enclosing period `outer`.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InconsistentResolution`] or
    /// [`CalendarError::InconsistentCalendar`] if the periods differ in
    /// either, and [`CalendarError::OutsidePeriod`] if this period is not
    /// contained in `outer`.
    pub fn range_within(&self, outer: &Period) -> Result<Range<usize>, CalendarError> {
        if self.resolution != outer.resolution {
            return Err(CalendarError::InconsistentResolution {
                steps_a: self.steps_per_year(),
                steps_b: outer.steps_per_year(),
            });
        }
        if self.calendar != outer.calendar {
            return Err(CalendarError::InconsistentCalendar {
                calendar_a: self.calendar,
                calendar_b: outer.calendar,
            });
        }
        if !outer.contains(self) {
            return Err(CalendarError::OutsidePeriod {
                inner_start: self.start,
                inner_end: self.end,
                outer_start: outer.start,
                outer_end: outer.end,
            });
        }
        let offset = match self.resolution {
            Resolution::Monthly => (month_serial(self.start) - month_serial(outer.start)) as usize,
            Resolution::Daily => self.calendar.days_between(outer.start, self.start) as usize,
        };
        Ok(offset..offset + self.n_steps())
    }
}

fn ymd((year, month, day): (i32, u32, u32)) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(CalendarError::InvalidDate { year, month, day })
}

/// Months elapsed since year 0, used to count monthly steps.
fn month_serial(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_from_steps() {
        assert_eq!(Resolution::from_steps_per_year(12), Ok(Resolution::Monthly));
        assert_eq!(Resolution::from_steps_per_year(365), Ok(Resolution::Daily));
        assert_eq!(Resolution::from_steps_per_year(366), Ok(Resolution::Daily));
        assert!(Resolution::from_steps_per_year(0).is_err());
        assert!(Resolution::from_steps_per_year(52).is_err());
    }

    #[test]
    fn monthly_step_count_and_calendar() {
        let p = Period::from_ymd((2000, 11, 1), (2002, 2, 28), 12).unwrap();
        assert_eq!(p.n_steps(), 16);
        assert_eq!(p.calendar_step(0), 10);
        assert_eq!(p.calendar_step(1), 11);
        assert_eq!(p.calendar_step(2), 0);
        assert_eq!(p.calendar_step(15), 1);
        assert_eq!(
            p.step_date(2),
            Some(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap())
        );
        assert_eq!(p.step_date(16), None);
    }

    #[test]
    fn daily_step_count_spans_leap_year() {
        let p = Period::from_ymd((2000, 1, 1), (2000, 12, 31), 365).unwrap();
        assert_eq!(p.n_steps(), 366);
        let steps = p.calendar_steps();
        assert_eq!(steps[58], 58); // Feb 28
        assert_eq!(steps[59], 58); // Feb 29
        assert_eq!(steps[60], 59); // Mar 1
        assert_eq!(steps[365], 364);
    }

    #[test]
    fn noleap_daily_year_has_365_steps() {
        let p = Period::from_ymd((2000, 1, 1), (2000, 12, 31), 365)
            .unwrap()
            .with_calendar(Calendar::NoLeap)
            .unwrap();
        assert_eq!(p.n_steps(), 365);
        assert_eq!(
            p.step_date(59),
            Some(NaiveDate::from_ymd_opt(2000, 3, 1).unwrap())
        );
        assert_eq!(p.calendar_step(59), 59);
        assert_eq!(p.calendar_steps(), (0..365).collect::<Vec<_>>());
    }

    #[test]
    fn noleap_range_does_not_drift_across_leap_days() {
        let outer = Period::from_ymd((1999, 1, 1), (2004, 12, 31), 365)
            .unwrap()
            .with_calendar(Calendar::NoLeap)
            .unwrap();
        let inner = Period::from_ymd((2004, 1, 1), (2004, 12, 31), 365)
            .unwrap()
            .with_calendar(Calendar::NoLeap)
            .unwrap();
        assert_eq!(inner.range_within(&outer), Ok(1825..2190));
        assert_eq!(outer.calendar_step(1825), 0);

        let gregorian = Period::from_ymd((2004, 1, 1), (2004, 12, 31), 365).unwrap();
        assert!(!outer.contains(&gregorian));
        assert!(matches!(
            gregorian.range_within(&outer),
            Err(CalendarError::InconsistentCalendar { .. })
        ));
    }

    #[test]
    fn noleap_rejects_feb29_bounds() {
        let p = Period::from_ymd((2000, 1, 1), (2000, 2, 29), 365).unwrap();
        assert!(matches!(
            p.with_calendar(Calendar::NoLeap),
            Err(CalendarError::DateNotInCalendar { .. })
        ));
    }

    #[test]
    fn reversed_period_rejected() {
        assert!(matches!(
            Period::from_ymd((2001, 1, 1), (2000, 1, 1), 12),
            Err(CalendarError::EmptyPeriod { .. })
        ));
    }

    #[test]
    fn invalid_date_rejected() {
        assert!(matches!(
            Period::from_ymd((2001, 2, 29), (2002, 1, 1), 12),
            Err(CalendarError::InvalidDate { .. })
        ));
    }

    #[test]
    fn range_within_monthly() {
        let outer = Period::from_ymd((1990, 1, 1), (2000, 12, 31), 12).unwrap();
        let inner = Period::from_ymd((1991, 3, 1), (1991, 5, 31), 12).unwrap();
        assert_eq!(inner.range_within(&outer), Ok(14..17));
    }

    #[test]
    fn range_within_daily() {
        let outer = Period::from_ymd((2000, 1, 1), (2000, 12, 31), 365).unwrap();
        let inner = Period::from_ymd((2000, 2, 1), (2000, 2, 10), 365).unwrap();
        assert_eq!(inner.range_within(&outer), Ok(31..41));
    }

    #[test]
    fn range_within_rejects_outside_and_mixed() {
        let outer = Period::from_ymd((2000, 1, 1), (2000, 12, 31), 12).unwrap();
        let outside = Period::from_ymd((1999, 1, 1), (2000, 6, 30), 12).unwrap();
        assert!(matches!(
            outside.range_within(&outer),
            Err(CalendarError::OutsidePeriod { .. })
        ));
        let daily = Period::from_ymd((2000, 1, 1), (2000, 6, 30), 365).unwrap();
        assert!(matches!(
            daily.range_within(&outer),
            Err(CalendarError::InconsistentResolution { .. })
        ));
    }
}
