//! Working-time calendar: converts effort hours into dated boundaries.
//!
//! Each working day (Monday to Friday) offers `hours_per_day` effort hours
//! counted from local midnight. Saturdays and Sundays offer none. A forward
//! (ASAP) placement consumes a day from hour 0 towards `hours_per_day` and
//! rolls to the next working day's midnight; a backward (ALAP) placement
//! consumes from `hours_per_day` towards 0 and rolls to the previous working
//! day's `hours_per_day` mark.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::fmt;
use std::str::FromStr;

/// Tolerance for comparing hour quantities.
pub const HOURS_EPSILON: f64 = 1e-9;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Scheduling direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// As soon as possible: start-anchored, forward in time
    Asap,
    /// As late as possible: finish-anchored, backward in time
    Alap,
}

/// One side of a task's time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    Start,
    Finish,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Start => write!(f, "start"),
            Boundary::Finish => write!(f, "finish"),
        }
    }
}

impl Direction {
    /// The boundary a pass anchors and computes first.
    pub fn from_boundary(self) -> Boundary {
        match self {
            Direction::Asap => Boundary::Start,
            Direction::Alap => Boundary::Finish,
        }
    }

    /// The boundary derived from the anchored one plus effort.
    pub fn to_boundary(self) -> Boundary {
        match self {
            Direction::Asap => Boundary::Finish,
            Direction::Alap => Boundary::Start,
        }
    }

    /// +1 when time moves forward, -1 when it moves backward.
    pub fn sign(self) -> i32 {
        match self {
            Direction::Asap => 1,
            Direction::Alap => -1,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Asap => Direction::Alap,
            Direction::Alap => Direction::Asap,
        }
    }

    /// Position within a day where placement resumes after a roll-over.
    pub fn day_start_offset(self, hours_per_day: f64) -> f64 {
        match self {
            Direction::Asap => 0.0,
            Direction::Alap => hours_per_day,
        }
    }

    /// Position within a day where the day's capacity is exhausted.
    pub fn day_end_offset(self, hours_per_day: f64) -> f64 {
        match self {
            Direction::Asap => hours_per_day,
            Direction::Alap => 0.0,
        }
    }

    /// The instant further along in this direction.
    pub fn later(self, a: NaiveDateTime, b: NaiveDateTime) -> NaiveDateTime {
        match self {
            Direction::Asap => a.max(b),
            Direction::Alap => a.min(b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asap => "asap",
            Direction::Alap => "alap",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asap" => Ok(Direction::Asap),
            "alap" => Ok(Direction::Alap),
            other => Err(format!("Unknown scheduling direction: {}", other)),
        }
    }
}

/// Where a boundary came from. Lower values take precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateSource {
    /// Fixed date set directly on the task
    Task = 0,
    /// Derived from dependency partners or resource history
    Dependency = 1,
    /// Project-level start or finish
    Project = 2,
    /// Same-day fallback
    Today = 3,
}

/// A task's computed time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, finish: NaiveDateTime) -> Self {
        Self { start, finish }
    }

    /// Build a window from a placement's anchored and derived boundaries.
    pub fn oriented(direction: Direction, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        match direction {
            Direction::Asap => Self::new(from, to),
            Direction::Alap => Self::new(to, from),
        }
    }

    pub fn get(&self, boundary: Boundary) -> NaiveDateTime {
        match boundary {
            Boundary::Start => self.start,
            Boundary::Finish => self.finish,
        }
    }

    /// Widen this window to cover `other`.
    pub fn cover(&mut self, other: &Window) {
        self.start = self.start.min(other.start);
        self.finish = self.finish.max(other.finish);
    }
}

/// Convert hours to a duration, rounded to the millisecond.
pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::milliseconds((hours * MILLIS_PER_HOUR).round() as i64)
}

/// Fixed weekly calendar shared by every resource.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calendar {
    hours_per_day: f64,
}

impl Calendar {
    pub fn new(hours_per_day: f64) -> Self {
        Self { hours_per_day }
    }

    pub fn hours_per_day(&self) -> f64 {
        self.hours_per_day
    }

    pub fn is_working_day(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    fn at_offset(date: NaiveDate, hours: f64) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + hours_to_duration(hours)
    }

    fn hour_of_day(t: NaiveDateTime) -> f64 {
        (t - t.date().and_time(NaiveTime::MIN)).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }

    /// The day and hour `t` falls in when consuming backward. Midnight closes
    /// the previous day (hour 24) rather than opening its own.
    fn backward_position(t: NaiveDateTime) -> (NaiveDate, f64) {
        if t.time() == NaiveTime::MIN {
            if let Some(previous) = t.date().pred_opt() {
                return (previous, 24.0);
            }
        }
        (t.date(), Self::hour_of_day(t))
    }

    /// The instant at which a working day's effort starts or stops.
    pub fn day_boundary(&self, date: NaiveDate, boundary: Boundary) -> NaiveDateTime {
        match boundary {
            Boundary::Start => Self::at_offset(date, 0.0),
            Boundary::Finish => Self::at_offset(date, self.hours_per_day),
        }
    }

    /// Effort hours available from `t` moving in `direction` before the day is exhausted.
    pub fn available_hours(&self, t: NaiveDateTime, direction: Direction) -> f64 {
        let (date, hour) = match direction {
            Direction::Asap => (t.date(), Self::hour_of_day(t)),
            Direction::Alap => Self::backward_position(t),
        };
        if !Self::is_working_day(date) {
            return 0.0;
        }
        match direction {
            Direction::Asap => (self.hours_per_day - hour).max(0.0),
            Direction::Alap => hour.min(self.hours_per_day),
        }
    }

    /// Move to the adjacent working day in `direction`, positioned where
    /// placement resumes. `None` when the date range is exhausted.
    fn roll(&self, t: NaiveDateTime, direction: Direction) -> Option<NaiveDateTime> {
        let mut date = match direction {
            Direction::Asap => t.date(),
            Direction::Alap => Self::backward_position(t).0,
        };
        loop {
            date = match direction {
                Direction::Asap => date.checked_add_days(Days::new(1))?,
                Direction::Alap => date.checked_sub_days(Days::new(1))?,
            };
            if Self::is_working_day(date) {
                return Some(Self::at_offset(
                    date,
                    direction.day_start_offset(self.hours_per_day),
                ));
            }
        }
    }

    /// First instant at or beyond `t` (in `direction`) with capacity left.
    pub fn align(&self, t: NaiveDateTime, direction: Direction) -> Option<NaiveDateTime> {
        let mut t = t;
        if direction == Direction::Alap {
            let (date, hour) = Self::backward_position(t);
            if Self::is_working_day(date) && hour > self.hours_per_day {
                t = Self::at_offset(date, self.hours_per_day);
            }
        }
        while self.available_hours(t, direction) <= HOURS_EPSILON {
            t = self.roll(t, direction)?;
        }
        Some(t)
    }

    /// Place `hours` of effort from `from` in `direction`.
    ///
    /// Returns the aligned anchor and the opposite boundary. Zero effort
    /// places the task at `from` unchanged. When the remaining effort is less
    /// than what the current day offers, the boundary lands inside that day;
    /// otherwise the day is exhausted and placement rolls to the next working
    /// day.
    pub fn place(
        &self,
        from: NaiveDateTime,
        hours: f64,
        direction: Direction,
    ) -> Option<(NaiveDateTime, NaiveDateTime)> {
        if hours <= HOURS_EPSILON {
            return Some((from, from));
        }

        let anchor = self.align(from, direction)?;
        let mut t = anchor;
        let mut remaining = hours;

        loop {
            let available = self.available_hours(t, direction);
            if available > remaining + HOURS_EPSILON {
                let end = t + hours_to_duration(remaining) * direction.sign();
                return Some((anchor, end));
            }
            remaining -= available;
            t = self.roll(t, direction)?;
            if remaining <= HOURS_EPSILON {
                return Some((anchor, t));
            }
        }
    }

    /// Working hours between two instants, in either order.
    pub fn working_hours_between(&self, a: NaiveDateTime, b: NaiveDateTime) -> f64 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let mut total = 0.0;
        let mut date = lo.date();

        while date <= hi.date() {
            if Self::is_working_day(date) {
                let open = self.day_boundary(date, Boundary::Start).max(lo);
                let close = self.day_boundary(date, Boundary::Finish).min(hi);
                if close > open {
                    total += (close - open).num_milliseconds() as f64 / MILLIS_PER_HOUR;
                }
            }
            let Some(next) = date.succ_opt() else {
                break;
            };
            date = next;
        }

        total
    }

    /// Whether two instants denote the same point in working time, e.g. the
    /// end of Friday's working hours and the following Monday's midnight.
    pub fn same_working_instant(&self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        self.working_hours_between(a, b) <= HOURS_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    // 2019-01-07 is a Monday.
    fn monday(h: u32) -> NaiveDateTime {
        at(2019, 1, 7, h)
    }

    #[test]
    fn test_direction_descriptor() {
        assert_eq!(Direction::Asap.from_boundary(), Boundary::Start);
        assert_eq!(Direction::Alap.from_boundary(), Boundary::Finish);
        assert_eq!(Direction::Asap.reverse(), Direction::Alap);
        assert_eq!(Direction::Asap.sign(), 1);
        assert_eq!(Direction::Alap.sign(), -1);
        assert_eq!(Direction::Alap.day_start_offset(5.0), 5.0);
        assert_eq!(Direction::Asap.day_end_offset(5.0), 5.0);
        assert_eq!("ALAP".parse::<Direction>(), Ok(Direction::Alap));
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_date_source_precedence() {
        assert!(DateSource::Task < DateSource::Dependency);
        assert!(DateSource::Dependency < DateSource::Project);
        assert!(DateSource::Project < DateSource::Today);
    }

    #[test]
    fn test_weekend_has_no_capacity() {
        let cal = Calendar::new(5.0);
        assert_eq!(cal.available_hours(at(2019, 1, 12, 0), Direction::Asap), 0.0);
        assert_eq!(cal.available_hours(at(2019, 1, 13, 3), Direction::Alap), 0.0);
        assert_eq!(cal.available_hours(monday(2), Direction::Asap), 3.0);
        assert_eq!(cal.available_hours(monday(2), Direction::Alap), 2.0);
        assert_eq!(cal.available_hours(monday(9), Direction::Alap), 5.0);
    }

    #[test]
    fn test_partial_day_stays_within_day() {
        let cal = Calendar::new(5.0);
        let (start, finish) = cal.place(monday(0), 3.0, Direction::Asap).unwrap();
        assert_eq!(start, monday(0));
        assert_eq!(finish, monday(3));
    }

    #[test]
    fn test_four_full_days_forward() {
        // 20 hours at 5 hours/day from Monday midnight exhausts Thursday.
        let cal = Calendar::new(5.0);
        let (start, finish) = cal.place(monday(0), 20.0, Direction::Asap).unwrap();
        assert_eq!(start, monday(0));
        assert_eq!(finish, at(2019, 1, 11, 0));
    }

    #[test]
    fn test_forward_rolls_over_weekend() {
        let cal = Calendar::new(5.0);
        let (start, finish) = cal.place(at(2019, 1, 11, 0), 20.0, Direction::Asap).unwrap();
        assert_eq!(start, at(2019, 1, 11, 0));
        // Friday, Monday, Tuesday, Wednesday
        assert_eq!(finish, at(2019, 1, 17, 0));
    }

    #[test]
    fn test_exhausting_friday_lands_on_monday() {
        let cal = Calendar::new(5.0);
        let (_, finish) = cal.place(at(2019, 1, 11, 0), 5.0, Direction::Asap).unwrap();
        assert_eq!(finish, at(2019, 1, 14, 0));
    }

    #[test]
    fn test_weekend_anchor_aligns_to_monday() {
        let cal = Calendar::new(5.0);
        let (start, finish) = cal.place(at(2019, 1, 12, 0), 2.0, Direction::Asap).unwrap();
        assert_eq!(start, at(2019, 1, 14, 0));
        assert_eq!(finish, at(2019, 1, 14, 2));
    }

    #[test]
    fn test_backward_placement() {
        let cal = Calendar::new(5.0);
        // From Friday midnight backward: aligns to Thursday 05:00.
        let (finish, start) = cal.place(at(2019, 1, 11, 0), 3.0, Direction::Alap).unwrap();
        assert_eq!(finish, at(2019, 1, 10, 5));
        assert_eq!(start, at(2019, 1, 10, 2));
    }

    #[test]
    fn test_backward_rolls_over_weekend() {
        let cal = Calendar::new(5.0);
        let (finish, start) = cal.place(at(2019, 1, 15, 5), 10.0, Direction::Alap).unwrap();
        assert_eq!(finish, at(2019, 1, 15, 5));
        // Tuesday and Monday exhausted; resumes at the previous Friday's end of day.
        assert_eq!(start, at(2019, 1, 11, 5));
    }

    #[test]
    fn test_full_day_capacity_backward() {
        // At 24 hours/day a backward day ends at the next midnight.
        let cal = Calendar::new(24.0);
        assert_eq!(cal.available_hours(at(2019, 1, 11, 0), Direction::Alap), 24.0);
        assert_eq!(
            cal.place(at(2019, 1, 11, 0), 8.0, Direction::Alap),
            Some((at(2019, 1, 11, 0), at(2019, 1, 10, 16)))
        );
        assert_eq!(
            cal.place(at(2019, 1, 11, 0), 48.0, Direction::Alap),
            Some((at(2019, 1, 11, 0), at(2019, 1, 9, 0)))
        );
        // Monday and Friday, skipping the weekend
        assert_eq!(
            cal.place(at(2019, 1, 15, 0), 48.0, Direction::Alap),
            Some((at(2019, 1, 15, 0), at(2019, 1, 11, 0)))
        );
    }

    #[test]
    fn test_full_day_capacity_forward() {
        let cal = Calendar::new(24.0);
        assert_eq!(
            cal.place(at(2019, 1, 11, 0), 30.0, Direction::Asap),
            Some((at(2019, 1, 11, 0), at(2019, 1, 14, 6)))
        );
    }

    #[test]
    fn test_zero_effort_keeps_anchor() {
        let cal = Calendar::new(5.0);
        let saturday = at(2019, 1, 12, 0);
        assert_eq!(
            cal.place(saturday, 0.0, Direction::Asap),
            Some((saturday, saturday))
        );
    }

    #[test]
    fn test_working_hours_between() {
        let cal = Calendar::new(5.0);
        assert!((cal.working_hours_between(monday(0), at(2019, 1, 11, 0)) - 20.0).abs() < 1e-9);
        assert!((cal.working_hours_between(monday(3), monday(1)) - 2.0).abs() < 1e-9);
        assert!(cal.same_working_instant(at(2019, 1, 11, 5), at(2019, 1, 14, 0)));
        assert!(!cal.same_working_instant(monday(0), monday(1)));
    }

    #[test]
    fn test_window_cover() {
        let mut window = Window::new(monday(2), monday(4));
        window.cover(&Window::new(monday(1), monday(3)));
        assert_eq!(window, Window::new(monday(1), monday(4)));
        assert_eq!(window.get(Boundary::Finish), monday(4));

        let backward = Window::oriented(Direction::Alap, monday(4), monday(1));
        assert_eq!(backward, Window::new(monday(1), monday(4)));
    }
}
