//! Time windows and weekly shift schedules.
//!
//! A [`TimeWindow`] is the half-open interval `[start, end)` used everywhere
//! scheduling math happens: staff shifts, partial leaves, business hours,
//! and candidate appointment slots all speak this vocabulary.

use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// A half-open time-of-day interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start of the window.
    pub start: NaiveTime,
    /// Exclusive end of the window.
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Creates a window. Callers are expected to pass `start < end`; an
    /// empty or inverted window never contains anything.
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Returns true if `start < end`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    /// Returns true if `time` falls inside the window.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }

    /// Returns true if `other` lies entirely inside this window.
    #[must_use]
    pub fn covers(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the two windows share any instant.
    #[must_use]
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns the window length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

fn day_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

/// Working windows for each day of the week.
///
/// A day with no windows is a day off. Most staff have a single window per
/// working day, but split shifts are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    /// Windows per weekday, indexed Monday through Sunday.
    days: [Vec<TimeWindow>; 7],
}

impl WeeklySchedule {
    /// Creates a schedule with every day off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schedule with the same single window every day of the week.
    #[must_use]
    pub fn every_day(window: TimeWindow) -> Self {
        Self {
            days: std::array::from_fn(|_| vec![window]),
        }
    }

    /// Sets the windows for one weekday, replacing any existing ones.
    #[must_use]
    pub fn with_day(mut self, weekday: Weekday, windows: Vec<TimeWindow>) -> Self {
        self.days[day_index(weekday)] = windows;
        self
    }

    /// Marks one weekday as a day off.
    #[must_use]
    pub fn with_day_off(mut self, weekday: Weekday) -> Self {
        self.days[day_index(weekday)].clear();
        self
    }

    /// Returns the working windows for a weekday.
    #[must_use]
    pub fn windows_for(&self, weekday: Weekday) -> &[TimeWindow] {
        &self.days[day_index(weekday)]
    }

    /// Returns true if the weekday has at least one working window.
    #[must_use]
    pub fn is_working_on(&self, weekday: Weekday) -> bool {
        !self.days[day_index(weekday)].is_empty()
    }

    /// Returns true if `window` lies entirely inside one of the weekday's
    /// working windows.
    #[must_use]
    pub fn covers(&self, weekday: Weekday, window: &TimeWindow) -> bool {
        self.windows_for(weekday).iter().any(|w| w.covers(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn window_contains_half_open() {
        let window = TimeWindow::new(time(9, 0), time(18, 0));
        assert!(window.contains(time(9, 0)));
        assert!(window.contains(time(17, 59)));
        assert!(!window.contains(time(18, 0)));
    }

    #[test]
    fn window_overlap_excludes_touching() {
        let morning = TimeWindow::new(time(9, 0), time(12, 0));
        let afternoon = TimeWindow::new(time(12, 0), time(18, 0));
        assert!(!morning.overlaps(&afternoon));

        let long_lunch = TimeWindow::new(time(11, 0), time(13, 0));
        assert!(morning.overlaps(&long_lunch));
        assert!(afternoon.overlaps(&long_lunch));
    }

    #[test]
    fn window_covers() {
        let shift = TimeWindow::new(time(10, 0), time(19, 0));
        let slot = TimeWindow::new(time(10, 0), time(11, 0));
        assert!(shift.covers(&slot));

        let early = TimeWindow::new(time(9, 30), time(10, 30));
        assert!(!shift.covers(&early));
    }

    #[test]
    fn inverted_window_is_malformed() {
        let window = TimeWindow::new(time(18, 0), time(9, 0));
        assert!(!window.is_well_formed());
        assert!(!window.contains(time(12, 0)));
    }

    #[test]
    fn schedule_day_off_by_default() {
        let schedule = WeeklySchedule::new();
        assert!(!schedule.is_working_on(Weekday::Mon));
        assert!(schedule.windows_for(Weekday::Mon).is_empty());
    }

    #[test]
    fn schedule_every_day_with_monday_off() {
        let schedule = WeeklySchedule::every_day(TimeWindow::new(time(10, 0), time(19, 0)))
            .with_day_off(Weekday::Mon);

        assert!(!schedule.is_working_on(Weekday::Mon));
        assert!(schedule.is_working_on(Weekday::Tue));
        assert_eq!(
            schedule.windows_for(Weekday::Sun),
            &[TimeWindow::new(time(10, 0), time(19, 0))]
        );
    }

    #[test]
    fn schedule_split_shift() {
        let schedule = WeeklySchedule::new().with_day(
            Weekday::Sat,
            vec![
                TimeWindow::new(time(9, 0), time(12, 0)),
                TimeWindow::new(time(14, 0), time(18, 0)),
            ],
        );

        assert!(schedule.covers(Weekday::Sat, &TimeWindow::new(time(9, 0), time(10, 0))));
        assert!(!schedule.covers(Weekday::Sat, &TimeWindow::new(time(11, 30), time(14, 30))));
    }

    #[test]
    fn schedule_serde_roundtrip() {
        let schedule = WeeklySchedule::every_day(TimeWindow::new(time(9, 0), time(17, 0)))
            .with_day_off(Weekday::Sun);
        let json = serde_json::to_string(&schedule).expect("serialize");
        let parsed: WeeklySchedule = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(schedule, parsed);
    }
}
