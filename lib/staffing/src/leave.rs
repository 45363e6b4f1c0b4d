//! Staff leave records.
//!
//! A leave removes time from a staff member's schedule on one date, either
//! the whole day or a window within it.

use crate::schedule::TimeWindow;
use bookline_core::StaffId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How much of the day a leave blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LeaveKind {
    /// The staff member is away all day.
    FullDay,
    /// The staff member is away during one window.
    Partial { window: TimeWindow },
}

/// A leave taken by a staff member on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    /// The staff member on leave.
    pub staff_id: StaffId,
    /// The date of the leave.
    pub date: NaiveDate,
    /// Full day or a window within it.
    pub kind: LeaveKind,
}

impl Leave {
    /// Creates a full-day leave.
    #[must_use]
    pub const fn full_day(staff_id: StaffId, date: NaiveDate) -> Self {
        Self {
            staff_id,
            date,
            kind: LeaveKind::FullDay,
        }
    }

    /// Creates a partial leave blocking one window.
    #[must_use]
    pub const fn partial(staff_id: StaffId, date: NaiveDate, window: TimeWindow) -> Self {
        Self {
            staff_id,
            date,
            kind: LeaveKind::Partial { window },
        }
    }

    /// Returns true if this leave blocks any part of `window` on `date`.
    #[must_use]
    pub fn blocks(&self, date: NaiveDate, window: &TimeWindow) -> bool {
        if self.date != date {
            return false;
        }
        match &self.kind {
            LeaveKind::FullDay => true,
            LeaveKind::Partial { window: blocked } => blocked.overlaps(window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn full_day_blocks_everything_on_its_date() {
        let leave = Leave::full_day(StaffId::new(), date(2025, 6, 10));
        let slot = TimeWindow::new(time(10, 0), time(11, 0));

        assert!(leave.blocks(date(2025, 6, 10), &slot));
        assert!(!leave.blocks(date(2025, 6, 11), &slot));
    }

    #[test]
    fn partial_leave_blocks_only_overlap() {
        let leave = Leave::partial(
            StaffId::new(),
            date(2025, 6, 10),
            TimeWindow::new(time(13, 0), time(15, 0)),
        );

        assert!(leave.blocks(date(2025, 6, 10), &TimeWindow::new(time(12, 30), time(13, 30))));
        assert!(leave.blocks(date(2025, 6, 10), &TimeWindow::new(time(14, 0), time(15, 0))));
        assert!(!leave.blocks(date(2025, 6, 10), &TimeWindow::new(time(15, 0), time(16, 0))));
        assert!(!leave.blocks(date(2025, 6, 10), &TimeWindow::new(time(12, 0), time(13, 0))));
    }
}
