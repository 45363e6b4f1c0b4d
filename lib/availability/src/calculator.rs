//! The slot calculator.
//!
//! Pure functions from schedule inputs to bookable slots. Every input the
//! calculation depends on — settings, schedules, leaves, existing bookings,
//! and "now" — is passed in, so identical inputs always yield identical
//! ordered results and the calculator can run on any number of tasks
//! concurrently.
//!
//! A slot is the full interval a booking would occupy: service duration
//! plus turnover buffer. The menu shows start times; the interval is what
//! overlap and capacity checks operate on.

use crate::error::AvailabilityError;
use crate::settings::BookingSettings;
use bookline_catalog::ServiceItem;
use bookline_staffing::{Leave, Staff, TimeWindow};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// One staff member's day: their roster entry, leaves on the date, and the
/// intervals already occupied by active bookings.
#[derive(Debug, Clone, Copy)]
pub struct StaffDay<'a> {
    /// The staff member.
    pub staff: &'a Staff,
    /// Leaves on the target date. Entries for other staff are ignored.
    pub leaves: &'a [Leave],
    /// Occupied intervals from this staff member's active bookings on the
    /// target date, buffer included.
    pub booked: &'a [TimeWindow],
}

/// Candidate slots on the tenant grid for one date, before any staff
/// constraints: bounded by open/close, clear of the tenant break, and in
/// the future when the date is today.
fn day_grid(
    service: &ServiceItem,
    date: NaiveDate,
    settings: &BookingSettings,
    now: NaiveDateTime,
) -> Result<Vec<TimeWindow>, AvailabilityError> {
    settings.validate()?;
    if service.duration_minutes == 0 {
        return Err(AvailabilityError::InvalidService {
            reason: format!("service '{}' has zero duration", service.name),
        });
    }

    let today = now.date();
    let horizon = today + Duration::days(i64::from(settings.max_advance_days));
    if date < today || date > horizon || settings.is_closed_on(date.weekday()) {
        return Ok(Vec::new());
    }

    let total = service.total_duration();
    let step = Duration::minutes(i64::from(settings.slot_minutes));
    let mut slots = Vec::new();
    let mut start = settings.open;

    while start < settings.close {
        // NaiveTime arithmetic wraps at midnight; a wrapped end means the
        // slot runs past the end of the day.
        let (end, wrapped) = start.overflowing_add_signed(total);
        if wrapped == 0 && end <= settings.close {
            let slot = TimeWindow::new(start, end);
            let clear_of_break = settings
                .break_window
                .as_ref()
                .is_none_or(|b| !b.overlaps(&slot));
            let in_future = date != today || start > now.time();
            if clear_of_break && in_future {
                slots.push(slot);
            }
        }

        let (next, wrapped_step) = start.overflowing_add_signed(step);
        if wrapped_step != 0 {
            break;
        }
        start = next;
    }

    Ok(slots)
}

fn overlapping_bookings(booked: &[TimeWindow], slot: &TimeWindow) -> u32 {
    booked.iter().filter(|b| b.overlaps(slot)).count() as u32
}

/// Computes the bookable slots for one named staff member on one date.
///
/// Returns slots in chronological order; an empty result means no
/// availability and is not an error.
pub fn slots_for_staff(
    service: &ServiceItem,
    staff: &Staff,
    date: NaiveDate,
    settings: &BookingSettings,
    leaves: &[Leave],
    booked: &[TimeWindow],
    now: NaiveDateTime,
) -> Result<Vec<TimeWindow>, AvailabilityError> {
    let weekday = date.weekday();
    let slots = day_grid(service, date, settings, now)?
        .into_iter()
        .filter(|slot| staff.schedule.covers(weekday, slot))
        .filter(|slot| {
            staff
                .break_window
                .as_ref()
                .is_none_or(|b| !b.overlaps(slot))
        })
        .filter(|slot| {
            !leaves
                .iter()
                .any(|leave| leave.staff_id == staff.id && leave.blocks(date, slot))
        })
        .filter(|slot| overlapping_bookings(booked, slot) < staff.capacity)
        .collect();
    Ok(slots)
}

/// Computes the slots bookable with no staff preference: the union of every
/// qualified, active staff member's slots.
///
/// Staff assignment does not happen here; the commit picks the first
/// qualified staff by sort order with capacity remaining.
pub fn slots_for_any_staff(
    service: &ServiceItem,
    date: NaiveDate,
    settings: &BookingSettings,
    staff_days: &[StaffDay<'_>],
    now: NaiveDateTime,
) -> Result<Vec<TimeWindow>, AvailabilityError> {
    settings.validate()?;

    let mut union: Vec<TimeWindow> = Vec::new();
    for day in staff_days {
        if !day.staff.active || !day.staff.can_perform(service.id) {
            continue;
        }
        let slots = slots_for_staff(
            service,
            day.staff,
            date,
            settings,
            day.leaves,
            day.booked,
            now,
        )?;
        union.extend(slots);
    }

    union.sort_by_key(|slot| slot.start);
    union.dedup();
    Ok(union)
}

/// Lists the dates worth offering in the date menu: today through the
/// advance horizon, skipping closed weekdays, capped at `limit`.
pub fn upcoming_dates(
    settings: &BookingSettings,
    today: NaiveDate,
    limit: usize,
) -> Result<Vec<NaiveDate>, AvailabilityError> {
    settings.validate()?;

    let dates = (0..=i64::from(settings.max_advance_days))
        .map(|offset| today + Duration::days(offset))
        .filter(|date| !settings.is_closed_on(date.weekday()))
        .take(limit)
        .collect();
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_core::{ServiceId, TenantId};
    use bookline_staffing::WeeklySchedule;
    use chrono::{NaiveTime, Weekday};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    /// A Tuesday well before any test horizon concerns.
    fn target_date() -> NaiveDate {
        date(2025, 6, 10)
    }

    /// "Now" two days before the target date.
    fn now() -> NaiveDateTime {
        date(2025, 6, 8).and_time(time(8, 0))
    }

    fn sixty_minute_service() -> ServiceItem {
        ServiceItem::new(TenantId::new(), "Cut", 60, 4500)
    }

    fn full_time_staff(service_id: ServiceId) -> Staff {
        Staff::new(TenantId::new(), "Mika")
            .with_services(vec![service_id])
            .with_schedule(WeeklySchedule::every_day(TimeWindow::new(
                time(9, 0),
                time(18, 0),
            )))
    }

    fn starts(slots: &[TimeWindow]) -> Vec<NaiveTime> {
        slots.iter().map(|s| s.start).collect()
    }

    #[test]
    fn existing_booking_excludes_overlapping_candidates() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();
        let booked = [TimeWindow::new(time(10, 0), time(11, 0))];

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &booked,
            now(),
        )
        .expect("slots");
        let starts = starts(&slots);

        assert!(starts.contains(&time(9, 0)));
        assert!(starts.contains(&time(11, 0)));
        assert!(!starts.contains(&time(9, 30)));
        assert!(!starts.contains(&time(10, 0)));
        assert!(!starts.contains(&time(10, 30)));
    }

    #[test]
    fn no_slot_ends_after_close() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");

        assert!(slots.iter().all(|s| s.end <= settings.close));
        assert_eq!(slots.last().map(|s| s.start), Some(time(17, 0)));
    }

    #[test]
    fn buffer_extends_the_occupied_interval() {
        let service = ServiceItem::new(TenantId::new(), "Color", 60, 8000).with_buffer(15);
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");

        // 17:00 + 75 minutes would end 18:15, past close.
        assert_eq!(slots.last().map(|s| s.start), Some(time(16, 30)));
        assert_eq!(slots.last().map(|s| s.end), Some(time(17, 45)));
    }

    #[test]
    fn partial_leave_blocks_overlapping_slots() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();
        let leaves = [Leave::partial(
            staff.id,
            target_date(),
            TimeWindow::new(time(13, 0), time(15, 0)),
        )];

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &leaves,
            &[],
            now(),
        )
        .expect("slots");
        let starts = starts(&slots);

        assert!(!starts.contains(&time(13, 0)));
        assert!(!starts.contains(&time(13, 30)));
        assert!(!starts.contains(&time(14, 0)));
        // 12:30-13:30 crosses the leave boundary.
        assert!(!starts.contains(&time(12, 30)));
        // 15:00-16:00 starts exactly as the leave ends.
        assert!(starts.contains(&time(15, 0)));
    }

    #[test]
    fn full_day_leave_empties_the_date() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();
        let leaves = [Leave::full_day(staff.id, target_date())];

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &leaves,
            &[],
            now(),
        )
        .expect("slots");
        assert!(slots.is_empty());
    }

    #[test]
    fn other_staff_leave_is_ignored() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();
        let leaves = [Leave::full_day(bookline_core::StaffId::new(), target_date())];

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &leaves,
            &[],
            now(),
        )
        .expect("slots");
        assert!(!slots.is_empty());
    }

    #[test]
    fn tenant_break_window_subtracted() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings {
            break_window: Some(TimeWindow::new(time(12, 0), time(13, 0))),
            ..BookingSettings::default()
        };

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");
        let starts = starts(&slots);

        // 11:30-12:30 and 12:30-13:30 overlap the break.
        assert!(!starts.contains(&time(11, 30)));
        assert!(!starts.contains(&time(12, 0)));
        assert!(!starts.contains(&time(12, 30)));
        assert!(starts.contains(&time(11, 0)));
        assert!(starts.contains(&time(13, 0)));
    }

    #[test]
    fn staff_break_subtracted() {
        let service = sixty_minute_service();
        let staff =
            full_time_staff(service.id).with_break(TimeWindow::new(time(12, 0), time(13, 0)));
        let settings = BookingSettings::default();

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");
        let starts = starts(&slots);

        assert!(!starts.contains(&time(12, 0)));
        assert!(!starts.contains(&time(11, 30)));
        assert!(starts.contains(&time(13, 0)));
    }

    #[test]
    fn staff_working_window_intersected() {
        let service = sixty_minute_service();
        // Staff starts at 11:00 even though the shop opens at 9:00.
        let staff = Staff::new(TenantId::new(), "Ren")
            .with_services(vec![service.id])
            .with_schedule(WeeklySchedule::every_day(TimeWindow::new(
                time(11, 0),
                time(16, 0),
            )));
        let settings = BookingSettings::default();

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");
        let starts = starts(&slots);

        assert_eq!(starts.first(), Some(&time(11, 0)));
        // 15:30-16:30 runs past the staff window.
        assert_eq!(starts.last(), Some(&time(15, 0)));
    }

    #[test]
    fn capacity_two_allows_one_overlap() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id).with_capacity(2);
        let settings = BookingSettings::default();
        let booked = [TimeWindow::new(time(10, 0), time(11, 0))];

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &booked,
            now(),
        )
        .expect("slots");
        let starts_once = starts(&slots);
        assert!(starts_once.contains(&time(10, 0)));

        let booked_twice = [
            TimeWindow::new(time(10, 0), time(11, 0)),
            TimeWindow::new(time(10, 0), time(11, 0)),
        ];
        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &booked_twice,
            now(),
        )
        .expect("slots");
        let starts_twice = starts(&slots);
        assert!(!starts_twice.contains(&time(10, 0)));
    }

    #[test]
    fn same_day_past_times_excluded() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();
        let midday = target_date().and_time(time(12, 15));

        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            midday,
        )
        .expect("slots");
        let starts = starts(&slots);

        assert_eq!(starts.first(), Some(&time(12, 30)));
        assert!(!starts.contains(&time(12, 0)));
    }

    #[test]
    fn dates_outside_horizon_yield_empty() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings {
            max_advance_days: 7,
            ..BookingSettings::default()
        };

        let past = slots_for_staff(
            &service,
            &staff,
            date(2025, 6, 7),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");
        assert!(past.is_empty());

        let beyond = slots_for_staff(
            &service,
            &staff,
            date(2025, 6, 16),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");
        assert!(beyond.is_empty());
    }

    #[test]
    fn closed_weekday_yields_empty() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings {
            closed_weekdays: vec![Weekday::Tue],
            ..BookingSettings::default()
        };

        // 2025-06-10 is a Tuesday.
        let slots = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            now(),
        )
        .expect("slots");
        assert!(slots.is_empty());
    }

    #[test]
    fn identical_inputs_yield_identical_results() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings::default();
        let booked = [TimeWindow::new(time(14, 0), time(15, 0))];

        let first = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &booked,
            now(),
        )
        .expect("slots");
        let second = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &booked,
            now(),
        )
        .expect("slots");
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_settings_surface_as_error() {
        let service = sixty_minute_service();
        let staff = full_time_staff(service.id);
        let settings = BookingSettings {
            open: time(18, 0),
            close: time(9, 0),
            ..BookingSettings::default()
        };

        let result = slots_for_staff(
            &service,
            &staff,
            target_date(),
            &settings,
            &[],
            &[],
            now(),
        );
        assert!(matches!(
            result,
            Err(AvailabilityError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn any_staff_offers_union_of_availability() {
        let service = sixty_minute_service();
        let busy = full_time_staff(service.id);
        let free = full_time_staff(service.id);
        let settings = BookingSettings::default();
        let busy_booked = [TimeWindow::new(time(10, 0), time(11, 0))];

        let staff_days = [
            StaffDay {
                staff: &busy,
                leaves: &[],
                booked: &busy_booked,
            },
            StaffDay {
                staff: &free,
                leaves: &[],
                booked: &[],
            },
        ];

        let slots = slots_for_any_staff(&service, target_date(), &settings, &staff_days, now())
            .expect("slots");
        let starts = starts(&slots);

        // One of the two can still take 10:00.
        assert!(starts.contains(&time(10, 0)));
        // No duplicates from the union.
        let mut deduped = starts.clone();
        deduped.dedup();
        assert_eq!(starts, deduped);
    }

    #[test]
    fn any_staff_skips_unqualified_members() {
        let service = sixty_minute_service();
        let unqualified = Staff::new(TenantId::new(), "Sora").with_schedule(
            WeeklySchedule::every_day(TimeWindow::new(time(9, 0), time(18, 0))),
        );
        let settings = BookingSettings::default();

        let staff_days = [StaffDay {
            staff: &unqualified,
            leaves: &[],
            booked: &[],
        }];

        let slots = slots_for_any_staff(&service, target_date(), &settings, &staff_days, now())
            .expect("slots");
        assert!(slots.is_empty());
    }

    #[test]
    fn upcoming_dates_skip_closed_weekdays() {
        let settings = BookingSettings {
            closed_weekdays: vec![Weekday::Wed],
            max_advance_days: 6,
            ..BookingSettings::default()
        };
        // 2025-06-09 is a Monday.
        let dates = upcoming_dates(&settings, date(2025, 6, 9), 10).expect("dates");

        assert_eq!(dates.first(), Some(&date(2025, 6, 9)));
        assert!(!dates.contains(&date(2025, 6, 11)));
        assert_eq!(dates.len(), 6);
    }

    #[test]
    fn upcoming_dates_respect_limit() {
        let settings = BookingSettings::default();
        let dates = upcoming_dates(&settings, date(2025, 6, 9), 10).expect("dates");
        assert_eq!(dates.len(), 10);
    }
}
