//! The booking commit service.
//!
//! The service re-runs the availability check at commit time (the dialogue
//! may have idled long enough for another booking to consume the slot),
//! assigns staff when the customer had no preference, and hands the insert
//! to the ledger's atomic commit. It never substitutes a different slot: a
//! failed recheck is returned as a conflict for the dialogue to resolve.

use crate::booking::{Booking, BookingRequest, BookingStatus};
use crate::dispatcher::NotificationDispatcher;
use crate::error::CommitError;
use crate::ledger::BookingLedger;
use crate::order::{OrderRequest, ProductOrder};
use bookline_availability::{AvailabilityError, SettingsProvider, slots_for_staff};
use bookline_catalog::{CatalogError, CatalogProvider, ServiceItem};
use bookline_core::{BookingId, CancelToken, TenantId};
use bookline_staffing::{Staff, StaffProvider, StaffingError};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;

fn from_availability(e: AvailabilityError) -> CommitError {
    match e {
        AvailabilityError::InvalidSettings { reason }
        | AvailabilityError::InvalidService { reason } => CommitError::Invalid { reason },
        AvailabilityError::SettingsNotFound { tenant_id } => CommitError::Invalid {
            reason: format!("no booking settings for tenant {tenant_id}"),
        },
        AvailabilityError::StorageFailed { reason } => CommitError::Upstream { reason },
    }
}

fn from_catalog(e: CatalogError) -> CommitError {
    match e {
        CatalogError::ServiceNotFound { id, .. } => {
            CommitError::ServiceUnavailable { service_id: id }
        }
        other => CommitError::Upstream {
            reason: other.to_string(),
        },
    }
}

fn from_staffing(e: StaffingError) -> CommitError {
    CommitError::Upstream {
        reason: e.to_string(),
    }
}

/// Validates drafts against current availability and commits them.
pub struct CommitService {
    ledger: Arc<dyn BookingLedger>,
    catalog: Arc<dyn CatalogProvider>,
    staffing: Arc<dyn StaffProvider>,
    settings: Arc<dyn SettingsProvider>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl CommitService {
    /// Creates a commit service over the given collaborators.
    pub fn new(
        ledger: Arc<dyn BookingLedger>,
        catalog: Arc<dyn CatalogProvider>,
        staffing: Arc<dyn StaffProvider>,
        settings: Arc<dyn SettingsProvider>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            ledger,
            catalog,
            staffing,
            settings,
            dispatcher,
        }
    }

    /// Commits a finalized draft.
    ///
    /// With a named staff member the requested start must still be in their
    /// recomputed availability. With no preference the candidates are every
    /// qualified active staff member in sort order; the first whose
    /// availability holds through the ledger's atomic capacity check gets
    /// the booking.
    pub async fn commit_booking(
        &self,
        request: BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Booking, CommitError> {
        let tenant_id = request.tenant_id;
        let settings = self
            .settings
            .booking_settings(tenant_id)
            .await
            .map_err(from_availability)?;

        let service = self
            .catalog
            .get_service(tenant_id, request.service_id)
            .await
            .map_err(from_catalog)?;
        if !service.active {
            return Err(CommitError::ServiceUnavailable {
                service_id: service.id,
            });
        }

        let named = request.staff_id.is_some();
        let candidates: Vec<Staff> = match request.staff_id {
            Some(staff_id) => {
                let staff = self
                    .staffing
                    .get_staff(tenant_id, staff_id)
                    .await
                    .map_err(from_staffing)?;
                if !staff.active || !staff.can_perform(service.id) {
                    return Err(CommitError::Invalid {
                        reason: format!("staff {staff_id} cannot perform service {}", service.id),
                    });
                }
                vec![staff]
            }
            None => self
                .staffing
                .list_staff_for_service(tenant_id, service.id)
                .await
                .map_err(from_staffing)?,
        };
        if candidates.is_empty() {
            return Err(CommitError::NoEligibleStaff {
                date: request.date,
                start: request.start,
            });
        }

        let leaves = self
            .staffing
            .list_leaves_on(tenant_id, request.date)
            .await
            .map_err(from_staffing)?;

        let (end, wrapped) = request.start.overflowing_add_signed(service.total_duration());
        if wrapped != 0 {
            return Err(CommitError::Invalid {
                reason: format!("booking starting {} runs past midnight", request.start),
            });
        }

        let status = if settings.auto_confirm {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };

        for staff in &candidates {
            let booked: Vec<_> = self
                .ledger
                .find_active_bookings(tenant_id, staff.id, request.date)
                .await?
                .iter()
                .map(Booking::window)
                .collect();
            let slots = slots_for_staff(
                &service,
                staff,
                request.date,
                &settings,
                &leaves,
                &booked,
                now,
            )
            .map_err(from_availability)?;
            if !slots.iter().any(|slot| slot.start == request.start) {
                if named {
                    return Err(CommitError::SlotTaken {
                        staff_id: staff.id,
                        date: request.date,
                        start: request.start,
                    });
                }
                continue;
            }

            let booking = Booking {
                id: BookingId::new(),
                tenant_id,
                customer: request.customer.clone(),
                service_id: service.id,
                staff_id: staff.id,
                date: request.date,
                start: request.start,
                end,
                status,
                cancel_token: CancelToken::new(),
                source: request.source,
                note: request.note.clone(),
                created_at: Utc::now(),
            };

            match self.ledger.commit_booking(booking, staff.capacity).await {
                Ok(booking) => {
                    if let Err(e) = self.dispatcher.booking_created(&booking).await {
                        tracing::warn!(
                            error = %e,
                            booking_id = %booking.id,
                            "booking created notification failed"
                        );
                    }
                    return Ok(booking);
                }
                // Lost the race for this staff member; with no preference
                // the next candidate may still fit.
                Err(CommitError::SlotTaken { .. }) if !named => continue,
                Err(e) => return Err(e),
            }
        }

        Err(CommitError::NoEligibleStaff {
            date: request.date,
            start: request.start,
        })
    }

    /// Cancels the booking carrying the token. Idempotent.
    pub async fn cancel_booking(
        &self,
        tenant_id: TenantId,
        token: CancelToken,
    ) -> Result<Booking, CommitError> {
        let booking = self.ledger.cancel_by_token(tenant_id, token).await?;
        if let Err(e) = self.dispatcher.booking_cancelled(&booking).await {
            tracing::warn!(
                error = %e,
                booking_id = %booking.id,
                "booking cancelled notification failed"
            );
        }
        Ok(booking)
    }

    /// Commits a product purchase. The stock recheck runs inside the
    /// ledger's atomic commit.
    pub async fn commit_order(&self, request: OrderRequest) -> Result<ProductOrder, CommitError> {
        if request.quantity == 0 {
            return Err(CommitError::Invalid {
                reason: "order quantity is zero".to_string(),
            });
        }
        let product = self
            .catalog
            .get_product(request.tenant_id, request.product_id)
            .await
            .map_err(|e| CommitError::Upstream {
                reason: e.to_string(),
            })?;
        if !product.active {
            return Err(CommitError::Invalid {
                reason: format!("product {} is not for sale", product.id),
            });
        }

        let order = self.ledger.commit_order(request).await?;
        if let Err(e) = self.dispatcher.order_created(&order).await {
            tracing::warn!(
                error = %e,
                order_id = %order.id,
                "order created notification failed"
            );
        }
        Ok(order)
    }

    /// Returns the service the request books, for confirmation rendering.
    pub async fn service_for(
        &self,
        tenant_id: TenantId,
        request: &BookingRequest,
    ) -> Result<ServiceItem, CommitError> {
        self.catalog
            .get_service(tenant_id, request.service_id)
            .await
            .map_err(from_catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingSource;
    use crate::dispatcher::{DispatchedEvent, FailingDispatcher, MemoryDispatcher};
    use crate::ledger::MemoryLedger;
    use bookline_availability::{BookingSettings, MemorySettings};
    use bookline_catalog::MemoryCatalog;
    use bookline_core::ChannelUserId;
    use bookline_staffing::{MemoryStaffing, TimeWindow, WeeklySchedule};
    use chrono::{NaiveDate, NaiveTime};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn target_date() -> NaiveDate {
        date(2025, 6, 10)
    }

    fn now() -> NaiveDateTime {
        date(2025, 6, 8).and_time(time(8, 0))
    }

    struct Fixture {
        service: CommitService,
        ledger: MemoryLedger,
        staffing: MemoryStaffing,
        settings: MemorySettings,
        dispatcher: MemoryDispatcher,
        tenant_id: TenantId,
        cut: ServiceItem,
    }

    fn fixture() -> Fixture {
        let tenant_id = TenantId::new();
        let catalog = MemoryCatalog::new();
        let cut = ServiceItem::new(tenant_id, "Cut", 60, 4500);
        catalog.add_service(cut.clone());

        let staffing = MemoryStaffing::new();
        let settings = MemorySettings::new();
        settings.put(tenant_id, BookingSettings::default());

        let ledger = MemoryLedger::new();
        let dispatcher = MemoryDispatcher::new();
        let service = CommitService::new(
            Arc::new(ledger.clone()),
            Arc::new(catalog.clone()),
            Arc::new(staffing.clone()),
            Arc::new(settings.clone()),
            Arc::new(dispatcher.clone()),
        );

        Fixture {
            service,
            ledger,
            staffing,
            settings,
            dispatcher,
            tenant_id,
            cut,
        }
    }

    fn full_time(fix: &Fixture, name: &str, sort_order: i32) -> Staff {
        Staff::new(fix.tenant_id, name)
            .with_services(vec![fix.cut.id])
            .with_schedule(WeeklySchedule::every_day(TimeWindow::new(
                time(9, 0),
                time(18, 0),
            )))
            .with_sort_order(sort_order)
    }

    fn request(fix: &Fixture, staff_id: Option<bookline_core::StaffId>) -> BookingRequest {
        BookingRequest {
            tenant_id: fix.tenant_id,
            customer: ChannelUserId::new("Uabc"),
            service_id: fix.cut.id,
            staff_id,
            date: target_date(),
            start: time(10, 0),
            note: None,
            source: BookingSource::ChatBot,
        }
    }

    #[tokio::test]
    async fn named_staff_commit_succeeds_and_notifies() {
        let fix = fixture();
        let mika = full_time(&fix, "Mika", 1);
        let mika_id = mika.id;
        fix.staffing.add_staff(mika);

        let booking = fix
            .service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await
            .expect("commit");

        assert_eq!(booking.staff_id, mika_id);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.end, time(11, 0));
        assert_eq!(
            fix.dispatcher.events(),
            vec![DispatchedEvent::BookingCreated(booking)]
        );
    }

    #[tokio::test]
    async fn no_preference_assigns_first_by_sort_order_with_capacity() {
        let fix = fixture();
        let mika = full_time(&fix, "Mika", 1);
        let ren = full_time(&fix, "Ren", 2);
        let mika_id = mika.id;
        let ren_id = ren.id;
        fix.staffing.add_staff(mika);
        fix.staffing.add_staff(ren);

        // Mika already has 10:00; the second no-preference commit must fall
        // through to Ren.
        let first = fix
            .service
            .commit_booking(request(&fix, None), now())
            .await
            .expect("commit");
        assert_eq!(first.staff_id, mika_id);

        let second = fix
            .service
            .commit_booking(request(&fix, None), now())
            .await
            .expect("commit");
        assert_eq!(second.staff_id, ren_id);
    }

    #[tokio::test]
    async fn named_staff_conflict_is_slot_taken() {
        let fix = fixture();
        let mika = full_time(&fix, "Mika", 1);
        let mika_id = mika.id;
        fix.staffing.add_staff(mika);

        fix.service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await
            .expect("commit");

        let result = fix
            .service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await;
        assert!(matches!(result, Err(CommitError::SlotTaken { .. })));
    }

    #[tokio::test]
    async fn all_candidates_exhausted_is_a_conflict() {
        let fix = fixture();
        let mika = full_time(&fix, "Mika", 1);
        let mika_id = mika.id;
        fix.staffing.add_staff(mika);

        fix.service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await
            .expect("commit");

        let result = fix.service.commit_booking(request(&fix, None), now()).await;
        match result {
            Err(e) => assert!(e.is_conflict()),
            Ok(_) => panic!("expected conflict"),
        }
    }

    #[tokio::test]
    async fn zero_staff_is_no_eligible_staff() {
        let fix = fixture();
        let result = fix.service.commit_booking(request(&fix, None), now()).await;
        assert!(matches!(result, Err(CommitError::NoEligibleStaff { .. })));
    }

    #[tokio::test]
    async fn auto_confirm_policy_sets_confirmed() {
        let fix = fixture();
        fix.settings.put(
            fix.tenant_id,
            BookingSettings {
                auto_confirm: true,
                ..BookingSettings::default()
            },
        );
        let mika = full_time(&fix, "Mika", 1);
        let mika_id = mika.id;
        fix.staffing.add_staff(mika);

        let booking = fix
            .service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await
            .expect("commit");
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn dispatch_failure_never_fails_the_commit() {
        let fix = fixture();
        let mika = full_time(&fix, "Mika", 1);
        let mika_id = mika.id;
        fix.staffing.add_staff(mika.clone());

        let catalog = MemoryCatalog::new();
        catalog.add_service(fix.cut.clone());
        let service = CommitService::new(
            Arc::new(fix.ledger.clone()),
            Arc::new(catalog),
            Arc::new(fix.staffing.clone()),
            Arc::new(fix.settings.clone()),
            Arc::new(FailingDispatcher),
        );

        let booking = service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await
            .expect("commit despite failing dispatcher");
        assert_eq!(booking.staff_id, mika_id);
    }

    #[tokio::test]
    async fn cancel_by_token_notifies_and_frees() {
        let fix = fixture();
        let mika = full_time(&fix, "Mika", 1);
        let mika_id = mika.id;
        fix.staffing.add_staff(mika);

        let booking = fix
            .service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await
            .expect("commit");

        let cancelled = fix
            .service
            .cancel_booking(fix.tenant_id, booking.cancel_token)
            .await
            .expect("cancel");
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(
            fix.dispatcher
                .events()
                .iter()
                .any(|e| matches!(e, DispatchedEvent::BookingCancelled(_)))
        );

        // The freed slot can be committed again.
        fix.service
            .commit_booking(request(&fix, Some(mika_id)), now())
            .await
            .expect("recommit");
    }

    #[tokio::test]
    async fn order_commit_checks_product_and_stock() {
        let fix = fixture();
        let catalog = MemoryCatalog::new();
        let product = bookline_catalog::Product::new(fix.tenant_id, "Shampoo", 1800, 5);
        catalog.add_product(product.clone());
        catalog.add_service(fix.cut.clone());
        fix.ledger.set_stock(fix.tenant_id, product.id, 5);

        let service = CommitService::new(
            Arc::new(fix.ledger.clone()),
            Arc::new(catalog),
            Arc::new(fix.staffing.clone()),
            Arc::new(fix.settings.clone()),
            Arc::new(fix.dispatcher.clone()),
        );

        let order = service
            .commit_order(OrderRequest {
                tenant_id: fix.tenant_id,
                customer: ChannelUserId::new("Uabc"),
                product_id: product.id,
                quantity: 2,
                unit_price: product.price,
            })
            .await
            .expect("order");
        assert_eq!(order.total(), 3600);
        assert!(
            fix.dispatcher
                .events()
                .iter()
                .any(|e| matches!(e, DispatchedEvent::OrderCreated(_)))
        );

        let oversell = service
            .commit_order(OrderRequest {
                tenant_id: fix.tenant_id,
                customer: ChannelUserId::new("Uabc"),
                product_id: product.id,
                quantity: 4,
                unit_price: product.price,
            })
            .await;
        assert!(matches!(oversell, Err(CommitError::OutOfStock { .. })));
    }
}
