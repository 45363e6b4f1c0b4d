//! The booking ledger contract.
//!
//! The ledger owns every persisted booking and order. Its commit operations
//! are atomic: the capacity (or stock) recheck and the insert happen under
//! one boundary, so two concurrent commits for the same slot cannot both
//! succeed when only one fits. [`MemoryLedger`] serializes commits on one
//! mutex; the Postgres implementation uses a transaction-scoped advisory
//! lock per (tenant, staff, date).

use crate::booking::{Booking, BookingStatus};
use crate::error::CommitError;
use crate::order::{OrderRequest, OrderStatus, ProductOrder};
use async_trait::async_trait;
use bookline_core::{BookingId, CancelToken, ChannelUserId, OrderId, ProductId, StaffId, TenantId};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Persistent storage for bookings and orders.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// Lists active bookings for one staff member on one date, in
    /// chronological order.
    async fn find_active_bookings(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, CommitError>;

    /// Atomically rechecks capacity for the booking's staff and interval,
    /// then inserts. Fails with [`CommitError::SlotTaken`] and writes
    /// nothing when `capacity` active bookings already overlap the interval.
    async fn commit_booking(
        &self,
        booking: Booking,
        capacity: u32,
    ) -> Result<Booking, CommitError>;

    /// Lists a customer's active bookings on or after `from`, in
    /// chronological order.
    async fn find_upcoming_for_customer(
        &self,
        tenant_id: TenantId,
        customer: &ChannelUserId,
        from: NaiveDate,
    ) -> Result<Vec<Booking>, CommitError>;

    /// Gets one booking by ID.
    async fn find_booking(
        &self,
        tenant_id: TenantId,
        id: BookingId,
    ) -> Result<Option<Booking>, CommitError>;

    /// Cancels the booking carrying the token. Idempotent: cancelling an
    /// already-cancelled booking returns it unchanged.
    async fn cancel_by_token(
        &self,
        tenant_id: TenantId,
        token: CancelToken,
    ) -> Result<Booking, CommitError>;

    /// Atomically rechecks stock for the product, decrements it, and
    /// inserts the order. Fails with [`CommitError::OutOfStock`] and writes
    /// nothing when stock is insufficient.
    async fn commit_order(&self, request: OrderRequest) -> Result<ProductOrder, CommitError>;
}

#[derive(Debug, Default)]
struct LedgerState {
    bookings: Vec<Booking>,
    orders: Vec<ProductOrder>,
    stock: HashMap<(TenantId, ProductId), u32>,
}

/// In-memory ledger for tests and local development.
///
/// All commits run under one mutex, which trivially satisfies the atomicity
/// contract.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds stock for a product. Production reads stock from the product
    /// catalog table; the memory ledger keeps its own counts.
    pub fn set_stock(&self, tenant_id: TenantId, product_id: ProductId, quantity: u32) {
        self.state
            .lock()
            .unwrap()
            .stock
            .insert((tenant_id, product_id), quantity);
    }

    /// Returns the remaining stock for a product, if seeded.
    #[must_use]
    pub fn stock(&self, tenant_id: TenantId, product_id: ProductId) -> Option<u32> {
        self.state
            .lock()
            .unwrap()
            .stock
            .get(&(tenant_id, product_id))
            .copied()
    }
}

impl Clone for MemoryLedger {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl BookingLedger for MemoryLedger {
    async fn find_active_bookings(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, CommitError> {
        let state = self.state.lock().unwrap();
        let mut bookings: Vec<_> = state
            .bookings
            .iter()
            .filter(|b| {
                b.tenant_id == tenant_id
                    && b.staff_id == staff_id
                    && b.date == date
                    && b.is_active()
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }

    async fn commit_booking(
        &self,
        booking: Booking,
        capacity: u32,
    ) -> Result<Booking, CommitError> {
        let mut state = self.state.lock().unwrap();

        let window = booking.window();
        let overlapping = state
            .bookings
            .iter()
            .filter(|b| {
                b.tenant_id == booking.tenant_id
                    && b.staff_id == booking.staff_id
                    && b.date == booking.date
                    && b.is_active()
                    && b.window().overlaps(&window)
            })
            .count() as u32;

        if overlapping >= capacity {
            return Err(CommitError::SlotTaken {
                staff_id: booking.staff_id,
                date: booking.date,
                start: booking.start,
            });
        }

        state.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn find_upcoming_for_customer(
        &self,
        tenant_id: TenantId,
        customer: &ChannelUserId,
        from: NaiveDate,
    ) -> Result<Vec<Booking>, CommitError> {
        let state = self.state.lock().unwrap();
        let mut bookings: Vec<_> = state
            .bookings
            .iter()
            .filter(|b| {
                b.tenant_id == tenant_id
                    && &b.customer == customer
                    && b.date >= from
                    && b.is_active()
            })
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.date, b.start));
        Ok(bookings)
    }

    async fn find_booking(
        &self,
        tenant_id: TenantId,
        id: BookingId,
    ) -> Result<Option<Booking>, CommitError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .bookings
            .iter()
            .find(|b| b.tenant_id == tenant_id && b.id == id)
            .cloned())
    }

    async fn cancel_by_token(
        &self,
        tenant_id: TenantId,
        token: CancelToken,
    ) -> Result<Booking, CommitError> {
        let mut state = self.state.lock().unwrap();
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.tenant_id == tenant_id && b.cancel_token == token)
            .ok_or(CommitError::BookingNotFound { token })?;

        if booking.status != BookingStatus::Cancelled {
            booking.status = BookingStatus::Cancelled;
        }
        Ok(booking.clone())
    }

    async fn commit_order(&self, request: OrderRequest) -> Result<ProductOrder, CommitError> {
        if request.quantity == 0 {
            return Err(CommitError::Invalid {
                reason: "order quantity is zero".to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        let key = (request.tenant_id, request.product_id);
        let available = state.stock.get(&key).copied().unwrap_or(0);
        if available < request.quantity {
            return Err(CommitError::OutOfStock {
                product_id: request.product_id,
                requested: request.quantity,
            });
        }
        state.stock.insert(key, available - request.quantity);

        let order = ProductOrder {
            id: OrderId::new(),
            tenant_id: request.tenant_id,
            customer: request.customer,
            product_id: request.product_id,
            quantity: request.quantity,
            unit_price: request.unit_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        state.orders.push(order.clone());
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingSource;
    use bookline_core::ServiceId;
    use chrono::NaiveTime;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn booking_at(
        tenant_id: TenantId,
        staff_id: StaffId,
        on: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Booking {
        Booking {
            id: BookingId::new(),
            tenant_id,
            customer: ChannelUserId::new("Uabc"),
            service_id: ServiceId::new(),
            staff_id,
            date: on,
            start,
            end,
            status: BookingStatus::Pending,
            cancel_token: CancelToken::new(),
            source: BookingSource::ChatBot,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn commit_inserts_when_capacity_remains() {
        let ledger = MemoryLedger::new();
        let tenant_id = TenantId::new();
        let staff_id = StaffId::new();
        let on = date(2025, 6, 10);

        let booking = booking_at(tenant_id, staff_id, on, time(10, 0), time(11, 0));
        ledger.commit_booking(booking, 1).await.expect("commit");

        let active = ledger
            .find_active_bookings(tenant_id, staff_id, on)
            .await
            .expect("find");
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_commit_at_capacity_is_refused() {
        let ledger = MemoryLedger::new();
        let tenant_id = TenantId::new();
        let staff_id = StaffId::new();
        let on = date(2025, 6, 10);

        let first = booking_at(tenant_id, staff_id, on, time(10, 0), time(11, 0));
        ledger.commit_booking(first, 1).await.expect("commit");

        // 10:30-11:30 overlaps 10:00-11:00.
        let second = booking_at(tenant_id, staff_id, on, time(10, 30), time(11, 30));
        let result = ledger.commit_booking(second, 1).await;
        assert!(matches!(result, Err(CommitError::SlotTaken { .. })));

        // Touching slots do not overlap.
        let third = booking_at(tenant_id, staff_id, on, time(11, 0), time(12, 0));
        ledger.commit_booking(third, 1).await.expect("commit");
    }

    #[tokio::test]
    async fn concurrent_capacity_one_commits_yield_one_success() {
        let ledger = MemoryLedger::new();
        let tenant_id = TenantId::new();
        let staff_id = StaffId::new();
        let on = date(2025, 6, 10);

        let a = {
            let ledger = ledger.clone();
            let booking = booking_at(tenant_id, staff_id, on, time(10, 0), time(11, 0));
            tokio::spawn(async move { ledger.commit_booking(booking, 1).await })
        };
        let b = {
            let ledger = ledger.clone();
            let booking = booking_at(tenant_id, staff_id, on, time(10, 0), time(11, 0));
            tokio::spawn(async move { ledger.commit_booking(booking, 1).await })
        };

        let results = [a.await.expect("task"), b.await.expect("task")];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CommitError::SlotTaken { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn cancelled_booking_frees_the_slot() {
        let ledger = MemoryLedger::new();
        let tenant_id = TenantId::new();
        let staff_id = StaffId::new();
        let on = date(2025, 6, 10);

        let booking = booking_at(tenant_id, staff_id, on, time(10, 0), time(11, 0));
        let token = booking.cancel_token;
        ledger.commit_booking(booking, 1).await.expect("commit");

        let cancelled = ledger
            .cancel_by_token(tenant_id, token)
            .await
            .expect("cancel");
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        // Cancelling again is idempotent.
        let again = ledger
            .cancel_by_token(tenant_id, token)
            .await
            .expect("cancel");
        assert_eq!(again.status, BookingStatus::Cancelled);

        // The slot is available again.
        let retry = booking_at(tenant_id, staff_id, on, time(10, 0), time(11, 0));
        ledger.commit_booking(retry, 1).await.expect("commit");
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let ledger = MemoryLedger::new();
        let result = ledger
            .cancel_by_token(TenantId::new(), CancelToken::new())
            .await;
        assert!(matches!(result, Err(CommitError::BookingNotFound { .. })));
    }

    #[tokio::test]
    async fn upcoming_bookings_sorted_and_scoped() {
        let ledger = MemoryLedger::new();
        let tenant_id = TenantId::new();
        let staff_id = StaffId::new();
        let customer = ChannelUserId::new("Uabc");

        let later = booking_at(tenant_id, staff_id, date(2025, 6, 12), time(9, 0), time(10, 0));
        let sooner = booking_at(tenant_id, staff_id, date(2025, 6, 10), time(14, 0), time(15, 0));
        let past = booking_at(tenant_id, staff_id, date(2025, 6, 1), time(9, 0), time(10, 0));
        ledger.commit_booking(later, 10).await.expect("commit");
        ledger.commit_booking(sooner, 10).await.expect("commit");
        ledger.commit_booking(past, 10).await.expect("commit");

        let upcoming = ledger
            .find_upcoming_for_customer(tenant_id, &customer, date(2025, 6, 9))
            .await
            .expect("find");
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].date, date(2025, 6, 10));
        assert_eq!(upcoming[1].date, date(2025, 6, 12));
    }

    #[tokio::test]
    async fn order_commit_decrements_stock() {
        let ledger = MemoryLedger::new();
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        ledger.set_stock(tenant_id, product_id, 5);

        let order = ledger
            .commit_order(OrderRequest {
                tenant_id,
                customer: ChannelUserId::new("Uabc"),
                product_id,
                quantity: 2,
                unit_price: 1200,
            })
            .await
            .expect("commit");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(ledger.stock(tenant_id, product_id), Some(3));
    }

    #[tokio::test]
    async fn insufficient_stock_refuses_order() {
        let ledger = MemoryLedger::new();
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        ledger.set_stock(tenant_id, product_id, 1);

        let result = ledger
            .commit_order(OrderRequest {
                tenant_id,
                customer: ChannelUserId::new("Uabc"),
                product_id,
                quantity: 2,
                unit_price: 1200,
            })
            .await;
        assert!(matches!(result, Err(CommitError::OutOfStock { .. })));
        // No partial write.
        assert_eq!(ledger.stock(tenant_id, product_id), Some(1));
    }
}
