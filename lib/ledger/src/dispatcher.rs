//! Notification dispatch seam.
//!
//! Dispatch is fire-and-forget: the commit service logs failures and never
//! lets them fail or block a commit. Production publishes to NATS; the
//! memory dispatcher records events for tests.

use crate::booking::Booking;
use crate::order::ProductOrder;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Error from delivering a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    /// Why delivery failed.
    pub reason: String,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification dispatch failed: {}", self.reason)
    }
}

impl std::error::Error for DispatchError {}

/// Outbound notifications about ledger events.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// A booking was committed.
    async fn booking_created(&self, booking: &Booking) -> Result<(), DispatchError>;

    /// A booking was cancelled.
    async fn booking_cancelled(&self, booking: &Booking) -> Result<(), DispatchError>;

    /// An order was committed.
    async fn order_created(&self, order: &ProductOrder) -> Result<(), DispatchError>;
}

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchedEvent {
    /// `booking_created` was fired.
    BookingCreated(Booking),
    /// `booking_cancelled` was fired.
    BookingCancelled(Booking),
    /// `order_created` was fired.
    OrderCreated(ProductOrder),
}

/// In-memory dispatcher that records every event, for tests.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    events: Arc<Mutex<Vec<DispatchedEvent>>>,
}

impl MemoryDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event dispatched so far.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Clone for MemoryDispatcher {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for MemoryDispatcher {
    async fn booking_created(&self, booking: &Booking) -> Result<(), DispatchError> {
        self.events
            .lock()
            .unwrap()
            .push(DispatchedEvent::BookingCreated(booking.clone()));
        Ok(())
    }

    async fn booking_cancelled(&self, booking: &Booking) -> Result<(), DispatchError> {
        self.events
            .lock()
            .unwrap()
            .push(DispatchedEvent::BookingCancelled(booking.clone()));
        Ok(())
    }

    async fn order_created(&self, order: &ProductOrder) -> Result<(), DispatchError> {
        self.events
            .lock()
            .unwrap()
            .push(DispatchedEvent::OrderCreated(order.clone()));
        Ok(())
    }
}

/// Dispatcher that always fails, for exercising the fire-and-forget path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn booking_created(&self, _booking: &Booking) -> Result<(), DispatchError> {
        Err(DispatchError {
            reason: "always fails".to_string(),
        })
    }

    async fn booking_cancelled(&self, _booking: &Booking) -> Result<(), DispatchError> {
        Err(DispatchError {
            reason: "always fails".to_string(),
        })
    }

    async fn order_created(&self, _order: &ProductOrder) -> Result<(), DispatchError> {
        Err(DispatchError {
            reason: "always fails".to_string(),
        })
    }
}
