//! NATS-backed booking and order notifications.
//!
//! Tenant operators consume these events elsewhere (back-office UI, email
//! bridges); the dialogue path only publishes. Events go to
//! `notify.<tenant>.<event>` subjects on one JetStream stream, so a
//! consumer can subscribe to everything for a tenant or to one event kind
//! across tenants.

use async_nats::jetstream;
use async_trait::async_trait;
use bookline_ledger::{Booking, DispatchError, NotificationDispatcher, ProductOrder};
use serde::Serialize;

/// Subject prefix for notification events.
const NOTIFY_SUBJECT_PREFIX: &str = "notify";

/// Stream name for notification events.
const NOTIFY_STREAM_NAME: &str = "BOOKLINE_NOTIFY";

/// JetStream publisher for booking and order events.
pub struct NatsDispatcher {
    jetstream: jetstream::Context,
}

impl NatsDispatcher {
    /// Connects to NATS and ensures the notification stream exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or stream setup fails.
    pub async fn connect(url: &str) -> Result<Self, DispatchError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| DispatchError {
                reason: format!("nats connect failed: {e}"),
            })?;
        let jetstream = jetstream::new(client);

        let stream_config = jetstream::stream::Config {
            name: NOTIFY_STREAM_NAME.to_string(),
            subjects: vec![format!("{NOTIFY_SUBJECT_PREFIX}.>")],
            storage: jetstream::stream::StorageType::File,
            retention: jetstream::stream::RetentionPolicy::Limits,
            ..Default::default()
        };
        jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| DispatchError {
                reason: format!("failed to create notification stream: {e}"),
            })?;

        Ok(Self { jetstream })
    }

    async fn publish<T: Serialize>(
        &self,
        subject: String,
        payload: &T,
    ) -> Result<(), DispatchError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| DispatchError {
            reason: format!("failed to serialize notification: {e}"),
        })?;
        let ack = self
            .jetstream
            .publish(subject, bytes.into())
            .await
            .map_err(|e| DispatchError {
                reason: format!("nats publish failed: {e}"),
            })?;
        ack.await.map_err(|e| DispatchError {
            reason: format!("nats publish not acknowledged: {e}"),
        })?;
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for NatsDispatcher {
    async fn booking_created(&self, booking: &Booking) -> Result<(), DispatchError> {
        let subject = format!(
            "{NOTIFY_SUBJECT_PREFIX}.{}.booking_created",
            booking.tenant_id
        );
        self.publish(subject, booking).await
    }

    async fn booking_cancelled(&self, booking: &Booking) -> Result<(), DispatchError> {
        let subject = format!(
            "{NOTIFY_SUBJECT_PREFIX}.{}.booking_cancelled",
            booking.tenant_id
        );
        self.publish(subject, booking).await
    }

    async fn order_created(&self, order: &ProductOrder) -> Result<(), DispatchError> {
        let subject = format!("{NOTIFY_SUBJECT_PREFIX}.{}.order_created", order.tenant_id);
        self.publish(subject, order).await
    }
}

/// Dispatcher used when no NATS URL is configured: events are logged at
/// debug level and dropped.
#[derive(Debug, Default)]
pub struct LogOnlyDispatcher;

#[async_trait]
impl NotificationDispatcher for LogOnlyDispatcher {
    async fn booking_created(&self, booking: &Booking) -> Result<(), DispatchError> {
        tracing::debug!(booking_id = %booking.id, "booking created (notifications disabled)");
        Ok(())
    }

    async fn booking_cancelled(&self, booking: &Booking) -> Result<(), DispatchError> {
        tracing::debug!(booking_id = %booking.id, "booking cancelled (notifications disabled)");
        Ok(())
    }

    async fn order_created(&self, order: &ProductOrder) -> Result<(), DispatchError> {
        tracing::debug!(order_id = %order.id, "order created (notifications disabled)");
        Ok(())
    }
}
