//! Product orders placed through the chat-bot.
//!
//! Orders mirror bookings at a smaller scale: stock is the capacity, and the
//! stock check runs inside the same ledger boundary as the insert so two
//! concurrent purchases cannot oversell. Payment is an external concern;
//! orders are persisted pending.

use bookline_core::{ChannelUserId, OrderId, ProductId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a product order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment.
    Pending,
    /// Paid in full.
    Paid,
    /// Cancelled before payment.
    Cancelled,
}

/// A persisted product order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOrder {
    /// Unique order identifier.
    pub id: OrderId,
    /// The tenant the order belongs to.
    pub tenant_id: TenantId,
    /// The customer who ordered.
    pub customer: ChannelUserId,
    /// The ordered product.
    pub product_id: ProductId,
    /// Units ordered.
    pub quantity: u32,
    /// Price per unit at order time, in minor currency units.
    pub unit_price: i64,
    /// Current status.
    pub status: OrderStatus,
    /// When the order was committed.
    pub created_at: DateTime<Utc>,
}

impl ProductOrder {
    /// Returns the order total in minor currency units.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// A finalized purchase selection, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// The tenant the order is for.
    pub tenant_id: TenantId,
    /// The customer ordering.
    pub customer: ChannelUserId,
    /// The chosen product.
    pub product_id: ProductId,
    /// Units to order.
    pub quantity: u32,
    /// Price per unit at selection time, in minor currency units.
    pub unit_price: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_total_multiplies_quantity() {
        let order = ProductOrder {
            id: OrderId::new(),
            tenant_id: TenantId::new(),
            customer: ChannelUserId::new("Uabc"),
            product_id: ProductId::new(),
            quantity: 3,
            unit_price: 1200,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        assert_eq!(order.total(), 3600);
    }

    #[test]
    fn status_serde_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Paid).expect("serialize");
        assert_eq!(json, "\"paid\"");
    }
}
