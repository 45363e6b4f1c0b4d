//! Sellable products offered through the product ordering flow.

use bookline_core::{ProductId, TenantId};
use serde::{Deserialize, Serialize};

/// A physical product a tenant sells alongside its services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// The tenant this product belongs to.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Optional longer description shown on detail cards.
    pub description: Option<String>,
    /// Price in minor currency units.
    pub price: i64,
    /// Units currently in stock.
    pub stock: u32,
    /// Position in menus; lower values render first.
    pub sort_order: i32,
    /// Whether the product is offered to end users.
    pub active: bool,
}

impl Product {
    /// Creates an active product with default sort order.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>, price: i64, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            tenant_id,
            name: name.into(),
            description: None,
            price,
            stock,
            sort_order: 0,
            active: true,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Returns true if at least `quantity` units are in stock.
    #[must_use]
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
