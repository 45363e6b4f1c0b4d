//! Catalog service for the bookline platform.
//!
//! This crate provides:
//!
//! - **Service catalog**: Categories and the bookable services under them
//! - **Product catalog**: Sellable products with stock counts
//! - **Coupon catalog**: Promotions with validity windows
//! - **Provider trait**: Read access backed by Postgres or memory

pub mod coupon;
pub mod error;
pub mod product;
pub mod provider;
pub mod service;

pub use coupon::Coupon;
pub use error::CatalogError;
pub use product::Product;
pub use provider::{CatalogProvider, MemoryCatalog};
pub use service::{ServiceCategory, ServiceItem};
