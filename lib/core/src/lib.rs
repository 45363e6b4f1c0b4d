//! Core domain types shared across the bookline platform.
//!
//! This crate provides:
//! - Strongly-typed ULID-backed IDs for every domain entity
//! - The channel-assigned end user identifier
//!
//! Every operation in the platform is scoped to one tenant; passing a
//! [`TenantId`] explicitly keeps that scoping visible at each call site.

pub mod id;

pub use id::{
    BookingId, CancelToken, CategoryId, ChannelUserId, CouponId, OrderId, ParseIdError, ProductId,
    ServiceId, StaffId, TenantId,
};
