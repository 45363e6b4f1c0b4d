//! Conversation engine for the bookline platform.
//!
//! This crate provides:
//!
//! - **Channel events**: The channel-agnostic inbound event shape
//! - **Actions**: The strict postback alphabet menu options carry
//! - **Replies**: Outbound text and bounded-menu message blocks
//! - **Dialogue engine**: The per-turn state machine driving the booking,
//!   product, coupon, and cancellation flows

pub mod action;
pub mod engine;
pub mod error;
pub mod event;
pub mod reply;

pub use action::Action;
pub use engine::{DialogueEngine, EngineConfig};
pub use error::EngineError;
pub use event::{ChannelEvent, EventKind};
pub use reply::{MAX_MENU_OPTIONS, MenuOption, MessageBlock, Reply};
