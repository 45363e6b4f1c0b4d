//! Outbound replies.
//!
//! A reply is a sequence of message blocks: plain text, or a bounded menu
//! whose options each carry a machine-readable action and a human label.
//! Channels cap how many buttons one menu may show, so menus are truncated
//! to [`MAX_MENU_OPTIONS`].

use crate::action::Action;
use serde::{Deserialize, Serialize};

/// The most options one menu block may carry.
pub const MAX_MENU_OPTIONS: usize = 10;

/// One tappable menu option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    /// Machine-readable postback data.
    pub data: String,
    /// Human label shown on the button.
    pub label: String,
}

impl MenuOption {
    /// Creates an option for an action.
    #[must_use]
    pub fn new(action: &Action, label: impl Into<String>) -> Self {
        Self {
            data: action.data(),
            label: label.into(),
        }
    }
}

/// One block of an outbound reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "block")]
pub enum MessageBlock {
    /// Plain text.
    Text { text: String },
    /// A titled option menu.
    Menu {
        title: String,
        options: Vec<MenuOption>,
    },
}

/// An outbound reply: one or more message blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Blocks in delivery order.
    pub messages: Vec<MessageBlock>,
}

impl Reply {
    /// Creates an empty reply (nothing is sent).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a reply with one text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::empty().with_text(text)
    }

    /// Appends a text block.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.messages.push(MessageBlock::Text { text: text.into() });
        self
    }

    /// Appends a menu block, truncated to [`MAX_MENU_OPTIONS`].
    #[must_use]
    pub fn with_menu(mut self, title: impl Into<String>, mut options: Vec<MenuOption>) -> Self {
        options.truncate(MAX_MENU_OPTIONS);
        self.messages.push(MessageBlock::Menu {
            title: title.into(),
            options,
        });
        self
    }

    /// Returns true if nothing would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the options of the first menu block, if any.
    #[must_use]
    pub fn first_menu(&self) -> Option<&[MenuOption]> {
        self.messages.iter().find_map(|block| match block {
            MessageBlock::Menu { options, .. } => Some(options.as_slice()),
            MessageBlock::Text { .. } => None,
        })
    }
}
