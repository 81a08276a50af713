//! A travel assistant that chats about trips and shows the places it
//! suggests on a map.
//!
//! The crate includes a CLI for using it in the terminal. It can also be
//! used as a library: build an [`Assistant`], then feed it messages and
//! documents from your own interface by implementing
//! [`Presenter`](roamer_core::Presenter).

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod assistant;
pub mod geocoding;
pub mod map_html;
pub mod pdf;

pub use assistant::{Assistant, AssistantBuilder, DEFAULT_SYSTEM_PROMPT};

/// Re-exports of [`roamer_core`] crate.
pub mod core {
    pub use roamer_core::*;
}
