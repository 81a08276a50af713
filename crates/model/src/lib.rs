//! A provider-neutral protocol for talking to hosted language models.
//!
//! The assistant never talks to a vendor API directly. Instead it sends
//! a [`ModelRequest`] through a [`ModelProvider`] and pulls events out of
//! the returned [`ModelResponse`] one by one. A response is a lazy event
//! stream: dropping it stops the exchange, and no further events are
//! pulled from the provider.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
