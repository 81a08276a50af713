//! Core logic of the travel assistant: the conversation session, place
//! lookup, map building, document context and the loop that drives one
//! model exchange per user input.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod conversation;
pub mod document;
pub mod geo;
pub mod map;
mod model_client;
mod orchestrator;
pub mod presenter;
pub mod tool;

pub use conversation::{Document, Role, Session, Turn};
pub use document::{DocumentExtractor, IngestError, IngestOutcome, ingest_document};
pub use geo::{
    CachingResolver, Coordinates, Location, LocationResolver, StaticResolver,
};
pub use map::{DEFAULT_ZOOM, MapArtifact, MapBuilder, Marker, RenderError};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, TurnOutcome};
pub use presenter::Presenter;
