//! Core domain model types for flowbench.
//!
//! This module contains the values that flow through and out of a run:
//! - Events and the channel message type
//! - Run artifacts

mod artifact;
mod event;

pub use artifact::RunArtifact;
pub use event::{Event, Message, Payload, Sentinel, DEFAULT_SCHEMA_VERSION};
