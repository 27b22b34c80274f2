//! Session module - the iteration protocol driver.
//!
//! A [`SessionDriver`] owns one [`Connection`](crate::transport::Connection)
//! and two collaborators: a [`MeshGenerator`] that produces meshes and a
//! [`Postprocessor`] that prepares them for sending. Build one with
//! [`SessionBuilder`].

mod collaborator;
mod config;
mod driver;

pub use collaborator::{
    BoxFuture, CommandPostprocessor, MeshGenerator, Postprocessor, INPUT_PLACEHOLDER,
    OUTPUT_PLACEHOLDER,
};
pub use config::{
    ArtifactPaths, ControlMarkers, SessionBuilder, SessionConfig, Subscription, Timeouts,
    DEFAULT_ADVANCE_AMOUNT, DEFAULT_COMMAND_TOPIC, DEFAULT_ITERATIONS, DEFAULT_MESSAGE_TYPE,
    DEFAULT_REPLY_TOPIC,
};
pub use driver::{IterationReport, SessionDriver, SessionReport};
