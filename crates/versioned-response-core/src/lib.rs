//! # versioned-response core
//!
//! Core library deciding which version of a model's JSON shape a response
//! should carry, and writing that decision into the model before it is
//! serialized.
//!
//! This crate is not meant to be used directly. Use `versioned-response`,
//! which also provides the derive macros.

mod advice;
pub mod config;
mod error;
mod locator;
mod policy;
mod request;
mod resolver;
mod response;
mod sink;
mod tagger;

// Public API
pub use advice::{EndpointKey, VersionedBodyAdvice, VersionedEndpoints};
pub use config::{ConfigError, Environment};
pub use error::{AmbiguousSink, Result, SinkWriteError, VersioningError};
pub use locator::SinkLocator;
pub use policy::{EndpointVersionPolicy, PolicySettings};
pub use request::{QueryParams, RequestVersionInputs, VersionInputs};
pub use resolver::{resolve, ResolvedVersion, VersionSource};
pub use response::{JsonSerializer, ModelSerializer, Response};
pub use sink::{
    SetterOutcome, SinkCandidate, SinkDescriptor, SinkField, SinkKind, SinkWriter, VersionedModel,
};
pub use tagger::ResponseTagger;
