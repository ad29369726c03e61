//! Bedrock Runtime integration.
//!
//! Typed requests and events, model-native payloads, and the client seam the
//! command layer invokes through.

/// Client trait and its SDK-backed implementation.
pub mod client;
mod document;
/// Invocation error type.
pub mod error;
/// Model-native request bodies.
pub mod payload;
#[cfg(test)]
pub(crate) mod testing;
/// Request, response and stream event types.
pub mod types;

pub use client::{BedrockClient, ChunkStream, EventStream, InferenceClient};
pub use error::InvokeError;
