//! SageMaker endpoint discovery and invocation.

pub mod client;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{EndpointClient, EndpointRequest, EndpointSummary, SageMakerClient};
