//! Streaming and single-shot calls to hosted models on Amazon Bedrock, plus
//! raw calls to SageMaker endpoints.

pub mod bedrock;
pub mod commands;
pub mod config;
pub mod logging;
pub mod sagemaker;

/// Version string shown by `--version` on every binary.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BR_GIT_SHA"),
    ", built ",
    env!("BR_BUILD_TS"),
    ")"
);
