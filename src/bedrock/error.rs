//! Errors raised while talking to the inference service.
//!
//! SDK errors are flattened to strings at this boundary: callers only ever
//! render them, and the SDK error types are generic over operation output.

use std::error::Error as StdError;
use std::io;
use std::string::FromUtf8Error;

use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use thiserror::Error;

/// Failure of a single invocation, from request construction to output.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// An SDK builder rejected the request before anything was sent.
    #[error("invalid request: {0}")]
    Request(String),

    /// Transport, auth or service-side failure of an operation.
    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    /// Failure while pulling the next event off an open stream.
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// The response body is not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    /// The response body (or a request payload) is not valid JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing relayed output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl InvokeError {
    /// Wraps an SDK operation error, keeping its whole source chain.
    pub fn service<E>(operation: &'static str, err: &E) -> Self
    where
        E: StdError + 'static,
    {
        Self::Service {
            operation,
            message: DisplayErrorContext(err).to_string(),
        }
    }

    pub fn stream<E>(err: &E) -> Self
    where
        E: StdError + 'static,
    {
        Self::Stream(DisplayErrorContext(err).to_string())
    }
}
