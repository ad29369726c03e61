//! Diagnostic logging setup shared by every binary.

use std::io;

use tracing_subscriber::EnvFilter;

/// How chatty stderr diagnostics should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Self::Quiet,
            (true, false) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }

    fn default_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "bedrock_samples=debug,warn",
        }
    }
}

/// Installs the global subscriber. `BR_LOG` overrides the verbosity flags.
///
/// Stdout carries model output, so diagnostics always go to stderr.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_env("BR_LOG")
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
