//! CLI commands and the settings they share.

use std::env;
use std::fmt::Display;
use std::io::{self, Write};
use std::str::FromStr;

use clap::Args;
use serde::Serialize;
use thiserror::Error;

use crate::bedrock::InvokeError;
use crate::bedrock::types::InferenceConfig;
use crate::config::{self, ConfigError, ProfileConfig};
use crate::logging::Verbosity;

pub mod config_check;
pub mod converse;
pub mod converse_tools;
pub mod endpoint;
pub mod invoke;
pub mod invoke_stream;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Largest token budget the runtime accepts (a signed 32-bit count).
pub const MAX_TOKENS_LIMIT: u32 = i32::MAX as u32;

/// Built-in values a command falls back to when nothing else is set.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub model: &'static str,
    pub prompt: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Flags shared by every invocation command.
#[derive(Debug, Args, Clone, Default)]
pub struct InvocationArgs {
    #[arg(long, help = "Config profile to read defaults from")]
    pub profile: Option<String>,
    #[arg(long, help = "AWS region of the runtime endpoint")]
    pub region: Option<String>,
    #[arg(long, help = "Override the runtime endpoint URL")]
    pub endpoint_url: Option<String>,
    #[arg(long, help = "Model identifier")]
    pub model: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TOKENS_LIMIT)))]
    pub max_tokens: Option<u32>,
    #[arg(long)]
    pub temperature: Option<f32>,
    #[arg(long)]
    pub top_p: Option<f32>,
    #[arg(long, help = "Print the request instead of sending it")]
    pub dry_run: bool,
    #[arg(short, long, help = "Log debug diagnostics to stderr")]
    pub verbose: bool,
    #[arg(short, long, help = "Only log errors to stderr")]
    pub quiet: bool,
    #[arg(help = "Prompt text")]
    pub prompt: Option<String>,
}

/// Fully resolved invocation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub model_id: String,
    pub prompt: String,
    pub inference: InferenceConfig,
    pub dry_run: bool,
}

impl InvocationArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// Resolves settings with precedence CLI > env > profile > defaults.
    ///
    /// A profile is only consulted when `--profile` is passed.
    pub fn resolve(&self, defaults: &Defaults) -> Result<Settings, ConfigError> {
        let profile = match &self.profile {
            Some(name) => config::load_profile(name)?,
            None => ProfileConfig::default(),
        };
        self.resolve_with(defaults, &profile, |key| env::var(key).ok())
    }

    fn resolve_with(
        &self,
        defaults: &Defaults,
        profile: &ProfileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError> {
        let env_string = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let max_tokens = match self.max_tokens {
            Some(value) => value,
            None => match env_parsed::<u32>(&lookup, "BR_MAX_TOKENS")? {
                Some(value) if value == 0 || value > MAX_TOKENS_LIMIT => {
                    return Err(ConfigError::InvalidEnv {
                        var: "BR_MAX_TOKENS",
                        value: value.to_string(),
                        reason: format!("must be between 1 and {MAX_TOKENS_LIMIT}"),
                    });
                }
                Some(value) => value,
                None => profile.max_tokens.unwrap_or(defaults.max_tokens),
            },
        };
        let temperature = match self.temperature {
            Some(value) => value,
            None => env_parsed(&lookup, "BR_TEMPERATURE")?
                .or(profile.temperature)
                .unwrap_or(defaults.temperature),
        };
        let top_p = match self.top_p {
            Some(value) => value,
            None => env_parsed(&lookup, "BR_TOP_P")?
                .or(profile.top_p)
                .unwrap_or(defaults.top_p),
        };

        Ok(Settings {
            region: self
                .region
                .clone()
                .or_else(|| env_string("BR_REGION"))
                .or_else(|| profile.region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: self
                .endpoint_url
                .clone()
                .or_else(|| env_string("BR_ENDPOINT_URL"))
                .or_else(|| profile.endpoint_url.clone()),
            model_id: self
                .model
                .clone()
                .or_else(|| env_string("BR_MODEL"))
                .or_else(|| profile.model.clone())
                .unwrap_or_else(|| defaults.model.to_string()),
            prompt: self
                .prompt
                .clone()
                .or_else(|| profile.prompt.clone())
                .unwrap_or_else(|| defaults.prompt.to_string()),
            inference: InferenceConfig {
                max_tokens,
                temperature,
                top_p,
            },
            dry_run: self.dry_run,
        })
    }
}

fn env_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|err: T::Err| ConfigError::InvalidEnv {
            var,
            value: trimmed.to_string(),
            reason: err.to_string(),
        })
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("ERROR: Can't invoke '{model_id}'. Reason: {source}")]
    Invoke {
        model_id: String,
        #[source]
        source: InvokeError,
    },

    #[error("Failed to list endpoints: {0}")]
    ListEndpoints(#[source] InvokeError),

    #[error("No endpoints available")]
    NoEndpoints,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CommandError {
    pub fn invoke(model_id: &str, source: InvokeError) -> Self {
        Self::Invoke {
            model_id: model_id.to_string(),
            source,
        }
    }

    /// Invocation failures are part of the command's output and go to
    /// stdout; everything else is a usage problem and goes to stderr.
    pub fn report(&self) {
        self.report_to(&mut io::stdout().lock(), &mut io::stderr().lock());
    }

    /// Write failures are ignored: the process exits right after reporting.
    pub fn report_to<O: Write, E: Write>(&self, stdout: &mut O, stderr: &mut E) {
        let _ = match self {
            Self::Invoke { .. } => writeln!(stdout, "{self}"),
            _ => writeln!(stderr, "{self}"),
        };
    }
}

#[derive(Serialize)]
struct DryRun<'a, T: Serialize> {
    dry_run: bool,
    operation: &'static str,
    region: &'a str,
    #[serde(rename = "endpointUrl", skip_serializing_if = "Option::is_none")]
    endpoint_url: Option<&'a str>,
    #[serde(flatten)]
    request: &'a T,
}

/// Prints the request an operation would send, as one JSON line.
fn print_dry_run<T: Serialize, W: Write>(
    out: &mut W,
    settings: &Settings,
    operation: &'static str,
    request: &T,
) -> Result<(), CommandError> {
    write_dry_run(
        out,
        &settings.region,
        settings.endpoint_url.as_deref(),
        operation,
        request,
    )
}

fn write_dry_run<T: Serialize, W: Write>(
    out: &mut W,
    region: &str,
    endpoint_url: Option<&str>,
    operation: &'static str,
    request: &T,
) -> Result<(), CommandError> {
    let dry_run = DryRun {
        dry_run: true,
        operation,
        region,
        endpoint_url,
        request,
    };
    writeln!(out, "{}", serde_json::to_string(&dry_run)?)?;
    Ok(())
}
