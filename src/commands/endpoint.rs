use std::env;
use std::io::{self, Write};

use clap::Args;
use serde::Serialize;
use tracing::{error, info};

use crate::bedrock::InvokeError;
use crate::commands::{CommandError, DEFAULT_REGION, write_dry_run};
use crate::config::{self, ConfigError, ProfileConfig};
use crate::logging::Verbosity;
use crate::sagemaker::{EndpointClient, EndpointRequest, SageMakerClient};

pub const DEFAULT_INPUT: &str = "Default query text";

#[derive(Debug, Args, Clone, Default)]
pub struct EndpointArgs {
    #[arg(long, help = "Config profile to read defaults from")]
    pub profile: Option<String>,
    #[arg(long, help = "AWS region of the endpoints")]
    pub region: Option<String>,
    #[arg(long, help = "Endpoint to invoke; defaults to the first one listed")]
    pub endpoint_name: Option<String>,
    #[arg(long, help = "Print the request instead of sending it")]
    pub dry_run: bool,
    #[arg(short, long, help = "Log debug diagnostics to stderr")]
    pub verbose: bool,
    #[arg(short, long, help = "Only log errors to stderr")]
    pub quiet: bool,
    #[arg(help = "Input text sent as text/plain")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSettings {
    pub region: String,
    /// `None` means the first listed endpoint is used.
    pub endpoint_name: Option<String>,
    pub input: String,
    pub dry_run: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointDryRun<'a> {
    endpoint_name: Option<&'a str>,
    content_type: &'a str,
    body: &'a str,
}

impl EndpointArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    pub fn resolve(&self) -> Result<EndpointSettings, ConfigError> {
        let profile = match &self.profile {
            Some(name) => config::load_profile(name)?,
            None => ProfileConfig::default(),
        };
        Ok(self.resolve_with(&profile, |key| env::var(key).ok()))
    }

    fn resolve_with(
        &self,
        profile: &ProfileConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> EndpointSettings {
        let env_string = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let non_empty = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());

        EndpointSettings {
            region: non_empty(&self.region)
                .or_else(|| env_string("BR_REGION"))
                .or_else(|| profile.region.clone())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_name: non_empty(&self.endpoint_name)
                .or_else(|| env_string("BR_ENDPOINT_NAME"))
                .or_else(|| non_empty(&profile.endpoint_name)),
            input: non_empty(&self.input).unwrap_or_else(|| {
                info!("Using default input text: {DEFAULT_INPUT}");
                DEFAULT_INPUT.to_string()
            }),
            dry_run: self.dry_run,
        }
    }
}

pub async fn run(args: EndpointArgs) -> Result<(), CommandError> {
    let settings = args.resolve()?;
    let mut stdout = io::stdout();

    if settings.dry_run {
        let request = EndpointDryRun {
            endpoint_name: settings.endpoint_name.as_deref(),
            content_type: "text/plain",
            body: &settings.input,
        };
        return write_dry_run(&mut stdout, &settings.region, None, "InvokeEndpoint", &request);
    }

    let client = SageMakerClient::connect(&settings.region).await;
    execute(
        &client,
        settings.endpoint_name.as_deref(),
        &settings.input,
        &mut stdout,
    )
    .await
    .map(|_| ())
}

/// Invokes `endpoint_name`, or the first listed endpoint when none is given,
/// and prints the decoded response.
pub async fn execute<C, W>(
    client: &C,
    endpoint_name: Option<&str>,
    input: &str,
    out: &mut W,
) -> Result<String, CommandError>
where
    C: EndpointClient + ?Sized,
    W: Write,
{
    let endpoint_name = match endpoint_name {
        Some(name) => name.to_string(),
        None => first_endpoint(client).await?,
    };

    let request = EndpointRequest::text(&endpoint_name, input);
    let response = match client.invoke_endpoint(&request).await {
        Ok(body) => String::from_utf8(body).map_err(InvokeError::from),
        Err(err) => Err(err),
    };
    let response = response.map_err(|source| {
        error!(%endpoint_name, "Error invoking endpoint: {source}");
        CommandError::invoke(&endpoint_name, source)
    })?;

    info!(%endpoint_name, "Received response");
    writeln!(out, "Response from {endpoint_name}: {response}")?;
    Ok(response)
}

async fn first_endpoint<C>(client: &C) -> Result<String, CommandError>
where
    C: EndpointClient + ?Sized,
{
    let endpoints = client
        .list_endpoints()
        .await
        .map_err(CommandError::ListEndpoints)?;
    info!("Found {} endpoints", endpoints.len());
    for endpoint in &endpoints {
        info!(status = %endpoint.status, "Endpoint: {}", endpoint.name);
    }

    let first = endpoints
        .into_iter()
        .next()
        .ok_or(CommandError::NoEndpoints)?;
    info!("Using first available endpoint: {}", first.name);
    Ok(first.name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{DEFAULT_INPUT, EndpointArgs, execute};
    use crate::bedrock::InvokeError;
    use crate::commands::CommandError;
    use crate::config::ProfileConfig;
    use crate::sagemaker::testing::ScriptedEndpoints;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[tokio::test]
    async fn first_listed_endpoint_is_used_when_none_is_named() {
        let client = ScriptedEndpoints::serving(&["alpha", "beta"], "pong");
        let mut out = Vec::new();
        let response = execute(&client, None, "ping", &mut out).await.unwrap();

        assert_eq!(response, "pong");
        assert_eq!(String::from_utf8(out).unwrap(), "Response from alpha: pong\n");
        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].endpoint_name, "alpha");
        assert_eq!(sent[0].content_type, "text/plain");
        assert_eq!(sent[0].body, b"ping");
    }

    #[tokio::test]
    async fn named_endpoint_skips_listing() {
        let client = ScriptedEndpoints {
            list_error: Some("should not be called".into()),
            ..ScriptedEndpoints::serving(&[], "ok")
        };
        let mut out = Vec::new();
        execute(&client, Some("custom"), "hello", &mut out)
            .await
            .unwrap();

        assert_eq!(client.sent()[0].endpoint_name, "custom");
    }

    #[tokio::test]
    async fn empty_endpoint_list_invokes_nothing() {
        let client = ScriptedEndpoints::serving(&[], "unused");
        let mut out = Vec::new();
        let err = execute(&client, None, "ping", &mut out).await.unwrap_err();

        assert!(matches!(err, CommandError::NoEndpoints));
        assert_eq!(err.to_string(), "No endpoints available");
        assert!(client.sent().is_empty());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn listing_failure_is_not_reported_as_an_invocation() {
        let client = ScriptedEndpoints {
            list_error: Some("access denied".into()),
            ..ScriptedEndpoints::default()
        };
        let err = execute(&client, None, "ping", &mut Vec::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to list endpoints: ListEndpoints failed: access denied"
        );
    }

    #[tokio::test]
    async fn invoke_failure_names_the_endpoint() {
        let client = ScriptedEndpoints {
            invoke_error: Some("model error".into()),
            ..ScriptedEndpoints::serving(&["alpha"], "")
        };
        let err = execute(&client, None, "ping", &mut Vec::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "ERROR: Can't invoke 'alpha'. Reason: InvokeEndpoint failed: model error"
        );
    }

    #[tokio::test]
    async fn non_utf8_response_is_a_decode_error() {
        let client = ScriptedEndpoints::serving(&["alpha"], vec![0xff, 0xfe]);
        let err = execute(&client, None, "ping", &mut Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CommandError::Invoke {
                source: InvokeError::Utf8(_),
                ..
            }
        ));
    }

    #[test]
    fn missing_input_falls_back_to_default_text() {
        let settings = EndpointArgs {
            input: Some(String::new()),
            ..EndpointArgs::default()
        }
        .resolve_with(&ProfileConfig::default(), env(&[]));

        assert_eq!(settings.input, DEFAULT_INPUT);
        assert_eq!(settings.endpoint_name, None);
        assert_eq!(settings.region, "us-east-1");
    }

    #[test]
    fn endpoint_name_precedence_is_cli_env_profile() {
        let profile = ProfileConfig {
            endpoint_name: Some("from-profile".into()),
            region: Some("eu-west-1".into()),
            ..ProfileConfig::default()
        };
        let from_env = EndpointArgs::default()
            .resolve_with(&profile, env(&[("BR_ENDPOINT_NAME", "from-env")]));
        assert_eq!(from_env.endpoint_name.as_deref(), Some("from-env"));
        assert_eq!(from_env.region, "eu-west-1");

        let from_cli = EndpointArgs {
            endpoint_name: Some("from-cli".into()),
            ..EndpointArgs::default()
        }
        .resolve_with(&profile, env(&[("BR_ENDPOINT_NAME", "from-env")]));
        assert_eq!(from_cli.endpoint_name.as_deref(), Some("from-cli"));

        let from_profile = EndpointArgs::default().resolve_with(&profile, env(&[]));
        assert_eq!(from_profile.endpoint_name.as_deref(), Some("from-profile"));
    }
}
