use std::io::{self, Write};

use clap::Args;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::bedrock::payload::{NovaInferenceConfig, NovaRequest};
use crate::bedrock::types::InvokeRequest;
use crate::bedrock::{BedrockClient, InferenceClient, InvokeError};
use crate::commands::{CommandError, Defaults, InvocationArgs, Settings, print_dry_run};

pub const DEFAULTS: Defaults = Defaults {
    model: "us.amazon.nova-lite-v1:0",
    prompt: "Describe the purpose of a 'hello world' program in one line.",
    max_tokens: 500,
    temperature: 0.7,
    top_p: 0.9,
};

#[derive(Debug, Args, Clone)]
pub struct InvokeStreamArgs {
    #[command(flatten)]
    pub invocation: InvocationArgs,
    #[arg(long, default_value_t = 20, help = "Sample from the k most likely tokens")]
    pub top_k: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvokeStreamDryRun<'a> {
    model_id: &'a str,
    content_type: &'a str,
    body: &'a NovaRequest,
}

pub async fn run(args: InvokeStreamArgs) -> Result<(), CommandError> {
    let settings = args.invocation.resolve(&DEFAULTS)?;
    let payload = payload_for(&settings, args.top_k);
    let mut stdout = io::stdout();

    if settings.dry_run {
        let request = InvokeStreamDryRun {
            model_id: &settings.model_id,
            content_type: "application/json",
            body: &payload,
        };
        return print_dry_run(&mut stdout, &settings, "InvokeModelWithResponseStream", &request);
    }

    let client = BedrockClient::connect(&settings.region, settings.endpoint_url.as_deref()).await;
    execute(&client, &settings.model_id, &payload, &mut stdout)
        .await
        .map(|_| ())
}

pub fn payload_for(settings: &Settings, top_k: u32) -> NovaRequest {
    NovaRequest::single_turn(
        &settings.prompt,
        NovaInferenceConfig {
            max_tokens: settings.inference.max_tokens,
            temperature: settings.inference.temperature,
            top_p: settings.inference.top_p,
            top_k,
        },
    )
}

/// Streams a native-payload invocation and returns the accumulated text.
pub async fn execute<C, W>(
    client: &C,
    model_id: &str,
    payload: &NovaRequest,
    out: &mut W,
) -> Result<String, CommandError>
where
    C: InferenceClient + ?Sized,
    W: Write,
{
    let result = match InvokeRequest::json(model_id, payload) {
        Ok(request) => relay(client, &request, out).await,
        Err(err) => Err(InvokeError::from(err)),
    };
    let text = result.map_err(|source| {
        error!(model_id, "Can't invoke model: {source}");
        CommandError::invoke(model_id, source)
    })?;

    writeln!(out, "\nFinal result: {text}")?;
    Ok(text)
}

async fn relay<C, W>(client: &C, request: &InvokeRequest, out: &mut W) -> Result<String, InvokeError>
where
    C: InferenceClient + ?Sized,
    W: Write,
{
    let mut chunks = client.invoke_model_stream(request).await?;
    let mut complete = String::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let response: Value = match serde_json::from_slice(&chunk) {
            Ok(value) => value,
            Err(err) => {
                warn!("Error processing response chunk: {err}");
                continue;
            }
        };

        if let Some(text) = response
            .pointer("/contentBlockDelta/delta/text")
            .and_then(Value::as_str)
        {
            out.write_all(text.as_bytes())?;
            out.flush()?;
            complete.push_str(text);
        } else if let Some(metadata) = response.get("metadata") {
            write_metadata_report(
                out,
                metadata,
                response.get("amazon-bedrock-invocationMetrics"),
            )?;
        }
    }

    writeln!(out, "\n--- Complete response received ---")?;
    Ok(complete)
}

fn write_metadata_report<W: Write>(
    out: &mut W,
    metadata: &Value,
    invocation_metrics: Option<&Value>,
) -> io::Result<()> {
    writeln!(out, "\n\n=== METADATA INFORMATION ===")?;

    if let Some(usage) = metadata.get("usage") {
        writeln!(out, "Usage Information:")?;
        writeln!(out, "- Input Tokens: {}", count(usage, "inputTokens"))?;
        writeln!(out, "- Output Tokens: {}", count(usage, "outputTokens"))?;
        writeln!(
            out,
            "- Cache Read Input Tokens: {}",
            count(usage, "cacheReadInputTokenCount")
        )?;
        writeln!(
            out,
            "- Cache Write Input Tokens: {}",
            count(usage, "cacheWriteInputTokenCount")
        )?;
    }

    if let Some(metrics) = invocation_metrics {
        writeln!(out, "\nInvocation Metrics:")?;
        writeln!(out, "- Input Token Count: {}", count(metrics, "inputTokenCount"))?;
        writeln!(out, "- Output Token Count: {}", count(metrics, "outputTokenCount"))?;
        writeln!(
            out,
            "- Invocation Latency: {}ms",
            count(metrics, "invocationLatency")
        )?;
        writeln!(
            out,
            "- First Byte Latency: {}ms",
            count(metrics, "firstByteLatency")
        )?;
        writeln!(
            out,
            "- Cache Read Input Token Count: {}",
            count(metrics, "cacheReadInputTokenCount")
        )?;
        writeln!(
            out,
            "- Cache Write Input Token Count: {}",
            count(metrics, "cacheWriteInputTokenCount")
        )?;
    }

    write_listing(out, "Additional Metrics", metadata.get("metrics"))?;
    write_listing(out, "Trace Information", metadata.get("trace"))?;

    writeln!(out, "===========================")
}

fn write_listing<W: Write>(out: &mut W, title: &str, section: Option<&Value>) -> io::Result<()> {
    let Some(entries) = section.and_then(Value::as_object) else {
        return Ok(());
    };
    if entries.is_empty() {
        return Ok(());
    }

    writeln!(out, "\n{title}:")?;
    for (key, value) in entries {
        writeln!(out, "- {key}: {value}")?;
    }
    Ok(())
}

fn count(section: &Value, key: &str) -> String {
    section
        .get(key)
        .and_then(Value::as_i64)
        .map_or_else(|| "n/a".to_string(), |value| value.to_string())
}
