use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::bedrock::payload::RawPromptPayload;
use crate::bedrock::types::InvokeRequest;
use crate::bedrock::{BedrockClient, InferenceClient, InvokeError};
use crate::commands::{CommandError, Defaults, InvocationArgs, Settings, print_dry_run};

pub const DEFAULTS: Defaults = Defaults {
    model: "us.deepseek.r1-v1:0",
    prompt: "Hi. In a short paragraph, explain what you can do.",
    max_tokens: 1000,
    temperature: 0.9,
    top_p: 0.9,
};

const BANNER_WIDTH: usize = 35;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvokeDryRun<'a> {
    model_id: &'a str,
    content_type: &'a str,
    body: &'a RawPromptPayload,
}

pub async fn run(args: InvocationArgs) -> Result<(), CommandError> {
    let settings = args.resolve(&DEFAULTS)?;
    let payload = payload_for(&settings);
    let mut stdout = io::stdout();

    if settings.dry_run {
        let request = InvokeDryRun {
            model_id: &settings.model_id,
            content_type: "application/json",
            body: &payload,
        };
        return print_dry_run(&mut stdout, &settings, "InvokeModel", &request);
    }

    let client = BedrockClient::connect(&settings.region, settings.endpoint_url.as_deref()).await;
    execute(&client, &settings, &payload, &mut stdout)
        .await
        .map(|_| ())
}

/// Raw-prompt payload for the resolved settings.
pub fn payload_for(settings: &Settings) -> RawPromptPayload {
    RawPromptPayload::deepseek(
        &settings.prompt,
        settings.inference.max_tokens,
        settings.inference.temperature,
        settings.inference.top_p,
    )
}

/// Sends `payload` once and prints the response envelope and decoded body.
pub async fn execute<C, W>(
    client: &C,
    settings: &Settings,
    payload: &RawPromptPayload,
    out: &mut W,
) -> Result<Value, CommandError>
where
    C: InferenceClient + ?Sized,
    W: Write,
{
    write_banner(out, settings)?;

    let result = match InvokeRequest::json(&settings.model_id, payload) {
        Ok(request) => invoke(client, &request, out).await,
        Err(err) => Err(InvokeError::from(err)),
    };
    result.map_err(|source| {
        error!(model_id = %settings.model_id, "Error invoking model: {source}");
        CommandError::invoke(&settings.model_id, source)
    })
}

async fn invoke<C, W>(client: &C, request: &InvokeRequest, out: &mut W) -> Result<Value, InvokeError>
where
    C: InferenceClient + ?Sized,
    W: Write,
{
    let response = client.invoke_model(request).await?;
    writeln!(
        out,
        "API Response: {}",
        serde_json::to_string(&response.envelope())?
    )?;

    let body = decode_body(response.body)?;
    writeln!(out, "Response: {}", serde_json::to_string_pretty(&body)?)?;
    Ok(body)
}

/// Decodes a response body from bytes to UTF-8 text to JSON.
pub fn decode_body(bytes: Vec<u8>) -> Result<Value, InvokeError> {
    let text = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_banner<W: Write>(out: &mut W, settings: &Settings) -> io::Result<()> {
    let rule = "=".repeat(BANNER_WIDTH);
    writeln!(out, "{rule}")?;
    writeln!(out, "Welcome to the Amazon Bedrock demo!")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Model: {}", settings.model_id)?;
    writeln!(out, "Prompt: {}", settings.prompt)?;
    writeln!(out, "Invoking model...\n")?;
    Ok(())
}
