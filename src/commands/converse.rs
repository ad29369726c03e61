use std::io::{self, Write};

use futures::StreamExt;
use tracing::{debug, error};

use crate::bedrock::types::{ConverseRequest, StreamEvent};
use crate::bedrock::{BedrockClient, InferenceClient, InvokeError};
use crate::commands::{CommandError, Defaults, InvocationArgs, print_dry_run};

pub const DEFAULTS: Defaults = Defaults {
    model: "us.deepseek.r1-v1:0",
    prompt: "Describe the purpose of a 'hello world' program in one line.",
    max_tokens: 512,
    temperature: 0.5,
    top_p: 0.9,
};

pub async fn run(args: InvocationArgs) -> Result<(), CommandError> {
    let settings = args.resolve(&DEFAULTS)?;
    let request =
        ConverseRequest::single_turn(&settings.model_id, &settings.prompt, settings.inference);
    let mut stdout = io::stdout();

    if settings.dry_run {
        return print_dry_run(&mut stdout, &settings, "ConverseStream", &request);
    }

    let client = BedrockClient::connect(&settings.region, settings.endpoint_url.as_deref()).await;
    execute(&client, &request, &mut stdout).await
}

/// Streams one conversation turn to `out`.
///
/// Fragments written before a failure stay written.
pub async fn execute<C, W>(
    client: &C,
    request: &ConverseRequest,
    out: &mut W,
) -> Result<(), CommandError>
where
    C: InferenceClient + ?Sized,
    W: Write,
{
    relay(client, request, out).await.map_err(|source| {
        error!(model_id = %request.model_id, "conversation stream failed: {source}");
        CommandError::invoke(&request.model_id, source)
    })
}

/// Writes each event as it arrives: reasoning text, else output text, else
/// the metadata block.
pub async fn relay<C, W>(
    client: &C,
    request: &ConverseRequest,
    out: &mut W,
) -> Result<(), InvokeError>
where
    C: InferenceClient + ?Sized,
    W: Write,
{
    let mut events = client.converse_stream(request).await?;
    let mut fragments = 0usize;

    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::ContentBlockDelta(delta) => {
                if let Some(fragment) = delta.fragment() {
                    out.write_all(fragment.as_bytes())?;
                    out.flush()?;
                    fragments += 1;
                }
            }
            StreamEvent::Metadata(metadata) => {
                write!(out, "\n\nMetadata: {}\n", serde_json::to_string(&metadata)?)?;
                out.flush()?;
            }
        }
    }

    debug!(fragments, "conversation stream finished");
    Ok(())
}
