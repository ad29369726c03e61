use std::io::{self, Write};

use serde_json::{Value, json};
use tracing::{debug, error};

use crate::bedrock::types::{ConverseReply, ConverseRequest, ToolInputSchema, ToolSpec};
use crate::bedrock::{BedrockClient, InferenceClient};
use crate::commands::{CommandError, Defaults, InvocationArgs, print_dry_run};

pub const DEFAULTS: Defaults = Defaults {
    model: "anthropic.claude-3-haiku-20240307-v1:0",
    prompt: "What is the weather like today?",
    max_tokens: 512,
    temperature: 0.5,
    top_p: 0.9,
};

pub const WEATHER_TOOL: &str = "queryWeather";

/// Weather lookup by coordinates, offered to the model on every request.
pub fn weather_tool() -> ToolSpec {
    ToolSpec {
        name: WEATHER_TOOL.to_string(),
        description: WEATHER_TOOL.to_string(),
        input_schema: ToolInputSchema {
            json: json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "string", "description": "Latitude"},
                    "longitude": {"type": "string", "description": "Longitude"}
                },
                "required": ["latitude", "longitude"]
            }),
        },
    }
}

pub async fn run(args: InvocationArgs) -> Result<(), CommandError> {
    let settings = args.resolve(&DEFAULTS)?;
    let request =
        ConverseRequest::single_turn(&settings.model_id, &settings.prompt, settings.inference)
            .with_tools(vec![weather_tool()]);
    let mut stdout = io::stdout();

    if settings.dry_run {
        return print_dry_run(&mut stdout, &settings, "Converse", &request);
    }

    let client = BedrockClient::connect(&settings.region, settings.endpoint_url.as_deref()).await;
    execute(&client, &request, &mut stdout).await.map(|_| ())
}

/// Sends one tool-enabled turn and prints every reply block.
///
/// Returns the text of the first text block, if any.
pub async fn execute<C, W>(
    client: &C,
    request: &ConverseRequest,
    out: &mut W,
) -> Result<Option<String>, CommandError>
where
    C: InferenceClient + ?Sized,
    W: Write,
{
    let reply = client.converse(request).await.map_err(|source| {
        error!(model_id = %request.model_id, "Can't invoke model: {source}");
        CommandError::invoke(&request.model_id, source)
    })?;
    debug!(blocks = reply.content.len(), stop_reason = ?reply.stop_reason, "reply received");

    write_reply(out, &reply)?;
    Ok(reply
        .content
        .iter()
        .find_map(|block| block.text())
        .map(str::to_string))
}

fn write_reply<W: Write>(out: &mut W, reply: &ConverseReply) -> Result<(), CommandError> {
    for block in &reply.content {
        let tool_use = match block.tool_use() {
            Some(tool_use) => serde_json::to_value(tool_use)?,
            None => Value::Null,
        };
        writeln!(out, "{}", block.kind())?;
        writeln!(out, "toolUse: {tool_use}")?;
    }
    if let Some(reason) = &reply.stop_reason {
        writeln!(out, "Stop reason: {reason}")?;
    }
    if let Some(text) = reply.content.iter().find_map(|block| block.text()) {
        writeln!(out, "{text}")?;
    }
    Ok(())
}
