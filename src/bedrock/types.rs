use serde::Serialize;
use serde_json::Value;

/// Conversation role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Text { text: String },
}

/// Role-tagged message sent to the conversation API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    /// Builds a single-block user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// Generation parameters, passed through to the service untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Tool the model may ask the caller to run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: ToolInputSchema,
}

/// JSON schema of a tool's input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInputSchema {
    pub json: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    ToolSpec(ToolSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolConfig {
    pub tools: Vec<Tool>,
}

/// Conversation request, streamed or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub model_id: String,
    pub messages: Vec<ChatMessage>,
    pub inference_config: InferenceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
}

impl ConverseRequest {
    /// One-turn request carrying a single user message.
    pub fn single_turn(
        model_id: impl Into<String>,
        prompt: impl Into<String>,
        inference_config: InferenceConfig,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            messages: vec![ChatMessage::user(prompt)],
            inference_config,
            tool_config: None,
        }
    }

    /// Offers `tools` to the model alongside the messages.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tool_config = Some(ToolConfig {
            tools: tools.into_iter().map(Tool::ToolSpec).collect(),
        });
        self
    }
}

/// Incremental content of a streamed response.
///
/// At most one of the two fragments is normally set; when both are, the
/// reasoning fragment wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDelta {
    pub reasoning_text: Option<String>,
    pub text: Option<String>,
}

impl ContentDelta {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning_text: Some(text.into()),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            reasoning_text: None,
            text: Some(text.into()),
        }
    }

    /// The fragment to relay, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.reasoning_text.as_deref().or(self.text.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub total_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_write_input_tokens: Option<i32>,
}

impl TokenUsage {
    pub fn new(input_tokens: i32, output_tokens: i32, total_tokens: i32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            cache_read_input_tokens: None,
            cache_write_input_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetrics {
    pub latency_ms: i64,
}

/// Trailing usage and latency information of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<StreamMetrics>,
}

/// One unit of a streamed conversation response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ContentBlockDelta(ContentDelta),
    Metadata(StreamMetadata),
}

/// Tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUse {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

/// One content block of a complete conversation reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBlock {
    Text(String),
    ToolUse(ToolUse),
    /// A block kind this crate does not render, by its wire name.
    Other(&'static str),
}

impl ReplyBlock {
    /// Wire name of the block kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::ToolUse(_) => "toolUse",
            Self::Other(kind) => *kind,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn tool_use(&self) -> Option<&ToolUse> {
        match self {
            Self::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        }
    }
}

/// Complete, non-streamed conversation reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverseReply {
    pub content: Vec<ReplyBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Opaque invoke-model request: the body is the model's native payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest {
    pub model_id: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl InvokeRequest {
    /// Serializes `payload` as the JSON body of the request.
    pub fn json<T: Serialize>(
        model_id: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            model_id: model_id.into(),
            content_type: "application/json".to_string(),
            body: serde_json::to_vec(payload)?,
        })
    }
}

/// Complete invoke-model response.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Printable summary of an [`InvokeResponse`] without its body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<'a> {
    pub content_type: &'a str,
    pub body_length: usize,
}

impl InvokeResponse {
    pub fn envelope(&self) -> ResponseEnvelope<'_> {
        ResponseEnvelope {
            content_type: &self.content_type,
            body_length: self.body.len(),
        }
    }
}
