//! Model-native request bodies for the invoke-model operations.

use serde::Serialize;

use crate::bedrock::types::ChatMessage;

const DEEPSEEK_BEGIN_OF_SENTENCE: &str = "<｜begin▁of▁sentence｜>";
const DEEPSEEK_USER_TURN: &str = "<｜User｜>";
const DEEPSEEK_ASSISTANT_TURN: &str = "<｜Assistant｜>";
const DEEPSEEK_THINK: &str = "<think>\n";

/// Wraps a user prompt in the DeepSeek-R1 chat template, leaving the
/// assistant turn open inside a `<think>` block.
pub fn deepseek_prompt(prompt: &str) -> String {
    format!(
        "{DEEPSEEK_BEGIN_OF_SENTENCE}{DEEPSEEK_USER_TURN}{prompt}{DEEPSEEK_ASSISTANT_TURN}{DEEPSEEK_THINK}"
    )
}

/// Raw text-completion payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawPromptPayload {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl RawPromptPayload {
    pub fn deepseek(prompt: &str, max_tokens: u32, temperature: f32, top_p: f32) -> Self {
        Self {
            prompt: deepseek_prompt(prompt),
            max_tokens,
            temperature,
            top_p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaInferenceConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

/// Amazon Nova `messages-v1` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaRequest {
    pub schema_version: &'static str,
    pub inference_config: NovaInferenceConfig,
    pub messages: Vec<ChatMessage>,
}

impl NovaRequest {
    pub fn single_turn(prompt: impl Into<String>, inference_config: NovaInferenceConfig) -> Self {
        Self {
            schema_version: "messages-v1",
            inference_config,
            messages: vec![ChatMessage::user(prompt)],
        }
    }
}
