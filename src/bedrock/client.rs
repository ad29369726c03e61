use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::{
    ContentBlock as SdkContentBlock, ContentBlockDelta, ConversationRole,
    ConverseOutput as SdkReplyOutput, ConverseStreamMetadataEvent,
    ConverseStreamOutput as SdkStreamEvent, InferenceConfiguration, Message,
    ReasoningContentBlockDelta, ResponseStream, TokenUsage as SdkTokenUsage, Tool as SdkTool,
    ToolConfiguration, ToolInputSchema, ToolSpecification,
};
use futures::stream::{self, BoxStream};
use tracing::debug;

use crate::bedrock::document::{from_document, to_document};
use crate::bedrock::error::InvokeError;
use crate::bedrock::types::{
    ChatMessage, ContentBlock, ContentDelta, ConverseReply, ConverseRequest, InferenceConfig,
    InvokeRequest, InvokeResponse, ReplyBlock, Role, StreamEvent, StreamMetadata, StreamMetrics,
    TokenUsage, Tool, ToolConfig, ToolUse,
};

/// Lazy, single-pass sequence of conversation events.
pub type EventStream = BoxStream<'static, Result<StreamEvent, InvokeError>>;

/// Lazy, single-pass sequence of raw response chunks.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, InvokeError>>;

/// Gateway to a hosted model.
///
/// Implementations own authentication and transport; callers only see typed
/// requests, events and byte bodies.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Sends one conversation turn and waits for the complete reply.
    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseReply, InvokeError>;

    /// Opens a streaming conversation.
    async fn converse_stream(&self, request: &ConverseRequest) -> Result<EventStream, InvokeError>;

    /// Sends one native payload and waits for the complete response.
    async fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeResponse, InvokeError>;

    /// Sends one native payload and streams the raw response chunks back.
    async fn invoke_model_stream(&self, request: &InvokeRequest)
    -> Result<ChunkStream, InvokeError>;
}

/// [`InferenceClient`] backed by the Bedrock Runtime SDK.
#[derive(Debug, Clone)]
pub struct BedrockClient {
    inner: aws_sdk_bedrockruntime::Client,
}

impl BedrockClient {
    /// Resolves credentials from the default provider chain for `region`.
    pub async fn connect(region: &str, endpoint_url: Option<&str>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(url) = endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;
        debug!(region, endpoint_url, "bedrock client configured");

        Self {
            inner: aws_sdk_bedrockruntime::Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl InferenceClient for BedrockClient {
    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseReply, InvokeError> {
        let mut call = self
            .inner
            .converse()
            .model_id(&request.model_id)
            .inference_config(to_sdk_inference(request.inference_config)?);
        for message in &request.messages {
            call = call.messages(to_sdk_message(message)?);
        }
        if let Some(tool_config) = &request.tool_config {
            call = call.tool_config(to_sdk_tool_config(tool_config)?);
        }

        let output = call
            .send()
            .await
            .map_err(|err| InvokeError::service("Converse", &err))?;
        debug!(model_id = %request.model_id, "conversation reply received");

        let content = match output.output() {
            Some(SdkReplyOutput::Message(message)) => from_sdk_content(message.content()),
            _ => Vec::new(),
        };
        Ok(ConverseReply {
            content,
            stop_reason: Some(output.stop_reason().as_str().to_string()),
            usage: output.usage().map(from_sdk_usage),
        })
    }

    async fn converse_stream(&self, request: &ConverseRequest) -> Result<EventStream, InvokeError> {
        let mut call = self
            .inner
            .converse_stream()
            .model_id(&request.model_id)
            .inference_config(to_sdk_inference(request.inference_config)?);
        for message in &request.messages {
            call = call.messages(to_sdk_message(message)?);
        }
        if let Some(tool_config) = &request.tool_config {
            call = call.tool_config(to_sdk_tool_config(tool_config)?);
        }

        let output = call
            .send()
            .await
            .map_err(|err| InvokeError::service("ConverseStream", &err))?;
        debug!(model_id = %request.model_id, "conversation stream opened");

        let events = stream::unfold(Some(output.stream), |state| async move {
            let mut receiver = state?;
            loop {
                match receiver.recv().await {
                    Ok(Some(event)) => {
                        if let Some(event) = from_sdk_event(event) {
                            return Some((Ok(event), Some(receiver)));
                        }
                    }
                    Ok(None) => return None,
                    Err(err) => return Some((Err(InvokeError::stream(&err)), None)),
                }
            }
        });
        Ok(Box::pin(events))
    }

    async fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeResponse, InvokeError> {
        let output = self
            .inner
            .invoke_model()
            .model_id(&request.model_id)
            .content_type(&request.content_type)
            .body(Blob::new(request.body.clone()))
            .send()
            .await
            .map_err(|err| InvokeError::service("InvokeModel", &err))?;

        Ok(InvokeResponse {
            content_type: output.content_type().to_string(),
            body: output.body.into_inner(),
        })
    }

    async fn invoke_model_stream(
        &self,
        request: &InvokeRequest,
    ) -> Result<ChunkStream, InvokeError> {
        let output = self
            .inner
            .invoke_model_with_response_stream()
            .model_id(&request.model_id)
            .content_type(&request.content_type)
            .body(Blob::new(request.body.clone()))
            .send()
            .await
            .map_err(|err| InvokeError::service("InvokeModelWithResponseStream", &err))?;

        let chunks = stream::unfold(Some(output.body), |state| async move {
            let mut receiver = state?;
            loop {
                match receiver.recv().await {
                    Ok(Some(ResponseStream::Chunk(part))) => {
                        if let Some(bytes) = part.bytes {
                            return Some((Ok(bytes.into_inner()), Some(receiver)));
                        }
                    }
                    Ok(Some(_)) => continue,
                    Ok(None) => return None,
                    Err(err) => return Some((Err(InvokeError::stream(&err)), None)),
                }
            }
        });
        Ok(Box::pin(chunks))
    }
}

fn to_sdk_inference(config: InferenceConfig) -> Result<InferenceConfiguration, InvokeError> {
    let max_tokens = i32::try_from(config.max_tokens).map_err(|_| {
        InvokeError::Request(format!(
            "max_tokens {} exceeds the runtime limit of {}",
            config.max_tokens,
            i32::MAX
        ))
    })?;
    Ok(InferenceConfiguration::builder()
        .max_tokens(max_tokens)
        .temperature(config.temperature)
        .top_p(config.top_p)
        .build())
}

fn to_sdk_tool_config(config: &ToolConfig) -> Result<ToolConfiguration, InvokeError> {
    let tools = config
        .tools
        .iter()
        .map(|tool| match tool {
            Tool::ToolSpec(spec) => ToolSpecification::builder()
                .name(&spec.name)
                .description(&spec.description)
                .input_schema(ToolInputSchema::Json(to_document(&spec.input_schema.json)))
                .build()
                .map(SdkTool::ToolSpec)
                .map_err(|err| InvokeError::Request(err.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    ToolConfiguration::builder()
        .set_tools(Some(tools))
        .build()
        .map_err(|err| InvokeError::Request(err.to_string()))
}

fn to_sdk_message(message: &ChatMessage) -> Result<Message, InvokeError> {
    let role = match message.role {
        Role::User => ConversationRole::User,
        Role::Assistant => ConversationRole::Assistant,
    };
    let content = message
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => SdkContentBlock::Text(text.clone()),
        })
        .collect::<Vec<_>>();

    Message::builder()
        .role(role)
        .set_content(Some(content))
        .build()
        .map_err(|err| InvokeError::Request(err.to_string()))
}

/// Keeps content deltas and trailing metadata; lifecycle events are dropped.
fn from_sdk_event(event: SdkStreamEvent) -> Option<StreamEvent> {
    match event {
        SdkStreamEvent::ContentBlockDelta(event) => {
            let delta = match event.delta()? {
                ContentBlockDelta::Text(text) => ContentDelta::text(text.clone()),
                ContentBlockDelta::ReasoningContent(ReasoningContentBlockDelta::Text(text)) => {
                    ContentDelta::reasoning(text.clone())
                }
                _ => ContentDelta::default(),
            };
            Some(StreamEvent::ContentBlockDelta(delta))
        }
        SdkStreamEvent::Metadata(event) => Some(StreamEvent::Metadata(from_sdk_metadata(&event))),
        _ => None,
    }
}

fn from_sdk_metadata(event: &ConverseStreamMetadataEvent) -> StreamMetadata {
    StreamMetadata {
        usage: event.usage().map(from_sdk_usage),
        metrics: event.metrics().map(|metrics| StreamMetrics {
            latency_ms: metrics.latency_ms(),
        }),
    }
}

fn from_sdk_usage(usage: &SdkTokenUsage) -> TokenUsage {
    TokenUsage {
        cache_read_input_tokens: usage.cache_read_input_tokens(),
        cache_write_input_tokens: usage.cache_write_input_tokens(),
        ..TokenUsage::new(
            usage.input_tokens(),
            usage.output_tokens(),
            usage.total_tokens(),
        )
    }
}

fn from_sdk_content(blocks: &[SdkContentBlock]) -> Vec<ReplyBlock> {
    blocks
        .iter()
        .map(|block| match block {
            SdkContentBlock::Text(text) => ReplyBlock::Text(text.clone()),
            SdkContentBlock::ToolUse(tool_use) => ReplyBlock::ToolUse(ToolUse {
                tool_use_id: tool_use.tool_use_id().to_string(),
                name: tool_use.name().to_string(),
                input: from_document(tool_use.input()),
            }),
            SdkContentBlock::ReasoningContent(_) => ReplyBlock::Other("reasoningContent"),
            SdkContentBlock::Image(_) => ReplyBlock::Other("image"),
            SdkContentBlock::Document(_) => ReplyBlock::Other("document"),
            _ => ReplyBlock::Other("unknown"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use aws_sdk_bedrockruntime::types::{
        ContentBlock as SdkContentBlock, ContentBlockDelta, ContentBlockDeltaEvent,
        ConverseStreamMetadataEvent, ConverseStreamMetrics,
        ConverseStreamOutput as SdkStreamEvent, MessageStopEvent, ReasoningContentBlockDelta,
        StopReason, TokenUsage as SdkTokenUsage, Tool as SdkTool, ToolInputSchema,
        ToolUseBlock, ToolUseBlockDelta,
    };
    use serde_json::json;

    use super::{
        from_sdk_content, from_sdk_event, from_sdk_usage, to_sdk_inference, to_sdk_message,
        to_sdk_tool_config,
    };
    use crate::bedrock::InvokeError;
    use crate::bedrock::document::to_document;
    use crate::bedrock::types::{
        ChatMessage, ContentDelta, ConverseRequest, InferenceConfig, ReplyBlock, StreamEvent,
        StreamMetadata, StreamMetrics, TokenUsage, ToolInputSchema as InputSchema, ToolSpec,
        ToolUse,
    };

    fn delta_event(delta: ContentBlockDelta) -> SdkStreamEvent {
        SdkStreamEvent::ContentBlockDelta(
            ContentBlockDeltaEvent::builder()
                .delta(delta)
                .content_block_index(0)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn text_and_reasoning_deltas_are_mapped() {
        assert_eq!(
            from_sdk_event(delta_event(ContentBlockDelta::Text("hi".into()))),
            Some(StreamEvent::ContentBlockDelta(ContentDelta::text("hi")))
        );
        assert_eq!(
            from_sdk_event(delta_event(ContentBlockDelta::ReasoningContent(
                ReasoningContentBlockDelta::Text("hmm".into())
            ))),
            Some(StreamEvent::ContentBlockDelta(ContentDelta::reasoning(
                "hmm"
            )))
        );
    }

    #[test]
    fn lifecycle_events_are_dropped() {
        let stop = SdkStreamEvent::MessageStop(
            MessageStopEvent::builder()
                .stop_reason(StopReason::EndTurn)
                .build()
                .unwrap(),
        );
        assert_eq!(from_sdk_event(stop), None);
    }

    #[test]
    fn metadata_carries_usage_and_latency() {
        let event = ConverseStreamMetadataEvent::builder()
            .usage(
                SdkTokenUsage::builder()
                    .input_tokens(3)
                    .output_tokens(2)
                    .total_tokens(5)
                    .build()
                    .unwrap(),
            )
            .metrics(
                ConverseStreamMetrics::builder()
                    .latency_ms(42)
                    .build()
                    .unwrap(),
            )
            .build();

        assert_eq!(
            from_sdk_event(SdkStreamEvent::Metadata(event)),
            Some(StreamEvent::Metadata(StreamMetadata {
                usage: Some(TokenUsage::new(3, 2, 5)),
                metrics: Some(StreamMetrics { latency_ms: 42 }),
            }))
        );
    }

    #[test]
    fn tool_use_deltas_map_to_empty_deltas() {
        let delta = ContentBlockDelta::ToolUse(
            ToolUseBlockDelta::builder()
                .input("{\"latitude\":")
                .build()
                .unwrap(),
        );
        let event = from_sdk_event(delta_event(delta));
        assert_eq!(
            event,
            Some(StreamEvent::ContentBlockDelta(ContentDelta::default()))
        );
        let Some(StreamEvent::ContentBlockDelta(delta)) = event else {
            unreachable!();
        };
        assert_eq!(delta.fragment(), None);
    }

    #[test]
    fn usage_keeps_cache_counts_when_reported() {
        let usage = SdkTokenUsage::builder()
            .input_tokens(10)
            .output_tokens(4)
            .total_tokens(14)
            .cache_read_input_tokens(6)
            .build()
            .unwrap();

        assert_eq!(
            from_sdk_usage(&usage),
            TokenUsage {
                cache_read_input_tokens: Some(6),
                ..TokenUsage::new(10, 4, 14)
            }
        );
    }

    #[test]
    fn oversized_token_budget_is_rejected_instead_of_clamped() {
        let err = to_sdk_inference(InferenceConfig {
            max_tokens: 3_000_000_000,
            temperature: 0.5,
            top_p: 0.9,
        })
        .unwrap_err();

        assert!(matches!(err, InvokeError::Request(_)));
        assert!(err.to_string().contains("3000000000"));

        let config = to_sdk_inference(InferenceConfig {
            max_tokens: 512,
            temperature: 0.5,
            top_p: 0.9,
        })
        .unwrap();
        assert_eq!(config.max_tokens(), Some(512));
    }

    #[test]
    fn tool_schema_is_sent_as_a_document() {
        let schema = json!({"required": ["latitude"]});
        let request = ConverseRequest::single_turn(
            "model-x",
            "weather?",
            InferenceConfig {
                max_tokens: 512,
                temperature: 0.5,
                top_p: 0.9,
            },
        )
        .with_tools(vec![ToolSpec {
            name: "queryWeather".into(),
            description: "queryWeather".into(),
            input_schema: InputSchema {
                json: schema.clone(),
            },
        }]);

        let config = to_sdk_tool_config(request.tool_config.as_ref().unwrap()).unwrap();
        let SdkTool::ToolSpec(spec) = &config.tools()[0] else {
            panic!("expected a tool spec");
        };
        assert_eq!(spec.name(), "queryWeather");
        let expected = ToolInputSchema::Json(to_document(&schema));
        assert!(format!("{spec:?}").contains(&format!("{expected:?}")));
    }

    #[test]
    fn reply_content_keeps_text_and_tool_use_blocks() {
        let tool_use = ToolUseBlock::builder()
            .tool_use_id("tooluse_1")
            .name("queryWeather")
            .input(to_document(
                &json!({"latitude": "39.9", "longitude": "116.4"}),
            ))
            .build()
            .unwrap();
        let blocks = from_sdk_content(&[
            SdkContentBlock::Text("Checking.".into()),
            SdkContentBlock::ToolUse(tool_use),
        ]);

        assert_eq!(
            blocks,
            vec![
                ReplyBlock::Text("Checking.".into()),
                ReplyBlock::ToolUse(ToolUse {
                    tool_use_id: "tooluse_1".into(),
                    name: "queryWeather".into(),
                    input: json!({"latitude": "39.9", "longitude": "116.4"}),
                }),
            ]
        );
    }

    #[test]
    fn user_messages_convert_to_sdk_messages() {
        let message = to_sdk_message(&ChatMessage::user("hello")).unwrap();
        assert_eq!(message.content().len(), 1);
        assert_eq!(message.content()[0].as_text().unwrap(), "hello");
    }
}
