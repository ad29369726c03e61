//! Scripted [`InferenceClient`] for exercising invokers without a network.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use crate::bedrock::client::{ChunkStream, EventStream, InferenceClient};
use crate::bedrock::error::InvokeError;
use crate::bedrock::types::{
    ConverseReply, ConverseRequest, InvokeRequest, InvokeResponse, StreamEvent,
};

/// One scripted step of a stream: an item, or a failure in its place.
#[derive(Debug, Clone)]
pub(crate) enum Step<T> {
    Item(T),
    Fail(String),
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedClient {
    pub connect_error: Option<String>,
    pub events: Vec<Step<StreamEvent>>,
    pub chunks: Vec<Step<Vec<u8>>>,
    pub body: Vec<u8>,
    pub reply: ConverseReply,
    pub requests: Mutex<Vec<InvokeRequest>>,
    pub conversations: Mutex<Vec<ConverseRequest>>,
}

impl ScriptedClient {
    pub fn with_events(events: Vec<Step<StreamEvent>>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn with_body(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_reply(reply: ConverseReply) -> Self {
        Self {
            reply,
            ..Self::default()
        }
    }

    pub fn with_chunks(chunks: Vec<Step<Vec<u8>>>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            connect_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<InvokeRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn conversed(&self) -> Vec<ConverseRequest> {
        self.conversations.lock().unwrap().clone()
    }

    fn connect(&self, operation: &'static str) -> Result<(), InvokeError> {
        match &self.connect_error {
            Some(message) => Err(InvokeError::Service {
                operation,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn replay<T: Clone + Send + 'static>(
    steps: &[Step<T>],
) -> impl futures::Stream<Item = Result<T, InvokeError>> + Send + 'static {
    let items = steps
        .iter()
        .map(|step| match step {
            Step::Item(item) => Ok(item.clone()),
            Step::Fail(message) => Err(InvokeError::Stream(message.clone())),
        })
        .collect::<Vec<_>>();
    stream::iter(items)
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseReply, InvokeError> {
        self.conversations.lock().unwrap().push(request.clone());
        self.connect("Converse")?;
        Ok(self.reply.clone())
    }

    async fn converse_stream(&self, _request: &ConverseRequest) -> Result<EventStream, InvokeError> {
        self.connect("ConverseStream")?;
        Ok(Box::pin(replay(&self.events)))
    }

    async fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeResponse, InvokeError> {
        self.requests.lock().unwrap().push(request.clone());
        self.connect("InvokeModel")?;
        Ok(InvokeResponse {
            content_type: "application/json".to_string(),
            body: self.body.clone(),
        })
    }

    async fn invoke_model_stream(
        &self,
        request: &InvokeRequest,
    ) -> Result<ChunkStream, InvokeError> {
        self.requests.lock().unwrap().push(request.clone());
        self.connect("InvokeModelWithResponseStream")?;
        Ok(Box::pin(replay(&self.chunks)))
    }
}
