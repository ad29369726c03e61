use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sagemakerruntime::primitives::Blob;
use tracing::debug;

use crate::bedrock::InvokeError;

/// Deployed endpoint as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSummary {
    pub name: String,
    pub status: String,
}

/// Raw request to a deployed endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    pub endpoint_name: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl EndpointRequest {
    pub fn text(endpoint_name: impl Into<String>, input: &str) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            content_type: "text/plain".to_string(),
            body: input.as_bytes().to_vec(),
        }
    }
}

/// Gateway to model endpoints hosted outside Bedrock.
#[async_trait]
pub trait EndpointClient: Send + Sync {
    async fn list_endpoints(&self) -> Result<Vec<EndpointSummary>, InvokeError>;

    /// Sends one request and returns the raw response body.
    async fn invoke_endpoint(&self, request: &EndpointRequest) -> Result<Vec<u8>, InvokeError>;
}

/// [`EndpointClient`] backed by the SageMaker control and runtime SDKs.
#[derive(Debug, Clone)]
pub struct SageMakerClient {
    control: aws_sdk_sagemaker::Client,
    runtime: aws_sdk_sagemakerruntime::Client,
}

impl SageMakerClient {
    pub async fn connect(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        debug!(region, "sagemaker clients configured");

        Self {
            control: aws_sdk_sagemaker::Client::new(&sdk_config),
            runtime: aws_sdk_sagemakerruntime::Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl EndpointClient for SageMakerClient {
    async fn list_endpoints(&self) -> Result<Vec<EndpointSummary>, InvokeError> {
        let output = self
            .control
            .list_endpoints()
            .send()
            .await
            .map_err(|err| InvokeError::service("ListEndpoints", &err))?;

        Ok(output
            .endpoints()
            .iter()
            .map(|endpoint| EndpointSummary {
                name: endpoint.endpoint_name().to_string(),
                status: endpoint.endpoint_status().as_str().to_string(),
            })
            .collect())
    }

    async fn invoke_endpoint(&self, request: &EndpointRequest) -> Result<Vec<u8>, InvokeError> {
        let output = self
            .runtime
            .invoke_endpoint()
            .endpoint_name(&request.endpoint_name)
            .content_type(&request.content_type)
            .body(Blob::new(request.body.clone()))
            .send()
            .await
            .map_err(|err| InvokeError::service("InvokeEndpoint", &err))?;

        Ok(output.body.into_inner())
    }
}
