use std::sync::Mutex;

use async_trait::async_trait;

use crate::bedrock::InvokeError;
use crate::sagemaker::client::{EndpointClient, EndpointRequest, EndpointSummary};

#[derive(Debug, Default)]
pub(crate) struct ScriptedEndpoints {
    pub endpoints: Vec<EndpointSummary>,
    pub list_error: Option<String>,
    pub invoke_error: Option<String>,
    pub response: Vec<u8>,
    pub requests: Mutex<Vec<EndpointRequest>>,
}

impl ScriptedEndpoints {
    pub fn serving(names: &[&str], response: impl Into<Vec<u8>>) -> Self {
        Self {
            endpoints: names
                .iter()
                .map(|name| EndpointSummary {
                    name: name.to_string(),
                    status: "InService".to_string(),
                })
                .collect(),
            response: response.into(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EndpointRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EndpointClient for ScriptedEndpoints {
    async fn list_endpoints(&self) -> Result<Vec<EndpointSummary>, InvokeError> {
        match &self.list_error {
            Some(message) => Err(InvokeError::Service {
                operation: "ListEndpoints",
                message: message.clone(),
            }),
            None => Ok(self.endpoints.clone()),
        }
    }

    async fn invoke_endpoint(&self, request: &EndpointRequest) -> Result<Vec<u8>, InvokeError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.invoke_error {
            Some(message) => Err(InvokeError::Service {
                operation: "InvokeEndpoint",
                message: message.clone(),
            }),
            None => Ok(self.response.clone()),
        }
    }
}
