//! HTTP implementation of the inference gateway

use super::{FollowUpRequest, GatewayError, InferenceGateway};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Posts `{question, answer}` as JSON to a fixed endpoint
pub struct HttpGateway {
    client: Client,
    endpoint: String,
}

impl HttpGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl InferenceGateway for HttpGateway {
    async fn request_json(&self, request: &FollowUpRequest) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("(no body)"));
            return Err(GatewayError::status(status.as_u16(), &body));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            GatewayError::invalid_body(format!("Gateway response is not JSON: {e}"))
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
