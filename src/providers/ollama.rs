/*!
 * Ollama provider: local LLM server over HTTP.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::providers::prompt::{build_system_prompt, build_user_prompt};
use crate::providers::{TranslateProvider, TranslationRequest};

/// Ollama client speaking the /api/generate endpoint
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name
    model: String,
    /// Base sampling temperature when the request has no override
    temperature: f32,
    /// Request timeout in seconds
    timeout_secs: u64,
    /// HTTP client for making requests
    client: Client,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize)]
struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize)]
struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    /// Generated text
    response: String,
    /// Whether the generation is complete
    #[serde(default)]
    done: bool,
}

impl Ollama {
    /// Create a client from a provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;
        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn map_request_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else if error.is_connect() {
            ProviderError::ConnectionError(error.to_string())
        } else {
            ProviderError::RequestFailed(error.to_string())
        }
    }
}

#[async_trait]
impl TranslateProvider for Ollama {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let body = GenerationRequest {
            model: self.model.clone(),
            prompt: build_user_prompt(request),
            system: Some(build_system_prompt(request)),
            options: Some(GenerationOptions {
                temperature: Some(request.temperature.unwrap_or(self.temperature)),
            }),
            stream: false,
        };

        debug!("Ollama generate: model={}, {} prompt chars", self.model, body.prompt.len());

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Ollama API error {}: {}", status, message);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        if !parsed.done {
            return Err(ProviderError::ParseError(
                "Ollama returned an incomplete generation".to_string(),
            ));
        }
        Ok(parsed.response.trim().to_string())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError {
                status_code: response.status().as_u16(),
                message: "Ollama /api/tags returned an error".to_string(),
            })
        }
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
