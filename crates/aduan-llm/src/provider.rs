use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use aduan_core::config::CredentialConfig;
use aduan_core::errors::ProviderError;
use aduan_core::provider::{GenerateRequest, Generation, TextModel};
use aduan_core::turns::Role;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Non-streaming Gemini `generateContent` client. One instance per
/// credential; the failover client decides which instance handles a request.
pub struct GeminiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            model: model.into(),
        }
    }

    pub fn from_credential(credential: &CredentialConfig) -> Self {
        Self::new(credential.api_key.clone(), credential.model.clone())
    }

    fn build_body(&self, request: &GenerateRequest) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = request
            .turns
            .iter()
            .map(|t| {
                let role = match t.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({ "role": role, "parts": [{ "text": t.content }] })
            })
            .collect();

        let mut generation_config = serde_json::Map::new();
        if let Some(max) = request.options.max_tokens {
            generation_config.insert("maxOutputTokens".into(), max.into());
        }
        if let Some(temp) = request.options.temperature {
            generation_config.insert("temperature".into(), temp.into());
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if !request.system.is_empty() {
            body["system_instruction"] = json!({ "parts": [{ "text": request.system }] });
        }
        body
    }
}

#[async_trait]
impl TextModel for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, ProviderError> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(REQUEST_TIMEOUT)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let body: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        body.into_generation()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u64,
}

impl GenerateContentResponse {
    fn into_generation(self) -> Result<Generation, ProviderError> {
        let text: String = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::MalformedResponse("no candidate text".into()));
        }
        Ok(Generation {
            text,
            total_tokens: self.usage_metadata.map(|u| u.total_token_count).unwrap_or(0),
        })
    }
}
