use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::turns::ChatTurn;

/// Options controlling text generation.
#[derive(Clone, Debug)]
pub struct GenerateOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(512),
            temperature: Some(0.6),
        }
    }
}

/// One outbound generation request: a system instruction plus the (already
/// compressed) conversation turns.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub system: String,
    pub turns: Vec<ChatTurn>,
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn new(system: impl Into<String>, turns: Vec<ChatTurn>) -> Self {
        Self {
            system: system.into(),
            turns,
            options: GenerateOptions::default(),
        }
    }
}

/// A completed generation with the provider's token accounting.
#[derive(Clone, Debug)]
pub struct Generation {
    pub text: String,
    pub total_tokens: u64,
}

/// Trait implemented by each text-model backend. One instance per credential;
/// failover between instances is the client's job, not the provider's.
#[async_trait]
pub trait TextModel: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, ProviderError>;
}
