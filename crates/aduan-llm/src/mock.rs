use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use aduan_core::errors::ProviderError;
use aduan_core::provider::{GenerateRequest, Generation, TextModel};

const MOCK_TOKENS: u64 = 10;

/// Pre-programmed replies for deterministic testing without API calls.
pub enum MockReply {
    Text(String),
    Error(ProviderError),
    /// Wait a duration, then yield the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock model that returns pre-programmed replies in sequence. With a
/// `default_reply` set, an exhausted queue repeats that text forever, which
/// keeps long scenario tests from having to count their turns.
pub struct MockModel {
    replies: Vec<MockReply>,
    default_reply: Option<String>,
    call_count: AtomicUsize,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockModel {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            default_reply: None,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model that answers every call with the same text.
    pub fn always(text: &str) -> Self {
        Self {
            replies: Vec::new(),
            default_reply: Some(text.to_string()),
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue replies, then repeat `text` once they run out.
    pub fn queue_then(replies: Vec<MockReply>, text: &str) -> Self {
        Self {
            replies,
            default_reply: Some(text.to_string()),
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every request seen so far, for asserting on prompts and turn counts.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TextModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, ProviderError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(request.clone());

        let Some(reply) = self.replies.get(idx) else {
            if let Some(text) = &self.default_reply {
                return Ok(Generation {
                    text: text.clone(),
                    total_tokens: MOCK_TOKENS,
                });
            }
            return Err(ProviderError::InvalidRequest(format!(
                "MockModel: no reply configured for call {idx}"
            )));
        };

        let mut current = reply;
        loop {
            match current {
                MockReply::Text(text) => {
                    return Ok(Generation {
                        text: text.clone(),
                        total_tokens: MOCK_TOKENS,
                    });
                }
                MockReply::Error(e) => return Err(e.clone()),
                MockReply::Delay(duration, inner) => {
                    tokio::time::sleep(*duration).await;
                    current = inner;
                }
            }
        }
    }
}
