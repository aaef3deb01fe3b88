use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use aduan_core::labels::CaseLabels;
use aduan_core::phase::Phase;
use aduan_core::provider::{GenerateOptions, GenerateRequest, TextModel};
use aduan_core::turns::ChatTurn;

use crate::extract;
use crate::history;
use crate::prompts;
use crate::quota::{CredentialKind, LedgerSnapshot, QuotaLedger};

/// Retry and windowing knobs for [`FailoverClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Total generation attempts per user turn, across both credentials.
    pub max_attempts: u32,
    /// Linear backoff unit: attempt n sleeps `backoff_base * n`.
    pub backoff_base: Duration,
    /// How many recent assistant turns survive prompt compression.
    pub assistant_window: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            assistant_window: 6,
        }
    }
}

/// Where a reply came from, for logging and operational visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySource {
    Model { credential: CredentialKind },
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

/// Drives generation across the two credentials with the ledger deciding
/// who serves each attempt.
///
/// The contract with callers: `reply` never fails. Rate limits switch
/// credentials without delay, retryable errors back off linearly, fatal
/// errors stop immediately, and when nothing works the user still gets a
/// phase-appropriate canned reply.
pub struct FailoverClient {
    primary: Option<Arc<dyn TextModel>>,
    secondary: Option<Arc<dyn TextModel>>,
    ledger: Arc<QuotaLedger>,
    config: ClientConfig,
}

impl FailoverClient {
    pub fn new(
        primary: Option<Arc<dyn TextModel>>,
        secondary: Option<Arc<dyn TextModel>>,
        ledger: Arc<QuotaLedger>,
    ) -> Self {
        Self::with_config(primary, secondary, ledger, ClientConfig::default())
    }

    pub fn with_config(
        primary: Option<Arc<dyn TextModel>>,
        secondary: Option<Arc<dyn TextModel>>,
        ledger: Arc<QuotaLedger>,
        config: ClientConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            ledger,
            config,
        }
    }

    fn model_for(&self, kind: CredentialKind) -> Option<&Arc<dyn TextModel>> {
        match kind {
            CredentialKind::Primary => self.primary.as_ref(),
            CredentialKind::Secondary => self.secondary.as_ref(),
        }
    }

    /// Generates the assistant reply for one user turn.
    #[instrument(skip(self, history), fields(phase = %phase, turns = history.len()))]
    pub async fn reply(&self, phase: Phase, history: &[ChatTurn]) -> Reply {
        let turns = history::compress(history, self.config.assistant_window);
        let request = GenerateRequest::new(prompts::system_for(phase), turns);

        let mut avoid: Option<CredentialKind> = None;
        for attempt in 1..=self.config.max_attempts {
            let selected = match avoid {
                Some(failed) => self.ledger.active_avoiding(failed),
                None => self.ledger.active(),
            };
            let Some(kind) = selected else {
                break;
            };
            let Some(model) = self.model_for(kind) else {
                break;
            };

            match model.generate(&request).await {
                Ok(generation) => {
                    self.ledger.record_success(kind, generation.total_tokens);
                    debug!(credential = %kind, attempt, "generation ok");
                    return Reply {
                        text: generation.text,
                        source: ReplySource::Model { credential: kind },
                    };
                }
                Err(e) if e.is_rate_limit() => {
                    self.ledger.record_error(kind, true);
                    warn!(credential = %kind, attempt, "rate limited, switching credential");
                    avoid = Some(kind);
                }
                Err(e) if e.is_fatal() => {
                    self.ledger.record_error(kind, false);
                    warn!(credential = %kind, attempt, error = %e, "fatal generation error");
                    break;
                }
                Err(e) => {
                    self.ledger.record_error(kind, false);
                    warn!(credential = %kind, attempt, error = %e, "retryable generation error");
                    avoid = None;
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(self.config.backoff_base * attempt).await;
                    }
                }
            }
        }

        self.ledger.record_fallback();
        warn!(phase = %phase, "serving canned fallback reply");
        Reply {
            text: prompts::fallback_for(phase).to_string(),
            source: ReplySource::Fallback,
        }
    }

    /// One-shot structured extraction over the whole transcript. Extraction
    /// is best effort: any failure yields empty labels and the conversation
    /// carries on.
    #[instrument(skip(self, history), fields(turns = history.len()))]
    pub async fn extract_labels(&self, history: &[ChatTurn]) -> CaseLabels {
        let Some(kind) = self.ledger.active() else {
            return CaseLabels::default();
        };
        let Some(model) = self.model_for(kind) else {
            return CaseLabels::default();
        };

        let mut request = GenerateRequest::new(
            prompts::EXTRACTION_SYSTEM,
            vec![ChatTurn::user(history::transcript(history))],
        );
        request.options = GenerateOptions {
            max_tokens: Some(1024),
            temperature: Some(0.1),
        };

        match model.generate(&request).await {
            Ok(generation) => {
                self.ledger.record_success(kind, generation.total_tokens);
                extract::parse_labels(&generation.text)
            }
            Err(e) => {
                self.ledger.record_error(kind, e.is_rate_limit());
                warn!(credential = %kind, error = %e, "extraction failed");
                CaseLabels::default()
            }
        }
    }

    pub fn quota_snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockModel, MockReply};
    use crate::quota::MemoryQuotaStore;
    use aduan_core::errors::ProviderError;

    fn ledger(primary: Option<u64>, secondary: Option<u64>) -> Arc<QuotaLedger> {
        Arc::new(QuotaLedger::new(
            primary,
            secondary,
            Box::new(MemoryQuotaStore::new()),
        ))
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            backoff_base: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn as_model(mock: &Arc<MockModel>) -> Option<Arc<dyn TextModel>> {
        Some(mock.clone() as Arc<dyn TextModel>)
    }

    fn history() -> Vec<ChatTurn> {
        vec![ChatTurn::user("aku mau cerita")]
    }

    #[tokio::test]
    async fn primary_serves_the_reply() {
        let primary = Arc::new(MockModel::always("halo, aku mendengarkan"));
        let ledger = ledger(Some(100), None);
        let client = FailoverClient::new(as_model(&primary), None, ledger.clone());

        let reply = client.reply(Phase::Curhat, &history()).await;
        assert_eq!(reply.text, "halo, aku mendengarkan");
        assert_eq!(
            reply.source,
            ReplySource::Model {
                credential: CredentialKind::Primary
            }
        );

        let snap = ledger.snapshot();
        assert_eq!(snap.primary.requests_today, 1);
        assert_eq!(snap.primary.tokens_today, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_switches_without_delay() {
        let primary = Arc::new(MockModel::new(vec![MockReply::Error(
            ProviderError::RateLimited { retry_after: None },
        )]));
        let secondary = Arc::new(MockModel::always("dari cadangan"));
        let ledger = ledger(Some(100), Some(100));
        let client = FailoverClient::new(as_model(&primary), as_model(&secondary), ledger.clone());

        let start = tokio::time::Instant::now();
        let reply = client.reply(Phase::Curhat, &history()).await;
        // Paused clock: any sleep would have advanced it.
        assert_eq!(tokio::time::Instant::now(), start);

        assert_eq!(reply.text, "dari cadangan");
        assert_eq!(
            reply.source,
            ReplySource::Model {
                credential: CredentialKind::Secondary
            }
        );
        assert!(!ledger.snapshot().primary.is_available);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_error_backs_off_then_recovers() {
        let primary = Arc::new(MockModel::new(vec![
            MockReply::Error(ProviderError::ServerError {
                status: 500,
                body: "internal".into(),
            }),
            MockReply::text("pulih"),
        ]));
        let ledger = ledger(Some(100), None);
        let client = FailoverClient::with_config(
            as_model(&primary),
            None,
            ledger.clone(),
            fast_config(),
        );

        let start = tokio::time::Instant::now();
        let reply = client.reply(Phase::Curhat, &history()).await;
        assert!(start.elapsed() >= Duration::from_millis(10));

        assert_eq!(reply.text, "pulih");
        let snap = ledger.snapshot();
        assert_eq!(snap.primary.requests_today, 2);
        // One error, then the success walked the counter back down.
        assert_eq!(snap.primary.errors_today, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_serve_fallback() {
        let server_error = || {
            MockReply::Error(ProviderError::ServerError {
                status: 503,
                body: "down".into(),
            })
        };
        let primary = Arc::new(MockModel::new(vec![
            server_error(),
            server_error(),
            server_error(),
        ]));
        let ledger = ledger(Some(100), None);
        let client = FailoverClient::with_config(
            as_model(&primary),
            None,
            ledger.clone(),
            fast_config(),
        );

        let reply = client.reply(Phase::Collect, &history()).await;
        assert_eq!(reply.source, ReplySource::Fallback);
        assert_eq!(reply.text, prompts::fallback_for(Phase::Collect));
        assert_eq!(primary.call_count(), 3);

        let snap = ledger.snapshot();
        assert_eq!(snap.fallbacks_today, 1);
        assert_eq!(snap.primary.errors_today, 3);
        assert!(!snap.primary.is_available);
    }

    #[tokio::test]
    async fn fatal_error_stops_immediately() {
        let primary = Arc::new(MockModel::new(vec![MockReply::Error(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let ledger = ledger(Some(100), None);
        let client = FailoverClient::new(as_model(&primary), None, ledger.clone());

        let reply = client.reply(Phase::Curhat, &history()).await;
        assert_eq!(reply.source, ReplySource::Fallback);
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn no_credentials_serves_fallback() {
        let client = FailoverClient::new(None, None, ledger(None, None));
        let reply = client.reply(Phase::Consent, &history()).await;
        assert_eq!(reply.source, ReplySource::Fallback);
        // The consent fallback still asks the question.
        assert!(reply.text.contains("bersedia"));
    }

    #[tokio::test]
    async fn secondary_takes_over_when_primary_hits_quota() {
        let primary = Arc::new(MockModel::always("dari utama"));
        let secondary = Arc::new(MockModel::always("dari cadangan"));
        // Limit 1: a single request puts primary at 100% of quota.
        let ledger = ledger(Some(1), Some(100));
        let client = FailoverClient::new(as_model(&primary), as_model(&secondary), ledger);

        let first = client.reply(Phase::Curhat, &history()).await;
        assert_eq!(first.text, "dari utama");

        let second = client.reply(Phase::Curhat, &history()).await;
        assert_eq!(second.text, "dari cadangan");
    }

    #[tokio::test]
    async fn prompt_window_is_applied() {
        let primary = Arc::new(MockModel::always("ok"));
        let client = FailoverClient::new(as_model(&primary), None, ledger(Some(100), None));

        let mut long_history = Vec::new();
        for i in 0..10 {
            long_history.push(ChatTurn::user(format!("cerita {i}")));
            long_history.push(ChatTurn::assistant(format!("balasan {i}")));
        }

        let _ = client.reply(Phase::Curhat, &long_history).await;
        let seen = primary.requests();
        // 10 user turns survive, assistant turns are windowed to 6.
        assert_eq!(seen[0].turns.len(), 16);
        assert!(seen[0].system.contains("Satgas PPKS"));
    }

    #[tokio::test]
    async fn extraction_parses_model_json() {
        let primary = Arc::new(MockModel::always(
            r#"{"perpetrator": {"value": "kakak tingkat", "confidence": 0.8},
                "detail": {"value": "memaksa bertemu", "confidence": 0.7}}"#,
        ));
        let client = FailoverClient::new(as_model(&primary), None, ledger(Some(100), None));

        let labels = client
            .extract_labels(&[ChatTurn::user("dia kakak tingkatku, memaksa bertemu")])
            .await;
        assert_eq!(labels.perpetrator.unwrap().value, "kakak tingkat");

        let seen = primary.requests();
        assert_eq!(seen[0].system, prompts::EXTRACTION_SYSTEM);
        assert_eq!(seen[0].turns.len(), 1);
        assert!(seen[0].turns[0].content.starts_with("Pengguna:"));
        assert_eq!(seen[0].options.temperature, Some(0.1));
    }

    #[tokio::test]
    async fn extraction_failure_yields_empty_labels() {
        let primary = Arc::new(MockModel::new(vec![MockReply::Error(
            ProviderError::Overloaded,
        )]));
        let ledger = ledger(Some(100), None);
        let client = FailoverClient::new(as_model(&primary), None, ledger.clone());

        let labels = client.extract_labels(&history()).await;
        assert_eq!(labels, CaseLabels::default());
        assert_eq!(ledger.snapshot().primary.errors_today, 1);
    }

    #[tokio::test]
    async fn extraction_without_credentials_is_empty() {
        let client = FailoverClient::new(None, None, ledger(None, None));
        let labels = client.extract_labels(&history()).await;
        assert_eq!(labels, CaseLabels::default());
    }

    #[test]
    fn config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_base, Duration::from_millis(500));
        assert_eq!(config.assistant_window, 6);
    }
}
