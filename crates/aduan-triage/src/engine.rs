use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use aduan_core::emergency::EmergencyKind;
use aduan_core::ids::ReportId;
use aduan_core::phase::Phase;
use aduan_core::session::SessionContext;
use aduan_core::turns::ChatTurn;
use aduan_llm::prompts;
use aduan_llm::FailoverClient;
use aduan_store::{Database, EmergencyRepo, ReportRepo, SessionHasher};

use crate::consent::{self, ConsentAnswer};
use crate::emergency::{self, EmergencyScan, EMERGENCY_RESPONSE};
use crate::knowledge;
use crate::offtopic::{self, OFF_TOPIC_RESPONSE};
use crate::scoring::{self, IntentScorer, IntentTier};
use crate::vault::SessionVault;

/// Tuning knobs for the triage pipeline.
pub struct EngineConfig {
    /// Messages required before the consent question may be asked, so the
    /// question never lands before any real context exists.
    pub min_messages_for_consent: u32,
    /// How long emergency log entries stay visible for follow-up.
    pub emergency_retention: chrono::Duration,
    /// Sessions idle past this are evicted from memory.
    pub idle_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_messages_for_consent: 4,
            emergency_retention: chrono::Duration::hours(720),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Which branch of the pipeline produced a turn's response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Faq { category: &'static str },
    Emergency { kind: EmergencyKind },
    OffTopic,
    Chat,
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Faq { .. } => "faq",
            Disposition::Emergency { .. } => "emergency",
            Disposition::OffTopic => "off_topic",
            Disposition::Chat => "chat",
        }
    }
}

/// Everything a caller learns from one processed message.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub response: String,
    pub phase: Phase,
    pub tier: IntentTier,
    pub score: u32,
    pub message_count: u32,
    pub session_id: String,
    /// Whether this turn's content reached durable storage.
    pub persisted: bool,
    pub consent_given: bool,
    pub report_id: Option<ReportId>,
    pub disposition: Disposition,
}

/// State handed back after a session restore.
#[derive(Clone, Debug)]
pub struct SessionSummary {
    pub session_id: String,
    pub phase: Phase,
    pub tier: IntentTier,
    pub score: u32,
    pub message_count: u32,
    pub consent_given: bool,
    pub persisted: bool,
}

/// The conversational triage pipeline: rule-based classification decides the
/// phase, the language model only ever words the reply. Internal failures
/// degrade the turn instead of failing it; callers never see an error here.
pub struct TriageEngine {
    vault: Arc<SessionVault>,
    client: Arc<FailoverClient>,
    reports: ReportRepo,
    emergencies: EmergencyRepo,
    scorer: IntentScorer,
    emergency_scan: EmergencyScan,
    config: EngineConfig,
}

impl TriageEngine {
    pub fn new(
        client: Arc<FailoverClient>,
        db: Database,
        hasher: Arc<SessionHasher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            vault: Arc::new(SessionVault::new(config.idle_timeout)),
            client,
            reports: ReportRepo::new(db.clone()),
            emergencies: EmergencyRepo::new(db, hasher, config.emergency_retention),
            scorer: IntentScorer::new(),
            emergency_scan: EmergencyScan::new(),
            config,
        }
    }

    /// Shared handle for the idle-eviction task.
    pub fn vault(&self) -> Arc<SessionVault> {
        self.vault.clone()
    }

    /// Process one user message. Turns within a session serialize on the
    /// session lock; other sessions are unaffected.
    #[instrument(skip(self, message), fields(session_id = %session_id))]
    pub async fn chat(&self, session_id: &str, message: &str) -> TurnOutcome {
        let handle = self.vault.get_or_create(session_id);
        let mut session = handle.lock().await;
        let outcome = self.run_turn(&mut session, message).await;
        info!(
            phase = %outcome.phase,
            tier = %outcome.tier,
            score = outcome.score,
            disposition = outcome.disposition.label(),
            persisted = outcome.persisted,
            "turn complete"
        );
        outcome
    }

    /// Forget a session's in-memory state. Durable reports are untouched.
    pub fn reset(&self, session_id: &str) -> bool {
        self.vault.remove(session_id)
    }

    /// Rebuild a session from a client-held transcript, replaying
    /// classification so score and phase match what a live session would
    /// have reached. With prior consent the durable report is re-opened and
    /// topped up with whatever the store is missing.
    #[instrument(skip(self, history), fields(session_id = %session_id, turns = history.len()))]
    pub fn restore(
        &self,
        session_id: &str,
        history: Vec<ChatTurn>,
        consent_given: bool,
    ) -> SessionSummary {
        let mut session = SessionContext::new(session_id);

        for turn in &history {
            if !turn.is_user() {
                continue;
            }
            session.message_count += 1;
            let text = turn.content.as_str();
            // Short-circuit turns never scored live, so they do not score here.
            if knowledge::lookup(text).is_some()
                || self.emergency_scan.scan(text).is_some()
                || offtopic::is_off_topic(text)
            {
                continue;
            }
            let scored = self.scorer.score(text);
            session.absorb_signals(scored.signals.iter().map(|s| (s.category, s.weight)));
        }
        session.history = history;

        let tier = scoring::tier_for(session.cumulative_score);
        if consent_given {
            session.consent_asked = true;
            session.grant_consent();
            session.phase = Phase::Report;
        } else if tier >= IntentTier::PotentialReport
            && session.message_count >= self.config.min_messages_for_consent
        {
            session.consent_asked = true;
            session.phase = Phase::Consent;
        } else if tier >= IntentTier::PotentialReport {
            session.phase = Phase::Collect;
        }

        let persisted = consent_given && self.reopen_report(&mut session);

        let summary = SessionSummary {
            session_id: session.session_id.clone(),
            phase: session.phase,
            tier,
            score: session.cumulative_score,
            message_count: session.message_count,
            consent_given: session.consent_given,
            persisted,
        };
        info!(
            phase = %summary.phase,
            score = summary.score,
            persisted = summary.persisted,
            "session restored"
        );
        self.vault.install(session);
        summary
    }

    async fn run_turn(&self, session: &mut SessionContext, message: &str) -> TurnOutcome {
        session.push_user(message);

        // 1. Knowledge base: canned answers bypass scoring and the model.
        if let Some(hit) = knowledge::lookup(message) {
            session.push_assistant(hit.response);
            return self.outcome(
                session,
                hit.response.to_string(),
                false,
                Disposition::Faq { category: hit.category },
            );
        }

        // 2. Crisis language outranks every remaining rule, in any phase.
        if let Some(kind) = self.emergency_scan.scan(message) {
            let severity = emergency::derive_severity(kind, message);
            if let Err(error) = self.emergencies.log(
                &session.session_id,
                kind,
                severity,
                message,
                Some(EMERGENCY_RESPONSE),
            ) {
                warn!(%error, "emergency log write failed");
            }
            session.push_assistant(EMERGENCY_RESPONSE);
            return self.outcome(
                session,
                EMERGENCY_RESPONSE.to_string(),
                false,
                Disposition::Emergency { kind },
            );
        }

        // 3. Off-topic redirect, unless domain keywords vetoed it.
        if offtopic::is_off_topic(message) {
            session.push_assistant(OFF_TOPIC_RESPONSE);
            return self.outcome(
                session,
                OFF_TOPIC_RESPONSE.to_string(),
                false,
                Disposition::OffTopic,
            );
        }

        // Completed sessions only acknowledge; the case is already handed off.
        if session.phase == Phase::Completed {
            let response = prompts::fallback_for(Phase::Completed).to_string();
            session.push_assistant(&response);
            return self.outcome(session, response, false, Disposition::Chat);
        }

        // 4. Scoring. Only categories new to the session add weight, so the
        // cumulative score never decreases.
        let scored = self.scorer.score(message);
        session.absorb_signals(scored.signals.iter().map(|s| (s.category, s.weight)));
        let tier = scoring::tier_for(session.cumulative_score);

        // 5. Phase transitions.
        if session.consent_asked && !session.consent_given {
            match consent::parse(message) {
                ConsentAnswer::Yes => {
                    // Step 7 opens the report and flushes the buffer this
                    // same turn, now that consent_given is set.
                    session.grant_consent();
                    session.phase = Phase::Report;
                }
                ConsentAnswer::No => {
                    session.phase = Phase::Rejected;
                }
                // Unclear keeps the phase: consent re-asks, rejected stays
                // supportive. A clear yes later still opens the report.
                ConsentAnswer::Unclear => {}
            }
        } else if !session.consent_asked
            && tier >= IntentTier::PotentialReport
            && session.message_count >= self.config.min_messages_for_consent
        {
            session.consent_asked = true;
            session.phase = Phase::Consent;
        } else if !session.consent_asked && tier >= IntentTier::PotentialReport {
            // Report-worthy but too early to ask; keep gathering context.
            session.phase = Phase::Collect;
        } else if session.consent_given {
            session.phase = Phase::Report;
            self.refresh_labels(session).await;
        } else {
            session.phase = Phase::Curhat;
        }

        // 6. The model words the reply for whatever phase the turn landed on.
        let reply = self.client.reply(session.phase, &session.history).await;
        session.push_assistant(&reply.text);

        // 7. Only consented turns flow to durable storage.
        let persisted = session.consent_given && self.persist_pending(session);

        self.outcome(session, reply.text, persisted, Disposition::Chat)
    }

    /// Re-extract labels over the full history and finalize once the required
    /// fields are present. Runs only on consented turns.
    async fn refresh_labels(&self, session: &mut SessionContext) {
        let extracted = self.client.extract_labels(&session.history).await;
        session.labels.merge_from(extracted);

        let Some(report_id) = self.open_report(session) else {
            return;
        };
        if let Err(error) =
            self.reports
                .update_labels(&report_id, &session.labels, session.cumulative_score)
        {
            warn!(%error, "label update failed");
        }

        if session.labels.is_report_ready() {
            // Completion requires the durable submit to stick; otherwise the
            // session stays in report and retries next turn.
            match self.reports.submit(&report_id) {
                Ok(()) => {
                    session.phase = Phase::Completed;
                    info!(report_id = %report_id, "report submitted");
                }
                Err(error) => warn!(%error, "report submit failed"),
            }
        }
    }

    /// The durable report for this session, created on first use. A failed
    /// create is retried on the next consented turn.
    fn open_report(&self, session: &mut SessionContext) -> Option<ReportId> {
        if let Some(id) = session.report_id.clone() {
            return Some(id);
        }
        match self
            .reports
            .create(&session.session_id, &session.labels, session.cumulative_score)
        {
            Ok(row) => {
                session.attach_report(row.id.clone());
                Some(row.id)
            }
            Err(error) => {
                warn!(%error, "report create failed");
                None
            }
        }
    }

    /// Write turns not yet in the store. At the consent turn this flushes the
    /// whole buffered history; afterwards it appends incrementally.
    fn persist_pending(&self, session: &mut SessionContext) -> bool {
        let Some(report_id) = self.open_report(session) else {
            return false;
        };
        let pending = session.unpersisted();
        if pending.is_empty() {
            return true;
        }
        match self.reports.append_turns(&report_id, pending) {
            Ok(()) => {
                session.mark_persisted();
                true
            }
            Err(error) => {
                warn!(%error, "turn persistence failed, will retry next turn");
                false
            }
        }
    }

    /// Re-open durable storage for a restored, consented session. Prefers the
    /// draft the session opened before its state was lost and appends only
    /// the turns the store does not already hold.
    fn reopen_report(&self, session: &mut SessionContext) -> bool {
        let existing = match self.reports.latest_for_session(&session.session_id) {
            Ok(found) => found,
            Err(error) => {
                warn!(%error, "draft lookup failed during restore");
                None
            }
        };

        if let Some(row) = existing {
            session.labels = row.labels.clone();
            session.attach_report(row.id.clone());
            match self.reports.turns_for(&row.id) {
                Ok(stored) => {
                    let have = stored.len().min(session.history.len());
                    let missing = &session.history[have..];
                    if !missing.is_empty() {
                        if let Err(error) = self.reports.append_turns(&row.id, missing) {
                            warn!(%error, "restore flush failed");
                            return false;
                        }
                    }
                    session.mark_persisted();
                    true
                }
                Err(error) => {
                    warn!(%error, "stored turns unavailable during restore");
                    false
                }
            }
        } else {
            let Some(report_id) = self.open_report(session) else {
                return false;
            };
            if let Err(error) = self.reports.append_turns(&report_id, &session.history) {
                warn!(%error, "restore flush failed");
                return false;
            }
            session.mark_persisted();
            true
        }
    }

    fn outcome(
        &self,
        session: &SessionContext,
        response: String,
        persisted: bool,
        disposition: Disposition,
    ) -> TurnOutcome {
        TurnOutcome {
            response,
            phase: session.phase,
            tier: scoring::tier_for(session.cumulative_score),
            score: session.cumulative_score,
            message_count: session.message_count,
            session_id: session.session_id.clone(),
            persisted,
            consent_given: session.consent_given,
            report_id: session.report_id.clone(),
            disposition,
        }
    }
}
