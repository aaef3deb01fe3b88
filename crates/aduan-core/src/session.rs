use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::ids::ReportId;
use crate::labels::CaseLabels;
use crate::phase::Phase;
use crate::turns::{ChatTurn, Role};

/// Per-session triage state. Lives in memory only; nothing here touches
/// durable storage until `report_id` is set by the consent flow.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub session_id: String,
    pub phase: Phase,
    pub message_count: u32,
    /// Sum of first-occurrence signal weights. Never decreases.
    pub cumulative_score: u32,
    /// Signal categories already counted for this session.
    pub detected_signals: BTreeSet<String>,
    pub consent_asked: bool,
    pub consent_given: bool,
    pub consent_at: Option<DateTime<Utc>>,
    pub labels: CaseLabels,
    pub history: Vec<ChatTurn>,
    /// Durable report session, present only after explicit consent.
    pub report_id: Option<ReportId>,
    /// How many turns of `history` have been written out. The one-time flush
    /// and the per-turn incremental write are both `history[persisted_turns..]`.
    pub persisted_turns: usize,
    pub last_activity: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            phase: Phase::Curhat,
            message_count: 0,
            cumulative_score: 0,
            detected_signals: BTreeSet::new(),
            consent_asked: false,
            consent_given: false,
            consent_at: None,
            labels: CaseLabels::default(),
            history: Vec::new(),
            report_id: None,
            persisted_turns: 0,
            last_activity: Utc::now(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn::user(content));
        self.message_count += 1;
        self.last_activity = Utc::now();
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn::assistant(content));
        self.last_activity = Utc::now();
    }

    /// Accumulate a message's signals; only categories not yet seen in this
    /// session contribute their weight.
    pub fn absorb_signals<'a>(&mut self, signals: impl IntoIterator<Item = (&'a str, u32)>) {
        for (name, weight) in signals {
            if !self.detected_signals.contains(name) {
                self.detected_signals.insert(name.to_string());
                self.cumulative_score += weight;
            }
        }
    }

    pub fn grant_consent(&mut self) {
        self.consent_given = true;
        self.consent_at = Some(Utc::now());
    }

    /// Attach the durable report session. Separate from `grant_consent` so a
    /// failed create can be retried on a later turn without re-consenting.
    pub fn attach_report(&mut self, report_id: ReportId) {
        self.report_id = Some(report_id);
    }

    /// Turns not yet written to the report store.
    pub fn unpersisted(&self) -> &[ChatTurn] {
        &self.history[self.persisted_turns..]
    }

    pub fn mark_persisted(&mut self) {
        self.persisted_turns = self.history.len();
    }

    pub fn user_turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.history.iter().filter(|t| t.role == Role::User)
    }

    pub fn idle_since(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }
}
