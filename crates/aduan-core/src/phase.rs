use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Conversation phase of a triage session.
///
/// `Curhat` (venting/listening) is the entry phase. `Collect` gathers detail
/// once report-worthy intent shows, `Consent` asks permission to treat the
/// conversation as an official report, and `Report` gathers the structured
/// fields. `Rejected` keeps listening and still accepts a later clear yes;
/// only `Completed` stops transitioning.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Curhat,
    Collect,
    Consent,
    Report,
    Rejected,
    Completed,
}

impl Phase {
    /// Whether the phase machine is done. A rejected session is not: consent
    /// granted later still moves it to `Report`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Curhat => "curhat",
            Phase::Collect => "collect",
            Phase::Consent => "consent",
            Phase::Report => "report",
            Phase::Rejected => "rejected",
            Phase::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "curhat" => Ok(Phase::Curhat),
            "collect" => Ok(Phase::Collect),
            "consent" => Ok(Phase::Consent),
            "report" => Ok(Phase::Report),
            "rejected" => Ok(Phase::Rejected),
            "completed" => Ok(Phase::Completed),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}
