//! Crisis language detection. Runs before scoring and before any phase
//! logic; a hit short-circuits the whole pipeline into crisis resources.

use aduan_core::emergency::{EmergencyKind, Severity};
use regex::Regex;

use crate::knowledge::normalize;

/// Canned crisis response sent on every emergency hit. Kept static so the
/// path works with zero external dependencies.
pub const EMERGENCY_RESPONSE: &str =
    "Aku sangat peduli dengan keadaanmu sekarang. Kamu tidak sendirian, dan perasaan ini \
     bisa dibicarakan dengan orang yang siap membantu. Kalau kamu merasa dalam bahaya, \
     hubungi 112 sekarang. Untuk dukungan kesehatan jiwa, layanan SEJIWA di 119 ekstensi 8 \
     siap mendengarkan 24 jam. Kamu juga bisa menghubungi konselor kampus atau Satgas PPKS. \
     Aku tetap di sini kalau kamu mau terus bercerita.";

struct CrisisPhrase {
    phrase: &'static str,
    kind: EmergencyKind,
}

static CRISIS_PHRASES: &[CrisisPhrase] = &[
    // Suicidal ideation.
    CrisisPhrase { phrase: "bunuh diri", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "mau mati", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "ingin mati", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "pengen mati", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "mengakhiri hidup", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "mengakhiri semuanya", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "tidak ada gunanya hidup", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "hidup tidak ada artinya", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "lebih baik mati", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "want to die", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "kill myself", kind: EmergencyKind::Suicide },
    CrisisPhrase { phrase: "end my life", kind: EmergencyKind::Suicide },
    // Self-harm.
    CrisisPhrase { phrase: "menyakiti diri", kind: EmergencyKind::SelfHarm },
    CrisisPhrase { phrase: "melukai diri", kind: EmergencyKind::SelfHarm },
    CrisisPhrase { phrase: "menyilet tangan", kind: EmergencyKind::SelfHarm },
    CrisisPhrase { phrase: "hurt myself", kind: EmergencyKind::SelfHarm },
    CrisisPhrase { phrase: "self harm", kind: EmergencyKind::SelfHarm },
    // Immediate danger from someone else.
    CrisisPhrase { phrase: "diancam dibunuh", kind: EmergencyKind::Danger },
    CrisisPhrase { phrase: "mengancam membunuh", kind: EmergencyKind::Danger },
    CrisisPhrase { phrase: "mau dibunuh", kind: EmergencyKind::Danger },
    CrisisPhrase { phrase: "nyawa saya terancam", kind: EmergencyKind::Danger },
    CrisisPhrase { phrase: "nyawaku terancam", kind: EmergencyKind::Danger },
];

/// Immediacy cues that raise severity to critical regardless of kind.
static IMMEDIACY_CUES: &[&str] = &[
    "sekarang",
    "malam ini",
    "sudah kuputuskan",
    "sudah saya putuskan",
    "sudah aku putuskan",
    "right now",
    "tonight",
    "already decided",
];

pub struct EmergencyScan {
    negations: Vec<Regex>,
}

impl EmergencyScan {
    pub fn new() -> Self {
        // Negation patterns run first: a match anywhere in the message means
        // the crisis phrasing is being denied, not expressed.
        let negations = [
            r"\b(?:tidak|tak|gak|nggak|ga|enggak) (?:ingin|mau|pengen|akan) (?:mati|bunuh diri|mengakhiri hidup|menyakiti diri|melukai diri)",
            r"\b(?:tidak|tak|gak|nggak|ga|enggak) (?:berniat|berpikir|kepikiran) (?:untuk )?(?:mati|bunuh diri|menyakiti diri)",
            r"\b(?:do not|don t|dont) want to (?:die|kill myself|hurt myself)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect();

        Self { negations }
    }

    /// Returns the kind of crisis language found, or `None` for negated or
    /// crisis-free messages.
    pub fn scan(&self, message: &str) -> Option<EmergencyKind> {
        let normalized = normalize(message);
        if normalized.is_empty() {
            return None;
        }
        if self.negations.iter().any(|p| p.is_match(&normalized)) {
            return None;
        }

        let padded = format!(" {normalized} ");
        CRISIS_PHRASES
            .iter()
            .find(|c| padded.contains(&format!(" {} ", c.phrase)))
            .map(|c| c.kind)
    }
}

impl Default for EmergencyScan {
    fn default() -> Self {
        Self::new()
    }
}

/// Severity for the emergency log: immediacy cues override the kind default.
pub fn derive_severity(kind: EmergencyKind, trigger: &str) -> Severity {
    let normalized = normalize(trigger);
    let padded = format!(" {normalized} ");
    let immediate = IMMEDIACY_CUES
        .iter()
        .any(|cue| padded.contains(&format!(" {cue} ")));
    if immediate {
        return Severity::Critical;
    }
    match kind {
        EmergencyKind::Suicide | EmergencyKind::Danger => Severity::High,
        EmergencyKind::SelfHarm => Severity::Medium,
    }
}
