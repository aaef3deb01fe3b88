//! Non-AI intent scoring: layered keyword and pattern rules that grade a
//! message for report-worthy content. Weights and phrase lists are data, not
//! code, so they can be tuned without touching the pipeline.

use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::knowledge::normalize;

/// One keyword category contributing a fixed weight the first time any of its
/// keywords appears in a message.
#[derive(Clone, Debug)]
pub struct KeywordCategory {
    pub name: &'static str,
    pub weight: u32,
    pub keywords: &'static [&'static str],
}

pub const WEIGHT_VIOLENCE: u32 = 5;
pub const WEIGHT_PERPETRATOR: u32 = 3;
pub const WEIGHT_HELP_SEEKING: u32 = 3;
pub const WEIGHT_SELF_REFERENCE: u32 = 3;
pub const WEIGHT_TIME: u32 = 2;
pub const WEIGHT_LOCATION: u32 = 2;
pub const WEIGHT_DISTRESS: u32 = 1;

static KEYWORD_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        name: "violence",
        weight: WEIGHT_VIOLENCE,
        keywords: &[
            "dilecehkan",
            "pelecehan",
            "melecehkan",
            "diperkosa",
            "perkosaan",
            "memperkosa",
            "dicabuli",
            "mencabuli",
            "cabul",
            "diraba",
            "meraba",
            "digerayangi",
            "kekerasan seksual",
            "dicium paksa",
            "dipeluk paksa",
            "catcalling",
            "disiuli",
            "intimidasi seksual",
        ],
    },
    KeywordCategory {
        name: "perpetrator",
        weight: WEIGHT_PERPETRATOR,
        keywords: &[
            "dosen",
            "pembimbing",
            "kakak tingkat",
            "kating",
            "senior",
            "teman sekelas",
            "pacar",
            "mantan",
            "staf",
            "karyawan",
            "satpam",
            "asisten lab",
            "pelatih",
            "pembina",
        ],
    },
    KeywordCategory {
        name: "help_seeking",
        weight: WEIGHT_HELP_SEEKING,
        keywords: &[
            "tolong",
            "bantu",
            "minta bantuan",
            "butuh bantuan",
            "harus bagaimana",
            "harus gimana",
            "apa yang harus",
            "mohon bantuan",
        ],
    },
    KeywordCategory {
        name: "time_reference",
        weight: WEIGHT_TIME,
        keywords: &[
            "kemarin",
            "tadi",
            "barusan",
            "semalam",
            "minggu lalu",
            "bulan lalu",
            "semester lalu",
            "beberapa hari",
            "waktu itu",
            "kejadiannya",
        ],
    },
    KeywordCategory {
        name: "location",
        weight: WEIGHT_LOCATION,
        keywords: &[
            "di kampus",
            "di kelas",
            "di lab",
            "di perpustakaan",
            "di kosan",
            "di kos",
            "di asrama",
            "di sekretariat",
            "di parkiran",
            "di kantin",
            "di gedung",
            "di ruang",
        ],
    },
    KeywordCategory {
        name: "distress",
        weight: WEIGHT_DISTRESS,
        keywords: &[
            "takut",
            "trauma",
            "malu",
            "sedih",
            "bingung",
            "cemas",
            "khawatir",
            "tertekan",
            "stres",
            "menangis",
            "nangis",
            "gemetar",
            "tidak berani",
        ],
    },
];

/// Severity band derived from a score with the shared banding function.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IntentTier {
    Faq,
    Casual,
    Curhat,
    PotentialReport,
    StrongReport,
}

pub const TIER_CASUAL_MIN: u32 = 1;
pub const TIER_CURHAT_MIN: u32 = 4;
pub const TIER_POTENTIAL_MIN: u32 = 7;
pub const TIER_STRONG_MIN: u32 = 10;

/// Banding is shared between per-message tiers and the session's cumulative
/// tier. Bands are contiguous and monotonic.
pub fn tier_for(score: u32) -> IntentTier {
    match score {
        0 => IntentTier::Faq,
        s if s >= TIER_STRONG_MIN => IntentTier::StrongReport,
        s if s >= TIER_POTENTIAL_MIN => IntentTier::PotentialReport,
        s if s >= TIER_CURHAT_MIN => IntentTier::Curhat,
        _ => IntentTier::Casual,
    }
}

impl fmt::Display for IntentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentTier::Faq => "faq",
            IntentTier::Casual => "casual",
            IntentTier::Curhat => "curhat",
            IntentTier::PotentialReport => "potential_report",
            IntentTier::StrongReport => "strong_report",
        };
        f.write_str(s)
    }
}

/// A single weighted match. `category` doubles as the session-level dedup key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signal {
    pub category: &'static str,
    pub weight: u32,
}

#[derive(Clone, Debug)]
pub struct MessageScore {
    pub score: u32,
    pub tier: IntentTier,
    pub signals: Vec<Signal>,
}

pub struct IntentScorer {
    self_reference: Regex,
    implicit_violence: Vec<Regex>,
}

impl IntentScorer {
    pub fn new() -> Self {
        // Patterns run against normalized text: lowercase, single spaces.
        let self_reference = Regex::new(
            r"\bi (?:was|got|have been|am being) (?:being )?\w+ed\b",
        )
        .expect("static pattern");

        let implicit_violence = [
            // Insistence after an explicit refusal.
            r"(?:sudah|udah) (?:menolak|bilang (?:tidak|gak|enggak)).*(?:tetap|terus|masih) (?:memaksa|maksa|mendesak|mengajak|melakukan)",
            // Threats conditioned on compliance.
            r"(?:mengancam|diancam|ancaman).*(?:kalau|jika|bila) (?:saya |aku )?(?:tidak|gak|nggak|ga) (?:mau|nurut|menurut|ikut)",
            r"(?:kalau|jika|bila) (?:saya |aku )?(?:tidak|gak|nggak|ga) (?:mau|nurut|menurut|ikut).*(?:diancam|mengancam|nilai jelek|tidak lulus|tidak diluluskan)",
            // Non-consensual sharing of intimate media.
            r"(?:menyebarkan|disebarkan|disebar|membagikan|menyebarluaskan) (?:foto|video|gambar)",
            r"(?:foto|video|gambar).*(?:disebar|disebarkan|dibagikan|diunggah) (?:tanpa izin|tanpa persetujuan|ke mana mana|diam diam)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect();

        Self { self_reference, implicit_violence }
    }

    /// Score one message in isolation. Each category fires at most once.
    pub fn score(&self, message: &str) -> MessageScore {
        let normalized = normalize(message);
        let mut signals = Vec::new();

        // Layer 1: keyword categories.
        for category in KEYWORD_CATEGORIES {
            let hit = category.keywords.iter().any(|k| normalized.contains(k));
            if hit {
                signals.push(Signal { category: category.name, weight: category.weight });
            }
        }

        // Layer 2: self-referential passive voice carries its own weight.
        if self.self_reference.is_match(&normalized) {
            signals.push(Signal { category: "self_reference", weight: WEIGHT_SELF_REFERENCE });
        }

        // Layer 2: implicit violence counts as the violence category, but only
        // when layer 1 did not already find an explicit violence keyword.
        let has_violence = signals.iter().any(|s| s.category == "violence");
        if !has_violence && self.implicit_violence.iter().any(|p| p.is_match(&normalized)) {
            signals.push(Signal { category: "violence", weight: WEIGHT_VIOLENCE });
        }

        let score = signals.iter().map(|s| s.weight).sum();
        MessageScore { score, tier: tier_for(score), signals }
    }
}

impl Default for IntentScorer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn all_categories() -> &'static [KeywordCategory] {
    KEYWORD_CATEGORIES
}
