//! Yes/no parsing for the consent question. The no-list is checked first:
//! hesitation words ("belum", "takut") must win over ambiguous overlaps like
//! "ya" appearing as a particle inside a refusal.

use crate::knowledge::normalize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentAnswer {
    Yes,
    No,
    Unclear,
}

static NO_WORDS: &[&str] = &[
    "tidak",
    "tak",
    "gak",
    "nggak",
    "ga",
    "enggak",
    "engga",
    "belum",
    "takut",
    "jangan",
    "ragu",
    "nanti",
    "no",
];

static YES_WORDS: &[&str] = &[
    "ya",
    "iya",
    "yes",
    "boleh",
    "mau",
    "bersedia",
    "oke",
    "ok",
    "okay",
    "setuju",
    "silakan",
    "ayo",
    "yuk",
    "lanjut",
    "siap",
    "baik",
    "bisa",
];

pub fn parse(message: &str) -> ConsentAnswer {
    let normalized = normalize(message);
    if normalized.is_empty() {
        return ConsentAnswer::Unclear;
    }
    let words: Vec<&str> = normalized.split(' ').collect();

    if NO_WORDS.iter().any(|w| words.contains(w)) {
        return ConsentAnswer::No;
    }
    if YES_WORDS.iter().any(|w| words.contains(w)) {
        return ConsentAnswer::Yes;
    }
    ConsentAnswer::Unclear
}
