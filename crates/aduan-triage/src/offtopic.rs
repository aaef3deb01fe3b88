//! Generic off-topic detection, gated by a domain override list so a message
//! that mentions harassment or violence is never redirected away. Both lists
//! are tunable policy, not a fixed contract.

use crate::knowledge::normalize;

pub const OFF_TOPIC_RESPONSE: &str =
    "Maaf, aku hanya bisa menemani hal-hal seputar pengalaman atau laporan kekerasan \
     seksual di lingkungan kampus. Kalau ada yang ingin kamu ceritakan soal itu, aku \
     siap mendengarkan.";

/// Domain words matched by prefix: "leceh" also covers "dilecehkan" and
/// "pelecehan". Any hit here vetoes the off-topic classification.
static DOMAIN_OVERRIDES: &[&str] = &[
    "leceh",
    "cabul",
    "perkosa",
    "paksa",
    "ancam",
    "raba",
    "kekerasan",
    "seksual",
    "dosen",
    "senior",
    "pembimbing",
    "lapor",
    "ppks",
    "satgas",
    "korban",
    "trauma",
    "takut",
    "tolong",
    "bantu",
    "curhat",
    "cerita",
    "kejadian",
];

/// Out-of-domain words matched as whole words.
static OFF_TOPIC_KEYWORDS: &[&str] = &[
    "main game",
    "game online",
    "mabar",
    "tugas kuliah",
    "pr matematika",
    "jual",
    "beli",
    "promo",
    "diskon",
    "bitcoin",
    "crypto",
    "saham",
    "judi",
    "sepak bola",
    "bola",
    "drakor",
    "film",
    "lagu",
    "lirik",
    "resep",
    "masak",
    "cuaca",
    "politik",
    "pemilu",
    "zodiak",
];

pub fn is_off_topic(message: &str) -> bool {
    let normalized = normalize(message);
    if normalized.is_empty() {
        return false;
    }
    if DOMAIN_OVERRIDES.iter().any(|d| normalized.contains(d)) {
        return false;
    }
    let padded = format!(" {normalized} ");
    OFF_TOPIC_KEYWORDS
        .iter()
        .any(|k| padded.contains(&format!(" {k} ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_off_topic_detected() {
        assert!(is_off_topic("rekomendasi game online dong"));
        assert!(is_off_topic("bagaimana cuaca hari ini"));
        assert!(is_off_topic("ramalan zodiak scorpio minggu ini"));
    }

    #[test]
    fn domain_override_wins() {
        // Carries an off-topic word, but "leceh"/"dosen" veto the redirect.
        assert!(!is_off_topic("habis main game saya dilecehkan teman"));
        assert!(!is_off_topic("dosen saya membahas politik lalu menyentuh saya, saya takut"));
    }

    #[test]
    fn on_topic_never_flagged() {
        assert!(!is_off_topic("saya mau cerita tentang kejadian kemarin"));
        assert!(!is_off_topic("saya takut melapor"));
    }

    #[test]
    fn whole_word_matching_for_off_topic() {
        // "bola" inside another word does not count.
        assert!(!is_off_topic("dia bolak balik menghampiri saya"));
    }

    #[test]
    fn empty_is_not_off_topic() {
        assert!(!is_off_topic(""));
        assert!(!is_off_topic("!!!"));
    }
}
