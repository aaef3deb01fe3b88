//! Static knowledge base for common portal questions.
//!
//! Matching is deterministic and cheap: a message that hits a group here is
//! answered directly and never reaches scoring or the language model.

/// Alternative phrasings of one question mapped to one canned answer.
#[derive(Clone, Debug)]
pub struct KbGroup {
    pub category: &'static str,
    pub patterns: &'static [&'static str],
    pub response: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KbHit {
    pub category: &'static str,
    pub response: &'static str,
}

/// Patterns shorter than this may also match by word coverage.
const SHORT_PATTERN_LEN: usize = 15;
const WORD_COVERAGE: f32 = 0.8;

static KB_GROUPS: &[KbGroup] = &[
    KbGroup {
        category: "greeting",
        patterns: &[
            "halo",
            "hai",
            "selamat pagi",
            "selamat siang",
            "selamat sore",
            "selamat malam",
            "assalamualaikum",
            "permisi kak",
        ],
        response: "Halo! Selamat datang di layanan konsultasi dan pelaporan PPKS. \
                   Kamu bisa cerita apa saja di sini dan semuanya dijaga kerahasiaannya. \
                   Ada yang ingin kamu ceritakan?",
    },
    KbGroup {
        category: "about",
        patterns: &[
            "apa itu ppks",
            "apa itu satgas",
            "layanan apa ini",
            "ini layanan apa",
            "portal apa ini",
            "apa fungsi layanan ini",
        ],
        response: "Layanan ini adalah kanal resmi Satgas PPKS untuk konsultasi dan \
                   pelaporan kekerasan seksual di lingkungan kampus. Kamu bisa bercerita \
                   dulu tanpa harus langsung membuat laporan resmi.",
    },
    KbGroup {
        category: "reporting",
        patterns: &[
            "bagaimana cara melapor",
            "cara membuat laporan",
            "gimana cara lapor",
            "prosedur pelaporan",
            "cara lapor",
        ],
        response: "Untuk melapor, cukup ceritakan kejadiannya di sini. Kalau kamu setuju \
                   menjadikannya laporan resmi, kami akan menanyakan beberapa detail \
                   seperti siapa pelakunya dan kontak yang bisa dihubungi. Laporan hanya \
                   dibuat atas persetujuanmu.",
    },
    KbGroup {
        category: "privacy",
        patterns: &[
            "apakah identitas saya aman",
            "apakah rahasia",
            "siapa yang bisa melihat laporan saya",
            "apakah bisa anonim",
            "kerahasiaan data",
        ],
        response: "Identitasmu aman. Percakapan ini tidak disimpan sebagai laporan tanpa \
                   persetujuanmu, dan laporan resmi hanya dapat diakses oleh anggota \
                   Satgas PPKS yang berwenang.",
    },
    KbGroup {
        category: "timeline",
        patterns: &[
            "berapa lama prosesnya",
            "kapan ditindaklanjuti",
            "berapa lama laporan diproses",
            "prosesnya berapa lama",
        ],
        response: "Setelah laporan resmi masuk, Satgas PPKS biasanya menindaklanjuti \
                   dalam 3-7 hari kerja dan menghubungimu lewat kontak yang kamu berikan.",
    },
    KbGroup {
        category: "cost",
        patterns: &[
            "apakah bayar",
            "apakah gratis",
            "berapa biayanya",
            "ada biaya tidak",
        ],
        response: "Seluruh layanan ini gratis. Tidak ada biaya apa pun untuk konsultasi \
                   maupun pelaporan.",
    },
    KbGroup {
        category: "emergency_info",
        patterns: &[
            "nomor darurat",
            "kontak darurat",
            "nomor hotline",
            "nomor penting",
        ],
        response: "Dalam keadaan darurat hubungi 112. Untuk dukungan kesehatan jiwa ada \
                   layanan SEJIWA di 119 ekstensi 8. Satgas PPKS kampus juga bisa \
                   dihubungi melalui kontak resmi di situs universitas.",
    },
    KbGroup {
        category: "thanks",
        patterns: &[
            "terima kasih",
            "makasih banyak",
            "makasih",
            "oke makasih",
        ],
        response: "Sama-sama. Kalau ada yang ingin kamu ceritakan atau tanyakan lagi, \
                   aku di sini.",
    },
];

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize(message: &str) -> String {
    let lowered = message.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            out.push(ch);
            pending_space = false;
        } else {
            pending_space = true;
        }
    }
    out
}

/// Look a message up in the knowledge base. Groups are tried in declaration
/// order; the first matching group wins.
pub fn lookup(message: &str) -> Option<KbHit> {
    let normalized = normalize(message);
    if normalized.is_empty() {
        return None;
    }
    let words: Vec<&str> = normalized.split(' ').collect();

    for group in KB_GROUPS {
        for pattern in group.patterns {
            if pattern_matches(pattern, &normalized, &words) {
                return Some(KbHit {
                    category: group.category,
                    response: group.response,
                });
            }
        }
    }
    None
}

fn pattern_matches(pattern: &str, normalized: &str, words: &[&str]) -> bool {
    if normalized == pattern || normalized.contains(pattern) {
        return true;
    }
    if pattern.len() < SHORT_PATTERN_LEN {
        let pattern_words: Vec<&str> = pattern.split(' ').collect();
        let present = pattern_words.iter().filter(|w| words.contains(w)).count();
        return present as f32 / pattern_words.len() as f32 >= WORD_COVERAGE;
    }
    false
}

pub fn all_groups() -> &'static [KbGroup] {
    KB_GROUPS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Halo!! Apa kabar?"), "halo apa kabar");
        assert_eq!(normalize("  APA   itu, PPKS?  "), "apa itu ppks");
        assert_eq!(normalize("???"), "");
    }

    #[test]
    fn greeting_matches_exactly() {
        let hit = lookup("Halo!").unwrap();
        assert_eq!(hit.category, "greeting");
    }

    #[test]
    fn about_matches_with_punctuation() {
        let hit = lookup("apa itu PPKS?").unwrap();
        assert_eq!(hit.category, "about");
    }

    #[test]
    fn substring_containment_matches() {
        let hit = lookup("kak, bagaimana cara melapor ya?").unwrap();
        assert_eq!(hit.category, "reporting");
    }

    #[test]
    fn short_pattern_word_coverage_matches() {
        // "cara lapor" (10 chars, 2 words): both words present, different order.
        let hit = lookup("lapor itu bagaimana ya cara nya").unwrap();
        assert_eq!(hit.category, "reporting");
    }

    #[test]
    fn partial_word_coverage_does_not_match() {
        // Only "lapor" out of "cara lapor" appears; 50% is below the bar.
        assert!(lookup("saya ragu mau lapor").is_none());
    }

    #[test]
    fn disclosure_content_is_not_faq() {
        assert!(lookup("saya dilecehkan oleh dosen pembimbing saya").is_none());
        assert!(lookup("kemarin ada kejadian di kosan yang membuat saya takut").is_none());
    }

    #[test]
    fn first_group_wins() {
        // "halo" (greeting) before any later group that could also fire.
        let hit = lookup("halo, berapa lama prosesnya?").unwrap();
        assert_eq!(hit.category, "greeting");
    }

    #[test]
    fn empty_message_no_hit() {
        assert!(lookup("").is_none());
        assert!(lookup("...").is_none());
    }

    #[test]
    fn every_group_has_patterns_and_response() {
        for group in all_groups() {
            assert!(!group.patterns.is_empty(), "{} has no patterns", group.category);
            assert!(!group.response.is_empty(), "{} has no response", group.category);
        }
    }
}
