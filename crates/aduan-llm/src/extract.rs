//! Turns a model's extraction reply into [`CaseLabels`].
//!
//! Models asked for "only JSON" still wrap it in code fences, lead with
//! prose, or leave trailing commas. Everything here is salvage: any reply we
//! cannot parse becomes an empty label set, never an error.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use aduan_core::labels::{CaseLabels, LabelField};

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("static pattern"))
}

/// Strips fences, control characters, and surrounding prose, leaving the
/// first `{` through the last `}`. Returns an empty string when no object
/// is present at all.
fn sanitize(raw: &str) -> String {
    let unfenced: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let cleaned: String = unfenced
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let Some(start) = cleaned.find('{') else {
        return String::new();
    };
    let Some(end) = cleaned.rfind('}') else {
        return String::new();
    };
    if end < start {
        return String::new();
    }

    trailing_comma_re()
        .replace_all(&cleaned[start..=end], "$1")
        .into_owned()
}

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    perpetrator: Option<RawField>,
    incident_time: Option<RawField>,
    location: Option<RawField>,
    detail: Option<RawField>,
    concern_level: Option<RawField>,
    age_range: Option<RawField>,
    gender: Option<RawField>,
    email: Option<RawField>,
    phone: Option<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    value: Option<String>,
    #[serde(default)]
    confidence: f32,
}

fn field(raw: Option<RawField>) -> Option<LabelField> {
    let raw = raw?;
    let value = raw.value?.trim().to_string();
    if value.is_empty() {
        return None;
    }
    Some(LabelField::new(value, raw.confidence.clamp(0.0, 1.0)))
}

/// Best-effort parse of an extraction reply. Unparseable replies come back
/// as [`CaseLabels::default`].
pub fn parse_labels(raw: &str) -> CaseLabels {
    let sanitized = sanitize(raw);
    if sanitized.is_empty() {
        warn!("extraction reply contained no JSON object");
        return CaseLabels::default();
    }

    let extraction: RawExtraction = match serde_json::from_str(&sanitized) {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(error = %e, "extraction reply was not valid JSON");
            return CaseLabels::default();
        }
    };

    CaseLabels {
        perpetrator: field(extraction.perpetrator),
        incident_time: field(extraction.incident_time),
        location: field(extraction.location),
        detail: field(extraction.detail),
        concern_level: field(extraction.concern_level),
        age_range: field(extraction.age_range),
        gender: field(extraction.gender),
        email: field(extraction.email),
        phone: field(extraction.phone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{
        "perpetrator": {"value": "dosen pembimbing", "confidence": 0.9},
        "incident_time": {"value": "kemarin sore", "confidence": 0.8},
        "location": {"value": "ruang dosen", "confidence": 0.7},
        "detail": {"value": "dipegang tanpa persetujuan saat bimbingan", "confidence": 0.85},
        "concern_level": null,
        "age_range": null,
        "gender": null,
        "email": {"value": "anon@kampus.ac.id", "confidence": 1.0},
        "phone": null
    }"#;

    #[test]
    fn clean_json_parses() {
        let labels = parse_labels(CLEAN);
        assert_eq!(labels.perpetrator.as_ref().unwrap().value, "dosen pembimbing");
        assert_eq!(labels.email.as_ref().unwrap().confidence, 1.0);
        assert!(labels.concern_level.is_none());
        assert!(labels.is_report_ready());
    }

    #[test]
    fn fenced_json_parses() {
        let fenced = format!("```json\n{CLEAN}\n```");
        let labels = parse_labels(&fenced);
        assert_eq!(labels.location.as_ref().unwrap().value, "ruang dosen");
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let wrapped = format!("Berikut hasil ekstraksinya:\n{CLEAN}\nSemoga membantu!");
        let labels = parse_labels(&wrapped);
        assert_eq!(labels.incident_time.as_ref().unwrap().value, "kemarin sore");
    }

    #[test]
    fn trailing_commas_are_tolerated() {
        let raw = r#"{
            "perpetrator": {"value": "senior", "confidence": 0.6,},
            "detail": {"value": "diancam", "confidence": 0.5},
        }"#;
        let labels = parse_labels(raw);
        assert_eq!(labels.perpetrator.as_ref().unwrap().value, "senior");
        assert_eq!(labels.detail.as_ref().unwrap().value, "diancam");
    }

    #[test]
    fn null_and_empty_values_are_dropped() {
        let raw = r#"{
            "perpetrator": {"value": null, "confidence": 0.9},
            "location": {"value": "   ", "confidence": 0.9},
            "detail": {"value": "x", "confidence": 0.9}
        }"#;
        let labels = parse_labels(raw);
        assert!(labels.perpetrator.is_none());
        assert!(labels.location.is_none());
        assert_eq!(labels.filled_count(), 1);
    }

    #[test]
    fn garbage_becomes_empty_labels() {
        assert_eq!(parse_labels("maaf, aku tidak bisa"), CaseLabels::default());
        assert_eq!(parse_labels(""), CaseLabels::default());
        assert_eq!(parse_labels("{not json at all"), CaseLabels::default());
    }

    #[test]
    fn confidence_is_clamped() {
        let raw = r#"{"detail": {"value": "ya", "confidence": 3.5}}"#;
        let labels = parse_labels(raw);
        assert_eq!(labels.detail.unwrap().confidence, 1.0);
    }

    #[test]
    fn values_are_trimmed() {
        let raw = r#"{"phone": {"value": "  0812768     ", "confidence": 0.4}}"#;
        assert_eq!(parse_labels(raw).phone.unwrap().value, "0812768");
    }
}
