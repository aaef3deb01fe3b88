use serde::{Deserialize, Serialize};

/// One extracted report field with the model's self-reported confidence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LabelField {
    pub value: String,
    pub confidence: f32,
}

impl LabelField {
    pub fn new(value: impl Into<String>, confidence: f32) -> Self {
        Self { value: value.into(), confidence }
    }
}

/// Structured fields extracted from a report conversation.
///
/// Every field is independently optional; merge precedence is per-field so a
/// later extraction can fill gaps without clobbering established answers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseLabels {
    pub perpetrator: Option<LabelField>,
    pub incident_time: Option<LabelField>,
    pub location: Option<LabelField>,
    pub detail: Option<LabelField>,
    pub concern_level: Option<LabelField>,
    pub age_range: Option<LabelField>,
    pub gender: Option<LabelField>,
    pub email: Option<LabelField>,
    pub phone: Option<LabelField>,
}

impl CaseLabels {
    /// Merge a newer extraction into this one, field by field. A newer value
    /// wins only when non-empty and at least as long as the current value,
    /// so re-extraction over the same history cannot erase detail.
    pub fn merge_from(&mut self, newer: CaseLabels) {
        merge_field(&mut self.perpetrator, newer.perpetrator);
        merge_field(&mut self.incident_time, newer.incident_time);
        merge_field(&mut self.location, newer.location);
        merge_field(&mut self.detail, newer.detail);
        merge_field(&mut self.concern_level, newer.concern_level);
        merge_field(&mut self.age_range, newer.age_range);
        merge_field(&mut self.gender, newer.gender);
        merge_field(&mut self.email, newer.email);
        merge_field(&mut self.phone, newer.phone);
    }

    /// A report can be finalized once it names somebody, describes something,
    /// and carries at least one way to reach the reporter back.
    pub fn is_report_ready(&self) -> bool {
        self.perpetrator.is_some()
            && self.detail.is_some()
            && (self.email.is_some() || self.phone.is_some())
    }

    /// Required fields still missing, in the order the assistant should ask.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.perpetrator.is_none() {
            missing.push("perpetrator");
        }
        if self.detail.is_none() {
            missing.push("detail");
        }
        if self.email.is_none() && self.phone.is_none() {
            missing.push("contact");
        }
        missing
    }

    pub fn filled_count(&self) -> usize {
        [
            self.perpetrator.is_some(),
            self.incident_time.is_some(),
            self.location.is_some(),
            self.detail.is_some(),
            self.concern_level.is_some(),
            self.age_range.is_some(),
            self.gender.is_some(),
            self.email.is_some(),
            self.phone.is_some(),
        ]
        .iter()
        .filter(|&&f| f)
        .count()
    }
}

fn merge_field(current: &mut Option<LabelField>, newer: Option<LabelField>) {
    let Some(new) = newer else { return };
    if new.value.trim().is_empty() {
        return;
    }
    match current {
        Some(old) if new.value.len() < old.value.len() => {}
        _ => *current = Some(new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_fills_empty_fields() {
        let mut labels = CaseLabels::default();
        labels.merge_from(CaseLabels {
            perpetrator: Some(LabelField::new("dosen pembimbing", 0.9)),
            ..Default::default()
        });
        assert_eq!(labels.perpetrator.as_ref().unwrap().value, "dosen pembimbing");
    }

    #[test]
    fn merge_keeps_longer_existing_value() {
        let mut labels = CaseLabels {
            detail: Some(LabelField::new("dipaksa bertemu di luar kampus berkali-kali", 0.8)),
            ..Default::default()
        };
        labels.merge_from(CaseLabels {
            detail: Some(LabelField::new("dipaksa bertemu", 0.9)),
            ..Default::default()
        });
        assert_eq!(
            labels.detail.as_ref().unwrap().value,
            "dipaksa bertemu di luar kampus berkali-kali"
        );
    }

    #[test]
    fn merge_overwrites_with_longer_value() {
        let mut labels = CaseLabels {
            location: Some(LabelField::new("kampus", 0.5)),
            ..Default::default()
        };
        labels.merge_from(CaseLabels {
            location: Some(LabelField::new("gedung fakultas teknik lantai 3", 0.8)),
            ..Default::default()
        });
        assert_eq!(
            labels.location.as_ref().unwrap().value,
            "gedung fakultas teknik lantai 3"
        );
    }

    #[test]
    fn merge_ignores_empty_values() {
        let mut labels = CaseLabels {
            email: Some(LabelField::new("a@kampus.ac.id", 0.9)),
            ..Default::default()
        };
        labels.merge_from(CaseLabels {
            email: Some(LabelField::new("   ", 0.9)),
            ..Default::default()
        });
        assert_eq!(labels.email.as_ref().unwrap().value, "a@kampus.ac.id");
    }

    #[test]
    fn report_ready_requires_contact() {
        let mut labels = CaseLabels {
            perpetrator: Some(LabelField::new("senior organisasi", 0.8)),
            detail: Some(LabelField::new("memaksa bertemu", 0.8)),
            ..Default::default()
        };
        assert!(!labels.is_report_ready());
        assert_eq!(labels.missing_required(), vec!["contact"]);

        labels.phone = Some(LabelField::new("0812000111", 0.9));
        assert!(labels.is_report_ready());
        assert!(labels.missing_required().is_empty());
    }

    #[test]
    fn missing_required_lists_all_gaps() {
        let labels = CaseLabels::default();
        assert_eq!(labels.missing_required(), vec!["perpetrator", "detail", "contact"]);
        assert_eq!(labels.filled_count(), 0);
    }

    #[test]
    fn serde_roundtrip() {
        let labels = CaseLabels {
            perpetrator: Some(LabelField::new("staf rektorat", 0.7)),
            email: Some(LabelField::new("pelapor@mail.com", 1.0)),
            ..Default::default()
        };
        let json = serde_json::to_string(&labels).unwrap();
        let parsed: CaseLabels = serde_json::from_str(&json).unwrap();
        assert_eq!(labels, parsed);
    }
}
