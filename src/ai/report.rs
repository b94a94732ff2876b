// src/ai/report.rs
use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Severity tier attached to a triage report.
///
/// The endpoint is asked for one of the four known tags, but an unrecognized
/// tag is passed through as `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
    Other(String),
}

impl Urgency {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "low" => Urgency::Low,
            "medium" => Urgency::Medium,
            "high" => Urgency::High,
            "critical" => Urgency::Critical,
            other => Urgency::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
            Urgency::Other(tag) => tag,
        }
    }

    /// RGB used for the urgency badge in the GUI.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Urgency::Low => (16, 185, 129),
            Urgency::Medium => (251, 191, 36),
            Urgency::High => (249, 115, 22),
            Urgency::Critical => (244, 63, 94),
            Urgency::Other(_) => (148, 163, 184),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Urgency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Urgency::from_tag(&tag))
    }
}

/// Structured diagnostic opinion returned by the vision model.
///
/// All five fields are required; a reply missing any of them fails to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageReport {
    /// Primary suspected condition, or an explicit insufficient-image message.
    pub diagnosis: String,
    /// Alternative candidate conditions, ordered; may be empty.
    pub differential_diagnosis: Vec<String>,
    /// Observed visual findings and inferential logic, markdown-formatted.
    pub reasoning: String,
    /// Suggested next actions, ordered.
    pub recommendations: Vec<String>,
    pub urgency: Urgency,
}

impl TriageReport {
    /// Plain-text rendering used by the CLI output and the clipboard copy.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Diagnosis: {}\n", self.diagnosis));
        out.push_str(&format!("Urgency: {}\n", self.urgency));
        if !self.differential_diagnosis.is_empty() {
            out.push_str("\nDifferential diagnosis:\n");
            for (i, candidate) in self.differential_diagnosis.iter().enumerate() {
                out.push_str(&format!("  {}. {}\n", i + 1, candidate));
            }
        }
        out.push_str(&format!("\nReasoning:\n{}\n", self.reasoning));
        if !self.recommendations.is_empty() {
            out.push_str("\nRecommendations:\n");
            for recommendation in &self.recommendations {
                out.push_str(&format!("  - {}\n", recommendation));
            }
        }
        out
    }
}

/// Parse the endpoint's reply text into a report.
///
/// Empty bodies, malformed JSON and replies missing required fields are all
/// rejected. Field values are not validated semantically.
pub fn parse_report(body: &str) -> Result<TriageReport> {
    let text = strip_code_fence(body);
    if text.is_empty() {
        return Err(anyhow!("empty response body"));
    }
    serde_json::from_str(text).map_err(|e| anyhow!("malformed triage reply: {}", e))
}

// Models sometimes wrap the JSON in a markdown fence despite the
// response-format hint.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(inner) = trimmed.strip_prefix("```") {
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        let inner = inner.strip_suffix("```").unwrap_or(inner);
        inner.trim()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_report, TriageReport, Urgency};
    use pretty_assertions::assert_eq;

    const IMPETIGO_REPLY: &str = r#"{
        "diagnosis": "Impetigo",
        "differentialDiagnosis": ["Cellulitis", "Eczema"],
        "reasoning": "Honey-colored crusting over erythematous base.",
        "recommendations": ["Bacterial culture", "Topical antibiotic"],
        "urgency": "medium"
    }"#;

    #[test]
    fn parses_a_complete_reply() {
        let report = parse_report(IMPETIGO_REPLY).expect("parse");
        assert_eq!(report.diagnosis, "Impetigo");
        assert_eq!(
            report.differential_diagnosis,
            vec!["Cellulitis".to_string(), "Eczema".to_string()]
        );
        assert_eq!(
            report.recommendations,
            vec!["Bacterial culture".to_string(), "Topical antibiotic".to_string()]
        );
        assert_eq!(report.urgency, Urgency::Medium);
    }

    #[test]
    fn empty_body_fails() {
        assert!(parse_report("").is_err());
        assert!(parse_report("   \n").is_err());
    }

    #[test]
    fn malformed_json_fails() {
        assert!(parse_report("the lesion looks bacterial").is_err());
        assert!(parse_report("{\"diagnosis\": ").is_err());
    }

    #[test]
    fn missing_required_fields_fail() {
        assert!(parse_report("{}").is_err());
        assert!(parse_report(r#"{"diagnosis": "Impetigo"}"#).is_err());
    }

    #[test]
    fn fenced_reply_still_parses() {
        let fenced = format!("```json\n{}\n```", IMPETIGO_REPLY);
        let report = parse_report(&fenced).expect("parse fenced");
        assert_eq!(report.diagnosis, "Impetigo");
    }

    #[test]
    fn unknown_urgency_tag_is_passed_through() {
        let reply = IMPETIGO_REPLY.replace("\"medium\"", "\"urgent\"");
        let report = parse_report(&reply).expect("parse");
        assert_eq!(report.urgency, Urgency::Other("urgent".to_string()));
        assert_eq!(report.urgency.as_str(), "urgent");
    }

    #[test]
    fn empty_differential_list_is_allowed() {
        let reply = r#"{
            "diagnosis": "Not a clinical image",
            "differentialDiagnosis": [],
            "reasoning": "The photo does not show skin or mucosa.",
            "recommendations": [],
            "urgency": "low"
        }"#;
        let report = parse_report(reply).expect("parse");
        assert!(report.differential_diagnosis.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let report = parse_report(IMPETIGO_REPLY).expect("parse");
        let value = serde_json::to_value(&report).expect("to_value");
        assert!(value.get("differentialDiagnosis").is_some());
        assert_eq!(value["urgency"], "medium");
    }

    #[test]
    fn plain_text_rendering_lists_all_sections() {
        let report: TriageReport = serde_json::from_str(IMPETIGO_REPLY).expect("parse");
        let text = report.to_plain_text();
        assert!(text.contains("Diagnosis: Impetigo"));
        assert!(text.contains("1. Cellulitis"));
        assert!(text.contains("- Topical antibiotic"));
        assert!(text.contains("Urgency: medium"));
    }
}
