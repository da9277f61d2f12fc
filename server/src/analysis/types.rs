use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use super::lenient;
use super::parse::ParsedResponse;
use crate::db::models::{Metric, RecordCategory};

/// Structured reading of an uploaded medical document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, deserialize_with = "lenient::value_list")]
    pub abnormal_values: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        alias = "answerToUser",
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub answer_to_user: Option<String>,
    #[serde(default, deserialize_with = "lenient::metrics")]
    pub metrics: Vec<Metric>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub recommendations: Vec<String>,
}

impl DocumentReport {
    /// Substituted when the model could not be reached at all.
    pub fn analysis_unavailable() -> Self {
        Self {
            title: Some("Uploaded Document".to_string()),
            document_type: Some("Other".to_string()),
            provider: Some("Unknown".to_string()),
            date: None,
            summary: Some("AI analysis failed. Document uploaded successfully.".to_string()),
            ..Default::default()
        }
    }
}

/// Model reply that could not be read as JSON at any stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFallback {
    pub raw: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Low,
    #[default]
    Moderate,
    High,
    Critical,
}

impl<'de> Deserialize<'de> for SeverityLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = lenient::opt_string(deserializer)?.unwrap_or_default();
        Ok(match text.to_lowercase().as_str() {
            "low" | "mild" => SeverityLevel::Low,
            "high" | "severe" => SeverityLevel::High,
            "critical" | "emergency" => SeverityLevel::Critical,
            _ => SeverityLevel::Moderate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Severity {
    #[serde(default)]
    pub level: SeverityLevel,
    #[serde(default = "midpoint", deserialize_with = "lenient::score")]
    pub score: u8,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub reasoning: String,
}

fn midpoint() -> u8 {
    5
}

impl Default for Severity {
    fn default() -> Self {
        Self {
            level: SeverityLevel::Moderate,
            score: midpoint(),
            reasoning: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PossibleCondition {
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::percent")]
    pub probability: u8,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub matching_symptoms: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub icd_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialtyReferral {
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub specialty: String,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstAidStep {
    #[serde(default, deserialize_with = "lenient::opt_number", skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsAssessment {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub temperature_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub bp_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub heart_rate_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub spo2_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub overall_vitals_concern: Option<String>,
}

/// Clinical reading of a symptom narrative plus vitals and history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalAssessment {
    #[serde(default, deserialize_with = "lenient::object_list")]
    pub possible_diseases: Vec<PossibleCondition>,
    #[serde(default, deserialize_with = "lenient::object_or_default")]
    pub severity: Severity,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_emergency: bool,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub emergency_message: Option<String>,
    #[serde(default, deserialize_with = "lenient::object_list")]
    pub recommended_specialties: Vec<SpecialtyReferral>,
    #[serde(default, deserialize_with = "lenient::first_aid_steps")]
    pub first_aid_instructions: Vec<FirstAidStep>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub lifestyle_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub when_to_seek_help: String,
    #[serde(default, deserialize_with = "lenient::opt_object", skip_serializing_if = "Option::is_none")]
    pub vitals_assessment: Option<VitalsAssessment>,
    #[serde(default, deserialize_with = "lenient::string_or_default")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ClinicalAssessment {
    /// Safe default used when nothing could be parsed out of the reply.
    pub fn fallback(raw: String) -> Self {
        Self {
            possible_diseases: Vec::new(),
            severity: Severity {
                level: SeverityLevel::Moderate,
                score: 5,
                reasoning: "Unable to fully parse AI response".to_string(),
            },
            is_emergency: false,
            emergency_message: None,
            recommended_specialties: Vec::new(),
            first_aid_instructions: Vec::new(),
            lifestyle_recommendations: Vec::new(),
            when_to_seek_help: "Please consult a healthcare professional for proper evaluation."
                .to_string(),
            vitals_assessment: None,
            summary: "Analysis completed but structured parsing failed. Please consult a doctor."
                .to_string(),
            raw: Some(raw),
        }
    }

    pub fn from_response(response: ParsedResponse<ClinicalAssessment>) -> Self {
        response.into_value_or_else(ClinicalAssessment::fallback)
    }
}

/// Analysis payload stored on a record, discriminated by where it came from.
///
/// Serialized with a `kind` tag. Payloads written without one (older
/// records, client-built AI reports) are classified by their fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Analysis {
    Document(DocumentReport),
    Clinical(ClinicalAssessment),
    Raw(RawFallback),
}

impl Analysis {
    pub fn from_document_response(response: ParsedResponse<DocumentReport>) -> Self {
        match response {
            ParsedResponse::Parsed(report) | ParsedResponse::Recovered(report) => {
                Analysis::Document(report)
            }
            ParsedResponse::Fallback { raw } => Analysis::Raw(RawFallback { raw }),
        }
    }

    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value.get("kind").and_then(Value::as_str).map(str::to_owned);
        match kind.as_deref() {
            Some("document") => Ok(Analysis::Document(serde_json::from_value(value)?)),
            Some("clinical") => Ok(Analysis::Clinical(serde_json::from_value(value)?)),
            Some("raw") => Ok(Analysis::Raw(serde_json::from_value(value)?)),
            _ => Self::classify(value),
        }
    }

    fn classify(value: Value) -> Result<Self, serde_json::Error> {
        let Some(obj) = value.as_object() else {
            return Err(de::Error::custom("analysis must be a JSON object"));
        };

        if obj.contains_key("possible_diseases") || obj.contains_key("severity") {
            return Ok(Analysis::Clinical(serde_json::from_value(value)?));
        }

        let only_raw = obj.keys().all(|k| k == "raw");
        if only_raw && obj.contains_key("raw") {
            return Ok(Analysis::Raw(serde_json::from_value(value)?));
        }

        Ok(Analysis::Document(serde_json::from_value(value)?))
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            Analysis::Document(r) => r.summary.as_deref(),
            Analysis::Clinical(c) => Some(c.summary.as_str()).filter(|s| !s.is_empty()),
            Analysis::Raw(_) => None,
        }
    }

    pub fn answer_to_user(&self) -> Option<&str> {
        match self {
            Analysis::Document(r) => r.answer_to_user.as_deref(),
            _ => None,
        }
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            Analysis::Document(r) => r.provider.as_deref(),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<RecordCategory> {
        match self {
            Analysis::Document(r) => r.document_type.as_deref().and_then(RecordCategory::from_label),
            _ => None,
        }
    }

    /// Report date inferred by the model, if it is a recognisable date.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        let Analysis::Document(r) = self else {
            return None;
        };
        let text = r.date.as_deref()?.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%d", "%d/%m/%Y", "%B %d, %Y", "%d %B %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    pub fn metrics(&self) -> &[Metric] {
        match self {
            Analysis::Document(r) => &r.metrics,
            _ => &[],
        }
    }

    pub fn recommendations(&self) -> &[String] {
        match self {
            Analysis::Document(r) => &r.recommendations,
            Analysis::Clinical(c) => &c.lifestyle_recommendations,
            Analysis::Raw(_) => &[],
        }
    }
}

impl<'de> Deserialize<'de> for Analysis {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Analysis::from_json(value).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub temperature: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub temperature_unit: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub systolic: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub diastolic: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub heart_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub spo2: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalHistory {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub conditions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub medications: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub allergies: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HealthInput {
    pub symptoms: String,
    pub vitals: Option<Vitals>,
    pub medical_history: Option<MedicalHistory>,
    pub document_text: Option<String>,
    pub language: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse::{ParseTier, parse_model_response};
    use serde_json::json;

    #[test]
    fn test_document_report_from_model_output() {
        let report: DocumentReport = serde_json::from_value(json!({
            "patient_name": "Jane Doe",
            "type": "Lab Report",
            "date": "2024-03-01",
            "summary": "Mild anemia.",
            "answer_to_user": "| Test | Result |",
            "metrics": [{ "name": "Hemoglobin", "value": 11.0, "unit": "g/dL", "status": "Low" }],
            "recommendations": ["Eat leafy greens"],
            "something_else": true
        }))
        .unwrap();

        let analysis = Analysis::Document(report);
        assert_eq!(analysis.category(), Some(RecordCategory::LabReport));
        assert_eq!(analysis.summary(), Some("Mild anemia."));
        assert_eq!(analysis.metrics().len(), 1);
        assert_eq!(
            analysis.date().map(|d| d.date_naive()),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_unparseable_date_is_ignored() {
        let analysis = Analysis::Document(DocumentReport {
            date: Some("sometime last spring".to_string()),
            ..Default::default()
        });
        assert!(analysis.date().is_none());
    }

    #[test]
    fn test_clinical_fallback_shape() {
        let assessment = ClinicalAssessment::from_response(parse_model_response("not json at all"));
        assert!(assessment.possible_diseases.is_empty());
        assert_eq!(assessment.severity.level, SeverityLevel::Moderate);
        assert_eq!(assessment.severity.score, 5);
        assert!(!assessment.is_emergency);
        assert_eq!(assessment.raw.as_deref(), Some("not json at all"));
        assert!(!assessment.when_to_seek_help.is_empty());
    }

    #[test]
    fn test_clinical_assessment_tolerates_loose_types() {
        let parsed = parse_model_response::<ClinicalAssessment>(
            r#"{
                "possible_diseases": [{"name": "Influenza", "probability": "70", "matching_symptoms": ["fever"]}],
                "severity": {"level": "HIGH", "score": 8, "reasoning": "fever"},
                "is_emergency": "false",
                "vitals_assessment": {"temperature_status": "fever"},
                "summary": "Likely flu."
            }"#,
        );
        let assessment = ClinicalAssessment::from_response(parsed);
        assert_eq!(assessment.possible_diseases[0].probability, 70);
        assert_eq!(assessment.severity.level, SeverityLevel::High);
        assert!(!assessment.is_emergency);
        assert!(assessment.raw.is_none());
    }

    #[test]
    fn test_analysis_round_trips_with_kind_tag() {
        let analysis = Analysis::Clinical(ClinicalAssessment::fallback("x".to_string()));
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["kind"], "clinical");
        assert_eq!(Analysis::from_json(value).unwrap(), analysis);
    }

    #[test]
    fn test_untagged_payloads_are_classified() {
        let clinical = Analysis::from_json(json!({ "severity": { "level": "low" }, "summary": "ok" })).unwrap();
        assert!(matches!(clinical, Analysis::Clinical(_)));

        let raw = Analysis::from_json(json!({ "raw": "model said hi" })).unwrap();
        assert!(matches!(raw, Analysis::Raw(_)));

        let document = Analysis::from_json(json!({ "summary": "fine", "metrics": [] })).unwrap();
        assert!(matches!(document, Analysis::Document(_)));

        assert!(Analysis::from_json(json!("just text")).is_err());
    }

    #[test]
    fn test_foreign_kind_key_is_classified() {
        let document = Analysis::from_json(json!({ "kind": "custom", "summary": "x" })).unwrap();
        assert!(matches!(document, Analysis::Document(ref report) if report.summary.as_deref() == Some("x")));

        let clinical = Analysis::from_json(json!({ "kind": 7, "severity": { "level": "high" } })).unwrap();
        assert!(matches!(clinical, Analysis::Clinical(_)));
    }

    #[test]
    fn test_camel_case_answer_is_accepted() {
        let report: DocumentReport =
            serde_json::from_value(json!({ "answerToUser": "All normal." })).unwrap();
        assert_eq!(report.answer_to_user.as_deref(), Some("All normal."));
    }

    #[test]
    fn test_null_lists_and_plain_steps_still_parse() {
        let parsed = parse_model_response::<ClinicalAssessment>(
            r#"{
                "possible_diseases": [{"name": "Influenza", "probability": 80}],
                "severity": {"level": "moderate", "score": 6, "reasoning": "fever"},
                "is_emergency": false,
                "recommended_specialties": null,
                "first_aid_instructions": ["Rest", "Hydrate"],
                "lifestyle_recommendations": null,
                "when_to_seek_help": "If breathing gets hard",
                "summary": "Likely flu."
            }"#,
        );
        assert_eq!(parsed.tier(), ParseTier::Parsed);

        let assessment = ClinicalAssessment::from_response(parsed);
        assert_eq!(assessment.possible_diseases[0].name, "Influenza");
        assert!(assessment.recommended_specialties.is_empty());
        let titles: Vec<&str> = assessment
            .first_aid_instructions
            .iter()
            .map(|step| step.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Rest", "Hydrate"]);
        assert_eq!(assessment.summary, "Likely flu.");
        assert!(assessment.raw.is_none());
    }

    #[test]
    fn test_null_severity_uses_default() {
        let parsed = parse_model_response::<ClinicalAssessment>(
            r#"{"severity": null, "vitals_assessment": "normal", "summary": "Unclear."}"#,
        );
        assert_eq!(parsed.tier(), ParseTier::Parsed);

        let assessment = ClinicalAssessment::from_response(parsed);
        assert_eq!(assessment.severity, Severity::default());
        assert!(assessment.vitals_assessment.is_none());
    }
}
