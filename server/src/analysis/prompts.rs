use super::types::{HealthInput, MedicalHistory, Vitals};

/// Characters of uploaded-document text embedded in a clinical prompt.
pub const DOCUMENT_EXCERPT_CHARS: usize = 5000;

const NOT_PROVIDED: &str = "Not provided";

pub fn document_prompt(text: &str, question: Option<&str>) -> String {
    let question = question
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or("No question asked");

    format!(
        r#"You are a medical document analyst.

Read the medical document below and reply with ONE JSON object and nothing else.

"answer_to_user" must contain a markdown table of the measured values with
aligned columns (Test Name | Result | Reference Range | Status), followed by a
line "INSIGHTS:" and a short plain-text interpretation. If the user asked a
question, answer it in the insights.

"type" must be one of: "Lab Report", "Prescription", "Scan", "Bill", "Other".
"date" is the report date as YYYY-MM-DD, or null when the document has none.
Every metric needs a name, a numeric value, a unit and a status.

{{
  "patient_name": "",
  "type": "",
  "provider": "",
  "date": null,
  "diagnosis": "",
  "abnormal_values": [],
  "risk_level": "",
  "summary": "",
  "answer_to_user": "",
  "metrics": [
    {{ "name": "Hemoglobin", "value": 14.1, "unit": "g/dL", "status": "Normal" }}
  ],
  "recommendations": [""]
}}

User question: {question}

Document:
{text}
"#
    )
}

pub fn chat_prompt(message: &str) -> String {
    format!(
        "You are a knowledgeable medical assistant. Answer health questions clearly \
         and concisely. If a question is unrelated to health, gently bring the \
         conversation back to health topics.\n\nUser: {}\n",
        message
    )
}

pub fn health_condition_prompt(input: &HealthInput) -> String {
    let vitals = vitals_block(input.vitals.as_ref());
    let history = history_block(input.medical_history.as_ref());
    let document = document_block(input.document_text.as_deref());
    let language = if input.language.trim().is_empty() {
        "English"
    } else {
        input.language.trim()
    };

    format!(
        r#"You are a senior physician reviewing a patient's presentation. Weigh the
symptoms against the vitals, history and any document findings, and rank the
most likely conditions first.

PATIENT SYMPTOMS:
{symptoms}

{vitals}

{history}

{document}

Write every human-readable field in: {language}

Reply with ONE JSON object and nothing else, using exactly this shape:

{{
  "possible_diseases": [
    {{ "name": "", "probability": 0, "description": "", "matching_symptoms": [], "icd_code": "" }}
  ],
  "severity": {{ "level": "low | moderate | high | critical", "score": 1, "reasoning": "" }},
  "is_emergency": false,
  "emergency_message": "",
  "recommended_specialties": [ {{ "specialty": "", "reason": "" }} ],
  "first_aid_instructions": [ {{ "step": 1, "title": "", "description": "", "icon": "" }} ],
  "lifestyle_recommendations": [],
  "when_to_seek_help": "",
  "vitals_assessment": {{
    "temperature_status": "normal | elevated | fever | high_fever | hypothermia",
    "bp_status": "normal | elevated | hypertension_stage1 | hypertension_stage2 | hypertensive_crisis | hypotension",
    "heart_rate_status": "normal | bradycardia | tachycardia",
    "spo2_status": "normal | low | critical",
    "overall_vitals_concern": ""
  }},
  "summary": ""
}}

"probability" is 0-100 and "score" is 1-10."#,
        symptoms = input.symptoms.trim(),
    )
}

fn or_not_provided(value: Option<&String>) -> &str {
    value.map(String::as_str).unwrap_or(NOT_PROVIDED)
}

fn vitals_block(vitals: Option<&Vitals>) -> String {
    let Some(v) = vitals else {
        return format!("VITALS: {}", NOT_PROVIDED);
    };

    let unit = match v.temperature_unit.as_deref() {
        Some(u) if u.eq_ignore_ascii_case("c") => "°C",
        _ => "°F",
    };
    let temperature = match &v.temperature {
        Some(t) => format!("{}{}", t, unit),
        None => NOT_PROVIDED.to_string(),
    };
    let blood_pressure = match (&v.systolic, &v.diastolic) {
        (None, None) => NOT_PROVIDED.to_string(),
        (s, d) => format!(
            "{}/{} mmHg",
            s.as_deref().unwrap_or("?"),
            d.as_deref().unwrap_or("?")
        ),
    };
    let heart_rate = match &v.heart_rate {
        Some(hr) => format!("{} BPM", hr),
        None => NOT_PROVIDED.to_string(),
    };
    let spo2 = match &v.spo2 {
        Some(s) => format!("{}%", s),
        None => NOT_PROVIDED.to_string(),
    };

    format!(
        "VITALS:\n- Temperature: {}\n- Blood Pressure: {}\n- Heart Rate: {}\n- SpO2: {}",
        temperature, blood_pressure, heart_rate, spo2
    )
}

fn history_block(history: Option<&MedicalHistory>) -> String {
    let Some(h) = history else {
        return format!("MEDICAL HISTORY: {}", NOT_PROVIDED);
    };

    let conditions = if h.conditions.is_empty() {
        "None reported".to_string()
    } else {
        h.conditions.join(", ")
    };

    format!(
        "MEDICAL HISTORY:\n- Age: {}\n- Gender: {}\n- Weight: {} kg\n- Height: {} cm\n\
         - Pre-existing Conditions: {}\n- Current Medications: {}\n- Allergies: {}",
        or_not_provided(h.age.as_ref()),
        or_not_provided(h.gender.as_ref()),
        or_not_provided(h.weight.as_ref()),
        or_not_provided(h.height.as_ref()),
        conditions,
        h.medications.as_deref().unwrap_or("None reported"),
        h.allergies.as_deref().unwrap_or("None reported"),
    )
}

fn document_block(text: Option<&str>) -> String {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => format!(
            "UPLOADED MEDICAL DOCUMENT TEXT:\n{}",
            text.chars().take(DOCUMENT_EXCERPT_CHARS).collect::<String>()
        ),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> HealthInput {
        HealthInput {
            symptoms: "  headache and fever for two days ".to_string(),
            vitals: None,
            medical_history: None,
            document_text: None,
            language: String::new(),
        }
    }

    #[test]
    fn test_missing_blocks_say_not_provided() {
        let prompt = health_condition_prompt(&input());
        assert!(prompt.contains("headache and fever for two days"));
        assert!(prompt.contains("VITALS: Not provided"));
        assert!(prompt.contains("MEDICAL HISTORY: Not provided"));
        assert!(!prompt.contains("UPLOADED MEDICAL DOCUMENT TEXT"));
        assert!(prompt.contains("in: English"));
    }

    #[test]
    fn test_partial_vitals_default_per_field() {
        let mut input = input();
        input.vitals = Some(Vitals {
            temperature: Some("38.5".to_string()),
            temperature_unit: Some("C".to_string()),
            heart_rate: Some("110".to_string()),
            ..Default::default()
        });

        let prompt = health_condition_prompt(&input);
        assert!(prompt.contains("Temperature: 38.5°C"));
        assert!(prompt.contains("Heart Rate: 110 BPM"));
        assert!(prompt.contains("Blood Pressure: Not provided"));
        assert!(prompt.contains("SpO2: Not provided"));
    }

    #[test]
    fn test_history_block() {
        let mut input = input();
        input.medical_history = Some(MedicalHistory {
            age: Some("54".to_string()),
            conditions: vec!["Diabetes".to_string(), "Asthma".to_string()],
            ..Default::default()
        });

        let prompt = health_condition_prompt(&input);
        assert!(prompt.contains("Age: 54"));
        assert!(prompt.contains("Gender: Not provided"));
        assert!(prompt.contains("Pre-existing Conditions: Diabetes, Asthma"));
        assert!(prompt.contains("Allergies: None reported"));
    }

    #[test]
    fn test_document_excerpt_is_truncated() {
        let mut input = input();
        input.document_text = Some("é".repeat(DOCUMENT_EXCERPT_CHARS + 100));
        input.language = "French".to_string();

        let prompt = health_condition_prompt(&input);
        let excerpt_len = prompt.matches('é').count();
        assert_eq!(excerpt_len, DOCUMENT_EXCERPT_CHARS);
        assert!(prompt.contains("in: French"));
    }

    #[test]
    fn test_document_prompt_defaults_question() {
        let prompt = document_prompt("Hemoglobin 11.0 g/dL", None);
        assert!(prompt.contains("User question: No question asked"));
        assert!(prompt.contains("Hemoglobin 11.0 g/dL"));

        let prompt = document_prompt("text", Some("Is this normal?"));
        assert!(prompt.contains("User question: Is this normal?"));
    }
}
