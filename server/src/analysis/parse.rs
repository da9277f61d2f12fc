use serde::de::DeserializeOwned;
use serde_json::Value;

/// Which recovery stage produced a model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    Parsed,
    Recovered,
    Fallback,
}

/// Outcome of reading a model reply as a JSON object.
///
/// Parsing never fails: a reply that yields nothing usable at either JSON
/// stage comes back as `Fallback` carrying the raw text, and the caller
/// substitutes its own safe default.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse<T> {
    /// The fence-stripped reply was a valid object.
    Parsed(T),
    /// Only the outermost `{...}` span inside the reply was.
    Recovered(T),
    Fallback { raw: String },
}

impl<T> ParsedResponse<T> {
    pub fn tier(&self) -> ParseTier {
        match self {
            ParsedResponse::Parsed(_) => ParseTier::Parsed,
            ParsedResponse::Recovered(_) => ParseTier::Recovered,
            ParsedResponse::Fallback { .. } => ParseTier::Fallback,
        }
    }

    pub fn into_value_or_else(self, fallback: impl FnOnce(String) -> T) -> T {
        match self {
            ParsedResponse::Parsed(v) | ParsedResponse::Recovered(v) => v,
            ParsedResponse::Fallback { raw } => fallback(raw),
        }
    }
}

/// Removes markdown code-fence markers. Idempotent.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

pub fn parse_model_response<T: DeserializeOwned>(raw: &str) -> ParsedResponse<T> {
    if let Some(value) = parse_strict(raw) {
        return ParsedResponse::Parsed(value);
    }

    if let Some(value) = parse_brace_span(raw) {
        return ParsedResponse::Recovered(value);
    }

    ParsedResponse::Fallback {
        raw: raw.to_string(),
    }
}

fn parse_strict<T: DeserializeOwned>(raw: &str) -> Option<T> {
    parse_object(&strip_code_fences(raw))
}

fn parse_brace_span<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&raw[start..=end])
}

fn parse_object<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value: Value = serde_json::from_str(text).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}
