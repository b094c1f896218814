//! Public protocol structs for the HTTP endpoints (serde ready).
//! Field names match what the selection form sends and reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::PatternSummary;

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct BooksOut {
    pub books: Vec<String>,
}

/// `/get_patterns` reply. Failures are reported in-band with `success: false`.
#[derive(Debug, Serialize)]
pub struct PatternsOut {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<PatternSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PatternsOut {
    pub fn ok(patterns: Vec<PatternSummary>) -> Self {
        Self { success: true, patterns: Some(patterns), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, patterns: None, error: Some(error.into()) }
    }
}

/// `/generate` body.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateIn {
    #[serde(default)]
    pub book: Option<String>,
    /// Pattern numbers as JSON numbers or numeric strings.
    #[serde(default)]
    pub patterns: Vec<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl GenerateIn {
    /// Requested pattern numbers in order. Entries that are not integers are dropped.
    pub fn pattern_numbers(&self) -> Vec<i64> {
        self.patterns
            .iter()
            .filter_map(|v| match v {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_numbers_accept_numbers_and_numeric_strings() {
        let body: GenerateIn =
            serde_json::from_str(r#"{"book":"B.xlsx","patterns":[3,"4"," 5 ",6.0,"x",null,true]}"#).expect("json");
        assert_eq!(body.pattern_numbers(), vec![3, 4, 5, 6]);
        assert_eq!(body.name, None);
    }

    #[test]
    fn missing_fields_default() {
        let body: GenerateIn = serde_json::from_str("{}").expect("json");
        assert!(body.book.is_none());
        assert!(body.pattern_numbers().is_empty());
    }

    #[test]
    fn failed_patterns_reply_has_no_list() {
        let json = serde_json::to_value(PatternsOut::failed("boom")).expect("json");
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }
}
