//! The structured payload the generation service is instructed to return.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PolicyError, Result};
use crate::expr::Variables;

/// Unit tag attached to a computed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    /// A multiple of the monthly salary (`months_of_salary`).
    MonthsOfSalary,
    /// A currency amount tagged with its three-letter code, e.g. `VND`.
    Currency(String),
    /// A number of days (`days`).
    Days,
    /// Any other unit label, rendered generically.
    Other(String),
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Other(String::new())
    }
}

impl From<String> for Unit {
    fn from(raw: String) -> Self {
        let label = raw.trim();
        if label.eq_ignore_ascii_case("months_of_salary") {
            Unit::MonthsOfSalary
        } else if label.eq_ignore_ascii_case("days") {
            Unit::Days
        } else if label.len() == 3 && label.chars().all(|c| c.is_ascii_uppercase()) {
            Unit::Currency(label.to_string())
        } else {
            Unit::Other(label.to_string())
        }
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::MonthsOfSalary => f.write_str("months_of_salary"),
            Unit::Currency(code) => f.write_str(code),
            Unit::Days => f.write_str("days"),
            Unit::Other(label) => f.write_str(label),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Explanation, optional formula, variables and unit extracted from policy text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredExtraction {
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(default)]
    pub formula_expression: Option<String>,
    #[serde(default)]
    pub variables: Option<Variables>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit: Unit,
}

impl StructuredExtraction {
    /// The formula, unless absent, blank, or the literal `null`.
    pub fn formula(&self) -> Option<&str> {
        self.formula_expression
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("null"))
    }

    /// The variable map, unless absent or empty.
    pub fn variables(&self) -> Option<&Variables> {
        self.variables.as_ref().filter(|vars| !vars.is_empty())
    }
}

/// Pull the body out of the first markdown code fence, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];
    for marker in start_markers {
        if let Some(start) = text.find(marker) {
            let body_start = start + marker.len();
            if let Some(end) = text[body_start..].find("```") {
                return Some(text[body_start..body_start + end].trim());
            }
        }
    }
    None
}

/// The span from the first `{` to the last `}`.
fn braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode raw generation output into a [`StructuredExtraction`].
///
/// Tries the trimmed text, then a fenced code block, then the outermost
/// brace-delimited span.
///
/// # Errors
///
/// Returns [`PolicyError::Decode`] when no candidate decodes.
pub fn decode(raw: &str) -> Result<StructuredExtraction> {
    let trimmed = raw.trim();
    let candidates = [Some(trimmed), fenced_block(trimmed), braced_span(trimmed)];

    let mut first_error = None;
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<StructuredExtraction>(candidate) {
            Ok(extraction) => return Ok(extraction),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(PolicyError::Decode(match first_error {
        Some(e) => e.to_string(),
        None => "empty generation output".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Value;

    #[test]
    fn decodes_full_payload() {
        let raw = r#"{
            "explanation": "Bonus is 0.1 month per month worked, capped at 3.",
            "formula_expression": "min(monthsWorked*0.1,3)",
            "variables": {"monthsWorked": 40, "salary": 1000, "probation": false},
            "unit": "months_of_salary"
        }"#;
        let extraction = decode(raw).unwrap();
        assert_eq!(extraction.formula(), Some("min(monthsWorked*0.1,3)"));
        assert_eq!(extraction.unit, Unit::MonthsOfSalary);
        let vars = extraction.variables().unwrap();
        assert_eq!(vars["monthsWorked"], Value::Number(40.0));
        assert_eq!(vars["probation"], Value::Bool(false));
    }

    #[test]
    fn null_formula_means_no_formula() {
        let extraction =
            decode(r#"{"explanation":"Twelve days per year.","formula_expression":null,"variables":null,"unit":null}"#)
                .unwrap();
        assert_eq!(extraction.formula(), None);
        assert!(extraction.variables().is_none());
        assert_eq!(extraction.unit, Unit::default());

        let extraction = decode(r#"{"explanation":"x","formula_expression":"null"}"#).unwrap();
        assert_eq!(extraction.formula(), None);
    }

    #[test]
    fn decodes_fenced_and_wrapped_output() {
        let fenced = "Here you go:\n```json\n{\"explanation\":\"ok\",\"unit\":\"days\"}\n```";
        assert_eq!(decode(fenced).unwrap().unit, Unit::Days);

        let wrapped = "Sure! {\"explanation\":\"ok\",\"unit\":\"VND\"} Hope that helps.";
        assert_eq!(decode(wrapped).unwrap().unit, Unit::Currency("VND".to_string()));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode("not json at all"), Err(PolicyError::Decode(_))));
        assert!(matches!(decode(""), Err(PolicyError::Decode(_))));
        assert!(matches!(decode(r#"{"variables": {"salary": "lots"}}"#), Err(PolicyError::Decode(_))));
    }

    #[test]
    fn unit_labels() {
        assert_eq!(Unit::from("hours".to_string()), Unit::Other("hours".to_string()));
        assert_eq!(Unit::from("usd".to_string()), Unit::Other("usd".to_string()));
        assert_eq!(Unit::from(" USD ".to_string()), Unit::Currency("USD".to_string()));
        assert_eq!(String::from(Unit::MonthsOfSalary), "months_of_salary");
    }
}
