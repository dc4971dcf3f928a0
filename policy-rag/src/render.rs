//! Natural-language rendering of extracted policies and computed results.

use crate::expr::Value;
use crate::extraction::{StructuredExtraction, Unit};

/// Answer returned when retrieval finds nothing within either threshold.
pub const NO_POLICY_FOUND: &str = "I could not find a relevant policy in the current documents.";

/// Answer returned when related chunks were found but the model output was unusable.
pub const ANALYSIS_FAILED: &str =
    "I found related material in the documents but could not analyze the policy from it.";

/// Answer returned when there is neither a computed result nor an explanation.
pub const NO_DETAILS: &str = "I only found a general policy description, which is not enough \
                              to calculate a detailed answer for this question.";

fn number_var(extraction: &StructuredExtraction, name: &str) -> Option<f64> {
    extraction.variables.as_ref()?.get(name).and_then(Value::as_number)
}

/// Two decimals at most, without trailing zeros: `12` or `1.5`.
fn compact(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn with_explanation(explanation: &str, body: String) -> String {
    if explanation.is_empty() { body } else { format!("{explanation}\n\n{body}") }
}

/// Render the final answer text.
///
/// Without a computed `result` the explanation is returned verbatim. With one,
/// the phrasing depends on the unit: `months_of_salary` is converted into an
/// absolute amount when a positive `salary` variable is present; currencies and
/// day counts are reported with their label; anything else gets a generic
/// result sentence.
pub fn render_answer(extraction: &StructuredExtraction, result: Option<f64>) -> String {
    let explanation = extraction.explanation.trim();
    let (Some(formula), Some(value)) = (extraction.formula(), result) else {
        return if explanation.is_empty() {
            NO_DETAILS.to_string()
        } else {
            explanation.to_string()
        };
    };

    match &extraction.unit {
        Unit::MonthsOfSalary => match number_var(extraction, "salary").filter(|s| *s > 0.0) {
            Some(salary) => {
                let mut body = String::from("Applied to your question:\n");
                if let Some(months) = number_var(extraction, "monthsWorked") {
                    body.push_str(&format!("- Months worked: {months:.0}\n"));
                }
                body.push_str(&format!(
                    "- Formula: {formula}\n\
                     → Result: about {value:.2} months of salary.\n\
                     With a monthly salary of about {salary:.0}, the estimated amount is about {amount:.0}.",
                    amount = value * salary,
                ));
                with_explanation(explanation, body)
            }
            None => with_explanation(
                explanation,
                format!("Calculated result: {value:.2} months of salary."),
            ),
        },
        Unit::Currency(code) => {
            with_explanation(explanation, format!("Calculated result: about {value:.0} {code}."))
        }
        Unit::Days => {
            with_explanation(explanation, format!("Calculated result: about {} days.", compact(value)))
        }
        Unit::Other(label) => {
            let body = if label.is_empty() {
                format!("Calculated result: {value:.2}.")
            } else {
                format!("Calculated result: {value:.2} {label}.")
            };
            with_explanation(explanation, body)
        }
    }
}
