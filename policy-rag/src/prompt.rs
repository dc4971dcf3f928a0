//! Prompt construction for the generation gateway.

use std::fmt::Write;

use crate::document::Chunk;

const SYSTEM_PROMPT: &str = r#"You are an internal HR policy assistant.

TASK:
- Use ONLY the CONTEXT to answer. Extract the calculation rule and the variables it needs.
- Do NOT invent formulas or policies that are not written in the CONTEXT.

Respond with a single JSON object in exactly this format:

{
  "explanation": "A plain explanation of the rule in the documents",
  "formula_expression": "arithmetic_expression or null",
  "variables": {
    "monthsWorked": 36,
    "salary": 10000000
  },
  "unit": "months_of_salary" | "VND" | "days" | "hours" | "number"
}

RULES:
- "formula_expression" must be a valid arithmetic expression over the variables.
- Allowed operators: + - * / ( ) > >= < <= == != && || !
- Allowed functions: if(cond, then, else), max(a, b), min(a, b), floor(x), ceil(x), round(x)
- Variable values must be numbers or booleans.
- Do NOT change the logic written in the documents.
- If no calculation applies, set "formula_expression": null and only explain the policy.

Return JSON only. Do NOT write anything outside the JSON object."#;

/// Render retrieved chunks as a numbered context block in retrieval order.
pub fn context_block(chunks: &[Chunk]) -> String {
    let mut block = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = write!(block, "[{}] {}\n\n", i + 1, chunk.text);
    }
    block
}

/// Build the system prompt, appending the caller's hint when present.
pub fn system_prompt(hint: &str) -> String {
    let hint = hint.trim();
    if hint.is_empty() {
        SYSTEM_PROMPT.to_string()
    } else {
        format!("{SYSTEM_PROMPT}\n{hint}")
    }
}

/// Build the user prompt carrying the context block and the question.
pub fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "CONTEXT:\n{context}\nQUESTION:\n{question}\n\n\
         Return the JSON object in the format above. Do NOT write anything outside the JSON."
    )
}
