//! Prompts sent to the language model.
//!
//! Every prompt lives here so unit tests can inspect them without a model.
//! Callers can override the rule prompt via
//! [`crate::config::ExtractionConfig::prompt_template`]; the report prompts
//! are fixed.

/// Placeholder replaced by the paragraph text in a rule prompt template.
pub const PARAGRAPH_PLACEHOLDER: &str = "{paragraph}";

/// Default rule-extraction prompt.
///
/// Asks for one JSON object with `summary`, `category` and boolean
/// `conditions`. The model is free to add condition keys beyond the two
/// named here.
pub const DEFAULT_RULE_PROMPT: &str = r#"You are a regulatory assistant for Israeli businesses.
Rewrite the legal paragraph below as a short, clear, actionable obligation in Hebrew, addressed to a small business owner.
Decide which category it belongs to (for example בשר, משלוחים, תברואה, בטיחות אש) and which business conditions it applies to (serves_meat, deliveries).

Paragraph:
{paragraph}

Answer with a single JSON object and nothing else, shaped like:
{
  "summary": "...",
  "category": "...",
  "conditions": { "serves_meat": true, "deliveries": false }
}"#;

/// System message for the model-written licensing report.
pub const REPORT_SYSTEM_PROMPT: &str =
    "You are a regulatory assistant for Israeli businesses. Answer in Hebrew, be concise and actionable.";

/// Render a rule prompt for one paragraph.
pub fn rule_prompt(template: &str, paragraph: &str) -> String {
    template.replace(PARAGRAPH_PLACEHOLDER, paragraph)
}

/// Build the user message for the model-written licensing report.
///
/// `profile_json` and `rules_json` are pretty-printed JSON documents.
pub fn report_user_prompt(profile_json: &str, rules_json: &str) -> String {
    format!(
        "Business info:\n{profile_json}\n\nMatched rules:\n{rules_json}\n\n\
Output a concise actionable Hebrew report in clear language."
    )
}
