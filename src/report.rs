//! Licensing reports for a business profile.
//!
//! [`build_report`] is deterministic and always available.
//! [`generate_report`] asks the model to phrase the report and falls back to
//! [`build_report`] when the call fails.

use crate::error::CallError;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::matching::BusinessProfile;
use crate::output::Rule;
use crate::prompts::{report_user_prompt, REPORT_SYSTEM_PROMPT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Heading of every deterministic report.
pub const REPORT_TITLE: &str = "דו\"ח דרישות רישוי לעסק";

const REPORT_TEMPERATURE: f32 = 0.2;
const REPORT_MAX_TOKENS: usize = 900;

static MUST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"יש ל").unwrap());
static BOILERPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"החובה |על פי התקנות").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Which path produced a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub source: ReportSource,
    pub text: String,
}

/// Plain-language form of a legal obligation.
pub fn simplify_obligation(obligation: &str) -> String {
    let s = MUST_RE.replace_all(obligation, "צריך ל");
    let s = BOILERPLATE_RE.replace_all(&s, "");
    WHITESPACE_RE.replace_all(&s, " ").trim().to_string()
}

/// Render the deterministic report.
///
/// Obligations are grouped by category in first-seen order and numbered
/// from 1 within each group. Rules with an empty obligation still open
/// their category but add no line.
pub fn build_report(profile: &BusinessProfile, rules: &[&Rule]) -> String {
    let mut lines = vec![REPORT_TITLE.to_string(), profile_line(profile), String::new()];

    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for rule in rules {
        let category = if rule.category.is_empty() {
            crate::config::DEFAULT_CATEGORY
        } else {
            rule.category.as_str()
        };
        let pos = match groups.iter().position(|(c, _)| *c == category) {
            Some(pos) => pos,
            None => {
                groups.push((category, Vec::new()));
                groups.len() - 1
            }
        };
        if !rule.obligation.is_empty() {
            groups[pos].1.push(simplify_obligation(&rule.obligation));
        }
    }

    for (category, obligations) in groups {
        lines.push(format!("{}:", category));
        for (i, text) in obligations.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, text));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn profile_line(profile: &BusinessProfile) -> String {
    let area = if profile.area > 0.0 {
        profile.area.to_string()
    } else {
        "-".to_string()
    };
    let seats = if profile.seats > 0 {
        profile.seats.to_string()
    } else {
        "-".to_string()
    };

    let mut traits = Vec::new();
    if profile.serves_meat {
        traits.push("הגשת בשר");
    }
    if profile.deliveries {
        traits.push("משלוחים");
    }

    let mut line = format!("שטח: {} מ\"ר, מספר מושבים: {}", area, seats);
    if !traits.is_empty() {
        line.push_str(", ");
        line.push_str(&traits.join(", "));
    }
    line
}

/// Ask `model` to write the report; use [`build_report`] if it cannot.
pub async fn generate_report(
    model: &dyn LanguageModel,
    profile: &BusinessProfile,
    rules: &[&Rule],
) -> Report {
    match request_report(model, profile, rules).await {
        Ok(text) => {
            info!("Report written by {}", model.model_id());
            Report {
                source: ReportSource::Model,
                text,
            }
        }
        Err(e) => {
            warn!("{} report failed, using fallback: {}", model.model_id(), e);
            Report {
                source: ReportSource::Fallback,
                text: build_report(profile, rules),
            }
        }
    }
}

async fn request_report(
    model: &dyn LanguageModel,
    profile: &BusinessProfile,
    rules: &[&Rule],
) -> Result<String, CallError> {
    let profile_json = serde_json::to_string_pretty(profile)
        .map_err(|e| CallError::Provider(format!("serialising profile: {e}")))?;
    let rules_json = serde_json::to_string_pretty(rules)
        .map_err(|e| CallError::Provider(format!("serialising rules: {e}")))?;

    let request = CompletionRequest {
        system: Some(REPORT_SYSTEM_PROMPT.to_string()),
        prompt: report_user_prompt(&profile_json, &rules_json),
        temperature: REPORT_TEMPERATURE,
        max_tokens: REPORT_MAX_TOKENS,
    };

    let text = model.complete(&request).await?;
    if text.trim().is_empty() {
        return Err(CallError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Conditions;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn rule(category: &str, obligation: &str) -> Rule {
        Rule {
            id: "1_0".into(),
            title: category.into(),
            category: category.into(),
            page: 1,
            obligation: obligation.into(),
            conditions: Conditions::new(),
            priority: 1,
        }
    }

    #[test]
    fn simplification_rewrites_boilerplate() {
        assert_eq!(
            simplify_obligation("החובה יש להציב   מטף\nעל פי התקנות"),
            "צריך להציב מטף"
        );
        assert_eq!(simplify_obligation("  plain text  "), "plain text");
    }

    #[test]
    fn report_groups_by_first_seen_category() {
        let rules = [
            rule("בטיחות אש", "יש להציב מטף"),
            rule("בשר", "אחסון בקירור"),
            rule("בטיחות אש", "שלט יציאה"),
            rule("בשר", ""),
        ];
        let refs: Vec<&Rule> = rules.iter().collect();
        let profile = BusinessProfile {
            area: 80.0,
            seats: 30,
            serves_meat: true,
            deliveries: false,
        };

        let expected = "דו\"ח דרישות רישוי לעסק\n\
שטח: 80 מ\"ר, מספר מושבים: 30, הגשת בשר\n\
\n\
בטיחות אש:\n\
1. צריך להציב מטף\n\
2. שלט יציאה\n\
\n\
בשר:\n\
1. אחסון בקירור\n";
        assert_eq!(build_report(&profile, &refs), expected);
    }

    #[test]
    fn zero_profile_values_print_dashes() {
        let text = build_report(&BusinessProfile::default(), &[]);
        assert_eq!(
            text,
            "דו\"ח דרישות רישוי לעסק\nשטח: - מ\"ר, מספר מושבים: -\n"
        );
    }

    struct CannedModel {
        answer: Result<String, CallError>,
        seen: Mutex<Option<CompletionRequest>>,
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn model_id(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, CallError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            self.answer.clone()
        }
    }

    #[tokio::test]
    async fn model_report_is_used_when_available() {
        let model = CannedModel {
            answer: Ok("דו\"ח מהמודל".into()),
            seen: Mutex::new(None),
        };
        let rules = [rule("כללי", "x")];
        let refs: Vec<&Rule> = rules.iter().collect();
        let report = generate_report(&model, &BusinessProfile::default(), &refs).await;

        assert_eq!(report.source, ReportSource::Model);
        assert_eq!(report.text, "דו\"ח מהמודל");
        let seen = model.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.system.as_deref(), Some(REPORT_SYSTEM_PROMPT));
        assert_eq!(seen.temperature, 0.2);
        assert_eq!(seen.max_tokens, 900);
        assert!(seen.prompt.contains("\"obligation\": \"x\""));
    }

    #[tokio::test]
    async fn failed_model_falls_back_to_builder() {
        let model = CannedModel {
            answer: Err(CallError::RateLimited),
            seen: Mutex::new(None),
        };
        let profile = BusinessProfile::default();
        let report = generate_report(&model, &profile, &[]).await;
        assert_eq!(report.source, ReportSource::Fallback);
        assert_eq!(report.text, build_report(&profile, &[]));
    }
}
