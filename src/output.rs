//! Persisted data model: [`Rule`], [`RulesDocument`] and run statistics.

use crate::error::RulesError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Condition name → applies. Key-ordered so output is byte-stable.
pub type Conditions = BTreeMap<String, bool>;

/// Priority stamped on every extracted rule.
pub const RULE_PRIORITY: u32 = 1;

/// One compliance rule derived from one paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// `"<page>_<paragraph index>"`, unique within a run.
    pub id: String,
    /// Mirrors `category`.
    pub title: String,
    pub category: String,
    /// 1-based physical page number.
    pub page: u32,
    /// The obligation text (model summary or the paragraph itself).
    pub obligation: String,
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    RULE_PRIORITY
}

/// The JSON artifact written at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesDocument {
    /// Base filename of the input PDF.
    pub source_file: String,
    pub rules_found: Vec<Rule>,
}

impl RulesDocument {
    /// Serialise with two-space indentation; non-ASCII text is written as-is.
    pub fn to_json_pretty(&self) -> Result<String, RulesError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RulesError::Internal(format!("serialising rules: {e}")))
    }

    /// Load a rules file previously written by the extractor.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RulesError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => RulesError::RulesFileInvalid {
                path: path.to_path_buf(),
                detail: e.to_string(),
            },
        })?;
        serde_json::from_str(&raw).map_err(|e| RulesError::RulesFileInvalid {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

/// Counters and timings for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages read from the document.
    pub total_pages: usize,
    /// Pages that produced no paragraphs.
    pub empty_pages: usize,
    /// Paragraphs sent to the extractor (= rules produced).
    pub total_paragraphs: usize,
    /// Rules built from a parsed model response.
    pub model_rules: usize,
    /// Rules built from the fallback fragment.
    pub fallback_rules: usize,
    /// Model calls issued, including failed ones.
    pub total_attempts: u64,
    pub read_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of an extraction run before (or instead of) writing it to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub document: RulesDocument,
    pub stats: ExtractionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> Rule {
        let mut conditions = Conditions::new();
        conditions.insert("serves_meat".into(), true);
        Rule {
            id: "2_0".into(),
            title: "בשר".into(),
            category: "בשר".into(),
            page: 2,
            obligation: "יש לאחסן בשר בקירור".into(),
            conditions,
            priority: RULE_PRIORITY,
        }
    }

    #[test]
    fn json_keeps_hebrew_unescaped_and_field_order() {
        let doc = RulesDocument {
            source_file: "regs.pdf".into(),
            rules_found: vec![sample_rule()],
        };
        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains("יש לאחסן בשר בקירור"), "got: {json}");
        assert!(!json.contains("\\u"));
        assert!(json.contains("\n  \"rules_found\": ["));

        let id = json.find("\"id\"").unwrap();
        let title = json.find("\"title\"").unwrap();
        let priority = json.find("\"priority\"").unwrap();
        assert!(id < title && title < priority);
    }

    #[test]
    fn empty_document_serialises_empty_list() {
        let doc = RulesDocument {
            source_file: "empty.pdf".into(),
            rules_found: vec![],
        };
        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains("\"rules_found\": []"), "got: {json}");
    }

    #[test]
    fn rule_without_priority_or_conditions_loads_with_defaults() {
        let raw = r#"{"id":"1_0","title":"t","category":"t","page":1,"obligation":"o"}"#;
        let rule: Rule = serde_json::from_str(raw).unwrap();
        assert_eq!(rule.priority, RULE_PRIORITY);
        assert!(rule.conditions.is_empty());
    }

    #[test]
    fn load_reports_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            RulesDocument::load(&missing),
            Err(RulesError::FileNotFound { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            RulesDocument::load(&bad),
            Err(RulesError::RulesFileInvalid { .. })
        ));
    }
}
