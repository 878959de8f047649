//! Rule assembly: located fragments → ordered [`Rule`]s.

use crate::output::{Rule, RULE_PRIORITY};
use crate::pipeline::extract::RuleFragment;

/// A fragment tagged with where its paragraph came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFragment {
    /// 1-based page number.
    pub page: u32,
    /// 0-based paragraph index within the page.
    pub index: usize,
    pub fragment: RuleFragment,
}

/// Rule identifier for a paragraph position.
pub fn rule_id(page: u32, index: usize) -> String {
    format!("{}_{}", page, index)
}

/// Build rules ordered by (page, index), whatever order the fragments
/// arrived in.
pub fn assemble_rules(mut fragments: Vec<LocatedFragment>, fallback_category: &str) -> Vec<Rule> {
    fragments.sort_by_key(|f| (f.page, f.index));
    fragments
        .into_iter()
        .map(|located| {
            let RuleFragment {
                summary,
                category,
                conditions,
            } = located.fragment;
            let category = if category.trim().is_empty() {
                fallback_category.to_string()
            } else {
                category
            };
            Rule {
                id: rule_id(located.page, located.index),
                title: category.clone(),
                category,
                page: located.page,
                obligation: summary,
                conditions,
                priority: RULE_PRIORITY,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Conditions;

    fn located(page: u32, index: usize, category: &str) -> LocatedFragment {
        LocatedFragment {
            page,
            index,
            fragment: RuleFragment {
                summary: format!("s{page}.{index}"),
                category: category.into(),
                conditions: Conditions::new(),
            },
        }
    }

    #[test]
    fn rules_are_sorted_and_numbered() {
        let rules = assemble_rules(
            vec![located(2, 0, "b"), located(1, 1, "a"), located(10, 0, "c"), located(1, 0, "a")],
            "כללי",
        );
        let ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1_0", "1_1", "2_0", "10_0"]);
        assert_eq!(rules[3].page, 10);
        assert_eq!(rules[2].obligation, "s2.0");
    }

    #[test]
    fn title_mirrors_category_and_priority_is_fixed() {
        let rules = assemble_rules(vec![located(3, 4, "תברואה")], "כללי");
        assert_eq!(rules[0].title, "תברואה");
        assert_eq!(rules[0].category, "תברואה");
        assert_eq!(rules[0].priority, 1);
    }

    #[test]
    fn blank_category_gets_sentinel() {
        let rules = assemble_rules(vec![located(1, 0, "  ")], "כללי");
        assert_eq!(rules[0].category, "כללי");
        assert_eq!(rules[0].title, "כללי");
    }

    #[test]
    fn no_fragments_no_rules() {
        assert!(assemble_rules(Vec::new(), "כללי").is_empty());
    }
}
