//! Matching rules against a business profile.

use crate::output::{Conditions, Rule};
use serde::{Deserialize, Serialize};

/// The business a report is written for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    /// Floor area in square metres.
    pub area: f64,
    pub seats: u32,
    #[serde(default)]
    pub serves_meat: bool,
    #[serde(default)]
    pub deliveries: bool,
}

/// Whether a rule with `conditions` applies to `profile`.
///
/// `any_business: true` applies to everyone. A `true` meat or deliveries
/// condition requires the matching trait; every other condition is ignored.
pub fn matches(conditions: &Conditions, profile: &BusinessProfile) -> bool {
    if conditions.get("any_business").copied().unwrap_or(false) {
        return true;
    }
    if requires(conditions, &["serves_meat", "servesMeat"]) && !profile.serves_meat {
        return false;
    }
    if requires(conditions, &["deliveries", "deliveries_required"]) && !profile.deliveries {
        return false;
    }
    true
}

fn requires(conditions: &Conditions, keys: &[&str]) -> bool {
    keys.iter()
        .any(|k| conditions.get(*k).copied().unwrap_or(false))
}

/// Rules that apply to `profile`, stable-sorted by ascending priority.
pub fn match_rules<'a>(rules: &'a [Rule], profile: &BusinessProfile) -> Vec<&'a Rule> {
    let mut matched: Vec<&Rule> = rules
        .iter()
        .filter(|r| matches(&r.conditions, profile))
        .collect();
    matched.sort_by_key(|r| r.priority);
    matched
}
