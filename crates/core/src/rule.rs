use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Starter predicate for freshly created rules. Matches nothing most users
/// care about, so the rule is harmless until edited.
pub const PLACEHOLDER_CODE: &str = r#"description.contains_any("coolblue")"#;

/// One classification rule. Rules live in a strictly ordered list; position
/// is precedence. An invalid rule stays in the list (editing is expected to
/// fix it) but is skipped during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    /// Predicate source text. The serialized key stays `jsCode` so configs
    /// exported by earlier releases keep their shape.
    #[serde(rename = "jsCode")]
    pub code: String,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Rule {
    pub fn new() -> Self {
        Rule {
            id: Uuid::new_v4().to_string(),
            category: String::new(),
            subcategory: String::new(),
            code: PLACEHOLDER_CODE.to_string(),
            is_valid: true,
            error: None,
        }
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rule_has_unique_id_and_placeholder() {
        let a = Rule::new();
        let b = Rule::new();
        assert_ne!(a.id, b.id);
        assert_eq!(a.code, PLACEHOLDER_CODE);
        assert!(a.is_valid);
        assert!(a.error.is_none());
    }

    #[test]
    fn serializes_under_legacy_keys() {
        let rule = Rule {
            id: "r1".to_string(),
            category: "Food".to_string(),
            subcategory: "Coffee".to_string(),
            code: "amount < 0".to_string(),
            is_valid: true,
            error: None,
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"jsCode\":\"amount < 0\""));
        assert!(json.contains("\"isValid\":true"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn deserializes_without_error_field() {
        let json = r#"{"id":"r1","category":"a","subcategory":"b","jsCode":"true","isValid":false}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert!(!rule.is_valid);
        assert_eq!(rule.error, None);
    }
}
