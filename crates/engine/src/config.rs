use serde::{Deserialize, Serialize};
use thiserror::Error;

use tally_core::Rule;

use crate::predicate::validate_rule;

/// The durable interchange document: the rule list and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn export_rules(rules: &[Rule]) -> Result<String, ConfigError> {
    let config = RuleConfig { rules: rules.to_vec() };
    Ok(serde_json::to_string_pretty(&config)?)
}

/// Parse an exported config. The returned list replaces the caller's rules
/// wholesale. Every rule is revalidated: validity is a property of the
/// source text, not of the document it arrived in.
pub fn import_rules(json: &str) -> Result<Vec<Rule>, ConfigError> {
    let mut config: RuleConfig = serde_json::from_str(json)?;
    for rule in &mut config.rules {
        validate_rule(rule);
    }
    Ok(config.rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, code: &str) -> Rule {
        Rule {
            id: id.to_string(),
            category: "Cat".to_string(),
            subcategory: "Sub".to_string(),
            code: code.to_string(),
            is_valid: true,
            error: None,
        }
    }

    #[test]
    fn round_trip_preserves_order_and_fields() {
        let rules = vec![
            rule("r1", "amount < 0"),
            rule("r2", r#"description.contains("x")"#),
            rule("r3", "month == 12"),
        ];
        let json = export_rules(&rules).unwrap();
        let back = import_rules(&json).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn import_revalidates_stale_flags() {
        // Claims valid, is not.
        let json = r#"{"rules":[{"id":"r1","category":"a","subcategory":"b","jsCode":"amount <","isValid":true}]}"#;
        let rules = import_rules(json).unwrap();
        assert!(!rules[0].is_valid);
        assert!(rules[0].error.is_some());

        // Claims invalid, actually compiles.
        let json = r#"{"rules":[{"id":"r2","category":"a","subcategory":"b","jsCode":"amount < 0","isValid":false}]}"#;
        let rules = import_rules(json).unwrap();
        assert!(rules[0].is_valid);
    }

    #[test]
    fn import_rejects_malformed_json() {
        assert!(matches!(import_rules("{"), Err(ConfigError::Json(_))));
        assert!(matches!(import_rules(r#"{"rules": 7}"#), Err(ConfigError::Json(_))));
    }

    #[test]
    fn exported_document_uses_interchange_keys() {
        let json = export_rules(&[rule("r1", "true")]).unwrap();
        assert!(json.contains("\"jsCode\""));
        assert!(json.contains("\"isValid\""));
    }
}
