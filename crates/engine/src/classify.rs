use tracing::debug;

use tally_core::{Rule, Transaction};

use crate::predicate::{compile, CompiledPredicate, EvalError};

/// Result of running one rule against one transaction.
enum RuleOutcome {
    Match,
    NoMatch,
    Error(EvalError),
}

/// One rule ready for evaluation. `predicate` is `None` for rules that must
/// not run: flagged invalid, empty code, or code that no longer compiles.
struct PreparedRule {
    id: String,
    category: String,
    subcategory: String,
    predicate: Option<CompiledPredicate>,
}

/// First-match-wins classifier over an ordered rule list. Rules are
/// compiled once at construction; list position is precedence.
pub struct Classifier {
    rules: Vec<PreparedRule>,
}

impl Classifier {
    pub fn new(rules: &[Rule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let predicate = if rule.is_valid && !rule.code.trim().is_empty() {
                    match compile(&rule.code) {
                        Ok(predicate) => Some(predicate),
                        Err(err) => {
                            // A rule can arrive with a stale validity flag;
                            // it is skipped, exactly like a flagged one.
                            debug!(rule = %rule.id, %err, "rule does not compile, skipping");
                            None
                        }
                    }
                } else {
                    None
                };
                PreparedRule {
                    id: rule.id.clone(),
                    category: rule.category.clone(),
                    subcategory: rule.subcategory.clone(),
                    predicate,
                }
            })
            .collect();
        Self { rules }
    }

    /// Walk the rules in order; the first match assigns both labels and
    /// stops the walk. Returns whether any rule matched.
    pub fn classify(&self, tx: &mut Transaction) -> bool {
        for rule in &self.rules {
            match Self::evaluate(rule, tx) {
                RuleOutcome::Match => {
                    tx.classify(&rule.category, &rule.subcategory);
                    return true;
                }
                RuleOutcome::NoMatch => {}
                RuleOutcome::Error(err) => {
                    // Contained per rule per transaction; the walk continues.
                    debug!(rule = %rule.id, %err, "rule evaluation failed, treated as no match");
                }
            }
        }
        false
    }

    fn evaluate(rule: &PreparedRule, tx: &Transaction) -> RuleOutcome {
        let Some(predicate) = &rule.predicate else {
            return RuleOutcome::NoMatch;
        };
        match predicate.eval(tx) {
            Ok(true) => RuleOutcome::Match,
            Ok(false) => RuleOutcome::NoMatch,
            Err(err) => RuleOutcome::Error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(category: &str, subcategory: &str, code: &str) -> Rule {
        Rule {
            id: format!("{category}/{subcategory}"),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            code: code.to_string(),
            is_valid: true,
            error: None,
        }
    }

    fn tx(description: &str, amount: f64) -> Transaction {
        let mut tx = Transaction::new("bank.csv");
        tx.description = description.to_string();
        tx.amount = amount;
        tx
    }

    #[test]
    fn first_match_wins() {
        let classifier = Classifier::new(&[
            rule("Groceries", "Supermarket", r#"description.contains("JUMBO")"#),
            rule("Everything", "CatchAll", "true"),
        ]);
        let mut tx = tx("JUMBO UTRECHT", -12.0);
        assert!(classifier.classify(&mut tx));
        assert_eq!(tx.category.as_deref(), Some("Groceries"));
        assert_eq!(tx.subcategory.as_deref(), Some("Supermarket"));
    }

    #[test]
    fn later_rules_are_not_consulted_after_a_match() {
        // Both rules match; only the earlier one may label.
        let classifier = Classifier::new(&[
            rule("First", "A", "amount < 0"),
            rule("Second", "B", "amount < 0"),
        ]);
        let mut tx = tx("anything", -1.0);
        classifier.classify(&mut tx);
        assert_eq!(tx.category.as_deref(), Some("First"));
    }

    #[test]
    fn no_match_leaves_both_labels_unset() {
        let classifier = Classifier::new(&[rule("Food", "Coffee", r#"description.contains("COFFEE")"#)]);
        let mut tx = tx("HARDWARE STORE", -30.0);
        assert!(!classifier.classify(&mut tx));
        assert_eq!(tx.category, None);
        assert_eq!(tx.subcategory, None);
    }

    #[test]
    fn invalid_rule_never_evaluates() {
        let mut always = rule("Everything", "All", "true");
        always.is_valid = false;
        let classifier = Classifier::new(&[always]);
        let mut tx = tx("anything", 1.0);
        assert!(!classifier.classify(&mut tx));
        assert_eq!(tx.category, None);
    }

    #[test]
    fn empty_code_rule_is_skipped() {
        let classifier = Classifier::new(&[
            rule("Empty", "Empty", "   "),
            rule("Real", "Match", "true"),
        ]);
        let mut tx = tx("anything", 1.0);
        classifier.classify(&mut tx);
        assert_eq!(tx.category.as_deref(), Some("Real"));
    }

    #[test]
    fn stale_validity_flag_does_not_crash_the_walk() {
        // is_valid says yes but the code does not compile.
        let classifier = Classifier::new(&[
            rule("Broken", "Broken", "amount <"),
            rule("Real", "Match", "amount > 0"),
        ]);
        let mut tx = tx("anything", 1.0);
        classifier.classify(&mut tx);
        assert_eq!(tx.category.as_deref(), Some("Real"));
    }

    #[test]
    fn evaluation_error_falls_through_to_next_rule() {
        let classifier = Classifier::new(&[
            rule("Erroring", "Oops", r#"row["Missing Column"] == 1"#),
            rule("Real", "Match", "true"),
        ]);
        let mut tx = tx("anything", 1.0);
        assert!(classifier.classify(&mut tx));
        assert_eq!(tx.category.as_deref(), Some("Real"));
    }
}
