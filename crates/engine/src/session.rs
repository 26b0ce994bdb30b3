use tracing::info;

use tally_core::{ColumnMapping, DataFile, Rule, Transaction};

use crate::config::{self, ConfigError};
use crate::pipeline::apply_rules;
use crate::predicate::validate_rule;

/// Partial edit of one rule; unset fields keep their current value.
/// Changing the code revalidates the rule.
#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub code: Option<String>,
}

/// Caller-owned working state: loaded files, the ordered rule list, and the
/// most recent batch output. The pipeline itself stays pure; this is the
/// one place that holds things between calls.
#[derive(Debug, Default)]
pub struct Session {
    data_files: Vec<DataFile>,
    rules: Vec<Rule>,
    transactions: Vec<Transaction>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_files(&self) -> &[DataFile] {
        &self.data_files
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    // ── Data files ───────────────────────────────────────────────────────

    pub fn add_data_file(&mut self, file: DataFile) {
        info!(file = %file.name, rows = file.rows.len(), "data file added");
        self.data_files.push(file);
    }

    pub fn remove_data_file(&mut self, id: &str) -> bool {
        let before = self.data_files.len();
        self.data_files.retain(|f| f.id != id);
        self.data_files.len() != before
    }

    pub fn rename_data_file(&mut self, id: &str, name: &str) -> bool {
        match self.data_files.iter_mut().find(|f| f.id == id) {
            Some(file) => {
                file.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace the mapping of exactly one file, addressed by id or name.
    pub fn update_mapping(&mut self, key: &str, mapping: ColumnMapping) -> bool {
        match self
            .data_files
            .iter_mut()
            .find(|f| f.id == key || f.name == key)
        {
            Some(file) => {
                file.mapping = mapping;
                true
            }
            None => false,
        }
    }

    pub fn data_file(&self, key: &str) -> Option<&DataFile> {
        self.data_files.iter().find(|f| f.id == key || f.name == key)
    }

    // ── Rules ────────────────────────────────────────────────────────────

    /// Append a fresh rule with placeholder code; returns a reference so
    /// callers can show the generated id.
    pub fn add_rule(&mut self) -> &Rule {
        self.rules.push(Rule::new());
        self.rules.last().expect("just pushed")
    }

    pub fn update_rule(&mut self, id: &str, update: RuleUpdate) -> bool {
        let Some(rule) = self.rules.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        if let Some(category) = update.category {
            rule.category = category;
        }
        if let Some(subcategory) = update.subcategory {
            rule.subcategory = subcategory;
        }
        if let Some(code) = update.code {
            rule.code = code;
            validate_rule(rule);
        }
        true
    }

    pub fn delete_rule(&mut self, id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.rules.len() != before
    }

    /// Recheck every rule against the compiler, refreshing validity flags
    /// and diagnostics. Returns the ids of rules that are invalid.
    pub fn validate_rules(&mut self) -> Vec<String> {
        let mut invalid = Vec::new();
        for rule in &mut self.rules {
            validate_rule(rule);
            if !rule.is_valid {
                invalid.push(rule.id.clone());
            }
        }
        invalid
    }

    /// Move a rule to a new position; order is precedence. The index is
    /// clamped to the end of the list.
    pub fn move_rule(&mut self, id: &str, to: usize) -> bool {
        let Some(from) = self.rules.iter().position(|r| r.id == id) else {
            return false;
        };
        let rule = self.rules.remove(from);
        let to = to.min(self.rules.len());
        self.rules.insert(to, rule);
        true
    }

    // ── Batch apply & config ─────────────────────────────────────────────

    /// Recompute the transaction set from scratch and replace the previous
    /// one wholesale. Returns the date-parse error count.
    pub fn apply(&mut self) -> usize {
        let outcome = apply_rules(&self.data_files, &self.rules);
        self.transactions = outcome.transactions;
        outcome.date_parse_errors
    }

    pub fn export_config(&self) -> Result<String, ConfigError> {
        config::export_rules(&self.rules)
    }

    /// Replace the entire rule list with an imported config. Not a merge.
    pub fn import_config(&mut self, json: &str) -> Result<(), ConfigError> {
        self.rules = config::import_rules(json)?;
        info!(rules = self.rules.len(), "rule config imported");
        Ok(())
    }

    pub fn reset(&mut self) {
        self.data_files.clear();
        self.rules.clear();
        self.transactions.clear();
    }
}
