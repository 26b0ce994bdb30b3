use tracing::{debug, info};

use tally_core::{DataFile, Rule, Transaction};

use crate::classify::Classifier;
use crate::normalize::{has_amount_cell, normalize_row};

/// Everything one batch run produces. `date_parse_errors` is a data-quality
/// signal for the caller; it never blocks classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutcome {
    pub transactions: Vec<Transaction>,
    pub date_parse_errors: usize,
}

/// Recompute the full transaction set from the current files and rules.
///
/// A pure function of its inputs: per-row and per-rule failures are
/// contained, output order is file order then row order, and re-running on
/// unchanged inputs yields an identical result. Callers replace their
/// previous transaction list wholesale; there is no incremental path.
pub fn apply_rules(files: &[DataFile], rules: &[Rule]) -> ApplyOutcome {
    let classifier = Classifier::new(rules);
    let mut outcome = ApplyOutcome::default();

    for file in files {
        let start_row = usize::from(file.mapping.has_headers);
        let rows = file.rows.get(start_row..).unwrap_or_default();
        let before = outcome.transactions.len();

        for row in rows {
            if !has_amount_cell(row, &file.mapping) {
                continue;
            }
            let mut tx = normalize_row(row, &file.mapping, &file.name);
            if file.mapping.date_index.is_some() && tx.date.is_none() {
                outcome.date_parse_errors += 1;
            }
            classifier.classify(&mut tx);
            outcome.transactions.push(tx);
        }

        debug!(
            file = %file.name,
            rows = rows.len(),
            kept = outcome.transactions.len() - before,
            "file processed"
        );
    }

    info!(
        files = files.len(),
        transactions = outcome.transactions.len(),
        date_parse_errors = outcome.date_parse_errors,
        "batch apply complete"
    );
    outcome
}
