use tally_core::{CellValue, ColumnMapping, Transaction, INVALID_DATE};

use crate::amount::parse_amount;
use crate::dates::parse_date;

/// Whether the row carries a value in the amount column. Rows without one
/// are non-data rows (trailing blanks, section footers) and are dropped
/// before normalization. With no amount column mapped, nothing qualifies.
pub fn has_amount_cell(row: &[CellValue], mapping: &ColumnMapping) -> bool {
    mapping
        .amount_index
        .and_then(|index| row.get(index))
        .is_some_and(CellValue::is_present)
}

/// Turn one raw row into an unclassified transaction. Out-of-range mapped
/// indices mean "field not parsed": the affected field keeps its default,
/// nothing errors.
pub fn normalize_row(row: &[CellValue], mapping: &ColumnMapping, filename: &str) -> Transaction {
    let mut tx = Transaction::new(filename);

    for (index, cell) in row.iter().enumerate() {
        tx.raw.insert(mapping.column_name(index), cell.clone());
    }
    tx.raw
        .insert("filename".to_string(), CellValue::Text(filename.to_string()));

    if let Some(index) = mapping.date_index {
        let raw_date = row.get(index).map(ToString::to_string).unwrap_or_default();
        match parse_date(&raw_date, mapping.date_format) {
            Ok(date) => tx.set_date(date),
            Err(_) => tx.date_string = INVALID_DATE.to_string(),
        }
        // Rules see the parsed value, not the raw cell.
        tx.raw
            .insert("date".to_string(), CellValue::Text(tx.date_string.clone()));
    }

    if let Some(index) = mapping.amount_index {
        let raw_amount = row.get(index).map(ToString::to_string).unwrap_or_default();
        tx.amount = parse_amount(&raw_amount, mapping.decimal_separator);
        tx.raw.insert("amount".to_string(), CellValue::Number(tx.amount));
    }

    // Cells keep their internal whitespace; only the joined result is
    // trimmed at its boundaries.
    let description = mapping
        .description_indices
        .iter()
        .map(|&index| row.get(index).map(ToString::to_string).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ");
    tx.description = description.trim().to_string();
    tx.raw.insert(
        "description".to_string(),
        CellValue::Text(tx.description.clone()),
    );

    tx
}
