use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cell::CellValue;

/// Sentinel `date_string` for a date column value that could not be parsed.
pub const INVALID_DATE: &str = "Invalid Date";

/// One normalized, optionally classified record derived from one raw row.
/// `category` and `subcategory` are either both set (by exactly one rule)
/// or both absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Absent when no date column is mapped or the value failed to parse.
    pub date: Option<NaiveDate>,
    /// Canonical `YYYY-MM-DD`, the `"Invalid Date"` sentinel, or `""` when
    /// no date column is mapped.
    pub date_string: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub amount: f64,
    pub description: String,
    pub filename: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// Original cells keyed by column name (or `col<N>`), plus derived
    /// `date`/`amount`/`description`/`filename` entries so rule code sees
    /// parsed values.
    pub raw: BTreeMap<String, CellValue>,
}

impl Transaction {
    pub fn new(filename: &str) -> Self {
        Transaction {
            date: None,
            date_string: String::new(),
            year: 0,
            month: 0,
            day: 0,
            amount: 0.0,
            description: String::new(),
            filename: filename.to_string(),
            category: None,
            subcategory: None,
            raw: BTreeMap::new(),
        }
    }

    /// Fill in the date fields from a successfully parsed calendar date.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.year = date.year();
        self.month = date.month();
        self.day = date.day();
        self.date_string = format!("{:04}-{:02}-{:02}", self.year, self.month, self.day);
        self.date = Some(date);
    }

    /// Assign both labels together; the pair is never split.
    pub fn classify(&mut self, category: &str, subcategory: &str) {
        self.category = Some(category.to_string());
        self.subcategory = Some(subcategory.to_string());
    }

    pub fn is_classified(&self) -> bool {
        self.category.is_some()
    }
}
