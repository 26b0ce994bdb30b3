use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date layout of the raw date column. Delimited tokens split on their own
/// delimiter; compact tokens slice at fixed offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "YYYY-MM-DD")]
    YmdDash,
    #[serde(rename = "DD-MM-YYYY")]
    DmyDash,
    #[serde(rename = "MM-DD-YYYY")]
    MdyDash,
    #[serde(rename = "YYYYMMDD")]
    YmdCompact,
    #[serde(rename = "DDMMYYYY")]
    DmyCompact,
    #[serde(rename = "MMDDYYYY")]
    MdyCompact,
    #[serde(rename = "DD/MM/YYYY")]
    DmySlash,
    #[serde(rename = "MM/DD/YYYY")]
    MdySlash,
}

impl DateFormat {
    pub const ALL: [DateFormat; 8] = [
        DateFormat::YmdDash,
        DateFormat::DmyDash,
        DateFormat::MdyDash,
        DateFormat::YmdCompact,
        DateFormat::DmyCompact,
        DateFormat::MdyCompact,
        DateFormat::DmySlash,
        DateFormat::MdySlash,
    ];

    pub fn token(self) -> &'static str {
        match self {
            DateFormat::YmdDash => "YYYY-MM-DD",
            DateFormat::DmyDash => "DD-MM-YYYY",
            DateFormat::MdyDash => "MM-DD-YYYY",
            DateFormat::YmdCompact => "YYYYMMDD",
            DateFormat::DmyCompact => "DDMMYYYY",
            DateFormat::MdyCompact => "MMDDYYYY",
            DateFormat::DmySlash => "DD/MM/YYYY",
            DateFormat::MdySlash => "MM/DD/YYYY",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        DateFormat::ALL
            .into_iter()
            .find(|f| f.token() == wanted)
            .ok_or_else(|| format!("Unknown date format: '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DecimalSeparator {
    #[default]
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = ",")]
    Comma,
}

impl fmt::Display for DecimalSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalSeparator::Dot => f.write_str("."),
            DecimalSeparator::Comma => f.write_str(","),
        }
    }
}

impl FromStr for DecimalSeparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "." => Ok(DecimalSeparator::Dot),
            "," => Ok(DecimalSeparator::Comma),
            other => Err(format!("Unknown decimal separator: '{other}'")),
        }
    }
}

/// Which raw-row indices carry date/amount/description semantics for one
/// data file. Indices are offsets into each row; `description_indices`
/// order is the concatenation order. `has_headers` is supplied by the
/// caller, never guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub date_index: Option<usize>,
    pub date_format: DateFormat,
    pub amount_index: Option<usize>,
    pub decimal_separator: DecimalSeparator,
    pub description_indices: Vec<usize>,
    pub column_names: Vec<String>,
    pub has_headers: bool,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_index: None,
            date_format: DateFormat::default(),
            amount_index: None,
            decimal_separator: DecimalSeparator::default(),
            description_indices: Vec::new(),
            column_names: Vec::new(),
            has_headers: true,
        }
    }
}

impl ColumnMapping {
    /// Display name for a column: the mapped header if one exists and is
    /// non-empty, else the synthetic `col<N>`.
    pub fn column_name(&self, index: usize) -> String {
        match self.column_names.get(index) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("col{index}"),
        }
    }
}
