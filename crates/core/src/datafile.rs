use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cell::CellValue;
use crate::mapping::ColumnMapping;

/// One loaded tabular file: the parsed rows plus the mapping that tells the
/// engine what the columns mean. The serialized shape matches the persisted
/// layout of earlier releases (`parsedRows`, `columnMapping`, `rawContent`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFile {
    pub id: String,
    /// Display name; also what rules see as `filename`.
    pub name: String,
    /// Original file text. Empty for binary formats.
    pub raw_content: String,
    #[serde(rename = "parsedRows")]
    pub rows: Vec<Vec<CellValue>>,
    #[serde(rename = "columnMapping")]
    pub mapping: ColumnMapping,
}

impl DataFile {
    pub fn new(
        name: &str,
        raw_content: String,
        rows: Vec<Vec<CellValue>>,
        mapping: ColumnMapping,
    ) -> Self {
        DataFile {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            raw_content,
            rows,
            mapping,
        }
    }
}
