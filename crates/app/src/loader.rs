//! File-format boundary: turns CSV/XLSX exports into `DataFile`s. The
//! engine never sees file formats, only rows of cells.

use std::fs;
use std::path::Path;

use thiserror::Error;

use tally_core::{CellValue, ColumnMapping, DataFile};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "xlsx")]
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] calamine::XlsxError),
    #[cfg(feature = "xlsx")]
    #[error("workbook has no sheets")]
    EmptyWorkbook,
    #[error("unsupported file type '{0}' (expected csv, tsv, txt or xlsx)")]
    UnsupportedExtension(String),
}

/// Load a tabular file by extension. `has_headers` comes from the caller;
/// it is never guessed from the content.
pub fn load(path: &Path, has_headers: bool) -> Result<DataFile, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match extension.as_str() {
        "csv" | "tsv" | "txt" => load_csv(path, has_headers),
        #[cfg(feature = "xlsx")]
        "xlsx" | "xls" => load_xlsx(path, has_headers),
        other => Err(LoadError::UnsupportedExtension(other.to_string())),
    }
}

pub fn load_csv(path: &Path, has_headers: bool) -> Result<DataFile, LoadError> {
    let text = fs::read_to_string(path)?;
    from_csv_text(&display_name(path), &text, has_headers)
}

/// Parse CSV text into a data file. All rows are kept — skipping a header
/// row is the mapping's job, not the parser's.
pub fn from_csv_text(name: &str, text: &str, has_headers: bool) -> Result<DataFile, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::from).collect());
    }

    let mapping = default_mapping(&rows, has_headers);
    Ok(DataFile::new(name, text.to_string(), rows, mapping))
}

#[cfg(feature = "xlsx")]
pub fn load_xlsx(path: &Path, has_headers: bool) -> Result<DataFile, LoadError> {
    use calamine::{open_workbook, Reader, Xlsx};

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::EmptyWorkbook)??;

    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_sheet).collect())
        .collect();

    let mapping = default_mapping(&rows, has_headers);
    // Binary source: no raw text to keep.
    Ok(DataFile::new(&display_name(path), String::new(), rows, mapping))
}

#[cfg(feature = "xlsx")]
fn cell_from_sheet(data: &calamine::Data) -> CellValue {
    use calamine::Data;
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Serial date number; the date format mapping decides how to read it.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("import")
        .to_string()
}

/// Pick the delimiter with the most hits on the first line. Bank exports
/// are split between comma, semicolon (common with comma decimals), and
/// tab; defaults to comma.
fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    [b';', b'\t', b',']
        .into_iter()
        .max_by_key(|&d| first_line.matches(d as char).count())
        .filter(|&d| first_line.contains(d as char))
        .unwrap_or(b',')
}

fn default_mapping(rows: &[Vec<CellValue>], has_headers: bool) -> ColumnMapping {
    let mut mapping = ColumnMapping {
        has_headers,
        ..ColumnMapping::default()
    };
    if has_headers {
        if let Some(header) = rows.first() {
            mapping.column_names = header.iter().map(ToString::to_string).collect();
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_text_keeps_all_rows_and_header_names() {
        let text = "Date,Amount,Description\n2024-01-15,-50.00,Coffee Shop\n";
        let file = from_csv_text("bank.csv", text, true).unwrap();
        assert_eq!(file.rows.len(), 2);
        assert_eq!(file.mapping.column_names, ["Date", "Amount", "Description"]);
        assert!(file.mapping.has_headers);
        assert_eq!(file.raw_content, text);
    }

    #[test]
    fn headerless_csv_gets_no_column_names() {
        let text = "2024-01-15,-50.00,Coffee Shop\n";
        let file = from_csv_text("bank.csv", text, false).unwrap();
        assert_eq!(file.rows.len(), 1);
        assert!(file.mapping.column_names.is_empty());
        assert!(!file.mapping.has_headers);
    }

    #[test]
    fn ragged_rows_are_allowed() {
        let text = "a,b,c\nshort\n1,2,3,4\n";
        let file = from_csv_text("r.csv", text, true).unwrap();
        assert_eq!(file.rows[1].len(), 1);
        assert_eq!(file.rows[2].len(), 4);
    }

    #[test]
    fn semicolon_delimiter_is_sniffed() {
        let text = "Datum;Bedrag;Omschrijving\n15-01-2024;-12,34;JUMBO\n";
        let file = from_csv_text("nl.csv", text, true).unwrap();
        assert_eq!(file.rows[0].len(), 3);
        assert_eq!(file.mapping.column_names[1], "Bedrag");
    }

    #[test]
    fn tab_delimiter_is_sniffed() {
        let text = "a\tb\tc\n1\t2\t3\n";
        let file = from_csv_text("t.tsv", text, true).unwrap();
        assert_eq!(file.rows[1].len(), 3);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = load(Path::new("statement.pdf"), true).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension(_)));
    }
}
