//! Serialization of on-screen tables into spreadsheet-friendly CSV.
//!
//! Every field is quoted, embedded quotes are doubled and the byte stream
//! starts with a UTF-8 BOM so spreadsheet tools pick the right encoding for
//! accented names.

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::Table;

/// Byte-order mark written in front of every export
pub const UTF8_BOM: char = '\u{feff}';
pub const CSV_MIME_TYPE: &str = "text/csv; charset=utf-8";

const FIELD_DELIMITER: &str = ",";
const RECORD_DELIMITER: &str = "\n";

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s{2,}").expect("static regex");
}

/// Normalize the visible text of a cell.
///
/// Line breaks are dropped entirely, runs of two or more whitespace
/// characters become a single space, and the result is trimmed.
pub fn normalize_cell_text(raw: &str) -> String {
    let without_breaks: String = raw.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    WHITESPACE_RUN
        .replace_all(&without_breaks, " ")
        .trim()
        .to_string()
}

/// Quote a field unconditionally, doubling embedded quotes.
pub fn escape_field(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Number of leading cells exported from a row with `cell_count` cells.
///
/// The trailing column of console tables usually holds action buttons, so it
/// is dropped unless the caller asks to keep it.
pub fn column_limit(cell_count: usize, trim_last_column: bool) -> usize {
    if trim_last_column {
        cell_count.saturating_sub(1)
    } else {
        cell_count
    }
}

/// CSV document built from a table; fields hold normalized, unescaped text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvDocument {
    records: Vec<Vec<String>>,
}

impl CsvDocument {
    pub fn from_table(table: &Table, trim_last_column: bool) -> Self {
        let records = table
            .rows()
            .iter()
            .map(|row| {
                let limit = column_limit(row.len(), trim_last_column);
                row.iter()
                    .take(limit)
                    .map(|cell| normalize_cell_text(cell))
                    .collect()
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    /// CSV text without the BOM. Records are separated, not terminated, by
    /// newlines.
    pub fn to_csv_string(&self) -> String {
        self.records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .map(|field| escape_field(field))
                    .collect::<Vec<_>>()
                    .join(FIELD_DELIMITER)
            })
            .collect::<Vec<_>>()
            .join(RECORD_DELIMITER)
    }

    /// BOM-prefixed UTF-8 bytes ready to be downloaded
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut text = String::new();
        text.push(UTF8_BOM);
        text.push_str(&self.to_csv_string());
        text.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn parse_csv(text: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_actions_column_is_trimmed() {
        let table = Table::from_rows(vec![
            vec!["Name", "Dept", "Actions"],
            vec!["Ana", "HR", "<button>"],
        ]);
        let doc = CsvDocument::from_table(&table, true);
        assert_eq!(doc.to_csv_string(), "\"Name\",\"Dept\"\n\"Ana\",\"HR\"");

        let bytes = doc.to_bytes();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "\u{feff}\"Name\",\"Dept\"\n\"Ana\",\"HR\""
        );
    }

    #[test]
    fn test_keep_last_column() {
        let table = Table::from_rows(vec![vec!["a", "b"]]);
        let doc = CsvDocument::from_table(&table, false);
        assert_eq!(doc.to_csv_string(), "\"a\",\"b\"");
    }

    #[test]
    fn test_short_and_empty_rows_degrade() {
        let table = Table::from_rows(vec![vec!["x", "y", "z"], vec!["only"], vec![]]);
        let doc = CsvDocument::from_table(&table, true);
        assert_eq!(
            doc.records(),
            &[vec!["x".to_string(), "y".to_string()], vec![], vec![]]
        );
        assert_eq!(doc.to_csv_string(), "\"x\",\"y\"\n\n");
    }

    #[test]
    fn test_normalize_cell_text() {
        assert_eq!(normalize_cell_text("  Ana\n   García \r\n"), "Ana García");
        assert_eq!(normalize_cell_text("a\tb"), "a\tb");
        assert_eq!(normalize_cell_text("a \t b"), "a b");
        assert_eq!(normalize_cell_text("a\u{a0}\u{a0}b"), "a b");
        assert_eq!(normalize_cell_text("Luis\nPérez"), "LuisPérez");
        assert_eq!(normalize_cell_text(""), "");
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field(""), "\"\"");
        assert_eq!(escape_field("42"), "\"42\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_numbers_and_commas_are_quoted() {
        let table = Table::from_rows(vec![vec!["1,5", "7", "-"]]);
        let doc = CsvDocument::from_table(&table, true);
        assert_eq!(doc.to_csv_string(), "\"1,5\",\"7\"");
        assert_eq!(parse_csv(&doc.to_csv_string()), vec![vec!["1,5", "7"]]);
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(raw in "[a-zA-Z \t\r\n\u{a0}áñ\"]{0,40}") {
            let once = normalize_cell_text(&raw);
            prop_assert_eq!(normalize_cell_text(&once), once.clone());
        }

        #[test]
        fn prop_export_parses_back(
            rows in prop::collection::vec(
                prop::collection::vec("[a-zA-Z0-9 ,\"\t\náéñ]{0,12}", 1..5),
                1..6,
            )
        ) {
            let table = Table::new(rows.clone());
            let doc = CsvDocument::from_table(&table, false);
            let parsed = parse_csv(&doc.to_csv_string());
            let expected: Vec<Vec<String>> = rows
                .iter()
                .map(|row| row.iter().map(|c| normalize_cell_text(c)).collect())
                .collect();
            prop_assert_eq!(parsed, expected);
        }
    }
}
