//! Tabular loader for the raw extracts
//!
//! Reads a tab-delimited text source with a header row into a `Table` of
//! text cells. Stray delimiter artifacts (literal commas and tabs embedded
//! in headers or cell values) are scrubbed out; all typing happens later,
//! inside the pipeline.

use crate::error::{EtlError, Result};
use labfeat_core::{Table, Value};
use std::path::Path;
use tracing::info;

/// Strip every literal comma and tab from a header or cell.
///
/// Mechanical sanitization of export artifacts, not delimiter parsing; the
/// csv reader has already split fields by the time this runs.
fn scrub(text: &str) -> String {
    text.chars().filter(|c| *c != ',' && *c != '\t').collect()
}

/// Load a tab-delimited source file into a table of text cells.
pub fn load_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| EtlError::Ingest(format!("{}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| EtlError::Ingest(format!("{}: {}", path.display(), e)))?
        .iter()
        .map(scrub)
        .collect::<Vec<_>>();

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| EtlError::Ingest(format!("{}: {}", path.display(), e)))?;
        let row = record
            .iter()
            .map(|cell| Value::Text(scrub(cell)))
            .collect::<Vec<_>>();
        table
            .push_row(row)
            .map_err(|e| EtlError::Ingest(format!("{}: {}", path.display(), e)))?;
    }

    info!(
        "Loaded {} rows x {} columns from {}",
        table.n_rows(),
        table.n_cols(),
        path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_simple_table() {
        let file = write_fixture("user_id\tsignup_date\n1\t2020-01-01\n2\t2021-06-15\n");
        let table = load_table(file.path()).unwrap();

        assert_eq!(
            table.columns(),
            &["user_id".to_string(), "signup_date".to_string()]
        );
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.get(0, 0), Some(&Value::Text("1".to_string())));
        assert_eq!(
            table.get(1, 1),
            Some(&Value::Text("2021-06-15".to_string()))
        );
    }

    #[test]
    fn test_embedded_commas_are_scrubbed() {
        // header "user,id" -> "userid", cell "al,ice" -> "alice"
        let file = write_fixture("user,id\tname\n1\tal,ice\n");
        let table = load_table(file.path()).unwrap();

        assert_eq!(table.columns(), &["userid".to_string(), "name".to_string()]);
        assert_eq!(table.get(0, 1), Some(&Value::Text("alice".to_string())));
    }

    #[test]
    fn test_quoted_embedded_tabs_are_scrubbed() {
        // a quoted field may carry a literal tab; it must not survive
        let file = write_fixture("name\tnote\nbob\t\"a\tb\"\n");
        let table = load_table(file.path()).unwrap();
        assert_eq!(table.get(0, 1), Some(&Value::Text("ab".to_string())));
    }

    #[test]
    fn test_empty_cells_stay_text() {
        let file = write_fixture("a\tb\n\tx\n");
        let table = load_table(file.path()).unwrap();
        assert_eq!(table.get(0, 0), Some(&Value::Text(String::new())));
    }

    #[test]
    fn test_missing_file_is_ingest_error() {
        let err = load_table(Path::new("/nonexistent/users.csv")).unwrap_err();
        assert!(matches!(err, EtlError::Ingest(_)));
        assert!(err.to_string().contains("users.csv"));
    }

    #[test]
    fn test_ragged_row_is_ingest_error() {
        let file = write_fixture("a\tb\n1\t2\t3\n");
        let err = load_table(file.path()).unwrap_err();
        assert!(matches!(err, EtlError::Ingest(_)));
    }
}
