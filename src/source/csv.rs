//! Tabular feed enumerator
//!
//! Reads delimited rows through the `csv` crate using a configured field
//! separator and a header row for column names. Each row yields the
//! non-empty values of the configured URL columns, in column-configuration
//! order, so a single row may produce zero, one, or two URLs.

use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use super::{SourceError, DEFAULT_CSV_SEPARATOR, URL_COLUMNS};

/// Lazy URL enumerator over a delimited export file
pub struct CsvUrlSource {
    records: StringRecordsIntoIter<File>,
    /// Indexes of the configured URL columns present in the header row
    column_indexes: Vec<usize>,
    /// URLs from the current row not yet handed out
    pending: VecDeque<String>,
    finished: bool,
}

impl CsvUrlSource {
    /// Open a CSV export file with the default `;` separator and the
    /// standard URL columns.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Self::open_with(path, DEFAULT_CSV_SEPARATOR, URL_COLUMNS)
    }

    /// Open a CSV export file with an explicit separator and column set
    pub fn open_with(
        path: &Path,
        separator: u8,
        url_columns: &[&str],
    ) -> Result<Self, SourceError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(separator)
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        // A configured column absent from the header simply yields nothing.
        let headers = reader.headers()?;
        let column_indexes = url_columns
            .iter()
            .filter_map(|name| headers.iter().position(|h| h == *name))
            .collect();

        Ok(Self {
            records: reader.into_records(),
            column_indexes,
            pending: VecDeque::new(),
            finished: false,
        })
    }
}

impl Iterator for CsvUrlSource {
    type Item = Result<String, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(url) = self.pending.pop_front() {
                return Some(Ok(url));
            }
            if self.finished {
                return None;
            }

            match self.records.next()? {
                Ok(record) => {
                    for &index in &self.column_indexes {
                        let value = record.get(index).map(str::trim).unwrap_or_default();
                        if !value.is_empty() {
                            self.pending.push_back(value.to_string());
                        }
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
