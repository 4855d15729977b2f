//! Feed enumerators
//!
//! A feed is a structured export file listing artifact URLs. Both variants
//! reduce to the same contract: a lazy, finite, forward-only iterator of URL
//! strings in document order, without buffering the whole feed in memory.
//! Malformed feed content surfaces as an `Err` item and is fatal for the run.

pub mod csv;
pub mod xml;

pub use csv::CsvUrlSource;
pub use xml::XmlUrlSource;

/// Default field separator for CSV export files
pub const DEFAULT_CSV_SEPARATOR: u8 = b';';

/// Column names whose values are treated as artifact URLs, in yield order
pub const URL_COLUMNS: &[&str] = &["Receipt", "VehicleRegistrationCertificate"];

/// Element tags whose text content is treated as an artifact URL
pub const URL_TAGS: &[&str] = &["Receipt", "VehicleRegistrationCertificate"];

/// Feed enumeration errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Feed file could not be opened or read
    #[error("feed IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML feed content
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed CSV feed content
    #[error("CSV parse error: {0}")]
    Csv(#[from] ::csv::Error),
}
