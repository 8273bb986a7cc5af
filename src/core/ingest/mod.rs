//! Header extraction for uploaded tabular files.
//!
//! Only the column set is read from an upload: the first record of a CSV file
//! or the first row of a workbook's first sheet. Row data is never materialized.

mod csv_header;
mod decode;
mod spreadsheet;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Filename and derived column list of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub columns: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("Error processing file '{filename}': {reason}")]
pub struct FileProcessingError {
    pub filename: String,
    pub reason: String,
}

impl FileProcessingError {
    pub fn new(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Xlsx,
    Xls,
    Csv,
}

impl TableFormat {
    /// Picks the parser from the text after the last `.` of the filename.
    /// Anything that is not a known spreadsheet extension is read as CSV.
    pub fn from_filename(filename: &str) -> Self {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => TableFormat::Xlsx,
            "xls" => TableFormat::Xls,
            _ => TableFormat::Csv,
        }
    }
}

/// Strip NUL, trim, then drop control characters other than tab. The result
/// is trimmed again so that sanitizing twice changes nothing.
pub fn sanitize_column_name(name: &str) -> String {
    let kept: String = name
        .replace('\0', "")
        .trim()
        .chars()
        .filter(|c| *c as u32 >= 32 || *c == '\t')
        .collect();
    kept.trim().to_string()
}

/// Sanitize a raw header row. Names that end up empty get a positional
/// placeholder so CSV and spreadsheet headers keep the same length.
fn normalize_header<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .enumerate()
        .map(|(index, name)| {
            let clean = sanitize_column_name(name.as_ref());
            if clean.is_empty() {
                format!("unnamed_column_{index}")
            } else {
                clean
            }
        })
        .collect()
}

pub fn extract_columns(content: &[u8], filename: &str) -> Result<FileInfo, FileProcessingError> {
    let format = TableFormat::from_filename(filename);
    let raw = match format {
        TableFormat::Xlsx | TableFormat::Xls => spreadsheet::read_header_row(content, format),
        TableFormat::Csv => csv_header::read_header_record(content),
    }
    .map_err(|reason| FileProcessingError::new(filename, reason))?;

    let columns = normalize_header(raw);
    debug!(
        filename,
        ?format,
        columns = columns.len(),
        "Extracted column header"
    );

    Ok(FileInfo {
        filename: filename.to_string(),
        columns,
    })
}
