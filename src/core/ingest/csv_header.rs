use tracing::debug;

use super::decode::decode_text;

/// Decode `content` and return the cells of its first CSV record.
pub(super) fn read_header_record(content: &[u8]) -> Result<Vec<String>, String> {
    let (text, encoding) = decode_text(content);
    debug!(?encoding, bytes = content.len(), "Decoded CSV upload");

    let text = text
        .replace('\0', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    match reader.records().next() {
        Some(record) => {
            let record = record.map_err(|e| e.to_string())?;
            Ok(record.iter().map(str::to_owned).collect())
        }
        None => Ok(Vec::new()),
    }
}
