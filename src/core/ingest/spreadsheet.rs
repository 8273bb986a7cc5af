use std::io::Cursor;

use calamine::{Data, DataRef, ExcelDateTime, Reader, Xls, Xlsx};
use chrono::Timelike;

use super::TableFormat;

/// Read the first populated row of the first worksheet. The declared format
/// is tried first; a workbook saved under the other spreadsheet extension
/// still opens.
pub(super) fn read_header_row(content: &[u8], declared: TableFormat) -> Result<Vec<String>, String> {
    let (first, second) = match declared {
        TableFormat::Xls => (TableFormat::Xls, TableFormat::Xlsx),
        _ => (TableFormat::Xlsx, TableFormat::Xls),
    };

    match first_row(content, first) {
        Ok(row) => Ok(row),
        Err(primary) => first_row(content, second).map_err(|_| primary),
    }
}

fn first_row(content: &[u8], format: TableFormat) -> Result<Vec<String>, String> {
    match format {
        TableFormat::Xls => xls_first_row(content),
        _ => xlsx_first_row(content),
    }
}

/// Labels of one sheet row, positioned relative to its first populated cell.
#[derive(Default)]
struct HeaderRow {
    origin: Option<u32>,
    labels: Vec<String>,
}

impl HeaderRow {
    fn push(&mut self, col: u32, label: String) {
        let origin = *self.origin.get_or_insert(col);
        let at = col.saturating_sub(origin) as usize;
        if at < self.labels.len() {
            self.labels[at] = label;
        } else {
            // Skipped columns keep an empty name and get a placeholder later.
            self.labels.resize(at, String::new());
            self.labels.push(label);
        }
    }
}

/// Streams cells of the first sheet and stops at the first populated cell
/// past the header row, so data rows are never decoded.
fn xlsx_first_row(content: &[u8]) -> Result<Vec<String>, String> {
    let mut workbook = Xlsx::new(Cursor::new(content))
        .map_err(|err| format!("failed to read xlsx workbook: {err}"))?;
    let Some(sheet) = workbook.sheet_names().into_iter().next() else {
        return Ok(Vec::new());
    };
    let mut cells = workbook
        .worksheet_cells_reader(&sheet)
        .map_err(|err| format!("failed to read first worksheet: {err}"))?;

    let mut header_row = None;
    let mut header = HeaderRow::default();
    while let Some(cell) = cells
        .next_cell()
        .map_err(|err| format!("failed to read first worksheet: {err}"))?
    {
        let Some(label) = ref_label(cell.get_value()) else {
            continue;
        };
        let (row, col) = cell.get_position();
        if *header_row.get_or_insert(row) != row {
            break;
        }
        header.push(col, label);
    }
    Ok(header.labels)
}

/// Legacy BIFF workbooks have no cell streaming in calamine; their sheets are
/// capped at 65536 rows.
fn xls_first_row(content: &[u8]) -> Result<Vec<String>, String> {
    let mut workbook =
        Xls::new(Cursor::new(content)).map_err(|err| format!("failed to read xls workbook: {err}"))?;
    let range = workbook
        .worksheet_range_at(0)
        .transpose()
        .map_err(|err| format!("failed to read first worksheet: {err}"))?;

    let mut header = HeaderRow::default();
    let Some(range) = range else {
        return Ok(header.labels);
    };
    let Some((_, first_col)) = range.start() else {
        return Ok(header.labels);
    };
    if let Some(cells) = range.rows().next() {
        for (offset, cell) in cells.iter().enumerate() {
            if let Some(label) = cell_label(cell) {
                header.push(first_col + offset as u32, label);
            }
        }
    }
    Ok(header.labels)
}

/// `None` for blank cells, which do not count as header columns.
fn ref_label(cell: &DataRef<'_>) -> Option<String> {
    let label = match cell {
        DataRef::SharedString(s) => s.to_string(),
        DataRef::String(s) => s.clone(),
        DataRef::Float(v) => float_label(*v),
        DataRef::Int(v) => format!("{v}"),
        DataRef::Bool(b) => b.to_string(),
        DataRef::DateTime(v) => datetime_label(v),
        DataRef::DateTimeIso(s) | DataRef::DurationIso(s) => s.clone(),
        DataRef::Error(e) => format!("#{e:?}"),
        DataRef::Empty => return None,
    };
    Some(label)
}

fn cell_label(cell: &Data) -> Option<String> {
    let label = match cell {
        Data::String(s) => s.clone(),
        Data::Float(v) => float_label(*v),
        Data::Int(v) => format!("{v}"),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(v) => datetime_label(v),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{e:?}"),
        Data::Empty => return None,
    };
    Some(label)
}

fn float_label(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Dates render as `YYYY-MM-DD`, with the time appended when it is not midnight.
fn datetime_label(value: &ExcelDateTime) -> String {
    if value.is_duration() {
        return float_label(value.as_f64());
    }
    match value.as_datetime() {
        Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => float_label(value.as_f64()),
    }
}
