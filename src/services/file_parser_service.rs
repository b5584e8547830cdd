/// Spreadsheet reader for distributor sell-out reports
/// Supports CSV (sniffed delimiter) and Excel (XLSX/XLS) workbooks.
///
/// The wizard touches the same artifact several times with widening scope:
/// headers only for the mapping step, a single column for the channel
/// preview, the full dataset at commit. Each granularity has its own entry
/// point so the cheap steps stay cheap for large uploads.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::ReaderBuilder;

use crate::middleware::error_handling::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileKind {
    Csv,
    Excel,
}

/// Fully materialized sheet: header row plus data rows, all cells coerced
/// to trimmed strings. Rows that are entirely empty are dropped.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct SpreadsheetReader;

impl SpreadsheetReader {
    /// Detect file kind from extension, falling back to magic bytes for
    /// uploads with uninformative names.
    pub fn detect_kind(path: &Path) -> Result<FileKind> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".csv") || name.ends_with(".txt") {
            return Ok(FileKind::Csv);
        }
        if name.ends_with(".xlsx") || name.ends_with(".xls") {
            return Ok(FileKind::Excel);
        }

        use std::io::Read;

        let mut header = [0u8; 8];
        let mut file = std::fs::File::open(path)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read upload: {}", e)))?;
        let n = file
            .read(&mut header)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read upload: {}", e)))?;
        let header = &header[..n];

        if header.len() >= 2 && &header[0..2] == b"PK" {
            // XLSX is a ZIP container
            return Ok(FileKind::Excel);
        }
        if header.len() >= 8 && &header[0..8] == b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1" {
            // Legacy XLS (OLE container)
            return Ok(FileKind::Excel);
        }

        Ok(FileKind::Csv)
    }

    /// Sheet names of a workbook. CSV files have none.
    pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
        match Self::detect_kind(path)? {
            FileKind::Csv => Ok(Vec::new()),
            FileKind::Excel => {
                let workbook = open_workbook_auto(path).map_err(|e| {
                    AppError::InvalidInput(format!("Failed to open Excel file: {}", e))
                })?;
                Ok(workbook.sheet_names().to_vec())
            }
        }
    }

    /// Header row only.
    pub fn read_headers(path: &Path, sheet: Option<&str>) -> Result<Vec<String>> {
        match Self::detect_kind(path)? {
            FileKind::Csv => {
                let mut reader = Self::csv_reader(path)?;
                let headers: Vec<String> = reader
                    .headers()
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV headers: {}", e)))?
                    .iter()
                    .map(|s| s.trim().to_string())
                    .collect();

                if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
                    return Err(AppError::InvalidInput(
                        "File has no headers. The first row must contain column names.".to_string(),
                    ));
                }
                Ok(headers)
            }
            FileKind::Excel => {
                let range = Self::sheet_range(path, sheet)?;
                let headers = match range.rows().next() {
                    Some(row) => row.iter().map(cell_to_string).collect::<Vec<String>>(),
                    None => {
                        return Err(AppError::InvalidInput("Excel sheet is empty.".to_string()));
                    }
                };

                if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
                    return Err(AppError::InvalidInput(
                        "Excel file has no headers in first row.".to_string(),
                    ));
                }
                Ok(headers)
            }
        }
    }

    /// Data cells of a single named column, in file order. Empty cells come
    /// back as empty strings; callers decide what missing means.
    pub fn read_column(path: &Path, sheet: Option<&str>, header: &str) -> Result<Vec<String>> {
        match Self::detect_kind(path)? {
            FileKind::Csv => {
                let mut reader = Self::csv_reader(path)?;
                let idx = reader
                    .headers()
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV headers: {}", e)))?
                    .iter()
                    .position(|h| h.trim() == header)
                    .ok_or_else(|| {
                        AppError::InvalidInput(format!("Column '{}' not found in file", header))
                    })?;

                let mut values = Vec::new();
                for record in reader.records() {
                    let record = record.map_err(|e| {
                        AppError::InvalidInput(format!("Failed to read CSV row: {}", e))
                    })?;
                    values.push(record.get(idx).unwrap_or("").trim().to_string());
                }
                Ok(values)
            }
            FileKind::Excel => {
                // calamine materializes the sheet either way; keep only the
                // requested projection.
                let range = Self::sheet_range(path, sheet)?;
                let mut rows = range.rows();
                let idx = match rows.next() {
                    Some(header_row) => header_row
                        .iter()
                        .map(cell_to_string)
                        .position(|h| h == header)
                        .ok_or_else(|| {
                            AppError::InvalidInput(format!("Column '{}' not found in file", header))
                        })?,
                    None => {
                        return Err(AppError::InvalidInput("Excel sheet is empty.".to_string()));
                    }
                };

                Ok(rows
                    .map(|row| row.get(idx).map(cell_to_string).unwrap_or_default())
                    .collect())
            }
        }
    }

    /// The full dataset, as the commit stage consumes it.
    pub fn read_all(path: &Path, sheet: Option<&str>) -> Result<Dataset> {
        match Self::detect_kind(path)? {
            FileKind::Csv => {
                let mut reader = Self::csv_reader(path)?;
                let headers: Vec<String> = reader
                    .headers()
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV headers: {}", e)))?
                    .iter()
                    .map(|s| s.trim().to_string())
                    .collect();

                let mut rows = Vec::new();
                let mut empty_rows_skipped = 0usize;

                for record in reader.records() {
                    let record = record.map_err(|e| {
                        AppError::InvalidInput(format!("Failed to read CSV row: {}", e))
                    })?;
                    let row: Vec<String> = record.iter().map(|s| s.trim().to_string()).collect();

                    if row.iter().all(|s| s.is_empty()) {
                        empty_rows_skipped += 1;
                        continue;
                    }
                    rows.push(row);
                }

                tracing::info!(
                    "Read CSV: {} rows, {} columns, {} empty rows skipped",
                    rows.len(),
                    headers.len(),
                    empty_rows_skipped
                );

                Ok(Dataset { headers, rows })
            }
            FileKind::Excel => {
                let range = Self::sheet_range(path, sheet)?;
                let mut rows_iter = range.rows();

                let headers = match rows_iter.next() {
                    Some(row) => row.iter().map(cell_to_string).collect::<Vec<String>>(),
                    None => {
                        return Err(AppError::InvalidInput("Excel sheet is empty.".to_string()));
                    }
                };

                let mut rows = Vec::new();
                let mut empty_rows_skipped = 0usize;

                for row in rows_iter {
                    let row_data: Vec<String> = row.iter().map(cell_to_string).collect();
                    if row_data.iter().all(|s| s.is_empty()) {
                        empty_rows_skipped += 1;
                        continue;
                    }
                    rows.push(row_data);
                }

                tracing::info!(
                    "Read Excel: {} rows, {} columns, {} empty rows skipped",
                    rows.len(),
                    headers.len(),
                    empty_rows_skipped
                );

                Ok(Dataset { headers, rows })
            }
        }
    }

    fn csv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
        let delimiter = Self::detect_csv_delimiter(path)?;

        ReaderBuilder::new()
            .delimiter(delimiter as u8)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to open CSV: {}", e)))
    }

    /// Detect CSV delimiter (comma, tab, semicolon, pipe) from the first line.
    fn detect_csv_delimiter(path: &Path) -> Result<char> {
        use std::io::{BufRead, BufReader};

        let file = std::fs::File::open(path)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to open CSV: {}", e)))?;
        let first_line = BufReader::new(file)
            .lines()
            .next()
            .transpose()
            .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV: {}", e)))?
            .unwrap_or_default();

        let mut counts: Vec<(char, usize)> = [',', '\t', ';', '|']
            .iter()
            .map(|delim| (*delim, first_line.matches(*delim).count()))
            .collect();

        counts.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(counts.first().map(|(d, _)| *d).unwrap_or(','))
    }

    fn sheet_range(path: &Path, sheet: Option<&str>) -> Result<Range<Data>> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| AppError::InvalidInput(format!("Failed to open Excel file: {}", e)))?;

        let sheet_name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| AppError::InvalidInput("Excel file contains no sheets.".to_string()))?,
        };

        workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse sheet {}: {}", sheet_name, e)))
    }
}

/// Convert an Excel cell to its string form. Date cells keep their serial
/// value; the normalizer recognizes serials when parsing dates.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            let s = format!("{}", f);
            if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                s
            }
        }
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("ERROR: {:?}", e),
        Data::Empty => String::new(),
    }
}
