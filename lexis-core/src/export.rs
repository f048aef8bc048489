// Spreadsheet export of collected entries

use lexis_scanner::Row;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const SHEET_NAME: &str = "Sheet1";
pub const NAME_HEADER: &str = "Name";

/// Rows an xlsx worksheet can hold, header included.
const XLSX_MAX_ROWS: usize = 1_048_576;

/// Characters that cannot appear in a file name on at least one common platform.
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} entries do not fit in one worksheet")]
    TooManyRows(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    /// Format implied by a file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_str)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Destination for a finished run's entries: one `Name` column, rows in the
/// order given.
pub trait RowSink {
    fn export(&self, rows: &[Row], path: &Path) -> Result<(), ExportError>;
}

pub struct XlsxSink;

impl RowSink for XlsxSink {
    fn export(&self, rows: &[Row], path: &Path) -> Result<(), ExportError> {
        if rows.len() >= XLSX_MAX_ROWS {
            return Err(ExportError::TooManyRows(rows.len()));
        }

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        let header = Format::new().set_bold();
        worksheet.write_string_with_format(0, 0, NAME_HEADER, &header)?;

        for (row_num, row) in (1u32..).zip(rows) {
            worksheet.write_string(row_num, 0, &row.name)?;
        }
        worksheet.set_column_width(0, 40)?;

        workbook.save(path)?;
        Ok(())
    }
}

pub struct CsvSink;

impl RowSink for CsvSink {
    fn export(&self, rows: &[Row], path: &Path) -> Result<(), ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        // Written by hand so an empty run still gets its header.
        writer.write_record([NAME_HEADER])?;
        for row in rows {
            writer.write_record([row.name.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub struct JsonSink;

impl RowSink for JsonSink {
    fn export(&self, rows: &[Row], path: &Path) -> Result<(), ExportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, rows)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

pub fn sink_for(format: ExportFormat) -> Box<dyn RowSink> {
    match format {
        ExportFormat::Xlsx => Box::new(XlsxSink),
        ExportFormat::Csv => Box::new(CsvSink),
        ExportFormat::Json => Box::new(JsonSink),
    }
}

/// Write `rows` to `path` in `format`, creating missing parent directories.
pub fn export_rows(rows: &[Row], path: &Path, format: ExportFormat) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    sink_for(format).export(rows, path)
}

/// Make a book title safe to use as a file stem.
pub fn sanitize_file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    cleaned.trim().trim_matches('.').trim().to_string()
}

/// `{title}.{ext}`, or `{book_id}.{ext}` when there is no usable title.
pub fn export_file_name(title: Option<&str>, book_id: &str, format: ExportFormat) -> String {
    let stem = title
        .map(sanitize_file_stem)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| sanitize_file_stem(book_id));

    format!("{}.{}", stem, format.extension())
}
