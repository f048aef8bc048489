use crate::export::ExportError;
use lexis_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(
        "Invalid book reference '{0}': expected a book page URL containing bookid=R<digits> or a bare R<digits> id"
    )]
    InvalidBook(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Config error in {path}: {message}")]
    Config { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
