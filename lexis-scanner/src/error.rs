use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Error fetching data: {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ScanError>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// HTTP status of the failure, looking through retry exhaustion.
    pub fn status(&self) -> Option<u16> {
        match self {
            ScanError::Status { status, .. } => Some(*status),
            ScanError::HttpError(e) => e.status().map(|s| s.as_u16()),
            ScanError::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
