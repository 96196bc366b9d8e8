use thiserror::Error;

/// Capture or estimation failed. The ledger is never touched when this is raised.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no image data received")]
    Empty,
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
    #[error("invalid base64 image payload")]
    InvalidBase64,
    #[error("failed to read upload: {0}")]
    Read(String),
    #[error("calorie estimation failed: {0}")]
    Estimator(String),
    #[error("calorie estimation timed out after {0}s")]
    Timeout(u64),
    #[error("stamp meal time: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl CaptureError {
    /// Message shown to the user next to the drop zone.
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::Empty | CaptureError::UnsupportedType(_) => {
                "Please choose an image file."
            }
            _ => "Failed to process image. Try another photo.",
        }
    }
}

/// Writing the serialized ledger failed. The in-memory snapshot stays authoritative.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write key {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Persisted ledger could not be used. Always mapped to an empty ledger.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read key {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed ledger value: {0}")]
    Malformed(#[from] serde_json::Error),
}
