use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetIntakeError {
    #[error("Unrecognized statement format: no detection strategy cleared its threshold (best confidence {best_confidence:.2})")]
    UnrecognizedFormat { best_confidence: f64 },

    #[error("Cannot save: {uncategorized} active account(s) still need a category")]
    ValidationIncomplete { uncategorized: usize },

    #[error("Month index {index} is out of range for a series of {len} month(s)")]
    InvalidMonthIndex { index: usize, len: usize },

    #[error("Invalid month range {start}..={end} for a series of {len} month(s)")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("The monthly series is empty")]
    EmptySeries,

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate subcategory '{code}' in scope {scope}")]
    DuplicateSubcategory { code: String, scope: String },

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<calamine::Error> for SheetIntakeError {
    fn from(err: calamine::Error) -> Self {
        SheetIntakeError::Workbook(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SheetIntakeError>;
