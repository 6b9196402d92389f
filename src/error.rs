//! Error types for the scanner
//!
//! Missing data never reaches this type: signals resolve it to a zero
//! contribution on their own. What remains are configuration problems (fatal
//! to the run), storage failures (fatal, transaction rolled back) and
//! malformed per-symbol input (logged, symbol skipped).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("No price data for {0}")]
    NoPriceData(String),

    #[error("Malformed history for {symbol}: {reason}")]
    MalformedHistory { symbol: String, reason: String },
}

impl ScanError {
    /// True for errors that only affect one symbol and must not abort a batch
    pub fn is_per_symbol(&self) -> bool {
        matches!(self, ScanError::MalformedHistory { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_symbol_classification() {
        let malformed = ScanError::MalformedHistory {
            symbol: "ABC".to_string(),
            reason: "duplicate date 2024-01-02".to_string(),
        };
        assert!(malformed.is_per_symbol());
        assert!(!ScanError::Config("missing".to_string()).is_per_symbol());
        assert!(!ScanError::NoPriceData("2024-01-02".to_string()).is_per_symbol());
    }

    #[test]
    fn test_display_messages() {
        let err = ScanError::InvalidDate("2024/01/02".to_string());
        assert_eq!(err.to_string(), "Invalid date '2024/01/02', expected YYYY-MM-DD");
    }
}
