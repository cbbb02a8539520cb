use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("not a TOD5 file: {reason}")]
    FormatMismatch { reason: String },

    #[error("header row {row_index} invalid: {message}")]
    InvalidHeader { row_index: usize, message: String },

    #[error("data row {line_index} invalid: {message}")]
    DataRow { line_index: usize, message: String },

    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("file did not contain any data rows")]
    EmptyData,

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown detector uid {uid} in load options")]
    UnknownDetector { uid: u32 },
}
