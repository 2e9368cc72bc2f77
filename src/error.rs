use thiserror::Error;

use crate::models::SchemaKind;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unrecognized roster layout: {0}")]
    UnrecognizedSchema(String),

    #[error("This report needs an {expected} roster, but the upload is a {found} roster")]
    WrongSchema {
        expected: SchemaKind,
        found: SchemaKind,
    },

    #[error("No matching data found for the given filters.")]
    NoMatchingData,

    #[error("No data found for session {0}. Please upload the roster again.")]
    SessionNotFound(String),

    #[error("Invalid pattern in configuration: {0}")]
    Pattern(#[from] regex::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}
