use std::path::PathBuf;

/// Errors from loading or saving a Q-table.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to access q-table {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode q-table: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode q-table: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("q-table JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed q-table: {0}")]
    Malformed(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
