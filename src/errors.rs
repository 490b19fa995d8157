/*!
 * Error types for the gamemtl application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

use crate::project::UnitId;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

/// Errors that can occur while extracting from or writing back into game data
#[derive(Error, Debug)]
pub enum CodecError {
    /// No data directory was found in the project folder
    #[error("No data directory found under: {0}")]
    DataDirNotFound(String),

    /// A data file could not be parsed as JSON
    #[error("Malformed JSON in {file}: {message}")]
    MalformedJson {
        /// Data file name
        file: String,
        /// Parse error detail
        message: String,
    },

    /// A unit identity could not be resolved against the backup tree.
    /// Indicates the backup snapshot is stale relative to the project state.
    #[error("Structural mismatch: unit {0} not found in backup tree")]
    StructuralMismatch(UnitId),

    /// The backup snapshot is missing a file the project state references
    #[error("Backup snapshot is missing file: {0}")]
    BackupFileMissing(String),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the codec
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A single-unit operation was requested while the unit is in flight in a batch
    #[error("Unit {0} is currently in flight in a running batch")]
    UnitInFlight(UnitId),

    /// A single-unit operation named a unit the project does not contain
    #[error("Unknown unit: {0}")]
    UnitNotFound(UnitId),

    /// A batch is already running on this orchestrator
    #[error("A batch is already running")]
    BatchAlreadyRunning,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the codec
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::File(error.to_string())
    }
}
