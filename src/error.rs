//! Defines the application's primary error type `AppError` and a convenience `Result` alias.
//!
//! Uses the `thiserror` crate for ergonomic error definition and provides `From`
//! implementations to convert common external errors into `AppError` variants.
//! Errors that do not implement `Clone` are wrapped in `Arc` to allow `AppError` to be cloneable.

use std::sync::Arc;
use thiserror::Error;

/// The primary error enumeration for all application-specific errors.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// A required field (volume name or backup size) was left empty.
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Input that is present but unusable (e.g. a non-numeric backup size).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encryption was requested but the password prompt returned an empty string.
    #[error("Encryption requested but no password was provided")]
    MissingPassword,

    /// The user declined the final confirmation. A voluntary cancellation, not a failure.
    #[error("Cancelled by user")]
    Cancelled,

    /// The platform identifier query (`ioreg`) failed or produced unparseable output.
    #[error("Hardware identifier query failed: {0}")]
    Hardware(String),

    /// One of the external tools (hdiutil, tmutil, ioreg) could not be found.
    #[error("Required tool not found on this system: {0}")]
    MissingTool(String),

    /// `hdiutil create` exited non-zero, or the bundle was missing afterwards.
    #[error("Disk image creation failed: {0}")]
    CreationFailed(String),

    /// `tmutil inheritbackup` exited non-zero.
    #[error("Backup inheritance failed: {0}")]
    InheritanceFailed(String),

    /// Error related to standard I/O operations.
    #[error("I/O Error: {0}")]
    Io(Arc<std::io::Error>),

    /// Error originating from user interaction prompts (`dialoguer`).
    #[error("Dialoguer Error: {0}")]
    Dialoguer(Arc<dialoguer::Error>),

    /// Error related to progress bar style templating (`indicatif`).
    #[error("Progress Style Template Error: {0}")]
    Template(Arc<indicatif::style::TemplateError>),
}

/// A specialized `Result` type using the application's `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// --- From implementations ---
// These allow easy conversion from external error types into AppError
// using the `?` operator. Arc is used for non-Clone error types.

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(Arc::new(err))
    }
}

impl From<dialoguer::Error> for AppError {
    fn from(err: dialoguer::Error) -> Self {
        AppError::Dialoguer(Arc::new(err))
    }
}

impl From<indicatif::style::TemplateError> for AppError {
    fn from(err: indicatif::style::TemplateError) -> Self {
        AppError::Template(Arc::new(err))
    }
}
