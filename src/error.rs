/// Crate-level error type.
use crate::opc::error::OpcError;
use thiserror::Error;

/// Result type for crate-level operations.
pub type Result<T> = std::result::Result<T, PptxError>;

/// Errors surfaced by the presentation object model.
#[derive(Error, Debug)]
pub enum PptxError {
    /// Package machinery error
    #[error("package error: {0}")]
    Opc(#[from] OpcError),

    /// XML content error
    #[error("XML error: {0}")]
    Xml(String),

    /// An accessor's precondition does not hold (e.g., requesting data
    /// labels from a plot that has none)
    #[error("invalid state: {0}")]
    InvalidState(String),
}
