//! The module contains the errors the engine can return.
//!
//! Computation never fails: aggregation and pricing always produce a number.
//! Errors only come from parsing user input and from the external
//! collaborators (record store, document service).
//!
//! - [`KeyNotFound`] returned when a document job is unknown to the caller.
//! - [`Store`] returned when the record store cannot be read.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Store`]: EngineError::Store
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid customer: {0}")]
    InvalidCustomer(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Record store error: {0}")]
    Store(String),
    #[error("Document service error: {0}")]
    DocumentService(String),
}
