//! Error types for the data service.
//!
//! This module defines the central `Error` enum, which captures every failure a
//! call can end with. It implements `From<Error>` for `tonic::Status` so that
//! handlers can propagate with `?` and clients receive the matching gRPC status
//! code.
//!
//! ## Error Cases
//! - `NumberNotFound`, `StringNotFound`, `FileNotFound`: the requested key does
//!   not resolve. Mapped to `NOT_FOUND` with a detail naming the key.
//! - `ReadFailed`: reading a file failed after it was opened (mid-stream).
//! - `RequestCancelled`: the client went away mid-flight.
//! - `ServiceShutdown`: a request arrived while the service was shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the data service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No number is registered under the requested name.
    #[error("Number with name {name} not found")]
    NumberNotFound { name: String },

    /// The requested index is negative or past the end of the string table.
    #[error("String with index {index} not found")]
    StringNotFound { index: i64 },

    /// The requested file could not be opened.
    #[error("File {filename} not found")]
    FileNotFound { filename: String },

    /// Reading the file failed after streaming had started.
    #[error("Failed to read file {filename}: {reason}")]
    ReadFailed { filename: String, reason: String },

    /// The client aborted the request.
    #[error("Request cancelled by client")]
    RequestCancelled,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            e @ (Error::NumberNotFound { .. }
            | Error::StringNotFound { .. }
            | Error::FileNotFound { .. }) => Status::not_found(e.to_string()),
            e @ Error::ReadFailed { .. } => Status::internal(e.to_string()),
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
