//! Shared protocol bindings, constants and error definitions.
//!
//! ## Submodules
//!
//! - [`error`] - Service error type and its mapping onto gRPC status codes.
//! - [`proto`] - Generated message types, client and server for `app.proto`.
//! - [`types`] - Constants shared by the server and its clients.

pub mod error;
pub mod proto;
pub mod types;

pub use error::{Error, Result};
