//! Server-side components of the data service.
//!
//! ## Submodules
//!
//! - [`config`] - Runtime configuration parsed from CLI arguments and the
//!   environment.
//! - [`lookup`] - Number and string tables backing the unary lookups.
//! - [`service`] - gRPC service implementation and lifecycle state.
//! - [`streaming`] - Chunked file reading and delivery to the response stream.
//! - [`telemetry`] - Structured logging plus optional tracing and metrics.
//!
//! These components are wired together in the server's `main.rs`.

pub mod config;
pub mod lookup;
pub mod service;
pub mod streaming;
pub mod telemetry;
