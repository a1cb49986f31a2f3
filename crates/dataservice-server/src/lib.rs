//! # `dataservice-server`: Lookup and File Streaming gRPC Service
//!
//! Library half of the `dataservice-server` binary. It implements the
//! `app.DataService` gRPC service from [`dataservice_core`]:
//!
//! - **`GetNumber`**: unary lookup of an integer by name.
//! - **`GetString`**: unary lookup of a string by position.
//! - **`GetFile`**: server-streaming download of a local file in
//!   [`FILE_CHUNK_SIZE`] chunks, with bounded memory per transfer.
//!
//! ## Module Overview
//!
//! - [`server::config`] - CLI/environment configuration.
//! - [`server::lookup`] - Immutable number and string tables.
//! - [`server::streaming`] - File transfers and their stream coordination.
//! - [`server::service`] - The tonic service implementation.
//! - [`server::telemetry`] - Logging, tracing and metrics setup.
//!
//! [`FILE_CHUNK_SIZE`]: dataservice_core::types::FILE_CHUNK_SIZE

pub mod server;
