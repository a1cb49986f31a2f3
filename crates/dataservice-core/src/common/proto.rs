//! gRPC service and message definitions generated from `proto/app.proto`.
//!
//! ## Service
//!
//! - `GetNumber` - Unary lookup of a number by name.
//! - `GetString` - Unary lookup of a string by position.
//! - `GetFile` - Server-streaming download of a file as [`FileChunk`]s.
//!
//! ## Chunk Format
//!
//! Every [`FileChunk`] carries only valid file bytes in `content`, and `size`
//! always equals `content.len()`. Chunks are at most
//! [`FILE_CHUNK_SIZE`](crate::types::FILE_CHUNK_SIZE) bytes and only the last
//! chunk of a transfer may be shorter. An empty file produces no chunks.

tonic::include_proto!("app");

/// Encoded descriptor set for `app.proto`, served by gRPC reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("app_descriptor");
