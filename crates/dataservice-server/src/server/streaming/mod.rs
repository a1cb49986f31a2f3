//! Chunked file streaming.
//!
//! - [`processor`] - [`FileTransfer`](processor::FileTransfer), which owns an
//!   open file and reads it chunk by chunk.
//! - [`coordinator`] - [`stream_file`](coordinator::stream_file), which pumps a
//!   transfer into a gRPC response channel and handles cancellation.

pub mod coordinator;
pub mod processor;
