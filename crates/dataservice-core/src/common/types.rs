//! Constants shared by the server and its clients.

/// Maximum number of bytes carried by a single [`FileChunk`].
///
/// Every chunk of a transfer except the last one is exactly this size.
///
/// [`FileChunk`]: crate::proto::FileChunk
pub const FILE_CHUNK_SIZE: usize = 1 << 10;
