use bytes::Bytes;
use dataservice_core::{Error, Result, proto::FileChunk, types::FILE_CHUNK_SIZE};
use std::path::Path;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt},
};

/// Lifecycle of a single [`FileTransfer`].
///
/// A transfer only exists once the open succeeded, so it starts out
/// `Streaming` and ends in one of the two terminal states. There is no way back
/// to `Streaming`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
    Streaming,
    Completed,
    Failed,
}

/// One in-progress read of a file, producing [`FileChunk`]s in file order.
///
/// The transfer exclusively owns its reader (and therefore its read cursor).
/// Dropping the transfer closes the underlying file, so every way of ending a
/// transfer, including cancellation, releases the handle.
///
/// Each chunk is read into a freshly allocated buffer and handed off as
/// [`Bytes`], so `content` never holds stale data and `size` always equals
/// `content.len()`.
#[derive(Debug)]
pub struct FileTransfer<R = File> {
    filename: String,
    reader: R,
    expected_len: Option<u64>,
    bytes_read: u64,
    chunks_read: u64,
    state: TransferState,
}

impl FileTransfer<File> {
    /// Opens `filename` for reading.
    ///
    /// The length reported by the filesystem at open time is remembered for
    /// regular files, so that a file truncated while streaming is reported as
    /// a failure instead of silently delivered short.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if the file cannot be opened for any
    /// reason or names a directory. No chunk is produced in that case.
    pub async fn open(filename: &str) -> Result<Self> {
        let not_found = || Error::FileNotFound {
            filename: filename.to_string(),
        };

        let file = File::open(Path::new(filename))
            .await
            .map_err(|_| not_found())?;
        let metadata = file.metadata().await.map_err(|_| not_found())?;
        if metadata.is_dir() {
            return Err(not_found());
        }

        let expected_len = metadata.is_file().then(|| metadata.len());
        Ok(Self::from_reader(filename, file, expected_len))
    }
}

impl<R> FileTransfer<R>
where
    R: AsyncRead + Unpin,
{
    /// Wraps an already opened reader.
    ///
    /// `expected_len`, when known, is the number of bytes the source is
    /// expected to contain; reaching end-of-input earlier fails the transfer.
    pub fn from_reader(filename: impl Into<String>, reader: R, expected_len: Option<u64>) -> Self {
        Self {
            filename: filename.into(),
            reader,
            expected_len,
            bytes_read: 0,
            chunks_read: 0,
            state: TransferState::Streaming,
        }
    }

    pub const fn state(&self) -> TransferState {
        self.state
    }

    pub const fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub const fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Reads the next chunk of the file.
    ///
    /// Keeps reading until the chunk is full or the source reports
    /// end-of-input, so short reads from the underlying medium never produce
    /// an undersized chunk in the middle of the file. Returns `Ok(None)` once
    /// the file is exhausted; an empty chunk is never returned.
    ///
    /// After the transfer reaches a terminal state this always returns
    /// `Ok(None)` without touching the reader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the reader fails, or if end-of-input
    /// arrives before the length observed at open time. The transfer is
    /// `Failed` afterwards.
    pub async fn next_chunk(&mut self) -> Result<Option<FileChunk>> {
        if self.state != TransferState::Streaming {
            return Ok(None);
        }

        let mut buf = vec![0_u8; FILE_CHUNK_SIZE];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(e.to_string())),
            }
        }

        if filled == 0 {
            if let Some(expected) = self.expected_len {
                if self.bytes_read < expected {
                    return Err(self.fail(format!(
                        "file truncated during transfer: expected {expected} bytes, read {}",
                        self.bytes_read
                    )));
                }
            }
            self.state = TransferState::Completed;
            return Ok(None);
        }

        buf.truncate(filled);
        self.bytes_read += filled as u64;
        self.chunks_read += 1;

        Ok(Some(FileChunk {
            content: Bytes::from(buf),
            size: filled as u64,
        }))
    }

    fn fail(&mut self, reason: String) -> Error {
        self.state = TransferState::Failed;
        Error::ReadFailed {
            filename: self.filename.clone(),
            reason,
        }
    }
}
