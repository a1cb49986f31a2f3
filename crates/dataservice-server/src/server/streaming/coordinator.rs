use super::processor::FileTransfer;
use dataservice_core::{Error, proto::FileChunk};
use tokio::{io::AsyncRead, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Totals of a finished transfer, used for metrics and logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub chunks: u64,
    pub bytes: u64,
}

/// Drives a [`FileTransfer`] to completion, forwarding each chunk to the
/// response stream channel.
///
/// Chunks are read one at a time and sent in file order; the bounded `resp_tx`
/// channel provides backpressure, so at most one chunk is held here while the
/// client catches up.
///
/// The transfer is consumed: whichever way this function returns, the file
/// handle is dropped before it does.
///
/// # Arguments
///
/// - `transfer`: An opened transfer, still in the `Streaming` state.
/// - `resp_tx`: Channel feeding the gRPC response stream.
/// - `cancel`: Token cancelled when the service shuts down.
///
/// # Behavior
///
/// - Returns the totals once end-of-input is reached.
/// - On a read error, closes the file and then makes a best effort to surface
///   the error to the client as the final stream item before returning it.
///   Shutdown interrupts that attempt like any other send.
/// - Stops reading as soon as the client disconnects (the receiving half is
///   dropped) or `cancel` fires. No chunk is sent after that point; on
///   shutdown an `UNAVAILABLE` status is queued if the buffer has room.
pub async fn stream_file<R>(
    mut transfer: FileTransfer<R>,
    resp_tx: mpsc::Sender<Result<FileChunk, Status>>,
    cancel: CancellationToken,
) -> dataservice_core::Result<TransferSummary>
where
    R: AsyncRead + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(shutdown(&resp_tx)),
            () = resp_tx.closed() => return Err(Error::RequestCancelled),
            next = transfer.next_chunk() => next,
        };

        match next {
            Ok(Some(chunk)) => {
                let sent = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(shutdown(&resp_tx)),
                    sent = resp_tx.send(Ok(chunk)) => sent,
                };
                // The only way a send fails is the receiver being gone.
                if sent.is_err() {
                    return Err(Error::RequestCancelled);
                }
            }
            Ok(None) => {
                return Ok(TransferSummary {
                    chunks: transfer.chunks_read(),
                    bytes: transfer.bytes_read(),
                });
            }
            Err(e) => {
                // Release the file before waiting on a slow client.
                drop(transfer);
                let forwarded = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(shutdown(&resp_tx)),
                    sent = resp_tx.send(Err(e.clone().into())) => sent,
                };
                if let Err(err) = forwarded {
                    tracing::warn!("Failed to forward err: {}", err);
                }
                return Err(e);
            }
        }
    }
}

/// Tells the client, if there is room in the buffer, that the stream ended
/// early because of shutdown. Never waits.
fn shutdown(resp_tx: &mpsc::Sender<Result<FileChunk, Status>>) -> Error {
    let _ = resp_tx.try_send(Err(Error::ServiceShutdown.into()));
    Error::ServiceShutdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::streaming::processor::tests::{TrickleReader, pattern};
    use dataservice_core::types::FILE_CHUNK_SIZE;
    use core::time::Duration;
    use std::sync::atomic::Ordering;
    use tokio::time::timeout;
    use tonic::Code;

    #[tokio::test]
    async fn forwards_every_chunk_in_order() {
        let data = pattern(5 * FILE_CHUNK_SIZE + 100);
        let reader = TrickleReader::new(data.clone(), 300);
        let transfer = FileTransfer::from_reader("ordered", reader, None);
        let (tx, mut rx) = mpsc::channel(2);

        let task = tokio::spawn(stream_file(transfer, tx, CancellationToken::new()));

        let mut received = Vec::new();
        let mut chunks = 0;
        while let Some(item) = rx.recv().await {
            let chunk = item.unwrap();
            received.extend_from_slice(&chunk.content[..chunk.size as usize]);
            chunks += 1;
        }

        let summary = task.await.unwrap().unwrap();
        assert_eq!(received, data);
        assert_eq!(chunks, 6);
        assert_eq!(
            summary,
            TransferSummary {
                chunks: 6,
                bytes: data.len() as u64
            }
        );
    }

    #[tokio::test]
    async fn empty_source_sends_nothing() {
        let reader = TrickleReader::new(Vec::new(), 1);
        let transfer = FileTransfer::from_reader("empty", reader, Some(0));
        let (tx, mut rx) = mpsc::channel(1);

        let summary = stream_file(transfer, tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary, TransferSummary::default());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn read_error_is_the_last_item() {
        let reader = TrickleReader::new(pattern(4096), 1024).failing_at(2048);
        let transfer = FileTransfer::from_reader("flaky", reader, None);
        let (tx, mut rx) = mpsc::channel(8);

        let err = stream_file(transfer, tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadFailed { .. }));

        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.unwrap().is_ok());
        let status = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_interrupts_error_forwarding_to_a_stalled_client() {
        let reader = TrickleReader::new(pattern(4096), 1024).failing_at(1024);
        let open = reader.open_handles();
        let transfer = FileTransfer::from_reader("stalled", reader, None);
        // Capacity one: the first chunk fills the channel and is never read.
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(stream_file(transfer, tx, cancel.clone()));

        // The reader is released as soon as the read fails, before the error
        // is queued for the client.
        timeout(Duration::from_secs(5), async {
            while open.load(Ordering::SeqCst) > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("file handle still open");
        assert!(!task.is_finished());

        cancel.cancel();
        let err = timeout(Duration::from_secs(5), task)
            .await
            .expect("transfer did not stop")
            .unwrap()
            .unwrap_err();
        assert_eq!(err, Error::ServiceShutdown);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn client_disconnect_stops_reading_and_releases_handle() {
        let reader = TrickleReader::new(pattern(64 * FILE_CHUNK_SIZE), FILE_CHUNK_SIZE);
        let open = reader.open_handles();
        let transfer = FileTransfer::from_reader("abandoned", reader, None);
        let (tx, mut rx) = mpsc::channel(1);

        let task = tokio::spawn(stream_file(transfer, tx, CancellationToken::new()));

        assert!(rx.recv().await.unwrap().is_ok());
        drop(rx);

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, Error::RequestCancelled);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shutdown_cancels_transfer() {
        let reader = TrickleReader::new(pattern(64 * FILE_CHUNK_SIZE), FILE_CHUNK_SIZE);
        let open = reader.open_handles();
        let transfer = FileTransfer::from_reader("shutdown", reader, None);
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(stream_file(transfer, tx, cancel.clone()));

        assert!(rx.recv().await.unwrap().is_ok());
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, Error::ServiceShutdown);
        assert_eq!(open.load(Ordering::SeqCst), 0);

        // At most one already-buffered item drains, then the stream ends.
        let mut leftover = Vec::new();
        while let Some(item) = rx.recv().await {
            leftover.push(item);
        }
        assert!(leftover.len() <= 1);
        if let Some(Err(status)) = leftover.pop() {
            assert_eq!(status.code(), Code::Unavailable);
        }
    }
}
