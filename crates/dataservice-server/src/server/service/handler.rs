//! gRPC service implementation for lookups and chunked file downloads.
//!
//! This module defines [`AppService`], the concrete implementation of the
//! [`DataService`] gRPC service defined in `app.proto`.
//!
//! ## Responsibilities
//!
//! - Answer `GetNumber` and `GetString` from immutable tables.
//! - Open files for `GetFile` and hand each transfer to its own task via
//!   [`stream_file`].
//! - Report metrics, refuse calls during shutdown, and drain in-flight streams.

use crate::server::{
    config::ServerConfig,
    lookup::{NumberTable, StringTable},
    service::lifecycle::Lifecycle,
    streaming::{coordinator::stream_file, processor::FileTransfer},
    telemetry::{
        increment_bytes_streamed, increment_not_found, increment_requests,
        increment_stream_errors, record_stream_duration,
    },
};
use core::{pin::Pin, time::Duration};
use dataservice_core::proto::{
    FileChunk, FileRequest, NumberReply, NumberRequest, StringReply, StringRequest,
    data_service_server::DataService,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status};
use tracing::Instrument;

const GET_NUMBER: &str = "GetNumber";
const GET_STRING: &str = "GetString";
const GET_FILE: &str = "GetFile";

/// gRPC service serving number lookups, string lookups and file streams.
///
/// Cloning is cheap: the tables and lifecycle state are shared, so every clone
/// handed to tonic serves the same data and shuts down together.
#[derive(Clone)]
pub struct AppService {
    numbers: Arc<NumberTable>,
    strings: Arc<StringTable>,
    stream_buffer_size: usize,
    lifecycle: Arc<Lifecycle>,
}

impl AppService {
    /// Builds the lookup tables from `config`. Nothing is spawned until the
    /// first `GetFile` call.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            numbers: Arc::new(config.numbers.iter().cloned().collect()),
            strings: Arc::new(config.strings.iter().cloned().collect()),
            stream_buffer_size: config.stream_buffer_size,
            lifecycle: Arc::new(Lifecycle::new(Duration::from_secs(
                config.shutdown_timeout,
            ))),
        }
    }

    /// Number of `GetFile` streams currently running.
    pub fn streams_inflight(&self) -> usize {
        self.lifecycle.streams_inflight()
    }

    /// Initiates a graceful shutdown.
    ///
    /// New calls are refused with `UNAVAILABLE`, in-flight streams get the
    /// configured drain period, and whatever is still running afterwards is
    /// cancelled.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }
}

#[tonic::async_trait]
impl DataService for AppService {
    type GetFileStream = Pin<Box<dyn Stream<Item = Result<FileChunk, Status>> + Send>>;

    #[tracing::instrument(skip_all, fields(name = %req.get_ref().name))]
    async fn get_number(
        &self,
        req: Request<NumberRequest>,
    ) -> Result<Response<NumberReply>, Status> {
        increment_requests(GET_NUMBER);
        self.lifecycle.ensure_accepting()?;

        let number = self
            .numbers
            .get(&req.get_ref().name)
            .inspect_err(|_| increment_not_found(GET_NUMBER))?;

        Ok(Response::new(NumberReply { number }))
    }

    #[tracing::instrument(skip_all, fields(index = req.get_ref().index))]
    async fn get_string(
        &self,
        req: Request<StringRequest>,
    ) -> Result<Response<StringReply>, Status> {
        increment_requests(GET_STRING);
        self.lifecycle.ensure_accepting()?;

        let string = self
            .strings
            .get(req.get_ref().index)
            .inspect_err(|_| increment_not_found(GET_STRING))?
            .to_string();

        Ok(Response::new(StringReply { string }))
    }

    /// Streams a file back to the client in fixed-size chunks.
    ///
    /// The file is opened before responding, so a missing file fails the call
    /// with `NOT_FOUND` and no stream. Reading then happens on a spawned task
    /// that feeds a bounded channel; the client's response stream is the
    /// receiving end. Dropping it (client disconnect) stops the task and
    /// closes the file.
    #[tracing::instrument(skip_all, fields(filename = %req.get_ref().filename))]
    async fn get_file(
        &self,
        req: Request<FileRequest>,
    ) -> Result<Response<Self::GetFileStream>, Status> {
        let start = std::time::Instant::now();
        increment_requests(GET_FILE);
        self.lifecycle.ensure_accepting()?;

        let filename = req.into_inner().filename;
        let transfer = FileTransfer::open(&filename)
            .await
            .inspect_err(|_| increment_not_found(GET_FILE))?;

        let (resp_tx, resp_rx) =
            mpsc::channel::<Result<FileChunk, Status>>(self.stream_buffer_size);
        let guard = self.lifecycle.track_stream();
        let cancel = self.lifecycle.stream_token();

        let fut = async move {
            let _guard = guard;
            match stream_file(transfer, resp_tx, cancel).await {
                Ok(summary) => {
                    record_stream_duration(start.elapsed().as_millis() as f64);
                    tracing::debug!(
                        chunks = summary.chunks,
                        bytes = summary.bytes,
                        "File stream completed"
                    );
                }
                Err(e) => {
                    increment_stream_errors();
                    tracing::warn!("File stream ended early: {}", e);
                }
            }
        };
        tokio::spawn(fut.instrument(tracing::info_span!("streaming")));

        let stream =
            ReceiverStream::new(resp_rx).inspect_ok(|chunk| increment_bytes_streamed(chunk.size));

        Ok(Response::new(Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{lookup::NumberEntry, telemetry::LogFormat};
    use dataservice_core::types::FILE_CHUNK_SIZE;
    use tokio::time::{sleep, timeout};
    use tokio_stream::StreamExt;
    use tonic::Code;

    fn config() -> ServerConfig {
        ServerConfig {
            server_addr: "127.0.0.1:0".to_string(),
            uds: false,
            stream_buffer_size: 2,
            shutdown_timeout: 0,
            numbers: ["one=1", "two=2", "three=3", "four=4"]
                .into_iter()
                .map(|s| s.parse::<NumberEntry>().unwrap())
                .collect(),
            strings: ["foo", "bar", "spam", "ham", "eggs"]
                .into_iter()
                .map(String::from)
                .collect(),
            log_format: LogFormat::Pretty,
        }
    }

    fn file_request(path: &std::path::Path) -> Request<FileRequest> {
        Request::new(FileRequest {
            filename: path.to_str().unwrap().to_string(),
        })
    }

    async fn collect(mut stream: <AppService as DataService>::GetFileStream) -> Vec<FileChunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.unwrap());
        }
        chunks
    }

    async fn wait_for_idle(service: &AppService) {
        timeout(Duration::from_secs(5), async {
            while service.streams_inflight() > 0 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("streams did not finish");
    }

    #[tokio::test]
    async fn get_number() {
        let service = AppService::new(&config());

        let reply = service
            .get_number(Request::new(NumberRequest {
                name: "three".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(reply.get_ref().number, 3);

        let status = service
            .get_number(Request::new(NumberRequest {
                name: "five".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "Number with name five not found");
    }

    #[tokio::test]
    async fn get_string() {
        let service = AppService::new(&config());

        let reply = service
            .get_string(Request::new(StringRequest { index: 1 }))
            .await
            .unwrap();
        assert_eq!(reply.get_ref().string, "bar");

        for index in [5, -1, i64::MIN] {
            let status = service
                .get_string(Request::new(StringRequest { index }))
                .await
                .unwrap_err();
            assert_eq!(status.code(), Code::NotFound);
            assert_eq!(
                status.message(),
                format!("String with index {index} not found")
            );
        }
    }

    #[tokio::test]
    async fn get_file_streams_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..3 * FILE_CHUNK_SIZE + 5).map(|i| (i * 7) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let service = AppService::new(&config());
        let stream = service
            .get_file(file_request(&path))
            .await
            .unwrap()
            .into_inner();
        let chunks = collect(stream).await;

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.last().unwrap().size, 5);
        let joined: Vec<u8> = chunks
            .iter()
            .flat_map(|c| c.content.iter().copied())
            .collect();
        assert_eq!(joined, data);

        wait_for_idle(&service).await;
    }

    #[tokio::test]
    async fn get_file_empty_file_yields_no_chunks() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let service = AppService::new(&config());

        let stream = service
            .get_file(file_request(file.path()))
            .await
            .unwrap()
            .into_inner();
        assert!(collect(stream).await.is_empty());
    }

    #[tokio::test]
    async fn get_file_missing_is_not_found_without_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        let service = AppService::new(&config());

        let status = match service.get_file(file_request(&path)).await {
            Ok(_) => panic!("expected NOT_FOUND"),
            Err(status) => status,
        };
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(
            status.message(),
            format!("File {} not found", path.to_str().unwrap())
        );
        assert_eq!(service.streams_inflight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_of_one_file_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.bin");
        let data: Vec<u8> = (0..50 * FILE_CHUNK_SIZE + 333)
            .map(|i| (i % 256) as u8)
            .collect();
        std::fs::write(&path, &data).unwrap();

        let service = AppService::new(&config());
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                let req = file_request(&path);
                tokio::spawn(async move {
                    let stream = service.get_file(req).await.unwrap().into_inner();
                    collect(stream).await
                })
            })
            .collect();

        for task in tasks {
            let chunks = task.await.unwrap();
            assert_eq!(chunks.len(), 51);
            let joined: Vec<u8> = chunks
                .iter()
                .flat_map(|c| c.content.iter().copied())
                .collect();
            assert_eq!(joined, data);
        }
    }

    #[tokio::test]
    async fn dropping_the_stream_cancels_the_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0xAB_u8; 256 * FILE_CHUNK_SIZE]).unwrap();

        let service = AppService::new(&config());
        let mut stream = service
            .get_file(file_request(&path))
            .await
            .unwrap()
            .into_inner();

        assert!(stream.next().await.unwrap().is_ok());
        assert_eq!(service.streams_inflight(), 1);
        drop(stream);

        wait_for_idle(&service).await;
    }

    #[tokio::test]
    async fn shutdown_cancels_streams_and_refuses_new_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![1_u8; 256 * FILE_CHUNK_SIZE]).unwrap();

        let service = AppService::new(&config());
        // Never polled, so the transfer parks on a full channel.
        let stream = service
            .get_file(file_request(&path))
            .await
            .unwrap()
            .into_inner();

        service.shutdown().await;
        assert_eq!(service.streams_inflight(), 0);

        // Only what was already buffered, possibly followed by UNAVAILABLE.
        let items: Vec<_> = stream.collect().await;
        assert!(items.len() <= 3);
        for item in &items {
            if let Err(status) = item {
                assert_eq!(status.code(), Code::Unavailable);
            }
        }

        let status = service
            .get_number(Request::new(NumberRequest {
                name: "one".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);

        let status = match service.get_file(file_request(&path)).await {
            Ok(_) => panic!("expected UNAVAILABLE"),
            Err(status) => status,
        };
        assert_eq!(status.code(), Code::Unavailable);
    }
}
