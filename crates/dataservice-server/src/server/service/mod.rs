//! gRPC service implementation and lifecycle coordination.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point ([`AppService`]).
//! - [`lifecycle`] - In-flight stream tracking and graceful shutdown.

pub mod handler;
pub mod lifecycle;

use dataservice_core::proto::data_service_server::DataServiceServer;
use handler::AppService;
use tonic::codec::CompressionEncoding;

/// Wraps `service` in the generated tonic server, accepting and offering zstd,
/// gzip and deflate compression.
pub fn build_data_service(service: AppService) -> DataServiceServer<AppService> {
    DataServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
