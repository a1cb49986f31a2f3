#![doc = include_str!("../README.md")]

use clap::Parser;
use core::future::pending;
use dataservice_core::proto::{FILE_DESCRIPTOR_SET, data_service_server::DataServiceServer};
use dataservice_server::server::{
    config::{CliArgs, ServerConfig},
    service::{build_data_service, handler::AppService},
    telemetry::init_telemetry,
};
use futures::Stream;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::transport::server::Connected;
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let config = ServerConfig::try_from(CliArgs::parse())?;

    let providers = init_telemetry(config.log_format)?;
    let result = listen_and_serve(&config).await;
    match &result {
        Ok(()) => tracing::info!("Service shut down successfully"),
        Err(e) => tracing::error!("Service stopped with error: {e:#}"),
    }

    // Exporters are flushed last so the shutdown itself is recorded.
    providers.shutdown();
    result
}

/// Binds the configured listener and serves until a shutdown signal arrives.
async fn listen_and_serve(config: &ServerConfig) -> anyhow::Result<()> {
    let service = AppService::new(config);
    let addr = config.server_addr.as_str();

    tracing::info!(
        addr,
        uds = config.uds,
        numbers = config.numbers.len(),
        strings = config.strings.len(),
        stream_buffer_size = config.stream_buffer_size,
        "Starting data service"
    );
    tracing::debug!(?config, "Full server configuration");

    if !config.uds {
        let incoming = TcpListenerStream::new(TcpListener::bind(addr).await?);
        return serve(incoming, service).await;
    }

    #[cfg(unix)]
    {
        use tokio::net::UnixListener;
        use tokio_stream::wrappers::UnixListenerStream;
        let incoming = UnixListenerStream::new(UnixListener::bind(addr)?);
        let result = serve(incoming, service).await;
        // Best effort; a panic still leaves the socket file behind.
        if let Err(e) = std::fs::remove_file(addr) {
            tracing::warn!("Failed to remove socket file {addr}: {e}");
        }
        result
    }
    #[cfg(not(unix))]
    {
        anyhow::bail!("Unix domain sockets are not supported on this platform");
    }
}

async fn serve<I, IO, IE>(incoming: I, service: AppService) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<DataServiceServer<AppService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(ServiceBuilder::new().layer(cors).layer(GrpcWebLayer::new()))
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_data_service(service.clone()))
        .serve_with_incoming_shutdown(incoming, drain_on_signal(service, health_reporter))
        .await?;

    Ok(())
}

/// Resolves once Ctrl+C or SIGTERM has been received and the service has
/// drained, letting tonic close the remaining connections.
async fn drain_on_signal(service: AppService, health_reporter: HealthReporter) {
    tokio::select! {
        () = ctrl_c() => tracing::info!("Received Ctrl+C signal"),
        () = terminate() => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    health_reporter
        .set_not_serving::<DataServiceServer<AppService>>()
        .await;

    // Refuse new calls, drain and cancel file streams
    service.shutdown().await;
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {e}");
        pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to install SIGTERM handler: {e}");
            pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    pending::<()>().await;
}
