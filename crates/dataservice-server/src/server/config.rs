use crate::server::{lookup::NumberEntry, telemetry::LogFormat};
use anyhow::bail;
use clap::Parser;
use std::collections::HashSet;

/// Runtime configuration for the `dataservice-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults that reproduce the stock lookup tables.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dataservice-server",
    version,
    about = "A gRPC service for number/string lookups and chunked file streaming"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/dataservice.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Capacity, in chunks, of the buffer between a file reader and its gRPC
    /// response stream.
    ///
    /// A reader pauses once this many chunks are waiting for the client, so
    /// memory per transfer stays bounded. The default keeps a single chunk
    /// queued; higher values trade memory for deeper pipelining.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 1)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for in-flight file streams to finish during shutdown
    /// before they are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Number table served by `GetNumber`, as comma-separated `name=value`
    /// pairs. Names must be unique.
    ///
    /// Environment variable: `NUMBERS`
    #[arg(
        long,
        env = "NUMBERS",
        value_delimiter = ',',
        default_values = ["one=1", "two=2", "three=3", "four=4"]
    )]
    pub numbers: Vec<NumberEntry>,

    /// String table served by `GetString`, as a comma-separated list. Index 0
    /// is the first entry.
    ///
    /// Environment variable: `STRINGS`
    #[arg(
        long,
        env = "STRINGS",
        value_delimiter = ',',
        default_values = ["foo", "bar", "spam", "ham", "eggs"]
    )]
    pub strings: Vec<String>,

    /// Console log format.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: u64,
    pub numbers: Vec<NumberEntry>,
    pub strings: Vec<String>,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        let mut seen = HashSet::with_capacity(args.numbers.len());
        for entry in &args.numbers {
            if !seen.insert(entry.name.as_str()) {
                bail!("NUMBERS contains duplicate name `{}`", entry.name);
            }
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: args.shutdown_timeout,
            numbers: args.numbers,
            strings: args.strings,
            log_format: args.log_format,
        })
    }
}
