/// Builds the gRPC client and server code for the `app.proto` definition using
/// `tonic-prost-build`.
///
/// This code generation step processes the Protocol Buffer definitions located
/// in the `proto` directory and emits Rust modules with gRPC bindings into the
/// crate's `OUT_DIR`, along with an encoded file descriptor set used by the
/// reflection service.
///
/// # Byte Field Optimization
///
/// The `content` field in the `FileChunk` message is explicitly marked with
/// `.bytes(...)` so it is generated as `Bytes` (from the `bytes` crate) instead
/// of `Vec<u8>`. File chunks are then handed to the transport without another
/// copy.
///
/// # Files and Paths
///
/// - Proto file: `proto/app.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// This function will `panic!` if code generation fails.
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("app_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();

    config
        .bytes([".app.FileChunk.content"])
        .file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/app.proto"], &["proto"])
        .unwrap();
}
