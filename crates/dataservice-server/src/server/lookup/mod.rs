//! Immutable lookup tables backing the unary RPCs.
//!
//! Both tables are built once from [`ServerConfig`] and never mutated
//! afterwards, so they are shared across concurrent calls behind an `Arc`
//! without any locking.
//!
//! - [`NumberTable`] - name to integer mapping for `GetNumber`.
//! - [`StringTable`] - ordered strings for `GetString`.
//!
//! [`ServerConfig`]: crate::server::config::ServerConfig

pub mod number;
pub mod string;

pub use number::{NumberEntry, NumberTable};
pub use string::StringTable;
