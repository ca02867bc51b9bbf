//! Disposable containers for integration tests.
//!
//! Every fixture here needs a running Docker daemon; tests built on them are
//! marked `#[ignore]` and run with `cargo test -- --ignored`.

pub mod error;
pub mod mysql;
pub mod redis;

pub use error::{Result, TestInfraError};
