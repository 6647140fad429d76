// src/lib.rs

pub mod application;
pub mod config;
pub mod core;
pub mod crypto;
pub mod kms;
pub mod storage;
pub mod withdrawal;

pub use crate::core::errors::WalletError;

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
