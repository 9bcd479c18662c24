//! # CloudflaredBridge Config
//!
//! Token-list configuration for the CloudflaredBridge lifecycle manager.
//!
//! The on-disk format is a `config.yml` in the bridge's install root with a
//! single `tokenlist` key holding an ordered list of tunnel tokens. A missing
//! file is materialized with placeholder entries so operators can see where
//! real tokens go.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{BridgeConfig, TOKEN_PLACEHOLDER};
