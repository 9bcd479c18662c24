//! # CloudflaredBridge Core
//!
//! Lifecycle management for the externally distributed `cloudflared` binary
//! and the tunnel processes it runs.
//!
//! ## Features
//!
//! - Platform-aware release asset resolution
//! - Checksum-verified install/update against the GitHub release feed
//! - Supervision of one tunnel process per configured token
//! - Staggered, cancellable startup and graceful-then-forced shutdown
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cfbridge_core::BridgeManager;
//!
//! let manager = BridgeManager::new("cloudflared");
//! manager.init().await;
//! manager.start(10).await;
//! // ...
//! manager.stop().await;
//! ```

pub mod error;
pub mod installer;
pub mod manager;
pub mod platform;
pub mod release;
pub mod sink;
pub mod supervisor;

// Re-exports
pub use error::{BridgeError, UpdateError};
pub use installer::UpdateInstaller;
pub use manager::BridgeManager;
pub use platform::{resolve_asset, Arch, BinaryAsset, Os};
pub use release::{HttpReleaseClient, Release, ReleaseAsset, ReleaseClient};
pub use sink::{BridgeSink, MemorySink, SinkLevel, TracingSink};
pub use supervisor::{ProcessSupervisor, MIN_LAUNCH_DELAY_SECS};
