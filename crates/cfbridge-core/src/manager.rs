//! Bridge composition root.
//!
//! Owns the install root, the token list, the installer, and the
//! supervisor. The three public operations (`init`, `start`, `stop`) never
//! return errors; every outcome is reported through the configured
//! [`BridgeSink`], which is the contract hosts observe.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use cfbridge_config::ConfigLoader;

use crate::error::BridgeError;
use crate::installer::UpdateInstaller;
use crate::platform::{resolve_asset, BinaryAsset};
use crate::release::{HttpReleaseClient, ReleaseClient};
use crate::sink::{BridgeSink, TracingSink};
use crate::supervisor::ProcessSupervisor;

/// Config filename under the install root.
const CONFIG_FILE: &str = "config.yml";

/// Manages the cloudflared install and its tunnel processes.
pub struct BridgeManager {
    root_dir: PathBuf,
    asset: BinaryAsset,
    /// Replaced wholesale on reload; components other than the manager
    /// never mutate it.
    tokens: RwLock<Vec<String>>,
    installer: UpdateInstaller,
    supervisor: ProcessSupervisor,
    sink: Arc<dyn BridgeSink>,
}

impl BridgeManager {
    /// Create a manager against the default release feed, logging through
    /// tracing.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_parts(
            root_dir,
            Arc::new(HttpReleaseClient::new()),
            Arc::new(TracingSink),
        )
    }

    /// Create a manager with explicit collaborators. The release client
    /// and sink seams exist for hosts and for tests.
    pub fn with_parts(
        root_dir: impl Into<PathBuf>,
        client: Arc<dyn ReleaseClient>,
        sink: Arc<dyn BridgeSink>,
    ) -> Self {
        let root_dir = root_dir.into();
        let asset = resolve_asset();
        let installer = UpdateInstaller::new(client, asset.clone(), sink.clone());
        let supervisor = ProcessSupervisor::new(root_dir.clone(), sink.clone());

        Self {
            root_dir,
            asset,
            tokens: RwLock::new(Vec::new()),
            installer,
            supervisor,
            sink,
        }
    }

    /// Path of the managed binary under the install root.
    pub fn binary_path(&self) -> PathBuf {
        self.root_dir.join(&self.asset.binary_name)
    }

    /// Tunnel process supervisor, for hosts that inspect process state.
    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Ensure the install root exists, load the token list, and bring the
    /// binary up to date. Failures are logged, never propagated.
    pub async fn init(&self) {
        if let Err(e) = self.init_inner().await {
            self.sink
                .severe(&format!("Failed to initialize CloudflaredBridge: {e}"));
        }
    }

    async fn init_inner(&self) -> Result<(), BridgeError> {
        if !self.root_dir.exists() {
            std::fs::create_dir_all(&self.root_dir)?;
        }

        let config = ConfigLoader::load_or_create(&self.root_dir.join(CONFIG_FILE))?;
        debug!("Loaded {} token entries", config.tokenlist.len());
        *self.tokens.write().await = config.tokenlist;

        self.installer.ensure_up_to_date(&self.root_dir).await?;
        Ok(())
    }

    /// Start one tunnel per usable token with the given inter-launch delay.
    pub async fn start(&self, delay_seconds: u64) {
        let cancel = CancellationToken::new();
        self.start_with_cancel(delay_seconds, &cancel).await;
    }

    /// Like [`start`](Self::start), but the host controls interruption:
    /// cancelling the token during an inter-launch wait truncates the
    /// remaining sequence without touching already-started processes.
    pub async fn start_with_cancel(&self, delay_seconds: u64, cancel: &CancellationToken) {
        let tokens = self.tokens.read().await.clone();
        if tokens.is_empty() {
            self.sink
                .warning("No tokens found in config.yml. Cloudflared will not start.");
            return;
        }

        // Re-verify the install; a failed check falls back to an existing
        // binary rather than blocking startup.
        let binary_path = self.binary_path();
        if let Err(e) = self.installer.ensure_up_to_date(&self.root_dir).await {
            self.sink
                .severe(&format!("Failed to check for updates: {e}"));
            if !binary_path.exists() {
                return;
            }
        }

        if !binary_path.exists() {
            self.sink
                .severe("Cloudflared binary not found! Cannot start.");
            return;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(&binary_path, std::fs::Permissions::from_mode(0o755))
            {
                self.sink
                    .warning(&format!("Could not mark binary executable: {e}"));
            }
        }

        self.supervisor
            .start(&tokens, &binary_path, delay_seconds, cancel)
            .await;
    }

    /// Stop every tracked tunnel process.
    pub async fn stop(&self) {
        self.supervisor.stop().await;
    }
}
