//! Tunnel process supervision.
//!
//! One child process per usable token, launched strictly in list order with
//! a staggered delay between consecutive launches. The token → process
//! registry is a concurrent map whose entry guard makes the
//! check-liveness-then-insert step atomic per token, so two overlapping
//! `start` calls can never both launch a tunnel for the same token.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use cfbridge_config::BridgeConfig;

use crate::sink::BridgeSink;

/// Floor applied to the inter-launch delay. Lower values are raised to
/// avoid registration bursts against the tunnel backend.
pub const MIN_LAUNCH_DELAY_SECS: u64 = 5;

/// How long a process gets to exit after a graceful termination request
/// before it is force-killed.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// A launched tunnel process tracked by the registry.
struct ManagedProcess {
    child: Child,
}

impl ManagedProcess {
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

/// Supervises tunnel child processes keyed by token.
pub struct ProcessSupervisor {
    registry: DashMap<String, ManagedProcess>,
    work_dir: PathBuf,
    sink: Arc<dyn BridgeSink>,
}

impl ProcessSupervisor {
    pub fn new(work_dir: PathBuf, sink: Arc<dyn BridgeSink>) -> Self {
        Self {
            registry: DashMap::new(),
            work_dir,
            sink,
        }
    }

    /// Launch one tunnel per usable token, in list order, waiting
    /// `delay_seconds` (floored at [`MIN_LAUNCH_DELAY_SECS`]) between
    /// consecutive launches.
    ///
    /// Placeholder and blank tokens are skipped. A token whose process is
    /// already alive is skipped with a warning; a dead registry entry is
    /// replaced. Launch failures are logged and the sequence continues.
    /// Cancelling `cancel` during an inter-launch wait aborts the rest of
    /// the sequence; already-started processes keep running.
    ///
    /// Returns the number of processes launched.
    pub async fn start(
        &self,
        tokens: &[String],
        binary_path: &Path,
        delay_seconds: u64,
        cancel: &CancellationToken,
    ) -> usize {
        let delay_seconds = if delay_seconds < MIN_LAUNCH_DELAY_SECS {
            self.sink.warning(&format!(
                "Delay specified was less than {MIN_LAUNCH_DELAY_SECS} seconds. \
                 Enforcing minimum delay of {MIN_LAUNCH_DELAY_SECS} seconds."
            ));
            MIN_LAUNCH_DELAY_SECS
        } else {
            delay_seconds
        };

        let launchable: Vec<&String> = tokens
            .iter()
            .filter(|t| !BridgeConfig::is_unset(t))
            .collect();

        let mut launched = 0;
        for (idx, token) in launchable.iter().enumerate() {
            let ok = self.launch(token, binary_path);
            if ok {
                launched += 1;
            }

            if ok && idx + 1 < launchable.len() {
                self.sink.info(&format!(
                    "Waiting {delay_seconds}s before starting next tunnel..."
                ));
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_secs(delay_seconds)) => {}
                    () = cancel.cancelled() => {
                        self.sink.warning("Start sequence interrupted.");
                        break;
                    }
                }
            }
        }

        launched
    }

    /// Atomic check-and-launch for one token. The registry entry guard is
    /// held across the (synchronous) spawn, so concurrent callers cannot
    /// both launch for the same token.
    fn launch(&self, token: &str, binary_path: &Path) -> bool {
        match self.registry.entry(token.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get_mut().is_alive() {
                    self.sink.warning(&format!(
                        "A tunnel for token ending in {} is already running.",
                        mask_token(token)
                    ));
                    return false;
                }
                // Stale entry: the process died since the last start.
                match self.spawn_process(token, binary_path) {
                    Ok(process) => {
                        entry.insert(process);
                        true
                    }
                    Err(e) => {
                        entry.remove();
                        self.sink.severe(&format!("Failed to start cloudflared: {e}"));
                        false
                    }
                }
            }
            Entry::Vacant(entry) => match self.spawn_process(token, binary_path) {
                Ok(process) => {
                    entry.insert(process);
                    true
                }
                Err(e) => {
                    self.sink.severe(&format!("Failed to start cloudflared: {e}"));
                    false
                }
            },
        }
    }

    fn spawn_process(&self, token: &str, binary_path: &Path) -> std::io::Result<ManagedProcess> {
        self.sink.info("Starting cloudflared tunnel...");
        let mut child = Command::new(binary_path)
            .args(["tunnel", "--no-autoupdate", "run", "--token", token])
            .current_dir(&self.work_dir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        // Drain both streams so the child never blocks on a full pipe. The
        // reader tasks end on their own when the streams close.
        if let Some(stdout) = child.stdout.take() {
            drain_stream(stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            drain_stream(stderr);
        }

        self.sink.info(&format!(
            "Started cloudflared process for token ending in {}",
            mask_token(token)
        ));
        Ok(ManagedProcess { child })
    }

    /// Stop every tracked process: request graceful termination, wait up to
    /// the grace period, then force-kill. Entries are handled concurrently
    /// and the registry is left empty regardless of individual outcomes.
    pub async fn stop(&self) {
        if self.registry.is_empty() {
            return;
        }
        self.sink.info("Stopping all cloudflared processes...");

        let tokens: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        let mut shutdowns = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let Some((token, process)) = self.registry.remove(&token) {
                shutdowns.push(shutdown_process(token, process));
            }
        }
        futures::future::join_all(shutdowns).await;

        self.registry.clear();
        self.sink.info("All cloudflared processes stopped.");
    }

    /// Whether a live process is tracked for this token.
    pub fn is_running(&self, token: &str) -> bool {
        self.registry
            .get_mut(token)
            .map(|mut entry| entry.is_alive())
            .unwrap_or(false)
    }

    /// Number of registry entries, live or not.
    pub fn tracked_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of currently live processes.
    pub fn running_count(&self) -> usize {
        let mut count = 0;
        for mut entry in self.registry.iter_mut() {
            if entry.is_alive() {
                count += 1;
            }
        }
        count
    }
}

/// Graceful-then-forced shutdown of one process.
async fn shutdown_process(token: String, mut process: ManagedProcess) {
    if !process.is_alive() {
        return;
    }

    request_graceful(&mut process.child);
    match tokio::time::timeout(STOP_GRACE, process.child.wait()).await {
        Ok(_) => {
            debug!("Tunnel for token ending in {} exited", mask_token(&token));
        }
        Err(_) => {
            debug!(
                "Tunnel for token ending in {} did not exit within {:?}, force killing",
                mask_token(&token),
                STOP_GRACE
            );
            let _ = process.child.start_kill();
            let _ = process.child.wait().await;
        }
    }
}

#[cfg(unix)]
fn request_graceful(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
}

#[cfg(not(unix))]
fn request_graceful(child: &mut Child) {
    // No portable graceful signal; termination doubles as the request.
    let _ = child.start_kill();
}

fn drain_stream<R>(stream: R)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(_)) = lines.next_line().await {}
    });
}

/// Render only the tail of a token for log output.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let start = chars.len().saturating_sub(5);
    let tail: String = chars[start..].iter().collect();
    format!("...{tail}")
}
