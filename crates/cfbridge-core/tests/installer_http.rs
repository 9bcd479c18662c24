//! End-to-end install/update tests against a mock release feed.

use std::sync::Arc;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cfbridge_core::installer::UpdateInstaller;
use cfbridge_core::platform::BinaryAsset;
use cfbridge_core::release::{sha256_file, HttpReleaseClient};
use cfbridge_core::sink::{MemorySink, SinkLevel};
use cfbridge_core::UpdateError;

const ASSET_NAME: &str = "cloudflared-linux-amd64";

fn linux_asset() -> BinaryAsset {
    BinaryAsset {
        asset_name: ASSET_NAME.to_string(),
        binary_name: "cloudflared".to_string(),
        archived: false,
    }
}

fn feed_json(server_uri: &str, digest: Option<&str>) -> serde_json::Value {
    let body = match digest {
        Some(digest) => format!("Release notes\n{ASSET_NAME}: {digest}\n"),
        None => "Release notes without checksums".to_string(),
    };
    serde_json::json!({
        "tag_name": "2026.8.1",
        "body": body,
        "assets": [
            {
                "name": ASSET_NAME,
                "browser_download_url": format!("{server_uri}/download/{ASSET_NAME}")
            },
            {
                "name": "cloudflared-windows-amd64.exe",
                "browser_download_url": format!("{server_uri}/download/other")
            }
        ]
    })
}

fn installer_for(server: &MockServer, sink: Arc<MemorySink>) -> UpdateInstaller {
    let client = HttpReleaseClient::with_url(format!("{}/releases/latest", server.uri()));
    UpdateInstaller::new(Arc::new(client), linux_asset(), sink)
}

async fn mount_feed(server: &MockServer, digest: Option<&str>) {
    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_json(&server.uri(), digest)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn matching_digest_performs_no_download() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let binary = dir.path().join("cloudflared");
    std::fs::write(&binary, b"current build").unwrap();
    let digest = sha256_file(&binary).unwrap();

    mount_feed(&server, Some(&digest)).await;
    // Any download request would 404 and fail the expect below.
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET_NAME}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let installer = installer_for(&server, sink.clone());
    installer.ensure_up_to_date(dir.path()).await.unwrap();

    assert_eq!(std::fs::read(&binary).unwrap(), b"current build");
    assert!(sink.contains(SinkLevel::Info, "up to date"));
}

#[tokio::test]
async fn mismatched_digest_downloads_once_and_replaces() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let binary = dir.path().join("cloudflared");
    std::fs::write(&binary, b"old build").unwrap();

    let wrong_digest = "a".repeat(64);
    mount_feed(&server, Some(&wrong_digest)).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET_NAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new build".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let installer = installer_for(&server, sink.clone());
    installer.ensure_up_to_date(dir.path()).await.unwrap();

    assert_eq!(std::fs::read(&binary).unwrap(), b"new build");
    assert!(sink.contains(SinkLevel::Info, "Hash mismatch"));
    assert!(!dir.path().join(format!("{ASSET_NAME}.part")).exists());
}

#[tokio::test]
async fn absent_digest_skips_update() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let binary = dir.path().join("cloudflared");
    std::fs::write(&binary, b"old build").unwrap();

    mount_feed(&server, None).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET_NAME}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let installer = installer_for(&server, sink.clone());
    installer.ensure_up_to_date(dir.path()).await.unwrap();

    assert_eq!(std::fs::read(&binary).unwrap(), b"old build");
    assert!(sink.contains(SinkLevel::Warning, "Skipping update check"));
}

#[tokio::test]
async fn fresh_install_downloads_binary() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_feed(&server, None).await;
    Mock::given(method("GET"))
        .and(path(format!("/download/{ASSET_NAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh build".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let installer = installer_for(&server, sink.clone());
    installer.ensure_up_to_date(dir.path()).await.unwrap();

    let binary = dir.path().join("cloudflared");
    assert_eq!(std::fs::read(&binary).unwrap(), b"fresh build");
}

#[tokio::test]
async fn unreachable_feed_is_a_network_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let installer = installer_for(&server, sink);
    let result = installer.ensure_up_to_date(dir.path()).await;

    assert!(matches!(result, Err(UpdateError::Network(_))));
}

#[tokio::test]
async fn malformed_feed_is_reported() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let installer = installer_for(&server, sink);
    let result = installer.ensure_up_to_date(dir.path()).await;

    assert!(matches!(result, Err(UpdateError::MalformedFeed(_))));
}
