//! Host platform resolution for release assets.
//!
//! Maps the host OS/architecture to the release asset published for it and
//! the local binary filename. The mapping is total: unknown combinations
//! fall back to the linux/amd64 asset rather than failing, so the bridge
//! still produces a deterministic install plan on unsupported hosts.

/// Asset used when the host OS/architecture has no published build.
const FALLBACK_ASSET: &str = "cloudflared-linux-amd64";

/// Operating systems the release feed publishes assets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl Os {
    /// Detect the host operating system.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            _ => Os::Other,
        }
    }
}

/// CPU architectures the release feed publishes assets for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    X86,
    Arm64,
    Arm,
    Other,
}

impl Arch {
    /// Detect the host architecture.
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => Arch::Amd64,
            "x86" => Arch::X86,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Arm,
            _ => Arch::Other,
        }
    }
}

/// Release asset resolved for one OS/architecture pair.
///
/// Immutable once computed for a run: `asset_name` is matched exactly
/// against the release's asset list and against the checksum lines in the
/// release notes, `binary_name` is the filename under the install root, and
/// `archived` marks assets delivered as gzip-compressed tar archives
/// (macOS only) that need a post-download extraction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryAsset {
    pub asset_name: String,
    pub binary_name: String,
    pub archived: bool,
}

/// Resolve the asset for the host platform.
pub fn resolve_asset() -> BinaryAsset {
    resolve_for(Os::current(), Arch::current())
}

/// Total mapping from an OS/architecture pair to its release asset.
pub fn resolve_for(os: Os, arch: Arch) -> BinaryAsset {
    let (asset_name, archived) = match (os, arch) {
        (Os::Windows, Arch::Amd64) => ("cloudflared-windows-amd64.exe", false),
        (Os::Windows, Arch::X86) => ("cloudflared-windows-386.exe", false),
        (Os::Linux, Arch::Amd64) => ("cloudflared-linux-amd64", false),
        (Os::Linux, Arch::X86) => ("cloudflared-linux-386", false),
        (Os::Linux, Arch::Arm64) => ("cloudflared-linux-arm64", false),
        (Os::Linux, Arch::Arm) => ("cloudflared-linux-arm", false),
        (Os::MacOs, Arch::Amd64) => ("cloudflared-darwin-amd64.tgz", true),
        (Os::MacOs, Arch::Arm64) => ("cloudflared-darwin-arm64.tgz", true),
        _ => (FALLBACK_ASSET, false),
    };

    BinaryAsset {
        asset_name: asset_name.to_string(),
        binary_name: binary_name(os).to_string(),
        archived,
    }
}

/// Local binary filename under the install root.
pub fn binary_name(os: Os) -> &'static str {
    if os == Os::Windows {
        "cloudflared.exe"
    } else {
        "cloudflared"
    }
}
