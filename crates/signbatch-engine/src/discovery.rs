//! signtool.exe discovery.
//!
//! Resolution order: explicit override from config, then a `where` lookup on
//! PATH (Windows only), then a sweep over the known Windows Kits bin
//! directories. The sweep globs the versioned `10.0.*` subdirectories and
//! ranks every candidate by SDK version, preferring x64 over x86, so a
//! machine with several SDKs installed always gets the newest tool.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use signbatch_core::config::SdkConfig;

/// File name of the signing tool.
pub const SIGNTOOL_EXE: &str = "signtool.exe";

/// A resolved signing tool installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Absolute path to signtool.exe.
    pub signtool: PathBuf,
    /// SDK version parsed from the path, when present (e.g. "10.0.22621.0").
    pub sdk_version: Option<String>,
}

impl Toolchain {
    fn from_path(signtool: PathBuf) -> Self {
        let sdk_version = parse_sdk_version(&signtool);
        Self {
            signtool,
            sdk_version,
        }
    }
}

/// Discovery failures. Both abort a batch before any file is touched.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("signtool.exe not found; install the Windows SDK or set SIGNBATCH_SIGNTOOL")]
    NotFound,

    #[error("Configured signtool path does not exist: {}", .path.display())]
    OverrideMissing { path: PathBuf },
}

/// Locates signtool.exe on disk.
#[derive(Debug, Clone)]
pub struct SigntoolLocator {
    override_path: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
}

impl SigntoolLocator {
    /// Locator over the standard Windows Kits install roots.
    pub fn new() -> Self {
        Self {
            override_path: None,
            search_dirs: default_search_dirs(),
        }
    }

    /// Locator restricted to the given directories. Used by tests and by
    /// `extra_search_dirs` in config.
    pub const fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            override_path: None,
            search_dirs,
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        let mut locator = Self::new();
        locator.override_path.clone_from(&config.signtool_path);
        locator
            .search_dirs
            .extend(config.extra_search_dirs.iter().cloned());
        locator
    }

    #[must_use]
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_path = path;
        self
    }

    /// Resolve signtool.exe, or fail with [`DiscoveryError`].
    pub fn discover(&self) -> Result<Toolchain, DiscoveryError> {
        if let Some(path) = &self.override_path {
            if path.is_file() {
                info!(path = %path.display(), "Using configured signtool path");
                return Ok(Toolchain::from_path(path.clone()));
            }
            return Err(DiscoveryError::OverrideMissing { path: path.clone() });
        }

        if let Some(path) = lookup_on_path() {
            info!(path = %path.display(), "Found signtool.exe on PATH");
            return Ok(Toolchain::from_path(path));
        }

        let mut candidates = Vec::new();
        for dir in &self.search_dirs {
            sweep_dir(dir, &mut candidates);
        }
        debug!(count = candidates.len(), "signtool candidate sweep finished");

        candidates
            .into_iter()
            .max_by_key(|path| candidate_rank(path))
            .map(|path| {
                let toolchain = Toolchain::from_path(path);
                info!(
                    path = %toolchain.signtool.display(),
                    sdk_version = ?toolchain.sdk_version,
                    "Found signtool.exe in SDK directory"
                );
                toolchain
            })
            .ok_or(DiscoveryError::NotFound)
    }
}

impl Default for SigntoolLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard Windows Kits bin roots.
fn default_search_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from(r"C:\Program Files (x86)\Windows Kits\10\bin"),
        PathBuf::from(r"C:\Program Files\Windows Kits\10\bin"),
    ]
}

/// `where signtool.exe` on PATH. Windows only; `where` does not exist
/// elsewhere and the SDK tool cannot either.
#[cfg(windows)]
fn lookup_on_path() -> Option<PathBuf> {
    let output = std::process::Command::new("where")
        .arg(SIGNTOOL_EXE)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .map(str::trim)
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

#[cfg(not(windows))]
fn lookup_on_path() -> Option<PathBuf> {
    None
}

/// Collect signtool.exe candidates beneath one bin root: the root itself,
/// plain arch subdirectories, and versioned `10.0.xxxxx.0` subdirectories.
fn sweep_dir(dir: &Path, candidates: &mut Vec<PathBuf>) {
    let direct = dir.join(SIGNTOOL_EXE);
    if direct.is_file() {
        candidates.push(direct);
    }

    for arch in ["x64", "x86"] {
        let path = dir.join(arch).join(SIGNTOOL_EXE);
        if path.is_file() {
            candidates.push(path);
        }
    }

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if version_regex().is_match(name) {
            for arch in ["x64", "x86"] {
                let path = entry.path().join(arch).join(SIGNTOOL_EXE);
                if path.is_file() {
                    candidates.push(path);
                }
            }
        }
    }
}

/// Ordering key: SDK version first, then x64 over x86.
fn candidate_rank(path: &Path) -> ([u64; 4], bool) {
    let version = parse_sdk_version(path)
        .map(|v| version_key(&v))
        .unwrap_or_default();
    let is_x64 = path
        .components()
        .any(|c| c.as_os_str().eq_ignore_ascii_case("x64"));
    (version, is_x64)
}

/// Extracts a dotted SDK version (e.g. "10.0.22621.0") from a signtool path.
fn parse_sdk_version(path: &Path) -> Option<String> {
    let text = path.to_string_lossy();
    version_regex().find(&text).map(|m| m.as_str().to_string())
}

#[allow(clippy::expect_used)]
fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+\.\d+").expect("static regex pattern is valid"))
}

fn version_key(version: &str) -> [u64; 4] {
    let mut key = [0u64; 4];
    for (slot, part) in key.iter_mut().zip(version.split('.')) {
        *slot = part.parse().unwrap_or(0);
    }
    key
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plant(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel).join(SIGNTOOL_EXE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"stub").unwrap();
        path
    }

    #[test]
    fn parses_sdk_version_from_path() {
        let path = Path::new(r"C:\Windows Kits\10\bin\10.0.22621.0\x64\signtool.exe");
        assert_eq!(parse_sdk_version(path).as_deref(), Some("10.0.22621.0"));
        assert_eq!(parse_sdk_version(Path::new("bin/x64/signtool.exe")), None);
    }

    #[test]
    fn newest_sdk_version_wins() {
        let dir = TempDir::new().unwrap();
        plant(dir.path(), "10.0.19041.0/x64");
        let newest = plant(dir.path(), "10.0.22621.0/x64");
        plant(dir.path(), "10.0.22000.0/x64");

        let locator = SigntoolLocator::with_search_dirs(vec![dir.path().to_path_buf()]);
        let toolchain = locator.discover().unwrap();
        assert_eq!(toolchain.signtool, newest);
        assert_eq!(toolchain.sdk_version.as_deref(), Some("10.0.22621.0"));
    }

    #[test]
    fn x64_is_preferred_over_x86_at_equal_version() {
        let dir = TempDir::new().unwrap();
        plant(dir.path(), "10.0.22621.0/x86");
        let x64 = plant(dir.path(), "10.0.22621.0/x64");

        let locator = SigntoolLocator::with_search_dirs(vec![dir.path().to_path_buf()]);
        assert_eq!(locator.discover().unwrap().signtool, x64);
    }

    #[test]
    fn unversioned_arch_dir_is_found() {
        let dir = TempDir::new().unwrap();
        let tool = plant(dir.path(), "x64");
        let locator = SigntoolLocator::with_search_dirs(vec![dir.path().to_path_buf()]);
        assert_eq!(locator.discover().unwrap().signtool, tool);
    }

    #[test]
    fn empty_dirs_mean_not_found() {
        let dir = TempDir::new().unwrap();
        let locator = SigntoolLocator::with_search_dirs(vec![dir.path().to_path_buf()]);
        assert!(matches!(locator.discover(), Err(DiscoveryError::NotFound)));
    }

    #[test]
    fn override_skips_discovery_but_must_exist() {
        let dir = TempDir::new().unwrap();
        let tool = plant(dir.path(), "custom");
        let locator = SigntoolLocator::with_search_dirs(Vec::new())
            .with_override(Some(tool.clone()));
        assert_eq!(locator.discover().unwrap().signtool, tool);

        let missing = dir.path().join("gone").join(SIGNTOOL_EXE);
        let locator = SigntoolLocator::with_search_dirs(Vec::new())
            .with_override(Some(missing));
        assert!(matches!(
            locator.discover(),
            Err(DiscoveryError::OverrideMissing { .. })
        ));
    }
}
