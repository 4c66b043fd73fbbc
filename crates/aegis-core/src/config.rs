use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration (loaded from aegis.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AegisConfig {
    pub log: LogConfig,
    pub security: SecurityConfig,
    pub archive: ArchiveConfig,
}

impl AegisConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error: defaults are returned and a warning
    /// is logged.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or EnvFilter directive (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Security settings applied to newly created archives.
///
/// Existing archives always use the settings recorded in their own metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// AEAD algorithm: "aes-256-gcm" or "xchacha20-poly1305"
    pub encryption_algo: String,
    /// KDF: "pbkdf2" or "argon2id"
    pub key_derivation_function: String,
    /// PBKDF2 iterations / Argon2id time cost (default: 100000)
    pub key_derivation_work_factor: u32,
    /// Bytes of KDF output reserved for the key id (default: 16)
    pub key_id_size_in_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_algo: "aes-256-gcm".into(),
            key_derivation_function: "pbkdf2".into(),
            key_derivation_work_factor: 100_000,
            key_id_size_in_bytes: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory for files extracted out of an archive
    pub scratch_dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("~/.cache/aegis"),
        }
    }
}

/// Where an archive lives on disk and where extracted files are staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSettings {
    pub archive_path: PathBuf,
    pub scratch_dir: PathBuf,
}

impl FileSettings {
    pub fn new(archive_path: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Build settings for `archive_path`, taking the scratch directory from config.
    pub fn from_config(archive_path: impl Into<PathBuf>, config: &ArchiveConfig) -> Self {
        Self {
            archive_path: expand_tilde(&archive_path.into()),
            scratch_dir: expand_tilde(&config.scratch_dir),
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        return home_dir().join(rest);
    }
    path.to_path_buf()
}
