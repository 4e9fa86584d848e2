use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default bucket holding persisted queries.
pub const DEFAULT_BUCKET: &str = "persisted-queries";

/// Which capability a deployment hands out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Lookup only, for query-executing processes.
    #[default]
    ReadOnly,
    /// Lookup and registration, for the administrative path.
    ReadWrite,
}

impl AccessMode {
    pub fn allows_writes(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Object-storage backend selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum BackendConfig {
    /// Process-local storage; the configured bucket is created empty.
    Memory,
    /// Buckets are directories under `root`.
    Filesystem { root: PathBuf },
    /// Amazon S3 or an S3-compatible service. Credentials come from the
    /// standard AWS environment.
    S3 {
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        force_path_style: bool,
    },
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Filesystem { .. } => "filesystem",
            Self::S3 { .. } => "s3",
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Filesystem {
            root: PathBuf::from("./queries"),
        }
    }
}

/// Persisted query storage settings, usually loaded from TOML:
///
/// ```toml
/// bucket = "persisted-queries"
/// mode = "read-write"
///
/// [backend]
/// kind = "s3"
/// region = "eu-west-1"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub bucket: String,
    pub mode: AccessMode,
    pub backend: BackendConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            mode: AccessMode::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("bucket must not be blank".into()));
        }
        match &self.backend {
            BackendConfig::Filesystem { root } if root.as_os_str().is_empty() => Err(
                ConfigError::Invalid("filesystem backend needs a root directory".into()),
            ),
            BackendConfig::S3 {
                endpoint: Some(endpoint),
                ..
            } if endpoint.trim().is_empty() => {
                Err(ConfigError::Invalid("s3 endpoint must not be blank".into()))
            }
            _ => Ok(()),
        }
    }
}
