//! Suite configuration: which imposters exist, where their contracts live,
//! and how to reach the mock server's management endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Mountebank's documented default management port.
pub const DEFAULT_PORT: u16 = 2525;

/// Errors raised while loading or validating a suite configuration.
///
/// All of these surface before any remote call is made; a suite with a bad
/// configuration never starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required 'host' field in suite configuration")]
    MissingHost,
    #[error("missing 'contract' field in imposter configuration ('{0}')")]
    MissingContract(String),
    #[error("failed to read suite configuration")]
    Io(#[from] std::io::Error),
    #[error("malformed suite configuration")]
    Yaml(#[from] serde_yaml::Error),
}

/// One configured imposter, keyed by alias in [`SuiteConfig::imposters`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImposterSpec {
    /// Contract document the imposter is created from, resolved against the
    /// configuration file's directory.
    #[serde(default)]
    pub contract: PathBuf,

    /// Restore before every test regardless of whether the test replaced it.
    #[serde(default)]
    pub mock: bool,

    /// Persist the imposter's final configuration here at suite end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<PathBuf>,
}

impl ImposterSpec {
    pub fn new(contract: impl Into<PathBuf>) -> Self {
        Self {
            contract: contract.into(),
            mock: false,
            save: None,
        }
    }

    /// Flag the imposter for unconditional restoration before each test.
    pub fn volatile(mut self) -> Self {
        self.mock = true;
        self
    }

    /// Persist the imposter's final configuration to `path` at suite end.
    pub fn save_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.save = Some(path.into());
        self
    }
}

/// A suite run's view of the mock server and its imposters.
///
/// Aliases iterate in sorted order (the map is a `BTreeMap`), so provisioning
/// assigns ports deterministically across runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuiteConfig {
    /// Mock server host, e.g. "localhost". Required.
    #[serde(default)]
    pub host: String,

    /// Mock server management port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Imposters keyed by alias.
    #[serde(default)]
    pub imposters: BTreeMap<String, ImposterSpec>,

    /// Directory that contract and save paths resolve against. Set from the
    /// configuration file's location; empty for programmatic configs.
    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl SuiteConfig {
    /// Programmatic configuration against the default management port.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            imposters: BTreeMap::new(),
            base_dir: PathBuf::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_imposter(mut self, alias: impl Into<String>, spec: ImposterSpec) -> Self {
        self.imposters.insert(alias.into(), spec);
        self
    }

    /// Load and validate a YAML suite configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: SuiteConfig = serde_yaml::from_str(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Check required fields. Runs before any remote call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        for (alias, spec) in &self.imposters {
            if spec.contract.as_os_str().is_empty() {
                return Err(ConfigError::MissingContract(alias.clone()));
            }
        }
        Ok(())
    }

    /// Resolve a configured path against the configuration file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
