//! Suite- and test-level orchestration of imposters.
//!
//! One [`Harness`] instance owns a suite run: the alias-to-port registry, the
//! per-test mutation ledger and descriptor cache, and the transport to the
//! mock server. The host runner drives it through three hooks:
//!
//! - [`Harness::on_suite_start`] wipes the server and provisions every
//!   configured imposter;
//! - [`Harness::on_test_start`] restores imposters the previous test dirtied
//!   (or that are flagged volatile) from their original contracts;
//! - [`Harness::on_suite_end`] persists configured imposters to disk.
//!
//! Execution is sequential: one runner task awaits each operation to
//! completion, so provisioning finishes before any test and restoration
//! finishes before the test body. Parallel test workers would need disjoint
//! alias sets or their own mock server.

mod registry;

pub use registry::Registry;

use crate::client::{HttpTransport, Transport, TransportError};
use crate::config::SuiteConfig;
use crate::imposter::{Imposter, RecordedRequest};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Errors surfaced by harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The alias is not present in the suite configuration. Always a
    /// test-author bug; never retried, never defaulted.
    #[error("imposter '{0}' is not present in configuration")]
    UnknownAlias(String),

    /// A replace came back on a different port than the alias was
    /// provisioned on. Fatal: every later lookup through this alias would
    /// address the wrong imposter.
    #[error("failed to replace imposter '{alias}' at port {expected}: new imposter port does not match ({actual})")]
    PortMismatch {
        alias: String,
        expected: u16,
        actual: u16,
    },

    /// `replace_with_cached` was called before anything was fetched for the
    /// alias this test.
    #[error("unable to replace imposter '{0}' with cached instance: no cached instance found")]
    NoCachedImposter(String),

    /// A contract without a pinned port cannot be addressed without a
    /// provisioning run to learn its assigned port.
    #[error("imposter '{0}' contract does not pin a port; run provisioning to assign one")]
    UnpinnedContract(String),

    /// A transport failure attributed to an alias and operation.
    #[error("{operation} failed for imposter '{alias}'")]
    Operation {
        alias: String,
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// A transport failure outside any single alias (the global wipe).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An expectation over recorded interactions did not hold.
    #[error("{0}")]
    Assertion(String),
}

/// What to replace an imposter with.
#[derive(Debug, Clone)]
pub enum ReplaceSource {
    /// A contract document on disk, resolved against the configuration
    /// file's directory.
    FromFile(PathBuf),
    /// An already-constructed descriptor, submitted as-is.
    Descriptor(Imposter),
}

/// Restoration policy: an imposter is restored before a test when it is
/// flagged volatile in configuration or was replaced since the last
/// restoration point.
fn should_restore(volatile: bool, mutated: bool) -> bool {
    volatile || mutated
}

pub struct Harness {
    config: SuiteConfig,
    transport: Arc<dyn Transport>,
    registry: Registry,
    /// Mutation ledger: aliases replaced since the last restoration pass.
    replaced: HashSet<String>,
}

impl Harness {
    pub fn new(config: SuiteConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            registry: Registry::new(),
            replaced: HashSet::new(),
        }
    }

    /// Build a harness talking HTTP to the configured management endpoint.
    pub fn from_config(config: SuiteConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(&config.host, config.port));
        Self::new(config, transport)
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Direct access to the transport, for operations outside the alias
    /// vocabulary.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Port `alias` was provisioned on.
    pub fn resolve_port(&self, alias: &str) -> Result<u16, HarnessError> {
        self.registry.resolve_port(alias)
    }

    // ===== Lifecycle hooks =====

    /// Suite start: wipe the server, then provision every configured
    /// imposter from its contract and pin its alias to the assigned port.
    ///
    /// Aliases are walked in sorted order so port assignment is
    /// deterministic. Any failure propagates and aborts the suite; a missing
    /// imposter makes the remaining tests meaningless.
    pub async fn on_suite_start(&mut self) -> Result<(), HarnessError> {
        info!("wiping mock server before provisioning");
        self.transport.wipe_all().await?;
        for (alias, spec) in &self.config.imposters {
            let contract = self.config.resolve_path(&spec.contract);
            let port = self
                .transport
                .create_from_file(&contract)
                .await
                .map_err(|source| HarnessError::Operation {
                    alias: alias.clone(),
                    operation: "provisioning",
                    source,
                })?;
            info!(alias = %alias, port, "provisioned imposter");
            self.registry.record_port(alias, port);
        }
        Ok(())
    }

    /// Test start: drop the descriptor cache, restore every imposter the
    /// restoration policy selects, then clear the mutation ledger.
    pub async fn on_test_start(&mut self) -> Result<(), HarnessError> {
        self.registry.clear_cache();
        let to_restore: Vec<String> = self
            .config
            .imposters
            .iter()
            .filter(|(alias, spec)| {
                should_restore(spec.mock, self.replaced.contains(alias.as_str()))
            })
            .map(|(alias, _)| alias.clone())
            .collect();
        for alias in to_restore {
            self.restore_imposter(&alias).await?;
        }
        self.replaced.clear();
        Ok(())
    }

    /// Bind each alias to the port its contract document pins, without
    /// touching the mock server. Lets a separate process (the CLI `save`
    /// subcommand) address imposters provisioned by an earlier run.
    pub async fn adopt_configured_ports(&mut self) -> Result<(), HarnessError> {
        for (alias, spec) in &self.config.imposters {
            let contract = self.config.resolve_path(&spec.contract);
            let raw = tokio::fs::read_to_string(&contract)
                .await
                .map_err(|err| HarnessError::Operation {
                    alias: alias.clone(),
                    operation: "adopting",
                    source: TransportError::Io(err),
                })?;
            let document: Value =
                serde_json::from_str(&raw).map_err(|err| HarnessError::Operation {
                    alias: alias.clone(),
                    operation: "adopting",
                    source: TransportError::InvalidContract(err),
                })?;
            let port = document
                .get("port")
                .and_then(Value::as_u64)
                .and_then(|port| u16::try_from(port).ok())
                .ok_or_else(|| HarnessError::UnpinnedContract(alias.clone()))?;
            debug!(alias = %alias, port, "adopted pinned port");
            self.registry.record_port(alias, port);
        }
        Ok(())
    }

    /// Suite end: persist every imposter configured with a save path. Write
    /// failures propagate; silent data loss would defeat the feature.
    pub async fn on_suite_end(&mut self) -> Result<(), HarnessError> {
        for (alias, spec) in &self.config.imposters {
            let Some(save) = &spec.save else { continue };
            let port = self.registry.resolve_port(alias)?;
            let destination = self.config.resolve_path(save);
            self.transport
                .save_to_path(port, &destination)
                .await
                .map_err(|source| HarnessError::Operation {
                    alias: alias.clone(),
                    operation: "saving",
                    source,
                })?;
            info!(alias = %alias, destination = %destination.display(), "saved imposter contract");
        }
        Ok(())
    }

    // ===== Mutation =====

    /// Replace `alias` and queue it for restoration before the next test.
    pub async fn replace_imposter(
        &mut self,
        alias: &str,
        source: ReplaceSource,
    ) -> Result<(), HarnessError> {
        self.replaced.insert(alias.to_string());
        self.silently_replace(alias, source).await
    }

    /// Replace `alias` with the descriptor cached during this test.
    pub async fn replace_with_cached(&mut self, alias: &str) -> Result<(), HarnessError> {
        let cached = self
            .registry
            .get_cached(alias)
            .cloned()
            .ok_or_else(|| HarnessError::NoCachedImposter(alias.to_string()))?;
        self.replace_imposter(alias, ReplaceSource::Descriptor(cached))
            .await
    }

    /// Recreate `alias` from its original configured contract, discarding
    /// any test-time mutations while keeping its port.
    pub async fn restore_imposter(&mut self, alias: &str) -> Result<(), HarnessError> {
        debug!(alias = %alias, "restoring imposter");
        let spec = self
            .config
            .imposters
            .get(alias)
            .ok_or_else(|| HarnessError::UnknownAlias(alias.to_string()))?;
        let contract = spec.contract.clone();
        self.silently_replace(alias, ReplaceSource::FromFile(contract))
            .await
    }

    /// Replace without queueing a restore. The replacement must land on the
    /// port the alias was provisioned on; port drift is fatal.
    async fn silently_replace(
        &mut self,
        alias: &str,
        source: ReplaceSource,
    ) -> Result<(), HarnessError> {
        let port = self.registry.resolve_port(alias)?;
        let new_port = match source {
            ReplaceSource::FromFile(path) => {
                let contract = self.config.resolve_path(&path);
                self.transport
                    .delete_if_exists(port)
                    .await
                    .map_err(|source| HarnessError::Operation {
                        alias: alias.to_string(),
                        operation: "deleting",
                        source,
                    })?;
                self.transport
                    .create_from_file(&contract)
                    .await
                    .map_err(|source| HarnessError::Operation {
                        alias: alias.to_string(),
                        operation: "replacing",
                        source,
                    })?
            }
            ReplaceSource::Descriptor(imposter) => self
                .transport
                .replace(&imposter)
                .await
                .map_err(|source| HarnessError::Operation {
                    alias: alias.to_string(),
                    operation: "replacing",
                    source,
                })?,
        };
        if new_port != port {
            return Err(HarnessError::PortMismatch {
                alias: alias.to_string(),
                expected: port,
                actual: new_port,
            });
        }
        Ok(())
    }

    // ===== Reads =====

    /// Cached descriptor for this test, fetching once on first use.
    pub async fn get_imposter(&mut self, alias: &str) -> Result<Imposter, HarnessError> {
        if let Some(cached) = self.registry.get_cached(alias) {
            return Ok(cached.clone());
        }
        self.fetch_imposter(alias).await
    }

    /// Fetch the descriptor from the mock server, bypassing and refreshing
    /// the cache.
    pub async fn fetch_imposter(&mut self, alias: &str) -> Result<Imposter, HarnessError> {
        let port = self.registry.resolve_port(alias)?;
        let imposter = self
            .transport
            .fetch(port)
            .await
            .map_err(|source| HarnessError::Operation {
                alias: alias.to_string(),
                operation: "fetching",
                source,
            })?;
        self.registry.set_cached(alias, imposter.clone());
        Ok(imposter)
    }

    /// Recorded requests matching `criteria`. Always fetches fresh:
    /// interactions accumulate while the system under test runs, so a stale
    /// cache would miss them. No match is an empty vec, never an error.
    pub async fn find_requests(
        &mut self,
        alias: &str,
        criteria: &Value,
    ) -> Result<Vec<RecordedRequest>, HarnessError> {
        let imposter = self.fetch_imposter(alias).await?;
        Ok(imposter.find_requests(criteria))
    }

    /// Whether the imposter has recorded any interaction at all.
    pub async fn has_requests(&mut self, alias: &str) -> Result<bool, HarnessError> {
        Ok(self.fetch_imposter(alias).await?.has_requests())
    }

    // ===== Assertions =====

    /// Assert exactly `exact_quantity` recorded requests match `criteria`.
    pub async fn expect_requests(
        &mut self,
        alias: &str,
        criteria: &Value,
        exact_quantity: usize,
    ) -> Result<(), HarnessError> {
        let matched = self.find_requests(alias, criteria).await?;
        if !matched.is_empty() {
            debug!(
                alias = %alias,
                matched = %serde_json::to_string_pretty(&matched).unwrap_or_default(),
                "matched requests"
            );
        }
        if matched.is_empty() {
            return Err(HarnessError::Assertion(format!(
                "imposter '{alias}' has no requests matching criteria"
            )));
        }
        if matched.len() != exact_quantity {
            return Err(HarnessError::Assertion(format!(
                "imposter '{alias}' has {} requests matching criteria, expected {exact_quantity}: {}",
                matched.len(),
                serde_json::to_string_pretty(&matched).unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Assert at least one interaction was recorded.
    pub async fn expect_any_requests(&mut self, alias: &str) -> Result<(), HarnessError> {
        if self.has_requests(alias).await? {
            Ok(())
        } else {
            Err(HarnessError::Assertion(format!(
                "imposter '{alias}' has no requests recorded"
            )))
        }
    }

    /// Assert no interaction was recorded.
    pub async fn expect_no_requests(&mut self, alias: &str) -> Result<(), HarnessError> {
        let imposter = self.fetch_imposter(alias).await?;
        if imposter.has_requests() {
            Err(HarnessError::Assertion(format!(
                "imposter '{alias}' has requests recorded: {}",
                serde_json::to_string_pretty(&imposter.requests).unwrap_or_default()
            )))
        } else {
            Ok(())
        }
    }
}
