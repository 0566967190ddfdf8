//! Alias identity and the per-test descriptor cache.

use super::HarnessError;
use crate::imposter::Imposter;
use std::collections::HashMap;

/// Single source of truth for which port an alias lives on, plus the
/// descriptors fetched so far in the current test.
#[derive(Debug, Default)]
pub struct Registry {
    ports: HashMap<String, u16>,
    cache: HashMap<String, Imposter>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port assigned to `alias` at provisioning time.
    pub fn resolve_port(&self, alias: &str) -> Result<u16, HarnessError> {
        self.ports
            .get(alias)
            .copied()
            .ok_or_else(|| HarnessError::UnknownAlias(alias.to_string()))
    }

    /// Record the port an alias was provisioned on. Called only during
    /// suite-start provisioning.
    pub fn record_port(&mut self, alias: &str, port: u16) {
        self.ports.insert(alias.to_string(), port);
    }

    pub fn get_cached(&self, alias: &str) -> Option<&Imposter> {
        self.cache.get(alias)
    }

    pub fn set_cached(&mut self, alias: &str, imposter: Imposter) {
        self.cache.insert(alias.to_string(), imposter);
    }

    /// Drop every cached descriptor. Runs at each test boundary so one test
    /// never observes another test's interaction log.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_port_fails_for_unknown_alias() {
        let registry = Registry::new();
        assert!(matches!(
            registry.resolve_port("ghost"),
            Err(HarnessError::UnknownAlias(alias)) if alias == "ghost"
        ));
    }

    #[test]
    fn record_port_overwrites() {
        let mut registry = Registry::new();
        registry.record_port("svc", 4545);
        registry.record_port("svc", 4546);
        assert_eq!(registry.resolve_port("svc").unwrap(), 4546);
    }
}
