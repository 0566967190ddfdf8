//! In-process transport for dry runs and tests.
//!
//! Behaves like a Mountebank instance without sockets: imposters live in a
//! table keyed by port, contracts without an explicit `port` field get one
//! from the dynamic range, and callers can inject recorded requests to drive
//! assertion paths.

use super::{Transport, TransportError};
use crate::imposter::{Imposter, RecordedRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// First port handed out when a contract does not pin one.
const PORT_RANGE_START: u16 = 49152;

pub struct InMemoryTransport {
    state: Mutex<State>,
    fetch_count: AtomicUsize,
    create_count: AtomicUsize,
}

struct State {
    imposters: BTreeMap<u16, Imposter>,
    next_port: u16,
}

impl State {
    fn allocate_port(&mut self) -> Result<u16, TransportError> {
        while self.imposters.contains_key(&self.next_port) {
            if self.next_port == u16::MAX {
                return Err(TransportError::PortsExhausted);
            }
            self.next_port += 1;
        }
        let port = self.next_port;
        self.next_port = self.next_port.saturating_add(1);
        Ok(port)
    }

    fn install(&mut self, mut contract: Value) -> Result<u16, TransportError> {
        if contract.get("port").is_none() {
            let port = self.allocate_port()?;
            contract["port"] = Value::from(port);
        }
        // A pinned port outside u16 range fails deserialization below.
        let imposter: Imposter = serde_json::from_value(contract)?;
        let port = imposter.port;
        self.imposters.insert(port, imposter);
        Ok(port)
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                imposters: BTreeMap::new(),
                next_port: PORT_RANGE_START,
            }),
            fetch_count: AtomicUsize::new(0),
            create_count: AtomicUsize::new(0),
        }
    }

    /// Install a contract directly, as if it had been POSTed by another run.
    pub fn install_contract(&self, contract: Value) -> Result<u16, TransportError> {
        self.state.lock().install(contract)
    }

    /// Simulate traffic: append a recorded request to the imposter on `port`.
    /// Returns false when no imposter occupies the port.
    pub fn record_request(&self, port: u16, request: RecordedRequest) -> bool {
        let mut state = self.state.lock();
        match state.imposters.get_mut(&port) {
            Some(imposter) => {
                imposter.requests.push(request);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.state.lock().imposters.contains_key(&port)
    }

    /// Occupied ports in ascending order.
    pub fn ports(&self) -> Vec<u16> {
        self.state.lock().imposters.keys().copied().collect()
    }

    /// Replayable configuration currently on `port`, if any.
    pub fn contract(&self, port: u16) -> Option<Value> {
        self.state
            .lock()
            .imposters
            .get(&port)
            .map(Imposter::to_contract)
    }

    /// Remote fetches served so far; lets tests assert on cache behavior.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Imposter creations served so far (provisioning, restores, replaces).
    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn wipe_all(&self) -> Result<(), TransportError> {
        self.state.lock().imposters.clear();
        Ok(())
    }

    async fn create_from_file(&self, contract: &Path) -> Result<u16, TransportError> {
        let raw = tokio::fs::read_to_string(contract).await?;
        let document: Value = serde_json::from_str(&raw)?;
        self.create_count.fetch_add(1, Ordering::SeqCst);
        self.state.lock().install(document)
    }

    async fn delete_if_exists(&self, port: u16) -> Result<(), TransportError> {
        self.state.lock().imposters.remove(&port);
        Ok(())
    }

    async fn fetch(&self, port: u16) -> Result<Imposter, TransportError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .imposters
            .get(&port)
            .cloned()
            .ok_or(TransportError::NotFound(port))
    }

    async fn replace(&self, imposter: &Imposter) -> Result<u16, TransportError> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.imposters.remove(&imposter.port);
        state.install(imposter.to_contract())
    }

    async fn save_to_path(&self, port: u16, destination: &Path) -> Result<(), TransportError> {
        let contract = self
            .contract(port)
            .ok_or(TransportError::NotFound(port))?;
        let pretty = serde_json::to_string_pretty(&contract)?;
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(destination, pretty).await?;
        Ok(())
    }
}
