//! Mountebank management API client.
//!
//! Speaks the documented admin protocol: `POST /imposters` to create,
//! `DELETE /imposters/{port}` to remove, `GET /imposters/{port}` to fetch,
//! and `?replayable=true` for save-ready configurations.

use super::{Transport, TransportError};
use crate::imposter::Imposter;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn imposters_url(&self) -> String {
        format!("{}/imposters", self.base_url)
    }

    fn imposter_url(&self, port: u16) -> String {
        format!("{}/imposters/{}", self.base_url, port)
    }

    /// POST a contract and extract the assigned port from the 201 body.
    async fn post_contract(&self, contract: &serde_json::Value) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(self.imposters_url())
            .json(contract)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::CREATED {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        let created: serde_json::Value = serde_json::from_str(&body)?;
        assigned_port(&created).ok_or(TransportError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

/// Port from a creation response body. Out-of-range values are rejected,
/// not truncated; a truncated port would slip past the port-identity check.
fn assigned_port(document: &serde_json::Value) -> Option<u16> {
    document
        .get("port")
        .and_then(serde_json::Value::as_u64)
        .and_then(|port| u16::try_from(port).ok())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn wipe_all(&self) -> Result<(), TransportError> {
        let response = self.client.delete(self.imposters_url()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        debug!("wiped all imposters");
        Ok(())
    }

    async fn create_from_file(&self, contract: &Path) -> Result<u16, TransportError> {
        let raw = tokio::fs::read_to_string(contract).await?;
        let document: serde_json::Value = serde_json::from_str(&raw)?;
        let port = self.post_contract(&document).await?;
        debug!(contract = %contract.display(), port, "created imposter");
        Ok(port)
    }

    async fn delete_if_exists(&self, port: u16) -> Result<(), TransportError> {
        let response = self.client.delete(self.imposter_url(port)).send().await?;
        let status = response.status();
        // Mountebank answers 200 with an empty object for unknown ports;
        // treat an explicit 404 the same way.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(TransportError::UnexpectedStatus {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }

    async fn fetch(&self, port: u16) -> Result<Imposter, TransportError> {
        let response = self.client.get(self.imposter_url(port)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(port));
        }
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json::<Imposter>().await?)
    }

    async fn replace(&self, imposter: &Imposter) -> Result<u16, TransportError> {
        self.delete_if_exists(imposter.port).await?;
        self.post_contract(&imposter.to_contract()).await
    }

    async fn save_to_path(&self, port: u16, destination: &Path) -> Result<(), TransportError> {
        let url = format!("{}?replayable=true", self.imposter_url(port));
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound(port));
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        // Parse before writing so a half-broken response never lands on disk.
        let document: serde_json::Value = serde_json::from_str(&body)?;
        let pretty = serde_json::to_string_pretty(&document)?;
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(destination, pretty).await?;
        debug!(port, destination = %destination.display(), "saved imposter contract");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assigned_port_rejects_out_of_range_values() {
        assert_eq!(assigned_port(&json!({"port": 4545})), Some(4545));
        assert_eq!(assigned_port(&json!({"port": 70081})), None);
        assert_eq!(assigned_port(&json!({"port": "4545"})), None);
        assert_eq!(assigned_port(&json!({})), None);
    }

    #[test]
    fn builds_management_urls() {
        let transport = HttpTransport::new("localhost", 2525);
        assert_eq!(transport.imposters_url(), "http://localhost:2525/imposters");
        assert_eq!(
            transport.imposter_url(4545),
            "http://localhost:2525/imposters/4545"
        );
    }
}
