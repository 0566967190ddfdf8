//! Descriptor types returned by the mock server.

use super::criteria::matches_criteria;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A recorded instance of a call received by an imposter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedRequest {
    #[serde(default)]
    pub request_from: String,
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: HashMap<String, String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Mountebank records text payloads as strings and parsed payloads as
    /// structured JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub timestamp: String,
}

/// An imposter as the mock server describes it: configuration plus the
/// interaction log accumulated since creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Imposter {
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub record_requests: bool,
    /// Stubs are opaque to the harness; matching is the mock server's job.
    #[serde(default)]
    pub stubs: Vec<Value>,
    #[serde(default)]
    pub requests: Vec<RecordedRequest>,
}

fn default_protocol() -> String {
    "http".to_string()
}

impl Imposter {
    /// Recorded requests whose fields contain `criteria` as a subset.
    pub fn find_requests(&self, criteria: &Value) -> Vec<RecordedRequest> {
        self.requests
            .iter()
            .filter(|request| {
                serde_json::to_value(request)
                    .map(|actual| matches_criteria(criteria, &actual))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    /// The replayable configuration: everything except the interaction log.
    pub fn to_contract(&self) -> Value {
        let mut contract = serde_json::json!({
            "port": self.port,
            "protocol": self.protocol,
            "stubs": self.stubs,
        });
        if let Some(name) = &self.name {
            contract["name"] = Value::String(name.clone());
        }
        if self.record_requests {
            contract["recordRequests"] = Value::Bool(true);
        }
        contract
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn imposter_with_requests(requests: Vec<RecordedRequest>) -> Imposter {
        Imposter {
            port: 4545,
            protocol: "http".to_string(),
            name: Some("accounts".to_string()),
            record_requests: true,
            stubs: vec![json!({"responses": [{"is": {"statusCode": 200}}]})],
            requests,
        }
    }

    fn recorded(method: &str, path: &str) -> RecordedRequest {
        RecordedRequest {
            request_from: "127.0.0.1:51012".to_string(),
            method: method.to_string(),
            path: path.to_string(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: None,
            timestamp: "2026-08-29T10:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn deserializes_mountebank_descriptor() {
        let document = json!({
            "protocol": "http",
            "port": 4545,
            "recordRequests": true,
            "stubs": [{"responses": [{"is": {"statusCode": 200}}]}],
            "requests": [{
                "requestFrom": "127.0.0.1:51012",
                "method": "GET",
                "path": "/accounts/42",
                "query": {"expand": "true"},
                "headers": {"accept": "application/json"},
                "timestamp": "2026-08-29T10:00:00.000Z"
            }],
            "_links": {"self": {"href": "http://localhost:2525/imposters/4545"}}
        });

        let imposter: Imposter = serde_json::from_value(document).unwrap();
        assert_eq!(imposter.port, 4545);
        assert!(imposter.record_requests);
        assert_eq!(imposter.requests.len(), 1);
        assert_eq!(imposter.requests[0].path, "/accounts/42");
        assert_eq!(imposter.requests[0].query["expand"], "true");
    }

    #[test]
    fn find_requests_filters_by_subset() {
        let imposter = imposter_with_requests(vec![
            recorded("GET", "/accounts/42"),
            recorded("POST", "/accounts"),
            recorded("GET", "/health"),
        ]);

        let matched = imposter.find_requests(&json!({"method": "GET"}));
        assert_eq!(matched.len(), 2);

        let matched = imposter.find_requests(&json!({"method": "GET", "path": "/health"}));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].path, "/health");

        assert!(imposter.find_requests(&json!({"method": "DELETE"})).is_empty());
    }

    #[test]
    fn has_requests_reflects_interaction_log() {
        assert!(!imposter_with_requests(vec![]).has_requests());
        assert!(imposter_with_requests(vec![recorded("GET", "/")]).has_requests());
    }

    #[test]
    fn contract_omits_interaction_log() {
        let imposter = imposter_with_requests(vec![recorded("GET", "/accounts/42")]);
        let contract = imposter.to_contract();

        assert_eq!(contract["port"], 4545);
        assert_eq!(contract["protocol"], "http");
        assert_eq!(contract["name"], "accounts");
        assert_eq!(contract["recordRequests"], true);
        assert!(contract.get("requests").is_none());
    }
}
