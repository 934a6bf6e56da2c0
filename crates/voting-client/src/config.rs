use serde::Deserialize;
use std::path::Path;
use voting_common::VotingError;

// The top-level client config structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Websocket URL of the ledger, e.g. "ws://127.0.0.1:8080"
    pub ledger_url: String,
    /// Address the REST API binds to
    #[serde(default = "default_rest_address")]
    pub rest_address: String,
    /// Hex encoded 32 byte key seed; a fresh key is generated when absent
    pub seed: Option<String>,
}

fn default_rest_address() -> String {
    "127.0.0.1:3001".to_string()
}

impl ClientConfig {
    pub fn from_yaml(content: &str) -> Result<Self, VotingError> {
        serde_yaml::from_str(content).map_err(|e| VotingError::ConfigError(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, VotingError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VotingError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_address_has_a_default() {
        let config = ClientConfig::from_yaml("ledger_url: \"ws://127.0.0.1:8080\"").unwrap();
        assert_eq!(config.ledger_url, "ws://127.0.0.1:8080");
        assert_eq!(config.rest_address, "127.0.0.1:3001");
        assert!(config.seed.is_none());
    }

    #[test]
    fn ledger_url_is_required() {
        assert!(matches!(
            ClientConfig::from_yaml("seed: \"00\""),
            Err(VotingError::ConfigError(_))
        ));
    }
}
