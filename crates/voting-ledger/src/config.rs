use serde::Deserialize;
use std::path::Path;
use voting_common::{Crypto, Identity, VotingError};

// Ledger configuration as represented in the YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Websocket listen address, e.g. "127.0.0.1:8080"
    pub listen_address: Option<String>,
    /// Address for the Prometheus scrape endpoint
    pub metrics_address: Option<String>,
    /// Hex encoded public key of the session owner
    pub owner_public_key: Option<String>,
    /// Hex encoded 32 byte seed the owner key is derived from
    pub owner_seed: Option<String>,
}

impl LedgerConfig {
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

    /// The owner identity. An explicit public key wins over a seed; one of the two is
    /// required.
    pub fn owner(&self) -> Result<Identity, VotingError> {
        match (&self.owner_public_key, &self.owner_seed) {
            (Some(key), _) => key.parse(),
            (None, Some(seed)) => Ok(Crypto::from_hex_seed(seed)?.identity()),
            (None, None) => Err(VotingError::ConfigError(
                "Either owner_public_key or owner_seed must be set".to_string(),
            )),
        }
    }
}
