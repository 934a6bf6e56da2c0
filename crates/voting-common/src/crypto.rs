use crate::{errors::VotingError, types::Identity};
use ed25519_dalek::{SigningKey, VerifyingKey as PublicKey};

/// Key material for one participant. Only the public half is kept; calls are attributed
/// by identity and never signed.
pub struct Crypto {
    public_key: PublicKey,
}

impl Crypto {
    pub fn from_secret_key(secret_key: &[u8; 32]) -> Self {
        Crypto {
            public_key: SigningKey::from_bytes(secret_key).verifying_key(),
        }
    }

    /// Fresh random key, for participants started without a configured seed.
    pub fn generate() -> Self {
        let seed: [u8; 32] = rand::random();
        Self::from_secret_key(&seed)
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn identity(&self) -> Identity {
        Identity::from(self.public_key())
    }

    /// Parses a 32 byte secret seed from hex, as given in config files and on the
    /// command line.
    pub fn seed_from_hex(seed: &str) -> Result<[u8; 32], VotingError> {
        let bytes = hex::decode(seed.trim())
            .map_err(|e| VotingError::ConfigError(format!("Failed to parse seed: {e}")))?;
        bytes.try_into().map_err(|_| {
            VotingError::ConfigError("Seed must be 32 bytes (64 hex characters)".to_string())
        })
    }

    pub fn from_hex_seed(seed: &str) -> Result<Self, VotingError> {
        Ok(Self::from_secret_key(&Self::seed_from_hex(seed)?))
    }
}
