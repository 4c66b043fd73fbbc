//! Archive security settings and their validation

use aegis_core::config::SecurityConfig;
use aegis_core::validate::require_in_range;
use aegis_core::AegisResult;
use serde::{Deserialize, Serialize};

use crate::cipher::EncryptionAlgo;
use crate::kdf::KeyDerivationFunction;

/// Smallest accepted key id
pub const MIN_KEY_ID_SIZE: usize = 8;

/// Largest accepted key id
pub const MAX_KEY_ID_SIZE: usize = 64;

/// Per-archive cryptographic parameters, stored in plaintext in the metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecuritySettings {
    pub encryption_algo: EncryptionAlgo,
    pub key_derivation_function: KeyDerivationFunction,
    pub key_derivation_work_factor: u32,
    pub key_id_size_in_bytes: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            encryption_algo: EncryptionAlgo::Aes256Gcm,
            key_derivation_function: KeyDerivationFunction::Pbkdf2,
            key_derivation_work_factor: 100_000,
            key_id_size_in_bytes: 16,
        }
    }
}

impl SecuritySettings {
    /// Parse and validate the `[security]` config section.
    pub fn from_config(config: &SecurityConfig) -> AegisResult<Self> {
        let settings = Self {
            encryption_algo: config.encryption_algo.parse()?,
            key_derivation_function: config.key_derivation_function.parse()?,
            key_derivation_work_factor: config.key_derivation_work_factor,
            key_id_size_in_bytes: config.key_id_size_in_bytes,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AegisResult<()> {
        require_in_range(
            "key derivation work factor",
            self.key_derivation_work_factor,
            1,
            u32::MAX,
        )?;
        require_in_range(
            "key id size",
            self.key_id_size_in_bytes,
            MIN_KEY_ID_SIZE,
            MAX_KEY_ID_SIZE,
        )
    }
}
