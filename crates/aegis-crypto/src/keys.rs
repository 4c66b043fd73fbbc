//! Archive key, user keys, and key ids

use aegis_core::validate::require_len;
use aegis_core::AegisResult;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::algorithms::AlgorithmTable;
use crate::cipher::CryptoStrategy;
use crate::secret::Secret;
use crate::settings::SecuritySettings;
use crate::SALT_SIZE;

/// The random key that encrypts all archive content.
///
/// Exists only while an archive is unlocked. Zeroized on drop.
#[derive(Debug)]
pub struct ArchiveKey {
    secret: Secret,
}

impl ArchiveKey {
    /// Generate a random key sized for `strategy`.
    pub fn generate(strategy: &dyn CryptoStrategy) -> AegisResult<Self> {
        Ok(Self {
            secret: Secret::random(strategy.key_size())?,
        })
    }

    /// Adopt unwrapped key bytes, checking they fit `strategy`.
    pub fn from_secret(secret: Secret, strategy: &dyn CryptoStrategy) -> AegisResult<Self> {
        require_len("archive key", secret.as_bytes(), strategy.key_size())?;
        Ok(Self { secret })
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

/// Non-secret identifier derived alongside a user key.
///
/// Only used to shortlist candidate authorizations; never authenticates
/// anything. Stored as unpadded base64url.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison.
    pub fn ct_matches(&self, other: &KeyId) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A key derived from a user secret, plus its key id.
#[derive(Debug)]
pub struct UserKey {
    key: Secret,
    key_id: KeyId,
}

impl UserKey {
    /// Run the configured KDF over `secret` and `salt`.
    ///
    /// Derives `key_size + key_id_size` bytes; the leading `key_size` bytes
    /// become the key, the remainder the key id. Because the KDF is one-way,
    /// the key id reveals nothing usable about the key.
    pub fn derive_from(
        secret: &Secret,
        salt: &[u8],
        settings: &SecuritySettings,
        algorithms: &AlgorithmTable,
    ) -> AegisResult<Self> {
        settings.validate()?;
        let cipher = algorithms.cipher(settings.encryption_algo)?;
        let kdf = algorithms.kdf(settings.key_derivation_function)?;

        let key_size = cipher.key_size();
        let matter = kdf.derive_key_matter(
            key_size + settings.key_id_size_in_bytes,
            secret,
            salt,
            settings.key_derivation_work_factor,
        )?;
        let (key, id_bytes) = matter.split_at(key_size)?;

        Ok(Self {
            key,
            key_id: KeyId::from_bytes(&id_bytes),
        })
    }

    pub fn key(&self) -> &Secret {
        &self.key
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }
}

/// A fresh random key derivation salt.
pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
