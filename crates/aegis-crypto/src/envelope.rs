//! Encrypted envelope: `{IV, AuthTag, CipherText}`
//!
//! JSON form (inside archive metadata), all fields base64:
//! ```text
//! {"IV": "...", "AuthTag": "...", "CipherText": "..."}
//! ```
//!
//! Binary form (archive content entries):
//! ```text
//! [iv][auth tag][ciphertext]
//! ```
//! with IV and tag sizes taken from the algorithm that produced the packet.

use aegis_core::{AegisError, AegisResult};
use serde::{Deserialize, Serialize};

use crate::cipher::CryptoStrategy;

/// One AEAD-encrypted payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPacket {
    #[serde(rename = "IV", with = "base64_bytes")]
    pub iv: Vec<u8>,
    #[serde(rename = "AuthTag", with = "base64_bytes")]
    pub auth_tag: Vec<u8>,
    #[serde(rename = "CipherText", with = "base64_bytes")]
    pub cipher_text: Vec<u8>,
}

impl EncryptedPacket {
    /// The sentinel for "nothing was encrypted".
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is no ciphertext.
    pub fn is_empty(&self) -> bool {
        self.cipher_text.is_empty()
    }

    /// Serialize as `[iv][tag][ciphertext]`. The empty sentinel becomes zero bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut out =
            Vec::with_capacity(self.iv.len() + self.auth_tag.len() + self.cipher_text.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.auth_tag);
        out.extend_from_slice(&self.cipher_text);
        out
    }

    /// Parse the binary form using `strategy`'s IV and tag sizes.
    pub fn from_bytes(data: &[u8], strategy: &dyn CryptoStrategy) -> AegisResult<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }
        let header = strategy.iv_size() + strategy.auth_tag_size();
        if data.len() <= header {
            return Err(AegisError::corrupted(format!(
                "encrypted packet too short: {} bytes (minimum {})",
                data.len(),
                header + 1
            )));
        }
        let (iv, rest) = data.split_at(strategy.iv_size());
        let (auth_tag, cipher_text) = rest.split_at(strategy.auth_tag_size());
        Ok(Self {
            iv: iv.to_vec(),
            auth_tag: auth_tag.to_vec(),
            cipher_text: cipher_text.to_vec(),
        })
    }
}

/// Serde adapter for `Vec<u8>` fields stored as standard base64 strings.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
