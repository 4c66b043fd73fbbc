//! Owned secret bytes, zeroized on drop

use aegis_core::validate::require_non_empty;
use aegis_core::{AegisError, AegisResult};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

/// Raw secret bytes with exclusive ownership.
///
/// Used for user-supplied secrets as well as for every derived or random key.
/// The buffer is overwritten with zeros when the value is dropped, on every
/// exit path including unwinding.
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    /// Take ownership of `bytes`. Empty secrets are rejected.
    pub fn new(mut bytes: Vec<u8>) -> AegisResult<Self> {
        if let Err(e) = require_non_empty("secret", &bytes) {
            bytes.zeroize();
            return Err(e);
        }
        Ok(Self { bytes })
    }

    /// Copy `bytes` into a new secret. The caller remains responsible for
    /// wiping its own copy.
    pub fn from_slice(bytes: &[u8]) -> AegisResult<Self> {
        Self::new(bytes.to_vec())
    }

    /// UTF-8 bytes of a password.
    pub fn from_password(password: &SecretString) -> AegisResult<Self> {
        Self::from_slice(password.expose_secret().as_bytes())
    }

    /// `len` bytes from the thread-local CSPRNG.
    pub fn random(len: usize) -> AegisResult<Self> {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// HMAC-SHA-256 of `data` keyed with this secret.
    pub fn keyed_hash(&self, data: &[u8]) -> AegisResult<[u8; 32]> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.bytes)
            .map_err(|e| AegisError::Crypto(format!("HMAC key setup failed: {e}")))?;
        mac.update(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        Ok(out)
    }

    /// Split into `(head, tail)` at `mid`, consuming and wiping the original.
    pub fn split_at(self, mid: usize) -> AegisResult<(Secret, Vec<u8>)> {
        if mid == 0 || mid >= self.bytes.len() {
            return Err(AegisError::invalid_argument(format!(
                "cannot split {}-byte secret at {mid}",
                self.bytes.len()
            )));
        }
        let head = Secret::from_slice(&self.bytes[..mid])?;
        let tail = self.bytes[mid..].to_vec();
        Ok((head, tail))
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
