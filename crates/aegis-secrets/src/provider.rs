//! Secret providers: "bytes + metadata out"
//!
//! Backing implementations for certificates and passkeys live outside this
//! workspace (platform interop); they hand their output to
//! [`RawSecretProvider`].

use aegis_core::{AegisError, AegisResult};
use aegis_crypto::Secret;
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::metadata::{SecretKind, SecretMetadata};

/// A secret acquired from a provider, ready for key derivation.
#[derive(Debug)]
pub struct ProvidedSecret {
    pub secret: Secret,
    pub metadata: SecretMetadata,
}

/// Source of user secrets for one secret kind.
pub trait SecretProvider {
    fn kind(&self) -> SecretKind;

    /// Produce the secret bytes and the metadata to persist alongside the
    /// authorization created from them.
    fn acquire(&self) -> AegisResult<ProvidedSecret>;
}

/// Password held in memory as a `SecretString`.
pub struct PasswordProvider {
    password: SecretString,
}

impl PasswordProvider {
    pub fn new(password: SecretString) -> Self {
        Self { password }
    }

    /// Read the password from an environment variable.
    pub fn from_env(var: &str) -> AegisResult<Self> {
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => {
                tracing::debug!(var, "password read from environment");
                Ok(Self::new(SecretString::from(value)))
            }
            _ => Err(AegisError::not_found(format!(
                "environment variable {var} is unset or empty"
            ))),
        }
    }
}

impl SecretProvider for PasswordProvider {
    fn kind(&self) -> SecretKind {
        SecretKind::Password
    }

    fn acquire(&self) -> AegisResult<ProvidedSecret> {
        Ok(ProvidedSecret {
            secret: Secret::from_password(&self.password)?,
            metadata: SecretMetadata::Password,
        })
    }
}

/// Secret bytes produced by an external collaborator (certificate key
/// extraction, passkey hmac-secret), paired with the metadata it supplied.
pub struct RawSecretProvider {
    bytes: Zeroizing<Vec<u8>>,
    metadata: SecretMetadata,
}

impl RawSecretProvider {
    pub fn new(bytes: Vec<u8>, metadata: SecretMetadata) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
            metadata,
        }
    }
}

impl SecretProvider for RawSecretProvider {
    fn kind(&self) -> SecretKind {
        self.metadata.kind()
    }

    fn acquire(&self) -> AegisResult<ProvidedSecret> {
        Ok(ProvidedSecret {
            secret: Secret::from_slice(&self.bytes)?,
            metadata: self.metadata.clone(),
        })
    }
}
