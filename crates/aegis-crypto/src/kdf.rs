//! Key derivation: user secret + archive salt → key matter
//!
//! Output is deterministic for identical inputs. The work factor and salt are
//! stored in plaintext next to the archive; only the secret is assumed to be
//! unknown to an attacker.

use aegis_core::validate::{require_in_range, require_non_empty};
use aegis_core::{AegisError, AegisResult};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::secret::Secret;

/// Argon2id memory cost in KiB (19 MiB)
pub const ARGON2_MEM_COST_KIB: u32 = 19 * 1024;

/// Argon2id lanes
pub const ARGON2_PARALLELISM: u32 = 1;

/// Wire identifier of a key derivation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyDerivationFunction {
    /// PBKDF2-HMAC-SHA256; work factor = iteration count
    Pbkdf2,
    /// Argon2id v1.3; work factor = time cost
    Argon2id,
}

impl KeyDerivationFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pbkdf2 => "PBKDF2-HMAC-SHA256",
            Self::Argon2id => "Argon2id",
        }
    }
}

impl std::str::FromStr for KeyDerivationFunction {
    type Err = AegisError;

    fn from_str(s: &str) -> AegisResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pbkdf2" | "pbkdf2-sha256" | "pbkdf2-hmac-sha256" => Ok(Self::Pbkdf2),
            "argon2id" => Ok(Self::Argon2id),
            other => Err(AegisError::Config(format!(
                "unknown key derivation function '{other}'"
            ))),
        }
    }
}

/// A deterministic key derivation function.
pub trait KeyDerivationStrategy: Send + Sync {
    fn function(&self) -> KeyDerivationFunction;

    /// Derive `num_bytes` of key matter from `secret` and `salt`.
    fn derive_key_matter(
        &self,
        num_bytes: usize,
        secret: &Secret,
        salt: &[u8],
        work_factor: u32,
    ) -> AegisResult<Secret>;
}

fn check_inputs(num_bytes: usize, salt: &[u8], work_factor: u32) -> AegisResult<()> {
    require_in_range("derived length", num_bytes, 1, 1024)?;
    require_non_empty("salt", salt)?;
    require_in_range("work factor", work_factor, 1, u32::MAX)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2Strategy;

impl KeyDerivationStrategy for Pbkdf2Strategy {
    fn function(&self) -> KeyDerivationFunction {
        KeyDerivationFunction::Pbkdf2
    }

    fn derive_key_matter(
        &self,
        num_bytes: usize,
        secret: &Secret,
        salt: &[u8],
        work_factor: u32,
    ) -> AegisResult<Secret> {
        check_inputs(num_bytes, salt, work_factor)?;

        let mut out = vec![0u8; num_bytes];
        pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, work_factor, &mut out);
        Secret::new(out)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2idStrategy;

impl KeyDerivationStrategy for Argon2idStrategy {
    fn function(&self) -> KeyDerivationFunction {
        KeyDerivationFunction::Argon2id
    }

    fn derive_key_matter(
        &self,
        num_bytes: usize,
        secret: &Secret,
        salt: &[u8],
        work_factor: u32,
    ) -> AegisResult<Secret> {
        check_inputs(num_bytes, salt, work_factor)?;

        let params = Params::new(
            ARGON2_MEM_COST_KIB,
            work_factor,
            ARGON2_PARALLELISM,
            Some(num_bytes),
        )
        .map_err(|e| AegisError::invalid_argument(format!("invalid Argon2id params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut out = vec![0u8; num_bytes];
        argon2
            .hash_password_into(secret.as_bytes(), salt, &mut out)
            .map_err(|e| AegisError::Crypto(format!("Argon2id KDF failed: {e}")))?;
        Secret::new(out)
    }
}


#[cfg(test)]
mod proptest_suite {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn pbkdf2_is_deterministic(
            pw in proptest::collection::vec(any::<u8>(), 1..=64),
            salt in proptest::collection::vec(any::<u8>(), 1..=64),
            len in 16usize..=96,
        ) {
            let pw = Secret::new(pw).unwrap();
            let a = Pbkdf2Strategy.derive_key_matter(len, &pw, &salt, 1).unwrap();
            let b = Pbkdf2Strategy.derive_key_matter(len, &pw, &salt, 1).unwrap();
            prop_assert_eq!(a.len(), len);
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }
    }
}
