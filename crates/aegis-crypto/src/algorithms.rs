//! Lookup table of registered AEAD and KDF strategies

use std::collections::HashMap;

use aegis_core::{AegisError, AegisResult};

use crate::cipher::{Aes256GcmStrategy, CryptoStrategy, EncryptionAlgo, XChaCha20Poly1305Strategy};
use crate::kdf::{Argon2idStrategy, KeyDerivationFunction, KeyDerivationStrategy, Pbkdf2Strategy};

/// Strategies keyed by their wire identifiers.
///
/// Built once by the host (usually via [`AlgorithmTable::standard`]) and
/// shared by reference or `Arc` with every archive it opens.
pub struct AlgorithmTable {
    ciphers: HashMap<EncryptionAlgo, Box<dyn CryptoStrategy>>,
    kdfs: HashMap<KeyDerivationFunction, Box<dyn KeyDerivationStrategy>>,
}

impl AlgorithmTable {
    /// An empty table. Register strategies before use.
    pub fn empty() -> Self {
        Self {
            ciphers: HashMap::new(),
            kdfs: HashMap::new(),
        }
    }

    /// AES-256-GCM, XChaCha20-Poly1305, PBKDF2 and Argon2id.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register_cipher(Box::new(Aes256GcmStrategy));
        table.register_cipher(Box::new(XChaCha20Poly1305Strategy));
        table.register_kdf(Box::new(Pbkdf2Strategy));
        table.register_kdf(Box::new(Argon2idStrategy));
        table
    }

    pub fn register_cipher(&mut self, strategy: Box<dyn CryptoStrategy>) {
        self.ciphers.insert(strategy.algo(), strategy);
    }

    pub fn register_kdf(&mut self, strategy: Box<dyn KeyDerivationStrategy>) {
        self.kdfs.insert(strategy.function(), strategy);
    }

    pub fn cipher(&self, algo: EncryptionAlgo) -> AegisResult<&dyn CryptoStrategy> {
        self.ciphers.get(&algo).map(|s| s.as_ref()).ok_or_else(|| {
            AegisError::invalid_argument(format!(
                "encryption algorithm {} not registered",
                algo.name()
            ))
        })
    }

    pub fn kdf(&self, function: KeyDerivationFunction) -> AegisResult<&dyn KeyDerivationStrategy> {
        self.kdfs.get(&function).map(|s| s.as_ref()).ok_or_else(|| {
            AegisError::invalid_argument(format!(
                "key derivation function {} not registered",
                function.name()
            ))
        })
    }
}

impl Default for AlgorithmTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for AlgorithmTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmTable")
            .field("ciphers", &self.ciphers.keys().collect::<Vec<_>>())
            .field("kdfs", &self.kdfs.keys().collect::<Vec<_>>())
            .finish()
    }
}
