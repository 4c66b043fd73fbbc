//! aegis-crypto: key material and cryptographic services for Aegis archives
//!
//! Key hierarchy:
//! ```text
//! User secret (password / certificate key / passkey hmac-secret)
//!   └── KDF(secret, archive salt, work factor) → [UserKey | KeyId]
//!         └── UserKeyAuthorization: AEAD(UserKey, ArchiveKey, AAD=FriendlyName||KeyId)
//! ArchiveKey (random, sized per algorithm)
//!   ├── AuthCanary: AEAD(ArchiveKey, archive Id)
//!   ├── File index: AEAD(ArchiveKey, JSON entries)
//!   └── File content: AEAD(ArchiveKey, bytes, AAD=FileId)
//! ```
//!
//! Algorithms are looked up through an [`AlgorithmTable`] built once by the
//! caller and shared, never through global state.

pub mod algorithms;
pub mod cipher;
pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod secret;
pub mod settings;

pub use algorithms::AlgorithmTable;
pub use cipher::{Aes256GcmStrategy, CryptoStrategy, EncryptionAlgo, XChaCha20Poly1305Strategy};
pub use envelope::EncryptedPacket;
pub use kdf::{Argon2idStrategy, KeyDerivationFunction, KeyDerivationStrategy, Pbkdf2Strategy};
pub use keys::{generate_salt, ArchiveKey, KeyId, UserKey};
pub use secret::Secret;
pub use settings::SecuritySettings;

/// Size of the per-archive key derivation salt in bytes
pub const SALT_SIZE: usize = 32;
