//! The persisted root record, stored as JSON in the `.meta` container entry

use aegis_core::{AegisError, AegisResult};
use aegis_crypto::envelope::base64_bytes;
use aegis_crypto::{ArchiveKey, CryptoStrategy, EncryptedPacket, SecuritySettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::authorization::UserKeyAuthorization;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecureArchiveMetadata {
    pub id: Uuid,
    pub security_settings: SecuritySettings,
    pub create_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
    #[serde(with = "base64_bytes")]
    pub key_derivation_salt: Vec<u8>,
    /// The archive id encrypted under the archive key
    pub auth_canary: EncryptedPacket,
    pub user_key_authorizations: Vec<UserKeyAuthorization>,
    pub encrypted_file_index: EncryptedPacket,
}

impl SecureArchiveMetadata {
    pub fn to_json(&self) -> AegisResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse and sanity-check a `.meta` payload.
    pub fn from_json(bytes: &[u8]) -> AegisResult<Self> {
        let metadata: Self = serde_json::from_slice(bytes)
            .map_err(|e| AegisError::corrupted(format!("archive metadata: {e}")))?;
        metadata
            .security_settings
            .validate()
            .map_err(|e| AegisError::corrupted(format!("archive metadata: {e}")))?;
        if metadata.key_derivation_salt.is_empty() {
            return Err(AegisError::corrupted("archive metadata: empty key derivation salt"));
        }
        Ok(metadata)
    }

    /// Encrypt a fresh canary for this archive's id.
    pub fn seal_canary(
        &mut self,
        archive_key: &ArchiveKey,
        cipher: &dyn CryptoStrategy,
    ) -> AegisResult<()> {
        self.auth_canary = cipher.encrypt(self.id.as_bytes(), archive_key.secret(), None)?;
        Ok(())
    }

    /// True if the canary decrypts under `archive_key` to this archive's id.
    pub fn verify_canary(&self, archive_key: &ArchiveKey, cipher: &dyn CryptoStrategy) -> bool {
        match cipher.decrypt(&self.auth_canary, archive_key.secret(), None) {
            Ok(plaintext) => plaintext.ct_eq(&self.id.as_bytes()[..]).into(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_crypto::{generate_salt, Aes256GcmStrategy};

    fn sample() -> (SecureArchiveMetadata, ArchiveKey) {
        let key = ArchiveKey::generate(&Aes256GcmStrategy).unwrap();
        let now = Utc::now();
        let mut metadata = SecureArchiveMetadata {
            id: Uuid::new_v4(),
            security_settings: SecuritySettings::default(),
            create_time: now,
            last_modified_time: now,
            key_derivation_salt: generate_salt(),
            auth_canary: EncryptedPacket::empty(),
            user_key_authorizations: Vec::new(),
            encrypted_file_index: EncryptedPacket::empty(),
        };
        metadata.seal_canary(&key, &Aes256GcmStrategy).unwrap();
        (metadata, key)
    }

    #[test]
    fn test_canary_verifies_with_archive_key() {
        let (metadata, key) = sample();
        assert!(metadata.verify_canary(&key, &Aes256GcmStrategy));

        let other = ArchiveKey::generate(&Aes256GcmStrategy).unwrap();
        assert!(!metadata.verify_canary(&other, &Aes256GcmStrategy));
    }

    #[test]
    fn test_canary_bound_to_id() {
        let (mut metadata, key) = sample();
        metadata.id = Uuid::new_v4();
        assert!(!metadata.verify_canary(&key, &Aes256GcmStrategy));
    }

    #[test]
    fn test_reseal_changes_iv() {
        let (mut metadata, key) = sample();
        let before = metadata.auth_canary.clone();
        metadata.seal_canary(&key, &Aes256GcmStrategy).unwrap();
        assert_ne!(before.iv, metadata.auth_canary.iv);
        assert!(metadata.verify_canary(&key, &Aes256GcmStrategy));
    }

    #[test]
    fn test_json_wire_shape() {
        let (metadata, _) = sample();
        let json: serde_json::Value = serde_json::from_slice(&metadata.to_json().unwrap()).unwrap();
        for field in [
            "Id",
            "SecuritySettings",
            "CreateTime",
            "LastModifiedTime",
            "KeyDerivationSalt",
            "AuthCanary",
            "UserKeyAuthorizations",
            "EncryptedFileIndex",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert_eq!(json["Id"], metadata.id.to_string());

        let back = SecureArchiveMetadata::from_json(&metadata.to_json().unwrap()).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_garbage_is_corruption() {
        for bytes in [&b"not json"[..], &b"{}"[..], &b""[..]] {
            let err = SecureArchiveMetadata::from_json(bytes).unwrap_err();
            assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
        }
    }

    #[test]
    fn test_invalid_settings_is_corruption() {
        let (mut metadata, _) = sample();
        metadata.security_settings.key_derivation_work_factor = 0;
        let err = SecureArchiveMetadata::from_json(&metadata.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
    }
}
