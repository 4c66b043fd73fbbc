//! User key authorizations: the archive key wrapped once per authorized secret
//!
//! Each authorization holds the archive key encrypted under one user key,
//! with `FriendlyName || KeyId` as associated data so neither label can be
//! swapped onto another record. Authorizations are independent; damaging
//! one leaves every other able to unlock.

use aegis_core::validate::require_non_blank;
use aegis_core::AegisResult;
use aegis_crypto::{
    AlgorithmTable, ArchiveKey, EncryptedPacket, KeyId, Secret, SecuritySettings, UserKey,
};
use aegis_secrets::SecretMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserKeyAuthorization {
    pub friendly_name: String,
    pub key_id: KeyId,
    pub time_added: DateTime<Utc>,
    pub encrypted_archive_key: EncryptedPacket,
    pub secret_metadata: SecretMetadata,
}

fn associated_data(friendly_name: &str, key_id: &KeyId) -> Vec<u8> {
    let mut ad = Vec::with_capacity(friendly_name.len() + key_id.as_str().len());
    ad.extend_from_slice(friendly_name.as_bytes());
    ad.extend_from_slice(key_id.as_str().as_bytes());
    ad
}

impl UserKeyAuthorization {
    /// Wrap `archive_key` under `user_key`.
    pub fn create_new(
        friendly_name: &str,
        user_key: &UserKey,
        archive_key: &ArchiveKey,
        secret_metadata: SecretMetadata,
        settings: &SecuritySettings,
        algorithms: &AlgorithmTable,
    ) -> AegisResult<Self> {
        require_non_blank("friendly name", friendly_name)?;
        let cipher = algorithms.cipher(settings.encryption_algo)?;
        let ad = associated_data(friendly_name, user_key.key_id());
        let encrypted_archive_key =
            cipher.encrypt(archive_key.secret().as_bytes(), user_key.key(), Some(ad.as_slice()))?;

        Ok(Self {
            friendly_name: friendly_name.to_string(),
            key_id: user_key.key_id().clone(),
            time_added: Utc::now(),
            encrypted_archive_key,
            secret_metadata,
        })
    }

    /// Unwrap the archive key if `user_key` is the key this record was made for.
    ///
    /// Never fails: a key id mismatch, a malformed or tampered packet, or a
    /// wrong key all yield `None`, indistinguishably.
    pub fn try_decrypt_archive_key(
        &self,
        user_key: &UserKey,
        settings: &SecuritySettings,
        algorithms: &AlgorithmTable,
    ) -> Option<ArchiveKey> {
        if !self.key_id.ct_matches(user_key.key_id()) {
            return None;
        }
        let cipher = algorithms.cipher(settings.encryption_algo).ok()?;
        let ad = associated_data(&self.friendly_name, &self.key_id);
        let bytes = cipher
            .decrypt(&self.encrypted_archive_key, user_key.key(), Some(ad.as_slice()))
            .ok()?;
        let secret = Secret::new(bytes).ok()?;
        ArchiveKey::from_secret(secret, cipher).ok()
    }
}
