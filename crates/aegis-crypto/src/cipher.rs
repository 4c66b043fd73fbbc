//! Pluggable AEAD strategies
//!
//! | algorithm          | key | iv | tag |
//! |--------------------|-----|----|-----|
//! | AES-256-GCM        | 32  | 12 | 16  |
//! | XChaCha20-Poly1305 | 32  | 24 | 16  |
//!
//! Every `encrypt` call draws a fresh random IV, so an IV is never reused
//! under the same key in practice.

use aegis_core::validate::{require_len, require_non_empty};
use aegis_core::{AegisError, AegisResult};
use aes_gcm::aead::{AeadInPlace, KeyInit, Nonce, Tag};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::XChaCha20Poly1305;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::envelope::EncryptedPacket;
use crate::secret::Secret;

/// Wire identifier of an AEAD algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionAlgo {
    Aes256Gcm,
    XChaCha20Poly1305,
}

impl EncryptionAlgo {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "AES-256-GCM",
            Self::XChaCha20Poly1305 => "XChaCha20-Poly1305",
        }
    }
}

impl std::str::FromStr for EncryptionAlgo {
    type Err = AegisError;

    fn from_str(s: &str) -> AegisResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" => Ok(Self::Aes256Gcm),
            "xchacha20-poly1305" | "xchacha20poly1305" => Ok(Self::XChaCha20Poly1305),
            other => Err(AegisError::Config(format!(
                "unknown encryption algorithm '{other}'"
            ))),
        }
    }
}

/// An authenticated encryption algorithm.
///
/// Implementations are stateless; keys are passed per call.
pub trait CryptoStrategy: Send + Sync {
    fn algo(&self) -> EncryptionAlgo;

    fn key_size(&self) -> usize;

    fn iv_size(&self) -> usize;

    fn auth_tag_size(&self) -> usize;

    /// Encrypt `plaintext` under `key`, binding `associated_data` if given.
    ///
    /// Fails on a wrong-sized key or an empty plaintext.
    fn encrypt(
        &self,
        plaintext: &[u8],
        key: &Secret,
        associated_data: Option<&[u8]>,
    ) -> AegisResult<EncryptedPacket>;

    /// Decrypt and authenticate `packet`.
    ///
    /// Any tampering, wrong key, or wrong associated data fails with
    /// `AegisError::Crypto`. Malformed sizes fail with `InvalidArgument`.
    fn decrypt(
        &self,
        packet: &EncryptedPacket,
        key: &Secret,
        associated_data: Option<&[u8]>,
    ) -> AegisResult<Vec<u8>>;
}

/// AES-256-GCM (96-bit IV, 128-bit tag)
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256GcmStrategy;

impl CryptoStrategy for Aes256GcmStrategy {
    fn algo(&self) -> EncryptionAlgo {
        EncryptionAlgo::Aes256Gcm
    }

    fn key_size(&self) -> usize {
        32
    }

    fn iv_size(&self) -> usize {
        12
    }

    fn auth_tag_size(&self) -> usize {
        16
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        key: &Secret,
        associated_data: Option<&[u8]>,
    ) -> AegisResult<EncryptedPacket> {
        seal::<Aes256Gcm>(self, plaintext, key, associated_data)
    }

    fn decrypt(
        &self,
        packet: &EncryptedPacket,
        key: &Secret,
        associated_data: Option<&[u8]>,
    ) -> AegisResult<Vec<u8>> {
        open::<Aes256Gcm>(self, packet, key, associated_data)
    }
}

/// XChaCha20-Poly1305 (192-bit IV, 128-bit tag)
#[derive(Debug, Clone, Copy, Default)]
pub struct XChaCha20Poly1305Strategy;

impl CryptoStrategy for XChaCha20Poly1305Strategy {
    fn algo(&self) -> EncryptionAlgo {
        EncryptionAlgo::XChaCha20Poly1305
    }

    fn key_size(&self) -> usize {
        32
    }

    fn iv_size(&self) -> usize {
        24
    }

    fn auth_tag_size(&self) -> usize {
        16
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        key: &Secret,
        associated_data: Option<&[u8]>,
    ) -> AegisResult<EncryptedPacket> {
        seal::<XChaCha20Poly1305>(self, plaintext, key, associated_data)
    }

    fn decrypt(
        &self,
        packet: &EncryptedPacket,
        key: &Secret,
        associated_data: Option<&[u8]>,
    ) -> AegisResult<Vec<u8>> {
        open::<XChaCha20Poly1305>(self, packet, key, associated_data)
    }
}

fn seal<C: AeadInPlace + KeyInit>(
    strategy: &dyn CryptoStrategy,
    plaintext: &[u8],
    key: &Secret,
    associated_data: Option<&[u8]>,
) -> AegisResult<EncryptedPacket> {
    require_len("encryption key", key.as_bytes(), strategy.key_size())?;
    require_non_empty("plaintext", plaintext)?;

    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|_| AegisError::invalid_argument("encryption key has wrong length"))?;

    let mut iv = vec![0u8; strategy.iv_size()];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::<C>::from_slice(&iv);

    let mut buffer = plaintext.to_vec();
    let aad = associated_data.unwrap_or(&[]);
    let tag = match cipher.encrypt_in_place_detached(nonce, aad, &mut buffer) {
        Ok(tag) => tag,
        Err(e) => {
            buffer.zeroize();
            return Err(AegisError::Crypto(format!(
                "{} encryption failed: {e}",
                strategy.algo().name()
            )));
        }
    };

    Ok(EncryptedPacket {
        iv,
        auth_tag: tag.to_vec(),
        cipher_text: buffer,
    })
}

fn open<C: AeadInPlace + KeyInit>(
    strategy: &dyn CryptoStrategy,
    packet: &EncryptedPacket,
    key: &Secret,
    associated_data: Option<&[u8]>,
) -> AegisResult<Vec<u8>> {
    require_len("decryption key", key.as_bytes(), strategy.key_size())?;
    require_len("iv", &packet.iv, strategy.iv_size())?;
    require_len("auth tag", &packet.auth_tag, strategy.auth_tag_size())?;
    require_non_empty("ciphertext", &packet.cipher_text)?;

    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|_| AegisError::invalid_argument("decryption key has wrong length"))?;
    let nonce = Nonce::<C>::from_slice(&packet.iv);
    let tag = Tag::<C>::from_slice(&packet.auth_tag);

    let mut buffer = packet.cipher_text.clone();
    if cipher
        .decrypt_in_place_detached(nonce, associated_data.unwrap_or(&[]), &mut buffer, tag)
        .is_err()
    {
        buffer.zeroize();
        return Err(AegisError::Crypto(format!(
            "{} decryption failed: invalid key, corrupted data, or wrong associated data",
            strategy.algo().name()
        )));
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategies() -> Vec<Box<dyn CryptoStrategy>> {
        vec![Box::new(Aes256GcmStrategy), Box::new(XChaCha20Poly1305Strategy)]
    }

    fn key_for(strategy: &dyn CryptoStrategy) -> Secret {
        Secret::random(strategy.key_size()).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        for s in strategies() {
            let key = key_for(s.as_ref());
            let packet = s.encrypt(b"hello, encrypted world!", &key, Some(&b"ad"[..])).unwrap();
            let plain = s.decrypt(&packet, &key, Some(&b"ad"[..])).unwrap();
            assert_eq!(plain, b"hello, encrypted world!");
        }
    }

    #[test]
    fn test_packet_sizes() {
        for s in strategies() {
            let key = key_for(s.as_ref());
            let packet = s.encrypt(&[7u8; 100], &key, None).unwrap();
            assert_eq!(packet.iv.len(), s.iv_size());
            assert_eq!(packet.auth_tag.len(), s.auth_tag_size());
            assert_eq!(packet.cipher_text.len(), 100);
        }
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let s = Aes256GcmStrategy;
        let key = key_for(&s);
        let a = s.encrypt(b"same", &key, None).unwrap();
        let b = s.encrypt(b"same", &key, None).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.cipher_text, b.cipher_text);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        for s in strategies() {
            let packet = s.encrypt(b"secret data", &key_for(s.as_ref()), None).unwrap();
            let result = s.decrypt(&packet, &key_for(s.as_ref()), None);
            assert!(matches!(result, Err(AegisError::Crypto(_))));
        }
    }

    #[test]
    fn test_decrypt_wrong_associated_data() {
        let s = Aes256GcmStrategy;
        let key = key_for(&s);
        let packet = s.encrypt(b"secret data", &key, Some(&b"laptop"[..])).unwrap();

        assert!(s.decrypt(&packet, &key, Some(&b"desktop"[..])).is_err());
        assert!(s.decrypt(&packet, &key, None).is_err());
    }

    #[test]
    fn test_tampered_ciphertext() {
        for s in strategies() {
            let key = key_for(s.as_ref());
            let mut packet = s.encrypt(b"secret data", &key, None).unwrap();
            packet.cipher_text[0] ^= 0xFF;
            assert!(s.decrypt(&packet, &key, None).is_err(), "tampered ciphertext must fail");
        }
    }

    #[test]
    fn test_tampered_tag() {
        let s = XChaCha20Poly1305Strategy;
        let key = key_for(&s);
        let mut packet = s.encrypt(b"secret data", &key, None).unwrap();
        packet.auth_tag[15] ^= 0x01;
        assert!(s.decrypt(&packet, &key, None).is_err());
    }

    #[test]
    fn test_wrong_key_size_rejected() {
        let s = Aes256GcmStrategy;
        let short = Secret::random(16).unwrap();
        let err = s.encrypt(b"data", &short, None).unwrap_err();
        assert!(matches!(err, AegisError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_plaintext_rejected() {
        let s = Aes256GcmStrategy;
        let err = s.encrypt(b"", &key_for(&s), None).unwrap_err();
        assert!(matches!(err, AegisError::InvalidArgument(_)));
    }

    #[test]
    fn test_malformed_iv_rejected() {
        let s = Aes256GcmStrategy;
        let key = key_for(&s);
        let mut packet = s.encrypt(b"data", &key, None).unwrap();
        packet.iv.truncate(8);
        let err = s.decrypt(&packet, &key, None).unwrap_err();
        assert!(matches!(err, AegisError::InvalidArgument(_)));
    }

    #[test]
    fn test_cross_algorithm_decrypt_fails() {
        let key = Secret::random(32).unwrap();
        let packet = Aes256GcmStrategy.encrypt(b"data", &key, None).unwrap();
        assert!(XChaCha20Poly1305Strategy.decrypt(&packet, &key, None).is_err());
    }

    #[test]
    fn test_parse_algo_names() {
        assert_eq!("aes-256-gcm".parse::<EncryptionAlgo>().unwrap(), EncryptionAlgo::Aes256Gcm);
        assert_eq!("Aes256Gcm".parse::<EncryptionAlgo>().unwrap(), EncryptionAlgo::Aes256Gcm);
        assert_eq!(
            "XChaCha20-Poly1305".parse::<EncryptionAlgo>().unwrap(),
            EncryptionAlgo::XChaCha20Poly1305
        );
        assert!("des".parse::<EncryptionAlgo>().is_err());
    }

    #[test]
    fn test_algo_wire_name() {
        let json = serde_json::to_string(&EncryptionAlgo::Aes256Gcm).unwrap();
        assert_eq!(json, "\"Aes256Gcm\"");
    }
}
