//! File content encryption
//!
//! Each file's bytes are sealed under the archive key with the FileId as
//! associated data, so a content entry moved under another FileId fails to
//! authenticate. The plaintext is framed with a one-byte format tag, so even
//! an empty file produces an authenticated entry and a blanked entry is
//! rejected.

use aegis_core::{AegisError, AegisResult};
use aegis_crypto::{ArchiveKey, CryptoStrategy, EncryptedPacket};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Leading plaintext byte of every content entry.
const CONTENT_FORMAT_V1: u8 = 1;

/// Encrypt `plaintext` into the binary entry form.
pub fn seal_content(
    plaintext: &[u8],
    file_id: Uuid,
    archive_key: &ArchiveKey,
    cipher: &dyn CryptoStrategy,
) -> AegisResult<Vec<u8>> {
    let mut framed = Zeroizing::new(Vec::with_capacity(plaintext.len() + 1));
    framed.push(CONTENT_FORMAT_V1);
    framed.extend_from_slice(plaintext);

    let packet = cipher.encrypt(&framed, archive_key.secret(), Some(&file_id.as_bytes()[..]))?;
    Ok(packet.to_bytes())
}

/// Decrypt a content entry written by [`seal_content`].
pub fn open_content(
    blob: &[u8],
    file_id: Uuid,
    archive_key: &ArchiveKey,
    cipher: &dyn CryptoStrategy,
) -> AegisResult<Vec<u8>> {
    let packet = EncryptedPacket::from_bytes(blob, cipher)?;
    if packet.is_empty() {
        return Err(AegisError::corrupted(format!("content of file {file_id} is missing")));
    }
    let mut framed = cipher
        .decrypt(&packet, archive_key.secret(), Some(&file_id.as_bytes()[..]))
        .map_err(|_| {
            AegisError::corrupted(format!("content of file {file_id} failed to authenticate"))
        })?;

    match framed.first() {
        Some(&CONTENT_FORMAT_V1) => {
            framed.remove(0);
            Ok(framed)
        }
        _ => Err(AegisError::corrupted(format!(
            "content of file {file_id} has an unknown format"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_crypto::{Aes256GcmStrategy, XChaCha20Poly1305Strategy};

    #[test]
    fn test_seal_open() {
        let ciphers: [&dyn CryptoStrategy; 2] = [&Aes256GcmStrategy, &XChaCha20Poly1305Strategy];
        for cipher in ciphers {
            let key = ArchiveKey::generate(cipher).unwrap();
            let id = Uuid::new_v4();
            let blob = seal_content(b"hello archive", id, &key, cipher).unwrap();
            assert_eq!(
                blob.len(),
                cipher.iv_size() + cipher.auth_tag_size() + 1 + b"hello archive".len()
            );
            assert_eq!(open_content(&blob, id, &key, cipher).unwrap(), b"hello archive");
        }
    }

    #[test]
    fn test_empty_content_is_authenticated() {
        let key = ArchiveKey::generate(&Aes256GcmStrategy).unwrap();
        let id = Uuid::new_v4();
        let blob = seal_content(b"", id, &key, &Aes256GcmStrategy).unwrap();
        assert!(!blob.is_empty());
        assert!(open_content(&blob, id, &key, &Aes256GcmStrategy).unwrap().is_empty());

        // an empty file is still bound to its id
        let err = open_content(&blob, Uuid::new_v4(), &key, &Aes256GcmStrategy).unwrap_err();
        assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
    }

    #[test]
    fn test_blank_entry_is_corruption() {
        let key = ArchiveKey::generate(&Aes256GcmStrategy).unwrap();
        let err = open_content(&[], Uuid::new_v4(), &key, &Aes256GcmStrategy).unwrap_err();
        assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
    }

    #[test]
    fn test_unknown_format_tag_is_corruption() {
        let key = ArchiveKey::generate(&Aes256GcmStrategy).unwrap();
        let id = Uuid::new_v4();
        let packet = Aes256GcmStrategy
            .encrypt(&[9, b'x'], key.secret(), Some(&id.as_bytes()[..]))
            .unwrap();
        let err = open_content(&packet.to_bytes(), id, &key, &Aes256GcmStrategy).unwrap_err();
        assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
    }

    #[test]
    fn test_content_bound_to_file_id() {
        let key = ArchiveKey::generate(&Aes256GcmStrategy).unwrap();
        let blob = seal_content(b"secret", Uuid::new_v4(), &key, &Aes256GcmStrategy).unwrap();
        let err = open_content(&blob, Uuid::new_v4(), &key, &Aes256GcmStrategy).unwrap_err();
        assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
    }

    #[test]
    fn test_truncated_entry_is_corruption() {
        let key = ArchiveKey::generate(&Aes256GcmStrategy).unwrap();
        let id = Uuid::new_v4();
        let blob = seal_content(b"secret", id, &key, &Aes256GcmStrategy).unwrap();
        let err = open_content(&blob[..10], id, &key, &Aes256GcmStrategy).unwrap_err();
        assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
    }
}
