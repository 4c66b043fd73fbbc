//! Several secrets authorized on one archive.
//!
//! Each authorization wraps the same archive key independently, so any one
//! of them unlocks the archive no matter what happens to the others.

use std::path::Path;
use std::sync::Arc;

use aegis_archive::container::{ArchiveContainer, ContainerUpdate, METADATA_ENTRY_NAME};
use aegis_archive::{Archive, ArchiveCreationParams};
use aegis_core::{AegisError, FileSettings};
use aegis_crypto::{AlgorithmTable, Secret, SecuritySettings};
use aegis_secrets::{ProvidedSecret, RawSecretProvider, SecretKind, SecretMetadata, SecretProvider};

const SECRET_A: &[u8] = b"correct horse battery staple";
const SECRET_B: &[u8] = b"hunter2-but-longer";

fn settings_for(dir: &Path) -> FileSettings {
    FileSettings::new(dir.join("shared.aegis"), dir.join("scratch"))
}

fn password(bytes: &[u8]) -> ProvidedSecret {
    ProvidedSecret {
        secret: Secret::from_slice(bytes).unwrap(),
        metadata: SecretMetadata::Password,
    }
}

fn load(dir: &Path) -> Archive {
    Archive::load(Arc::new(AlgorithmTable::standard()), &settings_for(dir)).unwrap()
}

/// Archive with files, authorized for A (password) and B (passkey).
fn two_key_archive(dir: &Path) {
    let mut archive = Archive::create_new(
        Arc::new(AlgorithmTable::standard()),
        &settings_for(dir),
        ArchiveCreationParams {
            security_settings: SecuritySettings {
                key_derivation_work_factor: 1000,
                ..SecuritySettings::default()
            },
            friendly_name: "secret A".into(),
            secret: password(SECRET_A),
        },
    )
    .unwrap();
    archive.put_file("/shared/readme.txt", b"hello from A").unwrap();

    let passkey = RawSecretProvider::new(
        SECRET_B.to_vec(),
        SecretMetadata::PasskeyHmacSecret {
            credential_id: vec![0xC0, 0xFF, 0xEE],
        },
    );
    archive
        .authorize_new_key("secret B", passkey.acquire().unwrap())
        .unwrap();
    archive.put_file("/shared/after-b.txt", b"added after B").unwrap();
}

/// Rewrite the `.meta` JSON on disk with `edit`.
fn edit_metadata(dir: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
    let path = settings_for(dir).archive_path;
    let mut container = ArchiveContainer::open(&path).unwrap();
    let bytes = container.read_entry(METADATA_ENTRY_NAME).unwrap().unwrap();
    let mut json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    edit(&mut json);

    let mut update = ContainerUpdate::new();
    update.put(METADATA_ENTRY_NAME, serde_json::to_vec(&json).unwrap());
    container.commit(&update).unwrap();
}

fn listing(archive: &mut Archive) -> Vec<(String, Vec<u8>)> {
    ["/shared/readme.txt", "/shared/after-b.txt"]
        .into_iter()
        .map(|p| (p.to_string(), archive.extract_file(p).unwrap()))
        .collect()
}

#[test]
fn either_key_unlocks_same_contents() {
    let dir = tempfile::tempdir().unwrap();
    two_key_archive(dir.path());

    let mut via_a = load(dir.path());
    via_a.unlock(&Secret::from_slice(SECRET_A).unwrap()).unwrap();

    let mut via_b = load(dir.path());
    via_b.unlock(&Secret::from_slice(SECRET_B).unwrap()).unwrap();

    assert_eq!(listing(&mut via_a), listing(&mut via_b));
    assert_eq!(via_a.file_count().unwrap(), 2);

    let auths = via_b.get_user_key_authorizations().unwrap();
    assert_eq!(auths.len(), 2);
    assert_eq!(auths[0].friendly_name, "secret A");
    assert_eq!(auths[0].secret_metadata.kind(), SecretKind::Password);
    assert_eq!(auths[1].friendly_name, "secret B");
    assert_eq!(
        auths[1].secret_metadata,
        SecretMetadata::PasskeyHmacSecret {
            credential_id: vec![0xC0, 0xFF, 0xEE]
        }
    );
}

#[test]
fn corrupting_one_authorization_leaves_the_other() {
    for corrupted in 0..2usize {
        let dir = tempfile::tempdir().unwrap();
        two_key_archive(dir.path());

        edit_metadata(dir.path(), |json| {
            json["UserKeyAuthorizations"][corrupted]["EncryptedArchiveKey"]["CipherText"] =
                "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".into();
        });

        let (broken, intact) = if corrupted == 0 {
            (SECRET_A, SECRET_B)
        } else {
            (SECRET_B, SECRET_A)
        };

        let mut archive = load(dir.path());
        assert!(matches!(
            archive.unlock(&Secret::from_slice(broken).unwrap()),
            Err(AegisError::Unauthorized)
        ));
        archive.unlock(&Secret::from_slice(intact).unwrap()).unwrap();
        assert_eq!(archive.extract_file("/shared/readme.txt").unwrap(), b"hello from A");
    }
}

#[test]
fn removing_one_authorization_leaves_the_other() {
    let dir = tempfile::tempdir().unwrap();
    two_key_archive(dir.path());

    edit_metadata(dir.path(), |json| {
        if let Some(auths) = json["UserKeyAuthorizations"].as_array_mut() {
            auths.remove(0);
        }
    });

    let mut archive = load(dir.path());
    assert!(matches!(
        archive.unlock(&Secret::from_slice(SECRET_A).unwrap()),
        Err(AegisError::Unauthorized)
    ));
    archive.unlock(&Secret::from_slice(SECRET_B).unwrap()).unwrap();
    assert_eq!(archive.get_user_key_authorizations().unwrap().len(), 1);
}

#[test]
fn relabelled_authorization_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    two_key_archive(dir.path());

    // the friendly name is bound as associated data
    edit_metadata(dir.path(), |json| {
        json["UserKeyAuthorizations"][1]["FriendlyName"] = "impostor".into();
    });

    let mut archive = load(dir.path());
    assert!(matches!(
        archive.unlock(&Secret::from_slice(SECRET_B).unwrap()),
        Err(AegisError::Unauthorized)
    ));
    archive.unlock(&Secret::from_slice(SECRET_A).unwrap()).unwrap();
}

#[test]
fn revocation_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    two_key_archive(dir.path());

    let mut archive = load(dir.path());
    archive.unlock(&Secret::from_slice(SECRET_B).unwrap()).unwrap();
    let key_a = archive.get_user_key_authorizations().unwrap()[0].key_id.clone();
    let revoked = archive.revoke_key(&key_a).unwrap();
    assert_eq!(revoked.friendly_name, "secret A");
    drop(archive);

    let mut archive = load(dir.path());
    assert!(matches!(
        archive.unlock(&Secret::from_slice(SECRET_A).unwrap()),
        Err(AegisError::Unauthorized)
    ));
    archive.unlock(&Secret::from_slice(SECRET_B).unwrap()).unwrap();
    assert_eq!(listing(&mut archive).len(), 2);
}

#[test]
fn tampered_canary_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    two_key_archive(dir.path());

    // a different archive id no longer matches the canary plaintext
    edit_metadata(dir.path(), |json| {
        json["Id"] = uuid::Uuid::new_v4().to_string().into();
    });

    let mut archive = load(dir.path());
    assert!(matches!(
        archive.unlock(&Secret::from_slice(SECRET_A).unwrap()),
        Err(AegisError::Unauthorized)
    ));
}

#[test]
fn swapped_content_entries_fail_to_authenticate() {
    let dir = tempfile::tempdir().unwrap();
    two_key_archive(dir.path());

    let mut archive = load(dir.path());
    archive.unlock(&Secret::from_slice(SECRET_A).unwrap()).unwrap();
    let a = archive.get_file_info("/shared/readme.txt").unwrap().unwrap().clone();
    let b = archive.get_file_info("/shared/after-b.txt").unwrap().unwrap().clone();
    drop(archive);

    let path = settings_for(dir.path()).archive_path;
    let mut container = ArchiveContainer::open(&path).unwrap();
    let blob_a = container.read_entry(&a.storage_entry_name()).unwrap().unwrap();
    let blob_b = container.read_entry(&b.storage_entry_name()).unwrap().unwrap();
    let mut update = ContainerUpdate::new();
    update.put(a.storage_entry_name(), blob_b);
    update.put(b.storage_entry_name(), blob_a);
    container.commit(&update).unwrap();

    let mut archive = load(dir.path());
    archive.unlock(&Secret::from_slice(SECRET_A).unwrap()).unwrap();
    assert!(matches!(
        archive.extract_file("/shared/readme.txt"),
        Err(AegisError::ArchiveCorrupted(_))
    ));
}

#[test]
fn missing_metadata_entry_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    two_key_archive(dir.path());

    let path = settings_for(dir.path()).archive_path;
    let mut container = ArchiveContainer::open(&path).unwrap();
    let mut update = ContainerUpdate::new();
    update.remove(METADATA_ENTRY_NAME);
    container.commit(&update).unwrap();

    let err = Archive::load(Arc::new(AlgorithmTable::standard()), &settings_for(dir.path()))
        .unwrap_err();
    assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
}

#[test]
fn non_zip_file_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = settings_for(dir.path()).archive_path;
    std::fs::write(&path, b"definitely not an archive").unwrap();

    let err = Archive::load(Arc::new(AlgorithmTable::standard()), &settings_for(dir.path()))
        .unwrap_err();
    assert!(matches!(err, AegisError::ArchiveCorrupted(_)));
}
