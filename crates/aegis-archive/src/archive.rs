//! The archive facade: lifecycle, unlock, and file operations
//!
//! An [`Archive`] is either locked (only the plaintext metadata is known) or
//! unlocked (the archive key and decrypted file index are held in memory).
//! Everything except [`Archive::load`] and the unlock calls requires the
//! unlocked state.
//!
//! Mutations are staged on copies of the index and metadata and installed
//! only after the container commit succeeds, so a failed write leaves the
//! in-memory state matching what is on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aegis_core::validate::require_non_blank;
use aegis_core::{AegisError, AegisResult, FileSettings};
use aegis_crypto::{
    generate_salt, AlgorithmTable, ArchiveKey, CryptoStrategy, EncryptedPacket, KeyId, Secret,
    SecuritySettings, UserKey,
};
use aegis_secrets::ProvidedSecret;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::authorization::UserKeyAuthorization;
use crate::container::{ArchiveContainer, ContainerUpdate, METADATA_ENTRY_NAME};
use crate::content::{open_content, seal_content};
use crate::index::{AegisFileInfo, DirectoryVisit, FileIndex};
use crate::metadata::SecureArchiveMetadata;
use crate::path::{VirtualDirectoryPath, VirtualFilePath};
use crate::tree::VisitPhase;

/// Everything needed to create a new archive.
#[derive(Debug)]
pub struct ArchiveCreationParams {
    pub security_settings: SecuritySettings,
    /// Label for the first authorization
    pub friendly_name: String,
    pub secret: ProvidedSecret,
}

/// Callbacks for [`Archive::traverse_file_tree`].
///
/// Directories arrive depth-first with children in ascending
/// case-insensitive order; each directory is visited once before and once
/// after its subdirectories.
pub trait FileTreeVisitor {
    fn on_start(&mut self) {}

    fn on_pre_order_visit(
        &mut self,
        _directory: &VirtualDirectoryPath,
        _files: &[&AegisFileInfo],
    ) {
    }

    fn on_post_order_visit(
        &mut self,
        _directory: &VirtualDirectoryPath,
        _files: &[&AegisFileInfo],
    ) {
    }

    fn on_done(&mut self) {}
}

enum ArchiveState {
    Locked,
    Unlocked {
        archive_key: ArchiveKey,
        file_index: FileIndex,
    },
}

impl ArchiveState {
    fn unlocked(&self) -> AegisResult<(&ArchiveKey, &FileIndex)> {
        match self {
            Self::Unlocked {
                archive_key,
                file_index,
            } => Ok((archive_key, file_index)),
            Self::Locked => Err(AegisError::ArchiveLocked),
        }
    }
}

/// Changes committed together by [`Archive::persist_metadata`].
#[derive(Default)]
struct PendingChanges {
    file_index: Option<FileIndex>,
    authorizations: Option<Vec<UserKeyAuthorization>>,
    content: ContainerUpdate,
}

/// An open encrypted archive.
pub struct Archive {
    algorithms: Arc<AlgorithmTable>,
    file_settings: FileSettings,
    container: ArchiveContainer,
    metadata: SecureArchiveMetadata,
    state: ArchiveState,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("id", &self.metadata.id)
            .field("path", &self.file_settings.archive_path)
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}

impl Archive {
    /// Create a new archive file, authorized for `params.secret`, and return
    /// it unlocked.
    pub fn create_new(
        algorithms: Arc<AlgorithmTable>,
        file_settings: &FileSettings,
        params: ArchiveCreationParams,
    ) -> AegisResult<Self> {
        let ArchiveCreationParams {
            security_settings,
            friendly_name,
            secret,
        } = params;
        security_settings.validate()?;
        require_non_blank("friendly name", &friendly_name)?;

        let cipher = algorithms.cipher(security_settings.encryption_algo)?;
        let archive_key = ArchiveKey::generate(cipher)?;
        let salt = generate_salt();
        let user_key =
            UserKey::derive_from(&secret.secret, &salt, &security_settings, &algorithms)?;
        let authorization = UserKeyAuthorization::create_new(
            &friendly_name,
            &user_key,
            &archive_key,
            secret.metadata,
            &security_settings,
            &algorithms,
        )?;

        let file_index = FileIndex::new();
        let now = Utc::now();
        let mut metadata = SecureArchiveMetadata {
            id: Uuid::new_v4(),
            security_settings,
            create_time: now,
            last_modified_time: now,
            key_derivation_salt: salt,
            auth_canary: EncryptedPacket::empty(),
            user_key_authorizations: vec![authorization],
            encrypted_file_index: file_index.encrypt(&archive_key, cipher)?,
        };
        metadata.seal_canary(&archive_key, cipher)?;

        let mut initial = ContainerUpdate::new();
        initial.put(METADATA_ENTRY_NAME, metadata.to_json()?);
        let container = ArchiveContainer::create(&file_settings.archive_path, &initial)?;

        info!(
            id = %metadata.id,
            path = %file_settings.archive_path.display(),
            algo = metadata.security_settings.encryption_algo.name(),
            kdf = metadata.security_settings.key_derivation_function.name(),
            "archive created"
        );

        Ok(Self {
            algorithms,
            file_settings: file_settings.clone(),
            container,
            metadata,
            state: ArchiveState::Unlocked {
                archive_key,
                file_index,
            },
        })
    }

    /// Open an existing archive. The result is locked.
    pub fn load(
        algorithms: Arc<AlgorithmTable>,
        file_settings: &FileSettings,
    ) -> AegisResult<Self> {
        let mut container = ArchiveContainer::open(&file_settings.archive_path)?;
        let bytes = container
            .read_entry(METADATA_ENTRY_NAME)?
            .ok_or_else(|| AegisError::corrupted("archive has no metadata entry"))?;
        let metadata = SecureArchiveMetadata::from_json(&bytes)?;

        info!(
            id = %metadata.id,
            path = %file_settings.archive_path.display(),
            authorizations = metadata.user_key_authorizations.len(),
            "archive loaded"
        );

        Ok(Self {
            algorithms,
            file_settings: file_settings.clone(),
            container,
            metadata,
            state: ArchiveState::Locked,
        })
    }

    /// Derive a user key from `secret` and unlock with it.
    pub fn unlock(&mut self, secret: &Secret) -> AegisResult<()> {
        let user_key = UserKey::derive_from(
            secret,
            &self.metadata.key_derivation_salt,
            &self.metadata.security_settings,
            &self.algorithms,
        )?;
        self.unlock_with_key(&user_key)
    }

    /// Unlock with an already-derived user key.
    ///
    /// Fails with `Unauthorized` if no authorization accepts the key or the
    /// recovered archive key does not open the canary. The two cases are
    /// not distinguished.
    pub fn unlock_with_key(&mut self, user_key: &UserKey) -> AegisResult<()> {
        let cipher = self
            .algorithms
            .cipher(self.metadata.security_settings.encryption_algo)?;

        let archive_key = self
            .metadata
            .user_key_authorizations
            .iter()
            .filter_map(|authorization| {
                authorization.try_decrypt_archive_key(
                    user_key,
                    &self.metadata.security_settings,
                    &self.algorithms,
                )
            })
            .find(|candidate| self.metadata.verify_canary(candidate, cipher));

        let Some(archive_key) = archive_key else {
            warn!(id = %self.metadata.id, "unlock rejected");
            return Err(AegisError::Unauthorized);
        };

        let file_index =
            FileIndex::decrypt(&self.metadata.encrypted_file_index, &archive_key, cipher).map_err(
                |e| match e {
                    AegisError::ArchiveCorrupted(_) => e,
                    other => AegisError::corrupted(format!("file index: {other}")),
                },
            )?;

        info!(id = %self.metadata.id, files = file_index.len(), "archive unlocked");
        self.state = ArchiveState::Unlocked {
            archive_key,
            file_index,
        };
        Ok(())
    }

    /// Forget the archive key and file index. The container stays open.
    pub fn lock(&mut self) {
        if self.is_unlocked() {
            debug!(id = %self.metadata.id, "archive locked");
        }
        self.state = ArchiveState::Locked;
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, ArchiveState::Unlocked { .. })
    }

    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    pub fn path(&self) -> &Path {
        self.container.path()
    }

    pub fn security_settings(&self) -> &SecuritySettings {
        &self.metadata.security_settings
    }

    /// Salt for deriving a [`UserKey`] to pass to [`Archive::unlock_with_key`].
    pub fn key_derivation_salt(&self) -> &[u8] {
        &self.metadata.key_derivation_salt
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.metadata.create_time
    }

    pub fn last_modified_time(&self) -> DateTime<Utc> {
        self.metadata.last_modified_time
    }

    pub fn file_count(&self) -> AegisResult<usize> {
        let (_, file_index) = self.state.unlocked()?;
        Ok(file_index.len())
    }

    /// Add a file, or replace the content of an existing one.
    ///
    /// Replacing keeps the FileId and AddedTime and bumps LastModifiedTime.
    pub fn put_file(&mut self, path: &str, content: &[u8]) -> AegisResult<AegisFileInfo> {
        let (archive_key, file_index) = self.state.unlocked()?;
        let path = VirtualFilePath::parse(path)?;
        let cipher = self
            .algorithms
            .cipher(self.metadata.security_settings.encryption_algo)?;

        let now = Utc::now();
        let mut staged = file_index.clone();
        let existing = staged.get_by_path(&path).map(AegisFileInfo::file_id);
        let info = match existing {
            Some(file_id) => {
                staged.touch(file_id, now);
                staged
                    .get_by_id(file_id)
                    .cloned()
                    .ok_or_else(|| AegisError::internal(format!("file id {file_id} vanished")))?
            }
            None => {
                let info = AegisFileInfo::new(path, now);
                staged.add(info.clone())?;
                info
            }
        };
        let blob = seal_content(content, info.file_id(), archive_key, cipher)?;

        let mut changes = PendingChanges {
            file_index: Some(staged),
            ..PendingChanges::default()
        };
        changes.content.put(info.storage_entry_name(), blob);
        self.persist_metadata(changes)?;

        debug!(
            file_id = %info.file_id(),
            bytes = content.len(),
            replaced = existing.is_some(),
            "file stored"
        );
        Ok(info)
    }

    /// Remove a file and its content. `EntityNotFound` if absent.
    pub fn remove_file(&mut self, path: &str) -> AegisResult<AegisFileInfo> {
        let (_, file_index) = self.state.unlocked()?;
        let path = VirtualFilePath::parse(path)?;

        let mut staged = file_index.clone();
        let removed = staged
            .remove_by_path(&path)
            .ok_or_else(|| AegisError::not_found(format!("no file at {path}")))?;

        let mut changes = PendingChanges {
            file_index: Some(staged),
            ..PendingChanges::default()
        };
        changes.content.remove(removed.storage_entry_name());
        self.persist_metadata(changes)?;

        debug!(file_id = %removed.file_id(), "file removed");
        Ok(removed)
    }

    /// Decrypt a file's content.
    pub fn extract_file(&mut self, path: &str) -> AegisResult<Vec<u8>> {
        let (archive_key, file_index) = self.state.unlocked()?;
        let path = VirtualFilePath::parse(path)?;
        let info = file_index
            .get_by_path(&path)
            .ok_or_else(|| AegisError::not_found(format!("no file at {path}")))?;
        let file_id = info.file_id();
        let cipher = self
            .algorithms
            .cipher(self.metadata.security_settings.encryption_algo)?;

        let blob = self
            .container
            .read_entry(&info.storage_entry_name())?
            .ok_or_else(|| {
                AegisError::corrupted(format!("content entry for {file_id} is missing"))
            })?;
        open_content(&blob, file_id, archive_key, cipher)
    }

    /// Decrypt a file into `scratch_dir/<FileId>/<file name>` and return
    /// that location.
    pub fn extract_file_to_scratch(&mut self, path: &str) -> AegisResult<PathBuf> {
        let content = self.extract_file(path)?;
        let info = self
            .get_file_info(path)?
            .ok_or_else(|| AegisError::not_found(format!("no file at {path}")))?;

        let dir = self
            .file_settings
            .scratch_dir
            .join(info.storage_entry_name());
        fs::create_dir_all(&dir)?;
        let out = dir.join(info.path.file_name().as_str());
        fs::write(&out, &content)?;

        debug!(file_id = %info.file_id(), out = %out.display(), "file extracted to scratch");
        Ok(out)
    }

    pub fn get_file_info(&self, path: &str) -> AegisResult<Option<&AegisFileInfo>> {
        let (_, file_index) = self.state.unlocked()?;
        let path = VirtualFilePath::parse(path)?;
        Ok(file_index.get_by_path(&path))
    }

    pub fn get_file_info_by_id(&self, file_id: Uuid) -> AegisResult<Option<&AegisFileInfo>> {
        let (_, file_index) = self.state.unlocked()?;
        Ok(file_index.get_by_id(file_id))
    }

    /// Lazily walk the file tree. Each call starts a fresh walk.
    pub fn directory_visits(&self) -> AegisResult<impl Iterator<Item = DirectoryVisit<'_>> + '_> {
        let (_, file_index) = self.state.unlocked()?;
        Ok(file_index.traverse())
    }

    /// Drive `visitor` over the file tree.
    pub fn traverse_file_tree(&self, visitor: &mut dyn FileTreeVisitor) -> AegisResult<()> {
        let visits = self.directory_visits()?;
        visitor.on_start();
        for visit in visits {
            match visit.phase {
                VisitPhase::PreOrder => visitor.on_pre_order_visit(&visit.directory, &visit.files),
                VisitPhase::PostOrder => {
                    visitor.on_post_order_visit(&visit.directory, &visit.files)
                }
            }
        }
        visitor.on_done();
        Ok(())
    }

    pub fn get_user_key_authorizations(&self) -> AegisResult<&[UserKeyAuthorization]> {
        self.state.unlocked()?;
        Ok(&self.metadata.user_key_authorizations)
    }

    /// Authorize another secret to unlock this archive.
    ///
    /// Fails with `InvalidArgument` if the secret is already authorized.
    pub fn authorize_new_key(
        &mut self,
        friendly_name: &str,
        secret: ProvidedSecret,
    ) -> AegisResult<UserKeyAuthorization> {
        let (archive_key, _) = self.state.unlocked()?;
        let settings = &self.metadata.security_settings;
        let user_key = UserKey::derive_from(
            &secret.secret,
            &self.metadata.key_derivation_salt,
            settings,
            &self.algorithms,
        )?;

        if self
            .metadata
            .user_key_authorizations
            .iter()
            .any(|existing| existing.key_id.ct_matches(user_key.key_id()))
        {
            return Err(AegisError::invalid_argument(
                "this secret is already authorized for the archive",
            ));
        }

        let kind = secret.metadata.kind();
        let authorization = UserKeyAuthorization::create_new(
            friendly_name,
            &user_key,
            archive_key,
            secret.metadata,
            settings,
            &self.algorithms,
        )?;

        let mut authorizations = self.metadata.user_key_authorizations.clone();
        authorizations.push(authorization.clone());
        self.persist_metadata(PendingChanges {
            authorizations: Some(authorizations),
            ..PendingChanges::default()
        })?;

        info!(
            id = %self.metadata.id,
            friendly_name,
            key_id = %authorization.key_id,
            kind = kind.name(),
            "key authorized"
        );
        Ok(authorization)
    }

    /// Remove the authorization with `key_id`.
    ///
    /// The last remaining authorization cannot be revoked.
    pub fn revoke_key(&mut self, key_id: &KeyId) -> AegisResult<UserKeyAuthorization> {
        self.state.unlocked()?;
        let mut authorizations = self.metadata.user_key_authorizations.clone();
        let position = authorizations
            .iter()
            .position(|existing| existing.key_id.ct_matches(key_id))
            .ok_or_else(|| {
                AegisError::not_found(format!("no authorization with key id {key_id}"))
            })?;
        if authorizations.len() == 1 {
            return Err(AegisError::invalid_argument(
                "cannot revoke the only authorized key",
            ));
        }

        let revoked = authorizations.remove(position);
        self.persist_metadata(PendingChanges {
            authorizations: Some(authorizations),
            ..PendingChanges::default()
        })?;

        info!(
            id = %self.metadata.id,
            friendly_name = %revoked.friendly_name,
            key_id = %revoked.key_id,
            "key revoked"
        );
        Ok(revoked)
    }

    /// Re-encrypt the index, refresh the canary, bump LastModifiedTime and
    /// commit the metadata together with `changes.content`.
    fn persist_metadata(&mut self, changes: PendingChanges) -> AegisResult<()> {
        let ArchiveState::Unlocked {
            archive_key,
            file_index,
        } = &self.state
        else {
            return Err(AegisError::internal(
                "archive metadata cannot be persisted while locked",
            ));
        };
        let cipher = self
            .algorithms
            .cipher(self.metadata.security_settings.encryption_algo)?;

        let PendingChanges {
            file_index: staged_index,
            authorizations,
            mut content,
        } = changes;

        let mut metadata = self.metadata.clone();
        if let Some(authorizations) = authorizations {
            metadata.user_key_authorizations = authorizations;
        }
        metadata.encrypted_file_index = staged_index
            .as_ref()
            .unwrap_or(file_index)
            .encrypt(archive_key, cipher)?;
        metadata.seal_canary(archive_key, cipher)?;
        metadata.last_modified_time = Utc::now();

        content.put(METADATA_ENTRY_NAME, metadata.to_json()?);
        self.container.commit(&content)?;

        debug!(
            id = %metadata.id,
            authorizations = metadata.user_key_authorizations.len(),
            "archive metadata persisted"
        );
        self.metadata = metadata;
        if let (Some(staged), ArchiveState::Unlocked { file_index, .. }) =
            (staged_index, &mut self.state)
        {
            *file_index = staged;
        }
        Ok(())
    }
}
