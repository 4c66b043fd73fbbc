//! Encrypted file index
//!
//! Two views over the same set of files, kept in lockstep:
//! - by FileId, for resolving storage entries
//! - by virtual path, via [`VirtualFileTree`], for lookup and traversal
//!
//! At rest the index is a JSON array of [`FileIndexEntry`] encrypted under
//! the archive key and stored in the archive metadata. It is rebuilt from
//! that array on every unlock.

use std::collections::HashMap;

use aegis_core::{AegisError, AegisResult};
use aegis_crypto::{ArchiveKey, CryptoStrategy, EncryptedPacket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::path::{VirtualDirectoryPath, VirtualFilePath};
use crate::tree::{VirtualFileTree, VisitPhase};

/// Persisted record of one archived file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileIndexEntry {
    pub file_id: Uuid,
    pub file_path: String,
    pub added_time: DateTime<Utc>,
    pub last_modified_time: DateTime<Utc>,
}

/// An index entry paired with its parsed virtual path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AegisFileInfo {
    pub path: VirtualFilePath,
    pub entry: FileIndexEntry,
}

impl AegisFileInfo {
    /// A fresh record for a file first added at `now`.
    pub fn new(path: VirtualFilePath, now: DateTime<Utc>) -> Self {
        let entry = FileIndexEntry {
            file_id: Uuid::new_v4(),
            file_path: path.to_string(),
            added_time: now,
            last_modified_time: now,
        };
        Self { path, entry }
    }

    /// Parse the path of a persisted entry.
    pub fn from_entry(entry: FileIndexEntry) -> AegisResult<Self> {
        let path = VirtualFilePath::parse(&entry.file_path)?;
        Ok(Self { path, entry })
    }

    pub fn file_id(&self) -> Uuid {
        self.entry.file_id
    }

    /// Name of the container entry holding this file's content.
    pub fn storage_entry_name(&self) -> String {
        self.entry.file_id.to_string()
    }
}

/// One directory visit over the index, with files resolved.
#[derive(Debug)]
pub struct DirectoryVisit<'a> {
    pub phase: VisitPhase,
    pub directory: VirtualDirectoryPath,
    pub files: Vec<&'a AegisFileInfo>,
}

/// The in-memory catalog of an unlocked archive.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    by_id: HashMap<Uuid, AegisFileInfo>,
    tree: VirtualFileTree<Uuid>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Add a file. Fails if its id or (case-insensitive) path is taken.
    pub fn add(&mut self, info: AegisFileInfo) -> AegisResult<()> {
        let file_id = info.file_id();
        if self.by_id.contains_key(&file_id) {
            return Err(AegisError::internal(format!(
                "file id {file_id} is already indexed"
            )));
        }
        self.tree.insert(&info.path, file_id)?;
        self.by_id.insert(file_id, info);
        Ok(())
    }

    pub fn remove_by_id(&mut self, file_id: Uuid) -> Option<AegisFileInfo> {
        let info = self.by_id.remove(&file_id)?;
        self.tree.remove(&info.path);
        Some(info)
    }

    pub fn remove_by_path(&mut self, path: &VirtualFilePath) -> Option<AegisFileInfo> {
        let file_id = self.tree.remove(path)?;
        self.by_id.remove(&file_id)
    }

    pub fn get_by_id(&self, file_id: Uuid) -> Option<&AegisFileInfo> {
        self.by_id.get(&file_id)
    }

    pub fn get_by_path(&self, path: &VirtualFilePath) -> Option<&AegisFileInfo> {
        self.tree.get(path).and_then(|id| self.by_id.get(id))
    }

    /// Bump a file's last-modified time. Returns false if it is not indexed.
    pub fn touch(&mut self, file_id: Uuid, now: DateTime<Utc>) -> bool {
        match self.by_id.get_mut(&file_id) {
            Some(info) => {
                info.entry.last_modified_time = now;
                true
            }
            None => false,
        }
    }

    /// Persisted records, ordered by path.
    pub fn entries(&self) -> Vec<FileIndexEntry> {
        let mut infos: Vec<&AegisFileInfo> = self.by_id.values().collect();
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        infos.into_iter().map(|info| info.entry.clone()).collect()
    }

    /// Depth-first directory walk; see [`VirtualFileTree::traverse`].
    pub fn traverse(&self) -> impl Iterator<Item = DirectoryVisit<'_>> + '_ {
        self.tree.traverse().map(move |event| DirectoryVisit {
            phase: event.phase,
            directory: event.directory,
            files: event
                .files
                .into_iter()
                .filter_map(|(_, id)| self.by_id.get(id))
                .collect(),
        })
    }

    /// Serialize and encrypt under the archive key.
    pub fn encrypt(
        &self,
        archive_key: &ArchiveKey,
        cipher: &dyn CryptoStrategy,
    ) -> AegisResult<EncryptedPacket> {
        let json = Zeroizing::new(serde_json::to_vec(&self.entries())?);
        cipher.encrypt(&json, archive_key.secret(), None)
    }

    /// Decrypt and rebuild. The empty packet yields an empty index.
    ///
    /// Authentication failures propagate as-is; a payload that decrypts
    /// but cannot be rebuilt is reported as corruption.
    pub fn decrypt(
        packet: &EncryptedPacket,
        archive_key: &ArchiveKey,
        cipher: &dyn CryptoStrategy,
    ) -> AegisResult<Self> {
        if packet.is_empty() {
            return Ok(Self::new());
        }
        let json = Zeroizing::new(cipher.decrypt(packet, archive_key.secret(), None)?);
        let entries: Vec<FileIndexEntry> = serde_json::from_slice(&json)
            .map_err(|e| AegisError::corrupted(format!("file index: {e}")))?;

        let mut index = Self::new();
        for entry in entries {
            let info = AegisFileInfo::from_entry(entry)
                .map_err(|e| AegisError::corrupted(format!("file index: {e}")))?;
            index
                .add(info)
                .map_err(|e| AegisError::corrupted(format!("file index: {e}")))?;
        }
        Ok(index)
    }
}
