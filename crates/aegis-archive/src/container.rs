//! Zip backing container
//!
//! Layout:
//! ```text
//! .meta          JSON SecureArchiveMetadata (deflated)
//! <FileId>       encrypted file content, one entry per file (stored)
//! ```
//!
//! The container is never modified in place. Every commit writes a complete
//! new zip next to the archive, syncs it, and renames it over the original,
//! so a crash leaves either the old archive or the new one.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use aegis_core::{AegisError, AegisResult};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Reserved entry holding the archive metadata
pub const METADATA_ENTRY_NAME: &str = ".meta";

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// Buffer to reserve for an entry whose header declares `declared` bytes.
/// Header sizes are untrusted, so larger entries grow while reading.
fn preallocation(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0)
}

fn zip_error(e: ZipError) -> AegisError {
    match e {
        ZipError::Io(io) => AegisError::Io(io),
        other => AegisError::corrupted(format!("zip container: {other}")),
    }
}

/// A batch of entry writes and removals applied by one commit.
#[derive(Debug, Default)]
pub struct ContainerUpdate {
    entries: BTreeMap<String, Option<Vec<u8>>>,
}

impl ContainerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `bytes` to `name`, replacing any existing entry.
    pub fn put(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(name.into(), Some(bytes));
    }

    /// Drop `name` from the container. Missing entries are ignored.
    pub fn remove(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), None);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An open archive file.
pub struct ArchiveContainer {
    path: PathBuf,
    zip: ZipArchive<File>,
}

impl std::fmt::Debug for ArchiveContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveContainer")
            .field("path", &self.path)
            .field("entries", &self.zip.len())
            .finish()
    }
}

impl ArchiveContainer {
    /// Create a new container at `path` holding `initial`.
    ///
    /// Creates missing parent directories. Fails if `path` already exists.
    pub fn create(path: &Path, initial: &ContainerUpdate) -> AegisResult<Self> {
        if path.exists() {
            return Err(AegisError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_atomically(path, None, initial)?;
        Self::open(path)
    }

    pub fn open(path: &Path) -> AegisResult<Self> {
        let file = File::open(path)?;
        let zip = ZipArchive::new(file).map_err(zip_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.zip.index_for_name(name).is_some()
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }

    /// Read a whole entry, or `None` if it does not exist.
    pub fn read_entry(&mut self, name: &str) -> AegisResult<Option<Vec<u8>>> {
        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(zip_error(e)),
        };
        let mut bytes = Vec::with_capacity(preallocation(entry.size()));
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    /// Apply `update` atomically and reopen the result.
    pub fn commit(&mut self, update: &ContainerUpdate) -> AegisResult<()> {
        write_atomically(&self.path, Some(&mut self.zip), update)?;
        let reopened = Self::open(&self.path)?;
        self.zip = reopened.zip;
        tracing::debug!(
            path = %self.path.display(),
            changed = update.entries.len(),
            entries = self.zip.len(),
            "container committed"
        );
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomically(
    path: &Path,
    source: Option<&mut ZipArchive<File>>,
    update: &ContainerUpdate,
) -> AegisResult<()> {
    let tmp_path = temp_path_for(path);
    let written = write_container(&tmp_path, source, update).and_then(|()| {
        fs::rename(&tmp_path, path)?;
        Ok(())
    });
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

fn write_container(
    tmp_path: &Path,
    source: Option<&mut ZipArchive<File>>,
    update: &ContainerUpdate,
) -> AegisResult<()> {
    let mut writer = ZipWriter::new(File::create(tmp_path)?);

    if let Some(source) = source {
        for i in 0..source.len() {
            let entry = source.by_index_raw(i).map_err(zip_error)?;
            if update.entries.contains_key(entry.name()) {
                continue;
            }
            writer.raw_copy_file(entry).map_err(zip_error)?;
        }
    }

    for (name, bytes) in &update.entries {
        let Some(bytes) = bytes else { continue };
        // content is ciphertext, compressing it gains nothing
        let method = if name == METADATA_ENTRY_NAME {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .large_file(bytes.len() as u64 >= u32::MAX as u64);
        writer.start_file(name.as_str(), options).map_err(zip_error)?;
        writer.write_all(bytes)?;
    }

    let file = writer.finish().map_err(zip_error)?;
    file.sync_all()?;
    Ok(())
}
