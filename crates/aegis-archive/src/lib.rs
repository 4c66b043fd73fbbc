//! aegis-archive: the encrypted archive engine
//!
//! An archive is a single zip file:
//! - `.meta` holds [`SecureArchiveMetadata`] as JSON: the salt, security
//!   settings, one wrapped copy of the archive key per authorized secret,
//!   the canary, and the encrypted file index
//! - every other entry is one file's content, named by its FileId and
//!   encrypted under the archive key
//!
//! [`Archive`] is the entry point. Paths inside an archive are virtual and
//! case-insensitive; see [`path`].

pub mod archive;
pub mod authorization;
pub mod container;
pub mod content;
pub mod index;
pub mod metadata;
pub mod path;
pub mod tree;

pub use archive::{Archive, ArchiveCreationParams, FileTreeVisitor};
pub use authorization::UserKeyAuthorization;
pub use index::{AegisFileInfo, DirectoryVisit, FileIndex, FileIndexEntry};
pub use metadata::SecureArchiveMetadata;
pub use path::{PathComponent, VirtualDirectoryPath, VirtualFilePath};
pub use tree::{VirtualFileTree, VisitPhase};
