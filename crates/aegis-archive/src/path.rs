//! Virtual paths inside an archive
//!
//! Paths are split into components on `/` or `\`, and compare, order and hash
//! case-insensitively. Ordering is component-wise over the directory first,
//! so a directory sorts before everything beneath it, then by file name.
//! Display form always uses `/` and a leading slash.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use aegis_core::{AegisError, AegisResult};

const SEPARATORS: [char; 2] = ['/', '\\'];

/// One path component, compared by its case-folded form.
#[derive(Debug, Clone)]
pub struct PathComponent {
    name: String,
    folded: String,
}

impl PathComponent {
    pub fn new(name: &str) -> AegisResult<Self> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(AegisError::invalid_argument(format!(
                "invalid path component '{name}'"
            )));
        }
        if name.chars().any(|c| c.is_control() || SEPARATORS.contains(&c)) {
            return Err(AegisError::invalid_argument(format!(
                "path component contains a separator or control character: {name:?}"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            folded: name.to_lowercase(),
        })
    }

    /// The component as originally written.
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl PartialEq for PathComponent {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for PathComponent {}

impl PartialOrd for PathComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathComponent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded.cmp(&other.folded)
    }
}

impl Hash for PathComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl std::fmt::Display for PathComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

fn split_components(path: &str) -> AegisResult<Vec<PathComponent>> {
    path.split(SEPARATORS)
        .filter(|part| !part.is_empty())
        .map(PathComponent::new)
        .collect()
}

/// A directory inside the archive. The empty component list is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualDirectoryPath {
    components: Vec<PathComponent>,
}

impl VirtualDirectoryPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> AegisResult<Self> {
        Ok(Self {
            components: split_components(path)?,
        })
    }

    pub fn from_components(components: Vec<PathComponent>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Last component, or `None` for the root.
    pub fn name(&self) -> Option<&PathComponent> {
        self.components.last()
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    pub fn join(&self, child: PathComponent) -> Self {
        let mut components = self.components.clone();
        components.push(child);
        Self { components }
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &VirtualDirectoryPath) -> bool {
        other.components.starts_with(&self.components)
    }
}

impl std::fmt::Display for VirtualDirectoryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for VirtualDirectoryPath {
    type Err = AegisError;

    fn from_str(s: &str) -> AegisResult<Self> {
        Self::parse(s)
    }
}

/// A file inside the archive: its directory plus a file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualFilePath {
    directory: VirtualDirectoryPath,
    file_name: PathComponent,
}

impl VirtualFilePath {
    pub fn parse(path: &str) -> AegisResult<Self> {
        let mut components = split_components(path)?;
        let file_name = components
            .pop()
            .ok_or_else(|| AegisError::invalid_argument(format!("'{path}' has no file name")))?;
        Ok(Self {
            directory: VirtualDirectoryPath::from_components(components),
            file_name,
        })
    }

    pub fn new(directory: VirtualDirectoryPath, file_name: PathComponent) -> Self {
        Self {
            directory,
            file_name,
        }
    }

    pub fn directory(&self) -> &VirtualDirectoryPath {
        &self.directory
    }

    pub fn file_name(&self) -> &PathComponent {
        &self.file_name
    }
}

impl std::fmt::Display for VirtualFilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.directory.is_root() {
            write!(f, "/{}", self.file_name)
        } else {
            write!(f, "{}/{}", self.directory, self.file_name)
        }
    }
}

impl std::str::FromStr for VirtualFilePath {
    type Err = AegisError;

    fn from_str(s: &str) -> AegisResult<Self> {
        Self::parse(s)
    }
}


#[cfg(test)]
mod proptest_suite {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn case_folding_preserves_identity(
            parts in prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..5),
        ) {
            let original = parts.join("/");
            let upper = VirtualFilePath::parse(&original.to_uppercase()).unwrap();
            let lower = VirtualFilePath::parse(&original.to_lowercase()).unwrap();
            prop_assert_eq!(upper, lower);
        }

        #[test]
        fn display_reparses_to_same_path(
            parts in prop::collection::vec("[a-zA-Z0-9 ._-]{1,8}", 1..5),
        ) {
            prop_assume!(parts.iter().all(|p| !p.trim().is_empty() && p != "." && p != ".."));
            let path = VirtualFilePath::parse(&parts.join("/")).unwrap();
            let reparsed = VirtualFilePath::parse(&path.to_string()).unwrap();
            prop_assert_eq!(reparsed.to_string(), path.to_string());
        }
    }
}
