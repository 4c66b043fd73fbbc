//! Virtual directory tree
//!
//! Directories exist only while they contain something: inserting a file
//! creates its ancestors, removing the last file beneath a directory prunes
//! it. The root is never pruned.
//!
//! Traversal is an iterator driven by an explicit stack, so deep trees
//! cannot overflow the call stack. Each directory is reported twice, once
//! before its subdirectories (pre-order) and once after (post-order), with
//! children visited in ascending case-insensitive order.

use std::collections::BTreeMap;

use aegis_core::{AegisError, AegisResult};

use crate::path::{PathComponent, VirtualDirectoryPath, VirtualFilePath};

/// One directory: sorted child directories and sorted files.
#[derive(Debug, Clone)]
pub struct DirectoryNode<V> {
    directories: BTreeMap<PathComponent, DirectoryNode<V>>,
    files: BTreeMap<PathComponent, V>,
}

impl<V> Default for DirectoryNode<V> {
    fn default() -> Self {
        Self {
            directories: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }
}

impl<V> DirectoryNode<V> {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = (&PathComponent, &V)> {
        self.files.iter()
    }

    pub fn directories(&self) -> impl Iterator<Item = (&PathComponent, &DirectoryNode<V>)> {
        self.directories.iter()
    }

    fn remove_file(
        &mut self,
        components: &[PathComponent],
        file_name: &PathComponent,
    ) -> Option<V> {
        let Some((head, rest)) = components.split_first() else {
            return self.files.remove(file_name);
        };
        let child = self.directories.get_mut(head)?;
        let removed = child.remove_file(rest, file_name);
        if removed.is_some() && child.is_empty() {
            self.directories.remove(head);
        }
        removed
    }
}

/// A tree of files keyed by case-insensitive virtual path.
#[derive(Debug, Clone)]
pub struct VirtualFileTree<V> {
    root: DirectoryNode<V>,
    len: usize,
}

impl<V> Default for VirtualFileTree<V> {
    fn default() -> Self {
        Self {
            root: DirectoryNode::default(),
            len: 0,
        }
    }
}

impl<V> VirtualFileTree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> &DirectoryNode<V> {
        &self.root
    }

    /// Insert a file, creating missing directories.
    ///
    /// Fails if a file already exists at `path`.
    pub fn insert(&mut self, path: &VirtualFilePath, value: V) -> AegisResult<()> {
        if self.get(path).is_some() {
            return Err(AegisError::internal(format!("{path} is already in the tree")));
        }
        let mut node = &mut self.root;
        for component in path.directory().components() {
            node = node.directories.entry(component.clone()).or_default();
        }
        node.files.insert(path.file_name().clone(), value);
        self.len += 1;
        Ok(())
    }

    pub fn get(&self, path: &VirtualFilePath) -> Option<&V> {
        self.directory(path.directory())?.files.get(path.file_name())
    }

    /// Look up a directory node.
    pub fn directory(&self, path: &VirtualDirectoryPath) -> Option<&DirectoryNode<V>> {
        path.components()
            .iter()
            .try_fold(&self.root, |node, component| node.directories.get(component))
    }

    /// Remove a file and prune any directories left empty.
    pub fn remove(&mut self, path: &VirtualFilePath) -> Option<V> {
        let removed = self
            .root
            .remove_file(path.directory().components(), path.file_name());
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Depth-first walk from the root. Call again to restart.
    pub fn traverse(&self) -> Traversal<'_, V> {
        Traversal {
            stack: vec![Frame::Enter(VirtualDirectoryPath::root(), &self.root)],
        }
    }
}

/// Which side of a directory's subtree an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitPhase {
    PreOrder,
    PostOrder,
}

/// One directory visit produced by [`Traversal`].
#[derive(Debug)]
pub struct TraversalEvent<'a, V> {
    pub phase: VisitPhase,
    pub directory: VirtualDirectoryPath,
    /// Files directly in `directory`, ascending.
    pub files: Vec<(&'a PathComponent, &'a V)>,
}

enum Frame<'a, V> {
    Enter(VirtualDirectoryPath, &'a DirectoryNode<V>),
    Exit(VirtualDirectoryPath, &'a DirectoryNode<V>),
}

/// Iterative depth-first traversal over a [`VirtualFileTree`].
pub struct Traversal<'a, V> {
    stack: Vec<Frame<'a, V>>,
}

impl<'a, V> Iterator for Traversal<'a, V> {
    type Item = TraversalEvent<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let (phase, directory, node) = match self.stack.pop()? {
            Frame::Enter(directory, node) => {
                self.stack.push(Frame::Exit(directory.clone(), node));
                // reversed so the smallest child is popped first
                for (name, child) in node.directories.iter().rev() {
                    self.stack
                        .push(Frame::Enter(directory.join(name.clone()), child));
                }
                (VisitPhase::PreOrder, directory, node)
            }
            Frame::Exit(directory, node) => (VisitPhase::PostOrder, directory, node),
        };
        Some(TraversalEvent {
            phase,
            directory,
            files: node.files.iter().collect(),
        })
    }
}
