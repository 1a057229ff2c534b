//! Directory tree derived from a [`DirectoryMapping`].
//!
//! The tree is a view, not storage: [`build_tree`] is a pure function of the
//! mapping, and rebuilding from the same mapping always yields an equal tree.
//! Children are keyed by their case-folded name, so structure and order do
//! not depend on registration order.  Each node shows the casing its segment
//! had in the earliest-registered directory that contains it.

use std::collections::BTreeMap;

use crate::index::DirectoryMapping;
use crate::path::{fold, DirectoryPath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTreeNode {
    name: String,
    path: String,
    children: BTreeMap<String, DirectoryTreeNode>,
}

impl DirectoryTreeNode {
    /// The synthetic, unnamed ancestor of all top-level directories.
    pub fn root() -> Self {
        Self { name: String::new(), path: String::new(), children: BTreeMap::new() }
    }

    fn child_of(parent: &str, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            path: format!("{parent}{name}/"),
            children: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory key of this node (`Characters/Heroes/`); empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Children sorted case-insensitively by name.
    pub fn children(&self) -> impl Iterator<Item = &DirectoryTreeNode> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&DirectoryTreeNode> {
        self.children.get(&*fold(name))
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Walk down from this node along `path`'s segments.
    pub fn find(&self, path: &str) -> Option<&DirectoryTreeNode> {
        DirectoryPath::new(path)
            .segments()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children.values().map(|c| 1 + c.descendant_count()).sum()
    }

    /// Depth-first, pre-order visit of every node below this one, children in
    /// sorted order.  `depth` is 0 for direct children.
    pub fn walk<F: FnMut(&DirectoryTreeNode, usize)>(&self, mut visit: F) {
        fn go<F: FnMut(&DirectoryTreeNode, usize)>(node: &DirectoryTreeNode, depth: usize, visit: &mut F) {
            for child in node.children.values() {
                visit(child, depth);
                go(child, depth + 1, visit);
            }
        }
        go(self, 0, &mut visit);
    }

    fn insert(&mut self, directory: &DirectoryPath) {
        let mut node = self;
        for segment in directory.segments() {
            let parent = node.path.clone();
            node = node.children
                .entry(fold(segment).into_owned())
                .or_insert_with(|| DirectoryTreeNode::child_of(&parent, segment));
        }
    }
}

impl Default for DirectoryTreeNode {
    fn default() -> Self {
        Self::root()
    }
}

/// Derive the directory tree for every key of `mapping`.
///
/// Intermediate directories that hold no entries of their own still get a
/// node.  An empty mapping yields a bare root.
pub fn build_tree(mapping: &DirectoryMapping) -> DirectoryTreeNode {
    let mut root = DirectoryTreeNode::root();
    for directory in mapping.registration_order() {
        root.insert(directory);
    }
    root
}
