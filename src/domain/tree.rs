//! Arena-based red-black tree.
//!
//! Nodes live in a generational arena and refer to each other by `Index`.
//! The arena is the only owner; `parent`, `left` and `right` are relations,
//! never ownership, so the parent back-reference does not form a cycle.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::domain::error::{TreeError, TreeResult};

/// Node color. Absent children are nil leaves and count as black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Tree node stored in the arena.
#[derive(Debug)]
pub struct RbNode<K, V> {
    key: K,
    value: V,
    color: Color,
    /// Index of parent node in the arena, None for the root
    parent: Option<Index>,
    left: Option<Index>,
    right: Option<Index>,
}

impl<K, V> RbNode<K, V> {
    fn new(key: K, value: V, parent: Option<Index>) -> Self {
        Self {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn parent(&self) -> Option<Index> {
        self.parent
    }

    pub fn left(&self) -> Option<Index> {
        self.left
    }

    pub fn right(&self) -> Option<Index> {
        self.right
    }
}

/// Ordered map with red-black balancing on insert.
///
/// Keys are unique and immutable once inserted; only values can be
/// changed in place through [`RbTree::lookup_mut`]. There is no removal.
#[derive(Debug)]
pub struct RbTree<K, V> {
    /// Arena storage for all tree nodes
    arena: Arena<RbNode<K, V>>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl<K, V> Default for RbTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RbTree<K, V> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn root_key(&self) -> Option<&K> {
        self.root.map(|idx| &self.arena[idx].key)
    }

    pub fn node(&self, idx: Index) -> Option<&RbNode<K, V>> {
        self.arena.get(idx)
    }

    /// Ascending traversal. Each call starts a fresh iterator.
    pub fn in_order(&self) -> InOrder<'_, K, V> {
        InOrder::new(self)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.in_order().map(|(k, _)| k)
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        self.subtree_height(self.root)
    }

    fn subtree_height(&self, idx: Option<Index>) -> usize {
        match idx {
            Some(i) => {
                let node = &self.arena[i];
                1 + self
                    .subtree_height(node.left)
                    .max(self.subtree_height(node.right))
            }
            None => 0,
        }
    }

    fn color_of(&self, idx: Option<Index>) -> Color {
        idx.map_or(Color::Black, |i| self.arena[i].color)
    }

    fn is_left_child(&self, idx: Index) -> bool {
        self.arena[idx]
            .parent
            .is_some_and(|p| self.arena[p].left == Some(idx))
    }

    /// Rotates `child` into the position of `parent`.
    ///
    /// A left child produces a right rotation, a right child a left rotation.
    /// The grandparent link (or the root), the moved inner subtree and both
    /// parent back-references are rewired together.
    fn rotate(&mut self, child: Index, parent: Index) -> TreeResult<()> {
        let child_is_left = self.arena[parent].left == Some(child);
        if !child_is_left && self.arena[parent].right != Some(child) {
            return Err(TreeError::InvalidRotation {
                child: format!("{child:?}"),
                parent: format!("{parent:?}"),
            });
        }
        let grandparent = self.arena[parent].parent;

        if child_is_left {
            let inner = self.arena[child].right;
            self.arena[parent].left = inner;
            if let Some(i) = inner {
                self.arena[i].parent = Some(parent);
            }
            self.arena[child].right = Some(parent);
        } else {
            let inner = self.arena[child].left;
            self.arena[parent].right = inner;
            if let Some(i) = inner {
                self.arena[i].parent = Some(parent);
            }
            self.arena[child].left = Some(parent);
        }
        self.arena[parent].parent = Some(child);
        self.arena[child].parent = grandparent;

        match grandparent {
            None => self.root = Some(child),
            Some(g) => {
                if self.arena[g].left == Some(parent) {
                    self.arena[g].left = Some(child);
                } else {
                    self.arena[g].right = Some(child);
                }
            }
        }
        Ok(())
    }

    /// Restores the red-black properties after `node` was attached red.
    fn fix_after_insert(&mut self, mut node: Index) -> TreeResult<()> {
        loop {
            let Some(parent) = self.arena[node].parent else {
                break;
            };
            if self.arena[parent].color == Color::Black {
                break;
            }
            // a red parent is never the root, so the grandparent exists
            let Some(grandparent) = self.arena[parent].parent else {
                break;
            };
            let parent_is_left = self.arena[grandparent].left == Some(parent);
            let uncle = if parent_is_left {
                self.arena[grandparent].right
            } else {
                self.arena[grandparent].left
            };

            if let (Color::Red, Some(u)) = (self.color_of(uncle), uncle) {
                trace!("fixup: red uncle, recolor and move up");
                self.arena[parent].color = Color::Black;
                self.arena[u].color = Color::Black;
                self.arena[grandparent].color = Color::Red;
                node = grandparent;
                continue;
            }

            // inner alignment: turn it into outer alignment first
            let mut pivot = parent;
            if self.is_left_child(node) != parent_is_left {
                trace!("fixup: inner case, rotate node with parent");
                self.rotate(node, parent)?;
                pivot = node;
            }
            trace!("fixup: outer case, rotate parent with grandparent");
            self.rotate(pivot, grandparent)?;
            self.arena[pivot].color = Color::Black;
            self.arena[grandparent].color = Color::Red;
            break;
        }
        Ok(())
    }
}

impl<K: Ord + fmt::Debug, V> RbTree<K, V> {
    /// Inserts a new key. Rejects keys already present and leaves the tree untouched.
    ///
    /// # Panics
    ///
    /// If rebalancing meets parent/child links that disagree. The tree is
    /// half-rotated at that point, so it is not handed back as an error.
    #[instrument(level = "trace", skip(self, value))]
    pub fn insert(&mut self, key: K, value: V) -> TreeResult<()> {
        let mut parent = None;
        let mut attach_left = false;
        let mut cursor = self.root;
        while let Some(idx) = cursor {
            let node = &self.arena[idx];
            parent = Some(idx);
            match key.cmp(&node.key) {
                Ordering::Less => {
                    attach_left = true;
                    cursor = node.left;
                }
                Ordering::Greater => {
                    attach_left = false;
                    cursor = node.right;
                }
                Ordering::Equal => {
                    debug!("insert rejected, key present: {:?}", key);
                    return Err(TreeError::DuplicateKey(format!("{key:?}")));
                }
            }
        }

        let idx = self.arena.insert(RbNode::new(key, value, parent));
        match parent {
            None => self.root = Some(idx),
            Some(p) if attach_left => self.arena[p].left = Some(idx),
            Some(p) => self.arena[p].right = Some(idx),
        }

        if let Err(e) = self.fix_after_insert(idx) {
            panic!("red-black tree links are inconsistent, cannot rebalance: {e}");
        }
        if let Some(root) = self.root {
            self.arena[root].color = Color::Black;
        }
        Ok(())
    }

    fn find<Q>(&self, key: &Q) -> Option<Index>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root;
        while let Some(idx) = cursor {
            let node = &self.arena[idx];
            cursor = match key.cmp(node.key.borrow()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(idx),
            };
        }
        None
    }

    pub fn lookup<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|idx| &self.arena[idx].value)
    }

    /// Mutable access to the value only; the key stays fixed so ordering holds.
    pub fn lookup_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.find(key)?;
        self.arena.get_mut(idx).map(|node| &mut node.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Arena index of the node holding `key`. Stable for the node's lifetime.
    pub fn node_id<Q>(&self, key: &Q) -> Option<Index>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key)
    }

    /// Black nodes below the root on every root-to-nil path, after verifying
    /// root color, the red rule, parent links and strict key ordering.
    #[instrument(level = "debug", skip(self))]
    pub fn check_invariants(&self) -> TreeResult<usize> {
        let Some(root) = self.root else {
            return Ok(0);
        };
        if self.arena[root].color != Color::Black {
            return Err(TreeError::InvariantViolation("root is red".into()));
        }
        if self.arena[root].parent.is_some() {
            return Err(TreeError::InvariantViolation("root has a parent".into()));
        }
        if let Some((a, b)) = self.keys().tuple_windows().find(|(a, b)| a >= b) {
            return Err(TreeError::InvariantViolation(format!(
                "keys out of order: {a:?} before {b:?}"
            )));
        }
        Ok(self.validate_subtree(root)? - 1)
    }

    /// Black count from `idx` down to a nil leaf, including `idx` itself.
    fn validate_subtree(&self, idx: Index) -> TreeResult<usize> {
        let node = &self.arena[idx];
        let mut heights = [0usize; 2];
        for (slot, child) in [node.left, node.right].into_iter().enumerate() {
            let Some(c) = child else {
                continue;
            };
            let child_node = &self.arena[c];
            if child_node.parent != Some(idx) {
                return Err(TreeError::InvariantViolation(format!(
                    "broken parent link under {:?}",
                    node.key
                )));
            }
            if node.color == Color::Red && child_node.color == Color::Red {
                return Err(TreeError::InvariantViolation(format!(
                    "red node {:?} has red child {:?}",
                    node.key, child_node.key
                )));
            }
            heights[slot] = self.validate_subtree(c)?;
        }
        if heights[0] != heights[1] {
            return Err(TreeError::InvariantViolation(format!(
                "unequal black height at {:?}: {} vs {}",
                node.key, heights[0], heights[1]
            )));
        }
        Ok(heights[0] + usize::from(node.color == Color::Black))
    }

    pub fn black_height(&self) -> TreeResult<usize> {
        self.check_invariants()
    }
}

/// Lazy in-order iterator driven by an explicit stack.
pub struct InOrder<'a, K, V> {
    tree: &'a RbTree<K, V>,
    stack: Vec<Index>,
    cursor: Option<Index>,
}

impl<'a, K, V> InOrder<'a, K, V> {
    fn new(tree: &'a RbTree<K, V>) -> Self {
        Self {
            tree,
            stack: Vec::new(),
            cursor: tree.root,
        }
    }
}

impl<'a, K, V> Iterator for InOrder<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some(idx) = self.cursor {
            self.stack.push(idx);
            self.cursor = tree.arena[idx].left;
        }
        let idx = self.stack.pop()?;
        let node = &tree.arena[idx];
        self.cursor = node.right;
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> IntoIterator for &'a RbTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = InOrder<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.in_order()
    }
}
