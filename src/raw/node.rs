use core::borrow::Borrow;
use core::mem;

use smallvec::SmallVec;

use super::handle::Handle;

pub(crate) const ORDER: usize = 4;
pub(crate) const MAX_KEYS: usize = ORDER - 1;
pub(crate) const MAX_CHILDREN: usize = ORDER;
pub(crate) const MIN_KEYS: usize = 1;

/// A 2-3-4 tree node.
///
/// Unlike a B+tree there is no leaf/internal distinction in the record itself:
/// every node carries keys, and a leaf is simply a node with no children. An
/// internal node always holds exactly `key_count() + 1` children, so `keys` and
/// `children` never spill past their inline capacity.
#[derive(Clone)]
pub(crate) struct Node<K> {
    parent: Option<Handle>,
    keys: SmallVec<[K; MAX_KEYS]>,
    children: SmallVec<[Handle; MAX_CHILDREN]>,
}

/// Result of searching for a key in a node.
///
/// For a miss in an internal node, the index doubles as the child to descend
/// into: it is the slot of the first key not less than the target.
pub(crate) enum SearchResult {
    /// Key was found at the given index.
    Found(usize),
    /// Key was not found; index is where it would be inserted.
    NotFound(usize),
}

impl<K> Node<K> {
    /// Creates a new empty leaf node.
    pub(crate) fn new_leaf() -> Self {
        Self {
            parent: None,
            keys: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    /// Returns the parent back-reference, `None` for the root.
    pub(crate) fn parent(&self) -> Option<Handle> {
        self.parent
    }

    /// Sets the parent back-reference.
    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        self.parent = parent;
    }

    /// Returns true if this node has no children.
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true if this node holds the maximum number of keys.
    pub(crate) fn is_full(&self) -> bool {
        self.keys.len() == MAX_KEYS
    }

    /// Returns true if this node can lend a key to a sibling.
    pub(crate) fn can_lend(&self) -> bool {
        self.keys.len() > MIN_KEYS
    }

    /// Returns the number of keys in this node.
    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Returns the number of children in this node.
    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the key at the given index.
    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// Returns all keys.
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Replaces the key at the given index, returning the old key.
    pub(crate) fn replace_key(&mut self, index: usize, key: K) -> K {
        mem::replace(&mut self.keys[index], key)
    }

    /// Returns the child handle at the given index.
    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    /// Returns all children.
    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    /// Searches for a key within this node.
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.keys.binary_search_by(|k| k.borrow().cmp(key)) {
            Ok(idx) => SearchResult::Found(idx),
            Err(idx) => SearchResult::NotFound(idx),
        }
    }

    /// Inserts a key at the given position.
    pub(crate) fn insert_key(&mut self, index: usize, key: K) {
        debug_assert!(!self.is_full(), "`Node::insert_key()` - node is full!");
        self.keys.insert(index, key);
    }

    /// Removes and returns the key at the given position.
    pub(crate) fn remove_key(&mut self, index: usize) -> K {
        self.keys.remove(index)
    }

    /// Pushes a key to the end.
    pub(crate) fn push_key(&mut self, key: K) {
        self.keys.push(key);
    }

    /// Pushes a key to the front.
    pub(crate) fn push_key_front(&mut self, key: K) {
        self.keys.insert(0, key);
    }

    /// Pops the last key.
    pub(crate) fn pop_key(&mut self) -> K {
        self.keys.pop().expect("`Node::pop_key()` - node has no keys!")
    }

    /// Pushes a child handle to the end.
    pub(crate) fn push_child(&mut self, child: Handle) {
        self.children.push(child);
    }

    /// Pushes a child handle to the front.
    pub(crate) fn push_child_front(&mut self, child: Handle) {
        self.children.insert(0, child);
    }

    /// Pops the last child handle.
    pub(crate) fn pop_child(&mut self) -> Handle {
        self.children.pop().expect("`Node::pop_child()` - node has no children!")
    }

    /// Removes and returns the first child handle.
    pub(crate) fn pop_child_front(&mut self) -> Handle {
        self.children.remove(0)
    }

    /// Inserts a separator key and the child to its right, as produced by a
    /// child split.
    pub(crate) fn insert_separator(&mut self, index: usize, key: K, right: Handle) {
        self.keys.insert(index, key);
        self.children.insert(index + 1, right);
    }

    /// Removes a separator key and the child to its right, as consumed by a
    /// child merge. Returns both.
    pub(crate) fn remove_separator(&mut self, index: usize) -> (K, Handle) {
        let key = self.keys.remove(index);
        let right = self.children.remove(index + 1);
        (key, right)
    }

    /// Splits this full node into (median key, right half), keeping the left
    /// half in place. The right half inherits this node's parent reference;
    /// the caller reparents it (and, for internal nodes, its children) once
    /// the new handle is known.
    pub(crate) fn split_off(&mut self) -> (K, Node<K>) {
        assert!(self.is_full(), "`Node::split_off()` - node is not full!");

        let right_keys: SmallVec<[K; MAX_KEYS]> = self.keys.drain(MAX_KEYS - 1..).collect();
        let median = self.keys.pop().unwrap();
        let right_children: SmallVec<[Handle; MAX_CHILDREN]> = if self.is_leaf() {
            SmallVec::new()
        } else {
            self.children.drain(MAX_CHILDREN / 2..).collect()
        };

        let right = Node {
            parent: self.parent,
            keys: right_keys,
            children: right_children,
        };
        (median, right)
    }

    /// Absorbs the separator key from the parent and the entire right sibling,
    /// as the left half of a merge. The caller reparents the absorbed children.
    pub(crate) fn absorb(&mut self, separator: K, mut right: Node<K>) {
        self.keys.push(separator);
        self.keys.append(&mut right.keys);
        self.children.append(&mut right.children);
    }
}
