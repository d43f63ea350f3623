//! Eviction List Module
//!
//! Recency order for LRU eviction, kept as a doubly-linked list whose nodes
//! live in an arena and link to each other by index.

use std::borrow::Borrow;

// == Node ==
/// Slot 0 is the sentinel head: it has no key, is never removed, and its
/// `prev` is the tail. The list is circular through it.
#[derive(Debug, Clone)]
struct Node<K> {
    key: Option<K>,
    prev: usize,
    next: usize,
}

const HEAD: usize = 0;

/// Index of a live node, as returned by `EvictionList::find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

// == Eviction List ==
/// Keys ordered from least recently used (front) to most recently used
/// (tail).
///
/// - `append` adds at the tail
/// - `remove_first` evicts the node right after the sentinel
/// - a recency update is `remove` followed by `append`
#[derive(Debug, Clone)]
pub struct EvictionList<K> {
    nodes: Vec<Node<K>>,
    /// Vacated slots, reused by `append`
    free: Vec<usize>,
    len: usize,
}

impl<K: PartialEq> Default for EvictionList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq> EvictionList<K> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                key: None,
                prev: HEAD,
                next: HEAD,
            }],
            free: Vec::new(),
            len: 0,
        }
    }

    // == Append ==
    /// Inserts `key` at the most-recently-used end.
    ///
    /// Does not check for an existing node; callers move a key with
    /// `remove` + `append`.
    pub fn append(&mut self, key: K) {
        let tail = self.nodes[HEAD].prev;
        let node = Node {
            key: Some(key),
            prev: tail,
            next: HEAD,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        self.nodes[tail].next = index;
        self.nodes[HEAD].prev = index;
        self.len += 1;
    }

    // == Find ==
    /// Linear scan from the sentinel head.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        let mut cursor = self.nodes[HEAD].next;
        while cursor != HEAD {
            let node = &self.nodes[cursor];
            if let Some(candidate) = node.key.as_ref() {
                if <K as Borrow<Q>>::borrow(candidate) == key {
                    return Some(NodeId(cursor));
                }
            }
            cursor = node.next;
        }
        None
    }

    // == Remove ==
    /// Unlinks the node holding `key` and returns the key.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        let NodeId(index) = self.find(key)?;
        self.unlink(index)
    }

    // == Remove First ==
    /// Evicts the least recently used key.
    pub fn remove_first(&mut self) -> Option<K> {
        let first = self.nodes[HEAD].next;
        if first == HEAD {
            return None;
        }
        self.unlink(first)
    }

    // == Peek First ==
    /// The key `remove_first` would evict.
    pub fn first(&self) -> Option<&K> {
        self.nodes[self.nodes[HEAD].next].key.as_ref()
    }

    /// Key held by a node returned from `find`.
    pub fn key(&self, id: NodeId) -> Option<&K> {
        self.nodes.get(id.0).and_then(|node| node.key.as_ref())
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Keys ==
    /// Iterates keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        let mut cursor = self.nodes[HEAD].next;
        std::iter::from_fn(move || {
            if cursor == HEAD {
                return None;
            }
            let node = &self.nodes[cursor];
            cursor = node.next;
            node.key.as_ref()
        })
    }

    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[HEAD].prev = HEAD;
        self.nodes[HEAD].next = HEAD;
        self.free.clear();
        self.len = 0;
    }

    fn unlink(&mut self, index: usize) -> Option<K> {
        let (prev, next) = (self.nodes[index].prev, self.nodes[index].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        let key = self.nodes[index].key.take();
        self.free.push(index);
        self.len -= 1;
        key
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(keys: &[&str]) -> EvictionList<String> {
        let mut list = EvictionList::new();
        for key in keys {
            list.append(key.to_string());
        }
        list
    }

    fn order(list: &EvictionList<String>) -> Vec<&str> {
        list.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_list_new() {
        let list: EvictionList<String> = EvictionList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.first(), None);
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let list = list_of(&["key1", "key2", "key3"]);

        assert_eq!(list.len(), 3);
        assert_eq!(list.first(), Some(&"key1".to_string()));
        assert_eq!(order(&list), vec!["key1", "key2", "key3"]);
    }

    #[test]
    fn test_find() {
        let list = list_of(&["a", "b"]);

        let id = list.find("b").unwrap();
        assert_eq!(list.key(id), Some(&"b".to_string()));
        assert!(list.find("missing").is_none());
    }

    #[test]
    fn test_remove_first_evicts_oldest() {
        let mut list = list_of(&["key1", "key2", "key3"]);

        assert_eq!(list.remove_first(), Some("key1".to_string()));
        assert_eq!(list.len(), 2);
        assert_eq!(list.remove_first(), Some("key2".to_string()));
        assert_eq!(list.remove_first(), Some("key3".to_string()));
        assert_eq!(list.remove_first(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_relinks_neighbours() {
        let mut list = list_of(&["key1", "key2", "key3"]);

        assert_eq!(list.remove("key2"), Some("key2".to_string()));
        assert_eq!(list.len(), 2);
        assert_eq!(order(&list), vec!["key1", "key3"]);

        // Removing the tail and then appending must link after the new tail
        assert_eq!(list.remove("key3"), Some("key3".to_string()));
        list.append("key4".to_string());
        assert_eq!(order(&list), vec!["key1", "key4"]);
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut list = list_of(&["key1", "key2"]);

        assert_eq!(list.remove("nonexistent"), None);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_move_to_tail() {
        let mut list = list_of(&["a", "b", "c"]);

        // Touch 'a': remove then append
        let key = list.remove("a").unwrap();
        list.append(key);

        assert_eq!(order(&list), vec!["b", "c", "a"]);
        assert_eq!(list.remove_first(), Some("b".to_string()));
    }

    #[test]
    fn test_single_element_round_trip() {
        let mut list = list_of(&["only"]);

        assert_eq!(list.remove("only"), Some("only".to_string()));
        assert!(list.is_empty());
        assert_eq!(list.keys().count(), 0);

        list.append("again".to_string());
        assert_eq!(order(&list), vec!["again"]);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = list_of(&["a", "b", "c"]);
        list.remove_first();
        list.remove_first();
        list.append("d".to_string());
        list.append("e".to_string());

        // sentinel + three slots ever allocated
        assert_eq!(list.nodes.len(), 4);
        assert_eq!(order(&list), vec!["c", "d", "e"]);
    }

    #[test]
    fn test_clear() {
        let mut list = list_of(&["a", "b"]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
        list.append("c".to_string());
        assert_eq!(order(&list), vec!["c"]);
    }
}
