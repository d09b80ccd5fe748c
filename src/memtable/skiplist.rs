use std::mem;

use rand::Rng;

/// Maximum height of the skip list. LevelDB uses 12.
pub const MAX_HEIGHT: usize = 12;

/// A single node in the skip list.
///
/// Each node has `forward.len()` forward pointers. Level 0 contains all
/// nodes (a regular linked list). Higher levels skip over nodes, enabling
/// O(log n) average-case search.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
///
/// Nodes live in an arena (`SkipList::nodes`) and point at each other by
/// index, so no `unsafe` is needed. Nodes are never removed individually;
/// the whole arena is dropped by `clear()` after a flush.
struct SkipNode<V> {
    key: Vec<u8>,
    value: V,
    forward: Vec<Option<usize>>,
}

/// A probabilistic sorted map from byte keys to `V`.
///
/// Average case: O(log n) insert, O(log n) lookup, O(n) iteration.
pub struct SkipList<V> {
    nodes: Vec<SkipNode<V>>,
    /// Forward pointers of the head sentinel.
    head: [Option<usize>; MAX_HEIGHT],
    /// Current max level in use.
    height: usize,
}

impl<V> SkipList<V> {
    /// Create a new empty skip list.
    pub fn new() -> Self {
        SkipList {
            nodes: Vec::new(),
            head: [None; MAX_HEIGHT],
            height: 1,
        }
    }

    /// Follow the forward pointer of `node` (`None` = head) at `level`.
    fn next(&self, node: Option<usize>, level: usize) -> Option<usize> {
        match node {
            None => self.head[level],
            Some(i) => self.nodes[i].forward[level],
        }
    }

    fn set_next(&mut self, node: Option<usize>, level: usize, to: Option<usize>) {
        match node {
            None => self.head[level] = to,
            Some(i) => self.nodes[i].forward[level] = to,
        }
    }

    /// Walk down from the top level, recording at each level the last node
    /// whose key is < `key`. Returns the level-0 predecessor.
    fn find_predecessors(
        &self,
        key: &[u8],
        update: &mut [Option<usize>; MAX_HEIGHT],
    ) -> Option<usize> {
        let mut x = None;
        for level in (0..self.height).rev() {
            while let Some(n) = self.next(x, level) {
                if self.nodes[n].key.as_slice() < key {
                    x = Some(n);
                } else {
                    break;
                }
            }
            update[level] = x;
        }
        x
    }

    /// First node with key >= `key`.
    fn find_greater_or_equal(&self, key: &[u8]) -> Option<usize> {
        let mut update = [None; MAX_HEIGHT];
        let pred = self.find_predecessors(key, &mut update);
        self.next(pred, 0)
    }

    /// Insert a key-value pair. Overwrites if the key already exists and
    /// returns the previous value.
    pub fn insert(&mut self, key: Vec<u8>, value: V) -> Option<V> {
        let mut update = [None; MAX_HEIGHT];
        let pred = self.find_predecessors(&key, &mut update);

        if let Some(n) = self.next(pred, 0) {
            if self.nodes[n].key == key {
                return Some(mem::replace(&mut self.nodes[n].value, value));
            }
        }

        let height = random_height();
        if height > self.height {
            // Levels above the old height start from the head.
            for slot in update.iter_mut().take(height).skip(self.height) {
                *slot = None;
            }
            self.height = height;
        }

        let idx = self.nodes.len();
        let forward = (0..height).map(|level| self.next(update[level], level)).collect();
        self.nodes.push(SkipNode {
            key,
            value,
            forward,
        });
        for (level, pred) in update.iter().enumerate().take(height) {
            self.set_next(*pred, level, Some(idx));
        }
        None
    }

    /// Look up a key.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let n = self.find_greater_or_equal(key)?;
        let node = &self.nodes[n];
        (node.key.as_slice() == key).then_some(&node.value)
    }

    /// Number of entries in the skip list.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = [None; MAX_HEIGHT];
        self.height = 1;
    }

    /// Iterate over all entries in sorted order.
    pub fn iter(&self) -> SkipListIterator<'_, V> {
        SkipListIterator {
            list: self,
            current: self.head[0],
        }
    }

    /// Iterate in sorted order starting at the first key >= `key`.
    pub fn seek(&self, key: &[u8]) -> SkipListIterator<'_, V> {
        SkipListIterator {
            list: self,
            current: self.find_greater_or_equal(key),
        }
    }
}

impl<V> Default for SkipList<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Each extra level has a 1/4 probability (LevelDB uses 1/4, not 1/2).
fn random_height() -> usize {
    let mut rng = rand::thread_rng();
    let mut height = 1;
    while height < MAX_HEIGHT && rng.gen_ratio(1, 4) {
        height += 1;
    }
    height
}

/// Iterator over skip list entries in sorted order.
///
/// Simply follows level 0 forward pointers: level 0 is a sorted linked
/// list containing every entry.
pub struct SkipListIterator<'a, V> {
    list: &'a SkipList<V>,
    current: Option<usize>,
}

impl<'a, V> Iterator for SkipListIterator<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let node = &list.nodes[self.current?];
        self.current = node.forward[0];
        Some((node.key.as_slice(), &node.value))
    }
}
