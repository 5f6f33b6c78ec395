//! Node representations for the long-keyed adaptive radix tree (§3, §4.6).
//!
//! Keys are 8-byte (`u64`) values, so the tree has a fixed depth of 8
//! levels (one byte per level, 256-way branching per level). Node capacity
//! grows 4 → 16 → 48 → 256 as children accumulate, and shrinks back down on
//! erase once utilization drops under the conventional thresholds named in
//! spec §3 (≤3, ≤12, ≤37).

/// Promote a capacity-4 node once it holds more than this many children.
pub const NODE4_MAX: usize = 4;
/// Promote a capacity-16 node once it holds more than this many children.
pub const NODE16_MAX: usize = 16;
/// Promote a capacity-48 node once it holds more than this many children.
pub const NODE48_MAX: usize = 48;

/// Demote a capacity-16 node back to capacity-4 once its count drops to or
/// below this.
pub const NODE16_MIN: usize = 3;
/// Demote a capacity-48 node back to capacity-16 once its count drops to or
/// below this.
pub const NODE48_MIN: usize = 12;
/// Demote a capacity-256 node back to capacity-48 once its count drops to or
/// below this.
pub const NODE256_MIN: usize = 37;

/// One level's worth of a radix key: 8 bytes, most-significant first, so
/// lexicographic byte order matches numeric order.
#[must_use]
pub fn key_bytes(key: u64) -> [u8; 8] {
    key.to_be_bytes()
}

/// An inner or leaf node of the tree. Inner nodes index by the byte at
/// their depth; leaves store the final value directly once the full 8-byte
/// key has been consumed.
pub enum Node<V> {
    /// Up to 4 children, linearly scanned (cheap at this size).
    Node4(Node4<V>),
    /// Up to 16 children, linearly scanned with SIMD-friendly layout in a
    /// real implementation; scanned here with a plain loop.
    Node16(Node16<V>),
    /// Up to 48 children, indexed via a 256-entry byte→slot map.
    Node48(Box<Node48<V>>),
    /// Full 256-entry direct index.
    Node256(Box<Node256<V>>),
    /// Terminal value for a fully-consumed 8-byte key.
    Leaf(V),
}

/// Capacity-4 node: parallel arrays of keys and children.
pub struct Node4<V> {
    /// Number of populated slots (`<= NODE4_MAX`).
    pub len: u8,
    /// Branch byte per slot.
    pub keys: [u8; NODE4_MAX],
    /// Child per slot, aligned with `keys`.
    pub children: [Option<Box<Node<V>>>; NODE4_MAX],
}

impl<V> Node4<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            len: 0,
            keys: [0; NODE4_MAX],
            children: [None, None, None, None],
        }
    }

    pub fn find(&self, byte: u8) -> Option<&Node<V>> {
        (0..self.len as usize)
            .find(|&i| self.keys[i] == byte)
            .and_then(|i| self.children[i].as_deref())
    }

    pub fn find_mut(&mut self, byte: u8) -> Option<&mut Box<Node<V>>> {
        let idx = (0..self.len as usize).find(|&i| self.keys[i] == byte)?;
        self.children[idx].as_mut()
    }

    pub fn insert(&mut self, byte: u8, child: Box<Node<V>>) -> bool {
        if (self.len as usize) >= NODE4_MAX {
            return false;
        }
        let i = self.len as usize;
        self.keys[i] = byte;
        self.children[i] = Some(child);
        self.len += 1;
        true
    }

    pub fn remove(&mut self, byte: u8) -> Option<Box<Node<V>>> {
        let idx = (0..self.len as usize).find(|&i| self.keys[i] == byte)?;
        let removed = self.children[idx].take();
        let last = self.len as usize - 1;
        if idx != last {
            self.keys[idx] = self.keys[last];
            self.children.swap(idx, last);
        }
        self.len -= 1;
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Node<V>)> {
        let mut pairs: Vec<(u8, &Node<V>)> = (0..self.len as usize)
            .map(|i| (self.keys[i], self.children[i].as_deref().unwrap()))
            .collect();
        pairs.sort_by_key(|(b, _)| *b);
        pairs.into_iter()
    }
}

impl<V> Default for Node4<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capacity-16 node, same layout strategy as [`Node4`] at a larger size.
pub struct Node16<V> {
    pub len: u8,
    pub keys: [u8; NODE16_MAX],
    pub children: Vec<Option<Box<Node<V>>>>,
}

impl<V> Node16<V> {
    #[must_use]
    pub fn new() -> Self {
        let mut children = Vec::with_capacity(NODE16_MAX);
        children.resize_with(NODE16_MAX, || None);
        Self {
            len: 0,
            keys: [0; NODE16_MAX],
            children,
        }
    }

    pub fn from_node4(mut old: Node4<V>) -> Self {
        let mut n = Self::new();
        for i in 0..old.len as usize {
            n.keys[i] = old.keys[i];
            n.children[i] = old.children[i].take();
        }
        n.len = old.len;
        n
    }

    pub fn find(&self, byte: u8) -> Option<&Node<V>> {
        (0..self.len as usize)
            .find(|&i| self.keys[i] == byte)
            .and_then(|i| self.children[i].as_deref())
    }

    pub fn find_mut(&mut self, byte: u8) -> Option<&mut Box<Node<V>>> {
        let idx = (0..self.len as usize).find(|&i| self.keys[i] == byte)?;
        self.children[idx].as_mut()
    }

    pub fn insert(&mut self, byte: u8, child: Box<Node<V>>) -> bool {
        if (self.len as usize) >= NODE16_MAX {
            return false;
        }
        let i = self.len as usize;
        self.keys[i] = byte;
        self.children[i] = Some(child);
        self.len += 1;
        true
    }

    pub fn remove(&mut self, byte: u8) -> Option<Box<Node<V>>> {
        let idx = (0..self.len as usize).find(|&i| self.keys[i] == byte)?;
        let removed = self.children[idx].take();
        let last = self.len as usize - 1;
        if idx != last {
            self.keys[idx] = self.keys[last];
            self.children.swap(idx, last);
        }
        self.len -= 1;
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Node<V>)> {
        let mut pairs: Vec<(u8, &Node<V>)> = (0..self.len as usize)
            .map(|i| (self.keys[i], self.children[i].as_deref().unwrap()))
            .collect();
        pairs.sort_by_key(|(b, _)| *b);
        pairs.into_iter()
    }
}

impl<V> Default for Node16<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capacity-48 node: a 256-entry slot index (`0` = empty, else `1 +
/// slot_index`) plus up to 48 densely packed children.
pub struct Node48<V> {
    pub count: u8,
    pub index: [u8; 256],
    pub children: Vec<Option<Box<Node<V>>>>,
}

impl<V> Node48<V> {
    #[must_use]
    pub fn new() -> Self {
        let mut children = Vec::with_capacity(NODE48_MAX);
        children.resize_with(NODE48_MAX, || None);
        Self {
            count: 0,
            index: [0; 256],
            children,
        }
    }

    pub fn from_node16(mut old: Node16<V>) -> Self {
        let mut n = Self::new();
        for i in 0..old.len as usize {
            let byte = old.keys[i];
            let slot = n.count as usize;
            n.children[slot] = old.children[i].take();
            n.index[byte as usize] = (slot + 1) as u8;
            n.count += 1;
        }
        n
    }

    pub fn find(&self, byte: u8) -> Option<&Node<V>> {
        let slot = self.index[byte as usize];
        if slot == 0 {
            return None;
        }
        self.children[(slot - 1) as usize].as_deref()
    }

    pub fn find_mut(&mut self, byte: u8) -> Option<&mut Box<Node<V>>> {
        let slot = self.index[byte as usize];
        if slot == 0 {
            return None;
        }
        self.children[(slot - 1) as usize].as_mut()
    }

    pub fn insert(&mut self, byte: u8, child: Box<Node<V>>) -> bool {
        if self.index[byte as usize] != 0 || self.count as usize >= NODE48_MAX {
            return false;
        }
        let slot = self.count as usize;
        self.children[slot] = Some(child);
        self.index[byte as usize] = (slot + 1) as u8;
        self.count += 1;
        true
    }

    pub fn remove(&mut self, byte: u8) -> Option<Box<Node<V>>> {
        let slot = self.index[byte as usize];
        if slot == 0 {
            return None;
        }
        let slot = (slot - 1) as usize;
        let removed = self.children[slot].take();
        self.index[byte as usize] = 0;
        let last = self.count as usize - 1;
        if slot != last {
            self.children.swap(slot, last);
            if let Some((moved_byte, _)) = self
                .index
                .iter()
                .enumerate()
                .find(|&(_, &s)| s as usize == last + 1)
            {
                self.index[moved_byte] = (slot + 1) as u8;
            }
        }
        self.count -= 1;
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Node<V>)> {
        let mut pairs: Vec<(u8, &Node<V>)> = (0u16..256)
            .filter_map(|b| {
                let slot = self.index[b as usize];
                if slot == 0 {
                    None
                } else {
                    self.children[(slot - 1) as usize]
                        .as_deref()
                        .map(|c| (b as u8, c))
                }
            })
            .collect();
        pairs.sort_by_key(|(b, _)| *b);
        pairs.into_iter()
    }
}

impl<V> Default for Node48<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capacity-256 node: direct byte-indexed array, no promotion possible.
pub struct Node256<V> {
    pub count: u16,
    pub children: Vec<Option<Box<Node<V>>>>,
}

impl<V> Node256<V> {
    #[must_use]
    pub fn new() -> Self {
        let mut children = Vec::with_capacity(256);
        children.resize_with(256, || None);
        Self { count: 0, children }
    }

    pub fn from_node48(mut old: Node48<V>) -> Self {
        let mut n = Self::new();
        for byte in 0..256usize {
            let slot = old.index[byte];
            if slot != 0 {
                n.children[byte] = old.children[(slot - 1) as usize].take();
                n.count += 1;
            }
        }
        n
    }

    pub fn find(&self, byte: u8) -> Option<&Node<V>> {
        self.children[byte as usize].as_deref()
    }

    pub fn find_mut(&mut self, byte: u8) -> Option<&mut Box<Node<V>>> {
        self.children[byte as usize].as_mut()
    }

    pub fn insert(&mut self, byte: u8, child: Box<Node<V>>) -> bool {
        if self.children[byte as usize].is_some() {
            return false;
        }
        self.children[byte as usize] = Some(child);
        self.count += 1;
        true
    }

    pub fn remove(&mut self, byte: u8) -> Option<Box<Node<V>>> {
        let removed = self.children[byte as usize].take();
        if removed.is_some() {
            self.count -= 1;
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Node<V>)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(b, c)| c.as_deref().map(|c| (b as u8, c)))
    }
}

impl<V> Default for Node256<V> {
    fn default() -> Self {
        Self::new()
    }
}
