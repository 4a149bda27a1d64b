use std::cell::Cell;

use vob::Vob;

/// The address of a node in an [`Arena`]: a slot index plus the generation of the slot at the
/// time the node was stored. A slot's generation is bumped whenever its node is reclaimed, so a
/// key can never silently resolve to a node that replaced the one it was created for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    idx: u32,
    generation: u32,
}

struct Slot<T> {
    generation: u32,
    refs: Cell<u32>,
    node: Option<T>,
}

/// Storage for reference-counted, soft-deletable nodes.
///
/// Nodes go through three stages: live; tombstoned (`is_deleted` is set, but the node is still
/// stored and may still be linked to and referenced); and reclaimed (the slot is empty and may
/// be reused). A node can only be reclaimed once it is tombstoned and its reference count has
/// dropped to zero.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    deleted: Vob,
    free: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            deleted: Vob::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store `node`, reusing a reclaimed slot if one is available.
    pub(crate) fn insert(&mut self, node: T) -> Key {
        self.live += 1;
        match self.free.pop() {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                debug_assert!(slot.node.is_none() && slot.refs.get() == 0);
                slot.node = Some(node);
                self.deleted.set(idx as usize, false);
                Key {
                    idx,
                    generation: slot.generation,
                }
            }
            None => {
                let idx = u32::try_from(self.slots.len()).expect("Arena is full");
                self.slots.push(Slot {
                    generation: 0,
                    refs: Cell::new(0),
                    node: Some(node),
                });
                self.deleted.push(false);
                Key { idx, generation: 0 }
            }
        }
    }

    fn slot(&self, key: Key) -> &Slot<T> {
        let slot = &self.slots[key.idx as usize];
        assert!(
            slot.generation == key.generation && slot.node.is_some(),
            "Stale arena key {:?}",
            key
        );
        slot
    }

    /// Return the node at `key`. Tombstoned nodes are still returned.
    ///
    /// # Panics
    ///
    /// If `key`'s node has been reclaimed.
    pub(crate) fn get(&self, key: Key) -> &T {
        self.slot(key).node.as_ref().unwrap()
    }

    pub(crate) fn get_mut(&mut self, key: Key) -> &mut T {
        self.slot(key);
        self.slots[key.idx as usize].node.as_mut().unwrap()
    }

    pub(crate) fn hold(&self, key: Key) {
        let refs = &self.slot(key).refs;
        refs.set(refs.get() + 1);
    }

    pub(crate) fn release(&self, key: Key) {
        let refs = &self.slot(key).refs;
        assert!(refs.get() > 0, "Released an unheld node {:?}", key);
        refs.set(refs.get() - 1);
    }

    pub(crate) fn refs(&self, key: Key) -> u32 {
        self.slot(key).refs.get()
    }

    pub(crate) fn is_deleted(&self, key: Key) -> bool {
        self.slot(key);
        self.deleted[key.idx as usize]
    }

    /// Mark `key`'s node as deleted. Returns `false` if it already was.
    pub(crate) fn tombstone(&mut self, key: Key) -> bool {
        if self.is_deleted(key) {
            return false;
        }
        self.deleted.set(key.idx as usize, true);
        self.live -= 1;
        true
    }

    /// The keys of all tombstoned nodes which nothing references.
    pub(crate) fn reclaimable(&self) -> Vec<Key> {
        self.deleted
            .iter_set_bits(..)
            .filter_map(|idx| {
                let slot = &self.slots[idx];
                if slot.node.is_some() && slot.refs.get() == 0 {
                    Some(Key {
                        idx: idx as u32,
                        generation: slot.generation,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    /// Physically remove `key`'s node, returning it. The caller must already have unlinked it.
    ///
    /// # Panics
    ///
    /// If the node is live or still referenced.
    pub(crate) fn reclaim(&mut self, key: Key) -> T {
        assert!(self.is_deleted(key), "Reclaiming live node {:?}", key);
        assert_eq!(self.refs(key), 0, "Reclaiming referenced node {:?}", key);
        let slot = &mut self.slots[key.idx as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.idx);
        slot.node.take().unwrap()
    }

    /// How many live (i.e. not tombstoned) nodes there are.
    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod test {
    use super::Arena;

    #[test]
    fn test_refcounts() {
        let mut a = Arena::new();
        let k = a.insert("x");
        assert_eq!(a.refs(k), 0);
        a.hold(k);
        a.hold(k);
        assert_eq!(a.refs(k), 2);
        a.release(k);
        assert_eq!(a.refs(k), 1);
        assert_eq!(*a.get(k), "x");
    }

    #[test]
    fn test_tombstone_and_reclaim() {
        let mut a = Arena::new();
        let k1 = a.insert(1);
        let k2 = a.insert(2);
        assert_eq!(a.len(), 2);
        a.hold(k1);
        assert!(a.tombstone(k1));
        assert!(!a.tombstone(k1));
        assert!(a.tombstone(k2));
        assert_eq!(a.len(), 0);
        // k1 is still held, so only k2 can go.
        assert_eq!(a.reclaimable(), vec![k2]);
        assert_eq!(a.reclaim(k2), 2);
        assert!(a.is_deleted(k1));
        assert_eq!(*a.get(k1), 1);
        a.release(k1);
        assert_eq!(a.reclaimable(), vec![k1]);
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut a = Arena::new();
        let k1 = a.insert('a');
        a.tombstone(k1);
        a.reclaim(k1);
        let k2 = a.insert('b');
        assert_ne!(k1, k2);
        assert!(!a.is_deleted(k2));
        assert_eq!(*a.get(k2), 'b');
        assert_eq!(a.len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_stale_key() {
        let mut a = Arena::new();
        let k1 = a.insert(());
        a.tombstone(k1);
        a.reclaim(k1);
        a.insert(());
        a.get(k1);
    }

    #[test]
    #[should_panic]
    fn test_reclaim_held() {
        let mut a = Arena::new();
        let k = a.insert(0u8);
        a.hold(k);
        a.tombstone(k);
        a.reclaim(k);
    }
}
