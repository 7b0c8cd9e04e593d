use crate::identity::Identity;

const BUCKET_COUNT: usize = 256;
const INITIAL_CAPACITY: usize = 16;

struct Slot<T> {
    key: Identity,
    data: Option<T>,
    // Next slot in the bucket chain while occupied, next free slot otherwise.
    next: Option<u32>,
}

impl<T> Slot<T> {
    fn vacant(next: Option<u32>) -> Self {
        Self {
            key: Identity::from_raw(0),
            data: None,
            next,
        }
    }
}

/// Chained hash map from [`Identity`] to owned records.
///
/// Records live in a slot arena addressed by index. Buckets and chains store slot indices, which
/// stay valid when the arena grows, and removed slots are recycled through a free list.
pub struct IdentityMap<T> {
    buckets: Box<[Option<u32>]>,
    slots: Vec<Slot<T>>,
    free: Option<u32>,
    len: usize,
}

impl<T> IdentityMap<T> {
    pub fn new() -> Self {
        let mut map = Self {
            buckets: vec![None; BUCKET_COUNT].into_boxed_slice(),
            slots: Vec::with_capacity(INITIAL_CAPACITY),
            free: None,
            len: 0,
        };

        map.grow_to(INITIAL_CAPACITY);
        map
    }

    fn bucket(key: Identity) -> usize {
        let mut h = key.raw() as u64;

        h ^= h >> 33;
        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
        h ^= h >> 33;
        h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        h ^= h >> 33;

        h as usize & (BUCKET_COUNT - 1)
    }

    /// Appends vacant slots up to `capacity` and puts them in front of the free list.
    fn grow_to(&mut self, capacity: usize) {
        let old = self.slots.len();

        for index in old..capacity {
            let next = if index + 1 < capacity { Some(index as u32 + 1) } else { self.free };
            self.slots.push(Slot::vacant(next));
        }

        if capacity > old {
            self.free = Some(old as u32);
        }
    }

    fn position(&self, key: Identity) -> Option<usize> {
        let mut cursor = self.buckets[Self::bucket(key)];

        while let Some(index) = cursor {
            let slot = &self.slots[index as usize];

            if slot.key == key {
                return Some(index as usize);
            }

            cursor = slot.next;
        }

        None
    }

    /// Stores `data` under `key`.
    ///
    /// # Panics
    ///
    /// If `key` is already present; identities are unique while their object is alive.
    pub fn add(&mut self, key: Identity, data: T) {
        assert!(self.position(key).is_none(), "identity {key:?} registered twice");

        if self.free.is_none() {
            let capacity = self.slots.len() * 2;
            self.grow_to(capacity);
        }

        let Some(index) = self.free else {
            unreachable!("free list empty after growth");
        };

        let bucket = Self::bucket(key);
        let slot = &mut self.slots[index as usize];

        self.free = slot.next;
        slot.key = key;
        slot.data = Some(data);
        slot.next = self.buckets[bucket];

        self.buckets[bucket] = Some(index);
        self.len += 1;
    }

    /// Removes and returns the record stored under `key`.
    ///
    /// # Panics
    ///
    /// If `key` is absent.
    pub fn remove(&mut self, key: Identity) -> T {
        let bucket = Self::bucket(key);
        let mut previous: Option<u32> = None;
        let mut cursor = self.buckets[bucket];

        while let Some(index) = cursor {
            if self.slots[index as usize].key != key {
                previous = cursor;
                cursor = self.slots[index as usize].next;
                continue;
            }

            let next = self.slots[index as usize].next;

            match previous {
                Some(p) => self.slots[p as usize].next = next,
                None => self.buckets[bucket] = next,
            }

            let slot = &mut self.slots[index as usize];
            let data = slot.data.take();

            slot.key = Identity::from_raw(0);
            slot.next = self.free;
            self.free = Some(index);
            self.len -= 1;

            if let Some(data) = data {
                return data;
            }

            unreachable!("occupied slot {index} without data");
        }

        panic!("identity {key:?} not registered");
    }

    pub fn find(&self, key: Identity) -> Option<&T> {
        self.position(key).and_then(|index| self.slots[index].data.as_ref())
    }

    pub fn contains(&self, key: Identity) -> bool {
        self.position(key).is_some()
    }

    /// Removes every record matching `predicate`, returning them.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Vec<T> {
        let keys: Vec<Identity> = self.iter().filter(|(_, data)| predicate(*data)).map(|(key, _)| key).collect();

        keys.into_iter().map(|key| self.remove(key)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Identity, &T)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.data.as_ref().map(|data| (slot.key, data)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, occupied or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for IdentityMap<T> {
    fn default() -> Self {
        IdentityMap::new()
    }
}
