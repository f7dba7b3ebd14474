use core::fmt;
use core::mem;
use core::slice;

use allocator_api2::vec::Vec;

use super::{Str, Value};
use crate::allocator::{self, AllocError, Allocator, Global};

/// Table size an unsized object grows to on its first insertion.
pub const DEFAULT_TABLE_SIZE: usize = 32;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the key bytes.
pub fn hash_key(key: &[u8]) -> u64 {
    key.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// One entry of an [`Object`] table
///
/// A vacant slot has an empty key and a `Null` value.
#[derive(Clone)]
pub struct Slot<A: Allocator = Global> {
    key: Str<A>,
    value: Value<A>,
    active: bool,
}

impl<A: Allocator> Slot<A> {
    fn vacant(alloc: A) -> Self {
        Slot {
            key: Str::new_in(alloc),
            value: Value::Null,
            active: false,
        }
    }

    fn try_clone_in(&self, alloc: A) -> Result<Self, AllocError> {
        Ok(Slot {
            key: self.key.try_clone_in(alloc.clone())?,
            value: self.value.try_clone_in(alloc)?,
            active: self.active,
        })
    }

    /// The key stored in this slot.
    pub fn key(&self) -> &Str<A> {
        &self.key
    }

    /// The value stored in this slot.
    pub fn value(&self) -> &Value<A> {
        &self.value
    }

    /// Whether the slot holds a key.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

/// A JSON object: an open-addressing hash table from [`Str`] keys to [`Value`]s
///
/// A key lives in the first slot at or after `hash_key(key) % table_size` (wrapping around the
/// end of the table) that is vacant or holds the same key. Entries are never removed, so a
/// lookup stops at the first vacant slot. A new key that would fill more than three quarters of
/// the slots first doubles the table ([`DEFAULT_TABLE_SIZE`] slots for an unsized table) and
/// re-places all entries, so there is always a vacant slot to end a probe.
///
/// Iteration and serialization visit entries in table order, not insertion order.
#[derive(Clone)]
pub struct Object<A: Allocator = Global> {
    slots: Vec<Slot<A>, A>,
    len: usize,
}

impl<A: Allocator> Object<A> {
    /// Creates an unsized object (table size 0). Doesn't allocate.
    pub fn new_in(alloc: A) -> Self {
        Object {
            slots: Vec::new_in(alloc),
            len: 0,
        }
    }

    /// Creates an empty object with `table_size` vacant slots.
    pub fn try_with_table_size_in(table_size: usize, alloc: A) -> Result<Self, AllocError> {
        Ok(Object {
            slots: vacant_table(table_size, &alloc)?,
            len: 0,
        })
    }

    /// Deep copy into `alloc`. The copy has the same table size and slot layout.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, AllocError> {
        let mut slots = Vec::new_in(alloc.clone());
        allocator::reserve_exact(&mut slots, self.slots.len())?;
        for slot in self.slots.iter() {
            slots.push(slot.try_clone_in(alloc.clone())?);
        }
        Ok(Object {
            slots,
            len: self.len,
        })
    }

    /// Number of slots.
    pub fn table_size(&self) -> usize {
        self.slots.len()
    }

    /// Number of active slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no slot is active.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn probe(&self, key: &[u8], hash: u64) -> Probe {
        let size = self.slots.len();
        if size == 0 {
            return Probe::Full;
        }

        let start = (hash % size as u64) as usize;
        for step in 0..size {
            let index = (start + step) % size;
            let slot = &self.slots[index];
            if !slot.active {
                return Probe::Vacant(index);
            }
            if slot.key.as_bytes() == key {
                return Probe::Found(index);
            }
        }
        Probe::Full
    }

    /// Returns the value stored under `key`.
    pub fn lookup(&self, key: &[u8]) -> Option<&Value<A>> {
        match self.probe(key, hash_key(key)) {
            Probe::Found(index) => Some(&self.slots[index].value),
            _ => None,
        }
    }

    /// Returns the value stored under `key` for modification.
    pub fn lookup_mut(&mut self, key: &[u8]) -> Option<&mut Value<A>> {
        match self.probe(key, hash_key(key)) {
            Probe::Found(index) => Some(&mut self.slots[index].value),
            _ => None,
        }
    }

    /// [`Object::lookup`] with a `&str` key.
    pub fn get(&self, key: &str) -> Option<&Value<A>> {
        self.lookup(key.as_bytes())
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }

    // Whether one more entry stays within 3/4 of the slots.
    fn has_room(&self) -> bool {
        self.len
            .checked_add(1)
            .and_then(|n| n.checked_mul(4))
            .map_or(false, |n| n <= self.slots.len().saturating_mul(3))
    }

    fn grow(&mut self) -> Result<(), AllocError> {
        let size = self.slots.len();
        let grown = if size == 0 {
            DEFAULT_TABLE_SIZE
        } else {
            size.checked_mul(2).ok_or(AllocError)?
        };
        self.rehash(grown).map(drop)
    }

    // Finds the slot for `key`, growing the table until a vacant one is within the load limit.
    // The flag tells whether the slot is vacant; the caller activates it.
    fn claim(&mut self, key: &[u8]) -> Result<(usize, bool), AllocError> {
        let hash = hash_key(key);
        loop {
            match self.probe(key, hash) {
                Probe::Found(index) => return Ok((index, false)),
                Probe::Vacant(index) if self.has_room() => return Ok((index, true)),
                Probe::Vacant(_) | Probe::Full => self.grow()?,
            }
        }
    }

    /// Returns the value stored under `key`, inserting `Null` under a copy of `key` first if it
    /// is absent.
    ///
    /// On allocation failure no entry is added (the table may still have grown).
    pub fn get_or_insert(&mut self, key: &[u8]) -> Result<&mut Value<A>, AllocError> {
        let (index, vacant) = self.claim(key)?;
        if vacant {
            let key = Str::try_from_bytes_in(key, self.slots.allocator().clone())?;
            let slot = &mut self.slots[index];
            slot.key = key;
            slot.value = Value::Null;
            slot.active = true;
            self.len += 1;
        }
        Ok(&mut self.slots[index].value)
    }

    /// Stores `value` under a copy of `key`, replacing any previous value.
    pub fn insert(&mut self, key: &[u8], value: Value<A>) -> Result<(), AllocError> {
        *self.get_or_insert(key)? = value;
        Ok(())
    }

    /// Stores `value` under `key`, taking ownership of the key buffer.
    pub fn insert_owned(&mut self, key: Str<A>, value: Value<A>) -> Result<(), AllocError> {
        let (index, vacant) = self.claim(key.as_bytes())?;
        let slot = &mut self.slots[index];
        if vacant {
            slot.key = key;
            slot.active = true;
            self.len += 1;
        }
        slot.value = value;
        Ok(())
    }

    // Fills slot `index` directly, for copies that keep the source's layout.
    pub(super) fn set_slot(&mut self, index: usize, key: Str<A>, value: Value<A>) {
        if let Some(slot) = self.slots.get_mut(index) {
            if !slot.active {
                self.len += 1;
            }
            slot.key = key;
            slot.value = value;
            slot.active = true;
        }
    }

    /// Rebuilds the table with `table_size` slots.
    ///
    /// Returns `Ok(false)` and leaves the table untouched when `table_size` is smaller than the
    /// current size. Equal sizes are a no-op. On allocation failure the table is unchanged.
    pub fn rehash(&mut self, table_size: usize) -> Result<bool, AllocError> {
        let current = self.slots.len();
        if table_size < current {
            return Ok(false);
        }
        if table_size == current {
            return Ok(true);
        }

        let fresh = vacant_table(table_size, self.slots.allocator())?;
        let old = mem::replace(&mut self.slots, fresh);
        trace!("rehash {=usize} -> {=usize} slots", current, table_size);
        for slot in old {
            if slot.active {
                self.place(slot);
            }
        }
        Ok(true)
    }

    // Puts an active slot into the first vacant position of its probe sequence. Only called
    // while rebuilding into a larger table, where a vacant position always exists.
    fn place(&mut self, slot: Slot<A>) {
        let size = self.slots.len();
        let start = (hash_key(slot.key.as_bytes()) % size as u64) as usize;
        let vacant = (0..size)
            .map(|step| (start + step) % size)
            .find(|&index| !self.slots[index].active);
        if let Some(index) = vacant {
            self.slots[index] = slot;
        }
    }

    /// Iterates over the active entries in table order.
    pub fn iter(&self) -> Iter<'_, A> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    /// Iterates over the active entries in table order, with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, A> {
        IterMut {
            slots: self.slots.iter_mut(),
        }
    }

    /// All slots, vacant ones included.
    pub fn slots(&self) -> &[Slot<A>] {
        &self.slots
    }

    /// The allocator backing this object.
    pub fn allocator(&self) -> &A {
        self.slots.allocator()
    }
}

impl<A: Allocator> Drop for Object<A> {
    fn drop(&mut self) {
        let alloc = self.slots.allocator().clone();
        super::walk::release(self.slots.iter_mut().map(|slot| &mut slot.value), &alloc);
    }
}

impl Object<Global> {
    /// Creates an unsized object in the global allocator.
    pub fn new() -> Self {
        Object::new_in(Global)
    }
}

impl Default for Object<Global> {
    fn default() -> Self {
        Object::new()
    }
}

fn vacant_table<A: Allocator>(size: usize, alloc: &A) -> Result<Vec<Slot<A>, A>, AllocError> {
    let mut slots = Vec::new_in(alloc.clone());
    allocator::reserve_exact(&mut slots, size)?;
    for _ in 0..size {
        slots.push(Slot::vacant(alloc.clone()));
    }
    Ok(slots)
}

/// Iterator over the entries of an [`Object`], see [`Object::iter`].
pub struct Iter<'a, A: Allocator> {
    slots: slice::Iter<'a, Slot<A>>,
}

impl<'a, A: Allocator> Iterator for Iter<'a, A> {
    type Item = (&'a Str<A>, &'a Value<A>);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots
            .find(|slot| slot.active)
            .map(|slot| (&slot.key, &slot.value))
    }
}

/// Mutable iterator over the entries of an [`Object`], see [`Object::iter_mut`].
pub struct IterMut<'a, A: Allocator> {
    slots: slice::IterMut<'a, Slot<A>>,
}

impl<'a, A: Allocator> Iterator for IterMut<'a, A> {
    type Item = (&'a Str<A>, &'a mut Value<A>);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in &mut self.slots {
            if slot.active {
                return Some((&slot.key, &mut slot.value));
            }
        }
        None
    }
}

impl<'a, A: Allocator> IntoIterator for &'a Object<A> {
    type Item = (&'a Str<A>, &'a Value<A>);
    type IntoIter = Iter<'a, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Same occupancy, and every key of `self` maps to an equal value in `other`.
impl<A: Allocator> PartialEq for Object<A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                other
                    .lookup(key.as_bytes())
                    .map_or(false, |theirs| value.equals(theirs))
            })
    }
}

impl<A: Allocator> fmt::Debug for Object<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
