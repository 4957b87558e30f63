//! Generation-checked arena backing caller-visible non-dispatchable handles.
//!
//! A handle packs `(generation << 32) | (slot + 1)` into a `u64`, so the
//! Vulkan null handle (0) never names a slot and a handle from a destroyed
//! object stops resolving once its slot is released.

use parking_lot::Mutex;

use crate::error::{DriverError, DriverResult};

/// Split form of an arena handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle {
    pub index: u32,
    pub generation: u32,
}

impl RawHandle {
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | (u64::from(self.index) + 1)
    }

    /// Returns `None` for the null handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let slot = (raw & 0xFFFF_FFFF) as u32;
        if slot == 0 {
            return None;
        }
        Some(Self {
            index: slot - 1,
            generation: (raw >> 32) as u32,
        })
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

struct Slots<T> {
    entries: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

pub struct HandleArena<T> {
    slots: Mutex<Slots<T>>,
}

impl<T> HandleArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Store `value` and return its handle.
    ///
    /// Fails with `OutOfHostMemory` if the slot table cannot grow; `value` is
    /// dropped in that case.
    pub fn insert(&self, value: T) -> DriverResult<u64> {
        let mut slots = self.slots.lock();

        if let Some(index) = slots.free.pop() {
            let slot = &mut slots.entries[index as usize];
            slot.value = Some(value);
            let handle = RawHandle { index, generation: slot.generation };
            slots.live += 1;
            return Ok(handle.to_raw());
        }

        let index = u32::try_from(slots.entries.len()).map_err(|_| DriverError::OutOfHostMemory)?;
        if index == u32::MAX {
            return Err(DriverError::OutOfHostMemory);
        }
        slots.entries.try_reserve(1)?;
        // Keep room to free every slot without allocating.
        let spare = slots.entries.len() + 1 - slots.free.len();
        slots.free.try_reserve(spare)?;
        slots.entries.push(Slot { generation: 0, value: Some(value) });
        slots.live += 1;
        Ok(RawHandle { index, generation: 0 }.to_raw())
    }

    /// Run `f` against the value behind `raw`, if it is still live.
    pub fn with<R>(&self, raw: u64, f: impl FnOnce(&T) -> R) -> Option<R> {
        let handle = RawHandle::from_raw(raw)?;
        let slots = self.slots.lock();
        let slot = slots.entries.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref().map(f)
    }

    pub fn with_mut<R>(&self, raw: u64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let handle = RawHandle::from_raw(raw)?;
        let mut slots = self.slots.lock();
        let slot = slots.entries.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut().map(f)
    }

    pub fn contains(&self, raw: u64) -> bool {
        self.with(raw, |_| ()).is_some()
    }

    /// Take the value out and retire the handle. A second call with the same
    /// handle returns `None`.
    pub fn remove(&self, raw: u64) -> Option<T> {
        let handle = RawHandle::from_raw(raw)?;
        let mut slots = self.slots.lock();
        let slot = slots.entries.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        // Capacity for this push was reserved when the slot was created.
        slots.free.push(handle.index);
        slots.live -= 1;
        Some(value)
    }

    /// Remove every value matching `pred`, returning them.
    pub fn drain_where(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut slots = self.slots.lock();
        let mut drained = Vec::new();
        let mut freed = Vec::new();
        for (index, slot) in slots.entries.iter_mut().enumerate() {
            if slot.value.as_ref().is_some_and(&mut pred) {
                if let Some(value) = slot.value.take() {
                    slot.generation = slot.generation.wrapping_add(1);
                    drained.push(value);
                    freed.push(index as u32);
                }
            }
        }
        slots.live -= drained.len();
        slots.free.extend(freed);
        drained
    }

    /// Return number of live values.
    pub fn len(&self) -> usize {
        self.slots.lock().live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandleArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
