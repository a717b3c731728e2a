use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Handle returned by a [`Slots`] table.
///
/// The generation is bumped whenever a slot is released, so a handle that
/// outlives its allocation never resolves to whatever reuses the slot.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn raw(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls: deriving would put bounds on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    marked: bool,
    value: Option<T>,
}

/// Slot table with a free list and one mark bit per live entry.
#[derive(Debug)]
pub struct Slots<T> {
    entries: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slots<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Stores `value` unmarked and returns its handle.
    pub fn allocate(&mut self, value: T) -> Handle<T> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.entries[index];
            slot.value = Some(value);
            slot.marked = false;
            return Handle::new(index, slot.generation);
        }
        self.entries.push(Slot {
            generation: 0,
            marked: false,
            value: Some(value),
        });
        Handle::new(self.entries.len() - 1, 0)
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.entries
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.entries
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some()
    }

    pub fn is_marked(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some_and(|slot| slot.marked)
    }

    /// Sets the mark bit. Returns `true` only when the entry is live and was
    /// not already marked, i.e. when the caller still has to trace it.
    pub fn mark(&mut self, handle: Handle<T>) -> bool {
        match self.entries.get_mut(handle.index()) {
            Some(slot)
                if slot.generation == handle.generation
                    && slot.value.is_some()
                    && !slot.marked =>
            {
                slot.marked = true;
                true
            }
            _ => false,
        }
    }

    /// Releases every unmarked entry and clears the marks of the survivors.
    /// Returns the number of released entries.
    pub fn sweep(&mut self) -> usize {
        let mut released = 0;
        for (index, slot) in self.entries.iter_mut().enumerate() {
            if slot.value.is_none() {
                continue;
            }
            if slot.marked {
                slot.marked = false;
            } else {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
                released += 1;
            }
        }
        self.live -= released;
        released
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.entries.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index, slot.generation), value))
        })
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
