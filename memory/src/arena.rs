use std::fmt;

use crate::MemoryError;

/// Lifetime class of an arena allocation. Every allocation carries one, and
/// [`StringArena::free_tag`] releases all allocations of a class at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArenaTag {
    /// Lives until the next level load.
    Level,
    /// Scratch strings produced by builtins (`ftos`, `vtos`, ...).
    Temp,
}

impl fmt::Display for ArenaTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaTag::Level => write!(f, "level"),
            ArenaTag::Temp => write!(f, "temp"),
        }
    }
}

/// Low handle bits select the slot; the rest carry its generation. The
/// whole handle stays below 2^31 so a script string reference can encode it
/// as a negative number.
const INDEX_BITS: u32 = 22;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const MAX_GENERATION: u32 = (1 << (31 - INDEX_BITS)) - 1;

#[derive(Debug, Clone)]
struct Slot {
    tag: ArenaTag,
    text: String,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    generation: u32,
    slot: Option<Slot>,
}

fn split(handle: u32) -> (usize, u32) {
    ((handle & INDEX_MASK) as usize, handle >> INDEX_BITS)
}

/// Runtime string storage, distinct from the immutable string blob baked into
/// a progs image.
///
/// Freed slots are recycled under a new generation, so a handle that outlives
/// its string resolves to nothing instead of to whatever took the slot next.
/// A slot whose generation is exhausted is retired rather than reused.
#[derive(Debug, Clone, Default)]
pub struct StringArena {
    entries: Vec<Entry>,
    free_indices: Vec<u32>,
    live: usize,
    bytes_allocated: usize,
}

impl StringArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, text: String, tag: ArenaTag) -> Result<u32, MemoryError> {
        let index = match self.free_indices.pop() {
            Some(idx) => idx,
            None if self.entries.len() > INDEX_MASK as usize => {
                return Err(MemoryError::ArenaFull {
                    slots: self.entries.len(),
                });
            }
            None => {
                self.entries.push(Entry::default());
                (self.entries.len() - 1) as u32
            }
        };

        self.bytes_allocated += text.len() + 1;
        self.live += 1;
        let entry = &mut self.entries[index as usize];
        entry.slot = Some(Slot { tag, text });
        Ok((entry.generation << INDEX_BITS) | index)
    }

    fn slot(&self, handle: u32) -> Option<&Slot> {
        let (idx, generation) = split(handle);
        self.entries
            .get(idx)
            .filter(|e| e.generation == generation)
            .and_then(|e| e.slot.as_ref())
    }

    pub fn get(&self, handle: u32) -> Option<&str> {
        self.slot(handle).map(|s| s.text.as_str())
    }

    pub fn tag_of(&self, handle: u32) -> Option<ArenaTag> {
        self.slot(handle).map(|s| s.tag)
    }

    /// Releases one allocation. Returns false for a stale or unknown handle.
    pub fn free(&mut self, handle: u32) -> bool {
        if self.slot(handle).is_none() {
            return false;
        }
        self.release(split(handle).0);
        true
    }

    /// Releases every allocation carrying `tag`. Returns how many were freed.
    pub fn free_tag(&mut self, tag: ArenaTag) -> usize {
        let doomed: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.slot.as_ref().is_some_and(|s| s.tag == tag))
            .map(|(idx, _)| idx)
            .collect();
        for &idx in &doomed {
            self.release(idx);
        }
        doomed.len()
    }

    fn release(&mut self, idx: usize) {
        let entry = &mut self.entries[idx];
        if let Some(old) = entry.slot.take() {
            self.bytes_allocated -= old.text.len() + 1;
            self.live -= 1;
            entry.generation += 1;
            if entry.generation <= MAX_GENERATION {
                self.free_indices.push(idx as u32);
            }
        }
    }

    /// Frees everything. Outstanding handles stay stale.
    pub fn clear(&mut self) {
        for idx in 0..self.entries.len() {
            self.release(idx);
        }
    }

    /// Number of live allocations.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }
}
