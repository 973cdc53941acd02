use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MemoryError;

/// Bytes per script field slot.
pub const SLOT_SIZE: usize = 4;

/// Host-side shape of the engine-owned part of an entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLayout {
    /// Size in bytes of the engine-native prefix.
    pub native_size: usize,
    /// Byte offset inside the host struct where the script field block starts.
    pub field_offset: usize,
}

impl NativeLayout {
    pub const fn new(native_size: usize, field_offset: usize) -> Self {
        Self {
            native_size,
            field_offset,
        }
    }
}

impl Default for NativeLayout {
    fn default() -> Self {
        Self::new(56, 56)
    }
}

/// Full record layout: the native prefix plus `field_count` script slots.
/// Fixed for the lifetime of the pool it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLayout {
    native: NativeLayout,
    field_count: usize,
}

impl EntityLayout {
    pub fn new(native: NativeLayout, field_count: usize) -> Result<Self, MemoryError> {
        if native.field_offset > native.native_size {
            return Err(MemoryError::BadLayout {
                native_size: native.native_size,
                field_offset: native.field_offset,
            });
        }
        Ok(Self {
            native,
            field_count,
        })
    }

    pub fn native(&self) -> NativeLayout {
        self.native
    }

    pub fn field_count(&self) -> usize {
        self.field_count
    }

    pub fn field_block_size(&self) -> usize {
        self.field_count * SLOT_SIZE
    }

    /// Byte size of one record: native prefix + field block.
    pub fn stride(&self) -> usize {
        self.native.native_size + self.field_block_size()
    }
}

/// Script-visible entity reference: the record's byte offset inside the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityHandle(pub i32);

impl EntityHandle {
    pub const WORLD: Self = Self(0);
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity@{}", self.0)
    }
}

/// Borrowed view of one record.
#[derive(Debug, Clone, Copy)]
pub struct EntityRecord<'a> {
    pub native: &'a [u8],
    pub fields: &'a [u32],
}

/// Fixed-capacity array of fixed-stride entity records.
///
/// The native prefixes and script field blocks live in two separate buffers so
/// that script fields are only ever reached through slot offsets validated
/// against the field count, never through a cast of the host struct.
#[derive(Debug, Clone)]
pub struct EntityPool {
    layout: EntityLayout,
    capacity: usize,
    native: Vec<u8>,
    fields: Vec<u32>,
}

impl EntityPool {
    pub fn new(layout: EntityLayout, capacity: usize) -> Result<Self, MemoryError> {
        let native_len = capacity
            .checked_mul(layout.native.native_size)
            .ok_or(MemoryError::AllocationFailed {
                bytes: usize::MAX,
            })?;
        let field_len = capacity
            .checked_mul(layout.field_count)
            .ok_or(MemoryError::AllocationFailed {
                bytes: usize::MAX,
            })?;

        let mut native = Vec::new();
        native
            .try_reserve_exact(native_len)
            .map_err(|_| MemoryError::AllocationFailed { bytes: native_len })?;
        native.resize(native_len, 0);

        let mut fields = Vec::new();
        fields
            .try_reserve_exact(field_len)
            .map_err(|_| MemoryError::AllocationFailed {
                bytes: field_len * SLOT_SIZE,
            })?;
        fields.resize(field_len, 0);

        Ok(Self {
            layout,
            capacity,
            native,
            fields,
        })
    }

    pub fn layout(&self) -> &EntityLayout {
        &self.layout
    }

    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes held by the whole pool (`capacity × stride`).
    pub fn total_bytes(&self) -> usize {
        self.capacity * self.stride()
    }

    fn check(&self, num: usize) -> Result<(), MemoryError> {
        if num >= self.capacity {
            return Err(MemoryError::EntityOutOfRange {
                num,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn field_range(&self, num: usize, ofs: usize, len: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        self.check(num)?;
        if ofs + len > self.layout.field_count {
            return Err(MemoryError::FieldOutOfRange {
                ofs,
                len,
                count: self.layout.field_count,
            });
        }
        let base = num * self.layout.field_count + ofs;
        Ok(base..base + len)
    }

    pub fn record(&self, num: usize) -> Result<EntityRecord<'_>, MemoryError> {
        Ok(EntityRecord {
            native: self.native(num)?,
            fields: self.fields(num)?,
        })
    }

    pub fn native(&self, num: usize) -> Result<&[u8], MemoryError> {
        self.check(num)?;
        let size = self.layout.native.native_size;
        Ok(&self.native[num * size..(num + 1) * size])
    }

    pub fn native_mut(&mut self, num: usize) -> Result<&mut [u8], MemoryError> {
        self.check(num)?;
        let size = self.layout.native.native_size;
        Ok(&mut self.native[num * size..(num + 1) * size])
    }

    pub fn fields(&self, num: usize) -> Result<&[u32], MemoryError> {
        let range = self.field_range(num, 0, self.layout.field_count)?;
        Ok(&self.fields[range])
    }

    pub fn fields_mut(&mut self, num: usize) -> Result<&mut [u32], MemoryError> {
        let range = self.field_range(num, 0, self.layout.field_count)?;
        Ok(&mut self.fields[range])
    }

    pub fn slots(&self, num: usize, ofs: usize, len: usize) -> Result<&[u32], MemoryError> {
        let range = self.field_range(num, ofs, len)?;
        Ok(&self.fields[range])
    }

    pub fn slots_mut(&mut self, num: usize, ofs: usize, len: usize) -> Result<&mut [u32], MemoryError> {
        let range = self.field_range(num, ofs, len)?;
        Ok(&mut self.fields[range])
    }

    pub fn float(&self, num: usize, ofs: usize) -> Result<f32, MemoryError> {
        Ok(f32::from_bits(self.slots(num, ofs, 1)?[0]))
    }

    pub fn set_float(&mut self, num: usize, ofs: usize, value: f32) -> Result<(), MemoryError> {
        self.slots_mut(num, ofs, 1)?[0] = value.to_bits();
        Ok(())
    }

    pub fn vector(&self, num: usize, ofs: usize) -> Result<[f32; 3], MemoryError> {
        let s = self.slots(num, ofs, 3)?;
        Ok([f32::from_bits(s[0]), f32::from_bits(s[1]), f32::from_bits(s[2])])
    }

    pub fn set_vector(&mut self, num: usize, ofs: usize, value: [f32; 3]) -> Result<(), MemoryError> {
        let s = self.slots_mut(num, ofs, 3)?;
        for (slot, v) in s.iter_mut().zip(value) {
            *slot = v.to_bits();
        }
        Ok(())
    }

    pub fn handle_for(&self, num: usize) -> Result<EntityHandle, MemoryError> {
        self.check(num)?;
        let ofs = i32::try_from(num * self.stride()).map_err(|_| MemoryError::EntityOutOfRange {
            num,
            capacity: self.capacity,
        })?;
        Ok(EntityHandle(ofs))
    }

    pub fn num_for_handle(&self, handle: EntityHandle) -> Result<usize, MemoryError> {
        let stride = self.stride();
        if handle.0 < 0 || stride == 0 || handle.0 as usize % stride != 0 {
            return Err(MemoryError::BadHandle(handle.0));
        }
        let num = handle.0 as usize / stride;
        if num >= self.capacity {
            return Err(MemoryError::BadHandle(handle.0));
        }
        Ok(num)
    }

    /// Zeroes one record.
    pub fn clear_entity(&mut self, num: usize) -> Result<(), MemoryError> {
        self.native_mut(num)?.fill(0);
        self.fields_mut(num)?.fill(0);
        Ok(())
    }

    /// Zeroes every record.
    pub fn clear(&mut self) {
        self.native.fill(0);
        self.fields.fill(0);
    }

    /// Whether every script slot of the record is zero.
    pub fn is_blank(&self, num: usize) -> Result<bool, MemoryError> {
        Ok(self.fields(num)?.iter().all(|&s| s == 0))
    }
}
