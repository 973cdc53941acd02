use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("entity {num} out of range (capacity {capacity})")]
    EntityOutOfRange { num: usize, capacity: usize },

    #[error("field slots {ofs}..{} out of range (field count {count})", .ofs + .len)]
    FieldOutOfRange { ofs: usize, len: usize, count: usize },

    #[error("bad entity handle {0}")]
    BadHandle(i32),

    #[error("field block offset {field_offset} lies past the native prefix ({native_size} bytes)")]
    BadLayout { native_size: usize, field_offset: usize },

    #[error("string arena full ({slots} slots)")]
    ArenaFull { slots: usize },

    #[error("couldn't allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },
}
