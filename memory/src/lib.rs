pub mod arena;
pub mod entity;
pub mod error;


pub use arena::{ArenaTag, StringArena};
pub use entity::{EntityHandle, EntityLayout, EntityPool, EntityRecord, NativeLayout, SLOT_SIZE};
pub use error::MemoryError;
