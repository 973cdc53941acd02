//! Fixed global slots shared by every progs image.

pub const OFS_NULL: usize = 0;
pub const OFS_RETURN: usize = 1;
pub const OFS_PARM0: usize = 4;
/// Slots between consecutive parameters (room for a vector).
pub const PARM_STRIDE: usize = 3;
pub const MAX_PARM_SLOTS: usize = 8;
/// First slot available to script-defined globals.
pub const RESERVED_OFS: usize = OFS_PARM0 + MAX_PARM_SLOTS * PARM_STRIDE;

/// Slot of parameter `n`.
#[inline]
pub const fn parm(n: usize) -> usize {
    OFS_PARM0 + n * PARM_STRIDE
}
