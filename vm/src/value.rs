use memory::EntityHandle;
use std::fmt;

use crate::image::{FunctionId, StringOfs, ValueType};
use crate::instance::VmInstance;

/// A script string value.
///
/// Non-negative values are byte offsets into the image string blob; negative
/// values name a runtime arena slot as `-(handle + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StringRef(pub i32);

impl StringRef {
    pub const EMPTY: Self = Self(0);

    pub fn from_blob(ofs: StringOfs) -> Self {
        Self(ofs.0 as i32)
    }

    pub fn from_arena(handle: u32) -> Self {
        Self(-(handle as i32) - 1)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw as i32)
    }

    pub fn raw(self) -> u32 {
        self.0 as u32
    }

    pub fn arena_handle(self) -> Option<u32> {
        (self.0 < 0).then(|| (-(self.0 + 1)) as u32)
    }

    pub fn blob_offset(self) -> Option<StringOfs> {
        (self.0 >= 0).then_some(StringOfs(self.0 as u32))
    }
}

impl fmt::Display for StringRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arena_handle() {
            Some(h) => write!(f, "arena:{h}"),
            None => write!(f, "blob:{}", self.0),
        }
    }
}

/// Vector component defs (`origin_x`, ...) that alias part of a vector.
pub(crate) fn is_vector_component(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() > 2 && b[b.len() - 2] == b'_' && matches!(b[b.len() - 1], b'x' | b'y' | b'z')
}

fn entity_num(vm: &VmInstance, raw: u32) -> Option<usize> {
    vm.entities().num_for_handle(EntityHandle(raw as i32)).ok()
}

fn float_of(slots: &[u32], i: usize) -> f32 {
    slots.get(i).copied().map(f32::from_bits).unwrap_or(0.0)
}

/// Human-oriented rendering used by the entity dump commands.
pub fn value_string(vm: &VmInstance, ty: ValueType, slots: &[u32]) -> String {
    let raw = slots.first().copied().unwrap_or(0);
    match ty {
        ValueType::String => vm
            .string(StringRef::from_raw(raw))
            .map(|s| s.into_owned())
            .unwrap_or_else(|| format!("<bad string {}>", raw as i32)),
        ValueType::Entity => match entity_num(vm, raw) {
            Some(num) => format!("entity {num}"),
            None => format!("<bad entity {}>", raw as i32),
        },
        ValueType::Function => format!("{}()", vm.image().function_name(FunctionId(raw))),
        ValueType::Field => match vm.field_at(raw as u16) {
            Some(def) => format!(".{}", vm.def_name(def)),
            None => format!(".<field {raw}>"),
        },
        ValueType::Void => "void".to_string(),
        ValueType::Float => format!("{:5.1}", f32::from_bits(raw)),
        ValueType::Vector => format!(
            "'{:5.1} {:5.1} {:5.1}'",
            float_of(slots, 0),
            float_of(slots, 1),
            float_of(slots, 2)
        ),
        ValueType::Pointer => "pointer".to_string(),
    }
}

/// Unpadded rendering used for save data. String values come back raw; the
/// save writer escapes them before quoting.
pub fn ugly_value_string(vm: &VmInstance, ty: ValueType, slots: &[u32]) -> String {
    let raw = slots.first().copied().unwrap_or(0);
    match ty {
        ValueType::String => vm
            .string(StringRef::from_raw(raw))
            .map(|s| s.into_owned())
            .unwrap_or_default(),
        ValueType::Entity => entity_num(vm, raw).unwrap_or(0).to_string(),
        ValueType::Function => vm.image().function_name(FunctionId(raw)).into_owned(),
        ValueType::Field => vm
            .field_at(raw as u16)
            .map(|def| vm.def_name(def).into_owned())
            .unwrap_or_default(),
        ValueType::Void => "void".to_string(),
        ValueType::Float => format!("{}", f32::from_bits(raw)),
        ValueType::Vector => format!(
            "{} {} {}",
            float_of(slots, 0),
            float_of(slots, 1),
            float_of(slots, 2)
        ),
        ValueType::Pointer => "pointer".to_string(),
    }
}
