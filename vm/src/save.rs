//! Save-game text blocks, readable by [`crate::lump::parse_globals`] and
//! [`crate::lump::parse_entity`].

use std::fmt::Write as _;

use crate::epair::escape_string;
use crate::error::VmError;
use crate::image::ValueType;
use crate::instance::VmInstance;
use crate::value::{is_vector_component, ugly_value_string};

fn push_pair(out: &mut String, key: &str, value: &str) {
    // writing into a String cannot fail
    let _ = writeln!(out, "\"{key}\" \"{}\"", escape_string(value));
}

/// Every save-global def of a persistable type, as one `{ }` block.
pub fn write_globals(vm: &VmInstance) -> String {
    let mut out = String::from("{\n");
    for def in &vm.image().global_defs {
        if !def.save_global {
            continue;
        }
        if !matches!(
            def.ty,
            ValueType::String
                | ValueType::Float
                | ValueType::Entity
                | ValueType::Function
                | ValueType::Vector
        ) {
            continue;
        }
        let Some(slots) = vm.globals().get(def.slots()) else {
            continue;
        };
        let name = vm.def_name(def);
        push_pair(&mut out, &name, &ugly_value_string(vm, def.ty, slots));
    }
    out.push_str("}\n");
    out
}

/// Every non-zero script field of entity `num`, as one `{ }` block.
pub fn write_entity(vm: &VmInstance, num: usize) -> Result<String, VmError> {
    let mut out = String::from("{\n");
    for def in &vm.image().field_defs {
        let name = vm.def_name(def);
        if is_vector_component(&name) {
            continue;
        }
        let slots = vm.entities().slots(num, def.slot(), def.ty.slot_count())?;
        if slots.iter().all(|&s| s == 0) {
            continue;
        }
        push_pair(&mut out, &name, &ugly_value_string(vm, def.ty, slots));
    }
    out.push_str("}\n");
    Ok(out)
}
