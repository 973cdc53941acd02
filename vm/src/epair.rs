//! Typed ingestion of textual key/value pairs ("epairs") into globals and
//! entity fields.

use memory::ArenaTag;

use crate::error::EpairError;
use crate::image::{Def, ValueType};
use crate::instance::VmInstance;

/// Storage an epair is written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpairTarget {
    Globals,
    /// Script field block of entity `n`.
    Entity(usize),
}

fn slots_mut<'a>(
    vm: &'a mut VmInstance,
    target: EpairTarget,
    def: &Def,
) -> Result<&'a mut [u32], EpairError> {
    let len = def.ty.slot_count();
    match target {
        EpairTarget::Globals => {
            let count = vm.globals().len();
            vm.globals_mut()
                .get_mut(def.slots())
                .ok_or(EpairError::GlobalOutOfRange {
                    ofs: def.slot(),
                    count,
                })
        }
        EpairTarget::Entity(num) => Ok(vm.entities_mut().slots_mut(num, def.slot(), len)?),
    }
}

/// Parses `text` according to `def.ty` and stores it at `def.offset` in
/// `target`.
///
/// An unresolved field name is reported as the soft
/// [`EpairError::UnknownField`]; an unresolved function name is fatal.
pub fn parse_epair(vm: &mut VmInstance, target: EpairTarget, def: Def, text: &str) -> Result<(), EpairError> {
    match def.ty {
        ValueType::String => {
            slots_mut(vm, target, &def)?;
            let r = vm.new_string(new_string(text), ArenaTag::Level)?;
            slots_mut(vm, target, &def)?[0] = r.raw();
        }

        ValueType::Float => {
            slots_mut(vm, target, &def)?[0] = atof(text).to_bits();
        }

        ValueType::Vector => {
            let v = parse_vector(text);
            let slots = slots_mut(vm, target, &def)?;
            for (slot, c) in slots.iter_mut().zip(v) {
                *slot = c.to_bits();
            }
        }

        ValueType::Entity => {
            let num = atoi(text).max(0) as usize;
            let handle = vm.entities().handle_for(num)?;
            slots_mut(vm, target, &def)?[0] = handle.0 as u32;
        }

        ValueType::Field => {
            let ofs = vm
                .find_field(text)
                .map(|d| d.offset)
                .ok_or_else(|| EpairError::UnknownField(text.to_string()))?;
            slots_mut(vm, target, &def)?[0] = ofs as u32;
        }

        ValueType::Function => {
            let func = vm
                .find_function(text)
                .ok_or_else(|| EpairError::UnknownFunction(text.to_string()))?;
            slots_mut(vm, target, &def)?[0] = func.0;
        }

        ValueType::Void | ValueType::Pointer => {}
    }
    Ok(())
}

/// Copies `s`, turning `\n` into a newline and `\"` into a quote. A
/// backslash followed by any other character becomes a single backslash; the
/// character is dropped, so `\\` reads as one backslash.
pub fn new_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('"') => out.push('"'),
                _ => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Inverse of [`new_string`]: escapes backslashes, quotes and newlines so
/// the text survives a trip through a quoted lump token.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Three space-separated floats. Missing or malformed components read as 0.
pub fn parse_vector(text: &str) -> [f32; 3] {
    let mut out = [0.0f32; 3];
    let mut parts = text.split(' ');
    for c in out.iter_mut() {
        *c = parts.next().map(atof).unwrap_or(0.0);
    }
    out
}

/// Length of the longest numeric prefix of `s` (after leading whitespace).
fn numeric_prefix(s: &str, allow_fraction: bool) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if allow_fraction {
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        // exponent only counts when followed by digits
        if end > digits_start && end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
            let mut exp = end + 1;
            if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
                exp += 1;
            }
            if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                    exp += 1;
                }
                end = exp;
            }
        }
    }
    &s[..end]
}

/// Lenient float parse: the longest valid prefix, 0 when there is none.
pub fn atof(text: &str) -> f32 {
    let prefix = numeric_prefix(text.trim_start(), true);
    prefix.parse().unwrap_or(0.0)
}

/// Lenient integer parse: the longest valid prefix, 0 when there is none.
pub fn atoi(text: &str) -> i32 {
    let prefix = numeric_prefix(text.trim_start(), false);
    prefix.parse().unwrap_or(0)
}
