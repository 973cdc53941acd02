use crate::builtins::{BuiltinFn, ExecOn};
use crate::stdlib::core::*;
use crate::stdlib::trace::*;

pub struct BuiltinSpec {
    pub declaration: &'static str,
    pub func: BuiltinFn,
    pub exec_on: ExecOn,
    pub dev_only: bool,
}

const fn both(declaration: &'static str, func: BuiltinFn) -> BuiltinSpec {
    BuiltinSpec {
        declaration,
        func,
        exec_on: ExecOn::Both,
        dev_only: false,
    }
}

// Builtins every role gets, in ordinal order: entry i is ordinal i + 1.
// Compiled progs refer to these ordinals, so only ever append.
pub const SHARED_BUILTINS: &[BuiltinSpec] = &[
    both("void(string s) dprint", native_dprint), // #1
    both("string(float f) ftos", native_ftos), // #2
    both("string(vector v) vtos", native_vtos), // #3
    both("float(vector v) vlen", native_vlen), // #4
    both("vector(vector v) normalize", native_normalize), // #5
    both("float(float f) floor", native_floor), // #6
    both("float(float f) ceil", native_ceil), // #7
    both("float(float f) fabs", native_fabs), // #8
    both("float(string s) stof", native_stof), // #9
    // Collision
    both(
        "void(vector v1, vector v2, float nomonsters, entity forent) traceline",
        native_traceline,
    ), // #10
    both("float(vector v) pointcontents", native_pointcontents), // #11
];

pub const SHARED_BUILTIN_COUNT: usize = 11;
const _: () = assert!(
    SHARED_BUILTINS.len() == SHARED_BUILTIN_COUNT,
    "SHARED_BUILTINS length changed, update SHARED_BUILTIN_COUNT"
);
