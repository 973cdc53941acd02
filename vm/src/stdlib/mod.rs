pub mod core;
pub mod trace;

use crate::builtins::BuiltinTable;
use crate::specs::SHARED_BUILTINS;

/// Registers the builtins shared by every role, in their fixed order.
pub fn register_shared_builtins(table: &mut BuiltinTable) {
    for spec in SHARED_BUILTINS {
        table.register(spec.declaration, spec.func, spec.exec_on, spec.dev_only);
    }
}
