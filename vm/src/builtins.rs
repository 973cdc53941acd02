use std::fmt::{self, Write as _};

use memory::{ArenaTag, EntityHandle};
use tracing::debug;

use crate::error::RuntimeError;
use crate::globals::{parm, OFS_RETURN};
use crate::instance::VmInstance;
use crate::role::Role;
use crate::value::StringRef;
use crate::world::{Vec3, WorldQuery};

/// Signature shared by every native function exposed to scripts.
/// Arguments are read from the parameter slots of `ctx.vm`; results are
/// written to the return slot.
pub type BuiltinFn = fn(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError>;

/// Which side of the engine may call a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOn {
    Server,
    /// Client-side programs, including the menu.
    Client,
    Both,
}

impl ExecOn {
    pub fn allows(self, role: Role) -> bool {
        match self {
            ExecOn::Both => true,
            ExecOn::Server => role == Role::Server,
            ExecOn::Client => matches!(role, Role::Client | Role::Menu),
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ExecOn::Server => "// sv",
            ExecOn::Client => "// cl",
            ExecOn::Both => "// both",
        }
    }
}

#[derive(Clone)]
pub struct BuiltinEntry {
    /// Script-facing declaration, e.g. `float(vector v) vlen`.
    pub declaration: &'static str,
    pub func: BuiltinFn,
    pub exec_on: ExecOn,
    pub dev_only: bool,
}

impl fmt::Debug for BuiltinEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinEntry")
            .field("declaration", &self.declaration)
            .field("exec_on", &self.exec_on)
            .field("dev_only", &self.dev_only)
            .finish_non_exhaustive()
    }
}

impl BuiltinEntry {
    /// The identifier after the declaration's parameter list.
    pub fn name(&self) -> &'static str {
        let tail = match self.declaration.rfind(')') {
            Some(i) => &self.declaration[i + 1..],
            None => self.declaration,
        };
        tail.trim()
    }
}

/// Append-only builtin registry shared by every instance.
///
/// Ordinals are dense and follow registration order starting at 1. Slot 0
/// is reserved and never callable.
#[derive(Debug, Clone)]
pub struct BuiltinTable {
    entries: Vec<Option<BuiltinEntry>>,
}

impl Default for BuiltinTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinTable {
    pub fn new() -> Self {
        Self {
            entries: vec![None],
        }
    }

    /// Appends a builtin and returns its ordinal.
    pub fn register(
        &mut self,
        declaration: &'static str,
        func: BuiltinFn,
        exec_on: ExecOn,
        dev_only: bool,
    ) -> u32 {
        let ordinal = self.entries.len() as u32;
        self.entries.push(Some(BuiltinEntry {
            declaration,
            func,
            exec_on,
            dev_only,
        }));
        debug!(ordinal, declaration, "registered builtin");
        ordinal
    }

    pub fn get(&self, ordinal: u32) -> Option<&BuiltinEntry> {
        self.entries.get(ordinal as usize)?.as_ref()
    }

    /// Number of registered builtins (slot 0 excluded).
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First function index that belongs to script code rather than to a
    /// builtin stub. Counts the reserved slot.
    pub fn script_function_start(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &BuiltinEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i as u32, e)))
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        self.iter().find(|(_, e)| e.name() == name).map(|(i, _)| i)
    }

    /// Header a script author compiles against: every builtin in ordinal
    /// order with its context tag. Identical for identical registrations.
    pub fn header(&self) -> String {
        let (mut sv, mut cl, mut both, mut dev) = (0, 0, 0, 0);
        for (_, e) in self.iter() {
            match e.exec_on {
                ExecOn::Server => sv += 1,
                ExecOn::Client => cl += 1,
                ExecOn::Both => both += 1,
            }
            if e.dev_only {
                dev += 1;
            }
        }

        let mut out = String::new();
        // writes into a String cannot fail
        let _ = writeln!(out, "// this file was generated by qcvm {}", env!("CARGO_PKG_VERSION"));
        let _ = writeln!(out, "// DO NOT EDIT");
        let _ = writeln!(out);
        let _ = writeln!(out, "// number of builtins: {}", self.len());
        let _ = writeln!(out, "// server: {sv}");
        let _ = writeln!(out, "// client: {cl}");
        let _ = writeln!(out, "// common: {both}");
        let _ = writeln!(
            out,
            "// {dev} developer builtins execute only when developer mode is enabled"
        );
        let _ = writeln!(out);

        for (i, e) in self.iter() {
            let line = format!(
                "{} = #{}; {} {}",
                e.declaration,
                i,
                e.exec_on.tag(),
                if e.dev_only { "- devmode" } else { "" }
            );
            let _ = writeln!(out, "{}", line.trim_end());
        }
        out
    }

    /// Runs builtin `ordinal` against `ctx`.
    pub fn call(&self, ordinal: u32, ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
        let entry = self
            .get(ordinal)
            .ok_or(RuntimeError::InvalidBuiltin(ordinal))?;

        let role = ctx.vm.role();
        if !entry.exec_on.allows(role) {
            return Err(RuntimeError::WrongContext {
                name: entry.name().to_string(),
                role,
            });
        }
        if entry.dev_only && !ctx.developer {
            return Err(RuntimeError::DeveloperOnly(entry.name().to_string()));
        }

        (entry.func)(ctx)
    }
}

/// Everything a builtin may touch during one call.
pub struct CallContext<'a> {
    pub vm: &'a mut VmInstance,
    pub world: Option<&'a dyn WorldQuery>,
    pub developer: bool,
}

impl<'a> CallContext<'a> {
    pub fn new(vm: &'a mut VmInstance) -> Self {
        Self {
            vm,
            world: None,
            developer: false,
        }
    }

    pub fn with_world(mut self, world: &'a dyn WorldQuery) -> Self {
        self.world = Some(world);
        self
    }

    pub fn developer(mut self, on: bool) -> Self {
        self.developer = on;
        self
    }

    fn raw(&self, ofs: usize) -> u32 {
        self.vm.globals().get(ofs).copied().unwrap_or(0)
    }

    pub fn float(&self, n: usize) -> f32 {
        f32::from_bits(self.raw(parm(n)))
    }

    pub fn vector(&self, n: usize) -> Vec3 {
        let base = parm(n);
        [
            f32::from_bits(self.raw(base)),
            f32::from_bits(self.raw(base + 1)),
            f32::from_bits(self.raw(base + 2)),
        ]
    }

    pub fn string(&self, n: usize) -> Result<String, RuntimeError> {
        let r = StringRef::from_raw(self.raw(parm(n)));
        self.vm
            .string(r)
            .map(|s| s.into_owned())
            .ok_or(RuntimeError::BadString(r.0))
    }

    /// Entity number of an entity-typed parameter.
    pub fn entity(&self, n: usize) -> Result<usize, RuntimeError> {
        let handle = EntityHandle(self.raw(parm(n)) as i32);
        Ok(self.vm.entities().num_for_handle(handle)?)
    }

    pub fn return_float(&mut self, value: f32) {
        self.vm.set_global_float(OFS_RETURN, value);
    }

    pub fn return_vector(&mut self, value: Vec3) {
        self.vm.set_global_vector(OFS_RETURN, value);
    }

    /// Returns a temporary string. It stays valid until a few more temp
    /// strings have been made or the level ends.
    pub fn return_string(&mut self, text: String) -> Result<(), RuntimeError> {
        let r = self.vm.new_string(text, ArenaTag::Temp)?;
        if let Some(slot) = self.vm.globals_mut().get_mut(OFS_RETURN) {
            *slot = r.raw();
        }
        Ok(())
    }

    pub fn return_entity(&mut self, num: usize) -> Result<(), RuntimeError> {
        let handle = self.vm.entities().handle_for(num)?;
        if let Some(slot) = self.vm.globals_mut().get_mut(OFS_RETURN) {
            *slot = handle.0 as u32;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop(_: &mut CallContext<'_>) -> Result<(), RuntimeError> {
        Ok(())
    }

    #[test]
    fn test_name_from_declaration() {
        let mut t = BuiltinTable::new();
        t.register("float(vector v) vlen", nop, ExecOn::Both, false);
        t.register("void() crash", nop, ExecOn::Server, true);
        t.register("bare", nop, ExecOn::Client, false);
        assert_eq!(t.get(1).map(|e| e.name()), Some("vlen"));
        assert_eq!(t.get(2).map(|e| e.name()), Some("crash"));
        assert_eq!(t.get(3).map(|e| e.name()), Some("bare"));
        assert_eq!(t.find("crash"), Some(2));
    }

    #[test]
    fn test_slot_zero_reserved() {
        let t = BuiltinTable::new();
        assert!(t.get(0).is_none());
        assert!(t.is_empty());
        assert_eq!(t.script_function_start(), 1);
    }

    #[test]
    fn test_exec_on() {
        assert!(ExecOn::Both.allows(Role::Menu));
        assert!(ExecOn::Server.allows(Role::Server));
        assert!(!ExecOn::Server.allows(Role::Client));
        assert!(ExecOn::Client.allows(Role::Menu));
        assert!(!ExecOn::Client.allows(Role::Server));
    }
}
