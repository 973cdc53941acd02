//! Console diagnostics over a live instance.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use tracing::debug;

use crate::error::CommandError;
use crate::image::FunctionId;
use crate::instance::VmInstance;
use crate::role::Role;
use crate::value::{is_vector_component, value_string};

pub type CommandFn = fn(vm: &VmInstance, args: &[&str], out: &mut dyn Write) -> Result<(), CommandError>;

#[derive(Clone, Copy)]
pub struct CommandEntry {
    /// Instance the command runs against.
    pub owner: Role,
    pub func: CommandFn,
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry").field("owner", &self.owner).finish_non_exhaustive()
    }
}

/// Named commands, each owned by the role that registered it.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: BTreeMap<String, CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, owner: Role, func: CommandFn) {
        debug!(name, %owner, "command added");
        self.commands
            .insert(name.to_string(), CommandEntry { owner, func });
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.commands.remove(name).is_some()
    }

    /// Drops every command owned by `owner`.
    pub fn remove_owned_by(&mut self, owner: Role) -> usize {
        let before = self.commands.len();
        self.commands.retain(|_, e| e.owner != owner);
        before - self.commands.len()
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

/// Entity-dump commands registered with a server instance.
pub fn register_server_commands(table: &mut CommandTable) {
    table.add("edict", Role::Server, cmd_edict);
    table.add("edicts", Role::Server, cmd_edicts);
}

/// Prints one entity's non-zero fields, one per line.
pub fn print_edict(vm: &VmInstance, num: usize, out: &mut dyn Write) -> Result<(), CommandError> {
    writeln!(out, "\nEDICT {num}:")?;
    for def in &vm.image().field_defs {
        let name = vm.def_name(def);
        if is_vector_component(&name) {
            continue;
        }
        let slots = vm.entities().slots(num, def.slot(), def.ty.slot_count())?;
        if slots.iter().all(|&s| s == 0) {
            continue;
        }
        writeln!(out, "{name:<15} {}", value_string(vm, def.ty, slots))?;
    }
    Ok(())
}

/// `edict <n>`
pub fn cmd_edict(vm: &VmInstance, args: &[&str], out: &mut dyn Write) -> Result<(), CommandError> {
    let num: usize = args
        .first()
        .and_then(|a| a.parse().ok())
        .ok_or(CommandError::Usage("edict <number>"))?;
    print_edict(vm, num, out)
}

/// `edicts`
pub fn cmd_edicts(vm: &VmInstance, _args: &[&str], out: &mut dyn Write) -> Result<(), CommandError> {
    writeln!(out, "{} entities", vm.num_entities())?;
    for num in 0..vm.num_entities() {
        print_edict(vm, num, out)?;
    }
    Ok(())
}

/// Prints every script function from index `start` on, skipping builtin
/// stubs at the front of the table.
pub fn list_functions(vm: &VmInstance, start: usize, out: &mut dyn Write) -> Result<(), CommandError> {
    let image = vm.image();
    for (i, f) in image.functions.iter().enumerate().skip(start) {
        let file = image.string(f.file);
        let name = image.function_name(FunctionId(i as u32));
        if f.num_parms != 0 {
            writeln!(out, "#{i} {file}:{name}(#{})", f.num_parms)?;
        } else {
            writeln!(out, "#{i} {file}:{name}()")?;
        }
    }
    Ok(())
}
