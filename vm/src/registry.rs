use std::collections::BTreeMap;
use std::io::Write;

use memory::NativeLayout;
use tracing::{debug, info};

use crate::builtins::{BuiltinTable, CallContext};
use crate::commands::{list_functions, register_server_commands, CommandTable};
use crate::config::RuntimeConfig;
use crate::error::{CommandError, VmError};
use crate::fs::FileSystem;
use crate::instance::VmInstance;
use crate::role::Role;
use crate::stdlib::register_shared_builtins;
use crate::world::WorldQuery;

/// Owns every live instance (at most one per role), the shared builtin
/// table and the diagnostic commands, and tracks which instance is bound.
///
/// Nothing outside the registry keeps an instance across a call that could
/// destroy it; borrow through [`get`](Self::get) or [`active`](Self::active).
pub struct VmRegistry {
    config: RuntimeConfig,
    fs: Box<dyn FileSystem>,
    instances: BTreeMap<Role, VmInstance>,
    active: Role,
    builtins: BuiltinTable,
    commands: CommandTable,
}

impl VmRegistry {
    /// Creates an empty registry with the shared builtins registered.
    pub fn new(config: RuntimeConfig, fs: impl FileSystem + 'static) -> Self {
        let mut builtins = BuiltinTable::new();
        register_shared_builtins(&mut builtins);
        Self {
            config,
            fs: Box::new(fs),
            instances: BTreeMap::new(),
            active: Role::None,
            builtins,
            commands: CommandTable::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn builtins(&self) -> &BuiltinTable {
        &self.builtins
    }

    /// Role-specific builtins are appended after the shared ones.
    pub fn builtins_mut(&mut self) -> &mut BuiltinTable {
        &mut self.builtins
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Loads the role's progs file and allocates `capacity` entity records.
    ///
    /// Fails without touching the existing instance if the role already has
    /// one.
    pub fn create(&mut self, role: Role, native: NativeLayout, capacity: usize) -> Result<(), VmError> {
        if self.instances.contains_key(&role) {
            return Err(VmError::AlreadyExists(role));
        }
        let settings = self.config.settings(role).ok_or(VmError::InvalidRole(role))?;
        let path = settings.filename;

        let load_err = |source| VmError::Load {
            role,
            path: path.clone(),
            source,
        };
        let bytes = self.fs.load_file(&path).map_err(load_err)?;
        let vm = VmInstance::load(role, &bytes, &settings.load, native, capacity)
            .map_err(load_err)?
            .with_filename(path.clone());

        if role == Role::Server {
            register_server_commands(&mut self.commands);
        }

        info!(%role, path = %path, "script VM created\n{}", vm.summary());
        self.instances.insert(role, vm);
        Ok(())
    }

    /// [`create`](Self::create) with the configured layout and capacity.
    pub fn create_from_config(&mut self, role: Role) -> Result<(), VmError> {
        let settings = self.config.settings(role).ok_or(VmError::InvalidRole(role))?;
        self.create(role, settings.native, settings.entity_capacity)
    }

    /// Frees the role's instance and its commands. Returns false when there
    /// was nothing to free.
    pub fn destroy(&mut self, role: Role) -> bool {
        if self.instances.remove(&role).is_none() {
            return false;
        }
        self.commands.remove_owned_by(role);
        if self.active == role {
            self.active = Role::None;
        }
        info!(%role, "freed script vm");
        true
    }

    /// Makes `role` the bound instance. [`Role::None`] unbinds. Binding a role
    /// with no instance is ignored and returns false.
    pub fn bind(&mut self, role: Role) -> bool {
        if role != Role::None && !self.instances.contains_key(&role) {
            debug!(%role, "bind ignored, no instance");
            return false;
        }
        self.active = role;
        debug!(%role, "bound script VM");
        true
    }

    pub fn active_role(&self) -> Role {
        self.active
    }

    pub fn active(&self) -> Result<&VmInstance, VmError> {
        self.instances
            .get(&self.active)
            .ok_or(VmError::NoActiveInstance)
    }

    pub fn active_mut(&mut self) -> Result<&mut VmInstance, VmError> {
        self.instances
            .get_mut(&self.active)
            .ok_or(VmError::NoActiveInstance)
    }

    pub fn get(&self, role: Role) -> Option<&VmInstance> {
        self.instances.get(&role)
    }

    pub fn get_mut(&mut self, role: Role) -> Option<&mut VmInstance> {
        self.instances.get_mut(&role)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.instances.contains_key(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.instances.keys().copied()
    }

    /// Runs builtin `ordinal` on the bound instance.
    pub fn call_builtin(&mut self, ordinal: u32, world: Option<&dyn WorldQuery>) -> Result<(), VmError> {
        let vm = self
            .instances
            .get_mut(&self.active)
            .ok_or(VmError::NoActiveInstance)?;
        let mut ctx = CallContext {
            vm,
            world,
            developer: self.config.developer,
        };
        self.builtins.call(ordinal, &mut ctx)?;
        Ok(())
    }

    /// Runs a diagnostic command against the instance that owns it.
    pub fn run_command(&self, name: &str, args: &[&str], out: &mut dyn Write) -> Result<(), CommandError> {
        let entry = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        let vm = self
            .instances
            .get(&entry.owner)
            .ok_or(CommandError::NoInstance(entry.owner))?;
        (entry.func)(vm, args, out)
    }

    /// Lists the bound instance's script functions.
    pub fn list_functions(&self, out: &mut dyn Write) -> Result<(), CommandError> {
        let vm = self
            .instances
            .get(&self.active)
            .ok_or(CommandError::NoActiveInstance)?;
        list_functions(vm, self.builtins.script_function_start(), out)
    }

    pub fn builtins_header(&self) -> String {
        self.builtins.header()
    }

    /// Unbinds and frees every instance.
    pub fn shutdown(&mut self) {
        self.bind(Role::None);
        for role in Role::LOADABLE {
            self.destroy(role);
        }
    }
}
