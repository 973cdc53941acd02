//! Host glue that drives the client-side program through its entry points.

use std::cell::Cell;
use std::rc::Rc;

use tracing::info;

use crate::error::{RuntimeError, VmError};
use crate::image::FunctionId;
use crate::instance::VmInstance;
use crate::registry::VmRegistry;
use crate::role::Role;

/// Interpreter entry point. Runs one script function to completion.
pub trait Executor {
    fn execute(&mut self, vm: &mut VmInstance, func: FunctionId, caller: &str) -> Result<(), RuntimeError>;
}

/// Whether draw builtins may run. Open only while `CG_DrawGUI` executes.
#[derive(Debug, Clone, Default)]
pub struct DrawGate(Rc<Cell<bool>>);

impl DrawGate {
    pub fn is_open(&self) -> bool {
        self.0.get()
    }

    fn set(&self, open: bool) {
        self.0.set(open);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryPoints {
    main: FunctionId,
    frame: FunctionId,
    draw_gui: FunctionId,
}

fn entry(vm: &VmInstance, name: &'static str) -> Result<FunctionId, RuntimeError> {
    vm.function_global(name).ok_or(RuntimeError::MissingGlobal(name))
}

/// Per-frame driver for the client game program.
pub struct ClientGame<E> {
    executor: E,
    entry: Option<EntryPoints>,
    gate: DrawGate,
}

impl<E: Executor> ClientGame<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            entry: None,
            gate: DrawGate::default(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn is_active(&self) -> bool {
        self.entry.is_some()
    }

    /// Shared handle for draw builtins to check.
    pub fn draw_gate(&self) -> DrawGate {
        self.gate.clone()
    }

    /// Draw calls need the renderer ready and the draw phase open.
    pub fn can_draw(&self, refresh_ready: bool) -> bool {
        refresh_ready && self.gate.is_open()
    }

    /// Creates the client instance, resolves `CG_Main`, `CG_Frame` and
    /// `CG_DrawGUI`, then runs `CG_Main`.
    pub fn init(&mut self, reg: &mut VmRegistry) -> Result<(), VmError> {
        info!("initializing client game");
        reg.bind(Role::None);
        reg.create_from_config(Role::Client)?;
        reg.bind(Role::Client);

        let vm = reg.active_mut()?;
        let points = EntryPoints {
            main: entry(vm, "CG_Main")?,
            frame: entry(vm, "CG_Frame")?,
            draw_gui: entry(vm, "CG_DrawGUI")?,
        };
        self.entry = Some(points);
        self.executor.execute(vm, points.main, "init")?;
        Ok(())
    }

    /// Re-runs `CG_Main`.
    pub fn main(&mut self, reg: &mut VmRegistry) -> Result<(), VmError> {
        let Some(points) = self.entry else {
            return Ok(());
        };
        let vm = reg.get_mut(Role::Client).ok_or(VmError::NoInstance(Role::Client))?;
        self.executor.execute(vm, points.main, "main")?;
        Ok(())
    }

    /// Publishes frame timing to the program and runs `CG_Frame`.
    pub fn frame(
        &mut self,
        reg: &mut VmRegistry,
        frametime: f32,
        time: i32,
        realtime: f32,
        playernum: i32,
    ) -> Result<(), VmError> {
        let Some(points) = self.entry else {
            return Ok(());
        };
        reg.bind(Role::Client);
        let vm = reg.active_mut()?;
        vm.set_float_by_name("frametime", frametime);
        vm.set_float_by_name("time", time as f32);
        vm.set_float_by_name("realtime", realtime);
        vm.set_float_by_name("localplayernum", playernum as f32);
        self.executor.execute(vm, points.frame, "frame")?;
        Ok(())
    }

    /// Runs `CG_DrawGUI` with the draw gate open. Skipped until the client
    /// is fully connected.
    pub fn draw_gui(&mut self, reg: &mut VmRegistry, connected: bool) -> Result<(), VmError> {
        let Some(points) = self.entry else {
            return Ok(());
        };
        if !connected {
            return Ok(());
        }
        let vm = reg.get_mut(Role::Client).ok_or(VmError::NoInstance(Role::Client))?;
        self.gate.set(true);
        let result = self.executor.execute(vm, points.draw_gui, "draw_gui");
        self.gate.set(false);
        Ok(result?)
    }

    pub fn shutdown(&mut self, reg: &mut VmRegistry) {
        self.gate.set(false);
        self.entry = None;
        reg.destroy(Role::Client);
    }
}
