use vm::{
    ClientGame, DrawGate, Executor, FunctionId, ImageBuilder, MemoryFileSystem, Role,
    RuntimeConfig, RuntimeError, ValueType, VmError, VmInstance, VmRegistry,
};

// ======================================================================
// Helpers
// ======================================================================

#[derive(Debug, Clone, PartialEq)]
struct Call {
    func: String,
    caller: String,
    gate_open: bool,
    frametime: Option<f32>,
}

/// Records every entry-point invocation instead of interpreting it.
#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    gate: Option<DrawGate>,
    fail_on: Option<&'static str>,
}

impl Executor for Recorder {
    fn execute(&mut self, vm: &mut VmInstance, func: FunctionId, caller: &str) -> Result<(), RuntimeError> {
        let name = vm.image().function_name(func).into_owned();
        let frametime = vm
            .find_global("frametime")
            .and_then(|d| vm.global_float(d.slot()));
        self.calls.push(Call {
            func: name.clone(),
            caller: caller.to_string(),
            gate_open: self.gate.as_ref().is_some_and(DrawGate::is_open),
            frametime,
        });
        if self.fail_on == Some(caller) {
            return Err(RuntimeError::Execution {
                function: name,
                reason: "scripted failure".into(),
            });
        }
        Ok(())
    }
}

fn client_progs(with_draw: bool) -> Vec<u8> {
    let mut b = ImageBuilder::new();
    let main = b.function("CG_Main", "cg_main.qc", 0);
    let frame = b.function("CG_Frame", "cg_main.qc", 0);
    let draw = b.function("CG_DrawGUI", "cg_gui.qc", 0);
    b.global_function("CG_Main", main);
    b.global_function("CG_Frame", frame);
    if with_draw {
        b.global_function("CG_DrawGUI", draw);
    }
    b.global("frametime", ValueType::Float);
    b.global("time", ValueType::Float);
    b.global("realtime", ValueType::Float);
    b.global("localplayernum", ValueType::Float);
    b.to_bytes()
}

fn registry(with_draw: bool) -> VmRegistry {
    let fs = MemoryFileSystem::new().with_file("progs/client.dat", client_progs(with_draw));
    VmRegistry::new(RuntimeConfig::default(), fs)
}

fn game() -> ClientGame<Recorder> {
    let mut game = ClientGame::new(Recorder::default());
    let gate = game.draw_gate();
    game.executor_mut().gate = Some(gate);
    game
}

fn called(game: &ClientGame<Recorder>) -> Vec<(&str, &str)> {
    game.executor()
        .calls
        .iter()
        .map(|c| (c.func.as_str(), c.caller.as_str()))
        .collect()
}

// ======================================================================
// Lifecycle
// ======================================================================

#[test]
fn test_init_binds_client_and_runs_main() {
    let mut reg = registry(true);
    let mut game = game();
    assert!(!game.is_active());

    game.init(&mut reg).unwrap();
    assert!(game.is_active());
    assert_eq!(reg.active_role(), Role::Client);
    assert_eq!(called(&game), [("CG_Main", "init")]);
}

#[test]
fn test_missing_entry_point() {
    let mut reg = registry(false);
    let mut game = game();
    let err = game.init(&mut reg).unwrap_err();
    assert!(matches!(
        err,
        VmError::Runtime(RuntimeError::MissingGlobal("CG_DrawGUI"))
    ));
    assert!(!game.is_active());
    assert!(game.executor().calls.is_empty());
}

#[test]
fn test_frame_publishes_timing() {
    let mut reg = registry(true);
    let mut game = game();
    game.init(&mut reg).unwrap();

    game.frame(&mut reg, 0.016, 1250, 3.5, 2).unwrap();
    let last = game.executor().calls.last().unwrap().clone();
    assert_eq!(last.func, "CG_Frame");
    assert_eq!(last.frametime, Some(0.016));

    let vm = reg.get(Role::Client).unwrap();
    let value = |name: &str| vm.global_float(vm.find_global(name).unwrap().slot());
    assert_eq!(value("time"), Some(1250.0));
    assert_eq!(value("realtime"), Some(3.5));
    assert_eq!(value("localplayernum"), Some(2.0));
}

#[test]
fn test_frame_rebinds_client() {
    let mut reg = registry(true);
    let mut game = game();
    game.init(&mut reg).unwrap();
    reg.bind(Role::None);

    game.frame(&mut reg, 0.1, 0, 0.0, 0).unwrap();
    assert_eq!(reg.active_role(), Role::Client);
}

#[test]
fn test_draw_gate_open_only_during_draw() {
    let mut reg = registry(true);
    let mut game = game();
    game.init(&mut reg).unwrap();

    // not connected yet
    game.draw_gui(&mut reg, false).unwrap();
    assert_eq!(game.executor().calls.len(), 1);

    game.draw_gui(&mut reg, true).unwrap();
    let draw = game.executor().calls.last().unwrap();
    assert_eq!(draw.func, "CG_DrawGUI");
    assert!(draw.gate_open);
    assert!(!game.draw_gate().is_open());
    assert!(!game.can_draw(true));

    game.frame(&mut reg, 0.1, 0, 0.0, 0).unwrap();
    assert!(!game.executor().calls.last().unwrap().gate_open);
}

#[test]
fn test_draw_failure_closes_gate() {
    let mut reg = registry(true);
    let mut game = game();
    game.init(&mut reg).unwrap();
    game.executor_mut().fail_on = Some("draw_gui");

    let err = game.draw_gui(&mut reg, true).unwrap_err();
    assert!(matches!(err, VmError::Runtime(RuntimeError::Execution { .. })));
    assert!(!game.draw_gate().is_open());
}

#[test]
fn test_inactive_game_is_a_no_op() {
    let mut reg = registry(true);
    let mut game = game();
    game.main(&mut reg).unwrap();
    game.frame(&mut reg, 0.1, 0, 0.0, 0).unwrap();
    game.draw_gui(&mut reg, true).unwrap();
    assert!(game.executor().calls.is_empty());
    assert!(!reg.contains(Role::Client));
}

#[test]
fn test_shutdown_frees_client() {
    let mut reg = registry(true);
    let mut game = game();
    game.init(&mut reg).unwrap();
    game.main(&mut reg).unwrap();
    assert_eq!(called(&game), [("CG_Main", "init"), ("CG_Main", "main")]);

    game.shutdown(&mut reg);
    assert!(!game.is_active());
    assert!(!reg.contains(Role::Client));
    assert_eq!(reg.active_role(), Role::None);
}
