use memory::{ArenaTag, NativeLayout};
use vm::image::BinaryImage;
use vm::{
    parse_entity, parse_entity_lump, parse_globals, write_entity, write_globals, EpairError,
    ImageBuilder, Role, StringRef, ValueType, VmError, VmInstance,
};

// ======================================================================
// Helpers
// ======================================================================

fn image() -> BinaryImage {
    let mut b = ImageBuilder::new();
    b.function("monster_think", "ai.qc", 0);
    b.global_float("gravity", 800.0);
    b.saved_global("serverflags", ValueType::Float);
    b.saved_global("nextmap", ValueType::String);
    b.saved_global("spawn_spot", ValueType::Vector);
    b.saved_global("resume", ValueType::Function);
    b.field("classname", ValueType::String);
    b.field("message", ValueType::String);
    b.field("health", ValueType::Float);
    b.vector_field("origin");
    b.vector_field("angles");
    b.field("enemy", ValueType::Entity);
    b.field("think", ValueType::Function);
    b.build()
}

fn instance() -> VmInstance {
    VmInstance::from_image(Role::Server, image(), NativeLayout::default(), 8).expect("instance")
}

fn field(vm: &VmInstance, name: &str) -> usize {
    vm.find_field(name).expect("field").slot()
}

fn global(vm: &VmInstance, name: &str) -> usize {
    vm.find_global(name).expect("global").slot()
}

fn field_string(vm: &VmInstance, num: usize, name: &str) -> String {
    let raw = vm.entities().fields(num).unwrap()[field(vm, name)];
    vm.string(StringRef::from_raw(raw))
        .map(|s| s.into_owned())
        .unwrap_or_default()
}

const LUMP: &str = r#"
// two entities
{
"classname" "worldspawn"
"_color" "1 0 0"
"message" "The Slipgate Complex"
}
{
"classname" "info_player_start"
"origin" "480 -352 88"
"angle" "90"
"light" "300"
}
"#;

// ======================================================================
// Entity lump
// ======================================================================

#[test]
fn test_entity_lump_fills_records_in_order() {
    let mut vm = instance();
    let spawned = parse_entity_lump(&mut vm, LUMP).unwrap();
    assert_eq!(spawned, [0, 1]);
    assert_eq!(vm.num_entities(), 2);

    assert_eq!(field_string(&vm, 0, "classname"), "worldspawn");
    assert_eq!(field_string(&vm, 0, "message"), "The Slipgate Complex");
    assert_eq!(field_string(&vm, 1, "classname"), "info_player_start");

    let origin = field(&vm, "origin");
    let angles = field(&vm, "angles");
    assert_eq!(vm.entities().vector(1, origin).unwrap(), [480.0, -352.0, 88.0]);
    // a lone yaw is widened to a full angle vector
    assert_eq!(vm.entities().vector(1, angles).unwrap(), [0.0, 90.0, 0.0]);
}

#[test]
fn test_entity_lump_unknown_function_is_fatal() {
    let mut vm = instance();
    let err = parse_entity_lump(&mut vm, "{ \"think\" \"no_such_think\" }").unwrap_err();
    assert!(matches!(
        err,
        VmError::Epair(EpairError::UnknownFunction(ref name)) if name == "no_such_think"
    ));
}

#[test]
fn test_entity_lump_syntax_errors() {
    let mut vm = instance();
    assert!(matches!(
        parse_entity_lump(&mut vm, "{ \"classname\" \"light\""),
        Err(VmError::Epair(EpairError::Syntax(_)))
    ));

    let mut vm = instance();
    assert!(matches!(
        parse_entity_lump(&mut vm, "\"classname\" \"light\" }"),
        Err(VmError::Epair(EpairError::Syntax(_)))
    ));
}

#[test]
fn test_entity_lump_exhausts_pool() {
    let mut vm = VmInstance::from_image(Role::Server, image(), NativeLayout::default(), 1)
        .expect("instance");
    assert!(matches!(
        parse_entity_lump(&mut vm, LUMP),
        Err(VmError::NoFreeEntities(1))
    ));
}

#[test]
fn test_empty_lump() {
    let mut vm = instance();
    assert!(parse_entity_lump(&mut vm, "  // nothing here\n").unwrap().is_empty());
}

// ======================================================================
// Save blocks
// ======================================================================

#[test]
fn test_globals_round_trip() {
    let mut vm = instance();
    let flags = global(&vm, "serverflags");
    let spot = global(&vm, "spawn_spot");
    let gravity = global(&vm, "gravity");
    vm.set_global_float(flags, 3.0);
    vm.set_global_vector(spot, [1.0, -2.5, 64.0]);
    vm.set_global_float(gravity, 100.0);
    parse_globals(&mut vm, "{ \"nextmap\" \"e1m2\" \"resume\" \"monster_think\" }").unwrap();

    let text = write_globals(&vm);
    assert!(text.starts_with("{\n"));
    assert!(text.contains("\"serverflags\" \"3\"\n"));
    assert!(text.contains("\"nextmap\" \"e1m2\"\n"));
    assert!(text.contains("\"resume\" \"monster_think\"\n"));
    // only flagged globals are saved
    assert!(!text.contains("gravity"));

    let mut restored = instance();
    let applied = parse_globals(&mut restored, &text).unwrap();
    assert_eq!(applied, 4);
    assert_eq!(restored.global_float(flags), Some(3.0));
    assert_eq!(restored.global_vector(spot), Some([1.0, -2.5, 64.0]));
    assert_eq!(restored.global_float(gravity), Some(800.0));
    assert_eq!(
        restored.function_global("resume"),
        restored.find_function("monster_think")
    );
    assert_eq!(write_globals(&restored), text);
}

#[test]
fn test_globals_unknown_names_skipped() {
    let mut vm = instance();
    let applied = parse_globals(&mut vm, "{ \"nosuch\" \"1\" \"serverflags\" \"2\" }").unwrap();
    assert_eq!(applied, 1);
    assert_eq!(parse_globals(&mut vm, "").unwrap(), 0);
}

#[test]
fn test_entity_round_trip() {
    let mut vm = instance();
    parse_entity_lump(
        &mut vm,
        "{ \"classname\" \"monster_army\" \"health\" \"30\" \"origin\" \"8 16 -24\" \
           \"enemy\" \"0\" \"think\" \"monster_think\" }",
    )
    .unwrap();

    let text = write_entity(&vm, 0).unwrap();
    assert!(text.contains("\"health\" \"30\"\n"));
    assert!(text.contains("\"origin\" \"8 16 -24\"\n"));
    assert!(!text.contains("origin_x"));
    // zero-valued fields are left out
    assert!(!text.contains("angles"));
    assert!(!text.contains("enemy"));

    let mut restored = instance();
    restored.alloc_entity().unwrap();
    parse_entity(&mut restored, 0, &text).unwrap();
    assert_eq!(field_string(&restored, 0, "classname"), "monster_army");
    let health = field(&restored, "health");
    assert_eq!(restored.entities().float(0, health).unwrap(), 30.0);
    assert_eq!(write_entity(&restored, 0).unwrap(), text);
}

#[test]
fn test_parse_entity_clears_previous_fields() {
    let mut vm = instance();
    vm.alloc_entity().unwrap();
    let health = field(&vm, "health");
    let origin = field(&vm, "origin");
    vm.entities_mut().set_float(0, health, 99.0).unwrap();

    parse_entity(&mut vm, 0, "{ \"origin\" \"1 1 1\" }").unwrap();
    assert_eq!(vm.entities().float(0, health).unwrap(), 0.0);
    assert_eq!(vm.entities().vector(0, origin).unwrap(), [1.0, 1.0, 1.0]);

    assert!(matches!(
        parse_entity(&mut vm, 0, ""),
        Err(EpairError::Syntax(_))
    ));
}

const AWKWARD: [&str; 4] = [
    r"C:\maps\e1m1",
    r#"say "hi" to \everyone\"#,
    "first line\nsecond line",
    r#"{ "nested" "block" }"#,
];

#[test]
fn test_entity_strings_with_escapes_round_trip() {
    let mut vm = instance();
    let message = field(&vm, "message");
    for text in AWKWARD {
        vm.new_level();
        vm.alloc_entity().unwrap();
        let r = vm.new_string(text.to_string(), ArenaTag::Level).unwrap();
        vm.entities_mut().fields_mut(0).unwrap()[message] = r.raw();

        let saved = write_entity(&vm, 0).unwrap();
        let mut restored = instance();
        restored.alloc_entity().unwrap();
        parse_entity(&mut restored, 0, &saved).unwrap();
        assert_eq!(field_string(&restored, 0, "message"), text);
        assert_eq!(write_entity(&restored, 0).unwrap(), saved);
    }
}

#[test]
fn test_global_strings_with_escapes_round_trip() {
    let mut vm = instance();
    parse_globals(&mut vm, "{ \"resume\" \"monster_think\" }").unwrap();
    let nextmap = global(&vm, "nextmap");
    for text in AWKWARD {
        let r = vm.new_string(text.to_string(), ArenaTag::Level).unwrap();
        vm.globals_mut()[nextmap] = r.raw();

        let saved = write_globals(&vm);
        let mut restored = instance();
        assert_eq!(parse_globals(&mut restored, &saved).unwrap(), 4);
        let raw = restored.globals()[nextmap];
        assert_eq!(restored.string(StringRef::from_raw(raw)).unwrap(), text);
    }
}

#[test]
fn test_level_string_goes_stale_after_new_level() {
    let mut vm = instance();
    parse_globals(&mut vm, "{ \"nextmap\" \"e1m2\" }").unwrap();
    let nextmap = global(&vm, "nextmap");
    let stale = StringRef::from_raw(vm.globals()[nextmap]);
    assert_eq!(vm.string(stale).unwrap(), "e1m2");

    // globals survive a level change but the string they point at does not
    vm.new_level();
    parse_entity_lump(&mut vm, "{ \"message\" \"secret\" }").unwrap();
    assert_eq!(field_string(&vm, 0, "message"), "secret");
    assert_eq!(vm.string(stale), None);
}
