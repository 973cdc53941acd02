use memory::{ArenaTag, NativeLayout};
use vm::{
    parse_epair, EpairError, EpairTarget, FunctionId, ImageBuilder, Role, StringRef, ValueType,
    VmInstance,
};

struct Fixture {
    vm: VmInstance,
    think: FunctionId,
}

fn fixture() -> Fixture {
    let mut b = ImageBuilder::new();
    let think = b.function("monster_think", "ai.qc", 0);
    b.global_float("gravity", 800.0);
    b.global("spawn_point", ValueType::Vector);
    b.field("health", ValueType::Float);
    b.vector_field("origin");
    b.field("message", ValueType::String);
    b.field("enemy", ValueType::Entity);
    b.field("think", ValueType::Function);
    b.field("aimfield", ValueType::Field);
    let vm = VmInstance::from_image(Role::Server, b.build(), NativeLayout::default(), 8)
        .expect("instance");
    Fixture { vm, think }
}

fn apply(vm: &mut VmInstance, num: usize, key: &str, text: &str) -> Result<(), EpairError> {
    let def = *vm.find_field(key).expect("field");
    parse_epair(vm, EpairTarget::Entity(num), def, text)
}

fn field_raw(vm: &VmInstance, num: usize, key: &str) -> u32 {
    let def = vm.find_field(key).expect("field");
    vm.entities().fields(num).unwrap()[def.slot()]
}

#[test]
fn test_vector_epair() {
    let Fixture { mut vm, .. } = fixture();
    apply(&mut vm, 1, "origin", "1 2 3").unwrap();
    let ofs = vm.find_field("origin").unwrap().slot();
    assert_eq!(vm.entities().vector(1, ofs).unwrap(), [1.0, 2.0, 3.0]);

    // missing components are left at zero
    apply(&mut vm, 2, "origin", "5").unwrap();
    assert_eq!(vm.entities().vector(2, ofs).unwrap(), [5.0, 0.0, 0.0]);
}

#[test]
fn test_string_epair_unescapes_newline() {
    let Fixture { mut vm, .. } = fixture();
    apply(&mut vm, 0, "message", "a\\nb").unwrap();

    let r = StringRef::from_raw(field_raw(&vm, 0, "message"));
    let handle = r.arena_handle().expect("arena string");
    assert_eq!(vm.strings().tag_of(handle), Some(ArenaTag::Level));

    let text = vm.string(r).unwrap();
    assert_eq!(text, "a\nb");
    assert_eq!(text.chars().count(), 3);
}

#[test]
fn test_string_epair_out_of_range_allocates_nothing() {
    let Fixture { mut vm, .. } = fixture();
    let before = vm.strings().len();
    let err = apply(&mut vm, 99, "message", "lost").unwrap_err();
    assert!(matches!(err, EpairError::Memory(_)));
    assert_eq!(vm.strings().len(), before);
    assert_eq!(vm.strings().bytes_allocated(), 0);
}

#[test]
fn test_level_strings_freed_on_new_level() {
    let Fixture { mut vm, .. } = fixture();
    apply(&mut vm, 0, "message", "hello").unwrap();
    let r = StringRef::from_raw(field_raw(&vm, 0, "message"));
    assert!(vm.string(r).is_some());

    vm.new_level();
    assert!(vm.string(r).is_none());
    assert!(vm.entities().is_blank(0).unwrap());
}

#[test]
fn test_float_epair_is_lenient() {
    let Fixture { mut vm, .. } = fixture();
    apply(&mut vm, 0, "health", "75.5").unwrap();
    assert_eq!(f32::from_bits(field_raw(&vm, 0, "health")), 75.5);
    apply(&mut vm, 0, "health", "junk").unwrap();
    assert_eq!(f32::from_bits(field_raw(&vm, 0, "health")), 0.0);
}

#[test]
fn test_entity_epair_stores_handle() {
    let Fixture { mut vm, .. } = fixture();
    apply(&mut vm, 1, "enemy", "2").unwrap();
    let stride = vm.entity_size() as u32;
    assert_eq!(field_raw(&vm, 1, "enemy"), 2 * stride);

    // past the pool
    assert!(matches!(
        apply(&mut vm, 1, "enemy", "99"),
        Err(EpairError::Memory(_))
    ));
}

#[test]
fn test_field_epair_soft_failure() {
    let Fixture { mut vm, .. } = fixture();
    let err = apply(&mut vm, 0, "aimfield", "no_such_field").unwrap_err();
    assert!(matches!(err, EpairError::UnknownField(ref name) if name == "no_such_field"));
    assert!(!err.is_fatal());

    apply(&mut vm, 0, "aimfield", "health").unwrap();
    let health = vm.find_field("health").unwrap().offset as u32;
    assert_eq!(field_raw(&vm, 0, "aimfield"), health);
}

#[test]
fn test_function_epair() {
    let Fixture { mut vm, think } = fixture();
    apply(&mut vm, 0, "think", "monster_think").unwrap();
    assert_eq!(field_raw(&vm, 0, "think"), think.0);

    let err = apply(&mut vm, 0, "think", "missing_fn").unwrap_err();
    assert!(matches!(err, EpairError::UnknownFunction(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_global_target() {
    let Fixture { mut vm, .. } = fixture();
    let gravity = *vm.find_global("gravity").unwrap();
    parse_epair(&mut vm, EpairTarget::Globals, gravity, "100").unwrap();
    assert_eq!(vm.global_float(gravity.slot()), Some(100.0));

    let spawn = *vm.find_global("spawn_point").unwrap();
    parse_epair(&mut vm, EpairTarget::Globals, spawn, "-1 0.5 8").unwrap();
    assert_eq!(vm.global_vector(spawn.slot()), Some([-1.0, 0.5, 8.0]));
}

#[test]
fn test_entity_out_of_range() {
    let Fixture { mut vm, .. } = fixture();
    assert!(matches!(
        apply(&mut vm, 8, "health", "1"),
        Err(EpairError::Memory(_))
    ));
}
