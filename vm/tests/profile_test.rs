use std::time::{Duration, Instant};

use memory::NativeLayout;
use vm::profile::{drain_top, PROFILE_LINES};
use vm::{FunctionId, ImageBuilder, Profiler, Role, VmInstance};

fn instance(functions: usize) -> (VmInstance, Vec<FunctionId>) {
    let mut b = ImageBuilder::new();
    let ids = (0..functions)
        .map(|i| b.function(&format!("fn{i}"), "prof.qc", 0))
        .collect();
    let vm = VmInstance::from_image(Role::Server, b.build(), NativeLayout::default(), 1)
        .expect("instance");
    (vm, ids)
}

fn calls(vm: &mut VmInstance, id: FunctionId, n: u32) {
    for _ in 0..n {
        vm.record_call(id);
    }
}

#[test]
fn test_busiest_first_with_table_order_ties() {
    let (mut vm, ids) = instance(4);
    calls(&mut vm, ids[0], 3);
    calls(&mut vm, ids[1], 9);
    calls(&mut vm, ids[2], 3);

    let lines = drain_top(&mut vm, PROFILE_LINES);
    assert_eq!(lines, ["      9:fn1", "      3:fn0", "      3:fn2"]);

    // everything reported was reset
    assert!(drain_top(&mut vm, PROFILE_LINES).is_empty());
}

#[test]
fn test_only_reported_counters_reset() {
    let (mut vm, ids) = instance(12);
    for (i, &id) in ids.iter().enumerate() {
        calls(&mut vm, id, 20 - i as u32);
    }

    let lines = drain_top(&mut vm, PROFILE_LINES);
    assert_eq!(lines.len(), PROFILE_LINES);
    assert_eq!(lines[0], "     20:fn0");

    // fn10 and fn11 fell outside the report and keep their counts
    assert_eq!(vm.function(ids[10]).unwrap().profile, 10);
    assert_eq!(vm.function(ids[11]).unwrap().profile, 9);
    assert_eq!(vm.function(ids[0]).unwrap().profile, 0);

    let lines = drain_top(&mut vm, PROFILE_LINES);
    assert_eq!(lines, ["     10:fn10", "      9:fn11"]);
}

#[test]
fn test_profiler_respects_interval() {
    let (mut vm, ids) = instance(1);
    let mut profiler = Profiler::with_interval(Duration::from_millis(100));
    let t0 = Instant::now();

    calls(&mut vm, ids[0], 5);
    assert!(profiler.sample(&mut vm, t0));
    assert_eq!(profiler.lines(), ["      5:fn0"]);

    calls(&mut vm, ids[0], 2);
    assert!(!profiler.sample(&mut vm, t0 + Duration::from_millis(50)));
    assert!(!profiler.sample(&mut vm, t0 + Duration::from_millis(100)));
    assert_eq!(profiler.lines(), ["      5:fn0"]);

    assert!(profiler.sample(&mut vm, t0 + Duration::from_millis(101)));
    assert_eq!(profiler.lines(), ["      2:fn0"]);
}
