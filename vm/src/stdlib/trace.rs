use crate::builtins::CallContext;
use crate::error::RuntimeError;
use crate::instance::VmInstance;
use crate::world::{clip_move, Sweep, Trace, Vec3, MASK_SHOT, MASK_SOLID};

fn set_float(vm: &mut VmInstance, name: &str, value: f32) {
    vm.set_float_by_name(name, value);
}

fn set_vector(vm: &mut VmInstance, name: &str, value: Vec3) {
    if let Some(ofs) = vm.find_global(name).map(|d| d.slot()) {
        vm.set_global_vector(ofs, value);
    }
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Publishes a trace result through the `trace_*` globals. Globals the
/// program does not declare are skipped.
pub fn write_trace_globals(vm: &mut VmInstance, tr: &Trace) -> Result<(), RuntimeError> {
    set_float(vm, "trace_allsolid", flag(tr.all_solid));
    set_float(vm, "trace_startsolid", flag(tr.start_solid));
    set_float(vm, "trace_fraction", tr.fraction);
    set_vector(vm, "trace_endpos", tr.end_pos);
    set_vector(vm, "trace_plane_normal", tr.plane_normal);
    set_float(vm, "trace_plane_dist", tr.plane_dist);
    set_float(vm, "trace_contents", tr.contents as f32);

    if let Some(ofs) = vm.find_global("trace_ent").map(|d| d.slot()) {
        let handle = vm.entities().handle_for(tr.entity.unwrap_or(0))?;
        if let Some(slot) = vm.globals_mut().get_mut(ofs) {
            *slot = handle.0 as u32;
        }
    }
    Ok(())
}

/// `traceline(v1, v2, nomonsters, forent)`
pub fn native_traceline(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let world = ctx.world.ok_or(RuntimeError::NoWorld)?;
    let start = ctx.vector(0);
    let end = ctx.vector(1);
    let mask = if ctx.float(2) != 0.0 {
        MASK_SOLID
    } else {
        MASK_SHOT
    };
    let ignore = ctx.entity(3)?;

    let sweep = Sweep::ray(start, end, mask).ignoring(ignore);
    let tr = clip_move(world, &sweep);
    write_trace_globals(ctx.vm, &tr)
}

/// `pointcontents(v)`
pub fn native_pointcontents(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let world = ctx.world.ok_or(RuntimeError::NoWorld)?;
    let contents = world.point_contents(ctx.vector(0));
    ctx.return_float(contents as f32);
    Ok(())
}
