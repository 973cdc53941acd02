//! Collision queries consumed by the physics builtins. The geometry itself
//! lives in the host; this module only fixes how world and entity results
//! are combined.

pub type Vec3 = [f32; 3];

pub const CONTENTS_SOLID: i32 = 1;
pub const CONTENTS_WINDOW: i32 = 2;
pub const CONTENTS_MONSTER: i32 = 0x0200_0000;
pub const CONTENTS_DEADMONSTER: i32 = 0x0400_0000;

pub const MASK_SOLID: i32 = CONTENTS_SOLID | CONTENTS_WINDOW;
pub const MASK_SHOT: i32 = CONTENTS_SOLID | CONTENTS_MONSTER | CONTENTS_WINDOW | CONTENTS_DEADMONSTER;

/// Result of a ray or box sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    /// The sweep never left solid space.
    pub all_solid: bool,
    /// The sweep started inside solid space.
    pub start_solid: bool,
    /// Portion of the move completed, 1.0 when nothing was hit.
    pub fraction: f32,
    pub end_pos: Vec3,
    pub plane_normal: Vec3,
    pub plane_dist: f32,
    pub contents: i32,
    /// Entity that blocked the move; 0 is the world.
    pub entity: Option<usize>,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            all_solid: false,
            start_solid: false,
            fraction: 1.0,
            end_pos: [0.0; 3],
            plane_normal: [0.0; 3],
            plane_dist: 0.0,
            contents: 0,
            entity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub start: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub end: Vec3,
    pub content_mask: i32,
    /// Entity excluded from the test, usually the mover itself.
    pub ignore: Option<usize>,
}

impl Sweep {
    /// A zero-size ray.
    pub fn ray(start: Vec3, end: Vec3, content_mask: i32) -> Self {
        Self {
            start,
            mins: [0.0; 3],
            maxs: [0.0; 3],
            end,
            content_mask,
            ignore: None,
        }
    }

    pub fn ignoring(mut self, num: usize) -> Self {
        self.ignore = Some(num);
        self
    }
}

/// Host-side collision model.
pub trait WorldQuery {
    /// Sweep against static world geometry only.
    fn trace_world(&self, sweep: &Sweep) -> Trace;

    /// Entities that take part in collision, in iteration order.
    fn solid_entities(&self) -> Vec<usize>;

    /// Sweep against one entity's hull.
    fn trace_entity(&self, num: usize, sweep: &Sweep) -> Trace;

    /// Contents at `point`, world and brush entities combined.
    fn point_contents(&self, point: Vec3) -> i32;
}

/// Sweeps against the world, then against every solid entity.
///
/// A world hit at fraction 0 returns at once, attributed to the world. An
/// entity result replaces the current one when it is all-solid, start-solid
/// or strictly nearer; once the current result is all-solid the remaining
/// entities are skipped. Start-solid, once set, is never cleared.
pub fn clip_move(world: &dyn WorldQuery, sweep: &Sweep) -> Trace {
    let mut tr = world.trace_world(sweep);
    if tr.fraction == 0.0 {
        tr.entity = Some(0);
        return tr;
    }

    for num in world.solid_entities() {
        if sweep.ignore == Some(num) {
            continue;
        }
        if tr.all_solid {
            break;
        }

        let mut trace = world.trace_entity(num, sweep);
        if trace.all_solid || trace.start_solid || trace.fraction < tr.fraction {
            trace.entity = Some(num);
            let was_start_solid = tr.start_solid;
            tr = trace;
            tr.start_solid |= was_start_solid;
        } else if trace.start_solid {
            tr.start_solid = true;
        }
    }
    tr
}
