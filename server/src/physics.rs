//! Voxel collision and movement integration.
//!
//! Entities are axis-aligned boxes anchored at their feet centre. Grounded
//! movement resolves one axis at a time against the block grid so diagonal
//! gaps between blocks can never be slipped through.

use crate::blocks::BlockStore;
use crate::entity::{MovementMode, Player};
use shared::{
    Vec3, AIR_DAMPING, FLY_FLOOR_OFFSET, FLY_SPEED, FLY_SPRINT_SPEED, GRAVITY, JUMP_VELOCITY,
    MAX_SINK_SPEED, PLAYER_HALF_WIDTH, PLAYER_HEIGHT, SPRINT_ACCELERATION, SWIM_UP_VELOCITY,
    WALK_ACCELERATION, WATER_DAMPING, WATER_GRAVITY,
};

/// Shrinks boxes slightly so faces resting exactly on a cell boundary do not
/// count the neighbouring cell.
const EPSILON: f32 = 1e-4;

const LOS_SAMPLES_PER_UNIT: f32 = 4.0;

/// Axis-aligned bounding box in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box of an entity whose feet centre sits at `position`.
    pub fn for_entity(position: Vec3) -> Self {
        Self {
            min: Vec3::new(
                position.x - PLAYER_HALF_WIDTH,
                position.y,
                position.z - PLAYER_HALF_WIDTH,
            ),
            max: Vec3::new(
                position.x + PLAYER_HALF_WIDTH,
                position.y + PLAYER_HEIGHT,
                position.z + PLAYER_HALF_WIDTH,
            ),
        }
    }

    /// Inclusive integer cell range covered by the box.
    pub fn cell_range(&self) -> ([i32; 3], [i32; 3]) {
        let lo = [
            (self.min.x + EPSILON).floor() as i32,
            (self.min.y + EPSILON).floor() as i32,
            (self.min.z + EPSILON).floor() as i32,
        ];
        let hi = [
            (self.max.x - EPSILON).floor() as i32,
            (self.max.y - EPSILON).floor() as i32,
            (self.max.z - EPSILON).floor() as i32,
        ];
        (lo, hi)
    }

    /// The box grown outward to whole cells.
    pub fn cell_bounds(&self) -> Aabb {
        let (lo, hi) = self.cell_range();
        Aabb {
            min: Vec3::new(lo[0] as f32, lo[1] as f32, lo[2] as f32),
            max: Vec3::new(
                (hi[0] + 1) as f32,
                (hi[1] + 1) as f32,
                (hi[2] + 1) as f32,
            ),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    pub fn covers_cell(&self, x: i32, y: i32, z: i32) -> bool {
        let (lo, hi) = self.cell_range();
        (lo[0]..=hi[0]).contains(&x) && (lo[1]..=hi[1]).contains(&y) && (lo[2]..=hi[2]).contains(&z)
    }

    fn any_cell(&self, mut predicate: impl FnMut(i32, i32, i32) -> bool) -> bool {
        let (lo, hi) = self.cell_range();
        for y in lo[1]..=hi[1] {
            for x in lo[0]..=hi[0] {
                for z in lo[2]..=hi[2] {
                    if predicate(x, y, z) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

pub fn cell_of(point: Vec3) -> (i32, i32, i32) {
    (
        point.x.floor() as i32,
        point.y.floor() as i32,
        point.z.floor() as i32,
    )
}

/// True if any cell covered by the box is solid.
pub fn collides(blocks: &BlockStore, aabb: &Aabb) -> bool {
    aabb.any_cell(|x, y, z| blocks.is_solid(x, y, z))
}

pub fn touches_water(blocks: &BlockStore, aabb: &Aabb) -> bool {
    aabb.any_cell(|x, y, z| blocks.is_water(x, y, z))
}

/// Stepped ray between two points; any solid interior sample blocks it.
pub fn line_of_sight(blocks: &BlockStore, from: Vec3, to: Vec3) -> bool {
    let distance = from.distance(&to);
    let steps = (distance * LOS_SAMPLES_PER_UNIT).ceil().max(1.0) as u32;
    let delta = to - from;
    for i in 1..steps {
        let t = i as f32 / steps as f32;
        let (x, y, z) = cell_of(from + delta * t);
        if blocks.is_solid(x, y, z) {
            return false;
        }
    }
    true
}

/// Clamps a horizontal input vector to unit length.
fn clamp_axes(ax: f32, az: f32) -> (f32, f32) {
    let len = (ax * ax + az * az).sqrt();
    if len > 1.0 {
        (ax / len, az / len)
    } else {
        (ax, az)
    }
}

/// Advances one player by `dt` seconds using its latched input.
pub fn step_player(player: &mut Player, blocks: &BlockStore, dt: f32) {
    match player.mode {
        MovementMode::Grounded => step_grounded(player, blocks, dt),
        MovementMode::FreeFly => step_free_fly(player, blocks, dt),
    }
}

fn step_grounded(player: &mut Player, blocks: &BlockStore, dt: f32) {
    let input = player.input;
    let in_water = touches_water(blocks, &player.hitbox());

    let acceleration = if input.sprint {
        SPRINT_ACCELERATION
    } else {
        WALK_ACCELERATION
    };
    let (ax, az) = clamp_axes(input.ax, input.az);
    player.velocity.x += ax * acceleration * dt;
    player.velocity.z += az * acceleration * dt;

    if input.jump {
        if player.on_ground {
            player.velocity.y = JUMP_VELOCITY;
            player.on_ground = false;
        } else if in_water {
            player.velocity.y = player.velocity.y.max(SWIM_UP_VELOCITY);
        }
    }

    let damping = if in_water {
        player.velocity.y -= WATER_GRAVITY * dt;
        player.velocity.y = player.velocity.y.max(-MAX_SINK_SPEED);
        WATER_DAMPING
    } else {
        player.velocity.y -= GRAVITY * dt;
        AIR_DAMPING
    };
    let decay = damping.powf(dt * 60.0);
    player.velocity.x *= decay;
    player.velocity.z *= decay;

    move_axis(player, blocks, Axis::X, player.velocity.x * dt);
    move_axis(player, blocks, Axis::Y, player.velocity.y * dt);
    move_axis(player, blocks, Axis::Z, player.velocity.z * dt);
}

fn step_free_fly(player: &mut Player, blocks: &BlockStore, dt: f32) {
    let input = player.input;
    let speed = if input.sprint {
        FLY_SPRINT_SPEED
    } else {
        FLY_SPEED
    };
    let mut direction = Vec3::new(input.ax, input.ay, input.az);
    if direction.length() > 1.0 {
        direction = direction.normalize();
    }
    player.velocity = direction * speed;
    player.position += player.velocity * dt;
    player.on_ground = false;

    let (x, _, z) = cell_of(player.position);
    let floor = blocks.surface_height(x, z) as f32 + FLY_FLOOR_OFFSET;
    if player.position.y < floor {
        player.position.y = floor;
        player.velocity.y = 0.0;
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

fn move_axis(player: &mut Player, blocks: &BlockStore, axis: Axis, delta: f32) {
    if delta == 0.0 {
        return;
    }
    let mut candidate = player.position;
    match axis {
        Axis::X => candidate.x += delta,
        Axis::Y => candidate.y += delta,
        Axis::Z => candidate.z += delta,
    }

    if !collides(blocks, &Aabb::for_entity(candidate)) {
        player.position = candidate;
        if let Axis::Y = axis {
            player.on_ground = false;
        }
        return;
    }

    match axis {
        Axis::X => player.velocity.x = 0.0,
        Axis::Z => player.velocity.z = 0.0,
        Axis::Y => {
            player.velocity.y = 0.0;
            if delta < 0.0 {
                player.on_ground = true;
                // Settle onto the top face of the blocking cell instead of
                // hovering up to one step above it.
                let mut resting = player.position;
                resting.y = (candidate.y + EPSILON).floor() + 1.0;
                if resting.y < player.position.y
                    && !collides(blocks, &Aabb::for_entity(resting))
                {
                    player.position = resting;
                }
            }
        }
    }
}
