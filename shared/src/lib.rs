//! Types and tuning constants shared by the server and any client.

pub mod block;
pub mod math;
pub mod protocol;

pub use block::BlockType;
pub use math::Vec3;
pub use protocol::{
    BlockAction, BlockRecord, ClientMessage, InputState, NpcKind, NpcSnapshot, OwnerKind,
    PlayerSnapshot, ServerMessage,
};

// World bounds
pub const WORLD_MIN_Y: i32 = 0;
pub const WORLD_MAX_Y: i32 = 128;
pub const WORLD_HORIZONTAL_LIMIT: i32 = 256;

// Entity hitbox, shared by players and NPCs. Position is the feet centre.
pub const PLAYER_HALF_WIDTH: f32 = 0.3;
pub const PLAYER_HEIGHT: f32 = 1.8;
pub const EYE_HEIGHT: f32 = 1.6;
pub const MAX_HP: i32 = 100;

// Grounded movement
pub const GRAVITY: f32 = 25.0;
pub const WATER_GRAVITY: f32 = 8.0;
pub const MAX_SINK_SPEED: f32 = 2.0;
/// Fraction of horizontal velocity kept per 1/60 s.
pub const AIR_DAMPING: f32 = 0.8;
pub const WATER_DAMPING: f32 = 0.6;
pub const WALK_ACCELERATION: f32 = 25.0;
pub const SPRINT_ACCELERATION: f32 = 40.0;
pub const JUMP_VELOCITY: f32 = 9.0;
pub const SWIM_UP_VELOCITY: f32 = 3.0;

// Free-fly movement
pub const FLY_SPEED: f32 = 10.0;
pub const FLY_SPRINT_SPEED: f32 = 20.0;
pub const FLY_FLOOR_OFFSET: f32 = 1.0;

// Combat
pub const PROJECTILE_SPEED: f32 = 40.0;
pub const PROJECTILE_TTL: f32 = 2.0;
pub const PROJECTILE_DAMAGE: i32 = 25;
pub const THREAT_DURATION: f32 = 10.0;
