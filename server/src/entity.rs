use crate::physics::Aabb;
use shared::{InputState, PlayerSnapshot, Vec3, EYE_HEIGHT, MAX_HP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementMode {
    #[default]
    Grounded,
    FreeFly,
}

/// Server-side player entity, one per connected session.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    /// Feet centre.
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
    pub hp: i32,
    pub yaw: f32,
    pub pitch: f32,
    pub mode: MovementMode,
    /// Latched input, consumed by every tick until replaced.
    pub input: InputState,
    /// Dead players ignore input until they respawn.
    pub dead: bool,
}

impl Player {
    pub fn new(id: u32, position: Vec3) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            on_ground: false,
            hp: MAX_HP,
            yaw: 0.0,
            pitch: 0.0,
            mode: MovementMode::Grounded,
            input: InputState::default(),
            dead: false,
        }
    }

    pub fn hitbox(&self) -> Aabb {
        Aabb::for_entity(self.position)
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::new(0.0, EYE_HEIGHT, 0.0)
    }

    /// Latches new input. Look angles apply immediately, forces on the next
    /// tick.
    pub fn set_input(&mut self, input: InputState) {
        self.yaw = input.yaw;
        self.pitch = input.pitch;
        self.mode = if input.fly {
            MovementMode::FreeFly
        } else {
            MovementMode::Grounded
        };
        self.input = input;
    }

    /// Applies damage and returns true when this hit killed the player.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.hp = (self.hp - amount).max(0);
        if self.hp == 0 {
            self.dead = true;
            self.input = InputState::default();
            return true;
        }
        false
    }

    pub fn respawn_at(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.on_ground = false;
        self.hp = MAX_HP;
        self.dead = false;
        self.mode = MovementMode::Grounded;
        self.input = InputState::default();
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            hp: self.hp,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }
}
