use crate::blocks::{BlockPos, BlockStore};
use crate::combat::{update_projectiles, Projectile, ProjectileOwner, Targets};
use crate::entity::Player;
use crate::events::GameEvent;
use crate::npc::{update_npcs, AiContext, Npc};
use crate::physics::{step_player, Aabb};
use crate::threat::ThreatLedger;
use crate::worldgen::{self, find_safe_spawn, GEN_HALF_EXTENT};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    BlockType, InputState, NpcKind, ServerMessage, Vec3, PROJECTILE_SPEED, PROJECTILE_TTL,
};
use std::collections::BTreeMap;

/// Ring radius searched around the origin for player spawns.
const SPAWN_SEARCH_RADIUS: i32 = 24;
const NPC_PLACEMENT_ATTEMPTS: usize = 64;

/// The authoritative world: terrain, every entity, and the events produced
/// since the last broadcast.
///
/// Entity tables are ordered maps so a given seed and input sequence always
/// simulate the same way.
#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    blocks: BlockStore,
    players: BTreeMap<u32, Player>,
    npcs: BTreeMap<u32, Npc>,
    projectiles: Vec<Projectile>,
    threat: ThreatLedger,
    events: Vec<GameEvent>,
    rng: StdRng,
    next_npc_id: u32,
}

impl GameState {
    /// Empty world with only the implicit floor. No NPCs.
    pub fn flat(seed: u64) -> Self {
        Self {
            tick: 0,
            blocks: BlockStore::new(),
            players: BTreeMap::new(),
            npcs: BTreeMap::new(),
            projectiles: Vec::new(),
            threat: ThreatLedger::new(),
            events: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            next_npc_id: 1,
        }
    }

    /// Generates a town from `seed` and populates it.
    pub fn generate(seed: u64, villagers: usize, police: usize) -> Self {
        let mut state = Self::flat(seed);
        worldgen::generate(&mut state.blocks, &mut state.rng);
        state.populate(NpcKind::Villager, villagers);
        state.populate(NpcKind::Police, police);
        info!(
            "World ready: {} blocks, {} NPCs (seed {})",
            state.blocks.len(),
            state.npcs.len(),
            seed
        );
        state
    }

    fn populate(&mut self, kind: NpcKind, count: usize) {
        for _ in 0..count {
            if let Some(spot) = self.random_npc_spot() {
                self.spawn_npc(kind, spot);
            }
        }
    }

    /// Random dry column in the generated area with ground no higher than a
    /// single step.
    fn random_npc_spot(&mut self) -> Option<Vec3> {
        for _ in 0..NPC_PLACEMENT_ATTEMPTS {
            let x = self.rng.gen_range(-GEN_HALF_EXTENT..GEN_HALF_EXTENT);
            let z = self.rng.gen_range(-GEN_HALF_EXTENT..GEN_HALF_EXTENT);
            let surface = self.blocks.surface_height(x, z);
            if surface <= 1 && !self.blocks.is_water(x, surface, z) {
                return Some(Vec3::new(x as f32 + 0.5, surface as f32, z as f32 + 0.5));
            }
        }
        None
    }

    pub fn spawn_npc(&mut self, kind: NpcKind, position: Vec3) -> u32 {
        let id = self.next_npc_id;
        self.next_npc_id += 1;
        self.npcs.insert(id, Npc::new(id, kind, position));
        id
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn npc(&self, id: u32) -> Option<&Npc> {
        self.npcs.get(&id)
    }

    pub fn npc_mut(&mut self, id: u32) -> Option<&mut Npc> {
        self.npcs.get_mut(&id)
    }

    pub fn npcs(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn threat(&self) -> &ThreatLedger {
        &self.threat
    }

    /// Adds a player at a safe spawn near the origin and returns the spot.
    pub fn add_player(&mut self, id: u32) -> Vec3 {
        let spawn = find_safe_spawn(&self.blocks, 0, 0, SPAWN_SEARCH_RADIUS);
        self.players.insert(id, Player::new(id, spawn));
        info!(
            "Added player {} at ({:.1}, {:.1}, {:.1})",
            id, spawn.x, spawn.y, spawn.z
        );
        spawn
    }

    pub fn remove_player(&mut self, id: u32) -> bool {
        self.threat.forget(id);
        let removed = self.players.remove(&id).is_some();
        if removed {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Latches input for the next tick. Dead or unknown players are ignored.
    pub fn apply_input(&mut self, id: u32, input: InputState) {
        match self.players.get_mut(&id) {
            Some(player) if !player.dead => player.set_input(input),
            Some(_) => debug!("Ignoring input from dead player {}", id),
            None => debug!("Ignoring input for unknown player {}", id),
        }
    }

    /// Places a block unless it is out of bounds, unchanged, or would trap a
    /// living entity.
    pub fn place_block(&mut self, x: i32, y: i32, z: i32, block: BlockType) -> bool {
        if !BlockPos::new(x, y, z).in_bounds() {
            return false;
        }
        if block.is_solid() && self.cell_occupied(x, y, z) {
            debug!("Refusing block at ({}, {}, {}): occupied", x, y, z);
            return false;
        }
        let changed = self.blocks.set_block(x, y, z, block);
        if changed {
            self.events.push(GameEvent::BlockSet { x, y, z, block });
        }
        changed
    }

    fn cell_occupied(&self, x: i32, y: i32, z: i32) -> bool {
        let player_inside = self
            .players
            .values()
            .any(|player| !player.dead && player.hitbox().covers_cell(x, y, z));
        let npc_inside = self
            .npcs
            .values()
            .any(|npc| Aabb::for_entity(npc.position).covers_cell(x, y, z));
        player_inside || npc_inside
    }

    pub fn remove_block(&mut self, x: i32, y: i32, z: i32) -> bool {
        let removed = self.blocks.remove_block(x, y, z);
        if removed {
            self.events.push(GameEvent::BlockRemoved { x, y, z });
        }
        removed
    }

    /// Fires from the player's eye along `direction`.
    pub fn shoot(&mut self, id: u32, direction: Vec3) -> bool {
        let origin = match self.players.get(&id) {
            Some(player) if !player.dead => player.eye(),
            _ => return false,
        };
        self.fire_projectile(ProjectileOwner::Player(id), origin, direction)
    }

    /// Spawns a projectile and queues the matching shot event.
    pub fn fire_projectile(
        &mut self,
        owner: ProjectileOwner,
        origin: Vec3,
        direction: Vec3,
    ) -> bool {
        let Some(projectile) =
            Projectile::fire(owner, origin, direction, PROJECTILE_SPEED, PROJECTILE_TTL)
        else {
            debug!("Rejected shot from {:?} with direction {:?}", owner, direction);
            return false;
        };
        self.events.push(GameEvent::Shot {
            owner,
            origin,
            direction: projectile.direction(),
        });
        self.projectiles.push(projectile);
        true
    }

    /// Restores a player to full health at a safe spawn.
    pub fn respawn(&mut self, id: u32) -> Option<Vec3> {
        let spawn = find_safe_spawn(&self.blocks, 0, 0, SPAWN_SEARCH_RADIUS);
        let player = self.players.get_mut(&id)?;
        player.respawn_at(spawn);
        info!("Player {} respawned", id);
        Some(spawn)
    }

    /// One fixed simulation step: players, NPCs, projectiles, threat decay.
    pub fn tick(&mut self, dt: f32) {
        self.tick += 1;

        for player in self.players.values_mut() {
            if !player.dead {
                step_player(player, &self.blocks, dt);
            }
        }

        let ctx = AiContext {
            blocks: &self.blocks,
            players: &self.players,
            threat: &self.threat,
        };
        let orders = update_npcs(&mut self.npcs, &ctx, &mut self.rng, dt);
        for order in orders {
            self.fire_projectile(ProjectileOwner::Npc(order.npc_id), order.origin, order.direction);
        }

        let mut targets = Targets {
            players: &mut self.players,
            npcs: &mut self.npcs,
            threat: &mut self.threat,
        };
        update_projectiles(
            &mut self.projectiles,
            &self.blocks,
            &mut targets,
            &mut self.events,
            dt,
        );

        self.threat.decay(dt);
    }

    /// Takes every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::State {
            players: self.players.values().map(Player::snapshot).collect(),
            npcs: self.npcs.values().map(Npc::snapshot).collect(),
        }
    }

    /// Greeting for a newly joined session, carrying the full block list.
    pub fn hello(&self, id: u32) -> ServerMessage {
        ServerMessage::Hello {
            id,
            blocks: self.blocks.records(),
        }
    }
}
