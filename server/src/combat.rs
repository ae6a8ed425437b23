//! Ballistic projectiles and hit resolution.
//!
//! Hits are a single point sample per tick against each target's cell-grown
//! hitbox, so very fast shots can pass through thin targets between samples.

use crate::blocks::BlockStore;
use crate::entity::Player;
use crate::events::GameEvent;
use crate::npc::Npc;
use crate::physics::{cell_of, Aabb};
use crate::threat::ThreatLedger;
use log::{debug, info};
use shared::{NpcKind, Vec3, PROJECTILE_DAMAGE, THREAT_DURATION};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileOwner {
    Player(u32),
    Npc(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub owner: ProjectileOwner,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds left before the projectile expires.
    pub ttl: f32,
}

impl Projectile {
    /// Creates a projectile travelling along `direction` at `speed`.
    ///
    /// Returns None for a zero-length or non-finite direction.
    pub fn fire(
        owner: ProjectileOwner,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
        ttl: f32,
    ) -> Option<Projectile> {
        if !direction.is_finite() || !origin.is_finite() {
            return None;
        }
        let direction = direction.normalize();
        if direction == Vec3::ZERO {
            return None;
        }
        Some(Projectile {
            owner,
            position: origin,
            velocity: direction * speed,
            ttl,
        })
    }

    pub fn direction(&self) -> Vec3 {
        self.velocity.normalize()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Victim {
    Npc(u32),
    Player(u32),
}

/// Targets a projectile can damage this tick.
pub struct Targets<'a> {
    pub players: &'a mut BTreeMap<u32, Player>,
    pub npcs: &'a mut BTreeMap<u32, Npc>,
    pub threat: &'a mut ThreatLedger,
}

/// Advances every projectile and resolves at most one hit per projectile.
pub fn update_projectiles(
    projectiles: &mut Vec<Projectile>,
    blocks: &BlockStore,
    targets: &mut Targets<'_>,
    events: &mut Vec<GameEvent>,
    dt: f32,
) {
    projectiles.retain_mut(|projectile| {
        projectile.position += projectile.velocity * dt;
        projectile.ttl -= dt;
        if projectile.ttl <= 0.0 {
            return false;
        }

        let (x, y, z) = cell_of(projectile.position);
        if blocks.is_solid(x, y, z) {
            return false;
        }

        match find_victim(projectile, targets) {
            Some(victim) => {
                apply_hit(victim, projectile.owner, targets, events);
                false
            }
            None => true,
        }
    });
}

fn hit_by(position: Vec3, point: Vec3) -> bool {
    Aabb::for_entity(position).cell_bounds().contains(point)
}

fn find_victim(projectile: &Projectile, targets: &Targets<'_>) -> Option<Victim> {
    let point = projectile.position;
    let npc = targets
        .npcs
        .values()
        .filter(|npc| projectile.owner != ProjectileOwner::Npc(npc.id))
        .find(|npc| hit_by(npc.position, point))
        .map(|npc| Victim::Npc(npc.id));
    if npc.is_some() {
        return npc;
    }
    targets
        .players
        .values()
        .filter(|player| !player.dead && projectile.owner != ProjectileOwner::Player(player.id))
        .find(|player| hit_by(player.position, point))
        .map(|player| Victim::Player(player.id))
}

fn apply_hit(
    victim: Victim,
    owner: ProjectileOwner,
    targets: &mut Targets<'_>,
    events: &mut Vec<GameEvent>,
) {
    match victim {
        Victim::Npc(id) => {
            let Some(npc) = targets.npcs.get_mut(&id) else {
                return;
            };
            npc.hp -= PROJECTILE_DAMAGE;
            if let (NpcKind::Villager, ProjectileOwner::Player(shooter)) = (npc.kind, owner) {
                targets.threat.mark(shooter, THREAT_DURATION);
                debug!("Player {} is now wanted for shooting villager {}", shooter, id);
            }
            if npc.hp <= 0 {
                targets.npcs.remove(&id);
                info!("NPC {} was killed", id);
            }
        }
        Victim::Player(id) => {
            let Some(player) = targets.players.get_mut(&id) else {
                return;
            };
            if player.take_damage(PROJECTILE_DAMAGE) {
                info!("Player {} died", id);
                events.push(GameEvent::Death { player_id: id });
            }
        }
    }
}
