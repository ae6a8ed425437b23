//! NPC behaviour: flocking villagers and cover-seeking police.
//!
//! Every NPC carries its own think timer. Decisions (targets, cover, wander
//! direction) are only revisited when the timer runs out, while steering,
//! firing and ground following run every tick.

use crate::blocks::BlockStore;
use crate::entity::Player;
use crate::physics::{cell_of, line_of_sight};
use crate::threat::ThreatLedger;
use crate::worldgen::{ring, GEN_HALF_EXTENT};
use log::debug;
use rand::Rng;
use shared::{NpcKind, NpcSnapshot, Vec3, EYE_HEIGHT, MAX_HP};
use std::collections::BTreeMap;

// Villagers
const VILLAGER_THINK_MIN: f32 = 0.5;
const VILLAGER_THINK_MAX: f32 = 1.5;
const FLOCK_RADIUS: f32 = 6.0;
const WANDER_SPEED: f32 = 1.5;

// Police
const POLICE_THINK_INTERVAL: f32 = 0.25;
const RUN_SPEED: f32 = 4.0;
const PEEK_SPEED: f32 = 1.5;
/// How far a peeking officer drifts sideways before turning back.
const PEEK_LIMIT: f32 = 1.5;
const ENGAGE_RANGE: f32 = 24.0;
const FIRE_RANGE: f32 = 30.0;
const BAND_MIN: f32 = 8.0;
const BAND_MAX: f32 = 14.0;
const COVER_SEARCH_RADIUS: i32 = 6;
const COVER_REACH: f32 = 0.5;
const COVER_INVALIDATE_CHANCE: f64 = 0.05;
/// Seconds without getting closer to cover before an officer gives up on it.
const COVER_STALL_TIME: f32 = 0.5;
/// Seconds an officer fights in the open after abandoning cover.
const COVER_RETRY_DELAY: f32 = 2.0;
/// Spacing of the samples taken along a path to cover.
const PATH_SAMPLE: f32 = 0.25;
const STRAFE_FLIP_CHANCE: f64 = 0.2;
const GUARD_RADIUS: f32 = 4.0;
const COVER_FIRE_COOLDOWN: f32 = 1.0;
const OPEN_FIRE_COOLDOWN: f32 = 0.9;
/// Radians of random yaw and pitch added to every police shot.
const AIM_JITTER: f32 = 0.02;

/// Tallest ledge an NPC can walk up.
const STEP_HEIGHT: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiState {
    Wander,
    Guard,
    MoveToCover,
    InCover,
    Engage,
}

#[derive(Debug, Clone)]
pub struct Npc {
    pub id: u32,
    pub kind: NpcKind,
    /// Feet centre.
    pub position: Vec3,
    pub velocity: Vec3,
    pub hp: i32,
    pub state: AiState,
    pub think_timer: f32,
    pub shoot_cooldown: f32,
    pub cover: Option<Vec3>,
    pub target: Option<u32>,
    /// +1 or -1, side used for strafing and peeking.
    pub strafe_sign: f32,
    /// Closest approach to the current cover so far.
    cover_distance: f32,
    stalled: f32,
    /// Cover search is skipped until this runs out.
    pub cover_retry: f32,
}

impl Npc {
    pub fn new(id: u32, kind: NpcKind, position: Vec3) -> Self {
        let state = match kind {
            NpcKind::Villager => AiState::Wander,
            NpcKind::Police => AiState::Guard,
        };
        Self {
            id,
            kind,
            position,
            velocity: Vec3::ZERO,
            hp: MAX_HP,
            state,
            think_timer: 0.0,
            shoot_cooldown: 0.0,
            cover: None,
            target: None,
            strafe_sign: 1.0,
            cover_distance: f32::MAX,
            stalled: 0.0,
            cover_retry: 0.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::new(0.0, EYE_HEIGHT, 0.0)
    }

    pub fn snapshot(&self) -> NpcSnapshot {
        NpcSnapshot {
            id: self.id,
            kind: self.kind,
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
        }
    }
}

/// A shot an NPC decided to take this tick. The caller spawns the projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireOrder {
    pub npc_id: u32,
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Read-only world view handed to the AI.
pub struct AiContext<'a> {
    pub blocks: &'a BlockStore,
    pub players: &'a BTreeMap<u32, Player>,
    pub threat: &'a ThreatLedger,
}

/// Runs one tick of AI and movement for every NPC.
pub fn update_npcs(
    npcs: &mut BTreeMap<u32, Npc>,
    ctx: &AiContext<'_>,
    rng: &mut impl Rng,
    dt: f32,
) -> Vec<FireOrder> {
    let villagers: Vec<(u32, Vec3)> = npcs
        .values()
        .filter(|npc| npc.kind == NpcKind::Villager)
        .map(|npc| (npc.id, npc.position))
        .collect();

    let mut orders = Vec::new();
    for npc in npcs.values_mut() {
        npc.shoot_cooldown = (npc.shoot_cooldown - dt).max(0.0);
        npc.cover_retry = (npc.cover_retry - dt).max(0.0);
        npc.think_timer -= dt;
        let think = npc.think_timer <= 0.0;

        match npc.kind {
            NpcKind::Villager => {
                if think {
                    think_villager(npc, &villagers, rng);
                }
            }
            NpcKind::Police => {
                if think {
                    think_police(npc, ctx, rng);
                }
                if let Some(order) = act_police(npc, ctx, &villagers, rng, dt) {
                    orders.push(order);
                }
            }
        }

        move_npc(npc, ctx.blocks, dt);
    }
    orders
}

fn think_villager(npc: &mut Npc, villagers: &[(u32, Vec3)], rng: &mut impl Rng) {
    npc.think_timer = rng.gen_range(VILLAGER_THINK_MIN..VILLAGER_THINK_MAX);

    let neighbours: Vec<Vec3> = villagers
        .iter()
        .filter(|(id, pos)| *id != npc.id && pos.horizontal_distance(&npc.position) <= FLOCK_RADIUS)
        .map(|(_, pos)| *pos)
        .collect();
    let steer = if neighbours.is_empty() {
        Vec3::ZERO
    } else {
        let mut centre = Vec3::ZERO;
        for pos in &neighbours {
            centre += *pos;
        }
        (centre * (1.0 / neighbours.len() as f32) - npc.position).flatten()
    };

    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let wander = Vec3::new(angle.cos(), 0.0, angle.sin());
    let mut heading = (steer + wander).normalize();
    if heading == Vec3::ZERO {
        heading = wander;
    }
    npc.velocity = heading * WANDER_SPEED;
    npc.state = AiState::Wander;
}

/// Highest-threat player that is still alive and connected.
fn pick_target(ctx: &AiContext<'_>) -> Option<u32> {
    ctx.threat
        .ranked()
        .into_iter()
        .find(|id| ctx.players.get(id).is_some_and(|player| !player.dead))
}

fn live_target<'a>(npc: &Npc, ctx: &AiContext<'a>) -> Option<&'a Player> {
    let id = npc.target?;
    ctx.players.get(&id).filter(|player| !player.dead)
}

fn think_police(npc: &mut Npc, ctx: &AiContext<'_>, rng: &mut impl Rng) {
    npc.think_timer = POLICE_THINK_INTERVAL;

    let target = pick_target(ctx);
    if target != npc.target {
        npc.cover = None;
    }
    npc.target = target;

    if npc.cover.is_some() && rng.gen_bool(COVER_INVALIDATE_CHANCE) {
        npc.cover = None;
    }
    if rng.gen_bool(STRAFE_FLIP_CHANCE) {
        npc.strafe_sign = -npc.strafe_sign;
    }

    let Some(target) = live_target(npc, ctx) else {
        npc.state = AiState::Guard;
        npc.cover = None;
        return;
    };

    if npc.cover.is_none()
        && npc.cover_retry <= 0.0
        && npc.position.horizontal_distance(&target.position) <= ENGAGE_RANGE
    {
        npc.cover = find_cover(ctx.blocks, npc.position, target.position);
        npc.cover_distance = f32::MAX;
        npc.stalled = 0.0;
    }
    npc.state = match npc.cover {
        Some(cover) if cover.horizontal_distance(&npc.position) <= COVER_REACH => AiState::InCover,
        Some(_) if npc.state == AiState::InCover => AiState::InCover,
        Some(_) => AiState::MoveToCover,
        None => AiState::Engage,
    };
}

/// Ring scan around `from` for a standing spot on the far side of a solid
/// cell from `target`.
///
/// A cover cell must be solid at feet and head height. The candidate corner
/// must be open on both levels, have solid footing, not be water and be
/// reachable from `from` in a straight walk.
pub fn find_cover(blocks: &BlockStore, from: Vec3, target: Vec3) -> Option<Vec3> {
    let (nx, gy, nz) = cell_of(from);
    let (tx, _, tz) = cell_of(target);

    for r in 1..=COVER_SEARCH_RADIUS {
        for (cx, cz) in ring(nx, nz, r) {
            if !blocks.is_solid(cx, gy, cz) || !blocks.is_solid(cx, gy + 1, cz) {
                continue;
            }
            let ox = cx - (tx - cx).signum();
            let oz = cz - (tz - cz).signum();
            if (ox, oz) == (cx, cz) {
                continue;
            }
            let open = !blocks.is_solid(ox, gy, oz) && !blocks.is_solid(ox, gy + 1, oz);
            if !open || !blocks.is_solid(ox, gy - 1, oz) || blocks.is_water(ox, gy, oz) {
                continue;
            }
            let corner = Vec3::new(ox as f32 + 0.5, gy as f32, oz as f32 + 0.5);
            if walkable(blocks, from, corner) {
                return Some(corner);
            }
        }
    }
    None
}

/// Samples the straight line from `from` to `to` and checks that every
/// column change stays within the step limit. A diagonal cell change also
/// needs one of its two side cells to be passable.
fn walkable(blocks: &BlockStore, from: Vec3, to: Vec3) -> bool {
    let (mut x, _, mut z) = cell_of(from);
    let mut surface = blocks.surface_height(x, z);
    let path = (to - from).flatten();
    let steps = (path.horizontal_length() / PATH_SAMPLE).ceil() as i32;

    for i in 1..=steps {
        let (nx, _, nz) = cell_of(from + path * (i as f32 / steps as f32));
        if (nx, nz) == (x, z) {
            continue;
        }
        let passable = |cx: i32, cz: i32| blocks.surface_height(cx, cz) <= surface + STEP_HEIGHT;
        if nx != x && nz != z && !passable(nx, z) && !passable(x, nz) {
            return false;
        }
        if !passable(nx, nz) {
            return false;
        }
        x = nx;
        z = nz;
        surface = blocks.surface_height(x, z);
    }
    true
}

/// Sideways unit vector relative to the line from `from` to `to`.
fn perpendicular(from: Vec3, to: Vec3, sign: f32) -> Vec3 {
    let dir = (to - from).flatten().normalize();
    Vec3::new(-dir.z * sign, 0.0, dir.x * sign)
}

fn act_police(
    npc: &mut Npc,
    ctx: &AiContext<'_>,
    villagers: &[(u32, Vec3)],
    rng: &mut impl Rng,
    dt: f32,
) -> Option<FireOrder> {
    let Some(target) = live_target(npc, ctx) else {
        if npc.state != AiState::Guard {
            npc.state = AiState::Guard;
            npc.target = None;
            npc.cover = None;
        }
        guard(npc, villagers);
        return None;
    };

    match (npc.state, npc.cover) {
        (AiState::MoveToCover, Some(cover)) => {
            let offset = (cover - npc.position).flatten();
            let distance = offset.horizontal_length();
            if distance <= COVER_REACH {
                npc.state = AiState::InCover;
                npc.velocity = Vec3::ZERO;
                return None;
            }

            if distance < npc.cover_distance - 1e-3 {
                npc.cover_distance = distance;
                npc.stalled = 0.0;
            } else {
                npc.stalled += dt;
            }
            if npc.stalled >= COVER_STALL_TIME {
                debug!("Police {} abandons unreachable cover {:?}", npc.id, cover);
                npc.cover = None;
                npc.stalled = 0.0;
                npc.cover_retry = COVER_RETRY_DELAY;
                return engage(npc, target, ctx.blocks, rng);
            }
            npc.velocity = offset.normalize() * RUN_SPEED;
            None
        }
        (AiState::InCover, Some(cover)) => {
            if line_of_sight(ctx.blocks, npc.eye(), target.eye()) {
                npc.velocity = Vec3::ZERO;
                if npc.shoot_cooldown <= 0.0 {
                    return Some(fire(npc, target, COVER_FIRE_COOLDOWN, rng));
                }
                return None;
            }
            let side = perpendicular(npc.position, target.position, npc.strafe_sign);
            let drift = npc.position - cover;
            if drift.x * side.x + drift.z * side.z >= PEEK_LIMIT {
                npc.strafe_sign = -npc.strafe_sign;
            }
            npc.velocity = perpendicular(npc.position, target.position, npc.strafe_sign) * PEEK_SPEED;
            None
        }
        _ => engage(npc, target, ctx.blocks, rng),
    }
}

fn engage(
    npc: &mut Npc,
    target: &Player,
    blocks: &BlockStore,
    rng: &mut impl Rng,
) -> Option<FireOrder> {
    npc.state = AiState::Engage;
    let distance = npc.position.horizontal_distance(&target.position);
    let toward = (target.position - npc.position).flatten().normalize();
    let radial = if distance > BAND_MAX {
        1.0
    } else if distance < BAND_MIN {
        -1.0
    } else {
        0.0
    };
    let side = perpendicular(npc.position, target.position, npc.strafe_sign);
    npc.velocity = (toward * radial + side).normalize() * RUN_SPEED;

    if distance <= FIRE_RANGE
        && npc.shoot_cooldown <= 0.0
        && line_of_sight(blocks, npc.eye(), target.eye())
    {
        return Some(fire(npc, target, OPEN_FIRE_COOLDOWN, rng));
    }
    None
}

fn guard(npc: &mut Npc, villagers: &[(u32, Vec3)]) {
    let nearest = villagers.iter().map(|(_, pos)| *pos).min_by(|a, b| {
        a.horizontal_distance(&npc.position)
            .total_cmp(&b.horizontal_distance(&npc.position))
    });
    npc.velocity = match nearest {
        Some(pos) if pos.horizontal_distance(&npc.position) > GUARD_RADIUS => {
            (pos - npc.position).flatten().normalize() * WANDER_SPEED
        }
        _ => Vec3::ZERO,
    };
}

fn fire(npc: &mut Npc, target: &Player, cooldown: f32, rng: &mut impl Rng) -> FireOrder {
    let origin = npc.eye();
    let aim = (target.eye() - origin).normalize();
    let yaw = aim.z.atan2(aim.x) + rng.gen_range(-AIM_JITTER..=AIM_JITTER);
    let pitch = aim.y.clamp(-1.0, 1.0).asin() + rng.gen_range(-AIM_JITTER..=AIM_JITTER);
    let direction = Vec3::new(pitch.cos() * yaw.cos(), pitch.sin(), pitch.cos() * yaw.sin());

    npc.shoot_cooldown = cooldown;
    npc.think_timer = rng.gen_range(POLICE_THINK_INTERVAL..2.0 * POLICE_THINK_INTERVAL);
    FireOrder {
        npc_id: npc.id,
        origin,
        direction,
    }
}

/// Horizontal movement with a one-block step limit, then ground snapping.
fn move_npc(npc: &mut Npc, blocks: &BlockStore, dt: f32) {
    let limit = GEN_HALF_EXTENT as f32 - 0.5;
    let (x, _, z) = cell_of(npc.position);
    let current = blocks.surface_height(x, z);

    let mut next = npc.position;
    next.x = (next.x + npc.velocity.x * dt).clamp(-limit, limit);
    if can_enter(blocks, next, current) {
        npc.position.x = next.x;
    } else {
        npc.velocity.x = 0.0;
        next.x = npc.position.x;
    }

    next.z = (next.z + npc.velocity.z * dt).clamp(-limit, limit);
    if can_enter(blocks, next, current) {
        npc.position.z = next.z;
    } else {
        npc.velocity.z = 0.0;
    }

    let (x, _, z) = cell_of(npc.position);
    npc.position.y = blocks.surface_height(x, z) as f32;
}

fn can_enter(blocks: &BlockStore, position: Vec3, current_surface: i32) -> bool {
    let (x, _, z) = cell_of(position);
    blocks.surface_height(x, z) <= current_surface + STEP_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::BlockType;

    const DT: f32 = 0.016;

    fn wall(blocks: &mut BlockStore, x: i32, z: i32, height: i32) {
        for y in 0..height {
            blocks.set_block(x, y, z, BlockType::Stone);
        }
    }

    fn wanted_player(players: &mut BTreeMap<u32, Player>, threat: &mut ThreatLedger, pos: Vec3) {
        players.insert(1, Player::new(1, pos));
        threat.mark(1, 10.0);
    }

    #[test]
    fn test_villager_always_moves_at_wander_speed() {
        let blocks = BlockStore::new();
        let players = BTreeMap::new();
        let threat = ThreatLedger::new();
        let ctx = AiContext {
            blocks: &blocks,
            players: &players,
            threat: &threat,
        };
        let mut npcs = BTreeMap::new();
        npcs.insert(1, Npc::new(1, NpcKind::Villager, Vec3::new(0.5, 0.0, 0.5)));
        npcs.insert(2, Npc::new(2, NpcKind::Villager, Vec3::new(3.5, 0.0, 0.5)));
        let mut rng = StdRng::seed_from_u64(3);

        let orders = update_npcs(&mut npcs, &ctx, &mut rng, DT);
        assert!(orders.is_empty());
        for npc in npcs.values() {
            assert_approx_eq!(npc.velocity.horizontal_length(), WANDER_SPEED, 1e-4);
            assert!(npc.think_timer >= VILLAGER_THINK_MIN - DT);
            assert!(npc.think_timer <= VILLAGER_THINK_MAX);
            assert_eq!(npc.position.y, 0.0);
        }
    }

    #[test]
    fn test_police_without_threat_guards_villager() {
        let blocks = BlockStore::new();
        let players = BTreeMap::new();
        let threat = ThreatLedger::new();
        let ctx = AiContext {
            blocks: &blocks,
            players: &players,
            threat: &threat,
        };
        let mut npcs = BTreeMap::new();
        npcs.insert(1, Npc::new(1, NpcKind::Police, Vec3::new(0.5, 0.0, 0.5)));
        npcs.insert(2, Npc::new(2, NpcKind::Villager, Vec3::new(10.5, 0.0, 0.5)));
        let mut rng = StdRng::seed_from_u64(4);

        update_npcs(&mut npcs, &ctx, &mut rng, DT);
        let police = &npcs[&1];
        assert_eq!(police.state, AiState::Guard);
        assert_eq!(police.target, None);
        assert!(police.velocity.x > 0.0);
    }

    #[test]
    fn test_find_cover_picks_far_side_corner() {
        let mut blocks = BlockStore::new();
        wall(&mut blocks, 2, 0, 2);
        let cover = find_cover(&blocks, Vec3::new(0.5, 0.0, 0.5), Vec3::new(8.5, 0.0, 0.5));
        assert_eq!(cover, Some(Vec3::new(1.5, 0.0, 0.5)));
    }

    #[test]
    fn test_find_cover_ignores_low_and_water_cells() {
        let mut blocks = BlockStore::new();
        // A single step is no cover.
        wall(&mut blocks, 2, 0, 1);
        assert_eq!(
            find_cover(&blocks, Vec3::new(0.5, 0.0, 0.5), Vec3::new(8.5, 0.0, 0.5)),
            None
        );

        let mut blocks = BlockStore::new();
        wall(&mut blocks, 2, 0, 2);
        blocks.set_block(1, 0, 0, BlockType::Water);
        assert_eq!(
            find_cover(&blocks, Vec3::new(0.5, 0.0, 0.5), Vec3::new(8.5, 0.0, 0.5)),
            None
        );
    }

    #[test]
    fn test_find_cover_skips_corner_behind_wall() {
        let mut blocks = BlockStore::new();
        wall(&mut blocks, 2, 0, 2);
        // The only corner shielded from the target lies past the wall.
        assert_eq!(
            find_cover(&blocks, Vec3::new(0.5, 0.0, 0.5), Vec3::new(-7.5, 0.0, 0.5)),
            None
        );
        assert!(!walkable(&blocks, Vec3::new(0.5, 0.0, 0.5), Vec3::new(3.5, 0.0, 0.5)));
        assert!(walkable(&blocks, Vec3::new(0.5, 0.0, 0.5), Vec3::new(1.5, 0.0, 2.5)));
    }

    #[test]
    fn test_police_facing_wall_still_engages() {
        let mut blocks = BlockStore::new();
        wall(&mut blocks, 2, 0, 2);
        let mut players = BTreeMap::new();
        let mut threat = ThreatLedger::new();
        wanted_player(&mut players, &mut threat, Vec3::new(-7.5, 0.0, 0.5));
        let ctx = AiContext {
            blocks: &blocks,
            players: &players,
            threat: &threat,
        };
        let mut npcs = BTreeMap::new();
        npcs.insert(1, Npc::new(1, NpcKind::Police, Vec3::new(0.5, 0.0, 0.5)));
        let mut rng = StdRng::seed_from_u64(8);

        let orders = update_npcs(&mut npcs, &ctx, &mut rng, DT);
        assert_eq!(npcs[&1].cover, None);
        assert_eq!(npcs[&1].state, AiState::Engage);

        let mut fired = orders.len();
        let mut moving_to_cover = 0;
        for _ in 0..625 {
            fired += update_npcs(&mut npcs, &ctx, &mut rng, DT).len();
            if npcs[&1].state == AiState::MoveToCover {
                moving_to_cover += 1;
                assert!(moving_to_cover < 200, "stuck moving to cover");
            } else {
                moving_to_cover = 0;
            }
        }
        assert!(fired > 0);
    }

    #[test]
    fn test_police_abandons_stalled_cover() {
        let mut blocks = BlockStore::new();
        wall(&mut blocks, 2, 0, 2);
        let mut players = BTreeMap::new();
        let mut threat = ThreatLedger::new();
        wanted_player(&mut players, &mut threat, Vec3::new(-7.5, 0.0, 0.5));
        let ctx = AiContext {
            blocks: &blocks,
            players: &players,
            threat: &threat,
        };
        let mut police = Npc::new(1, NpcKind::Police, Vec3::new(0.5, 0.0, 0.5));
        police.target = Some(1);
        police.cover = Some(Vec3::new(3.5, 0.0, 0.5));
        police.state = AiState::MoveToCover;
        police.think_timer = 100.0;
        let mut npcs = BTreeMap::new();
        npcs.insert(1, police);
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..120 {
            update_npcs(&mut npcs, &ctx, &mut rng, DT);
            if npcs[&1].cover.is_none() {
                break;
            }
        }
        let police = &npcs[&1];
        assert_eq!(police.cover, None);
        assert_eq!(police.state, AiState::Engage);
        assert!(police.cover_retry > 0.0);
        assert!(police.position.x < 2.0);
    }

    #[test]
    fn test_police_moves_into_cover() {
        let mut blocks = BlockStore::new();
        wall(&mut blocks, 2, 0, 2);
        let mut players = BTreeMap::new();
        let mut threat = ThreatLedger::new();
        wanted_player(&mut players, &mut threat, Vec3::new(8.5, 0.0, 0.5));
        let mut npcs = BTreeMap::new();
        npcs.insert(1, Npc::new(1, NpcKind::Police, Vec3::new(0.5, 0.0, 0.5)));
        let mut rng = StdRng::seed_from_u64(5);

        let ctx = AiContext {
            blocks: &blocks,
            players: &players,
            threat: &threat,
        };
        update_npcs(&mut npcs, &ctx, &mut rng, DT);
        assert_eq!(npcs[&1].target, Some(1));
        assert_eq!(npcs[&1].cover, Some(Vec3::new(1.5, 0.0, 0.5)));
        assert_eq!(npcs[&1].state, AiState::MoveToCover);

        let mut reached = false;
        for _ in 0..60 {
            update_npcs(&mut npcs, &ctx, &mut rng, DT);
            if npcs[&1].state == AiState::InCover {
                reached = true;
                break;
            }
        }
        assert!(reached);
        assert!(npcs[&1].position.horizontal_distance(&Vec3::new(1.5, 0.0, 0.5)) <= COVER_REACH);
    }

    #[test]
    fn test_police_in_open_strafes_and_fires() {
        let blocks = BlockStore::new();
        let mut players = BTreeMap::new();
        let mut threat = ThreatLedger::new();
        wanted_player(&mut players, &mut threat, Vec3::new(10.5, 0.0, 0.5));
        let ctx = AiContext {
            blocks: &blocks,
            players: &players,
            threat: &threat,
        };
        let mut npcs = BTreeMap::new();
        npcs.insert(1, Npc::new(1, NpcKind::Police, Vec3::new(0.5, 0.0, 0.5)));
        let mut rng = StdRng::seed_from_u64(6);

        let orders = update_npcs(&mut npcs, &ctx, &mut rng, DT);
        let police = &npcs[&1];
        assert_eq!(police.state, AiState::Engage);
        assert_approx_eq!(police.velocity.horizontal_length(), RUN_SPEED, 1e-3);
        // Inside the band the movement is purely sideways.
        assert!(police.velocity.x.abs() < 1e-3);

        assert_eq!(orders.len(), 1);
        let order = orders[0];
        assert_eq!(order.npc_id, 1);
        assert_approx_eq!(order.direction.length(), 1.0, 1e-4);
        assert!(order.direction.x > 0.99);
        assert_approx_eq!(police.shoot_cooldown, OPEN_FIRE_COOLDOWN, 1e-6);
    }

    #[test]
    fn test_police_drops_dead_target() {
        let blocks = BlockStore::new();
        let mut players = BTreeMap::new();
        let mut threat = ThreatLedger::new();
        wanted_player(&mut players, &mut threat, Vec3::new(10.5, 0.0, 0.5));
        if let Some(player) = players.get_mut(&1) {
            player.take_damage(MAX_HP);
        }
        let ctx = AiContext {
            blocks: &blocks,
            players: &players,
            threat: &threat,
        };
        let mut npcs = BTreeMap::new();
        npcs.insert(1, Npc::new(1, NpcKind::Police, Vec3::new(0.5, 0.0, 0.5)));
        let mut rng = StdRng::seed_from_u64(7);

        let orders = update_npcs(&mut npcs, &ctx, &mut rng, DT);
        assert!(orders.is_empty());
        assert_eq!(npcs[&1].target, None);
        assert_eq!(npcs[&1].state, AiState::Guard);
    }

    #[test]
    fn test_step_limit_blocks_tall_columns() {
        let mut blocks = BlockStore::new();
        wall(&mut blocks, 1, 0, 2);
        blocks.set_block(0, 0, 1, BlockType::Road);

        let mut npc = Npc::new(1, NpcKind::Villager, Vec3::new(0.5, 0.0, 0.5));
        npc.velocity = Vec3::new(10.0, 0.0, 0.0);
        move_npc(&mut npc, &blocks, 0.1);
        assert_eq!(npc.position.x, 0.5);
        assert_eq!(npc.velocity.x, 0.0);

        npc.velocity = Vec3::new(0.0, 0.0, 10.0);
        move_npc(&mut npc, &blocks, 0.1);
        assert_approx_eq!(npc.position.z, 1.5, 1e-5);
        assert_eq!(npc.position.y, 1.0);
    }

    #[test]
    fn test_movement_clamped_to_generated_area() {
        let blocks = BlockStore::new();
        let edge = GEN_HALF_EXTENT as f32 - 0.5;
        let mut npc = Npc::new(1, NpcKind::Villager, Vec3::new(edge, 0.0, 0.5));
        npc.velocity = Vec3::new(50.0, 0.0, 0.0);
        move_npc(&mut npc, &blocks, 1.0);
        assert_eq!(npc.position.x, edge);
    }
}
