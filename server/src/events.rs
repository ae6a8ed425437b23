use crate::combat::ProjectileOwner;
use shared::{BlockAction, BlockType, OwnerKind, ServerMessage, Vec3};

/// Something that happened during simulation and must reach every client
/// with the next broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Shot {
        owner: ProjectileOwner,
        origin: Vec3,
        direction: Vec3,
    },
    Death {
        player_id: u32,
    },
    BlockSet {
        x: i32,
        y: i32,
        z: i32,
        block: BlockType,
    },
    BlockRemoved {
        x: i32,
        y: i32,
        z: i32,
    },
}

impl GameEvent {
    pub fn to_message(&self) -> ServerMessage {
        match *self {
            GameEvent::Shot {
                owner,
                origin,
                direction,
            } => {
                let (owner_kind, owner_id) = match owner {
                    ProjectileOwner::Player(id) => (OwnerKind::Player, id),
                    ProjectileOwner::Npc(id) => (OwnerKind::Npc, id),
                };
                ServerMessage::Shot {
                    owner_kind,
                    owner_id,
                    origin,
                    direction,
                }
            }
            GameEvent::Death { player_id } => ServerMessage::Death { id: player_id },
            GameEvent::BlockSet { x, y, z, block } => ServerMessage::BlockUpdate {
                action: BlockAction::Set,
                x,
                y,
                z,
                block: Some(block),
            },
            GameEvent::BlockRemoved { x, y, z } => ServerMessage::BlockUpdate {
                action: BlockAction::Remove,
                x,
                y,
                z,
                block: None,
            },
        }
    }
}
