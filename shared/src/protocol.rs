//! JSON text protocol spoken between the server and its clients.
//!
//! Every frame is one object whose `type` field names the message.

use crate::block::BlockType;
use crate::math::Vec3;
use serde::{Deserialize, Serialize};

/// Latest control state reported by a client.
///
/// `ax`/`az` are world-space acceleration axes in `[-1, 1]`, `ay` is the
/// vertical axis used while flying. Missing fields read as neutral values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub ax: f32,
    pub az: f32,
    pub ay: f32,
    pub jump: bool,
    pub sprint: bool,
    pub yaw: f32,
    pub pitch: f32,
    pub fly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        input: InputState,
    },
    PlaceBlock {
        x: i32,
        y: i32,
        z: i32,
        block: BlockType,
    },
    RemoveBlock {
        x: i32,
        y: i32,
        z: i32,
    },
    Shoot {
        dx: f32,
        dy: f32,
        dz: f32,
    },
    Respawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcKind {
    Villager,
    Police,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Player,
    Npc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockAction {
    Set,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(rename = "type")]
    pub block: BlockType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub hp: i32,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcSnapshot {
    pub id: u32,
    pub kind: NpcKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Hello {
        id: u32,
        blocks: Vec<BlockRecord>,
    },
    State {
        players: Vec<PlayerSnapshot>,
        npcs: Vec<NpcSnapshot>,
    },
    BlockUpdate {
        action: BlockAction,
        x: i32,
        y: i32,
        z: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block: Option<BlockType>,
    },
    Shot {
        #[serde(rename = "ownerKind")]
        owner_kind: OwnerKind,
        #[serde(rename = "ownerId")]
        owner_id: u32,
        origin: Vec3,
        direction: Vec3,
    },
    Death {
        id: u32,
    },
    Disconnected {
        reason: String,
    },
}
