//! Maps inbound client frames onto simulation calls.
//!
//! Parsing is lenient: missing or mistyped input fields fall back to neutral
//! values instead of dropping the frame. Block edits still need numeric
//! coordinates, and frames with an unknown `type` are ignored.

use crate::game::GameState;
use log::debug;
use serde_json::Value;
use shared::{BlockType, ClientMessage, InputState, Vec3};

fn number(value: Option<&Value>) -> f32 {
    value
        .and_then(Value::as_f64)
        .map(|n| n as f32)
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

fn axis(value: Option<&Value>) -> f32 {
    number(value).clamp(-1.0, 1.0)
}

fn flag(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

fn coordinate(value: Option<&Value>) -> Option<i32> {
    let n = value?.as_f64()?;
    n.is_finite()
        .then(|| n.floor().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

fn coordinates(value: &Value) -> Option<(i32, i32, i32)> {
    Some((
        coordinate(value.get("x"))?,
        coordinate(value.get("y"))?,
        coordinate(value.get("z"))?,
    ))
}

/// Unknown or missing block ids place stone. Whole floats such as `2.0`
/// count as ids.
fn block_type(value: Option<&Value>) -> BlockType {
    value
        .and_then(Value::as_f64)
        .filter(|id| id.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(id))
        .and_then(|id| BlockType::from_id(id as u8))
        .unwrap_or(BlockType::Stone)
}

fn input_state(value: Option<&Value>) -> InputState {
    let Some(value) = value.filter(|v| v.is_object()) else {
        return InputState::default();
    };
    InputState {
        ax: axis(value.get("ax")),
        az: axis(value.get("az")),
        ay: axis(value.get("ay")),
        jump: flag(value.get("jump")),
        sprint: flag(value.get("sprint")),
        yaw: number(value.get("yaw")),
        pitch: number(value.get("pitch")),
        fly: flag(value.get("fly")),
    }
}

/// Decodes one text frame. Returns None for non-JSON, unknown types and
/// block edits without usable coordinates.
pub fn parse_client_message(text: &str) -> Option<ClientMessage> {
    let value: Value = serde_json::from_str(text).ok()?;
    let kind = value.get("type")?.as_str()?;
    match kind {
        "input" => Some(ClientMessage::Input {
            input: input_state(value.get("input")),
        }),
        "placeBlock" => {
            let (x, y, z) = coordinates(&value)?;
            Some(ClientMessage::PlaceBlock {
                x,
                y,
                z,
                block: block_type(value.get("block")),
            })
        }
        "removeBlock" => {
            let (x, y, z) = coordinates(&value)?;
            Some(ClientMessage::RemoveBlock { x, y, z })
        }
        "shoot" => Some(ClientMessage::Shoot {
            dx: number(value.get("dx")),
            dy: number(value.get("dy")),
            dz: number(value.get("dz")),
        }),
        "respawn" => Some(ClientMessage::Respawn),
        _ => None,
    }
}

/// Applies a decoded message on behalf of `session_id`.
pub fn apply(state: &mut GameState, session_id: u32, message: ClientMessage) {
    match message {
        ClientMessage::Input { input } => state.apply_input(session_id, input),
        ClientMessage::PlaceBlock { x, y, z, block } => {
            if !state.place_block(x, y, z, block) {
                debug!(
                    "Client {} placeBlock ({}, {}, {}) rejected",
                    session_id, x, y, z
                );
            }
        }
        ClientMessage::RemoveBlock { x, y, z } => {
            state.remove_block(x, y, z);
        }
        ClientMessage::Shoot { dx, dy, dz } => {
            state.shoot(session_id, Vec3::new(dx, dy, dz));
        }
        ClientMessage::Respawn => {
            state.respawn(session_id);
        }
    }
}

/// Parses and applies one raw frame. Unusable frames are logged and dropped.
pub fn handle_frame(state: &mut GameState, session_id: u32, text: &str) {
    match parse_client_message(text) {
        Some(message) => apply(state, session_id, message),
        None => debug!("Ignoring frame from client {}: {}", session_id, text),
    }
}
