//! Headless bot for exercising a running server.
//!
//! Connects, waits for `hello`, then walks in a circle, shoots every so often
//! and logs the traffic it receives.

use clap::Parser;
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use shared::{ClientMessage, InputState, ServerMessage};
use std::time::Duration;
use tokio::time::{interval, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// How long to stay connected, in seconds
    #[arg(short = 'd', long, default_value = "30")]
    duration_secs: u64,

    /// Milliseconds between shots
    #[arg(long, default_value = "1000")]
    shoot_every_ms: u64,
}

#[derive(Debug, Default)]
struct Traffic {
    states: u64,
    shots: u64,
    deaths: u64,
    block_updates: u64,
}

fn encode(message: &ClientMessage) -> Result<Message, serde_json::Error> {
    Ok(Message::text(serde_json::to_string(message)?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws, _) = connect_async(args.server.as_str()).await?;
    let (mut writer, mut reader) = ws.split();

    let my_id = loop {
        let Some(frame) = reader.next().await else {
            return Err("connection closed before hello".into());
        };
        let frame = frame?;
        if !frame.is_text() {
            continue;
        }
        match serde_json::from_str::<ServerMessage>(frame.to_text()?) {
            Ok(ServerMessage::Hello { id, blocks }) => {
                info!("Joined as player {} ({} blocks)", id, blocks.len());
                break id;
            }
            Ok(ServerMessage::Disconnected { reason }) => {
                return Err(format!("rejected: {}", reason).into());
            }
            _ => {}
        }
    };

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_secs);
    let mut steer = interval(Duration::from_millis(50));
    let mut trigger = interval(Duration::from_millis(args.shoot_every_ms.max(1)));
    let mut report = interval(Duration::from_secs(5));
    let mut traffic = Traffic::default();

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,

            _ = steer.tick() => {
                let t = started.elapsed().as_secs_f32();
                let input = InputState {
                    ax: t.cos(),
                    az: t.sin(),
                    yaw: t,
                    ..Default::default()
                };
                writer.send(encode(&ClientMessage::Input { input })?).await?;
            },

            _ = trigger.tick() => {
                let t = started.elapsed().as_secs_f32();
                let shot = ClientMessage::Shoot {
                    dx: t.cos(),
                    dy: 0.0,
                    dz: t.sin(),
                };
                writer.send(encode(&shot)?).await?;
            },

            _ = report.tick() => {
                info!("Traffic so far: {:?}", traffic);
            },

            frame = reader.next() => {
                let Some(frame) = frame else {
                    warn!("Server closed the connection");
                    break;
                };
                let frame = frame?;
                if !frame.is_text() {
                    continue;
                }
                match serde_json::from_str::<ServerMessage>(frame.to_text()?) {
                    Ok(ServerMessage::State { players, npcs }) => {
                        traffic.states += 1;
                        if traffic.states % 100 == 0 {
                            info!("State: {} players, {} NPCs", players.len(), npcs.len());
                        }
                    }
                    Ok(ServerMessage::Shot { owner_kind, owner_id, .. }) => {
                        traffic.shots += 1;
                        info!("Shot fired by {:?} {}", owner_kind, owner_id);
                    }
                    Ok(ServerMessage::Death { id }) => {
                        traffic.deaths += 1;
                        info!("Player {} died", id);
                        if id == my_id {
                            writer.send(encode(&ClientMessage::Respawn)?).await?;
                        }
                    }
                    Ok(ServerMessage::BlockUpdate { .. }) => traffic.block_updates += 1,
                    Ok(other) => info!("Other message: {:?}", other),
                    Err(e) => warn!("Undecodable frame: {}", e),
                }
            },
        }
    }

    info!("Done after {:?}: {:?}", started.elapsed(), traffic);
    let _ = writer.close().await;
    Ok(())
}
