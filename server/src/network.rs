//! Server network layer handling WebSocket sessions and game loop coordination

use crate::client_manager::{ClientManager, ConnectionId, OUTBOUND_QUEUE};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::game::GameState;
use crate::gateway;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::ServerMessage;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);
/// Ticks between periodic status lines.
const STATUS_EVERY: u64 = 300;

/// Events sent from connection tasks to the main server loop
///
/// Every event carries the token of the connection that produced it, so a
/// late disconnect can only ever remove its own session.
#[derive(Debug)]
pub enum NetworkEvent {
    NewConnection {
        connection: ConnectionId,
        addr: SocketAddr,
        sender: mpsc::Sender<String>,
    },
    ClientMessage {
        connection: ConnectionId,
        text: String,
    },
    ClientDisconnect {
        connection: ConnectionId,
    },
}

fn encode(message: &ServerMessage) -> Result<String, ServerError> {
    Ok(serde_json::to_string(message)?)
}

/// Main server coordinating networking and game simulation
///
/// The server owns the game state outright. Connection tasks only forward
/// `NetworkEvent`s, so every mutation happens on the loop in `run`, between
/// ticks.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: ServerConfig,
    clients: ClientManager,
    game_state: GameState,

    event_tx: mpsc::UnboundedSender<NetworkEvent>,
    event_rx: mpsc::UnboundedReceiver<NetworkEvent>,
}

impl Server {
    /// Binds the listening socket and generates the world.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);

        let game_state = GameState::generate(config.seed, config.villagers, config.police);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(config.max_clients),
            config,
            game_state,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Spawns the task accepting new TCP connections
    fn spawn_listener(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut next_connection: ConnectionId = 1;
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let connection = next_connection;
                        next_connection += 1;
                        let event_tx = event_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, connection, addr, event_tx).await
                            {
                                warn!("Connection {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Applies one event from a connection task to the game state
    fn handle_network_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::NewConnection {
                connection,
                addr,
                sender,
            } => {
                match self.clients.add_client(connection, addr, sender.clone()) {
                    Some(client_id) => {
                        self.game_state.add_player(client_id);
                        match encode(&self.game_state.hello(client_id)) {
                            Ok(frame) => {
                                self.clients.send_to(client_id, frame);
                            }
                            Err(e) => error!("Failed to encode hello: {}", e),
                        }
                    }
                    None => {
                        warn!("Rejecting {}: server full", addr);
                        let reason = ServerMessage::Disconnected {
                            reason: "Server full".to_string(),
                        };
                        if let Ok(frame) = encode(&reason) {
                            let _ = sender.try_send(frame);
                        }
                    }
                }
            }

            NetworkEvent::ClientMessage { connection, text } => {
                if let Some(client_id) = self.clients.find_client_by_connection(connection) {
                    self.clients.touch(client_id);
                    gateway::handle_frame(&mut self.game_state, client_id, &text);
                }
            }

            NetworkEvent::ClientDisconnect { connection } => {
                if let Some(client_id) = self.clients.find_client_by_connection(connection) {
                    self.clients.remove_client(client_id);
                    self.game_state.remove_player(client_id);
                }
            }
        }
    }

    /// Pushes the current snapshot, then every queued event, to all sessions
    fn broadcast_game_state(&mut self) {
        let events = self.game_state.drain_events();
        if self.clients.is_empty() {
            return;
        }

        match encode(&self.game_state.snapshot()) {
            Ok(frame) => {
                self.clients.broadcast(&frame);
            }
            Err(e) => error!("Failed to encode state: {}", e),
        }

        for event in events {
            match encode(&event.to_message()) {
                Ok(frame) => {
                    self.clients.broadcast(&frame);
                }
                Err(e) => error!("Failed to encode {:?}: {}", event, e),
            }
        }
    }

    fn sweep_idle_clients(&mut self) {
        for client_id in self.clients.check_timeouts(self.config.idle_timeout()) {
            self.game_state.remove_player(client_id);
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_listener();

        let tick_duration = self.config.tick_duration();
        let dt = tick_duration.as_secs_f32();

        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast_interval = interval(self.config.broadcast_interval());
        broadcast_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sweep_interval = interval(SWEEP_INTERVAL);

        info!(
            "Server started: tick {:?}, broadcast {:?}",
            tick_duration,
            self.config.broadcast_interval()
        );

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_network_event(event),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.game_state.tick(dt);

                    if self.game_state.tick % STATUS_EVERY == 0 {
                        debug!(
                            "Tick {}: {} clients, {} NPCs, {} projectiles",
                            self.game_state.tick,
                            self.clients.len(),
                            self.game_state.npc_count(),
                            self.game_state.projectile_count()
                        );
                    }
                },

                _ = broadcast_interval.tick() => self.broadcast_game_state(),

                _ = sweep_interval.tick() => self.sweep_idle_clients(),
            }
        }

        Ok(())
    }
}

/// Runs one WebSocket session until either side closes it
///
/// Inbound text frames are forwarded to the main loop. Outbound frames come
/// from the session's queue and are written by a separate task, so a slow
/// peer never stalls the simulation.
async fn handle_connection(
    stream: TcpStream,
    connection: ConnectionId,
    addr: SocketAddr,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) -> Result<(), ServerError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|source| ServerError::WebSocket { peer: addr, source })?;
    let (mut ws_writer, mut ws_reader) = ws.split();

    let (sender, mut outbound) = mpsc::channel::<String>(OUTBOUND_QUEUE);
    if event_tx
        .send(NetworkEvent::NewConnection {
            connection,
            addr,
            sender,
        })
        .is_err()
    {
        return Ok(());
    }

    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = ws_writer.send(Message::text(frame)).await {
                debug!("Write to {} failed: {}", addr, e);
                break;
            }
        }
        let _ = ws_writer.close().await;
    });

    while let Some(message) = ws_reader.next().await {
        match message {
            Ok(message) if message.is_text() => {
                let Ok(text) = message.to_text() else {
                    continue;
                };
                let event = NetworkEvent::ClientMessage {
                    connection,
                    text: text.to_string(),
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            Ok(message) if message.is_close() => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read from {} failed: {}", addr, e);
                break;
            }
        }
    }

    let _ = event_tx.send(NetworkEvent::ClientDisconnect { connection });
    Ok(())
}
