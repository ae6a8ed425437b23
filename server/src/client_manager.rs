//! Session tracking for connected WebSocket clients
//!
//! This module handles the server-side bookkeeping of connected sessions:
//! - Session lifecycle (connect, disconnect, idle timeout)
//! - Capacity enforcement and session ID assignment
//! - Best-effort delivery of outbound frames to each session's writer task
//!
//! The simulation loop is the only owner of the `ClientManager`, so no
//! locking is needed around it.

use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Capacity of each session's outbound queue.
pub const OUTBOUND_QUEUE: usize = 256;

/// Token the accept loop hands to each TCP connection. Never reused.
pub type ConnectionId = u64;

/// Represents a connected session
///
/// Each session keeps:
/// - Connection metadata (ID, connection token, address, last activity)
/// - The sending half of its outbound queue, drained by a writer task
#[derive(Debug)]
pub struct Client {
    /// Unique session identifier assigned by the server
    pub id: u32,
    /// Token of the connection task that owns this session
    pub connection: ConnectionId,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    /// Last time we received any frame from this session
    pub last_seen: Instant,
    /// Serialized frames waiting for the writer task
    sender: mpsc::Sender<String>,
}

impl Client {
    /// Creates a new session marked as recently active
    pub fn new(
        id: u32,
        connection: ConnectionId,
        addr: SocketAddr,
        sender: mpsc::Sender<String>,
    ) -> Self {
        Self {
            id,
            connection,
            addr,
            last_seen: Instant::now(),
            sender,
        }
    }

    /// Queues a frame without waiting
    ///
    /// Returns false when the queue is full or the writer task is gone. The
    /// frame is dropped in both cases.
    pub fn send(&self, frame: String) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue full for client {}, dropping frame", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Checks if the session has been silent longer than `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected sessions
///
/// The ClientManager enforces server capacity, hands out session IDs and
/// fans serialized frames out to every session's queue.
pub struct ClientManager {
    /// Connected sessions indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Session ID for each live connection token
    connections: HashMap<ConnectionId, u32>,
    /// Next available session ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent sessions allowed
    max_clients: usize,
}

impl ClientManager {
    /// Creates a new manager with the specified capacity limit
    ///
    /// Session IDs start from 1 and are never reused.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            connections: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to register a new session
    ///
    /// Returns Some(client_id) if successful, None if the server is at
    /// capacity or the connection already owns a session.
    pub fn add_client(
        &mut self,
        connection: ConnectionId,
        addr: SocketAddr,
        sender: mpsc::Sender<String>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients || self.connections.contains_key(&connection) {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.connections.insert(connection, client_id);
        self.clients
            .insert(client_id, Client::new(client_id, connection, addr, sender));

        Some(client_id)
    }

    /// Removes a session
    ///
    /// Returns true if the session was found, false if it was already gone.
    /// Dropping the session's sender lets its writer task finish.
    pub fn remove_client(&mut self, client_id: u32) -> bool {
        if let Some(client) = self.clients.remove(&client_id) {
            self.connections.remove(&client.connection);
            info!("Client {} disconnected from {}", client_id, client.addr);
            true
        } else {
            false
        }
    }

    /// Finds the session owned by the given connection
    pub fn find_client_by_connection(&self, connection: ConnectionId) -> Option<u32> {
        self.connections.get(&connection).copied()
    }

    /// Records activity for a session so it is not swept as idle
    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Checks for and removes idle sessions
    ///
    /// Returns the removed session IDs so their players can be removed from
    /// the simulation too.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            info!("Client {} timed out", client_id);
            self.remove_client(*client_id);
        }

        timed_out
    }

    /// Queues a frame for one session
    pub fn send_to(&self, client_id: u32, frame: String) -> bool {
        self.clients
            .get(&client_id)
            .is_some_and(|client| client.send(frame))
    }

    /// Queues the same frame for every session
    ///
    /// Returns how many sessions accepted it. Full or closed queues are
    /// skipped.
    pub fn broadcast(&self, frame: &str) -> usize {
        self.clients
            .values()
            .filter(|client| client.send(frame.to_string()))
            .count()
    }

    /// Returns the number of currently connected sessions
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no sessions are connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn queue() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        mpsc::channel(OUTBOUND_QUEUE)
    }

    #[test]
    fn test_client_timeout() {
        let (tx, _rx) = queue();
        let mut client = Client::new(1, 1, test_addr(), tx);

        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);

        assert!(client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(5);
        assert_eq!(manager.max_clients, 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = ClientManager::new(3);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        let client_id1 = manager.add_client(1, test_addr(), tx1).unwrap();
        let client_id2 = manager.add_client(2, test_addr2(), tx2).unwrap();

        assert_eq!(client_id1, 1);
        assert_eq!(client_id2, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        assert!(manager.add_client(1, test_addr(), tx1).is_some());
        assert!(manager.add_client(2, test_addr2(), tx2).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new(2);
        let (tx, _rx) = queue();

        let client_id = manager.add_client(1, test_addr(), tx).unwrap();
        assert!(manager.remove_client(client_id));
        assert!(!manager.remove_client(client_id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = ClientManager::new(1);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        let first = manager.add_client(1, test_addr(), tx1).unwrap();
        manager.remove_client(first);
        let second = manager.add_client(2, test_addr(), tx2).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_find_client_by_connection() {
        let mut manager = ClientManager::new(2);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        let client_id1 = manager.add_client(7, test_addr(), tx1).unwrap();
        let client_id2 = manager.add_client(9, test_addr2(), tx2).unwrap();

        assert_eq!(manager.find_client_by_connection(7), Some(client_id1));
        assert_eq!(manager.find_client_by_connection(9), Some(client_id2));
        assert_eq!(manager.find_client_by_connection(8), None);
    }

    #[test]
    fn test_same_address_sessions_stay_separate() {
        let mut manager = ClientManager::new(3);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();
        let (tx3, _rx3) = queue();

        let old = manager.add_client(1, test_addr(), tx1).unwrap();
        let new = manager.add_client(2, test_addr(), tx2).unwrap();
        assert!(manager.add_client(2, test_addr(), tx3).is_none());

        manager.remove_client(old);
        assert_eq!(manager.find_client_by_connection(1), None);
        assert_eq!(manager.find_client_by_connection(2), Some(new));
    }

    #[test]
    fn test_check_timeouts_and_touch() {
        let mut manager = ClientManager::new(2);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        let stale = manager.add_client(1, test_addr(), tx1).unwrap();
        let fresh = manager.add_client(2, test_addr2(), tx2).unwrap();
        for client in manager.clients.values_mut() {
            client.last_seen = Instant::now() - Duration::from_secs(10);
        }
        manager.touch(fresh);

        let timed_out = manager.check_timeouts(Duration::from_secs(5));
        assert_eq!(timed_out, vec![stale]);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.find_client_by_connection(2), Some(fresh));
        assert_eq!(manager.find_client_by_connection(1), None);
    }

    #[test]
    fn test_broadcast_skips_closed_and_full_queues() {
        let mut manager = ClientManager::new(3);
        let (tx_open, mut rx_open) = queue();
        let (tx_closed, rx_closed) = queue();
        let (tx_full, _rx_full) = mpsc::channel(1);

        manager.add_client(1, test_addr(), tx_open).unwrap();
        manager.add_client(2, test_addr2(), tx_closed).unwrap();
        let full = manager
            .add_client(3, "127.0.0.1:8082".parse().unwrap(), tx_full)
            .unwrap();
        drop(rx_closed);
        assert!(manager.send_to(full, "filler".to_string()));

        assert_eq!(manager.broadcast("{\"type\":\"death\",\"id\":1}"), 1);
        assert_eq!(
            rx_open.try_recv().unwrap(),
            "{\"type\":\"death\",\"id\":1}"
        );
    }

    #[test]
    fn test_send_to_unknown_client() {
        let manager = ClientManager::new(1);
        assert!(!manager.send_to(42, "hello".to_string()));
    }
}
