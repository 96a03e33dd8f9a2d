//! Connection lifecycle for UDP clients
//!
//! Clients are identified by address. Each one keeps the newest input
//! sequence it has sent so that reordered or duplicated datagrams are
//! dropped before they reach the simulation.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Client {
    pub id: u32,
    pub addr: SocketAddr,
    pub username: String,
    /// Last time any packet arrived from this client
    pub last_seen: Instant,
    pub last_input_sequence: u32,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, username: &str) -> Self {
        Self {
            id,
            addr,
            username: username.to_string(),
            last_seen: Instant::now(),
            last_input_sequence: 0,
        }
    }

    /// Records a new input sequence; returns false for stale or duplicate input
    pub fn accept_input(&mut self, sequence: u32) -> bool {
        self.last_seen = Instant::now();
        if sequence <= self.last_input_sequence {
            return false;
        }
        self.last_input_sequence = sequence;
        true
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Returns the new client's id, or `None` when the server is full
    pub fn add_client(&mut self, addr: SocketAddr, username: &str) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} ({}) connected from {}", client_id, username, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, username));

        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} ({}) disconnected", client.id, client.username);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, client_id: u32) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    pub fn accept_input(&mut self, client_id: u32, sequence: u32) -> bool {
        self.clients
            .get_mut(&client_id)
            .map(|client| client.accept_input(sequence))
            .unwrap_or(false)
    }

    /// Marks a client as alive without any other state change
    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Removes clients silent for longer than `timeout` and returns their ids
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            info!("Client {} timed out", client_id);
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
