//! Server network layer: UDP transport around the single-writer game task
//!
//! Socket reads, socket writes and timeout checks run on their own tasks and
//! talk to the main loop over channels. The main loop owns the `Game` and is
//! the only place it is mutated, so packet handlers always run strictly
//! between ticks.

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::game::Game;
use crate::tick::{dispatch_delayed, TickLoop};
use crate::world::ChunkWorld;
use log::{debug, error, info, warn};
use shared::{
    decode_packet, encode_packet, now_millis, Packet, Vec2, MAX_PACKET_SIZE, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: u32 },
    Shutdown,
}

#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Stops a running server once its in-flight tick has completed
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Shutdown requested after the server already stopped");
        }
    }
}

pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game: Game,
    config: ServerConfig,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let world = ChunkWorld::new(config.view_distance, config.nearby_radius);
        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_clients))),
            game: Game::new(world, config.seed),
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.server_tx.clone(),
        }
    }

    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode_packet(&buffer[..len]) {
                        Ok(packet) => {
                            if server_tx
                                .send(ServerMessage::PacketReceived { packet, addr })
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping malformed packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(GameMessage::SendPacket { packet, addr }) = game_rx.recv().await {
                if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                    error!("Failed to send packet to {}: {}", addr, e);
                }
            }
        });
    }

    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = clients.write().await.check_timeouts(timeout);
                for client_id in timed_out {
                    if server_tx
                        .send(ServerMessage::ClientTimeout { client_id })
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = encode_packet(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                username,
            } => {
                if client_version != PROTOCOL_VERSION {
                    warn!(
                        "Rejecting {} from {}: client version {} != {}",
                        username, addr, client_version, PROTOCOL_VERSION
                    );
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Protocol version mismatch".to_string(),
                        },
                        addr,
                    );
                    return;
                }

                let existing = self.clients.read().await.find_client_by_addr(addr);
                if let Some(existing_id) = existing {
                    info!("Replacing existing client {} from {}", existing_id, addr);
                    self.clients.write().await.remove_client(&existing_id);
                    self.game.remove_player(&existing_id);
                }

                let client_id = self.clients.write().await.add_client(addr, &username);
                match client_id {
                    Some(client_id) => {
                        self.game.add_player(client_id, &username);
                        self.send_packet(Packet::Connected { client_id }, addr);
                    }
                    None => {
                        warn!("Server full, rejecting {} from {}", username, addr);
                        self.send_packet(
                            Packet::Disconnected {
                                reason: "Server full".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::Input {
                sequence,
                move_x,
                move_y,
                direction,
            } => {
                let mut clients = self.clients.write().await;
                let Some(client_id) = clients.find_client_by_addr(addr) else {
                    return;
                };
                if clients.accept_input(client_id, sequence) {
                    self.game
                        .set_input(client_id, sequence, Vec2::new(move_x, move_y), direction);
                }
            }

            Packet::Click { x, y } => {
                let mut clients = self.clients.write().await;
                let Some(client_id) = clients.find_client_by_addr(addr) else {
                    return;
                };
                clients.touch(client_id);
                if let Some(changed) = self.game.click(client_id, Vec2::new(x, y)) {
                    debug!(
                        "Player {} set cell ({}, {}) to {}",
                        client_id, changed.x, changed.y, changed.cell
                    );
                }
            }

            Packet::Disconnect => {
                let mut clients = self.clients.write().await;
                if let Some(client_id) = clients.find_client_by_addr(addr) {
                    clients.remove_client(&client_id);
                    self.game.remove_player(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn run_tick(&mut self, tick_loop: &mut TickLoop) {
        let started = Instant::now();
        let updates = tick_loop.run_tick(&mut self.game, started, now_millis());

        {
            let clients = self.clients.read().await;
            for (client_id, update) in updates {
                let Some(addr) = clients.addr_of(client_id) else {
                    continue;
                };
                dispatch_delayed(
                    self.game_tx.clone(),
                    GameMessage::SendPacket {
                        packet: Packet::WorldUpdate(Box::new(update)),
                        addr,
                    },
                    self.config.simulated_latency,
                );
            }
        }

        tick_loop.finish_tick(Instant::now());
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        self.game.populate(
            self.config.wanderers,
            self.config.drifters,
            self.config.pickups,
            now_millis(),
        );

        let mut tick_loop = TickLoop::new(self.config.tick_interval(), Instant::now());
        info!(
            "Server started at {} ticks per second",
            self.config.tick_rate
        );

        loop {
            let next_tick = tokio::time::Instant::from_std(tick_loop.next_tick());

            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.game.remove_player(&client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down after {} ticks", self.game.tick);
                            break;
                        }
                    }
                },

                _ = tokio::time::sleep_until(next_tick) => {
                    self.run_tick(&mut tick_loop).await;
                },
            }
        }

        Ok(())
    }
}
