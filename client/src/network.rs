use crate::collaborators::{ChunkCache, Hooks, Inventory, PredictedPosition};
use crate::input::Autopilot;
use crate::rendering::{FrameStatus, Renderer};
use crate::state::{ClientConfig, StateManager};
use log::{error, info, warn};
use shared::{
    decode_packet, encode_packet, now_millis, Packet, WorldUpdate, MAX_PACKET_SIZE,
    PLAYER_SPEED, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

const INPUT_INTERVAL: Duration = Duration::from_millis(50);
const RENDER_INTERVAL: Duration = Duration::from_millis(16);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    username: String,
    client_id: Option<u32>,
    connected: bool,
    /// Set once the server has told us to go away
    stopped: bool,

    state: StateManager,
    chunks: ChunkCache,
    predictor: PredictedPosition,
    inventory: Inventory,
    autopilot: Option<Autopilot>,
    renderer: Box<dyn Renderer>,

    ping_ms: u64,
    fake_ping_ms: u64,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        username: &str,
        config: ClientConfig,
        fake_ping_ms: u64,
        autopilot: bool,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            username: username.to_string(),
            client_id: None,
            connected: false,
            stopped: false,
            state: StateManager::new(config),
            chunks: ChunkCache::new(),
            predictor: PredictedPosition::default(),
            inventory: Inventory::new(),
            autopilot: autopilot.then(|| Autopilot::new(0.8)),
            renderer,
            ping_ms: 0,
            fake_ping_ms,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to {} as {}...", self.server_addr, self.username);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            username: self.username.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = encode_packet(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                self.state.reset();
            }

            Packet::WorldUpdate(update) => {
                if !self.connected {
                    return;
                }
                self.ping_ms = now_millis().saturating_sub(update.t);
                self.apply_update(&update);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.stopped = true;
                self.client_id = None;
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    fn apply_update(&mut self, update: &WorldUpdate) {
        self.state.ingest(
            update,
            Hooks {
                world: Some(&mut self.chunks),
                predictor: Some(&mut self.predictor),
                inventory: Some(&mut self.inventory),
            },
        );
    }

    async fn send_input(&mut self, dt: f32) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            return Ok(());
        }
        let Some(autopilot) = self.autopilot.as_mut() else {
            return Ok(());
        };

        let command = autopilot.next_input(dt);
        self.predictor.step(command.intent, PLAYER_SPEED, dt);
        self.send_packet(&command.to_packet()).await
    }

    fn render(&mut self) {
        let status = FrameStatus {
            client_id: self.client_id,
            connection_lost: self.connected && self.state.connection_lost(),
            server_tps: self.state.server_tps(),
            darkness: self.state.darkness(),
            ping_ms: self.ping_ms,
            fake_ping_ms: self.fake_ping_ms,
        };
        let view = self.state.current_state();
        self.renderer.render(view.as_ref(), &status);
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut input_interval = interval(INPUT_INTERVAL);
        let mut render_interval = interval(RENDER_INTERVAL);

        let mut buffer = vec![0u8; MAX_PACKET_SIZE];

        while self.renderer.is_open() && !self.stopped {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            match decode_packet(&buffer[..len]) {
                                Ok(packet) => self.handle_packet(packet),
                                Err(e) => warn!("Dropping malformed packet: {}", e),
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = input_interval.tick() => {
                    if let Err(e) = self.send_input(INPUT_INTERVAL.as_secs_f32()).await {
                        error!("Error sending input: {}", e);
                    }
                },

                _ = render_interval.tick() => {
                    self.render();
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
