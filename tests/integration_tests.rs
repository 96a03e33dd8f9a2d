//! Integration tests across the server tick loop, the wire codec and the
//! client state manager.

use assert_approx_eq::assert_approx_eq;
use bincode::{deserialize, serialize};
use client::clock::ManualClock;
use client::collaborators::{ChunkCache, Hooks, Inventory, PredictedPosition};
use client::state::{ClientConfig, StateManager};
use server::game::Game;
use server::tick::TickLoop;
use server::world::ChunkWorld;
use shared::{decode_packet, encode_packet, Packet, Vec2, WorldUpdate};
use std::net::UdpSocket;
use std::thread;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const TICK: Duration = Duration::from_millis(50);
const FIRST_SEND: u64 = 1_000;
const NETWORK_DELAY: i64 = 20;

/// Runs `ticks` server ticks and returns player 1's updates in order
fn run_server(ticks: u32) -> Vec<WorldUpdate> {
    let mut game = Game::new(ChunkWorld::new(1, 10_000.0), 11);
    game.add_player(1, "ada");
    game.add_player(2, "bob");
    game.set_input(1, 1, Vec2::new(1.0, 0.0), 0.5);

    let start = Instant::now();
    let mut tick_loop = TickLoop::new(TICK, start);
    let mut received = Vec::new();

    for k in 0..ticks {
        let started = start + TICK * k;
        let server_time = FIRST_SEND + 50 * k as u64;
        for (id, update) in tick_loop.run_tick(&mut game, started, server_time) {
            if id == 1 {
                received.push(update);
            }
        }
        tick_loop.finish_tick(started + Duration::from_millis(5));
    }

    received
}

mod pipeline_tests {
    use super::*;

    struct Receiver {
        clock: ManualClock,
        state: StateManager<ManualClock>,
        chunks: ChunkCache,
        predictor: PredictedPosition,
        inventory: Inventory,
    }

    impl Receiver {
        fn new() -> Self {
            let clock = ManualClock::new(0);
            Self {
                state: StateManager::with_clock(ClientConfig::default(), clock.clone()),
                clock,
                chunks: ChunkCache::new(),
                predictor: PredictedPosition::default(),
                inventory: Inventory::new(),
            }
        }

        fn deliver(&mut self, update: &WorldUpdate) {
            self.clock.set(update.t as i64 + NETWORK_DELAY);
            self.state.ingest(
                update,
                Hooks {
                    world: Some(&mut self.chunks),
                    predictor: Some(&mut self.predictor),
                    inventory: Some(&mut self.inventory),
                },
            );
        }
    }

    fn x_at(update: &WorldUpdate) -> f64 {
        update.player.dynamic_fields["x"]
    }

    /// Server updates flow through the codec and come out interpolated
    #[test]
    fn server_ticks_render_smoothly_on_the_client() {
        let updates = run_server(6);
        assert_eq!(updates.len(), 6);

        let mut receiver = Receiver::new();
        for update in &updates {
            let packet = encode_packet(&Packet::WorldUpdate(Box::new(update.clone()))).unwrap();
            match decode_packet(&packet).unwrap() {
                Packet::WorldUpdate(decoded) => receiver.deliver(&decoded),
                other => panic!("Unexpected packet {:?}", other),
            }
        }

        // Render time trails the newest update by the render delay
        let last_t = updates[5].t as i64;
        assert_eq!(receiver.state.render_time(), Some(last_t - 100));

        let view = receiver.state.current_state().unwrap();
        assert_approx_eq!(view.player.number("x").unwrap(), x_at(&updates[3]), 1e-6);

        // Halfway between the fourth and fifth tick
        receiver.clock.set(last_t + NETWORK_DELAY + 25);
        let view = receiver.state.current_state().unwrap();
        let expected = (x_at(&updates[3]) + x_at(&updates[4])) / 2.0;
        assert_approx_eq!(view.player.number("x").unwrap(), expected, 1e-6);

        let other_ids: Vec<u32> = view.others.iter().map(|o| o.id).collect();
        assert_eq!(other_ids, vec![2]);
        assert_eq!(view.player.text("username"), Some("ada"));
    }

    #[test]
    fn collaborators_receive_world_and_corrections() {
        let updates = run_server(3);
        let mut receiver = Receiver::new();
        for update in &updates {
            receiver.deliver(update);
        }

        assert!(!receiver.chunks.is_empty());
        assert!(receiver.predictor.corrections >= 1);
        assert_eq!(receiver.state.roster().len(), 2);
        assert_approx_eq!(receiver.state.server_tps(), 20.0, 1e-3);
    }

    #[test]
    fn silence_is_reported_but_last_state_stays_visible() {
        let updates = run_server(4);
        let mut receiver = Receiver::new();
        for update in &updates {
            receiver.deliver(update);
        }
        assert!(!receiver.state.connection_lost());

        receiver.clock.advance(250);
        assert!(receiver.state.connection_lost());
        assert!(receiver.state.current_state().is_some());

        // A late update clears the condition
        let mut late = updates[3].clone();
        late.t += 300;
        receiver.deliver(&late);
        assert!(!receiver.state.connection_lost());
    }

    #[test]
    fn overrunning_ticks_are_dropped_not_replayed() {
        let mut game = Game::new(ChunkWorld::new(1, 600.0), 5);
        game.add_player(1, "ada");

        let start = Instant::now();
        let mut tick_loop = TickLoop::new(TICK, start);
        tick_loop.run_tick(&mut game, start, FIRST_SEND);

        let schedule = tick_loop.finish_tick(start + Duration::from_millis(80));
        assert!(schedule.fell_behind);
        assert_eq!(schedule.delay, Duration::ZERO);

        let resumed = start + Duration::from_millis(80);
        let updates = tick_loop.run_tick(&mut game, resumed, FIRST_SEND + 80);
        assert_eq!(updates.len(), 1);
        assert_eq!(game.tick, 2);

        let schedule = tick_loop.finish_tick(resumed + Duration::from_millis(5));
        assert!(!schedule.fell_behind);
        assert_eq!(schedule.delay, Duration::from_millis(45));
        assert_eq!(tick_loop.scheduler().overruns(), 1);
    }
}

mod protocol_tests {
    use super::*;

    /// Packets sent through a real UDP socket decode on the other side
    #[tokio::test]
    async fn udp_socket_communication() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server_socket.local_addr().unwrap();

        let echo = server_socket.try_clone().unwrap();
        thread::spawn(move || {
            let mut buf = vec![0; shared::MAX_PACKET_SIZE];
            if let Ok((size, client_addr)) = echo.recv_from(&mut buf) {
                let _ = echo.send_to(&buf[..size], client_addr);
            }
        });

        sleep(Duration::from_millis(10)).await;

        let client_socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
        client_socket
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();

        let update = run_server(1).remove(0);
        let sent = Packet::WorldUpdate(Box::new(update.clone()));
        client_socket
            .send_to(&encode_packet(&sent).unwrap(), server_addr)
            .unwrap();

        let mut buf = vec![0; shared::MAX_PACKET_SIZE];
        let (size, _) = client_socket.recv_from(&mut buf).unwrap();
        let received: Packet = deserialize(&buf[..size]).unwrap();

        match received {
            Packet::WorldUpdate(received) => assert_eq!(*received, update),
            other => panic!("Unexpected packet {:?}", other),
        }
    }

    #[test]
    fn codec_matches_plain_bincode() {
        let packet = Packet::Input {
            sequence: 42,
            move_x: 1.0,
            move_y: -1.0,
            direction: 0.25,
        };
        assert_eq!(encode_packet(&packet).unwrap(), serialize(&packet).unwrap());
    }

    #[test]
    fn truncated_datagrams_are_rejected() {
        let data = encode_packet(&Packet::Click { x: 10.0, y: 20.0 }).unwrap();
        assert!(decode_packet(&data[..data.len() - 1]).is_err());
    }
}
