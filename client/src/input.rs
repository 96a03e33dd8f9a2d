//! Scripted movement input with sequence numbering

use shared::{Packet, Vec2};

/// One movement intent ready to be sent to the server
#[derive(Debug, Clone, PartialEq)]
pub struct InputCommand {
    pub sequence: u32,
    pub intent: Vec2,
    pub direction: f32,
}

impl InputCommand {
    pub fn to_packet(&self) -> Packet {
        Packet::Input {
            sequence: self.sequence,
            move_x: self.intent.x,
            move_y: self.intent.y,
            direction: self.direction,
        }
    }
}

/// Walks the player in a slow circle so there is always motion to watch
pub struct Autopilot {
    next_sequence: u32,
    angle: f32,
    turn_rate: f32,
}

impl Autopilot {
    /// `turn_rate` is in radians per second
    pub fn new(turn_rate: f32) -> Self {
        Self {
            next_sequence: 1,
            angle: 0.0,
            turn_rate,
        }
    }

    pub fn next_input(&mut self, dt: f32) -> InputCommand {
        self.angle = (self.angle + self.turn_rate * dt) % std::f32::consts::TAU;
        let intent = Vec2::new(self.angle.sin(), self.angle.cos());

        let command = InputCommand {
            sequence: self.next_sequence,
            intent,
            direction: intent.angle(),
        };
        self.next_sequence += 1;
        command
    }
}
