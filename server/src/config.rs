use shared::TICK_RATE;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tick_rate: u32,
    pub max_clients: usize,
    /// Artificial delay applied to every outgoing world update
    pub simulated_latency: Duration,
    /// Chunks streamed around a player, in chunks from their own
    pub view_distance: i32,
    /// Other objects within this distance are included in a player's update
    pub nearby_radius: f32,
    pub client_timeout: Duration,
    pub wanderers: usize,
    pub drifters: usize,
    pub pickups: usize,
    pub seed: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            tick_rate: TICK_RATE,
            max_clients: 32,
            simulated_latency: Duration::ZERO,
            view_distance: 1,
            nearby_radius: 600.0,
            client_timeout: Duration::from_secs(5),
            wanderers: 12,
            drifters: 4,
            pickups: 10,
            seed: 7,
        }
    }
}

impl ServerConfig {
    /// Target time between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_interval() {
        let config = ServerConfig {
            tick_rate: 20,
            ..ServerConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_zero_tick_rate_does_not_divide_by_zero() {
        let config = ServerConfig {
            tick_rate: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }
}
