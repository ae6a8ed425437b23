//! Command-line configuration for the server binary.

use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on (0 picks a free port)
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Fixed simulation step in milliseconds
    #[arg(long, default_value = "16")]
    pub tick_ms: u64,

    /// Interval between state broadcasts in milliseconds
    #[arg(long, default_value = "50")]
    pub broadcast_ms: u64,

    /// World generation seed
    #[arg(long, default_value = "12345")]
    pub seed: u64,

    /// Maximum number of concurrent sessions
    #[arg(long, default_value = "32")]
    pub max_clients: usize,

    /// Villagers placed at startup
    #[arg(long, default_value = "24")]
    pub villagers: usize,

    /// Police officers placed at startup
    #[arg(long, default_value = "6")]
    pub police: usize,

    /// Seconds of silence before a session is dropped
    #[arg(long, default_value = "30")]
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tick_ms: 16,
            broadcast_ms: 50,
            seed: 12345,
            max_clients: 32,
            villagers: 24,
            police: 6,
            idle_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Simulation step. Never zero.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_ms.max(1))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli() {
        let parsed = ServerConfig::parse_from(["server"]);
        let default = ServerConfig::default();
        assert_eq!(parsed.address(), default.address());
        assert_eq!(parsed.tick_ms, default.tick_ms);
        assert_eq!(parsed.broadcast_ms, default.broadcast_ms);
        assert_eq!(parsed.seed, default.seed);
        assert_eq!(parsed.max_clients, default.max_clients);
        assert_eq!(parsed.villagers, default.villagers);
        assert_eq!(parsed.police, default.police);
        assert_eq!(parsed.idle_timeout_secs, default.idle_timeout_secs);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "server",
            "--port",
            "9001",
            "--tick-ms",
            "20",
            "--seed",
            "7",
            "--police",
            "0",
        ]);
        assert_eq!(config.address(), "127.0.0.1:9001");
        assert_eq!(config.tick_duration(), Duration::from_millis(20));
        assert_eq!(config.seed, 7);
        assert_eq!(config.police, 0);
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config = ServerConfig {
            tick_ms: 0,
            broadcast_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(1));
        assert_eq!(config.broadcast_interval(), Duration::from_millis(1));
    }
}
