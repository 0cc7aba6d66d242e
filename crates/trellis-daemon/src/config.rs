// crates/trellis-daemon/src/config.rs
//
// Runtime configuration for the Trellis daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;
use std::time::Duration;

use trellis_publish::PublishSchedule;
use trellis_reputation::{ScoreConfig, DEFAULT_CAPACITIES};
use trellis_rpc::RpcConfig;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Directory for local data storage (the RocksDB graph store).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Host address for the RPC server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// URL of the IPFS API endpoint.
    #[serde(default = "default_ipfs_api_url")]
    pub ipfs_api_url: String,

    /// Where identities are published: "ipfs", or "memory" for a node that
    /// keeps everything in process (graph store included).
    #[serde(default = "default_network")]
    pub network: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_publish_startup_delay_secs")]
    pub publish_startup_delay_secs: u64,

    #[serde(default = "default_publish_period_secs")]
    pub publish_period_secs: u64,

    /// Minimum trust value that carries rank.
    #[serde(default = "default_positive_trust_threshold")]
    pub positive_trust_threshold: i32,

    /// Capacity per rank; its length is the rank cutoff.
    #[serde(default = "default_capacities")]
    pub capacities: Vec<u32>,
}

fn default_data_dir() -> String {
    "~/.trellis/data".to_string()
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    50051
}

fn default_ipfs_api_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_network() -> String {
    "ipfs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_publish_startup_delay_secs() -> u64 {
    30
}

fn default_publish_period_secs() -> u64 {
    30 * 60
}

fn default_positive_trust_threshold() -> i32 {
    1
}

fn default_capacities() -> Vec<u32> {
    DEFAULT_CAPACITIES.to_vec()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            ipfs_api_url: default_ipfs_api_url(),
            network: default_network(),
            log_level: default_log_level(),
            publish_startup_delay_secs: default_publish_startup_delay_secs(),
            publish_period_secs: default_publish_period_secs(),
            positive_trust_threshold: default_positive_trust_threshold(),
            capacities: default_capacities(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn rpc(&self) -> RpcConfig {
        RpcConfig {
            host: self.rpc_host.clone(),
            port: self.rpc_port,
        }
    }

    pub fn score(&self) -> ScoreConfig {
        ScoreConfig {
            capacities: self.capacities.clone(),
            positive_threshold: self.positive_trust_threshold,
        }
    }

    pub fn schedule(&self) -> PublishSchedule {
        PublishSchedule {
            startup_delay: Duration::from_secs(self.publish_startup_delay_secs),
            period: Duration::from_secs(self.publish_period_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.rpc().port, 50051);
        assert_eq!(config.network, "ipfs");
        assert_eq!(config.score(), ScoreConfig::default());
        assert_eq!(config.schedule(), PublishSchedule::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
            data_dir = "/var/lib/trellis"
            network = "memory"
            rpc_port = 6000
            publish_period_secs = 60
            capacities = [100, 50, 10]
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, "/var/lib/trellis");
        assert_eq!(config.network, "memory");
        assert_eq!(config.rpc().port, 6000);
        assert_eq!(config.schedule().period, Duration::from_secs(60));
        assert_eq!(config.schedule().startup_delay, Duration::from_secs(30));
        assert_eq!(config.score().capacities, vec![100, 50, 10]);
        assert!(config.score().validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(DaemonConfig::load("/nonexistent/trellis.toml").is_err());
    }
}
