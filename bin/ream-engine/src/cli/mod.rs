pub mod verbosity;

use std::{net::IpAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use ream_execution_engine::config::{
    DEFAULT_EXECUTION_ENDPOINT, DEFAULT_MAX_ATTEMPTS, ExecutionEngineConfig, RetryConfig,
};
use ream_network_spec::{chain_spec::ChainSpec, cli::chain_spec_parser};
use url::Url;
use verbosity::{Verbosity, verbosity_parser};

const DEFAULT_NETWORK: &str = "mainnet";
const DEFAULT_REQUEST_TIMEOUT: &str = "8";
const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 100;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 2_000;
const DEFAULT_PAYLOAD_TTL: &str = "24";
const DEFAULT_UPCHECK_INTERVAL: &str = "12";
const DEFAULT_METRICS_ADDRESS: &str = "127.0.0.1";
const DEFAULT_METRICS_PORT: u16 = 8080;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level, 1 (error) to 5 (trace)
    #[arg(short, long, default_value = "3", value_parser = verbosity_parser)]
    pub verbosity: Verbosity,

    #[arg(
        long,
        help = "Choose mainnet, holesky, sepolia, hoodi, dev, or a path to a config.yaml",
        default_value = DEFAULT_NETWORK,
        value_parser = chain_spec_parser
    )]
    pub network: Arc<ChainSpec>,

    #[arg(long, help = "Set HTTP url of the execution client's authenticated Engine API", default_value = DEFAULT_EXECUTION_ENDPOINT)]
    pub execution_endpoint: Url,

    #[arg(long, env = "REAM_JWT_SECRET", help = "Path to the hex encoded secret shared with the execution client")]
    pub execution_jwt_secret: PathBuf,

    #[arg(long, help = "Optional id claim sent in every JWT")]
    pub execution_jwt_id: Option<String>,

    #[arg(long, help = "Set per attempt timeout in seconds for Engine API calls", default_value = DEFAULT_REQUEST_TIMEOUT, value_parser = duration_parser)]
    pub request_timeout: Duration,

    #[arg(long, help = "Total attempts per Engine API call", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    #[arg(long, help = "Delay in milliseconds before the first retry", default_value_t = DEFAULT_RETRY_INITIAL_DELAY_MS)]
    pub retry_initial_delay_ms: u64,

    #[arg(long, help = "Upper bound in milliseconds for the delay between retries", default_value_t = DEFAULT_RETRY_MAX_DELAY_MS)]
    pub retry_max_delay_ms: u64,

    #[arg(long, help = "Seconds a payload build stays retrievable", default_value = DEFAULT_PAYLOAD_TTL, value_parser = duration_parser)]
    pub payload_ttl: Duration,

    #[arg(long, help = "Seconds between execution client health checks", default_value = DEFAULT_UPCHECK_INTERVAL, value_parser = duration_parser)]
    pub upcheck_interval: Duration,

    /// Serve prometheus metrics
    #[arg(long)]
    pub enable_metrics: bool,

    #[arg(long, help = "Set metrics address", default_value = DEFAULT_METRICS_ADDRESS)]
    pub metrics_address: IpAddr,

    #[arg(long, help = "Set metrics port", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}

impl Cli {
    pub fn to_engine_config(&self) -> ExecutionEngineConfig {
        ExecutionEngineConfig::new(
            self.execution_endpoint.clone(),
            self.execution_jwt_secret.clone(),
        )
        .with_request_timeout(self.request_timeout)
        .with_retry(RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        })
        .with_payload_ttl(self.payload_ttl)
        .with_jwt_claims(
            self.execution_jwt_id.clone(),
            Some(format!("ream-engine/{}", env!("CARGO_PKG_VERSION"))),
        )
    }
}

pub fn duration_parser(duration_string: &str) -> Result<Duration, String> {
    Ok(Duration::from_secs(duration_string.parse().map_err(
        |err| format!("Could not parse the duration: {err:?}"),
    )?))
}

#[cfg(test)]
mod tests {
    use ream_network_spec::chain_spec::Network;

    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["program", "--execution-jwt-secret", "/tmp/jwt.hex"]);

        assert_eq!(cli.verbosity, Verbosity::Info);
        assert_eq!(cli.network.network, Network::Mainnet);

        let config = cli.to_engine_config();
        assert_eq!(config.endpoint.as_str(), "http://127.0.0.1:8551/");
        assert_eq!(config.request_timeout, Duration::from_secs(8));
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.payload_ttl, Duration::from_secs(24));
        assert!(config.client_version.is_some_and(|clv| clv.starts_with("ream-engine/")));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "program",
            "--verbosity",
            "5",
            "--network",
            "hoodi",
            "--execution-endpoint",
            "http://10.0.0.2:8551",
            "--execution-jwt-secret",
            "/tmp/jwt.hex",
            "--max-attempts",
            "5",
            "--payload-ttl",
            "36",
        ]);

        assert_eq!(cli.verbosity, Verbosity::Trace);
        assert_eq!(cli.network.network, Network::Hoodi);
        let config = cli.to_engine_config();
        assert_eq!(config.endpoint.host_str(), Some("10.0.0.2"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.payload_ttl, Duration::from_secs(36));
    }

    #[test]
    fn test_rejects_bad_duration() {
        assert!(duration_parser("soon").is_err());
        assert_eq!(duration_parser("3"), Ok(Duration::from_secs(3)));
    }
}
