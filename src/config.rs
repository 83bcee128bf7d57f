use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub default_network: String,
    pub networks: HashMap<String, NetworkConfig>,
    pub contract: ContractConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: Option<String>,
    pub gas: GasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    pub default_gas_limit: u64,
    pub max_gas_price: Option<u64>,
    pub priority_fee: Option<u64>,
}

/// The one contract this console fronts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Deployed address; empty means "not set" (listing still works).
    pub address: String,
    /// Explicit ABI JSON file; wins over every other source.
    pub abi_file: Option<PathBuf>,
    /// Resolve the verified-contract ABI through the chain explorer.
    pub fetch_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
    pub max_transaction_value: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "sepolia".to_string(),
            NetworkConfig {
                rpc_url: "https://rpc.sepolia.org".to_string(),
                chain_id: 11155111,
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 100000,
                    max_gas_price: Some(20_000_000_000), // 20 Gwei
                    priority_fee: Some(1_000_000_000),   // 1 Gwei
                },
            },
        );

        networks.insert(
            "holesky".to_string(),
            NetworkConfig {
                rpc_url: "https://ethereum-holesky-rpc.publicnode.com".to_string(),
                chain_id: 17000,
                explorer_url: Some("https://holesky.etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 100000,
                    max_gas_price: Some(20_000_000_000), // 20 Gwei
                    priority_fee: Some(1_000_000_000),   // 1 Gwei
                },
            },
        );

        Self {
            default_network: "sepolia".to_string(),
            networks,
            contract: ContractConfig {
                address: String::new(),
                abi_file: None,
                fetch_verified: false,
            },
            security: SecurityConfig {
                allow_write_operations: false,
                max_transaction_value: None,
            },
        }
    }
}

impl Config {
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("failed to read config file {:?}: {}", path, e))?;
        toml::from_str(&content)
            .map_err(|e| anyhow!("failed to parse config file {:?}: {}", path, e))
    }

    /// Load configuration, falling back to defaults, then apply environment
    /// overrides.
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };
        config.apply_env_vars();
        config
    }

    fn apply_env_vars(&mut self) {
        if let Ok(rpc_url) = std::env::var("RPC_URL") {
            tracing::info!("using RPC_URL environment variable for the default network");
            if let Some(network) = self.networks.get_mut(&self.default_network) {
                network.rpc_url = rpc_url;
            }
        }
        if std::env::var("ETHERSCAN_API_KEY").is_ok() {
            tracing::debug!("ETHERSCAN_API_KEY found, will be used for ABI resolution");
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("could not determine config directory"))?;
        Ok(config_dir.join("token-console").join("config.toml"))
    }

    pub fn generate_sample() -> String {
        r#"# token-console configuration
# One ERC20-style contract on a test network.

# Network used when --network is not given
default_network = "sepolia"

[networks.sepolia]
rpc_url = "https://rpc.sepolia.org"
chain_id = 11155111
explorer_url = "https://sepolia.etherscan.io"

[networks.sepolia.gas]
default_gas_limit = 100000
max_gas_price = 20_000_000_000  # 20 Gwei
priority_fee = 1_000_000_000    # 1 Gwei

[networks.holesky]
rpc_url = "https://ethereum-holesky-rpc.publicnode.com"
chain_id = 17000
explorer_url = "https://holesky.etherscan.io"

[networks.holesky.gas]
default_gas_limit = 100000
max_gas_price = 20_000_000_000  # 20 Gwei
priority_fee = 1_000_000_000    # 1 Gwei

[contract]
# Deployed address of the token contract
address = ""
# Optional path to an ABI JSON file; the built-in ERC20 interface is used
# when unset
# abi_file = "token.abi.json"
# Resolve the verified ABI from the chain explorer instead
fetch_verified = false

[security]
allow_write_operations = false
# max_transaction_value = "1000000000000000000"  # 1 ETH in wei

# Environment variables:
# RPC_URL            - overrides the default network's RPC endpoint
# PRIVATE_KEY        - signing key for `send`
# ETHERSCAN_API_KEY  - explorer API key for verified-ABI resolution
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_network, "sepolia");
        assert_eq!(config.networks["sepolia"].chain_id, 11155111);
        assert!(!config.security.allow_write_operations);
        assert!(config.contract.address.is_empty());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.default_network, "sepolia");
        assert_eq!(config.networks.len(), 2);
        assert!(!config.contract.fetch_verified);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.default_network, config.default_network);
        assert_eq!(
            parsed.networks["sepolia"].rpc_url,
            config.networks["sepolia"].rpc_url
        );
    }
}
