use crate::config::{Config, NetworkConfig};
use alloy::{
    providers::{Provider, ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Result};

/// The selected network: its configuration plus a connected HTTP provider.
///
/// Selection happens once, at startup; everything downstream works against
/// this one handle.
#[derive(Debug)]
pub struct ChainHandle {
    name: String,
    network: NetworkConfig,
    provider: RootProvider<Http<Client>>,
}

impl ChainHandle {
    /// Pick `network` (or the configured default) and build its provider.
    pub fn connect(config: &Config, network: Option<&str>) -> Result<Self> {
        let name = network.unwrap_or(&config.default_network);
        let network = config.networks.get(name).ok_or_else(|| {
            let available: Vec<&str> = config.networks.keys().map(String::as_str).collect();
            anyhow!(
                "unknown network '{}'; configured networks: {}",
                name,
                available.join(", ")
            )
        })?;

        let provider = ProviderBuilder::new().on_http(
            network
                .rpc_url
                .parse()
                .map_err(|e| anyhow!("invalid RPC URL '{}': {}", network.rpc_url, e))?,
        );

        Ok(Self {
            name: name.to_string(),
            network: network.clone(),
            provider,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }

    /// Probe the endpoint before doing real work, and warn when the node's
    /// chain id disagrees with the configured one.
    pub async fn validate_connection(&self) -> Result<()> {
        let chain_id = self.provider.get_chain_id().await.map_err(|e| {
            anyhow!(
                "cannot connect to network '{}' at {}: {}",
                self.name,
                self.network.rpc_url,
                e
            )
        })?;

        if chain_id != self.network.chain_id {
            tracing::warn!(
                "network '{}' reports chain id {} but is configured as {}",
                self.name,
                chain_id,
                self.network.chain_id
            );
        }
        Ok(())
    }
}
