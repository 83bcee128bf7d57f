use alloy::json_abi::JsonAbi;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// The interface the original page ships with: a plain ERC20 token.
/// Used whenever nothing better is configured.
const ERC20_ABI: &str = r#"[
  {"type":"function","name":"name","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"symbol","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"decimals","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint8"}]},
  {"type":"function","name":"totalSupply","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"allowance","stateMutability":"view","inputs":[{"name":"owner","type":"address"},{"name":"spender","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"transfer","stateMutability":"nonpayable","inputs":[{"name":"recipient","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"approve","stateMutability":"nonpayable","inputs":[{"name":"spender","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"transferFrom","stateMutability":"nonpayable","inputs":[{"name":"sender","type":"address"},{"name":"recipient","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"event","name":"Transfer","anonymous":false,"inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]},
  {"type":"event","name":"Approval","anonymous":false,"inputs":[{"name":"owner","type":"address","indexed":true},{"name":"spender","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]}
]"#;

pub fn builtin_erc20() -> Result<JsonAbi> {
    serde_json::from_str(ERC20_ABI).map_err(|e| anyhow!("built-in ERC20 ABI is invalid: {}", e))
}

/// Where to get the contract interface from.
#[derive(Debug, Clone)]
pub struct AbiRequest {
    /// Explicit ABI JSON file; wins over everything else.
    pub file: Option<PathBuf>,
    pub network: String,
    pub address: String,
    /// Ask the chain explorer for the verified-contract ABI.
    pub fetch_verified: bool,
}

/// Loads contract interfaces: explicit file, explorer verified-contract API
/// (memory cache, then disk cache, then HTTP), or the built-in ERC20.
#[derive(Debug)]
pub struct AbiStore {
    http: reqwest::Client,
    cache_dir: PathBuf,
    api_key: Option<String>,
    memory: HashMap<String, JsonAbi>,
}

impl Default for AbiStore {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("token-console")
            .join("abi-cache");
        Self::with_cache_dir(cache_dir)
    }
}

impl AbiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache_dir,
            api_key: std::env::var("ETHERSCAN_API_KEY").ok(),
            memory: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, request: &AbiRequest) -> Result<JsonAbi> {
        if let Some(path) = &request.file {
            return load_file(path).await;
        }

        if request.fetch_verified && !request.address.is_empty() {
            match self.verified(&request.network, &request.address).await {
                Ok(abi) => return Ok(abi),
                Err(e) => {
                    warn!(
                        "verified ABI resolution failed for {}: {}; using the built-in ERC20 interface",
                        request.address, e
                    );
                }
            }
        }

        builtin_erc20()
    }

    /// Verified-contract ABI with caching: memory, then disk, then the
    /// explorer API.
    async fn verified(&mut self, network: &str, address: &str) -> Result<JsonAbi> {
        let address = address.to_lowercase();
        let cache_key = format!("{}_{}", network, address);

        if let Some(abi) = self.memory.get(&cache_key) {
            debug!("ABI cache hit for {}", address);
            return Ok(abi.clone());
        }

        if let Ok(abi) = self.load_cached(&cache_key).await {
            debug!("ABI disk cache hit for {}", address);
            self.memory.insert(cache_key, abi.clone());
            return Ok(abi);
        }

        info!("fetching verified ABI for {} from the {} explorer", address, network);
        let abi = self.fetch_verified(network, &address).await?;

        if let Err(e) = self.cache(&cache_key, &abi).await {
            warn!("failed to cache ABI for {}: {}", address, e);
        }
        self.memory.insert(cache_key, abi.clone());
        Ok(abi)
    }

    async fn fetch_verified(&self, network: &str, address: &str) -> Result<JsonAbi> {
        let base = explorer_api_base(network)
            .ok_or_else(|| anyhow!("no explorer API known for network '{}'", network))?;

        let mut url = format!(
            "{}/api?module=contract&action=getabi&address={}&format=json",
            base, address
        );
        if let Some(api_key) = &self.api_key {
            url.push_str(&format!("&apikey={}", api_key));
        }

        let response: Value = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("explorer request failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow!("explorer response was not JSON: {}", e))?;

        if response["status"] != "1" {
            let message = response["message"].as_str().unwrap_or("unknown error");
            return Err(anyhow!("explorer API error: {}", message));
        }

        let abi_str = response["result"]
            .as_str()
            .ok_or_else(|| anyhow!("explorer response carried no ABI"))?;
        if abi_str.contains("not verified") {
            return Err(anyhow!("contract source is not verified on the explorer"));
        }

        serde_json::from_str(abi_str).map_err(|e| anyhow!("explorer returned invalid ABI JSON: {}", e))
    }

    async fn load_cached(&self, cache_key: &str) -> Result<JsonAbi> {
        let path = self.cache_dir.join(format!("{}.json", cache_key));
        let content = fs::read_to_string(&path).await?;
        serde_json::from_str(&content).map_err(|e| anyhow!("corrupt cached ABI {:?}: {}", path, e))
    }

    async fn cache(&self, cache_key: &str, abi: &JsonAbi) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir).await?;
        }
        let path = self.cache_dir.join(format!("{}.json", cache_key));
        let content = serde_json::to_string_pretty(abi)?;
        fs::write(&path, content).await?;
        debug!("cached ABI to {:?}", path);
        Ok(())
    }
}

/// Load a contract interface from an ABI JSON file. Accepts either a bare
/// ABI array or a compiler artifact with an `abi` field.
pub async fn load_file(path: &Path) -> Result<JsonAbi> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("failed to read ABI file {:?}: {}", path, e))?;

    if let Ok(abi) = serde_json::from_str::<JsonAbi>(&content) {
        return Ok(abi);
    }

    let artifact: Value = serde_json::from_str(&content)
        .map_err(|e| anyhow!("ABI file {:?} is not valid JSON: {}", path, e))?;
    serde_json::from_value(artifact["abi"].clone())
        .map_err(|e| anyhow!("ABI file {:?} contains no usable ABI: {}", path, e))
}

fn explorer_api_base(network: &str) -> Option<&'static str> {
    match network {
        "ethereum" | "mainnet" => Some("https://api.etherscan.io"),
        "sepolia" => Some("https://api-sepolia.etherscan.io"),
        "holesky" => Some("https://api-holesky.etherscan.io"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_erc20_shape() {
        let abi = builtin_erc20().unwrap();
        assert_eq!(abi.functions().count(), 9);
        assert_eq!(abi.events().count(), 2);
        assert!(abi.functions().any(|f| f.name == "balanceOf"));
        assert!(abi.events().any(|e| e.name == "Transfer"));
    }

    #[tokio::test]
    async fn test_load_file_bare_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abi.json");
        std::fs::write(&path, ERC20_ABI).unwrap();

        let abi = load_file(&path).await.unwrap();
        assert_eq!(abi.functions().count(), 9);
    }

    #[tokio::test]
    async fn test_load_file_compiler_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.json");
        std::fs::write(&path, format!(r#"{{"contractName":"Token","abi":{}}}"#, ERC20_ABI)).unwrap();

        let abi = load_file(&path).await.unwrap();
        assert_eq!(abi.functions().count(), 9);
    }

    #[tokio::test]
    async fn test_resolve_prefers_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abi.json");
        std::fs::write(&path, r#"[{"type":"function","name":"ping","stateMutability":"view","inputs":[],"outputs":[]}]"#).unwrap();

        let mut store = AbiStore::with_cache_dir(dir.path().to_path_buf());
        let abi = store
            .resolve(&AbiRequest {
                file: Some(path),
                network: "sepolia".to_string(),
                address: String::new(),
                fetch_verified: false,
            })
            .await
            .unwrap();
        assert_eq!(abi.functions().count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_defaults_to_builtin() {
        let dir = tempdir().unwrap();
        let mut store = AbiStore::with_cache_dir(dir.path().to_path_buf());
        let abi = store
            .resolve(&AbiRequest {
                file: None,
                network: "sepolia".to_string(),
                address: String::new(),
                fetch_verified: false,
            })
            .await
            .unwrap();
        assert_eq!(abi.functions().count(), 9);
    }

    #[tokio::test]
    async fn test_disk_cache_round_trip() {
        let dir = tempdir().unwrap();
        let store = AbiStore::with_cache_dir(dir.path().to_path_buf());
        let abi = builtin_erc20().unwrap();

        store.cache("sepolia_0xabc", &abi).await.unwrap();
        let loaded = store.load_cached("sepolia_0xabc").await.unwrap();
        assert_eq!(loaded.functions().count(), abi.functions().count());
    }
}
