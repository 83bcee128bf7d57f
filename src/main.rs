mod chain;
mod coerce;
mod config;
mod console;
mod summary;

use anyhow::{anyhow, Result};
use chain::abi::{AbiRequest, AbiStore};
use chain::client::{self, EthClient};
use chain::provider::ChainHandle;
use clap::{Arg, ArgAction, Command};
use config::Config;
use console::{Console, ConsoleContext};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = Command::new("token-console")
        .version("0.1.0")
        .about("Terminal front-end for an ERC20-style token contract on a test network")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .help("Network to use (sepolia, holesky)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_name("ADDRESS")
                .help("Deployed contract address"),
        )
        .arg(
            Arg::new("abi")
                .long("abi")
                .value_name("FILE")
                .help("Contract ABI JSON file (defaults to the built-in ERC20 interface)"),
        )
        .arg(
            Arg::new("private-key")
                .long("private-key")
                .value_name("HEX")
                .help("Signing key for `send` (or set PRIVATE_KEY)"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .help("Allow write operations (transactions)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("list").about("List the contract's read and write functions"))
        .subcommand(
            Command::new("call")
                .about("Call a read-only function")
                .arg(Arg::new("function").required(true))
                .arg(Arg::new("args").num_args(0..).allow_hyphen_values(true)),
        )
        .subcommand(
            Command::new("send")
                .about("Submit a state-changing function call")
                .arg(Arg::new("function").required(true))
                .arg(Arg::new("args").num_args(0..).allow_hyphen_values(true)),
        )
        .subcommand(Command::new("abi").about("Print the loaded contract interface"))
        .get_matches();

    // Handle special commands first
    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }
    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    // Load configuration, then apply command line overrides
    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    if let Some(network) = matches.get_one::<String>("network") {
        config.default_network = network.clone();
    }
    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        if let Some(network) = config.networks.get_mut(&config.default_network) {
            network.rpc_url = rpc_url.clone();
        }
    }
    if let Some(address) = matches.get_one::<String>("address") {
        config.contract.address = address.clone();
    }
    if let Some(abi_file) = matches.get_one::<String>("abi") {
        config.contract.abi_file = Some(abi_file.into());
    }
    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    let Some((command, sub)) = matches.subcommand() else {
        return Err(anyhow!("missing command; try `list`, `call`, `send` or `abi`"));
    };

    let handle = ChainHandle::connect(&config, None)?;
    info!("network: {} (chain id {})", handle.name(), handle.network().chain_id);
    info!(
        "write operations allowed: {}",
        config.security.allow_write_operations
    );

    let mut store = AbiStore::new();
    let abi = store
        .resolve(&AbiRequest {
            file: config.contract.abi_file.clone(),
            network: handle.name().to_string(),
            address: config.contract.address.clone(),
            fetch_verified: config.contract.fetch_verified,
        })
        .await?;

    if command == "abi" {
        println!("{}", serde_json::to_string_pretty(&abi)?);
        return Ok(());
    }

    let address = if config.contract.address.is_empty() {
        None
    } else {
        Some(client::validate_address(&config.contract.address)?)
    };
    let signer_key = matches
        .get_one::<String>("private-key")
        .cloned()
        .or_else(|| std::env::var("PRIVATE_KEY").ok());

    if matches!(command, "call" | "send") {
        handle.validate_connection().await?;
    }

    let ctx = ConsoleContext {
        network: handle.name().to_string(),
        chain_id: handle.network().chain_id,
        contract: config.contract.address.clone(),
        explorer_url: handle.network().explorer_url.clone(),
    };
    let client = EthClient::new(handle, abi, address, signer_key);
    let console = Console::new(&client, ctx);

    match command {
        "list" => {
            console.list();
            Ok(())
        }
        "call" | "send" => {
            let function = sub
                .get_one::<String>("function")
                .ok_or_else(|| anyhow!("missing function name"))?;
            let raw_args: Vec<String> = sub
                .get_many::<String>("args")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();

            if command == "call" {
                console.call(function, &raw_args).await
            } else {
                console
                    .send(function, &raw_args, config.security.allow_write_operations)
                    .await
            }
        }
        other => Err(anyhow!("unknown command '{}'", other)),
    }
}
