use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Word},
    json_abi::{Function, JsonAbi, StateMutability},
    network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::{info, warn};

use super::provider::ChainHandle;
use super::{ChainClient, ClientError, FunctionDescriptor, FunctionList, Mutability, Param};
use crate::coerce::{CoercedArg, ParamKind};
use crate::summary::{self, DecodedEvent, LogRecord, Receipt, TxStatus};

/// Alloy-backed chain client for one contract on one network.
pub struct EthClient {
    handle: ChainHandle,
    abi: JsonAbi,
    address: Option<Address>,
    signer_key: Option<String>,
}

impl EthClient {
    pub fn new(
        handle: ChainHandle,
        abi: JsonAbi,
        address: Option<Address>,
        signer_key: Option<String>,
    ) -> Self {
        Self {
            handle,
            abi,
            address,
            signer_key,
        }
    }

    fn require_address(&self) -> Result<Address, ClientError> {
        self.address.ok_or_else(|| {
            ClientError::Call(
                "contract address not set; pass --address or set [contract].address".to_string(),
            )
        })
    }

    fn find_function(&self, name: &str) -> Result<&Function, ClientError> {
        self.abi.functions().find(|f| f.name == name).ok_or_else(|| {
            let available: Vec<&str> = self.abi.functions().map(|f| f.name.as_str()).collect();
            if available.is_empty() {
                ClientError::Call(format!(
                    "function '{}' not found; the contract interface has no functions",
                    name
                ))
            } else {
                ClientError::Call(format!(
                    "function '{}' not found; available functions: {}",
                    name,
                    available.join(", ")
                ))
            }
        })
    }
}

#[async_trait]
impl ChainClient for EthClient {
    fn list_functions(&self) -> FunctionList {
        split_functions(&self.abi)
    }

    async fn call_read(
        &self,
        name: &str,
        args: &[CoercedArg],
    ) -> Result<Vec<DynSolValue>, ClientError> {
        let address = self.require_address()?;
        let function = self.find_function(name)?;
        let calldata = encode_args(function, args)?;

        let request = TransactionRequest::default().to(address).input(calldata.into());
        let bytes = self
            .handle
            .provider()
            .call(&request)
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;

        function
            .abi_decode_output(&bytes, false)
            .map_err(|e| ClientError::Call(format!("failed to decode result: {}", e)))
    }

    async fn call_write(&self, name: &str, args: &[CoercedArg]) -> Result<Receipt, ClientError> {
        let address = self.require_address()?;
        let key = self.signer_key.as_deref().ok_or_else(|| {
            ClientError::Signing(
                "no signing key configured; set PRIVATE_KEY or pass --private-key".to_string(),
            )
        })?;
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = PrivateKeySigner::from_str(key)
            .map_err(|e| ClientError::Signing(format!("invalid private key: {}", e)))?;
        let from_address = signer.address();

        let function = self.find_function(name)?;
        let calldata = encode_args(function, args)?;

        let network = self.handle.network();
        let url = network.rpc_url.parse().map_err(|e| {
            ClientError::Call(format!("invalid RPC URL '{}': {}", network.rpc_url, e))
        })?;
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        let mut request = provider
            .transaction_request()
            .to(address)
            .input(calldata.into());

        match self
            .handle
            .provider()
            .estimate_gas(&request.clone().from(from_address))
            .await
        {
            Ok(estimated) => request = request.with_gas_limit(estimated),
            Err(e) => {
                warn!("gas estimation failed, using configured default: {}", e);
                request = request.with_gas_limit(network.gas.default_gas_limit);
            }
        }
        if let Some(max_gas_price) = network.gas.max_gas_price {
            request = request.with_gas_price(max_gas_price as u128);
        }

        info!("sending {} transaction from {:?} to {:?}", name, from_address, address);
        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|e| classify_rpc_error(&e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        info!("transaction sent with hash {:?}", tx_hash);

        let receipt = pending.get_receipt().await.map_err(|e| {
            ClientError::Call(format!(
                "transaction was sent but confirmation failed: {}; hash 0x{:x}",
                e, tx_hash
            ))
        })?;

        Ok(map_receipt(&receipt))
    }

    fn decode_log(&self, entry: &LogRecord) -> Option<DecodedEvent> {
        summary::decode_log(&self.abi, entry)
    }
}

/// Split the interface's functions into reads (view/pure) and writes.
pub fn split_functions(abi: &JsonAbi) -> FunctionList {
    let mut list = FunctionList::default();
    for function in abi.functions() {
        let descriptor = FunctionDescriptor {
            name: function.name.clone(),
            inputs: function
                .inputs
                .iter()
                .map(|input| Param {
                    name: input.name.clone(),
                    ty: input.ty.clone(),
                })
                .collect(),
            outputs: function.outputs.iter().map(|output| output.ty.clone()).collect(),
            mutability: match function.state_mutability {
                StateMutability::Pure | StateMutability::View => Mutability::Read,
                _ => Mutability::Write,
            },
        };
        match descriptor.mutability {
            Mutability::Read => list.reads.push(descriptor),
            Mutability::Write => list.writes.push(descriptor),
        }
    }
    list
}

/// Encode a coerced argument list into calldata for `function`.
pub fn encode_args(function: &Function, args: &[CoercedArg]) -> Result<Bytes, ClientError> {
    if args.len() != function.inputs.len() {
        let expected: Vec<String> = function
            .inputs
            .iter()
            .map(|input| format!("{} {}", input.ty, input.name))
            .collect();
        return Err(ClientError::Call(format!(
            "'{}' takes {} argument(s), got {}; expected: [{}]",
            function.name,
            function.inputs.len(),
            args.len(),
            expected.join(", ")
        )));
    }

    let mut values = Vec::with_capacity(args.len());
    for (input, arg) in function.inputs.iter().zip(args) {
        let kind = ParamKind::parse(&input.ty)
            .map_err(|e| ClientError::Call(format!("parameter '{}': {}", input.name, e)))?;
        let value = to_dyn_sol_value(&kind, arg).map_err(|e| {
            ClientError::Call(format!(
                "parameter '{}' of type '{}': {}",
                input.name, input.ty, e
            ))
        })?;
        values.push(value);
    }

    let encoded = function
        .abi_encode_input(&values)
        .map_err(|e| ClientError::Call(format!("failed to encode call: {}", e)))?;
    Ok(encoded.into())
}

/// Turn a coerced argument into its wire value for the declared type.
///
/// This is where the string-carried cases (address, bytes, empty inputs)
/// finally get validated; failures here surface as call errors.
fn to_dyn_sol_value(kind: &ParamKind, arg: &CoercedArg) -> Result<DynSolValue> {
    match (kind, arg) {
        (ParamKind::Bool, CoercedArg::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (ParamKind::Uint(bits), CoercedArg::Uint(num)) => Ok(DynSolValue::Uint(*num, *bits)),
        (ParamKind::Int(bits), CoercedArg::Int(num)) => Ok(DynSolValue::Int(*num, *bits)),
        (ParamKind::Address, CoercedArg::Text(s)) => {
            let address = Address::from_str(s.trim())
                .map_err(|e| anyhow!("invalid address '{}': {}", s, e))?;
            Ok(DynSolValue::Address(address))
        }
        (ParamKind::Str, CoercedArg::Text(s)) => Ok(DynSolValue::String(s.clone())),
        (ParamKind::Bytes, CoercedArg::Text(s)) => {
            let bytes = hex::decode(s.trim_start_matches("0x"))
                .map_err(|_| anyhow!("invalid hex string '{}'", s))?;
            Ok(DynSolValue::Bytes(bytes))
        }
        (ParamKind::FixedBytes(n), CoercedArg::Text(s)) => {
            let bytes = hex::decode(s.trim_start_matches("0x"))
                .map_err(|_| anyhow!("invalid hex string '{}'", s))?;
            if bytes.len() > *n {
                return Err(anyhow!("{} byte(s) is too long for bytes{}", bytes.len(), n));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(Word::from(word), *n))
        }
        (ParamKind::Array(elem), CoercedArg::List(items)) => Ok(DynSolValue::Array(
            items
                .iter()
                .map(|item| to_dyn_sol_value(elem, item))
                .collect::<Result<Vec<_>>>()?,
        )),
        (ParamKind::FixedArray(elem, n), CoercedArg::List(items)) => {
            if items.len() != *n {
                return Err(anyhow!("expected {} element(s), got {}", n, items.len()));
            }
            Ok(DynSolValue::FixedArray(
                items
                    .iter()
                    .map(|item| to_dyn_sol_value(elem, item))
                    .collect::<Result<Vec<_>>>()?,
            ))
        }
        (_, CoercedArg::Text(s)) if s.is_empty() => {
            Err(anyhow!("empty value cannot be encoded as {}", kind))
        }
        _ => Err(anyhow!("argument does not match declared type {}", kind)),
    }
}

/// Map an alloy receipt into the display model.
fn map_receipt(receipt: &alloy::rpc::types::TransactionReceipt) -> Receipt {
    let status = if receipt.status() {
        TxStatus::Success
    } else {
        TxStatus::Failure
    };

    Receipt {
        status,
        block_number: receipt.block_number,
        from: Some(format!("0x{:x}", receipt.from)),
        to: receipt.to.map(|a| format!("0x{:x}", a)),
        tx_hash: Some(format!("0x{:x}", receipt.transaction_hash)),
        gas_used: Some(receipt.gas_used() as u64),
        logs: receipt
            .inner
            .logs()
            .iter()
            .map(|log| LogRecord {
                address: format!("0x{:x}", log.address()),
                topics: log.topics().to_vec(),
                data: log.data().data.clone(),
            })
            .collect(),
    }
}

/// Sort an RPC failure into the revert/call taxonomy, keeping the node's
/// message intact.
fn classify_rpc_error(message: &str) -> ClientError {
    if message.contains("execution reverted") || message.contains("revert") {
        ClientError::Revert(message.to_string())
    } else if message.contains("insufficient funds") {
        ClientError::Call(format!(
            "{} (the sending account cannot cover value plus gas)",
            message
        ))
    } else {
        ClientError::Call(message.to_string())
    }
}

/// Validate and parse a contract address string.
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();
    if address.is_empty() {
        return Err(anyhow!("address cannot be empty"));
    }
    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!("address '{}' must start with 0x", address));
    }
    if address.len() != 42 {
        return Err(anyhow!(
            "address '{}' must be 42 characters (0x plus 40 hex digits)",
            address
        ));
    }
    Address::from_str(address).map_err(|e| anyhow!("invalid address '{}': {}", address, e))
}
