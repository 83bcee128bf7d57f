pub mod abi;
pub mod client;
pub mod provider;

use alloy::dyn_abi::DynSolValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coerce::CoercedArg;
use crate::summary::{DecodedEvent, LogRecord, Receipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutability {
    Read,
    Write,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

/// One callable contract function as loaded from the interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<String>,
    pub mutability: Mutability,
}

impl FunctionDescriptor {
    /// Human-readable signature for listings, e.g.
    /// `balanceOf(address account) -> uint256`.
    pub fn signature(&self) -> String {
        let inputs = self
            .inputs
            .iter()
            .map(|p| {
                if p.name.is_empty() {
                    p.ty.clone()
                } else {
                    format!("{} {}", p.ty, p.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        match self.outputs.len() {
            0 => format!("{}({})", self.name, inputs),
            1 => format!("{}({}) -> {}", self.name, inputs, self.outputs[0]),
            _ => format!("{}({}) -> ({})", self.name, inputs, self.outputs.join(", ")),
        }
    }
}

/// The contract's functions, split by mutability.
#[derive(Debug, Clone, Default)]
pub struct FunctionList {
    pub reads: Vec<FunctionDescriptor>,
    pub writes: Vec<FunctionDescriptor>,
}

/// Failures surfaced by the chain client. Shown verbatim as the failure
/// message for the submission that produced them; never retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable signing key, or the key was rejected.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Node or transport failure, or an argument the ABI coder rejected.
    #[error("call failed: {0}")]
    Call(String),

    /// The contract itself rejected the call.
    #[error("reverted: {0}")]
    Revert(String),
}

/// The narrow interface the console works against. Constructed explicitly
/// and passed down; the core never reaches for ambient chain state.
#[async_trait]
pub trait ChainClient {
    /// The contract's functions, reads and writes separated.
    fn list_functions(&self) -> FunctionList;

    /// Perform a non-mutating query and return the decoded outputs.
    async fn call_read(
        &self,
        name: &str,
        args: &[CoercedArg],
    ) -> Result<Vec<DynSolValue>, ClientError>;

    /// Submit a state-changing call, wait for inclusion, return the receipt.
    async fn call_write(&self, name: &str, args: &[CoercedArg]) -> Result<Receipt, ClientError>;

    /// Decode one emitted log against the contract interface.
    fn decode_log(&self, entry: &LogRecord) -> Option<DecodedEvent>;
}
