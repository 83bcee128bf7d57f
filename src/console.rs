//! The user-facing layer: one "form" per contract function, rendered to the
//! terminal.

use alloy::dyn_abi::DynSolValue;
use anyhow::{anyhow, bail, Result};

use crate::chain::{ChainClient, FunctionDescriptor, FunctionList};
use crate::coerce::{self, CoercedArg, RawValue};
use crate::summary::{self, ReceiptSummary};

/// What the header and explorer links are built from.
pub struct ConsoleContext {
    pub network: String,
    pub chain_id: u64,
    pub contract: String,
    pub explorer_url: Option<String>,
}

pub struct Console<'a, C: ChainClient> {
    client: &'a C,
    ctx: ConsoleContext,
}

impl<'a, C: ChainClient> Console<'a, C> {
    pub fn new(client: &'a C, ctx: ConsoleContext) -> Self {
        Self { client, ctx }
    }

    /// Print the page header and the function list, reads before writes.
    pub fn list(&self) {
        let FunctionList { reads, writes } = self.client.list_functions();

        println!("ERC20 token console");
        println!("chain: {} ({})", self.ctx.network, self.ctx.chain_id);
        let contract = if self.ctx.contract.is_empty() {
            "not set"
        } else {
            &self.ctx.contract
        };
        println!("contract: {}", contract);

        println!();
        println!("read functions:");
        print_descriptors(&reads);
        println!();
        println!("write functions:");
        print_descriptors(&writes);
    }

    /// One read submission: coerce, query, render the decoded outputs.
    pub async fn call(&self, name: &str, raw_args: &[String]) -> Result<()> {
        let list = self.client.list_functions();
        if list.writes.iter().any(|f| f.name == name) {
            bail!("'{}' changes state; use `send {}`", name, name);
        }
        let descriptor = list
            .reads
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| anyhow!("no read function named '{}'; try `list`", name))?;

        let args = coerce_args(descriptor, raw_args)?;
        let values = self
            .client
            .call_read(name, &args)
            .await
            .map_err(|e| anyhow!("{}", e))?;

        println!("{}", render_values(&values));
        Ok(())
    }

    /// One write submission: coerce, submit, summarize the receipt.
    pub async fn send(&self, name: &str, raw_args: &[String], allow_writes: bool) -> Result<()> {
        if !allow_writes {
            bail!(
                "write operations are disabled; pass --allow-writes or set [security].allow_write_operations"
            );
        }

        let list = self.client.list_functions();
        if list.reads.iter().any(|f| f.name == name) {
            bail!("'{}' is read-only; use `call {}`", name, name);
        }
        let descriptor = list
            .writes
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| anyhow!("no write function named '{}'; try `list`", name))?;

        let args = coerce_args(descriptor, raw_args)?;
        let receipt = self
            .client
            .call_write(name, &args)
            .await
            .map_err(|e| anyhow!("{}", e))?;

        let summary = summary::summarize_with(&receipt, |log| self.client.decode_log(log));
        self.render_receipt(&summary);
        Ok(())
    }

    fn render_receipt(&self, summary: &ReceiptSummary) {
        println!("status: {}", summary.status.as_str());
        if let Some(headline) = &summary.headline {
            println!("{}", headline);
        }

        if let Some(hash) = summary.tx_hash.as_deref().filter(|h| !h.is_empty()) {
            println!("hash: {}", summary::short(hash));
            if let Some(base) = &self.ctx.explorer_url {
                println!("explorer: {}/tx/{}", base.trim_end_matches('/'), hash);
            }
        }
        if let Some(from) = summary.from.as_deref().filter(|f| !f.is_empty()) {
            println!("from: {}", summary::short(from));
        }
        if let Some(to) = summary.to.as_deref().filter(|t| !t.is_empty()) {
            println!("to: {}", summary::short(to));
        }

        println!();
        println!("raw receipt:");
        let raw = serde_json::to_string_pretty(&summary.raw)
            .unwrap_or_else(|_| summary.raw.to_string());
        println!("{}", raw);
    }
}

fn print_descriptors(descriptors: &[FunctionDescriptor]) {
    if descriptors.is_empty() {
        println!("  (none)");
        return;
    }
    for descriptor in descriptors {
        println!("  {}", descriptor.signature());
    }
}

/// Coerce positional raw arguments against a function's declared inputs.
/// Missing trailing arguments behave like untouched form fields: empty
/// strings, left to the chain client to reject where that matters.
fn coerce_args(descriptor: &FunctionDescriptor, raw_args: &[String]) -> Result<Vec<CoercedArg>> {
    if raw_args.len() > descriptor.inputs.len() {
        bail!(
            "'{}' takes {} argument(s), got {}",
            descriptor.name,
            descriptor.inputs.len(),
            raw_args.len()
        );
    }

    let mut args = Vec::with_capacity(descriptor.inputs.len());
    for (i, input) in descriptor.inputs.iter().enumerate() {
        let raw = raw_args.get(i).map(String::as_str).unwrap_or("");
        let arg = coerce::coerce_named(&input.ty, &RawValue::from(raw))
            .map_err(|e| anyhow!("argument '{}' ({}): {}", input.name, input.ty, e))?;
        args.push(arg);
    }
    Ok(args)
}

/// Decoded call outputs as display text: a single value prints bare, several
/// print as a JSON array.
fn render_values(values: &[DynSolValue]) -> String {
    match values.len() {
        0 => "null".to_string(),
        1 => summary::display_value(&values[0]),
        _ => {
            let rendered: Vec<_> = values.iter().map(summary::value_to_json).collect();
            serde_json::to_string_pretty(&rendered)
                .unwrap_or_else(|_| format!("{:?}", rendered))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Mutability, Param};
    use alloy::primitives::U256;

    fn transfer_descriptor() -> FunctionDescriptor {
        FunctionDescriptor {
            name: "transfer".to_string(),
            inputs: vec![
                Param {
                    name: "recipient".to_string(),
                    ty: "address".to_string(),
                },
                Param {
                    name: "amount".to_string(),
                    ty: "uint256".to_string(),
                },
            ],
            outputs: vec!["bool".to_string()],
            mutability: Mutability::Write,
        }
    }

    #[test]
    fn test_coerce_args_positional() {
        let args = coerce_args(
            &transfer_descriptor(),
            &["0xbbbb".to_string(), "1000".to_string()],
        )
        .unwrap();
        assert_eq!(
            args,
            vec![
                CoercedArg::Text("0xbbbb".to_string()),
                CoercedArg::Uint(U256::from(1000u64)),
            ]
        );
    }

    #[test]
    fn test_missing_args_become_empty_fields() {
        let args = coerce_args(&transfer_descriptor(), &[]).unwrap();
        assert_eq!(
            args,
            vec![
                CoercedArg::Text(String::new()),
                CoercedArg::Text(String::new()),
            ]
        );
    }

    #[test]
    fn test_too_many_args_rejected() {
        let raw: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert!(coerce_args(&transfer_descriptor(), &raw).is_err());
    }

    #[test]
    fn test_bad_argument_names_the_parameter() {
        let err = coerce_args(
            &transfer_descriptor(),
            &["0xbbbb".to_string(), "one thousand".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("'amount'"));
    }

    #[test]
    fn test_render_values() {
        assert_eq!(render_values(&[]), "null");
        assert_eq!(
            render_values(&[DynSolValue::Uint(U256::from(42u64), 256)]),
            "42"
        );
        let many = render_values(&[
            DynSolValue::Bool(true),
            DynSolValue::String("ok".to_string()),
        ]);
        assert!(many.contains("true") && many.contains("ok"));
    }
}
