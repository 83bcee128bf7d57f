//! Receipt models and the human-readable write summary.

use alloy::{
    dyn_abi::{DynSolValue, EventExt},
    json_abi::JsonAbi,
    primitives::{Bytes, B256},
};
use serde_json::{json, Value};

/// Transaction status band. `Success` renders as the positive state,
/// everything else as the negative/neutral state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failure,
    Unknown,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// An emitted log entry, opaque until decoded against a known event shape.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub address: String,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// A confirmed transaction receipt. All display fields are blank-safe.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub status: TxStatus,
    pub block_number: Option<u64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub tx_hash: Option<String>,
    pub gas_used: Option<u64>,
    pub logs: Vec<LogRecord>,
}

/// A log entry decoded against the contract interface, field values paired
/// with their declared names in declaration order.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub name: String,
    pub fields: Vec<(String, DynSolValue)>,
}

/// The recognized event kinds, reduced to display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSummary {
    Transfer {
        from: String,
        to: String,
        value: String,
    },
    Approval {
        owner: String,
        spender: String,
        value: String,
    },
}

impl EventSummary {
    pub fn headline(&self) -> String {
        match self {
            Self::Transfer { from, to, value } => {
                format!("Transfer {} from {} to {}", value, short(from), short(to))
            }
            Self::Approval {
                owner,
                spender,
                value,
            } => {
                format!("Approval: {} → {} for {}", short(owner), short(spender), value)
            }
        }
    }
}

/// What the UI layer renders after a write: status band, one-line headline,
/// the blank-safe participants, and the whole receipt in displayable form.
#[derive(Debug, Clone)]
pub struct ReceiptSummary {
    pub status: TxStatus,
    pub headline: Option<String>,
    pub event: Option<EventSummary>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub tx_hash: Option<String>,
    pub raw: Value,
}

/// Shortened display form for long addresses and hashes: head + ellipsis +
/// tail once the string exceeds 14 characters, unchanged otherwise.
pub fn short(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 14 {
        return s.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Try to decode one log entry against the interface's event shapes.
///
/// Returns `None` for anything that does not match a known, non-anonymous
/// event exactly; callers simply skip those entries.
pub fn decode_log(abi: &JsonAbi, log: &LogRecord) -> Option<DecodedEvent> {
    let topic0 = log.topics.first()?;

    for event in abi.events() {
        if event.anonymous || event.selector() != *topic0 {
            continue;
        }
        let decoded = match event.decode_log_parts(log.topics.iter().copied(), &log.data, true) {
            Ok(decoded) => decoded,
            Err(_) => continue,
        };

        // Indexed and non-indexed values come back in two separate lists;
        // stitch them back into declaration order.
        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut fields = Vec::with_capacity(event.inputs.len());
        for input in &event.inputs {
            let value = if input.indexed {
                indexed.next()
            } else {
                body.next()
            }?;
            fields.push((input.name.clone(), value));
        }

        return Some(DecodedEvent {
            name: event.name.clone(),
            fields,
        });
    }

    None
}

/// Build the display summary for a receipt. Total: malformed log entries are
/// skipped, and with nothing recognized the headline degrades to the block
/// number or to nothing at all.
pub fn summarize(receipt: &Receipt, abi: &JsonAbi) -> ReceiptSummary {
    summarize_with(receipt, |log| decode_log(abi, log))
}

/// `summarize` over an arbitrary log decoder, so callers can plug in their
/// chain client's `decode_log`.
pub fn summarize_with<F>(receipt: &Receipt, decode: F) -> ReceiptSummary
where
    F: Fn(&LogRecord) -> Option<DecodedEvent>,
{
    let mut event = None;

    for log in &receipt.logs {
        let decoded = match decode(log) {
            Some(decoded) => decoded,
            None => continue,
        };
        match decoded.name.as_str() {
            "Transfer" => {
                event = Some(EventSummary::Transfer {
                    from: field_display(&decoded, "from")
                        .or_else(|| receipt.from.clone())
                        .unwrap_or_default(),
                    to: field_display(&decoded, "to")
                        .or_else(|| receipt.to.clone())
                        .unwrap_or_default(),
                    value: field_display(&decoded, "value").unwrap_or_default(),
                });
                break;
            }
            "Approval" => {
                event = Some(EventSummary::Approval {
                    owner: field_display(&decoded, "owner")
                        .or_else(|| receipt.from.clone())
                        .unwrap_or_default(),
                    spender: field_display(&decoded, "spender").unwrap_or_default(),
                    value: field_display(&decoded, "value").unwrap_or_default(),
                });
                break;
            }
            _ => {}
        }
    }

    let headline = match &event {
        Some(event) => Some(event.headline()),
        None => receipt.block_number.map(|n| format!("Block {}", n)),
    };

    ReceiptSummary {
        status: receipt.status,
        headline,
        event,
        from: receipt.from.clone(),
        to: receipt.to.clone(),
        tx_hash: receipt.tx_hash.clone(),
        raw: receipt_to_json(receipt),
    }
}

/// Look a field up by its clean name, then by the legacy underscore alias
/// some older token interfaces use (`from`/`_from`, `owner`/`_owner`, ...).
fn field<'a>(decoded: &'a DecodedEvent, name: &str) -> Option<&'a DynSolValue> {
    let alias = format!("_{}", name);
    decoded
        .fields
        .iter()
        .find(|(n, _)| n == name)
        .or_else(|| decoded.fields.iter().find(|(n, _)| *n == alias))
        .map(|(_, v)| v)
}

fn field_display(decoded: &DecodedEvent, name: &str) -> Option<String> {
    field(decoded, name).map(display_value)
}

/// Render one decoded value as plain text: addresses and hashes as hex,
/// big integers as decimal strings, composites as compact JSON.
pub fn display_value(value: &DynSolValue) -> String {
    match value_to_json(value) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Generic displayable form of a decoded value: scalars become strings,
/// large integers decimal strings, composites JSON arrays.
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(format!("0x{:x}", addr)),
        DynSolValue::Uint(num, _) => Value::String(num.to_string()),
        DynSolValue::Int(num, _) => Value::String(num.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(bytes, _) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

/// The raw receipt in displayable form, for the diagnostics section.
pub fn receipt_to_json(receipt: &Receipt) -> Value {
    json!({
        "status": receipt.status.as_str(),
        "blockNumber": receipt.block_number,
        "from": receipt.from,
        "to": receipt.to,
        "transactionHash": receipt.tx_hash,
        "gasUsed": receipt.gas_used.map(|g| g.to_string()),
        "logs": receipt.logs.iter().map(|log| json!({
            "address": log.address,
            "topics": log.topics.iter().map(|t| format!("0x{:x}", t)).collect::<Vec<_>>(),
            "data": format!("0x{}", hex::encode(&log.data)),
        })).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use std::str::FromStr;

    const FROM: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1111";
    const TO: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2222";

    fn token_abi() -> JsonAbi {
        serde_json::from_str(
            r#"[
            {"type":"event","name":"Transfer","anonymous":false,"inputs":[
                {"name":"from","type":"address","indexed":true},
                {"name":"to","type":"address","indexed":true},
                {"name":"value","type":"uint256","indexed":false}]},
            {"type":"event","name":"Approval","anonymous":false,"inputs":[
                {"name":"owner","type":"address","indexed":true},
                {"name":"spender","type":"address","indexed":true},
                {"name":"value","type":"uint256","indexed":false}]}
        ]"#,
        )
        .unwrap()
    }

    fn legacy_abi() -> JsonAbi {
        serde_json::from_str(
            r#"[
            {"type":"event","name":"Transfer","anonymous":false,"inputs":[
                {"name":"_from","type":"address","indexed":true},
                {"name":"_to","type":"address","indexed":true},
                {"name":"_value","type":"uint256","indexed":false}]}
        ]"#,
        )
        .unwrap()
    }

    fn transfer_log(abi: &JsonAbi, value: u64) -> LogRecord {
        let event = abi.events().find(|e| e.name == "Transfer").unwrap();
        let from = Address::from_str(FROM).unwrap();
        let to = Address::from_str(TO).unwrap();
        LogRecord {
            address: "0xcccccccccccccccccccccccccccccccccccc3333".to_string(),
            topics: vec![
                event.selector(),
                B256::left_padding_from(from.as_slice()),
                B256::left_padding_from(to.as_slice()),
            ],
            data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
        }
    }

    fn receipt_with(logs: Vec<LogRecord>) -> Receipt {
        Receipt {
            status: TxStatus::Success,
            block_number: Some(7),
            from: Some(FROM.to_string()),
            to: Some("0xdddddddddddddddddddddddddddddddddddd4444".to_string()),
            tx_hash: Some("0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef".to_string()),
            gas_used: Some(21234),
            logs,
        }
    }

    #[test]
    fn test_short_leaves_short_strings_alone() {
        for s in ["", "0x1234", "exactly14chars"] {
            assert_eq!(short(s), s);
        }
    }

    #[test]
    fn test_short_form() {
        assert_eq!(short(FROM), "0xaaaaaaaa…aaaa1111");
        assert_eq!(short("fifteen-chars!!"), "fifteen-ch…-chars!!");
    }

    #[test]
    fn test_transfer_summary_line() {
        let abi = token_abi();
        let receipt = receipt_with(vec![transfer_log(&abi, 1000)]);
        let summary = summarize(&receipt, &abi);

        assert!(summary.status.is_success());
        let headline = summary.headline.unwrap();
        assert_eq!(
            headline,
            "Transfer 1000 from 0xaaaaaaaa…aaaa1111 to 0xbbbbbbbb…bbbb2222"
        );
    }

    #[test]
    fn test_approval_summary_line() {
        let abi = token_abi();
        let event = abi.events().find(|e| e.name == "Approval").unwrap();
        let owner = Address::from_str(FROM).unwrap();
        let spender = Address::from_str(TO).unwrap();
        let log = LogRecord {
            address: String::new(),
            topics: vec![
                event.selector(),
                B256::left_padding_from(owner.as_slice()),
                B256::left_padding_from(spender.as_slice()),
            ],
            data: Bytes::from(U256::from(500u64).to_be_bytes::<32>().to_vec()),
        };
        let summary = summarize(&receipt_with(vec![log]), &abi);
        assert_eq!(
            summary.headline.unwrap(),
            "Approval: 0xaaaaaaaa…aaaa1111 → 0xbbbbbbbb…bbbb2222 for 500"
        );
    }

    #[test]
    fn test_underscore_alias_fields() {
        let abi = legacy_abi();
        let receipt = receipt_with(vec![transfer_log(&abi, 42)]);
        let summary = summarize(&receipt, &abi);

        match summary.event.unwrap() {
            EventSummary::Transfer { from, to, value } => {
                assert_eq!(from, FROM);
                assert_eq!(to, TO);
                assert_eq!(value, "42");
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_fields_fall_back_to_receipt() {
        // Transfer with ds-token style names: decodes, but no from/to/value
        // fields, so the participants come from the receipt itself.
        let abi: JsonAbi = serde_json::from_str(
            r#"[
            {"type":"event","name":"Transfer","anonymous":false,"inputs":[
                {"name":"src","type":"address","indexed":true},
                {"name":"dst","type":"address","indexed":true},
                {"name":"wad","type":"uint256","indexed":false}]}
        ]"#,
        )
        .unwrap();
        let receipt = receipt_with(vec![transfer_log(&abi, 9)]);
        let summary = summarize(&receipt, &abi);

        match summary.event.unwrap() {
            EventSummary::Transfer { from, to, value } => {
                assert_eq!(from, receipt.from.clone().unwrap());
                assert_eq!(to, receipt.to.clone().unwrap());
                assert_eq!(value, "");
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_block_fallback_without_decodable_logs() {
        let abi = token_abi();
        let mut receipt = receipt_with(vec![]);
        receipt.block_number = Some(42);
        let summary = summarize(&receipt, &abi);
        assert_eq!(summary.headline.unwrap(), "Block 42");
        assert!(summary.event.is_none());
    }

    #[test]
    fn test_no_headline_without_block_number() {
        let abi = token_abi();
        let mut receipt = receipt_with(vec![]);
        receipt.block_number = None;
        assert!(summarize(&receipt, &abi).headline.is_none());
    }

    #[test]
    fn test_non_success_status_is_not_positive() {
        let abi = token_abi();
        for status in [TxStatus::Failure, TxStatus::Unknown] {
            let mut receipt = receipt_with(vec![]);
            receipt.status = status;
            let summary = summarize(&receipt, &abi);
            assert!(!summary.status.is_success());
            assert_eq!(summary.raw["status"], status.as_str());
        }
    }

    #[test]
    fn test_malformed_logs_are_skipped() {
        let abi = token_abi();
        let garbage = vec![
            // no topics at all
            LogRecord {
                address: String::new(),
                topics: vec![],
                data: Bytes::new(),
            },
            // unknown selector
            LogRecord {
                address: String::new(),
                topics: vec![B256::repeat_byte(0x99)],
                data: Bytes::new(),
            },
            // Transfer selector but missing indexed topics and data
            LogRecord {
                address: String::new(),
                topics: vec![abi.events().find(|e| e.name == "Transfer").unwrap().selector()],
                data: Bytes::from(vec![0x01]),
            },
        ];
        let receipt = receipt_with(garbage);
        let summary = summarize(&receipt, &abi);
        assert!(summary.event.is_none());
        assert_eq!(summary.headline.unwrap(), "Block 7");
    }

    #[test]
    fn test_first_recognized_event_wins() {
        let abi = token_abi();
        let receipt = receipt_with(vec![transfer_log(&abi, 1), transfer_log(&abi, 2)]);
        match summarize(&receipt, &abi).event.unwrap() {
            EventSummary::Transfer { value, .. } => assert_eq!(value, "1"),
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_receipt_json_renders_big_integers_as_strings() {
        let abi = token_abi();
        let receipt = receipt_with(vec![transfer_log(&abi, 3)]);
        let raw = summarize(&receipt, &abi).raw;

        assert_eq!(raw["status"], "success");
        assert_eq!(raw["blockNumber"], 7);
        assert_eq!(raw["gasUsed"], "21234");
        assert!(raw["logs"][0]["topics"][0].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_value_to_json_shapes() {
        let addr = Address::from_str(FROM).unwrap();
        assert_eq!(value_to_json(&DynSolValue::Address(addr)), json!(FROM));
        assert_eq!(
            value_to_json(&DynSolValue::Uint(U256::from(1000u64), 256)),
            json!("1000")
        );
        assert_eq!(value_to_json(&DynSolValue::Bool(true)), json!(true));
        assert_eq!(
            value_to_json(&DynSolValue::Array(vec![DynSolValue::Uint(U256::from(1u64), 256)])),
            json!(["1"])
        );
    }
}
