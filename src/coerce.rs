//! Coercion of raw form inputs into typed contract-call arguments.

use alloy::primitives::{Sign, I256, U256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoerceError {
    #[error("unsupported parameter type '{0}'")]
    UnsupportedType(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Solidity parameter type, parsed from its canonical name ("uint256",
/// "bool", "address", "uint256[]", ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    /// Unsigned integer with declared bit width.
    Uint(usize),
    /// Signed integer with declared bit width.
    Int(usize),
    Address,
    Str,
    Bytes,
    /// Fixed-size byte array (bytes1..bytes32).
    FixedBytes(usize),
    Array(Box<ParamKind>),
    FixedArray(Box<ParamKind>, usize),
}

impl ParamKind {
    pub fn parse(name: &str) -> Result<Self, CoerceError> {
        let name = name.trim();

        if name.ends_with(']') {
            if let Some(open) = name.rfind('[') {
                let elem = Self::parse(&name[..open])?;
                let len = &name[open + 1..name.len() - 1];
                if len.is_empty() {
                    return Ok(Self::Array(Box::new(elem)));
                }
                let n: usize = len
                    .parse()
                    .map_err(|_| CoerceError::UnsupportedType(name.to_string()))?;
                return Ok(Self::FixedArray(Box::new(elem), n));
            }
        }

        match name {
            "bool" => Ok(Self::Bool),
            "address" => Ok(Self::Address),
            "string" => Ok(Self::Str),
            "bytes" => Ok(Self::Bytes),
            _ => {
                if let Some(bits) = name.strip_prefix("uint") {
                    return int_bits(bits)
                        .map(Self::Uint)
                        .ok_or_else(|| CoerceError::UnsupportedType(name.to_string()));
                }
                if let Some(bits) = name.strip_prefix("int") {
                    return int_bits(bits)
                        .map(Self::Int)
                        .ok_or_else(|| CoerceError::UnsupportedType(name.to_string()));
                }
                if let Some(size) = name.strip_prefix("bytes") {
                    if let Ok(n) = size.parse::<usize>() {
                        if n >= 1 && n <= 32 {
                            return Ok(Self::FixedBytes(n));
                        }
                    }
                }
                Err(CoerceError::UnsupportedType(name.to_string()))
            }
        }
    }
}

fn int_bits(suffix: &str) -> Option<usize> {
    if suffix.is_empty() {
        return Some(256);
    }
    suffix
        .parse::<usize>()
        .ok()
        .filter(|n| *n >= 8 && *n <= 256 && n % 8 == 0)
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Uint(bits) => write!(f, "uint{}", bits),
            Self::Int(bits) => write!(f, "int{}", bits),
            Self::Address => write!(f, "address"),
            Self::Str => write!(f, "string"),
            Self::Bytes => write!(f, "bytes"),
            Self::FixedBytes(n) => write!(f, "bytes{}", n),
            Self::Array(elem) => write!(f, "{}[]", elem),
            Self::FixedArray(elem, n) => write!(f, "{}[{}]", elem, n),
        }
    }
}

/// A value captured from a form field. Everything round-trips through the
/// string form except checkbox-style boolean inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    Flag(bool),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl RawValue {
    fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Flag(b) => b.to_string(),
        }
    }
}

/// A typed argument ready for a contract call.
///
/// Address, string and bytes inputs are carried as strings; the chain
/// client turns them into their wire shape when encoding the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercedArg {
    Bool(bool),
    Uint(U256),
    Int(I256),
    Text(String),
    List(Vec<CoercedArg>),
}

/// Coerce a raw form value against a declared parameter type.
///
/// Booleans accept only the two canonical spellings (case-insensitive).
/// Array types parse the raw string as a JSON array literal and coerce each
/// element against the element type; an empty raw string is an empty list.
/// For every other type an empty raw string passes through unchanged and the
/// chain client surfaces the resulting encoding error.
pub fn coerce(kind: &ParamKind, raw: &RawValue) -> Result<CoercedArg, CoerceError> {
    match kind {
        ParamKind::Bool => coerce_bool(raw),
        ParamKind::Array(elem) | ParamKind::FixedArray(elem, _) => {
            coerce_array(elem, &raw.as_text())
        }
        _ => {
            let text = raw.as_text();
            if text.is_empty() {
                return Ok(CoercedArg::Text(text));
            }
            match kind {
                ParamKind::Uint(_) => parse_u256(&text).map(CoercedArg::Uint),
                ParamKind::Int(_) => parse_i256(&text).map(CoercedArg::Int),
                // address / string / bytes pass through unchanged; no
                // checksum or hex-length validation at this boundary.
                _ => Ok(CoercedArg::Text(text)),
            }
        }
    }
}

/// Convenience wrapper taking the canonical type name directly.
pub fn coerce_named(ty: &str, raw: &RawValue) -> Result<CoercedArg, CoerceError> {
    coerce(&ParamKind::parse(ty)?, raw)
}

fn coerce_bool(raw: &RawValue) -> Result<CoercedArg, CoerceError> {
    match raw {
        RawValue::Flag(b) => Ok(CoercedArg::Bool(*b)),
        RawValue::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(CoercedArg::Bool(true)),
            "false" => Ok(CoercedArg::Bool(false)),
            _ => Err(CoerceError::InvalidArgument(format!(
                "expected 'true' or 'false', got '{}'",
                s
            ))),
        },
    }
}

fn coerce_array(elem: &ParamKind, text: &str) -> Result<CoercedArg, CoerceError> {
    if text.is_empty() {
        return Ok(CoercedArg::List(Vec::new()));
    }

    let items: Vec<serde_json::Value> = serde_json::from_str(text).map_err(|_| {
        CoerceError::InvalidArgument(format!("expected a JSON array literal, got '{}'", text))
    })?;

    let mut out = Vec::with_capacity(items.len());
    for item in &items {
        let raw = match item {
            serde_json::Value::String(s) => RawValue::Text(s.clone()),
            serde_json::Value::Bool(b) => RawValue::Flag(*b),
            serde_json::Value::Number(n) => RawValue::Text(n.to_string()),
            serde_json::Value::Null => RawValue::Text(String::new()),
            other => RawValue::Text(other.to_string()),
        };
        out.push(coerce(elem, &raw)?);
    }
    Ok(CoercedArg::List(out))
}

// TODO: check parsed magnitudes against the declared bit width; a uint8
// field currently accepts 300 and leaves the rejection to the node.
fn parse_u256(s: &str) -> Result<U256, CoerceError> {
    let parsed = if let Some(hex_part) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        U256::from_str_radix(hex_part, 16)
    } else {
        U256::from_str(s)
    };
    parsed.map_err(|_| CoerceError::InvalidArgument(format!("not an unsigned integer: '{}'", s)))
}

fn parse_i256(s: &str) -> Result<I256, CoerceError> {
    let (sign, magnitude) = match s.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, s),
    };
    let abs = parse_u256(magnitude)
        .map_err(|_| CoerceError::InvalidArgument(format!("not an integer: '{}'", s)))?;
    I256::checked_from_sign_and_abs(sign, abs)
        .ok_or_else(|| CoerceError::InvalidArgument(format!("integer out of range: '{}'", s)))
}
