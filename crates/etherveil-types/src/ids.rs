//! Identifiers used throughout the EtherVeil client.
//!
//! Operation and session ids use UUIDv7 for time-ordered sorting. Record ids
//! are local sequence numbers. On-chain values (addresses, transaction
//! hashes) are fixed-size byte arrays rendered as `0x`-prefixed hex.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::VaultError;

// ---------------------------------------------------------------------------
// OperationId
// ---------------------------------------------------------------------------

/// Identity of one logical operation instance, minted at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl OperationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Identifies one successful wallet connection. Reconnecting the same
/// address yields a new `SessionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Local, monotonically assigned transaction record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AssetId / ChainId
// ---------------------------------------------------------------------------

/// Vault-side asset identifier (`uint256 assetId` in the contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

/// EIP-155 chain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address; never a valid recipient or contract.
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Abbreviated form for display, e.g. `0x742d…d8b6`.
    #[must_use]
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_fixed::<20>(s, "address").map(Self)
    }
}

impl TryFrom<String> for Address {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// TxHash
// ---------------------------------------------------------------------------

/// A 32-byte transaction hash returned by the signer on submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    /// Short prefix for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_fixed::<32>(s, "transaction hash").map(Self)
    }
}

impl TryFrom<String> for TxHash {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.to_string()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl TxHash {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

fn parse_hex_fixed<const N: usize>(s: &str, what: &str) -> Result<[u8; N], VaultError> {
    let digits = s
        .trim()
        .strip_prefix("0x")
        .or_else(|| s.trim().strip_prefix("0X"))
        .ok_or_else(|| VaultError::InvalidOperation {
            reason: format!("{what} must start with 0x: {s}"),
        })?;
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| VaultError::InvalidOperation {
        reason: format!("malformed {what} {s}: {e}"),
    })?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
