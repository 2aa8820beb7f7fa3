//! Encrypted payloads and the contract calls that carry them.
//!
//! The vault contract takes every amount as an opaque ciphertext plus a
//! validity proof. This module defines the encoding context the proof binds
//! to, the pluggable [`AmountEncryptor`] boundary, and the shape of each
//! mutating call the client produces.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{constants, Address, AssetId, ChainId, OperationKind, Result};

// ---------------------------------------------------------------------------
// EncodingContext
// ---------------------------------------------------------------------------

/// Everything a ciphertext/proof pair is bound to.
///
/// A payload produced for one context is rejected by the contract under any
/// other (different signer, chain, contract, asset or operation kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodingContext {
    pub asset_id: AssetId,
    pub kind: OperationKind,
    /// The account that will sign the call.
    pub signer: Address,
    /// Nonce domain: chain.
    pub chain_id: ChainId,
    /// Nonce domain: vault contract.
    pub contract: Address,
}

impl EncodingContext {
    /// SHA-256 commitment over the full context.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::ENCODING_DOMAIN);
        hasher.update(self.asset_id.0.to_le_bytes());
        hasher.update([self.kind.tag()]);
        hasher.update(self.signer.as_bytes());
        hasher.update(self.chain_id.0.to_le_bytes());
        hasher.update(self.contract.as_bytes());
        hasher.finalize().into()
    }
}

// ---------------------------------------------------------------------------
// EncryptedPayload
// ---------------------------------------------------------------------------

/// Opaque ciphertext + proof. Forwarded, never inspected.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub proof: Vec<u8>,
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("proof_len", &self.proof.len())
            .finish()
    }
}

/// The encryption/proof subsystem.
///
/// Receives the amount already scaled to the asset's base units. Must be a
/// pure function of `(base_units, context)` and safe to call concurrently.
pub trait AmountEncryptor: Send + Sync {
    fn encrypt(&self, base_units: u128, context: &EncodingContext) -> Result<EncryptedPayload>;
}

// ---------------------------------------------------------------------------
// Contract calls
// ---------------------------------------------------------------------------

/// The mutating vault functions, with their arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultCall {
    Deposit {
        asset_id: AssetId,
        payload: EncryptedPayload,
    },
    Withdraw {
        asset_id: AssetId,
        payload: EncryptedPayload,
    },
    Transfer {
        to: Address,
        asset_id: AssetId,
        payload: EncryptedPayload,
    },
    SetPortfolioPrivacy {
        is_private: bool,
    },
    CreatePosition {
        asset_id: AssetId,
        payload: EncryptedPayload,
    },
}

impl VaultCall {
    /// Solidity function name.
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "deposit",
            Self::Withdraw { .. } => "withdraw",
            Self::Transfer { .. } => "transfer",
            Self::SetPortfolioPrivacy { .. } => "setPortfolioPrivacy",
            Self::CreatePosition { .. } => "createPosition",
        }
    }
}

/// A call addressed to a specific vault deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: Address,
    pub chain_id: ChainId,
    pub call: VaultCall,
}

impl ContractCall {
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        self.call.function_name()
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Deterministic stand-in for the real encryptor: hashes the amount and the
/// context, so different contexts always yield different payloads.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicEncryptor;

#[cfg(any(test, feature = "test-helpers"))]
impl AmountEncryptor for DeterministicEncryptor {
    fn encrypt(&self, base_units: u128, context: &EncodingContext) -> Result<EncryptedPayload> {
        let binding = context.digest();

        let mut ct = Sha256::new();
        ct.update(b"ciphertext:");
        ct.update(base_units.to_le_bytes());
        ct.update(binding);
        let ciphertext = ct.finalize().to_vec();

        let mut pf = Sha256::new();
        pf.update(b"proof:");
        pf.update(&ciphertext);
        pf.update(binding);

        Ok(EncryptedPayload {
            ciphertext,
            proof: pf.finalize().to_vec(),
        })
    }
}
