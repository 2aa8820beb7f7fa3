//! Amount codec: plaintext decimal → encrypted payload + proof.
//!
//! Parsing and scaling happen here; the cryptography is delegated to the
//! injected [`AmountEncryptor`]. Nothing is cached: every call re-encrypts
//! for exactly the context it is given.

use std::{collections::HashMap, fmt, sync::Arc};

use etherveil_types::{
    AmountEncryptor, AssetConfig, AssetId, EncodingContext, EncryptedPayload, Result, VaultError,
};
use rust_decimal::Decimal;

/// Converts user-entered amounts into contract-ready payloads.
#[derive(Clone)]
pub struct AmountCodec {
    encryptor: Arc<dyn AmountEncryptor>,
    /// Denomination precision per asset.
    decimals: HashMap<AssetId, u32>,
}

impl AmountCodec {
    #[must_use]
    pub fn new(encryptor: Arc<dyn AmountEncryptor>, assets: &[AssetConfig]) -> Self {
        Self {
            encryptor,
            decimals: assets.iter().map(|a| (a.id, a.decimals)).collect(),
        }
    }

    /// Encode `amount` for `context`.
    ///
    /// # Errors
    /// - `UnknownAsset` if the context's asset has no registered denomination
    /// - `InvalidAmount` if `amount` is not a positive decimal within the
    ///   asset's precision
    /// - whatever the encryptor returns
    pub fn encode(&self, amount: &str, context: &EncodingContext) -> Result<EncryptedPayload> {
        let decimals = self
            .decimals
            .get(&context.asset_id)
            .copied()
            .ok_or(VaultError::UnknownAsset(context.asset_id.0))?;
        let base_units = parse_base_units(amount, decimals)?;
        self.encryptor.encrypt(base_units, context)
    }
}

impl fmt::Debug for AmountCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmountCodec")
            .field("assets", &self.decimals.len())
            .finish_non_exhaustive()
    }
}

/// Parse a decimal string and scale it to integer base units.
///
/// `"1.5"` with 6 decimals is `1_500_000`. Trailing zeros are fine
/// (`"1.50"` is still one fractional digit); more significant fractional
/// digits than `decimals` are not.
pub fn parse_base_units(input: &str, decimals: u32) -> Result<u128> {
    let invalid = |reason: &str| VaultError::InvalidAmount {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("amount is empty"));
    }
    let value = Decimal::from_str_exact(trimmed).map_err(|_| invalid("not a decimal number"))?;
    if value <= Decimal::ZERO {
        return Err(invalid("amount must be positive"));
    }

    let value = value.normalize();
    if value.scale() > decimals {
        return Err(invalid(&format!(
            "more than {decimals} decimal places"
        )));
    }

    let mantissa =
        u128::try_from(value.mantissa()).map_err(|_| invalid("amount must be positive"))?;
    let factor = 10u128
        .checked_pow(decimals - value.scale())
        .ok_or_else(|| invalid("amount out of range"))?;
    mantissa
        .checked_mul(factor)
        .ok_or_else(|| invalid("amount out of range"))
}
