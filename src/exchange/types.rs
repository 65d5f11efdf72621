//! Type definitions for Bitbuy partner API responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exact decimal fields: JSON numbers or numeric strings, rejected rather
/// than rounded when they do not fit a `Decimal` digit for digit.
mod exact_decimal {
    use rust_decimal::Decimal;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        // With arbitrary_precision the number keeps its original text.
        let text = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            other => {
                return Err(D::Error::custom(format!(
                    "expected a decimal number, found {}",
                    other
                )))
            }
        };

        let parsed = if text.contains(['e', 'E']) {
            Decimal::from_scientific(&text)
        } else {
            Decimal::from_str_exact(&text)
        };
        parsed.map_err(|e| D::Error::custom(format!("{} is not an exact decimal: {}", text, e)))
    }

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::arbitrary_precision::serialize(value, serializer)
    }
}

/// One asset balance as reported by `GET /api/v1/wallets`.
///
/// ```json
/// {
///     "id": null,
///     "displayName": null,
///     "symbol": "BCH",
///     "balance": 2.846220260000000000,
///     "reservedBalance": 0,
///     "availableBalance": 2.846220260000000000,
///     "fiatCurrencySymbol": "CAD",
///     "fiatBalance": 456.39,
///     "fiatReservedBalance": "0.00",
///     "fiatAvailableBalance": "456.39"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub symbol: String,
    #[serde(with = "exact_decimal")]
    pub balance: Decimal,
    #[serde(with = "exact_decimal")]
    pub reserved_balance: Decimal,
    #[serde(with = "exact_decimal")]
    pub available_balance: Decimal,
    pub fiat_currency_symbol: String,
    #[serde(with = "exact_decimal")]
    pub fiat_balance: Decimal,
    /// Server-formatted, not guaranteed numeric.
    pub fiat_reserved_balance: String,
    /// Server-formatted, not guaranteed numeric.
    pub fiat_available_balance: String,
}

impl Wallet {
    /// True when the wallet holds nothing.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero()
    }

    /// Label for display: the display name when present, else the symbol.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.symbol)
    }
}
