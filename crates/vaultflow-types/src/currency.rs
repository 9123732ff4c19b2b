//! Currency types for VaultFlow
//!
//! The set of currencies is a closed enum. Payout decisions arriving with a
//! currency outside this set fail to deserialize at the intake boundary, so
//! nothing downstream ever sees an unknown currency code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the settlement core can move
///
/// Fiat codes follow ISO 4217. Crypto rails settle in the listed assets only;
/// FX conversion between currencies is explicitly out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// USD Coin
    USDC,
    /// Ethereum
    ETH,
}

impl Currency {
    /// Get the currency code as used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::USDC => "USDC",
            Self::ETH => "ETH",
        }
    }

    /// Whether this is a fiat currency
    pub fn is_fiat(&self) -> bool {
        matches!(self, Self::USD | Self::EUR | Self::GBP)
    }

    /// Parse a wire code
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            "GBP" => Some(Self::GBP),
            "USDC" => Some(Self::USDC),
            "ETH" => Some(Self::ETH),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
