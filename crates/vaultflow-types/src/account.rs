//! The chart of accounts
//!
//! A closed enum: the ledger only ever posts to these accounts, so a typo'd
//! account name is a compile error rather than a silent new ledger row.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger accounts for the settlement core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Account {
    /// Treasury assets available for settlement
    AssetTreasury,
    /// Cash held at external banking partners
    AssetBankReserve,
    /// Claim payout expense
    ExpenseClaims,
    /// Premium revenue
    IncomePremiums,
    /// Claims approved but not yet settled
    LiabilityClaimsPayable,
    /// Contributed capital
    EquityCapital,
}

impl Account {
    /// Stable string form used in persisted reference fields
    pub fn code(&self) -> &'static str {
        match self {
            Self::AssetTreasury => "ASSET_TREASURY",
            Self::AssetBankReserve => "ASSET_BANK_RESERVE",
            Self::ExpenseClaims => "EXPENSE_CLAIMS",
            Self::IncomePremiums => "INCOME_PREMIUMS",
            Self::LiabilityClaimsPayable => "LIABILITY_CLAIMS_PAYABLE",
            Self::EquityCapital => "EQUITY_CAPITAL",
        }
    }

    /// All accounts, for balance reports
    pub fn all() -> &'static [Account] {
        &[
            Self::AssetTreasury,
            Self::AssetBankReserve,
            Self::ExpenseClaims,
            Self::IncomePremiums,
            Self::LiabilityClaimsPayable,
            Self::EquityCapital,
        ]
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What a ledger transaction references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    /// A claim payout
    ClaimPayout,
    /// A premium receipt
    PremiumIntake,
    /// A treasury pool funding movement
    PoolFunding,
    /// A correcting reversal of a prior transaction
    Reversal,
}
