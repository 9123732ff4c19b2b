//! Identity types for VaultFlow
//!
//! All internal identity types are strongly typed wrappers around UUIDs to
//! prevent accidental mixing of different ID types. Claim and policy ids are
//! opaque strings because they are minted by the upstream claims platform and
//! must be carried verbatim (the claim id doubles as the idempotency key).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

// Ledger identity types
define_id_type!(TransactionId, "tx", "Unique identifier for a ledger transaction");
define_id_type!(EntryId, "entry", "Unique identifier for a ledger entry");

// Treasury identity types
define_id_type!(PoolId, "pool", "Unique identifier for a liquidity pool");
define_id_type!(LockId, "lock", "Unique identifier for a fund lock");
define_id_type!(AlertId, "alert", "Unique identifier for a treasury alert");

// Payout identity types
define_id_type!(PayoutId, "payout", "Unique identifier for a payout record");

/// Macro to generate opaque string key types minted by external systems
macro_rules! define_external_key {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

define_external_key!(ClaimId, "Opaque claim identifier from the claims platform; the payout idempotency key");
define_external_key!(PolicyId, "Opaque policy identifier from the claims platform");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_creation() {
        let id = TransactionId::new();
        let s = id.to_string();
        assert!(s.starts_with("tx_"));
    }

    #[test]
    fn test_id_parsing() {
        let id = PoolId::new();
        let s = id.to_string();
        let parsed = PoolId::parse(&s).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_equality() {
        let uuid = Uuid::new_v4();
        let id1 = LockId::from_uuid(uuid);
        let id2 = LockId::from_uuid(uuid);
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_claim_id_is_verbatim() {
        let id = ClaimId::new("CLAIM-2024-00042");
        assert_eq!(id.as_str(), "CLAIM-2024-00042");
        assert_eq!(id.to_string(), "CLAIM-2024-00042");
    }
}
