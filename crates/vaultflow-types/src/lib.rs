//! VaultFlow Types - Canonical domain types for the settlement core
//!
//! This crate contains all foundational types for VaultFlow with zero
//! dependencies on other vaultflow crates. It defines the type system for:
//!
//! - Identity types (TransactionId, PoolId, LockId, etc.)
//! - Money as signed 64-bit micros with a closed currency enum
//! - The closed chart of ledger accounts
//! - Claim decision records and their audit seals
//!
//! # Architectural Invariants
//!
//! These types support the core settlement invariants:
//!
//! 1. Money never appears or disappears — every transaction balances to zero
//! 2. Never pay twice — claim ids are the idempotency key everywhere
//! 3. Monetary values are fixed-point integers, never floating point

pub mod account;
pub mod amount;
pub mod currency;
pub mod decision;
pub mod identity;

pub use account::*;
pub use amount::*;
pub use currency::*;
pub use decision::*;
pub use identity::*;

/// Version of the VaultFlow types schema
pub const TYPES_VERSION: &str = "0.1.0";
