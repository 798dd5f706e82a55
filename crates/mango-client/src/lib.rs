//! Mango Client
//!
//! Client-side core for a Mango group: loads the group, its banks, its cache
//! and user accounts from the ledger, checks accounts for structural problems,
//! and builds and submits instruction sets atomically.
//!
//! # Flow
//!
//! ```text
//!   Context (config + Ledger + TokenLookup)
//!      │
//!      ▼
//!   Group::load ──► fetch_cache ──► token_price_from_cache
//!      │
//!      ├──► ensure_root_bank ──► pick_node_bank ──► token_balance
//!      │
//!      ▼
//!   Account::load_all_for_owner ──► AccountScout::verify ──► ScoutReport
//!      │
//!      ▼
//!   from_wallet(wallet) + build_deposit_instructions(..) ──► execute
//!                                                   (one tx per size-limited chunk)
//! ```
//!
//! Every operation that touches the ledger takes the [`Context`] explicitly.
//! Fetched data are snapshots: nothing is refreshed behind the caller's back.
//!
//! # Modules
//!
//! - [`instrument`], [`token_lookup`]: Tokens, quantities and symbol/mint resolution
//! - [`bank`]: Root banks, node banks and interest-indexed balances
//! - [`group`], [`cache`]: Group configuration, cached prices and indices
//! - [`account`], [`open_orders`], [`token_account`]: User-side ledger state
//! - [`scout`]: Account integrity checks
//! - [`spot_market`]: Spot markets and orders expressed in their lots
//! - [`combinable`], [`instructions`], [`reporter`]: Building, submitting and describing instructions
//! - [`ledger`], [`wallet`], [`context`], [`config`], [`error`]: Boundaries and plumbing

use mango_interface::{Address, is_zero_address};
use solana_pubkey::Pubkey;

pub mod account;
pub mod bank;
pub mod cache;
pub mod combinable;
pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod instructions;
pub mod instrument;
pub mod ledger;
pub mod open_orders;
pub mod reporter;
pub mod scout;
pub mod spot_market;
pub mod token_account;
pub mod token_lookup;
pub mod wallet;

pub use account::*;
pub use bank::*;
pub use cache::*;
pub use combinable::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use group::*;
pub use instructions::*;
pub use instrument::*;
pub use ledger::*;
pub use open_orders::*;
pub use reporter::*;
pub use scout::*;
pub use spot_market::*;
pub use token_account::*;
pub use token_lookup::*;
pub use wallet::*;

/// Layout address to ledger address.
pub(crate) fn to_pubkey(address: &Address) -> Pubkey {
    Pubkey::new_from_array(*address)
}

/// Layout address to ledger address, treating all-zero as absent.
pub(crate) fn optional_pubkey(address: &Address) -> Option<Pubkey> {
    (!is_zero_address(address)).then(|| to_pubkey(address))
}
