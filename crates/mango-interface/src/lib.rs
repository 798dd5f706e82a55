//! Mango Interface
//!
//! Wire formats shared by every Mango client: the zero-copy account layouts
//! stored on the ledger, the instruction data codec, and the program's error
//! codes.
//!
//! # Account Model
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         MangoGroup                            │
//! │  tokens[16] ── (mint, root_bank, decimals)   slot 15 = quote  │
//! │  spot_markets[15] / perp_markets[15] / oracles[15]            │
//! │  mango_cache ─────────────┐                                   │
//! └───────────────────────────┼──────────────────────────────────┘
//!          │                  ▼
//!          ▼           ┌──────────────┐
//!   ┌─────────────┐    │  MangoCache  │ prices[15], root bank indices[16]
//!   │  RootBank   │    └──────────────┘
//!   │  indices    │
//!   │  node_banks ├──► NodeBank ─ raw deposits/borrows, vault
//!   └─────────────┘──► NodeBank ─ ...
//!
//!   MangoAccount ─ (group, owner) raw deposits/borrows[16], slots[15]
//!                  slot = (open_orders, base_root_bank, quote_root_bank)
//! ```
//!
//! Every Mango-owned account begins with an 8-byte [`MetaData`] header.
//! Interest indices, prices and raw balances are I80F48 fixed-point values
//! stored as their `i128` bit patterns.
//!
//! # Modules
//!
//! - [`layouts`]: Account layouts and the metadata header
//! - [`instructions`]: Instruction discriminators, argument codecs, account orders
//! - [`dex`]: Spot market state and order parameters
//! - [`token_instructions`]: SPL Token instructions issued around deposits
//! - [`error`]: Layout decoding errors and on-ledger error codes
//! - [`program_ids`]: Decoded program addresses

pub mod dex;
pub mod error;
pub mod instructions;
pub mod layouts;
pub mod program_ids;
pub mod token_instructions;

pub use dex::*;
pub use error::*;
pub use instructions::*;
pub use layouts::*;
pub use program_ids::*;
pub use token_instructions::*;

/// Raw 32-byte ledger address as stored inside account layouts.
pub type Address = [u8; 32];

/// The all-zero address, used by layouts to mark an empty reference.
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Returns true if the address is the all-zero "absent" marker.
#[inline]
pub fn is_zero_address(address: &Address) -> bool {
    *address == ZERO_ADDRESS
}
