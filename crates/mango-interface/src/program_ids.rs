//! Program ID constants.
//!
//! These program IDs are imported from the central `mango-program-ids` crate,
//! which is the single source of truth for all program addresses.
//!
//! The correct addresses are selected at compile-time based on the network feature.

use crate::Address;

/// Mango program ID.
pub const MANGO_PROGRAM_ID: Address =
    five8_const::decode_32_const(mango_program_ids::MANGO_PROGRAM_ID);

/// Order-book DEX program ID.
pub const DEX_PROGRAM_ID: Address =
    five8_const::decode_32_const(mango_program_ids::DEX_PROGRAM_ID);

/// SPL Token program ID.
pub const TOKEN_PROGRAM_ID: Address =
    five8_const::decode_32_const(mango_program_ids::TOKEN_PROGRAM_ID);

/// Default group address for the compiled network.
pub const DEFAULT_GROUP_ID: Address =
    five8_const::decode_32_const(mango_program_ids::DEFAULT_GROUP_ID);
