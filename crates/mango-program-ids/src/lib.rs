//! Single source of truth for well-known Mango ledger addresses.
//!
//! Addresses are `&'static str` constants in base58 so they can be decoded at
//! compile time by downstream crates and parsed at runtime by configuration.
//!
//! # Feature Flags
//!
//! - `devnet` - Use devnet addresses
//! - `mainnet` - Use mainnet addresses (default)
//! - `localnet` - Use localnet addresses (same as mainnet)

#![no_std]

// =============================================================================
// Mango Program ID
// =============================================================================

/// Mango program ID (devnet).
#[cfg(feature = "devnet")]
pub const MANGO_PROGRAM_ID: &str = "4skJ85cdxQAFVKbcGgfun8iZPL7BadVYXG3kGEGkufqA";

/// Mango program ID (mainnet/localnet).
#[cfg(not(feature = "devnet"))]
pub const MANGO_PROGRAM_ID: &str = "mv3ekLzLbnVPNxjSKvqBpU3ZeZXPQdEC3bp5MDEBG68";

// =============================================================================
// DEX Program ID
// =============================================================================

/// Order-book DEX program ID (devnet).
///
/// Owns the open-orders accounts referenced from Mango account slots.
#[cfg(feature = "devnet")]
pub const DEX_PROGRAM_ID: &str = "DESVgJVGajEgKGXhb6XmqDHGz3VjdgP7rEVESBgxmroY";

/// Order-book DEX program ID (mainnet/localnet).
///
/// Owns the open-orders accounts referenced from Mango account slots.
#[cfg(not(feature = "devnet"))]
pub const DEX_PROGRAM_ID: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

// =============================================================================
// Default Group
// =============================================================================

/// Default group name (devnet).
#[cfg(feature = "devnet")]
pub const DEFAULT_GROUP_NAME: &str = "devnet.2";

/// Default group name (mainnet/localnet).
#[cfg(not(feature = "devnet"))]
pub const DEFAULT_GROUP_NAME: &str = "mainnet.1";

/// Default group address (devnet).
#[cfg(feature = "devnet")]
pub const DEFAULT_GROUP_ID: &str = "Ec2enZyoC4nGpEfu2sUNAa2nUGJHWxoUWYSEJ2hNTWTA";

/// Default group address (mainnet/localnet).
#[cfg(not(feature = "devnet"))]
pub const DEFAULT_GROUP_ID: &str = "98pjRuQjK3qA6gXts96PqZT4Ze5QmnCmt3QYjhbUSPue";

// =============================================================================
// Network-independent programs
// =============================================================================

/// SPL Token program ID.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Name of the network these addresses were compiled for.
#[cfg(feature = "devnet")]
pub const NETWORK: &str = "devnet";

/// Name of the network these addresses were compiled for.
#[cfg(all(feature = "localnet", not(feature = "devnet")))]
pub const NETWORK: &str = "localnet";

/// Name of the network these addresses were compiled for.
#[cfg(not(any(feature = "devnet", feature = "localnet")))]
pub const NETWORK: &str = "mainnet";
