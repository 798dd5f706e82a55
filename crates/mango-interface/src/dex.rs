//! Order-book DEX market state and order parameters.
//!
//! Spot markets live on the DEX program, not on Mango. Mango reads a market's
//! vaults, queues and lot sizes when it places orders on behalf of an account.

use bytemuck::{Pod, Zeroable};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{Address, LayoutError};

/// Order side, as encoded in order instructions (u32 LE).
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, strum::Display)]
pub enum Side {
    /// Buy base with quote
    Bid = 0,
    /// Sell base for quote
    Ask = 1,
}

/// How an order interacts with the book.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, strum::Display)]
pub enum OrderType {
    /// Rest on the book at the limit price
    Limit = 0,
    /// Fill what crosses, cancel the rest
    ImmediateOrCancel = 1,
    /// Rest on the book or fail if it would cross
    PostOnly = 2,
}

/// What happens when an order would match the same owner's resting order.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, strum::Display)]
pub enum SelfTradeBehavior {
    /// Reduce the taking order
    DecrementTake = 0,
    /// Cancel the resting order
    CancelProvide = 1,
    /// Fail the transaction
    AbortTransaction = 2,
}

/// Market account flag: initialized.
pub const MARKET_FLAG_INITIALIZED: u64 = 1;

/// Market account flag: the account is a market.
pub const MARKET_FLAG_MARKET: u64 = 1 << 1;

/// DEX market state (388 bytes).
///
/// The payload is framed by the 5-byte `"serum"` head and 7-byte `"padding"`
/// tail. Integers are little-endian byte arrays so the layout has alignment 1
/// and matches the DEX byte for byte.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MarketStateLayout {
    /// `b"serum"`
    pub head: [u8; 5],
    /// Account flags (u64 LE)
    pub account_flags: [u8; 8],
    /// Market address
    pub own_address: Address,
    /// Nonce of the vault signer PDA (u64 LE)
    pub vault_signer_nonce: [u8; 8],
    /// Base mint
    pub base_mint: Address,
    /// Quote mint
    pub quote_mint: Address,
    /// Base vault
    pub base_vault: Address,
    /// Base tokens deposited (u64 LE)
    pub base_deposits_total: [u8; 8],
    /// Base fees accrued (u64 LE)
    pub base_fees_accrued: [u8; 8],
    /// Quote vault
    pub quote_vault: Address,
    /// Quote tokens deposited (u64 LE)
    pub quote_deposits_total: [u8; 8],
    /// Quote fees accrued (u64 LE)
    pub quote_fees_accrued: [u8; 8],
    /// Quote dust threshold (u64 LE)
    pub quote_dust_threshold: [u8; 8],
    /// Request queue
    pub request_queue: Address,
    /// Event queue
    pub event_queue: Address,
    /// Bids
    pub bids: Address,
    /// Asks
    pub asks: Address,
    /// Base lot size in native units (u64 LE)
    pub base_lot_size: [u8; 8],
    /// Quote lot size in native units (u64 LE)
    pub quote_lot_size: [u8; 8],
    /// Fee rate in basis points (u64 LE)
    pub fee_rate_bps: [u8; 8],
    /// Referrer rebates accrued (u64 LE)
    pub referrer_rebates_accrued: [u8; 8],
    /// `b"padding"`
    pub tail: [u8; 7],
}

impl MarketStateLayout {
    /// Size in bytes.
    pub const SIZE: usize = 388;

    /// Head marker.
    pub const HEAD: [u8; 5] = *b"serum";

    /// Tail marker.
    pub const TAIL: [u8; 7] = *b"padding";

    /// Decode a market payload.
    ///
    /// # Errors
    /// Returns [`LayoutError::WrongSize`] for a payload of the wrong length or
    /// framing, and [`LayoutError::NotInitialized`] unless the account is an
    /// initialized market.
    pub fn from_account_data(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() != Self::SIZE {
            return Err(LayoutError::WrongSize);
        }
        let layout: Self =
            bytemuck::try_pod_read_unaligned(data).map_err(|_| LayoutError::WrongSize)?;
        if layout.head != Self::HEAD || layout.tail != Self::TAIL {
            return Err(LayoutError::WrongSize);
        }
        let required = MARKET_FLAG_INITIALIZED | MARKET_FLAG_MARKET;
        if layout.account_flags() & required != required {
            return Err(LayoutError::NotInitialized);
        }
        Ok(layout)
    }

    /// An initialized market with the given mints, vaults and lot sizes.
    pub fn new(
        own_address: Address,
        base_mint: Address,
        quote_mint: Address,
        base_vault: Address,
        quote_vault: Address,
        base_lot_size: u64,
        quote_lot_size: u64,
    ) -> Self {
        Self {
            head: Self::HEAD,
            account_flags: (MARKET_FLAG_INITIALIZED | MARKET_FLAG_MARKET).to_le_bytes(),
            own_address,
            base_mint,
            quote_mint,
            base_vault,
            quote_vault,
            base_lot_size: base_lot_size.to_le_bytes(),
            quote_lot_size: quote_lot_size.to_le_bytes(),
            tail: Self::TAIL,
            ..Zeroable::zeroed()
        }
    }

    /// Account flags.
    pub fn account_flags(&self) -> u64 {
        u64::from_le_bytes(self.account_flags)
    }

    /// Vault signer nonce.
    pub fn vault_signer_nonce(&self) -> u64 {
        u64::from_le_bytes(self.vault_signer_nonce)
    }

    /// Base lot size.
    pub fn base_lot_size(&self) -> u64 {
        u64::from_le_bytes(self.base_lot_size)
    }

    /// Quote lot size.
    pub fn quote_lot_size(&self) -> u64 {
        u64::from_le_bytes(self.quote_lot_size)
    }

    /// Fee rate in basis points.
    pub fn fee_rate_bps(&self) -> u64 {
        u64::from_le_bytes(self.fee_rate_bps)
    }

    /// Serialize back to account bytes.
    pub fn to_account_data(&self) -> Vec<u8> {
        bytemuck::bytes_of(self).to_vec()
    }
}
