//! Instruction discriminators, argument codecs and account orders.
//!
//! Instruction data layout: `[variant: u32 LE][borsh-encoded arguments]`.

use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{OrderType, SelfTradeBehavior, Side};

// ============================================================================
// Discriminators
// ============================================================================

/// Instruction variant tag, the first four bytes of instruction data.
#[repr(u32)]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, strum::Display,
)]
pub enum MangoInstructionKind {
    /// Initialize a Mango account under a group
    InitMangoAccount = 1,
    /// Move tokens from a token account into a node bank
    Deposit = 2,
    /// Move tokens from a node bank to a token account
    Withdraw = 3,
    /// Refresh cached oracle prices
    CachePrices = 7,
    /// Place an order on a spot market, paid from the account's deposits
    PlaceSpotOrder = 9,
    /// Refresh cached root bank indices
    CacheRootBanks = 8,
    /// Accrue interest on a root bank
    UpdateRootBank = 14,
    /// Create the account's open orders for a spot market
    InitSpotOpenOrders = 32,
}

impl MangoInstructionKind {
    /// Convert to the wire tag.
    pub fn to_u32(self) -> u32 {
        self.into()
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for [`MangoInstructionKind::Deposit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DepositArgs {
    /// Native token quantity
    pub quantity: u64,
}

/// Arguments for [`MangoInstructionKind::Withdraw`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WithdrawArgs {
    /// Native token quantity
    pub quantity: u64,
    /// Allow the withdrawal to open a borrow
    pub allow_borrow: bool,
}

/// Arguments for [`MangoInstructionKind::PlaceSpotOrder`].
///
/// Enum-valued fields are u32 on the wire; see [`Side`], [`OrderType`] and
/// [`SelfTradeBehavior`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PlaceSpotOrderArgs {
    /// [`Side`] code
    pub side: u32,
    /// Limit price in quote lots per base lot
    pub limit_price: u64,
    /// Maximum base quantity in base lots
    pub max_coin_qty: u64,
    /// Maximum native quote quantity, fees included
    pub max_native_pc_qty_including_fees: u64,
    /// [`SelfTradeBehavior`] code
    pub self_trade_behavior: u32,
    /// [`OrderType`] code
    pub order_type: u32,
    /// Caller-chosen order id
    pub client_order_id: u64,
    /// Maximum number of book iterations
    pub limit: u16,
}

impl PlaceSpotOrderArgs {
    /// Decoded side, or `None` for an unknown code.
    pub fn side(&self) -> Option<Side> {
        Side::try_from(self.side).ok()
    }

    /// Decoded order type, or `None` for an unknown code.
    pub fn order_type(&self) -> Option<OrderType> {
        OrderType::try_from(self.order_type).ok()
    }

    /// Decoded self-trade behavior, or `None` for an unknown code.
    pub fn self_trade_behavior(&self) -> Option<SelfTradeBehavior> {
        SelfTradeBehavior::try_from(self.self_trade_behavior).ok()
    }
}

/// A decoded Mango instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MangoInstruction {
    /// Initialize a Mango account
    InitMangoAccount,
    /// Deposit into a node bank
    Deposit(DepositArgs),
    /// Withdraw from a node bank
    Withdraw(WithdrawArgs),
    /// Refresh cached prices
    CachePrices,
    /// Refresh cached root bank indices
    CacheRootBanks,
    /// Accrue interest on a root bank
    UpdateRootBank,
    /// Create spot open orders
    InitSpotOpenOrders,
    /// Place a spot order
    PlaceSpotOrder(PlaceSpotOrderArgs),
}

impl MangoInstruction {
    /// The variant tag.
    pub fn kind(&self) -> MangoInstructionKind {
        match self {
            Self::InitMangoAccount => MangoInstructionKind::InitMangoAccount,
            Self::Deposit(_) => MangoInstructionKind::Deposit,
            Self::Withdraw(_) => MangoInstructionKind::Withdraw,
            Self::CachePrices => MangoInstructionKind::CachePrices,
            Self::CacheRootBanks => MangoInstructionKind::CacheRootBanks,
            Self::UpdateRootBank => MangoInstructionKind::UpdateRootBank,
            Self::InitSpotOpenOrders => MangoInstructionKind::InitSpotOpenOrders,
            Self::PlaceSpotOrder(_) => MangoInstructionKind::PlaceSpotOrder,
        }
    }

    /// Encode to instruction data.
    pub fn pack(&self) -> Vec<u8> {
        let mut data = self.kind().to_u32().to_le_bytes().to_vec();
        // Writes into a Vec cannot fail.
        let _ = match self {
            Self::Deposit(args) => args.serialize(&mut data),
            Self::Withdraw(args) => args.serialize(&mut data),
            Self::PlaceSpotOrder(args) => args.serialize(&mut data),
            _ => Ok(()),
        };
        data
    }

    /// Decode instruction data. Returns `None` for unknown tags or bad arguments.
    pub fn unpack(data: &[u8]) -> Option<Self> {
        let tag: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let kind = MangoInstructionKind::try_from(u32::from_le_bytes(tag)).ok()?;
        let args = &data[4..];
        let instruction = match kind {
            MangoInstructionKind::InitMangoAccount => Self::InitMangoAccount,
            MangoInstructionKind::Deposit => Self::Deposit(DepositArgs::try_from_slice(args).ok()?),
            MangoInstructionKind::Withdraw => {
                Self::Withdraw(WithdrawArgs::try_from_slice(args).ok()?)
            }
            MangoInstructionKind::CachePrices => Self::CachePrices,
            MangoInstructionKind::CacheRootBanks => Self::CacheRootBanks,
            MangoInstructionKind::UpdateRootBank => Self::UpdateRootBank,
            MangoInstructionKind::InitSpotOpenOrders => Self::InitSpotOpenOrders,
            MangoInstructionKind::PlaceSpotOrder => {
                Self::PlaceSpotOrder(PlaceSpotOrderArgs::try_from_slice(args).ok()?)
            }
        };
        Some(instruction)
    }
}

// ============================================================================
// Account Orders
// ============================================================================

/// Account indices for InitMangoAccount.
///
/// 0. group - Group the account joins
/// 1. mango_account (mut) - Freshly allocated, program-owned account
/// 2. owner (signer) - Owner wallet
pub mod init_account_accounts {
    /// Group
    pub const GROUP: usize = 0;
    /// New Mango account (writable)
    pub const MANGO_ACCOUNT: usize = 1;
    /// Owner (signer)
    pub const OWNER: usize = 2;
    /// Total number of accounts
    pub const COUNT: usize = 3;
}

/// Account indices for Deposit.
///
/// 0. group
/// 1. mango_account (mut) - Account credited with the deposit
/// 2. owner (signer) - Account owner and token account authority
/// 3. cache
/// 4. root_bank
/// 5. node_bank (mut) - Shard receiving the tokens
/// 6. vault (mut) - Node bank vault
/// 7. token_program
/// 8. owner_token_account (mut) - Source token account
pub mod deposit_accounts {
    /// Group
    pub const GROUP: usize = 0;
    /// Mango account (writable)
    pub const MANGO_ACCOUNT: usize = 1;
    /// Owner (signer)
    pub const OWNER: usize = 2;
    /// Cache
    pub const CACHE: usize = 3;
    /// Root bank
    pub const ROOT_BANK: usize = 4;
    /// Node bank (writable)
    pub const NODE_BANK: usize = 5;
    /// Vault (writable)
    pub const VAULT: usize = 6;
    /// SPL Token program
    pub const TOKEN_PROGRAM: usize = 7;
    /// Source token account (writable)
    pub const OWNER_TOKEN_ACCOUNT: usize = 8;
    /// Total number of accounts
    pub const COUNT: usize = 9;
}

/// Account indices for Withdraw.
///
/// 0. group
/// 1. mango_account (mut) - Account debited
/// 2. owner (signer)
/// 3. cache
/// 4. root_bank
/// 5. node_bank (mut)
/// 6. vault (mut)
/// 7. token_account (mut) - Destination token account
/// 8. signer_key - Group signer PDA, vault authority
/// 9. token_program
pub mod withdraw_accounts {
    /// Group
    pub const GROUP: usize = 0;
    /// Mango account (writable)
    pub const MANGO_ACCOUNT: usize = 1;
    /// Owner (signer)
    pub const OWNER: usize = 2;
    /// Cache
    pub const CACHE: usize = 3;
    /// Root bank
    pub const ROOT_BANK: usize = 4;
    /// Node bank (writable)
    pub const NODE_BANK: usize = 5;
    /// Vault (writable)
    pub const VAULT: usize = 6;
    /// Destination token account (writable)
    pub const TOKEN_ACCOUNT: usize = 7;
    /// Group signer PDA
    pub const SIGNER_KEY: usize = 8;
    /// SPL Token program
    pub const TOKEN_PROGRAM: usize = 9;
    /// Total number of accounts
    pub const COUNT: usize = 10;
}

/// Account indices for UpdateRootBank.
///
/// 0. group
/// 1. root_bank (mut)
/// 2.. node_banks - Every node bank registered under the root bank
pub mod update_root_bank_accounts {
    /// Group
    pub const GROUP: usize = 0;
    /// Root bank (writable)
    pub const ROOT_BANK: usize = 1;
    /// First node bank
    pub const FIRST_NODE_BANK: usize = 2;
}

/// Account indices for CachePrices and CacheRootBanks.
///
/// 0. group
/// 1. cache (mut)
/// 2.. oracles (CachePrices) or root banks (CacheRootBanks)
pub mod cache_accounts {
    /// Group
    pub const GROUP: usize = 0;
    /// Cache (writable)
    pub const CACHE: usize = 1;
    /// First oracle or root bank
    pub const FIRST_SOURCE: usize = 2;
}

/// Account indices for InitSpotOpenOrders.
///
/// 0. group
/// 1. mango_account (mut) - Slot receives the open orders reference
/// 2. owner (signer)
/// 3. dex_program
/// 4. open_orders (mut) - Freshly allocated, DEX-owned account
/// 5. spot_market
/// 6. signer_key - Group signer PDA
pub mod init_spot_open_orders_accounts {
    /// Group
    pub const GROUP: usize = 0;
    /// Mango account (writable)
    pub const MANGO_ACCOUNT: usize = 1;
    /// Owner (signer)
    pub const OWNER: usize = 2;
    /// DEX program
    pub const DEX_PROGRAM: usize = 3;
    /// Open orders (writable)
    pub const OPEN_ORDERS: usize = 4;
    /// Spot market
    pub const SPOT_MARKET: usize = 5;
    /// Group signer PDA
    pub const SIGNER_KEY: usize = 6;
    /// Total number of accounts
    pub const COUNT: usize = 7;
}

/// Account indices for PlaceSpotOrder.
///
/// The paying bank is the quote bank for bids and the base bank for asks.
///
/// 0. group
/// 1. mango_account (mut)
/// 2. owner (signer)
/// 3. cache
/// 4. dex_program
/// 5. spot_market (mut)
/// 6. bids (mut)
/// 7. asks (mut)
/// 8. request_queue (mut)
/// 9. event_queue (mut)
/// 10. market_base_vault (mut)
/// 11. market_quote_vault (mut)
/// 12. root_bank - Paying bank
/// 13. node_bank (mut)
/// 14. vault (mut) - Node bank vault
/// 15. token_program
/// 16. signer_key - Group signer PDA
/// 17. open_orders (mut)
pub mod place_spot_order_accounts {
    /// Group
    pub const GROUP: usize = 0;
    /// Mango account (writable)
    pub const MANGO_ACCOUNT: usize = 1;
    /// Owner (signer)
    pub const OWNER: usize = 2;
    /// Cache
    pub const CACHE: usize = 3;
    /// DEX program
    pub const DEX_PROGRAM: usize = 4;
    /// Spot market (writable)
    pub const SPOT_MARKET: usize = 5;
    /// Bids (writable)
    pub const BIDS: usize = 6;
    /// Asks (writable)
    pub const ASKS: usize = 7;
    /// Request queue (writable)
    pub const REQUEST_QUEUE: usize = 8;
    /// Event queue (writable)
    pub const EVENT_QUEUE: usize = 9;
    /// Market base vault (writable)
    pub const MARKET_BASE_VAULT: usize = 10;
    /// Market quote vault (writable)
    pub const MARKET_QUOTE_VAULT: usize = 11;
    /// Paying root bank
    pub const ROOT_BANK: usize = 12;
    /// Paying node bank (writable)
    pub const NODE_BANK: usize = 13;
    /// Paying node bank vault (writable)
    pub const VAULT: usize = 14;
    /// SPL Token program
    pub const TOKEN_PROGRAM: usize = 15;
    /// Group signer PDA
    pub const SIGNER_KEY: usize = 16;
    /// Open orders (writable)
    pub const OPEN_ORDERS: usize = 17;
    /// Total number of accounts
    pub const COUNT: usize = 18;
}
