//! Zero-copy account layouts.
//!
//! Every layout is `#[repr(C)]` with explicit padding so that the struct has no
//! implicit padding bytes and can derive `Pod`. Fields holding I80F48 values
//! store the raw `i128` bits; accessor methods of the same name return the
//! fixed-point value.
//!
//! All `i128` fields sit at 16-byte aligned offsets and every layout containing
//! one has a size that is a multiple of 16.

use bytemuck::{Pod, Zeroable};
use fixed::types::I80F48;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{Address, LayoutError};

/// Number of token slots in a group, including the quote token.
pub const MAX_TOKENS: usize = 16;

/// Number of base/quote market pairs in a group.
pub const MAX_PAIRS: usize = MAX_TOKENS - 1;

/// Token slot holding the group's quote token.
pub const QUOTE_INDEX: usize = MAX_TOKENS - 1;

/// Maximum number of node banks a root bank can shard into.
pub const MAX_NODE_BANKS: usize = 8;

/// Length of the free-form info field on a Mango account.
pub const INFO_LEN: usize = 32;

/// Newest layout version this crate can decode.
pub const CURRENT_VERSION: u8 = 1;

// ============================================================================
// Metadata Header
// ============================================================================

/// Account type tag stored in the metadata header.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, strum::Display)]
pub enum DataType {
    /// Group configuration
    MangoGroup = 0,
    /// User account
    MangoAccount = 1,
    /// Root bank (interest indices, node bank set)
    RootBank = 2,
    /// Node bank (one liquidity shard)
    NodeBank = 3,
    /// Perp market
    PerpMarket = 4,
    /// Order book bids
    Bids = 5,
    /// Order book asks
    Asks = 6,
    /// Price and index cache
    MangoCache = 7,
    /// Perp event queue
    EventQueue = 8,
    /// Open orders sub-account
    OpenOrders = 9,
}

/// 8-byte header at the start of every Mango-owned account.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MetaData {
    /// [`DataType`] tag
    pub data_type: u8,
    /// Layout version
    pub version: u8,
    /// Non-zero once the program has initialized the account
    pub is_initialized: u8,
    /// Type-specific extra bytes
    pub extra_info: [u8; 5],
}

impl MetaData {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;

    /// Header for a freshly initialized account of the given type.
    pub const fn new(data_type: DataType) -> Self {
        Self {
            data_type: data_type as u8,
            version: CURRENT_VERSION,
            is_initialized: 1,
            extra_info: [0u8; 5],
        }
    }

    /// Check the header against the type a caller expects to read.
    pub fn validate(&self, expected: DataType) -> Result<(), LayoutError> {
        if self.data_type != u8::from(expected) {
            return Err(LayoutError::WrongDataType);
        }
        if self.version > CURRENT_VERSION {
            return Err(LayoutError::UnsupportedVersion);
        }
        if self.is_initialized == 0 {
            return Err(LayoutError::NotInitialized);
        }
        Ok(())
    }
}

/// Decoding shared by every layout that starts with a [`MetaData`] header.
pub trait AccountLayout: Pod {
    /// Type tag this layout expects in its header.
    const DATA_TYPE: DataType;

    /// Exact on-ledger size of the account.
    const SIZE: usize = core::mem::size_of::<Self>();

    /// The account's metadata header.
    fn meta(&self) -> &MetaData;

    /// Decode and validate a raw account payload.
    ///
    /// # Errors
    /// Returns a [`LayoutError`] if the size, type tag, version or
    /// initialization flag does not match.
    fn from_account_data(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() != Self::SIZE {
            return Err(LayoutError::WrongSize);
        }
        let layout: Self =
            bytemuck::try_pod_read_unaligned(data).map_err(|_| LayoutError::WrongSize)?;
        layout.meta().validate(Self::DATA_TYPE)?;
        Ok(layout)
    }

    /// Serialize the layout back to account bytes.
    fn to_account_data(&self) -> Vec<u8> {
        bytemuck::bytes_of(self).to_vec()
    }
}

macro_rules! impl_account_layout {
    ($layout:ty, $data_type:expr) => {
        impl AccountLayout for $layout {
            const DATA_TYPE: DataType = $data_type;

            fn meta(&self) -> &MetaData {
                &self.meta
            }
        }
    };
}

#[inline]
fn fixed(bits: i128) -> I80F48 {
    I80F48::from_bits(bits)
}

// ============================================================================
// Group
// ============================================================================

/// One token entry of a group.
///
/// Layout (72 bytes):
/// - mint: 32 bytes
/// - root_bank: 32 bytes
/// - decimals: 1 byte
/// - _padding: 7 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TokenInfoLayout {
    /// Token mint (zero if the slot is empty)
    pub mint: Address,
    /// Root bank for this token
    pub root_bank: Address,
    /// Decimal precision of the mint
    pub decimals: u8,
    /// Padding
    pub _padding: [u8; 7],
}

/// Group configuration account.
///
/// Slot `i < MAX_PAIRS` binds `tokens[i]` (base) to `spot_markets[i]`,
/// `perp_markets[i]` and `oracles[i]`; `tokens[QUOTE_INDEX]` is the quote token.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GroupLayout {
    /// Metadata header
    pub meta: MetaData,
    /// Number of oracles in use
    pub num_oracles: u64,
    /// Token entries, quote last
    pub tokens: [TokenInfoLayout; MAX_TOKENS],
    /// Spot market per slot
    pub spot_markets: [Address; MAX_PAIRS],
    /// Perp market per slot
    pub perp_markets: [Address; MAX_PAIRS],
    /// Oracle per slot
    pub oracles: [Address; MAX_PAIRS],
    /// Bump for the group signer PDA
    pub signer_nonce: u64,
    /// Group signer PDA (vault authority)
    pub signer_key: Address,
    /// Group admin
    pub admin: Address,
    /// DEX program used for spot markets
    pub dex_program_id: Address,
    /// Cache account
    pub mango_cache: Address,
    /// Maximum cache age accepted by the program, in seconds
    pub valid_interval: u64,
    /// Reserved for future fields
    pub _reserved: [u8; 64],
}

impl_account_layout!(GroupLayout, DataType::MangoGroup);

impl Default for GroupLayout {
    fn default() -> Self {
        Self {
            meta: MetaData::new(DataType::MangoGroup),
            ..Zeroable::zeroed()
        }
    }
}

// ============================================================================
// Banks
// ============================================================================

/// Root bank: interest indices and the set of node banks for one token.
///
/// Layout (368 bytes):
/// - meta: 8 bytes
/// - num_node_banks: 8 bytes
/// - node_banks: 256 bytes
/// - optimal_util, optimal_rate, max_rate: 48 bytes (I80F48)
/// - deposit_index, borrow_index: 32 bytes (I80F48)
/// - last_updated: 8 bytes
/// - _padding: 8 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct RootBankLayout {
    /// Metadata header
    pub meta: MetaData,
    /// Number of populated entries in `node_banks`
    pub num_node_banks: u64,
    /// Node bank addresses
    pub node_banks: [Address; MAX_NODE_BANKS],
    /// Utilization at the kink of the rate curve (I80F48 bits)
    pub optimal_util: i128,
    /// Borrow rate at the kink (I80F48 bits)
    pub optimal_rate: i128,
    /// Borrow rate at full utilization (I80F48 bits)
    pub max_rate: i128,
    /// Deposit index (I80F48 bits)
    pub deposit_index: i128,
    /// Borrow index (I80F48 bits)
    pub borrow_index: i128,
    /// Unix timestamp of the last index update
    pub last_updated: u64,
    /// Padding for 16-byte alignment
    pub _padding: [u8; 8],
}

impl_account_layout!(RootBankLayout, DataType::RootBank);

impl Default for RootBankLayout {
    fn default() -> Self {
        Self {
            meta: MetaData::new(DataType::RootBank),
            deposit_index: I80F48::ONE.to_bits(),
            borrow_index: I80F48::ONE.to_bits(),
            ..Zeroable::zeroed()
        }
    }
}

impl RootBankLayout {
    /// Registered node bank addresses, honoring `num_node_banks`.
    pub fn node_bank_addresses(&self) -> &[Address] {
        let count = usize::try_from(self.num_node_banks)
            .unwrap_or(MAX_NODE_BANKS)
            .min(MAX_NODE_BANKS);
        &self.node_banks[..count]
    }

    /// Deposit index.
    pub fn deposit_index(&self) -> I80F48 {
        fixed(self.deposit_index)
    }

    /// Borrow index.
    pub fn borrow_index(&self) -> I80F48 {
        fixed(self.borrow_index)
    }

    /// Optimal utilization.
    pub fn optimal_util(&self) -> I80F48 {
        fixed(self.optimal_util)
    }

    /// Borrow rate at optimal utilization.
    pub fn optimal_rate(&self) -> I80F48 {
        fixed(self.optimal_rate)
    }

    /// Borrow rate at full utilization.
    pub fn max_rate(&self) -> I80F48 {
        fixed(self.max_rate)
    }
}

/// Node bank: one shard of a root bank's liquidity.
///
/// Layout (80 bytes):
/// - meta: 8 bytes
/// - _padding: 8 bytes
/// - deposits: 16 bytes (I80F48)
/// - borrows: 16 bytes (I80F48)
/// - vault: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct NodeBankLayout {
    /// Metadata header
    pub meta: MetaData,
    /// Padding for 16-byte alignment
    pub _padding: [u8; 8],
    /// Raw (pre-index) deposits (I80F48 bits)
    pub deposits: i128,
    /// Raw (pre-index) borrows (I80F48 bits)
    pub borrows: i128,
    /// Token account holding this shard's tokens
    pub vault: Address,
}

impl_account_layout!(NodeBankLayout, DataType::NodeBank);

impl Default for NodeBankLayout {
    fn default() -> Self {
        Self {
            meta: MetaData::new(DataType::NodeBank),
            ..Zeroable::zeroed()
        }
    }
}

impl NodeBankLayout {
    /// Raw deposits.
    pub fn deposits(&self) -> I80F48 {
        fixed(self.deposits)
    }

    /// Raw borrows.
    pub fn borrows(&self) -> I80F48 {
        fixed(self.borrows)
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Cached oracle price for one slot (quote per base, native units).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PriceCacheLayout {
    /// Price (I80F48 bits)
    pub price: i128,
    /// Unix timestamp of the last update
    pub last_update: u64,
    /// Padding for 16-byte alignment
    pub _padding: [u8; 8],
}

impl PriceCacheLayout {
    /// Price.
    pub fn price(&self) -> I80F48 {
        fixed(self.price)
    }
}

/// Cached root bank indices for one token.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RootBankCacheLayout {
    /// Deposit index (I80F48 bits)
    pub deposit_index: i128,
    /// Borrow index (I80F48 bits)
    pub borrow_index: i128,
    /// Unix timestamp of the last update
    pub last_update: u64,
    /// Padding for 16-byte alignment
    pub _padding: [u8; 8],
}

impl RootBankCacheLayout {
    /// Deposit index.
    pub fn deposit_index(&self) -> I80F48 {
        fixed(self.deposit_index)
    }

    /// Borrow index.
    pub fn borrow_index(&self) -> I80F48 {
        fixed(self.borrow_index)
    }
}

/// Price and index cache shared by a group.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct CacheLayout {
    /// Metadata header
    pub meta: MetaData,
    /// Padding for 16-byte alignment
    pub _padding: [u8; 8],
    /// Price per base slot
    pub price_cache: [PriceCacheLayout; MAX_PAIRS],
    /// Indices per token, quote last
    pub root_bank_cache: [RootBankCacheLayout; MAX_TOKENS],
}

impl_account_layout!(CacheLayout, DataType::MangoCache);

impl Default for CacheLayout {
    fn default() -> Self {
        Self {
            meta: MetaData::new(DataType::MangoCache),
            ..Zeroable::zeroed()
        }
    }
}

// ============================================================================
// Mango Account
// ============================================================================

/// Per-slot references held by a Mango account.
///
/// Layout (96 bytes): open_orders, base_root_bank, quote_root_bank.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct AccountSlotLayout {
    /// Open orders sub-account (zero if none)
    pub open_orders: Address,
    /// Root bank for the slot's base token (zero if none)
    pub base_root_bank: Address,
    /// Root bank for the quote token (zero if none)
    pub quote_root_bank: Address,
}

/// User account under a group.
///
/// The group address sits at offset 8 and the owner at offset 40, which is
/// what owner lookups filter on.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MangoAccountLayout {
    /// Metadata header
    pub meta: MetaData,
    /// Owning group
    pub mango_group: Address,
    /// Owner wallet
    pub owner: Address,
    /// Non-zero for slots in the margin basket
    pub in_margin_basket: [u8; MAX_PAIRS],
    /// Number of slots in the margin basket
    pub num_in_margin_basket: u8,
    /// Padding for 16-byte alignment
    pub _padding0: [u8; 8],
    /// Raw deposits per token (I80F48 bits)
    pub deposits: [i128; MAX_TOKENS],
    /// Raw borrows per token (I80F48 bits)
    pub borrows: [i128; MAX_TOKENS],
    /// Slot references, parallel to the group's slots
    pub slots: [AccountSlotLayout; MAX_PAIRS],
    /// MSRM tokens held for fee discounts
    pub msrm_amount: u64,
    /// Non-zero while a liquidation is in progress
    pub being_liquidated: u8,
    /// Non-zero once the account is bankrupt
    pub is_bankrupt: u8,
    /// Free-form UTF-8 label
    pub info: [u8; INFO_LEN],
    /// Padding for 16-byte alignment
    pub _padding1: [u8; 6],
}

impl_account_layout!(MangoAccountLayout, DataType::MangoAccount);

impl Default for MangoAccountLayout {
    fn default() -> Self {
        Self {
            meta: MetaData::new(DataType::MangoAccount),
            ..Zeroable::zeroed()
        }
    }
}

impl MangoAccountLayout {
    /// Byte offset of the group address, for memcmp filters.
    pub const GROUP_OFFSET: usize = MetaData::SIZE;

    /// Byte offset of the owner address, for memcmp filters.
    pub const OWNER_OFFSET: usize = MetaData::SIZE + 32;

    /// Raw deposit for a token index.
    pub fn deposit(&self, token_index: usize) -> Option<I80F48> {
        self.deposits.get(token_index).copied().map(fixed)
    }

    /// Raw borrow for a token index.
    pub fn borrow(&self, token_index: usize) -> Option<I80F48> {
        self.borrows.get(token_index).copied().map(fixed)
    }
}

// ============================================================================
// Open Orders
// ============================================================================

/// Open orders sub-account recording participation in one spot market.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct OpenOrdersLayout {
    /// Metadata header
    pub meta: MetaData,
    /// Mango account the orders belong to
    pub mango_account: Address,
    /// Spot market
    pub market: Address,
    /// Owner (the Mango account address)
    pub owner: Address,
    /// Base mint recorded at creation
    pub base_mint: Address,
    /// Quote mint recorded at creation
    pub quote_mint: Address,
    /// Base tokens not locked in orders
    pub base_token_free: u64,
    /// All base tokens held
    pub base_token_total: u64,
    /// Quote tokens not locked in orders
    pub quote_token_free: u64,
    /// All quote tokens held
    pub quote_token_total: u64,
}

impl_account_layout!(OpenOrdersLayout, DataType::OpenOrders);

impl Default for OpenOrdersLayout {
    fn default() -> Self {
        Self {
            meta: MetaData::new(DataType::OpenOrders),
            ..Zeroable::zeroed()
        }
    }
}

// ============================================================================
// SPL Token Account
// ============================================================================

/// SPL Token account (165 bytes, no metadata header).
///
/// Integers are stored as little-endian byte arrays so the layout has
/// alignment 1 and matches the token program byte for byte.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TokenAccountLayout {
    /// Mint
    pub mint: Address,
    /// Owner
    pub owner: Address,
    /// Amount (u64 LE)
    pub amount: [u8; 8],
    /// Delegate option tag (u32 LE)
    pub delegate_tag: [u8; 4],
    /// Delegate
    pub delegate: Address,
    /// Account state (0 uninitialized, 1 initialized, 2 frozen)
    pub state: u8,
    /// Native option tag (u32 LE)
    pub is_native_tag: [u8; 4],
    /// Rent-exempt reserve for native accounts (u64 LE)
    pub is_native: [u8; 8],
    /// Delegated amount (u64 LE)
    pub delegated_amount: [u8; 8],
    /// Close authority option tag (u32 LE)
    pub close_authority_tag: [u8; 4],
    /// Close authority
    pub close_authority: Address,
}

impl TokenAccountLayout {
    /// Size in bytes.
    pub const SIZE: usize = 165;

    /// Decode a token account payload.
    ///
    /// # Errors
    /// Returns [`LayoutError::WrongSize`] for a payload of the wrong length and
    /// [`LayoutError::NotInitialized`] for an uninitialized account.
    pub fn from_account_data(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() != Self::SIZE {
            return Err(LayoutError::WrongSize);
        }
        let layout: Self =
            bytemuck::try_pod_read_unaligned(data).map_err(|_| LayoutError::WrongSize)?;
        if layout.state == 0 {
            return Err(LayoutError::NotInitialized);
        }
        Ok(layout)
    }

    /// Token amount.
    pub fn amount(&self) -> u64 {
        u64::from_le_bytes(self.amount)
    }

    /// Build an initialized account holding `amount` of `mint`.
    pub fn new(mint: Address, owner: Address, amount: u64) -> Self {
        Self {
            mint,
            owner,
            amount: amount.to_le_bytes(),
            state: 1,
            ..Zeroable::zeroed()
        }
    }

    /// Overwrite the token amount.
    pub fn set_amount(&mut self, amount: u64) {
        self.amount = amount.to_le_bytes();
    }
}
