//! Layout decoding errors and on-ledger error codes.

use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Reasons a raw account payload fails to decode into a layout.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum LayoutError {
    /// Payload length differs from the layout size (truncated or oversized)
    WrongSize = 0,

    /// Metadata header names a different account type
    WrongDataType = 1,

    /// Metadata header carries a version newer than this client understands
    UnsupportedVersion = 2,

    /// Account has not been initialized by the program
    NotInitialized = 3,
}

impl LayoutError {
    /// Convert to error code
    pub fn to_u32(self) -> u32 {
        self.into()
    }

    /// Create from error code
    pub fn from_u32(code: u32) -> Option<Self> {
        Self::try_from(code).ok()
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::WrongSize => "payload size does not match layout",
            Self::WrongDataType => "wrong account data type",
            Self::UnsupportedVersion => "unsupported layout version",
            Self::NotInitialized => "account not initialized",
        };
        f.write_str(text)
    }
}

impl std::error::Error for LayoutError {}

/// Custom error codes returned by the Mango program.
///
/// A rejected transaction reports these as `Custom(code)`; clients decode
/// them to explain which precondition the program refused.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, strum::Display)]
pub enum MangoErrorCode {
    /// Unspecified failure
    Default = 0,
    /// Cache account is invalid
    InvalidCache = 1,
    /// Account owner does not match
    InvalidOwner = 2,
    /// Group owner does not match
    InvalidGroupOwner = 3,
    /// Group signer key does not match
    InvalidSignerKey = 4,
    /// Admin key does not match
    InvalidAdminKey = 5,
    /// Vault is not the node bank's vault
    InvalidVault = 6,
    /// Fixed-point arithmetic overflowed
    MathError = 7,
    /// Source account balance too low
    InsufficientFunds = 8,
    /// Token is not listed in the group
    InvalidToken = 9,
    /// Market is not listed in the group
    InvalidMarket = 10,
    /// Program id does not match
    InvalidProgramId = 11,
    /// Group account is not rent exempt
    GroupNotRentExempt = 12,
    /// No free slot left
    OutOfSpace = 13,
    /// Too many open orders accounts
    TooManyOpenOrders = 14,
    /// Account is not rent exempt
    AccountNotRentExempt = 15,
    /// Client order id not found
    ClientIdNotFound = 16,
    /// Node bank is not registered under the root bank
    InvalidNodeBank = 17,
    /// Root bank is not the group's root bank for the token
    InvalidRootBank = 18,
    /// Margin basket has no free entries
    MarginBasketFull = 19,
    /// Account is not liquidatable
    NotLiquidatable = 20,
    /// Instruction is not implemented
    Unimplemented = 21,
    /// Post-only order would cross
    PostOnly = 22,
    /// Account is bankrupt
    Bankrupt = 23,
    /// Health check failed
    InsufficientHealth = 24,
    /// Instruction parameter out of range
    InvalidParam = 25,
    /// Account is not the expected account
    InvalidAccount = 26,
    /// Account is in a state that forbids this instruction
    InvalidAccountState = 27,
    /// A required signer did not sign
    SignerNecessary = 28,
    /// Node bank vault lacks liquidity for the withdrawal
    InsufficientLiquidity = 29,
    /// Order id not found
    InvalidOrderId = 30,
    /// Open orders account is invalid
    InvalidOpenOrdersAccount = 31,
    /// Account is being liquidated
    BeingLiquidated = 32,
    /// Root bank cache entry is invalid or stale
    InvalidRootBankCache = 33,
    /// Price cache entry is invalid or stale
    InvalidPriceCache = 34,
}

impl MangoErrorCode {
    /// Convert to error code
    pub fn to_u32(self) -> u32 {
        self.into()
    }

    /// Create from error code
    pub fn from_u32(code: u32) -> Option<Self> {
        Self::try_from(code).ok()
    }
}
