//! SPL Token instructions used around deposits and withdrawals.
//!
//! Instruction data layout: `[tag: u8][arguments, little-endian]`.

use crate::Address;

/// SPL Token instructions a Mango client issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenInstruction {
    /// Initialize an allocated account for a mint and owner (tag 18)
    InitializeAccount3 {
        /// Owner of the new token account
        owner: Address,
    },
    /// Move tokens, checking the mint's decimals (tag 12)
    TransferChecked {
        /// Native amount
        amount: u64,
        /// Mint decimals
        decimals: u8,
    },
    /// Close an empty account and reclaim its lamports (tag 9)
    CloseAccount,
}

impl TokenInstruction {
    /// Tag for `CloseAccount`.
    pub const CLOSE_ACCOUNT: u8 = 9;

    /// Tag for `TransferChecked`.
    pub const TRANSFER_CHECKED: u8 = 12;

    /// Tag for `InitializeAccount3`.
    pub const INITIALIZE_ACCOUNT3: u8 = 18;

    /// Encode to instruction data.
    pub fn pack(&self) -> Vec<u8> {
        match self {
            Self::InitializeAccount3 { owner } => {
                let mut data = vec![Self::INITIALIZE_ACCOUNT3];
                data.extend_from_slice(owner);
                data
            }
            Self::TransferChecked { amount, decimals } => {
                let mut data = vec![Self::TRANSFER_CHECKED];
                data.extend_from_slice(&amount.to_le_bytes());
                data.push(*decimals);
                data
            }
            Self::CloseAccount => vec![Self::CLOSE_ACCOUNT],
        }
    }

    /// Decode instruction data. Returns `None` for other tags or bad lengths.
    pub fn unpack(data: &[u8]) -> Option<Self> {
        let (&tag, rest) = data.split_first()?;
        match tag {
            Self::INITIALIZE_ACCOUNT3 => Some(Self::InitializeAccount3 {
                owner: rest.try_into().ok()?,
            }),
            Self::TRANSFER_CHECKED => {
                if rest.len() != 9 {
                    return None;
                }
                let amount = u64::from_le_bytes(rest[..8].try_into().ok()?);
                Some(Self::TransferChecked {
                    amount,
                    decimals: rest[8],
                })
            }
            Self::CLOSE_ACCOUNT if rest.is_empty() => Some(Self::CloseAccount),
            _ => None,
        }
    }
}

/// Account indices for InitializeAccount3.
///
/// 0. account (mut) - Allocated, token-program-owned account
/// 1. mint
pub mod initialize_account_accounts {
    /// New token account (writable)
    pub const ACCOUNT: usize = 0;
    /// Mint
    pub const MINT: usize = 1;
    /// Total number of accounts
    pub const COUNT: usize = 2;
}

/// Account indices for TransferChecked.
///
/// 0. source (mut)
/// 1. mint
/// 2. destination (mut)
/// 3. authority (signer) - Source owner
pub mod transfer_checked_accounts {
    /// Source token account (writable)
    pub const SOURCE: usize = 0;
    /// Mint
    pub const MINT: usize = 1;
    /// Destination token account (writable)
    pub const DESTINATION: usize = 2;
    /// Source owner (signer)
    pub const AUTHORITY: usize = 3;
    /// Total number of accounts
    pub const COUNT: usize = 4;
}

/// Account indices for CloseAccount.
///
/// 0. account (mut) - Empty token account
/// 1. destination (mut) - Receives the lamports
/// 2. authority (signer) - Account owner
pub mod close_account_accounts {
    /// Token account (writable)
    pub const ACCOUNT: usize = 0;
    /// Lamport destination (writable)
    pub const DESTINATION: usize = 1;
    /// Owner (signer)
    pub const AUTHORITY: usize = 2;
    /// Total number of accounts
    pub const COUNT: usize = 3;
}
