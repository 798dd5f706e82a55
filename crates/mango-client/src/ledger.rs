//! Ledger boundary.
//!
//! The client never talks to an RPC node directly. Every read and every
//! submission goes through a [`Ledger`], which an embedding application backs
//! with its blockchain client of choice (or a simulator in tests).

use solana_hash::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::Transaction;

use crate::LedgerError;

/// Match `bytes` at `offset` of an account's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    /// Byte offset into the account data
    pub offset: usize,
    /// Bytes that must appear at `offset`
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    /// Filter on a 32-byte address at `offset`.
    pub fn address(offset: usize, address: &Pubkey) -> Self {
        Self {
            offset,
            bytes: address.to_bytes().to_vec(),
        }
    }

    /// Whether `data` satisfies the filter.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len())
            .is_some_and(|window| window == self.bytes.as_slice())
    }
}

/// Program-account query filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Exact data length
    DataSize(usize),
    /// Bytes at an offset
    Memcmp(MemcmpFilter),
}

impl AccountFilter {
    /// Whether `data` satisfies the filter.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::DataSize(size) => data.len() == *size,
            Self::Memcmp(filter) => filter.matches(data),
        }
    }
}

/// Read and write access to the ledger.
///
/// Implementations block until the ledger answers. `submit` returns once the
/// transaction is confirmed, or with [`LedgerError::Rejected`] if any of its
/// instructions failed, in which case none of them were applied.
pub trait Ledger: Send + Sync {
    /// Fetch an account's raw data. `Ok(None)` if the account does not exist.
    ///
    /// # Errors
    /// Returns a [`LedgerError`] if the ledger cannot be reached.
    fn fetch(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Fetch several accounts, preserving order.
    ///
    /// # Errors
    /// Returns a [`LedgerError`] if the ledger cannot be reached.
    fn fetch_multiple(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, LedgerError> {
        addresses.iter().map(|address| self.fetch(address)).collect()
    }

    /// Find all accounts owned by `program_id` that satisfy every filter.
    ///
    /// # Errors
    /// Returns a [`LedgerError`] if the ledger cannot be reached.
    fn find_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, LedgerError>;

    /// Lamports needed for an account of `data_len` bytes to be rent exempt.
    ///
    /// # Errors
    /// Returns a [`LedgerError`] if the ledger cannot be reached.
    fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LedgerError>;

    /// A recent blockhash to sign transactions against.
    ///
    /// # Errors
    /// Returns a [`LedgerError`] if the ledger cannot be reached.
    fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    /// Submit a signed transaction and wait for confirmation.
    ///
    /// # Errors
    /// Returns [`LedgerError::Rejected`] if the ledger refused the
    /// transaction, or another [`LedgerError`] if the outcome is unknown.
    fn submit(&self, transaction: &Transaction) -> Result<Signature, LedgerError>;
}
