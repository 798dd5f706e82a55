//! Client error taxonomy.

use mango_interface::{LayoutError, MangoErrorCode};
use solana_signature::Signature;
use thiserror::Error;

/// Errors raised by the ledger boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The transport failed before the ledger answered.
    #[error("ledger transport failed: {0}")]
    Transport(String),

    /// The ledger rejected a transaction. Nothing in it was applied.
    #[error("transaction rejected{}: {message}", instruction_suffix(.instruction_index))]
    Rejected {
        /// Index of the failing instruction within the transaction, if known
        instruction_index: Option<usize>,
        /// Program custom error code, if the failure carried one
        custom_code: Option<u32>,
        /// Ledger-provided description
        message: String,
    },

    /// The caller stopped waiting; the outcome is unknown.
    #[error("confirmation timed out for {0}")]
    Timeout(Signature),
}

fn instruction_suffix(index: &Option<usize>) -> String {
    index
        .map(|index| format!(" at instruction {index}"))
        .unwrap_or_default()
}

/// A failed submission of a combined instruction set.
///
/// Transactions before `chunk_index` were confirmed and are listed in
/// `completed`; the failing chunk and everything after it were not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "transaction {} of {chunk_count} failed (instructions {first_instruction}..{}): {source}",
    .chunk_index + 1,
    .first_instruction + .instruction_count
)]
pub struct SubmissionError {
    /// Zero-based index of the failing transaction
    pub chunk_index: usize,
    /// Number of transactions the set was split into
    pub chunk_count: usize,
    /// Global index of the failing transaction's first instruction
    pub first_instruction: usize,
    /// Number of instructions in the failing transaction
    pub instruction_count: usize,
    /// Global index of the rejected instruction, when the ledger reported one
    pub failed_instruction: Option<usize>,
    /// Decoded program error, when the ledger reported a Mango error code
    pub error_code: Option<MangoErrorCode>,
    /// Signatures of transactions confirmed before the failure
    pub completed: Vec<Signature>,
    /// Underlying ledger failure
    pub source: LedgerError,
}

/// Errors returned by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A referenced entity (instrument, bank, shard, account) is absent.
    #[error("{entity} not found: {detail}")]
    NotFound {
        /// Kind of entity
        entity: &'static str,
        /// What was looked up
        detail: String,
    },

    /// A ledger payload failed schema validation.
    #[error("malformed {entity} data: {reason}")]
    MalformedData {
        /// Kind of entity
        entity: &'static str,
        /// What was wrong
        reason: String,
    },

    /// A caller-supplied value violates a precondition.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The funding source holds less than requested.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Requested quantity, rendered
        requested: String,
        /// Available quantity, rendered
        available: String,
    },

    /// A cached value is older than the staleness policy allows.
    #[error("stale {what}: {age_secs}s old, limit {max_age_secs}s")]
    StaleData {
        /// What was stale
        what: String,
        /// Age in seconds
        age_secs: u64,
        /// Policy limit in seconds
        max_age_secs: u64,
    },

    /// The ledger rejected a submitted transaction.
    #[error(transparent)]
    Submission(#[from] Box<SubmissionError>),

    /// The ledger boundary failed outside of a submission.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Configuration or wallet input is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Shorthand for [`ClientError::NotFound`].
    pub fn not_found(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            detail: detail.into(),
        }
    }

    /// Shorthand for [`ClientError::MalformedData`].
    pub fn malformed(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedData {
            entity,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ClientError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap a layout decoding failure with the payload size for context.
    pub fn layout(entity: &'static str, error: LayoutError, len: usize, expected: usize) -> Self {
        Self::malformed(entity, format!("{error} ({len} bytes, layout is {expected})"))
    }
}

/// Client result alias.
pub type Result<T> = std::result::Result<T, ClientError>;
