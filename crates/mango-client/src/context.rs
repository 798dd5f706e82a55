//! Explicit dependencies for ledger-facing operations.

use std::sync::Arc;

use log::debug;
use solana_pubkey::Pubkey;

use crate::{ClientConfig, Ledger, Result, TokenLookup};

/// Configuration, ledger access and token resolution, passed to every
/// operation that touches the ledger.
#[derive(Clone)]
pub struct Context {
    /// Client configuration
    pub config: ClientConfig,
    /// Ledger access
    pub ledger: Arc<dyn Ledger>,
    /// Token resolution
    pub token_lookup: Arc<dyn TokenLookup>,
}

impl Context {
    /// Bundle the client's dependencies.
    pub fn new(
        config: ClientConfig,
        ledger: Arc<dyn Ledger>,
        token_lookup: Arc<dyn TokenLookup>,
    ) -> Self {
        Self {
            config,
            ledger,
            token_lookup,
        }
    }

    /// Mango program address.
    pub fn program_id(&self) -> Pubkey {
        self.config.program_id
    }

    /// Configured group address.
    pub fn group_address(&self) -> Pubkey {
        self.config.group
    }

    /// Fetch an account, treating absence as `NotFound`.
    ///
    /// # Errors
    /// Returns [`crate::ClientError::NotFound`] if the account does not exist,
    /// or a ledger error if it cannot be fetched.
    pub fn fetch_required(&self, entity: &'static str, address: &Pubkey) -> Result<Vec<u8>> {
        debug!("Fetching {entity} {address}");
        self.ledger
            .fetch(address)?
            .ok_or_else(|| crate::ClientError::not_found(entity, address.to_string()))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
