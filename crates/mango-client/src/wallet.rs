//! Signing identity.

use std::path::Path;
use std::sync::Arc;

use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;

use crate::{ClientError, Result};

/// A signer shared between instruction units.
pub type SharedSigner = Arc<dyn Signer + Send + Sync>;

/// The user's signing identity.
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
}

impl Wallet {
    /// Wallet for a keypair.
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Parse the standard JSON byte-array keypair format.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the JSON is not a valid 64-byte keypair.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let bytes: Vec<u8> = serde_json::from_str(json)
            .map_err(|err| ClientError::Config(format!("invalid keypair JSON: {err}")))?;
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|err| ClientError::Config(format!("invalid keypair bytes: {err}")))?;
        Ok(Self::new(keypair))
    }

    /// Read a keypair file.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            ClientError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// The wallet's address.
    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// The wallet as a shareable signer.
    pub fn signer(&self) -> SharedSigner {
        self.keypair.clone()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish()
    }
}
