//! Client configuration.
//!
//! Defaults come from `mango-program-ids` for the compiled network feature.
//! A JSON document can override any subset of fields:
//!
//! ```json
//! {
//!   "cluster": "devnet",
//!   "group": "Ec2enZyoC4nGpEfu2sUNAa2nUGJHWxoUWYSEJ2hNTWTA",
//!   "staleness": { "max_age_secs": 30 },
//!   "node_bank_policy": "least_deposited"
//! }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;

use crate::{ClientError, Result};

/// Solana's packet data limit: 1280 minus IPv6 and fragment headers.
pub const MAX_TRANSACTION_SIZE: usize = 1280 - 40 - 8;

/// Default maximum cache age, in seconds.
pub const DEFAULT_MAX_AGE_SECS: u64 = 60;

/// Network the client targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Cluster {
    /// Mainnet beta
    Mainnet,
    /// Devnet
    Devnet,
    /// Local validator
    Localnet,
}

impl Cluster {
    /// Cluster matching the compiled network feature.
    pub fn compiled() -> Self {
        match mango_program_ids::NETWORK {
            "devnet" => Self::Devnet,
            "localnet" => Self::Localnet,
            _ => Self::Mainnet,
        }
    }
}

/// How old cached prices and indices may be before they count as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessPolicy {
    /// Maximum age in seconds
    pub max_age_secs: u64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl StalenessPolicy {
    /// Policy with the given maximum age.
    pub fn new(max_age_secs: u64) -> Self {
        Self { max_age_secs }
    }

    /// Age of a value updated at `last_update`, seen at `now`.
    pub fn age(last_update: u64, now: u64) -> u64 {
        now.saturating_sub(last_update)
    }

    /// Whether a value updated at `last_update` is stale at `now`.
    pub fn is_stale(&self, last_update: u64, now: u64) -> bool {
        Self::age(last_update, now) > self.max_age_secs
    }
}

/// Which node bank a deposit or withdrawal is routed through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeBankPolicy {
    /// First registered node bank that exists on the ledger
    #[default]
    First,
    /// Node bank with the smallest raw deposits
    LeastDeposited,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target network
    pub cluster: Cluster,
    /// Human-readable group name
    pub group_name: String,
    /// Group address
    #[serde(with = "pubkey_string")]
    pub group: Pubkey,
    /// Mango program
    #[serde(with = "pubkey_string")]
    pub program_id: Pubkey,
    /// DEX program owning open-orders accounts
    #[serde(with = "pubkey_string")]
    pub dex_program_id: Pubkey,
    /// Cache staleness threshold
    pub staleness: StalenessPolicy,
    /// Node bank selection
    pub node_bank_policy: NodeBankPolicy,
    /// Largest serialized transaction the composer will build
    pub max_transaction_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::compiled(),
            group_name: mango_program_ids::DEFAULT_GROUP_NAME.to_string(),
            group: Pubkey::new_from_array(mango_interface::DEFAULT_GROUP_ID),
            program_id: Pubkey::new_from_array(mango_interface::MANGO_PROGRAM_ID),
            dex_program_id: Pubkey::new_from_array(mango_interface::DEX_PROGRAM_ID),
            staleness: StalenessPolicy::default(),
            node_bank_policy: NodeBankPolicy::default(),
            max_transaction_size: MAX_TRANSACTION_SIZE,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document over the defaults.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] for invalid JSON, addresses or limits.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ClientError::Config(format!("invalid config JSON: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
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

    fn validate(&self) -> Result<()> {
        if self.max_transaction_size == 0 || self.max_transaction_size > MAX_TRANSACTION_SIZE {
            return Err(ClientError::Config(format!(
                "max_transaction_size must be in 1..={MAX_TRANSACTION_SIZE}, got {}",
                self.max_transaction_size
            )));
        }
        Ok(())
    }
}

/// Serde helpers for base58 address strings.
pub(crate) mod pubkey_string {
    use super::*;

    pub fn serialize<S: serde::Serializer>(
        pubkey: &Pubkey,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&pubkey.to_string())
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Pubkey, D::Error> {
        let text = String::deserialize(deserializer)?;
        Pubkey::from_str(&text)
            .map_err(|err| serde::de::Error::custom(format!("invalid address {text}: {err}")))
    }
}
