//! Root and node banks.
//!
//! A root bank holds the deposit and borrow indices for one token plus the
//! set of node banks sharding its liquidity. Node banks hold raw (pre-index)
//! balances; multiplying a raw balance by the root bank's index gives the
//! interest-accrued token amount. Interest accrual only touches the root bank,
//! so deposits into different node banks never contend with each other or
//! with accrual.

use fixed::types::I80F48;
use log::debug;
use mango_interface::{AccountLayout, NodeBankLayout, RootBankLayout};
use solana_pubkey::Pubkey;

use crate::{
    ClientError, Context, Group, Instrument, InstrumentValue, NodeBankPolicy, Result, Token,
    to_pubkey,
};

/// Interest indices and node bank set for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootBank {
    /// Root bank address
    pub address: Pubkey,
    /// Token the bank holds
    pub token: Token,
    /// Layout version
    pub version: u8,
    /// Registered node banks, in registration order
    pub node_banks: Vec<Pubkey>,
    /// Utilization at the kink of the rate curve
    pub optimal_util: I80F48,
    /// Borrow rate at the kink
    pub optimal_rate: I80F48,
    /// Borrow rate at full utilization
    pub max_rate: I80F48,
    /// Deposit index
    pub deposit_index: I80F48,
    /// Borrow index
    pub borrow_index: I80F48,
    /// Unix timestamp of the last index update
    pub last_updated: u64,
}

impl RootBank {
    /// Decode a root bank payload for `token`.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not match the layout.
    pub fn parse(address: Pubkey, token: Token, data: &[u8]) -> Result<Self> {
        let layout = RootBankLayout::from_account_data(data)
            .map_err(|err| ClientError::layout("root bank", err, data.len(), RootBankLayout::SIZE))?;
        Ok(Self {
            address,
            token,
            version: layout.meta.version,
            node_banks: layout.node_bank_addresses().iter().map(to_pubkey).collect(),
            optimal_util: layout.optimal_util(),
            optimal_rate: layout.optimal_rate(),
            max_rate: layout.max_rate(),
            deposit_index: layout.deposit_index(),
            borrow_index: layout.borrow_index(),
            last_updated: layout.last_updated,
        })
    }

    /// Fetch and decode a root bank.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the account is absent, or
    /// [`ClientError::MalformedData`] if it does not decode.
    pub fn load(context: &Context, address: &Pubkey, token: Token) -> Result<Self> {
        let data = context.fetch_required("root bank", address)?;
        Self::parse(*address, token, &data)
    }

    /// The bank's token as an instrument.
    pub fn instrument(&self) -> Instrument {
        Instrument::Token(self.token.clone())
    }

    /// Whether `node_bank` is registered under this root bank.
    pub fn contains_node_bank(&self, node_bank: &Pubkey) -> bool {
        self.node_banks.contains(node_bank)
    }

    /// Fetch every registered node bank that exists on the ledger, in order.
    ///
    /// # Errors
    /// Returns a ledger error, or [`ClientError::MalformedData`] if a node
    /// bank does not decode.
    pub fn load_node_banks(&self, context: &Context) -> Result<Vec<NodeBank>> {
        let accounts = context.ledger.fetch_multiple(&self.node_banks)?;
        self.node_banks
            .iter()
            .zip(accounts)
            .filter_map(|(address, data)| {
                data.map(|data| NodeBank::parse(*address, self.address, &data))
            })
            .collect()
    }

    /// Fraction of indexed deposits currently borrowed, clamped to `[0, 1]`.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if a node bank belongs to another root bank.
    pub fn utilization(&self, node_banks: &[NodeBank]) -> Result<I80F48> {
        self.require_members(node_banks)?;
        let raw_deposits: I80F48 = node_banks.iter().map(|node| node.deposits).sum();
        let raw_borrows: I80F48 = node_banks.iter().map(|node| node.borrows).sum();
        let deposits = raw_deposits.saturating_mul(self.deposit_index);
        let borrows = raw_borrows.saturating_mul(self.borrow_index);
        if deposits <= I80F48::ZERO {
            return Ok(I80F48::ZERO);
        }
        let utilization = borrows.checked_div(deposits).unwrap_or(I80F48::ONE);
        Ok(utilization.clamp(I80F48::ZERO, I80F48::ONE))
    }

    /// Borrow rate at `utilization` on the kinked rate curve.
    pub fn borrow_rate(&self, utilization: I80F48) -> I80F48 {
        let utilization = utilization.clamp(I80F48::ZERO, I80F48::ONE);
        if utilization > self.optimal_util {
            let extra_util = utilization - self.optimal_util;
            let slope = (self.max_rate - self.optimal_rate)
                .checked_div(I80F48::ONE - self.optimal_util)
                .unwrap_or(I80F48::ZERO);
            self.optimal_rate + slope.saturating_mul(extra_util)
        } else {
            let slope = self
                .optimal_rate
                .checked_div(self.optimal_util)
                .unwrap_or(I80F48::ZERO);
            slope.saturating_mul(utilization)
        }
    }

    /// Deposit rate at `utilization`: the borrow rate scaled by utilization.
    pub fn deposit_rate(&self, utilization: I80F48) -> I80F48 {
        let utilization = utilization.clamp(I80F48::ZERO, I80F48::ONE);
        self.borrow_rate(utilization).saturating_mul(utilization)
    }

    fn require_member(&self, node_bank: &NodeBank) -> Result<()> {
        if !self.contains_node_bank(&node_bank.address) {
            return Err(ClientError::validation(format!(
                "node bank {} is not registered under root bank {} ({})",
                node_bank.address, self.address, self.token.symbol
            )));
        }
        Ok(())
    }

    fn require_members(&self, node_banks: &[NodeBank]) -> Result<()> {
        node_banks.iter().try_for_each(|node| self.require_member(node))
    }
}

/// One liquidity shard of a root bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBank {
    /// Node bank address
    pub address: Pubkey,
    /// Root bank this node bank was loaded under
    pub root_bank: Pubkey,
    /// Raw deposits
    pub deposits: I80F48,
    /// Raw borrows
    pub borrows: I80F48,
    /// Token account holding the shard's tokens
    pub vault: Pubkey,
}

impl NodeBank {
    /// Decode a node bank payload.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not match the layout.
    pub fn parse(address: Pubkey, root_bank: Pubkey, data: &[u8]) -> Result<Self> {
        let layout = NodeBankLayout::from_account_data(data)
            .map_err(|err| ClientError::layout("node bank", err, data.len(), NodeBankLayout::SIZE))?;
        Ok(Self {
            address,
            root_bank,
            deposits: layout.deposits(),
            borrows: layout.borrows(),
            vault: to_pubkey(&layout.vault),
        })
    }

    /// Fetch and decode a node bank.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the account is absent, or
    /// [`ClientError::MalformedData`] if it does not decode.
    pub fn load(context: &Context, address: &Pubkey, root_bank: &Pubkey) -> Result<Self> {
        let data = context.fetch_required("node bank", address)?;
        Self::parse(*address, *root_bank, &data)
    }
}

/// Fetch the root bank the group binds to `instrument`.
///
/// Always reads the ledger; the result is a snapshot.
///
/// # Errors
/// Returns [`ClientError::Validation`] if the instrument has no mint, and
/// [`ClientError::NotFound`] if the group has no bank for it or the bank
/// account is absent.
pub fn ensure_root_bank(context: &Context, group: &Group, instrument: &Instrument) -> Result<RootBank> {
    let token = Token::ensure(instrument)?;
    let token_index = group.token_index_of(instrument).ok_or_else(|| {
        ClientError::not_found(
            "root bank",
            format!("{} is not configured in group {}", token.symbol, group.name),
        )
    })?;
    let info = group.token_info(token_index).ok_or_else(|| {
        ClientError::not_found("root bank", format!("token index {token_index}"))
    })?;
    RootBank::load(context, &info.root_bank, info.token.clone())
}

/// Choose a node bank of `root_bank` to route a deposit or withdrawal through.
///
/// Only node banks registered under the root bank are considered. The
/// configured [`NodeBankPolicy`] picks among those that exist on the ledger.
///
/// # Errors
/// Returns [`ClientError::NotFound`] if the root bank has no node banks on the
/// ledger.
pub fn pick_node_bank(context: &Context, root_bank: &RootBank) -> Result<NodeBank> {
    let no_shards = || {
        ClientError::not_found(
            "node bank",
            format!("root bank {} ({}) has no node banks", root_bank.address, root_bank.token.symbol),
        )
    };
    if root_bank.node_banks.is_empty() {
        return Err(no_shards());
    }

    let node_banks = root_bank.load_node_banks(context)?;
    let picked = match context.config.node_bank_policy {
        NodeBankPolicy::First => node_banks.into_iter().next(),
        NodeBankPolicy::LeastDeposited => node_banks
            .into_iter()
            .reduce(|best, node| if node.deposits < best.deposits { node } else { best }),
    }
    .ok_or_else(no_shards)?;

    debug!(
        "Picked node bank {} for {} ({:?})",
        picked.address, root_bank.token.symbol, context.config.node_bank_policy
    );
    Ok(picked)
}

/// Interest-accrued token amount for a raw deposit balance held in `node_bank`.
///
/// Pure: the result depends only on the three inputs. Rounds down to native units.
///
/// # Errors
/// Returns [`ClientError::Validation`] if `node_bank` is not registered under
/// `root_bank` or the amount overflows.
pub fn token_balance(root_bank: &RootBank, node_bank: &NodeBank, raw: I80F48) -> Result<InstrumentValue> {
    root_bank.require_member(node_bank)?;
    indexed_value(root_bank, raw, root_bank.deposit_index)
}

/// Interest-accrued token amount for a raw borrow balance held in `node_bank`.
///
/// # Errors
/// Returns [`ClientError::Validation`] if `node_bank` is not registered under
/// `root_bank` or the amount overflows.
pub fn token_borrow_balance(
    root_bank: &RootBank,
    node_bank: &NodeBank,
    raw: I80F48,
) -> Result<InstrumentValue> {
    root_bank.require_member(node_bank)?;
    indexed_value(root_bank, raw, root_bank.borrow_index)
}

/// Total pooled liquidity: the sum of raw node bank deposits times the deposit index.
///
/// # Errors
/// Returns [`ClientError::Validation`] if a node bank belongs to another root
/// bank or the total overflows.
pub fn pooled_liquidity(root_bank: &RootBank, node_banks: &[NodeBank]) -> Result<InstrumentValue> {
    root_bank.require_members(node_banks)?;
    let raw = node_banks
        .iter()
        .try_fold(I80F48::ZERO, |total, node| total.checked_add(node.deposits))
        .ok_or_else(|| ClientError::validation("raw deposits overflow"))?;
    indexed_value(root_bank, raw, root_bank.deposit_index)
}

fn indexed_value(root_bank: &RootBank, raw: I80F48, index: I80F48) -> Result<InstrumentValue> {
    let native = raw.checked_mul(index).ok_or_else(|| {
        ClientError::validation(format!("{raw} x {index} overflows for {}", root_bank.token.symbol))
    })?;
    InstrumentValue::from_native_fixed(root_bank.instrument(), native)
}
