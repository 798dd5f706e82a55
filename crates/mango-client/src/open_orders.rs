//! Open orders sub-accounts.

use mango_interface::{AccountLayout, OpenOrdersLayout};
use solana_pubkey::Pubkey;

use crate::{ClientError, Result, to_pubkey};

/// Snapshot of an open orders account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrders {
    /// Open orders address
    pub address: Pubkey,
    /// Mango account the orders belong to
    pub mango_account: Pubkey,
    /// Spot market
    pub market: Pubkey,
    /// Owner as recorded by the DEX
    pub owner: Pubkey,
    /// Base mint recorded at creation
    pub base_mint: Pubkey,
    /// Quote mint recorded at creation
    pub quote_mint: Pubkey,
    /// Base tokens not locked in orders
    pub base_token_free: u64,
    /// All base tokens held
    pub base_token_total: u64,
    /// Quote tokens not locked in orders
    pub quote_token_free: u64,
    /// All quote tokens held
    pub quote_token_total: u64,
}

impl OpenOrders {
    /// Decode an open orders payload.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not match the layout.
    pub fn parse(address: Pubkey, data: &[u8]) -> Result<Self> {
        let layout = OpenOrdersLayout::from_account_data(data).map_err(|err| {
            ClientError::layout("open orders", err, data.len(), OpenOrdersLayout::SIZE)
        })?;
        Ok(Self {
            address,
            mango_account: to_pubkey(&layout.mango_account),
            market: to_pubkey(&layout.market),
            owner: to_pubkey(&layout.owner),
            base_mint: to_pubkey(&layout.base_mint),
            quote_mint: to_pubkey(&layout.quote_mint),
            base_token_free: layout.base_token_free,
            base_token_total: layout.base_token_total,
            quote_token_free: layout.quote_token_free,
            quote_token_total: layout.quote_token_total,
        })
    }

    /// True if the account holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.base_token_total == 0 && self.quote_token_total == 0
    }
}

/// An account slot's open orders reference and what loading it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOrdersState {
    /// Not loaded yet
    Unloaded,
    /// Loaded and decoded
    Loaded(OpenOrders),
    /// No account exists at the address
    Missing,
    /// The account exists but does not decode
    Malformed(String),
}

/// An open orders reference held by an account slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrdersRef {
    /// Referenced address
    pub address: Pubkey,
    /// Loading outcome
    pub state: OpenOrdersState,
}

impl OpenOrdersRef {
    /// A reference that has not been loaded.
    pub fn unloaded(address: Pubkey) -> Self {
        Self {
            address,
            state: OpenOrdersState::Unloaded,
        }
    }

    /// Record the result of fetching the referenced account.
    pub fn resolve(&mut self, data: Option<&[u8]>) {
        self.state = match data {
            None => OpenOrdersState::Missing,
            Some(data) => match OpenOrders::parse(self.address, data) {
                Ok(open_orders) => OpenOrdersState::Loaded(open_orders),
                Err(err) => OpenOrdersState::Malformed(err.to_string()),
            },
        };
    }

    /// The decoded account, if it loaded.
    pub fn loaded(&self) -> Option<&OpenOrders> {
        match &self.state {
            OpenOrdersState::Loaded(open_orders) => Some(open_orders),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_states() {
        let address = Pubkey::new_from_array([1u8; 32]);
        let mut reference = OpenOrdersRef::unloaded(address);
        assert_eq!(reference.loaded(), None);

        reference.resolve(None);
        assert_eq!(reference.state, OpenOrdersState::Missing);

        reference.resolve(Some(&[0u8; 12]));
        assert!(matches!(reference.state, OpenOrdersState::Malformed(_)));

        let layout = OpenOrdersLayout {
            base_mint: [5u8; 32],
            base_token_total: 10,
            ..Default::default()
        };
        reference.resolve(Some(&layout.to_account_data()));
        let loaded = reference.loaded().unwrap();
        assert_eq!(loaded.base_mint, Pubkey::new_from_array([5u8; 32]));
        assert!(!loaded.is_empty());
    }
}
