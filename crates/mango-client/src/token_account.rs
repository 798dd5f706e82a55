//! SPL token accounts used as deposit sources and withdrawal destinations.

use mango_interface::TokenAccountLayout;
use solana_pubkey::Pubkey;

use crate::{ClientError, Context, Instrument, InstrumentValue, Result, Token, to_pubkey};

/// Snapshot of an SPL token account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    /// Token account address
    pub address: Pubkey,
    /// Owner wallet
    pub owner: Pubkey,
    /// Token held
    pub token: Token,
    /// Balance
    pub value: InstrumentValue,
}

impl TokenAccount {
    /// Decode a token account payload expected to hold `token`.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not decode,
    /// or [`ClientError::Validation`] if it holds a different mint.
    pub fn parse(address: Pubkey, token: Token, data: &[u8]) -> Result<Self> {
        let layout = TokenAccountLayout::from_account_data(data).map_err(|err| {
            ClientError::layout("token account", err, data.len(), TokenAccountLayout::SIZE)
        })?;
        let mint = to_pubkey(&layout.mint);
        if mint != token.mint {
            return Err(ClientError::validation(format!(
                "token account {address} holds mint {mint}, expected {} ({})",
                token.symbol, token.mint
            )));
        }
        Ok(Self {
            address,
            owner: to_pubkey(&layout.owner),
            value: InstrumentValue::from_native(
                Instrument::Token(token.clone()),
                i128::from(layout.amount()),
            ),
            token,
        })
    }

    /// Fetch and decode a token account.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the account is absent, plus any
    /// error from [`TokenAccount::parse`].
    pub fn load(context: &Context, address: &Pubkey, token: Token) -> Result<Self> {
        let data = context.fetch_required("token account", address)?;
        Self::parse(*address, token, &data)
    }
}
