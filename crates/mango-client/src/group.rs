//! Group configuration.

use log::debug;
use mango_interface::{AccountLayout, GroupLayout, MAX_PAIRS, QUOTE_INDEX, TokenInfoLayout};
use solana_pubkey::Pubkey;

use crate::{ClientError, Context, Instrument, Result, Token, TokenLookup, optional_pubkey, to_pubkey};

/// A token listed in a group, with the root bank holding its liquidity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Token, with the decimals recorded in the group
    pub token: Token,
    /// Root bank address
    pub root_bank: Pubkey,
}

/// One base slot of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSlot {
    /// Slot index
    pub index: usize,
    /// Base token, if the slot is populated
    pub base: Option<TokenInfo>,
    /// Spot market
    pub spot_market: Option<Pubkey>,
    /// Perp market
    pub perp_market: Option<Pubkey>,
    /// Oracle
    pub oracle: Option<Pubkey>,
}

impl GroupSlot {
    /// True if nothing is bound to the slot.
    pub fn is_empty(&self) -> bool {
        self.base.is_none()
            && self.spot_market.is_none()
            && self.perp_market.is_none()
            && self.oracle.is_none()
    }
}

/// Shared configuration binding tokens to banks, oracles and markets by slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group address
    pub address: Pubkey,
    /// Human-readable name
    pub name: String,
    /// Layout version
    pub version: u8,
    /// Base slots, `MAX_PAIRS` of them
    pub slots: Vec<GroupSlot>,
    /// Quote token shared by every slot
    pub quote: TokenInfo,
    /// Number of oracles in use
    pub num_oracles: usize,
    /// Bump for the group signer PDA
    pub signer_nonce: u64,
    /// Group signer PDA (vault authority)
    pub signer_key: Pubkey,
    /// Admin
    pub admin: Pubkey,
    /// DEX program for spot markets
    pub dex_program_id: Pubkey,
    /// Cache account
    pub cache: Pubkey,
    /// Maximum cache age accepted by the program, in seconds
    pub valid_interval: u64,
}

impl Group {
    /// Decode a group payload, resolving mints through `token_lookup`.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not match the
    /// layout or has no quote token, and [`ClientError::NotFound`] if a listed
    /// mint cannot be resolved.
    pub fn parse(
        address: Pubkey,
        name: &str,
        data: &[u8],
        token_lookup: &dyn TokenLookup,
    ) -> Result<Self> {
        let layout = GroupLayout::from_account_data(data)
            .map_err(|err| ClientError::layout("group", err, data.len(), GroupLayout::SIZE))?;

        let quote = resolve_token(&layout.tokens[QUOTE_INDEX], QUOTE_INDEX, token_lookup)?
            .ok_or_else(|| ClientError::malformed("group", "no quote token"))?;

        let slots = (0..MAX_PAIRS)
            .map(|index| {
                Ok(GroupSlot {
                    index,
                    base: resolve_token(&layout.tokens[index], index, token_lookup)?,
                    spot_market: optional_pubkey(&layout.spot_markets[index]),
                    perp_market: optional_pubkey(&layout.perp_markets[index]),
                    oracle: optional_pubkey(&layout.oracles[index]),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            address,
            name: name.to_string(),
            version: layout.meta.version,
            slots,
            quote,
            num_oracles: usize::try_from(layout.num_oracles).unwrap_or(usize::MAX),
            signer_nonce: layout.signer_nonce,
            signer_key: to_pubkey(&layout.signer_key),
            admin: to_pubkey(&layout.admin),
            dex_program_id: to_pubkey(&layout.dex_program_id),
            cache: to_pubkey(&layout.mango_cache),
            valid_interval: layout.valid_interval,
        })
    }

    /// Fetch and decode the configured group.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the group account is absent, plus
    /// any error from [`Group::parse`].
    pub fn load(context: &Context) -> Result<Self> {
        let address = context.group_address();
        let data = context.fetch_required("group", &address)?;
        let group = Self::parse(
            address,
            &context.config.group_name,
            &data,
            context.token_lookup.as_ref(),
        )?;
        debug!(
            "Loaded group {} ({}) with {} tokens",
            group.name,
            group.address,
            group.tokens().count()
        );
        Ok(group)
    }

    /// Every listed token with its token index: base slots in order, then the quote.
    pub fn tokens(&self) -> impl Iterator<Item = (usize, &TokenInfo)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.base.as_ref().map(|info| (slot.index, info)))
            .chain(std::iter::once((QUOTE_INDEX, &self.quote)))
    }

    /// Token at a token index (`QUOTE_INDEX` for the quote).
    pub fn token_info(&self, token_index: usize) -> Option<&TokenInfo> {
        if token_index == QUOTE_INDEX {
            return Some(&self.quote);
        }
        self.slots.get(token_index)?.base.as_ref()
    }

    /// Token index of an instrument, matched by mint.
    pub fn token_index_of(&self, instrument: &Instrument) -> Option<usize> {
        let mint = instrument.mint()?;
        self.tokens()
            .find(|(_, info)| info.token.mint == *mint)
            .map(|(index, _)| index)
    }

    /// Base slot at `index`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the index is past the last slot.
    pub fn slot(&self, index: usize) -> Result<&GroupSlot> {
        self.slots.get(index).ok_or_else(|| {
            ClientError::not_found(
                "group slot",
                format!("index {index} (group has {} slots)", self.slots.len()),
            )
        })
    }

    /// Base slot trading `instrument`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if no base slot holds the instrument.
    pub fn slot_for(&self, instrument: &Instrument) -> Result<&GroupSlot> {
        let mint = instrument.mint();
        self.slots
            .iter()
            .find(|slot| {
                slot.base
                    .as_ref()
                    .is_some_and(|info| Some(&info.token.mint) == mint)
            })
            .ok_or_else(|| {
                ClientError::not_found(
                    "group slot",
                    format!("{} in group {}", instrument.symbol(), self.name),
                )
            })
    }

    /// Listed token with `symbol` (case-insensitive).
    pub fn find_token_by_symbol(&self, symbol: &str) -> Option<&Token> {
        let symbol = symbol.to_uppercase();
        self.tokens()
            .map(|(_, info)| &info.token)
            .find(|token| token.symbol == symbol)
    }
}

fn resolve_token(
    layout: &TokenInfoLayout,
    index: usize,
    token_lookup: &dyn TokenLookup,
) -> Result<Option<TokenInfo>> {
    let Some(mint) = optional_pubkey(&layout.mint) else {
        return Ok(None);
    };
    let root_bank = optional_pubkey(&layout.root_bank).ok_or_else(|| {
        ClientError::malformed("group", format!("token {index} ({mint}) has no root bank"))
    })?;
    let listed = token_lookup.find_by_mint_or_err(&mint)?;
    Ok(Some(TokenInfo {
        token: Token::new(&listed.symbol, &listed.name, mint, layout.decimals),
        root_bank,
    }))
}
