//! User accounts.
//!
//! An account is aligned to its group by slot position: account slot `i`
//! trades against group slot `i`, and token position `i` is denominated in
//! the group's token `i` (`QUOTE_INDEX` for the quote).

use fixed::types::I80F48;
use log::{debug, warn};
use mango_interface::{AccountLayout, INFO_LEN, MAX_PAIRS, MangoAccountLayout};
use solana_pubkey::Pubkey;

use crate::{
    AccountFilter, Cache, ClientError, Context, Group, InstrumentValue, MemcmpFilter, OpenOrders,
    OpenOrdersRef, OpenOrdersState, Result, RootBank, optional_pubkey, to_pubkey,
};

/// Raw (pre-index) balances for one token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenPosition {
    /// Raw deposit
    pub deposit: I80F48,
    /// Raw borrow
    pub borrow: I80F48,
}

impl TokenPosition {
    /// True if both balances are zero.
    pub fn is_zero(&self) -> bool {
        self.deposit == I80F48::ZERO && self.borrow == I80F48::ZERO
    }
}

/// One account slot, parallel to the group slot with the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSlot {
    /// Slot index
    pub index: usize,
    /// Open orders reference
    pub open_orders: Option<OpenOrdersRef>,
    /// Root bank for the slot's base token
    pub base_bank: Option<Pubkey>,
    /// Root bank for the quote token
    pub quote_bank: Option<Pubkey>,
    /// Whether the slot counts toward margin
    pub in_margin_basket: bool,
}

impl AccountSlot {
    /// True if the slot references nothing.
    pub fn is_empty(&self) -> bool {
        self.open_orders.is_none() && self.base_bank.is_none() && self.quote_bank.is_none()
    }
}

/// A user-owned position container under a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Account address
    pub address: Pubkey,
    /// Layout version
    pub version: u8,
    /// Owning group
    pub group: Pubkey,
    /// Owner wallet
    pub owner: Pubkey,
    /// Free-form label
    pub info: String,
    /// Token positions by token index
    pub positions: Vec<TokenPosition>,
    /// Slots by slot index
    pub slots: Vec<AccountSlot>,
    /// MSRM held for fee discounts
    pub msrm_amount: u64,
    /// A liquidation is in progress
    pub being_liquidated: bool,
    /// The account is bankrupt
    pub is_bankrupt: bool,
}

impl Account {
    /// Decode an account payload. Open orders references are left unloaded.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not match the layout.
    pub fn parse(address: Pubkey, data: &[u8]) -> Result<Self> {
        let layout = MangoAccountLayout::from_account_data(data).map_err(|err| {
            ClientError::layout("account", err, data.len(), MangoAccountLayout::SIZE)
        })?;

        let positions = layout
            .deposits
            .iter()
            .zip(layout.borrows.iter())
            .map(|(&deposit, &borrow)| TokenPosition {
                deposit: I80F48::from_bits(deposit),
                borrow: I80F48::from_bits(borrow),
            })
            .collect();

        let slots = (0..MAX_PAIRS)
            .map(|index| {
                let slot = &layout.slots[index];
                AccountSlot {
                    index,
                    open_orders: optional_pubkey(&slot.open_orders).map(OpenOrdersRef::unloaded),
                    base_bank: optional_pubkey(&slot.base_root_bank),
                    quote_bank: optional_pubkey(&slot.quote_root_bank),
                    in_margin_basket: layout.in_margin_basket[index] != 0,
                }
            })
            .collect();

        let info_len = layout.info.iter().position(|&b| b == 0).unwrap_or(INFO_LEN);
        Ok(Self {
            address,
            version: layout.meta.version,
            group: to_pubkey(&layout.mango_group),
            owner: to_pubkey(&layout.owner),
            info: String::from_utf8_lossy(&layout.info[..info_len]).into_owned(),
            positions,
            slots,
            msrm_amount: layout.msrm_amount,
            being_liquidated: layout.being_liquidated != 0,
            is_bankrupt: layout.is_bankrupt != 0,
        })
    }

    /// Fetch an account under `group`, with its open orders.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the account is absent,
    /// [`ClientError::MalformedData`] if it does not decode, and
    /// [`ClientError::Validation`] if it belongs to another group.
    pub fn load(context: &Context, address: &Pubkey, group: &Group) -> Result<Self> {
        let data = context.fetch_required("account", address)?;
        let mut account = Self::parse(*address, &data)?;
        if account.group != group.address {
            return Err(ClientError::validation(format!(
                "account {address} belongs to group {}, not {}",
                account.group, group.address
            )));
        }
        account.load_open_orders(context)?;
        Ok(account)
    }

    /// Every account `owner` holds under `group`, ordered by address.
    ///
    /// An owner with no accounts yields an empty list.
    ///
    /// # Errors
    /// Returns a ledger error, or [`ClientError::MalformedData`] if a matching
    /// account does not decode.
    pub fn load_all_for_owner(context: &Context, owner: &Pubkey, group: &Group) -> Result<Vec<Self>> {
        let filters = [
            AccountFilter::DataSize(MangoAccountLayout::SIZE),
            AccountFilter::Memcmp(MemcmpFilter::address(
                MangoAccountLayout::GROUP_OFFSET,
                &group.address,
            )),
            AccountFilter::Memcmp(MemcmpFilter::address(MangoAccountLayout::OWNER_OFFSET, owner)),
        ];
        let found = context
            .ledger
            .find_program_accounts(&context.program_id(), &filters)?;

        let mut accounts = found
            .into_iter()
            .map(|(address, data)| Self::parse(address, &data))
            .collect::<Result<Vec<_>>>()?;
        accounts.sort_by(|a, b| a.address.cmp(&b.address));
        for account in &mut accounts {
            account.load_open_orders(context)?;
        }
        debug!("Found {} accounts for {owner} in group {}", accounts.len(), group.name);
        Ok(accounts)
    }

    /// The `index`-th account `owner` holds under `group`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the owner has `index` or fewer accounts.
    pub fn load_for_owner_by_index(
        context: &Context,
        owner: &Pubkey,
        group: &Group,
        index: usize,
    ) -> Result<Self> {
        let mut accounts = Self::load_all_for_owner(context, owner, group)?;
        let count = accounts.len();
        if index >= count {
            return Err(ClientError::not_found(
                "account",
                format!("index {index} for owner {owner} ({count} accounts)"),
            ));
        }
        Ok(accounts.swap_remove(index))
    }

    /// Fetch every referenced open orders account in one batch.
    ///
    /// Accounts that are missing or do not decode are recorded on the slot,
    /// not raised.
    ///
    /// # Errors
    /// Returns a ledger error if the batch fetch fails.
    pub fn load_open_orders(&mut self, context: &Context) -> Result<()> {
        let addresses: Vec<Pubkey> = self
            .slots
            .iter()
            .filter_map(|slot| slot.open_orders.as_ref().map(|oo| oo.address))
            .collect();
        if addresses.is_empty() {
            return Ok(());
        }

        let mut fetched = context.ledger.fetch_multiple(&addresses)?.into_iter();
        for slot in &mut self.slots {
            let Some(reference) = slot.open_orders.as_mut() else {
                continue;
            };
            let data = fetched.next().flatten();
            reference.resolve(data.as_deref());
            match &reference.state {
                OpenOrdersState::Missing => {
                    warn!("Open orders {} for slot {} not found", reference.address, slot.index)
                }
                OpenOrdersState::Malformed(reason) => warn!(
                    "Open orders {} for slot {} is malformed: {reason}",
                    reference.address, slot.index
                ),
                _ => {}
            }
        }
        Ok(())
    }

    /// Loaded open orders for a slot.
    pub fn open_orders(&self, slot_index: usize) -> Option<&OpenOrders> {
        self.slots.get(slot_index)?.open_orders.as_ref()?.loaded()
    }

    /// Raw position for a token index.
    pub fn position(&self, token_index: usize) -> Option<&TokenPosition> {
        self.positions.get(token_index)
    }

    /// True if any position or loaded open orders account holds tokens.
    pub fn has_any_balance(&self) -> bool {
        self.positions.iter().any(|position| !position.is_zero())
            || self
                .slots
                .iter()
                .filter_map(|slot| slot.open_orders.as_ref()?.loaded())
                .any(|open_orders| !open_orders.is_empty())
    }

    /// Interest-accrued deposit for a token, using the cache's indices.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the group or cache has no such
    /// token, or [`ClientError::Validation`] on overflow.
    pub fn deposit_value(&self, group: &Group, cache: &Cache, token_index: usize) -> Result<InstrumentValue> {
        let (position, index) = self.indexed_position(cache, token_index)?;
        value_of(group, token_index, position.deposit, index.deposit_index)
    }

    /// Interest-accrued borrow for a token, using the cache's indices.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the group or cache has no such
    /// token, or [`ClientError::Validation`] on overflow.
    pub fn borrow_value(&self, group: &Group, cache: &Cache, token_index: usize) -> Result<InstrumentValue> {
        let (position, index) = self.indexed_position(cache, token_index)?;
        value_of(group, token_index, position.borrow, index.borrow_index)
    }

    /// Deposit minus borrow for a token, using the cache's indices.
    ///
    /// # Errors
    /// Same as [`Account::deposit_value`].
    pub fn net_value(&self, group: &Group, cache: &Cache, token_index: usize) -> Result<InstrumentValue> {
        self.deposit_value(group, cache, token_index)?
            .checked_sub(&self.borrow_value(group, cache, token_index)?)
    }

    /// Interest-accrued deposit for a token, using a freshly fetched root bank.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] for an unknown token index, or
    /// [`ClientError::Validation`] on overflow.
    pub fn deposit_value_at(&self, root_bank: &RootBank, token_index: usize) -> Result<InstrumentValue> {
        let position = self.position(token_index).ok_or_else(|| {
            ClientError::not_found("token position", format!("index {token_index}"))
        })?;
        let native = position
            .deposit
            .checked_mul(root_bank.deposit_index)
            .ok_or_else(|| ClientError::validation("deposit value overflows"))?;
        InstrumentValue::from_native_fixed(root_bank.instrument(), native)
    }

    fn indexed_position<'a>(
        &'a self,
        cache: &'a Cache,
        token_index: usize,
    ) -> Result<(&'a TokenPosition, &'a crate::RootBankCache)> {
        let position = self.position(token_index).ok_or_else(|| {
            ClientError::not_found("token position", format!("index {token_index}"))
        })?;
        let index = cache.root_bank(token_index).ok_or_else(|| {
            ClientError::not_found("cached root bank", format!("index {token_index}"))
        })?;
        Ok((position, index))
    }
}

fn value_of(group: &Group, token_index: usize, raw: I80F48, index: I80F48) -> Result<InstrumentValue> {
    let info = group
        .token_info(token_index)
        .ok_or_else(|| ClientError::not_found("token", format!("index {token_index}")))?;
    let native = raw
        .checked_mul(index)
        .ok_or_else(|| ClientError::validation(format!("{} value overflows", info.token.symbol)))?;
    InstrumentValue::from_native_fixed(info.token.clone().into(), native)
}
