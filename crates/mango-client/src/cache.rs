//! Price and index cache.
//!
//! The cache is a ledger snapshot: it is fetched explicitly, passed
//! explicitly, and never refreshed behind the caller's back. Staleness is
//! a property of each entry, judged against a [`StalenessPolicy`] and a
//! caller-supplied clock.

use fixed::types::I80F48;
use log::warn;
use mango_interface::{AccountLayout, CacheLayout, QUOTE_INDEX};
use solana_pubkey::Pubkey;

use crate::{
    ClientError, Context, Group, Instrument, InstrumentValue, Result, StalenessPolicy,
};

/// Cached oracle price for one base slot, in native quote per native base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceCache {
    /// Price
    pub price: I80F48,
    /// Unix timestamp of the last update
    pub last_update: u64,
}

/// Cached root bank indices for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootBankCache {
    /// Deposit index
    pub deposit_index: I80F48,
    /// Borrow index
    pub borrow_index: I80F48,
    /// Unix timestamp of the last update
    pub last_update: u64,
}

/// Snapshot of a group's cache account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cache {
    /// Cache address
    pub address: Pubkey,
    /// Prices per base slot
    pub price_cache: Vec<PriceCache>,
    /// Indices per token index, quote last
    pub root_bank_cache: Vec<RootBankCache>,
}

impl Cache {
    /// Decode a cache payload.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not match the layout.
    pub fn parse(address: Pubkey, data: &[u8]) -> Result<Self> {
        let layout = CacheLayout::from_account_data(data)
            .map_err(|err| ClientError::layout("cache", err, data.len(), CacheLayout::SIZE))?;
        Ok(Self {
            address,
            price_cache: layout
                .price_cache
                .iter()
                .map(|entry| PriceCache {
                    price: entry.price(),
                    last_update: entry.last_update,
                })
                .collect(),
            root_bank_cache: layout
                .root_bank_cache
                .iter()
                .map(|entry| RootBankCache {
                    deposit_index: entry.deposit_index(),
                    borrow_index: entry.borrow_index(),
                    last_update: entry.last_update,
                })
                .collect(),
        })
    }

    /// Price entry for a base slot.
    pub fn price(&self, slot_index: usize) -> Option<&PriceCache> {
        self.price_cache.get(slot_index)
    }

    /// Index entry for a token index.
    pub fn root_bank(&self, token_index: usize) -> Option<&RootBankCache> {
        self.root_bank_cache.get(token_index)
    }
}

/// A cached value with the time it was last updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamped<T> {
    /// The value
    pub value: T,
    /// Unix timestamp of the last update
    pub last_update: u64,
}

impl<T> Timestamped<T> {
    /// Seconds since the last update.
    pub fn age(&self, now: u64) -> u64 {
        StalenessPolicy::age(self.last_update, now)
    }

    /// Whether the value is older than `policy` allows.
    pub fn is_stale(&self, now: u64, policy: &StalenessPolicy) -> bool {
        policy.is_stale(self.last_update, now)
    }

    /// The value if fresh, otherwise a logged [`ClientError::StaleData`].
    ///
    /// # Errors
    /// Returns [`ClientError::StaleData`] if the value is older than `policy` allows.
    pub fn fresh(self, now: u64, policy: &StalenessPolicy, what: &str) -> Result<T> {
        if self.is_stale(now, policy) {
            let age_secs = self.age(now);
            warn!("Stale {what}: {age_secs}s old (limit {}s)", policy.max_age_secs);
            return Err(ClientError::StaleData {
                what: what.to_string(),
                age_secs,
                max_age_secs: policy.max_age_secs,
            });
        }
        Ok(self.value)
    }
}

/// Fetch the group's cache.
///
/// # Errors
/// Returns [`ClientError::NotFound`] if the cache account is absent, or
/// [`ClientError::MalformedData`] if it does not decode.
pub fn fetch_cache(context: &Context, group: &Group) -> Result<Cache> {
    let data = context.fetch_required("cache", &group.cache)?;
    Cache::parse(group.cache, &data)
}

/// Price of one whole unit of `instrument`, in quote native units.
///
/// The quote token is priced at exactly one unit of itself, stamped with the
/// quote's index cache time.
///
/// # Errors
/// Returns [`ClientError::NotFound`] if the instrument has no slot in the
/// group or the cache has no entry for it, and [`ClientError::Validation`] if
/// the price overflows.
pub fn token_price_from_cache(
    group: &Group,
    cache: &Cache,
    instrument: &Instrument,
) -> Result<Timestamped<InstrumentValue>> {
    let quote = Instrument::Token(group.quote.token.clone());
    if group.token_index_of(instrument) == Some(QUOTE_INDEX) {
        let one = InstrumentValue::from_whole(quote, 1)?;
        let last_update = cache
            .root_bank(QUOTE_INDEX)
            .map(|entry| entry.last_update)
            .unwrap_or_default();
        return Ok(Timestamped {
            value: one,
            last_update,
        });
    }

    let slot = group.slot_for(instrument)?;
    let entry = cache.price(slot.index).ok_or_else(|| {
        ClientError::not_found("cached price", format!("slot {} ({instrument})", slot.index))
    })?;
    let scale = instrument.native_scale().ok_or_else(|| {
        ClientError::validation(format!("{instrument} decimals overflow native units"))
    })?;
    let native = I80F48::checked_from_num(scale)
        .and_then(|scale| entry.price.checked_mul(scale))
        .ok_or_else(|| ClientError::validation(format!("price of {instrument} overflows")))?;
    Ok(Timestamped {
        value: InstrumentValue::from_native_fixed(quote, native)?,
        last_update: entry.last_update,
    })
}
