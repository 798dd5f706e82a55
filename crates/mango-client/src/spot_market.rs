//! Spot markets and orders placed on them.

use log::debug;
use mango_interface::{MarketStateLayout, OrderType, PlaceSpotOrderArgs, SelfTradeBehavior, Side};
use solana_pubkey::Pubkey;

use crate::{ClientError, Context, Group, Instrument, InstrumentValue, Result, Token, to_pubkey};

/// Book iterations allowed per order.
const DEFAULT_MATCH_LIMIT: u16 = 65_535;

/// Snapshot of a group slot's spot market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotMarket {
    /// Market address
    pub address: Pubkey,
    /// Group slot the market is listed in
    pub slot_index: usize,
    /// DEX program owning the market
    pub dex_program_id: Pubkey,
    /// Base token
    pub base: Token,
    /// Quote token
    pub quote: Token,
    /// Market base vault
    pub base_vault: Pubkey,
    /// Market quote vault
    pub quote_vault: Pubkey,
    /// Request queue
    pub request_queue: Pubkey,
    /// Event queue
    pub event_queue: Pubkey,
    /// Bids
    pub bids: Pubkey,
    /// Asks
    pub asks: Pubkey,
    /// Base lot size in native units
    pub base_lot_size: u64,
    /// Quote lot size in native units
    pub quote_lot_size: u64,
    /// Taker fee in basis points
    pub fee_rate_bps: u64,
}

impl SpotMarket {
    /// Decode a market payload for the given slot tokens.
    ///
    /// # Errors
    /// Returns [`ClientError::MalformedData`] if the payload does not decode or
    /// names another address, and [`ClientError::Validation`] if its mints are
    /// not `base` and `quote` or a lot size is zero.
    pub fn parse(
        address: Pubkey,
        slot_index: usize,
        dex_program_id: Pubkey,
        base: Token,
        quote: Token,
        data: &[u8],
    ) -> Result<Self> {
        let layout = MarketStateLayout::from_account_data(data).map_err(|err| {
            ClientError::layout("spot market", err, data.len(), MarketStateLayout::SIZE)
        })?;
        if to_pubkey(&layout.own_address) != address {
            return Err(ClientError::malformed(
                "spot market",
                format!("{address} records address {}", to_pubkey(&layout.own_address)),
            ));
        }
        for (mint, token) in [(&layout.base_mint, &base), (&layout.quote_mint, &quote)] {
            if to_pubkey(mint) != token.mint {
                return Err(ClientError::validation(format!(
                    "market {address} trades mint {}, expected {token}",
                    to_pubkey(mint)
                )));
            }
        }
        if layout.base_lot_size() == 0 || layout.quote_lot_size() == 0 {
            return Err(ClientError::validation(format!("market {address} has a zero lot size")));
        }
        Ok(Self {
            address,
            slot_index,
            dex_program_id,
            base,
            quote,
            base_vault: to_pubkey(&layout.base_vault),
            quote_vault: to_pubkey(&layout.quote_vault),
            request_queue: to_pubkey(&layout.request_queue),
            event_queue: to_pubkey(&layout.event_queue),
            bids: to_pubkey(&layout.bids),
            asks: to_pubkey(&layout.asks),
            base_lot_size: layout.base_lot_size(),
            quote_lot_size: layout.quote_lot_size(),
            fee_rate_bps: layout.fee_rate_bps(),
        })
    }

    /// Fetch and decode the spot market listed in `slot_index` of `group`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if the slot is out of range, has no
    /// base token or market, or the market account is absent, plus any error from
    /// [`SpotMarket::parse`].
    pub fn load(context: &Context, group: &Group, slot_index: usize) -> Result<Self> {
        let slot = group.slot(slot_index)?;
        let base = slot
            .base
            .as_ref()
            .ok_or_else(|| ClientError::not_found("base token", format!("slot {slot_index}")))?;
        let address = slot
            .spot_market
            .ok_or_else(|| ClientError::not_found("spot market", format!("slot {slot_index}")))?;
        let data = context.fetch_required("spot market", &address)?;
        let market = Self::parse(
            address,
            slot_index,
            group.dex_program_id,
            base.token.clone(),
            group.quote.token.clone(),
            &data,
        )?;
        debug!(
            "Loaded {}/{} market {address} (lots {}/{})",
            market.base.symbol, market.quote.symbol, market.base_lot_size, market.quote_lot_size
        );
        Ok(market)
    }

    /// Market symbol, `BASE/QUOTE`.
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base.symbol, self.quote.symbol)
    }

    /// Encode `order` in lots.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the price is not in the quote
    /// token, the quantity is not in the base token, either is not positive
    /// or not a whole number of lots, or the arithmetic overflows.
    pub fn order_args(&self, order: &Order) -> Result<PlaceSpotOrderArgs> {
        if *order.price.instrument() != Instrument::Token(self.quote.clone()) {
            return Err(ClientError::validation(format!(
                "{} price must be in {}, got {}",
                self.symbol(),
                self.quote.symbol,
                order.price.instrument()
            )));
        }
        if *order.quantity.instrument() != Instrument::Token(self.base.clone()) {
            return Err(ClientError::validation(format!(
                "{} quantity must be in {}, got {}",
                self.symbol(),
                self.base.symbol,
                order.quantity.instrument()
            )));
        }
        let overflow = || ClientError::validation(format!("{order} overflows {}", self.symbol()));

        let quantity = u128::from(order.quantity.to_native_u64()?);
        let base_lot = u128::from(self.base_lot_size);
        if quantity == 0 || quantity % base_lot != 0 {
            return Err(ClientError::validation(format!(
                "{} is not a positive multiple of the {} base lot",
                order.quantity, self.base_lot_size
            )));
        }
        let max_coin_qty = quantity / base_lot;

        // Price per whole base token, in quote lots per base lot.
        let price = u128::from(order.price.to_native_u64()?);
        let numerator = price.checked_mul(base_lot).ok_or_else(overflow)?;
        let denominator = 10u128
            .checked_pow(u32::from(self.base.decimals))
            .and_then(|scale| scale.checked_mul(u128::from(self.quote_lot_size)))
            .ok_or_else(overflow)?;
        if numerator == 0 || numerator % denominator != 0 {
            return Err(ClientError::validation(format!(
                "{} is not a positive multiple of the {} price tick",
                order.price,
                self.symbol()
            )));
        }
        let limit_price = numerator / denominator;

        let notional = limit_price
            .checked_mul(u128::from(self.quote_lot_size))
            .and_then(|value| value.checked_mul(max_coin_qty))
            .ok_or_else(overflow)?;
        let max_native_pc_qty = match order.side {
            // Ceiling of notional * (1 + fee)
            Side::Bid => notional
                .checked_mul(10_000 + u128::from(self.fee_rate_bps))
                .map(|value| value.div_ceil(10_000))
                .ok_or_else(overflow)?,
            Side::Ask => notional,
        };

        let narrow = |value: u128| u64::try_from(value).map_err(|_| overflow());
        Ok(PlaceSpotOrderArgs {
            side: order.side.into(),
            limit_price: narrow(limit_price)?,
            max_coin_qty: narrow(max_coin_qty)?,
            max_native_pc_qty_including_fees: narrow(max_native_pc_qty)?,
            self_trade_behavior: SelfTradeBehavior::DecrementTake.into(),
            order_type: order.order_type.into(),
            client_order_id: order.client_id,
            limit: DEFAULT_MATCH_LIMIT,
        })
    }

    /// Native amount an order locks up: quote for bids, base for asks.
    ///
    /// # Errors
    /// Returns any error from [`SpotMarket::order_args`].
    pub fn order_payment(&self, order: &Order) -> Result<InstrumentValue> {
        let args = self.order_args(order)?;
        Ok(match order.side {
            Side::Bid => InstrumentValue::from_native(
                Instrument::Token(self.quote.clone()),
                i128::from(args.max_native_pc_qty_including_fees),
            ),
            Side::Ask => InstrumentValue::from_native(
                Instrument::Token(self.base.clone()),
                i128::from(args.max_coin_qty) * i128::from(self.base_lot_size),
            ),
        })
    }
}

/// A spot order: price per whole base token, quantity in base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Buy or sell
    pub side: Side,
    /// Book interaction
    pub order_type: OrderType,
    /// Limit price per whole base token, in the quote token
    pub price: InstrumentValue,
    /// Base quantity
    pub quantity: InstrumentValue,
    /// Caller-chosen id
    pub client_id: u64,
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} at {}",
            self.order_type, self.side, self.quantity, self.price
        )
    }
}
