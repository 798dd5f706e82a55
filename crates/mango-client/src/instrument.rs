//! Instruments and instrument-scoped quantities.

use std::cmp::Ordering;
use std::fmt;

use fixed::types::I80F48;
use solana_pubkey::Pubkey;

use crate::{ClientError, Result};

/// A fungible token with a mint on the ledger.
///
/// Two tokens are equal when mint and decimals are equal; symbol and name
/// are descriptive only.
#[derive(Debug, Clone)]
pub struct Token {
    /// Upper-cased ticker symbol
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Mint address
    pub mint: Pubkey,
    /// Decimal precision of native units
    pub decimals: u8,
}

impl Token {
    /// Create a token. The symbol is upper-cased.
    pub fn new(symbol: &str, name: &str, mint: Pubkey, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            name: name.to_string(),
            mint,
            decimals,
        }
    }

    /// Convert an instrument into a token.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the instrument has no mint.
    pub fn ensure(instrument: &Instrument) -> Result<Token> {
        match instrument {
            Instrument::Token(token) => Ok(token.clone()),
            Instrument::Index { symbol, .. } => Err(ClientError::validation(format!(
                "instrument {symbol} has no mint and cannot be used as a token"
            ))),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.mint == other.mint && self.decimals == other.decimals
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.mint)
    }
}

impl TryFrom<&Instrument> for Token {
    type Error = ClientError;

    fn try_from(instrument: &Instrument) -> Result<Self> {
        Token::ensure(instrument)
    }
}

/// Anything that can be priced and quantified.
#[derive(Debug, Clone)]
pub enum Instrument {
    /// A token with a mint
    Token(Token),
    /// A priced symbol with no mint of its own (an index or perp underlying)
    Index {
        /// Upper-cased symbol
        symbol: String,
        /// Display name
        name: String,
        /// Decimal precision
        decimals: u8,
    },
}

impl Instrument {
    /// Create a mint-less instrument. The symbol is upper-cased.
    pub fn index(symbol: &str, name: &str, decimals: u8) -> Self {
        Self::Index {
            symbol: symbol.to_uppercase(),
            name: name.to_string(),
            decimals,
        }
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        match self {
            Self::Token(token) => &token.symbol,
            Self::Index { symbol, .. } => symbol,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Self::Token(token) => &token.name,
            Self::Index { name, .. } => name,
        }
    }

    /// Decimal precision.
    pub fn decimals(&self) -> u8 {
        match self {
            Self::Token(token) => token.decimals,
            Self::Index { decimals, .. } => *decimals,
        }
    }

    /// Mint, if this instrument is a token.
    pub fn mint(&self) -> Option<&Pubkey> {
        match self {
            Self::Token(token) => Some(&token.mint),
            Self::Index { .. } => None,
        }
    }

    /// Number of native units in one whole unit, or `None` past i128 range.
    pub fn native_scale(&self) -> Option<i128> {
        10i128.checked_pow(u32::from(self.decimals()))
    }
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Token(left), Self::Token(right)) => left == right,
            (
                Self::Index {
                    symbol: left,
                    decimals: left_decimals,
                    ..
                },
                Self::Index {
                    symbol: right,
                    decimals: right_decimals,
                    ..
                },
            ) => left == right && left_decimals == right_decimals,
            _ => false,
        }
    }
}

impl Eq for Instrument {}

impl From<Token> for Instrument {
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A quantity of one instrument, held in native (integer) units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentValue {
    instrument: Instrument,
    native: i128,
}

impl InstrumentValue {
    /// Value from native units.
    pub fn from_native(instrument: Instrument, native: i128) -> Self {
        Self { instrument, native }
    }

    /// Value from a whole number of UI units.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the native amount overflows.
    pub fn from_whole(instrument: Instrument, units: i64) -> Result<Self> {
        let native = instrument
            .native_scale()
            .and_then(|scale| scale.checked_mul(i128::from(units)))
            .ok_or_else(|| {
                ClientError::validation(format!("{units} {instrument} overflows native units"))
            })?;
        Ok(Self { instrument, native })
    }

    /// Parse a decimal UI quantity such as `"1.25"`.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the text is not a decimal number,
    /// has more fractional digits than the instrument supports, or overflows.
    pub fn from_ui_str(instrument: Instrument, text: &str) -> Result<Self> {
        let invalid = || ClientError::validation(format!("{text:?} is not a decimal quantity"));
        let trimmed = text.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let decimals = usize::from(instrument.decimals());
        if fraction.len() > decimals {
            return Err(ClientError::validation(format!(
                "{text} has {} decimal places but {instrument} supports {decimals}",
                fraction.len()
            )));
        }

        let overflow =
            || ClientError::validation(format!("{text} {instrument} overflows native units"));
        let scale = instrument.native_scale().ok_or_else(overflow)?;
        let whole: i128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let fraction: i128 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<decimals$}");
            padded.parse().map_err(|_| overflow())?
        };
        let magnitude = whole
            .checked_mul(scale)
            .and_then(|native| native.checked_add(fraction))
            .ok_or_else(overflow)?;
        let native = if negative { -magnitude } else { magnitude };
        Ok(Self { instrument, native })
    }

    /// Value from a fixed-point native amount, rounded down.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the amount is outside i128 range.
    pub fn from_native_fixed(instrument: Instrument, native: I80F48) -> Result<Self> {
        let native = native.floor().checked_to_num::<i128>().ok_or_else(|| {
            ClientError::validation(format!("{native} {instrument} is out of range"))
        })?;
        Ok(Self { instrument, native })
    }

    /// The instrument.
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Native units.
    pub fn native(&self) -> i128 {
        self.native
    }

    /// Native units as the `u64` the ledger expects.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] for negative or oversized values.
    pub fn to_native_u64(&self) -> Result<u64> {
        u64::try_from(self.native).map_err(|_| {
            ClientError::validation(format!("{self} cannot be expressed as a ledger amount"))
        })
    }

    /// True if the quantity is zero.
    pub fn is_zero(&self) -> bool {
        self.native == 0
    }

    /// True if the quantity is negative.
    pub fn is_negative(&self) -> bool {
        self.native < 0
    }

    /// Sum of two values of the same instrument.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] on instrument mismatch or overflow.
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        self.require_same_instrument(other, "add")?;
        let native = self.native.checked_add(other.native).ok_or_else(|| {
            ClientError::validation(format!("{self} + {other} overflows"))
        })?;
        Ok(Self::from_native(self.instrument.clone(), native))
    }

    /// Difference of two values of the same instrument.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] on instrument mismatch or overflow.
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.require_same_instrument(other, "subtract")?;
        let native = self.native.checked_sub(other.native).ok_or_else(|| {
            ClientError::validation(format!("{self} - {other} overflows"))
        })?;
        Ok(Self::from_native(self.instrument.clone(), native))
    }

    /// Order two values of the same instrument.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] on instrument mismatch.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        self.require_same_instrument(other, "compare")?;
        Ok(self.native.cmp(&other.native))
    }

    fn require_same_instrument(&self, other: &Self, operation: &str) -> Result<()> {
        if self.instrument != other.instrument {
            return Err(ClientError::validation(format!(
                "cannot {operation} {} and {}",
                self.instrument, other.instrument
            )));
        }
        Ok(())
    }
}

impl fmt::Display for InstrumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = usize::from(self.instrument.decimals());
        let Some(scale) = self.instrument.native_scale() else {
            return write!(f, "{} native {}", self.native, self.instrument);
        };
        let sign = if self.native < 0 { "-" } else { "" };
        let magnitude = self.native.unsigned_abs();
        let scale = scale.unsigned_abs();
        let whole = magnitude / scale;
        if decimals == 0 {
            return write!(f, "{sign}{whole} {}", self.instrument);
        }
        let fraction = magnitude % scale;
        write!(f, "{sign}{whole}.{fraction:0>decimals$} {}", self.instrument)
    }
}
