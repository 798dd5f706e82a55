//! Symbol and mint resolution for tokens.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use solana_pubkey::Pubkey;

use crate::{ClientError, Result, Token};

/// Resolves tokens by symbol or mint.
pub trait TokenLookup: Send + Sync {
    /// Token with the given symbol (case-insensitive).
    fn find_by_symbol(&self, symbol: &str) -> Option<Token>;

    /// Token with the given mint.
    fn find_by_mint(&self, mint: &Pubkey) -> Option<Token>;

    /// Like [`TokenLookup::find_by_symbol`], failing when absent.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if no token has the symbol.
    fn find_by_symbol_or_err(&self, symbol: &str) -> Result<Token> {
        self.find_by_symbol(symbol)
            .ok_or_else(|| ClientError::not_found("token", format!("symbol {symbol}")))
    }

    /// Like [`TokenLookup::find_by_mint`], failing when absent.
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if no token has the mint.
    fn find_by_mint_or_err(&self, mint: &Pubkey) -> Result<Token> {
        self.find_by_mint(mint)
            .ok_or_else(|| ClientError::not_found("token", format!("mint {mint}")))
    }
}

#[derive(Deserialize)]
struct TokenList {
    tokens: Vec<TokenListEntry>,
}

#[derive(Deserialize)]
struct TokenListEntry {
    symbol: String,
    name: String,
    address: String,
    decimals: u8,
}

/// In-memory token registry.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenLookup {
    tokens: Vec<Token>,
}

impl StaticTokenLookup {
    /// Registry holding `tokens`.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Parse a token list document: `{"tokens": [{"symbol", "name", "address", "decimals"}]}`.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] for invalid JSON or addresses.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let list: TokenList = serde_json::from_str(json)
            .map_err(|err| ClientError::Config(format!("invalid token list: {err}")))?;
        let tokens = list
            .tokens
            .into_iter()
            .map(|entry| {
                let mint = Pubkey::from_str(&entry.address).map_err(|err| {
                    ClientError::Config(format!("invalid mint for {}: {err}", entry.symbol))
                })?;
                Ok(Token::new(&entry.symbol, &entry.name, mint, entry.decimals))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tokens })
    }

    /// Read a token list file.
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

    /// Add a token.
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// All registered tokens.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl TokenLookup for StaticTokenLookup {
    fn find_by_symbol(&self, symbol: &str) -> Option<Token> {
        let symbol = symbol.to_uppercase();
        self.tokens.iter().find(|token| token.symbol == symbol).cloned()
    }

    fn find_by_mint(&self, mint: &Pubkey) -> Option<Token> {
        self.tokens.iter().find(|token| token.mint == *mint).cloned()
    }
}

/// First match across several lookups, in order.
#[derive(Clone, Default)]
pub struct CompoundTokenLookup {
    lookups: Vec<Arc<dyn TokenLookup>>,
}

impl CompoundTokenLookup {
    /// Combine `lookups`, consulted in order.
    pub fn new(lookups: Vec<Arc<dyn TokenLookup>>) -> Self {
        Self { lookups }
    }
}

impl TokenLookup for CompoundTokenLookup {
    fn find_by_symbol(&self, symbol: &str) -> Option<Token> {
        self.lookups
            .iter()
            .find_map(|lookup| lookup.find_by_symbol(symbol))
    }

    fn find_by_mint(&self, mint: &Pubkey) -> Option<Token> {
        self.lookups.iter().find_map(|lookup| lookup.find_by_mint(mint))
    }
}
