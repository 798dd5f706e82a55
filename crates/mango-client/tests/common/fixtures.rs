//! Layout builders and a ready-made group on a simulated ledger.
//!
//! The group lists BTC in slot 0 and USDC as quote, with a BTC/USDC spot
//! market (base lot 100, quote lot 10). BTC has one node bank holding
//! 100 BTC; the wallet owns an empty Mango account plus token accounts
//! holding 1,000 BTC and 5,000 USDC. The ledger clock starts at `NOW`.

use std::sync::Arc;

use fixed::types::I80F48;
use mango_client::{
    Account, ClientConfig, Context, Group, SpotMarket, StaticTokenLookup, Token, TokenAccount,
    Wallet,
};
use mango_interface::{
    CacheLayout, GroupLayout, MangoAccountLayout, MarketStateLayout, NodeBankLayout, QUOTE_INDEX,
    RootBankLayout, TokenAccountLayout, TokenInfoLayout,
};
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;

use super::SimulatedLedger;

pub const PROGRAM_ID: Pubkey = Pubkey::new_from_array([100u8; 32]);
pub const GROUP: Pubkey = Pubkey::new_from_array([1u8; 32]);
pub const CACHE: Pubkey = Pubkey::new_from_array([2u8; 32]);
pub const SIGNER_KEY: Pubkey = Pubkey::new_from_array([3u8; 32]);

pub const BTC_MINT: Pubkey = Pubkey::new_from_array([10u8; 32]);
pub const USDC_MINT: Pubkey = Pubkey::new_from_array([11u8; 32]);
pub const ETH_MINT: Pubkey = Pubkey::new_from_array([12u8; 32]);

pub const BTC_ROOT: Pubkey = Pubkey::new_from_array([20u8; 32]);
pub const BTC_NODE: Pubkey = Pubkey::new_from_array([21u8; 32]);
pub const BTC_VAULT: Pubkey = Pubkey::new_from_array([22u8; 32]);
pub const BTC_NODE_2: Pubkey = Pubkey::new_from_array([23u8; 32]);
pub const BTC_VAULT_2: Pubkey = Pubkey::new_from_array([24u8; 32]);
pub const BTC_ORACLE: Pubkey = Pubkey::new_from_array([25u8; 32]);

pub const USDC_ROOT: Pubkey = Pubkey::new_from_array([30u8; 32]);
pub const USDC_NODE: Pubkey = Pubkey::new_from_array([31u8; 32]);
pub const USDC_VAULT: Pubkey = Pubkey::new_from_array([32u8; 32]);

pub const DEX_PROGRAM: Pubkey = Pubkey::new_from_array([101u8; 32]);
pub const BTC_MARKET: Pubkey = Pubkey::new_from_array([60u8; 32]);
pub const MARKET_BASE_VAULT: Pubkey = Pubkey::new_from_array([61u8; 32]);
pub const MARKET_QUOTE_VAULT: Pubkey = Pubkey::new_from_array([62u8; 32]);
pub const REQUEST_QUEUE: Pubkey = Pubkey::new_from_array([63u8; 32]);
pub const EVENT_QUEUE: Pubkey = Pubkey::new_from_array([64u8; 32]);
pub const BIDS: Pubkey = Pubkey::new_from_array([65u8; 32]);
pub const ASKS: Pubkey = Pubkey::new_from_array([66u8; 32]);

pub const ACCOUNT: Pubkey = Pubkey::new_from_array([40u8; 32]);
pub const WALLET_BTC: Pubkey = Pubkey::new_from_array([41u8; 32]);
pub const WALLET_USDC: Pubkey = Pubkey::new_from_array([42u8; 32]);

/// Cache update time used by every fixture.
pub const NOW: u64 = 1_700_000_000;

/// Native units per whole token for the fixture tokens.
pub const UNIT: u64 = 1_000_000;

pub fn btc() -> Token {
    Token::new("BTC", "Wrapped Bitcoin", BTC_MINT, 6)
}

pub fn usdc() -> Token {
    Token::new("USDC", "USD Coin", USDC_MINT, 6)
}

pub fn eth() -> Token {
    Token::new("ETH", "Wrapped Ether", ETH_MINT, 6)
}

pub fn token_lookup() -> StaticTokenLookup {
    StaticTokenLookup::new(vec![btc(), usdc(), eth()])
}

pub fn group_layout() -> GroupLayout {
    let mut layout = GroupLayout {
        num_oracles: 1,
        signer_key: SIGNER_KEY.to_bytes(),
        dex_program_id: DEX_PROGRAM.to_bytes(),
        mango_cache: CACHE.to_bytes(),
        valid_interval: 10,
        ..Default::default()
    };
    layout.tokens[0] = TokenInfoLayout {
        mint: BTC_MINT.to_bytes(),
        root_bank: BTC_ROOT.to_bytes(),
        decimals: 6,
        ..Default::default()
    };
    layout.tokens[QUOTE_INDEX] = TokenInfoLayout {
        mint: USDC_MINT.to_bytes(),
        root_bank: USDC_ROOT.to_bytes(),
        decimals: 6,
        ..Default::default()
    };
    layout.oracles[0] = BTC_ORACLE.to_bytes();
    layout.spot_markets[0] = BTC_MARKET.to_bytes();
    layout
}

pub fn market_layout() -> MarketStateLayout {
    let mut layout = MarketStateLayout::new(
        BTC_MARKET.to_bytes(),
        BTC_MINT.to_bytes(),
        USDC_MINT.to_bytes(),
        MARKET_BASE_VAULT.to_bytes(),
        MARKET_QUOTE_VAULT.to_bytes(),
        100,
        10,
    );
    layout.request_queue = REQUEST_QUEUE.to_bytes();
    layout.event_queue = EVENT_QUEUE.to_bytes();
    layout.bids = BIDS.to_bytes();
    layout.asks = ASKS.to_bytes();
    layout
}

pub fn root_bank_layout(node_banks: &[Pubkey], deposit_index: I80F48) -> RootBankLayout {
    let mut layout = RootBankLayout {
        num_node_banks: node_banks.len() as u64,
        optimal_util: I80F48::from_num(0.7).to_bits(),
        optimal_rate: I80F48::from_num(0.06).to_bits(),
        max_rate: I80F48::from_num(1.5).to_bits(),
        deposit_index: deposit_index.to_bits(),
        last_updated: NOW,
        ..Default::default()
    };
    for (slot, address) in layout.node_banks.iter_mut().zip(node_banks) {
        *slot = address.to_bytes();
    }
    layout
}

pub fn node_bank_layout(vault: Pubkey, raw_deposits: I80F48) -> NodeBankLayout {
    NodeBankLayout {
        deposits: raw_deposits.to_bits(),
        vault: vault.to_bytes(),
        ..Default::default()
    }
}

pub fn account_layout(owner: &Pubkey) -> MangoAccountLayout {
    MangoAccountLayout {
        mango_group: GROUP.to_bytes(),
        owner: owner.to_bytes(),
        ..Default::default()
    }
}

pub fn cache_layout(updated_at: u64) -> CacheLayout {
    let mut layout = CacheLayout::default();
    layout.price_cache[0].price = I80F48::from_num(60_000).to_bits();
    layout.price_cache[0].last_update = updated_at;
    for entry in layout.root_bank_cache.iter_mut() {
        entry.deposit_index = I80F48::ONE.to_bits();
        entry.borrow_index = I80F48::ONE.to_bits();
        entry.last_update = updated_at;
    }
    layout
}

/// Whole tokens as raw node bank units at index 1.
pub fn raw(whole: u64) -> I80F48 {
    I80F48::from_num(whole * UNIT)
}

/// A group, its banks and a funded wallet on a simulated ledger.
pub struct World {
    pub ledger: Arc<SimulatedLedger>,
    pub context: Context,
    pub wallet: Wallet,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    pub fn config() -> ClientConfig {
        ClientConfig {
            group_name: "test.1".to_string(),
            group: GROUP,
            program_id: PROGRAM_ID,
            ..Default::default()
        }
    }

    pub fn with_config(config: ClientConfig) -> Self {
        super::init_logging();
        let ledger = Arc::new(SimulatedLedger::new(PROGRAM_ID));
        let wallet = Wallet::new(Keypair::new());
        let owner = wallet.address();

        ledger.set_clock(NOW);
        ledger.set_layout(GROUP, &group_layout());
        ledger.set_layout(CACHE, &cache_layout(NOW));

        ledger.set_account(BTC_MARKET, DEX_PROGRAM, market_layout().to_account_data());
        ledger.set_token_account(
            MARKET_BASE_VAULT,
            &TokenAccountLayout::new(BTC_MINT.to_bytes(), SIGNER_KEY.to_bytes(), 0),
        );
        ledger.set_token_account(
            MARKET_QUOTE_VAULT,
            &TokenAccountLayout::new(USDC_MINT.to_bytes(), SIGNER_KEY.to_bytes(), 0),
        );

        ledger.set_layout(BTC_ROOT, &root_bank_layout(&[BTC_NODE], I80F48::ONE));
        ledger.set_layout(BTC_NODE, &node_bank_layout(BTC_VAULT, raw(100)));
        ledger.set_token_account(
            BTC_VAULT,
            &TokenAccountLayout::new(BTC_MINT.to_bytes(), SIGNER_KEY.to_bytes(), 100 * UNIT),
        );

        ledger.set_layout(USDC_ROOT, &root_bank_layout(&[USDC_NODE], I80F48::ONE));
        ledger.set_layout(USDC_NODE, &node_bank_layout(USDC_VAULT, I80F48::ZERO));
        ledger.set_token_account(
            USDC_VAULT,
            &TokenAccountLayout::new(USDC_MINT.to_bytes(), SIGNER_KEY.to_bytes(), 0),
        );

        ledger.set_layout(ACCOUNT, &account_layout(&owner));
        ledger.set_token_account(
            WALLET_BTC,
            &TokenAccountLayout::new(BTC_MINT.to_bytes(), owner.to_bytes(), 1_000 * UNIT),
        );
        ledger.set_token_account(
            WALLET_USDC,
            &TokenAccountLayout::new(USDC_MINT.to_bytes(), owner.to_bytes(), 5_000 * UNIT),
        );

        let context = Context::new(config, ledger.clone(), Arc::new(token_lookup()));
        Self {
            ledger,
            context,
            wallet,
        }
    }

    pub fn owner(&self) -> Pubkey {
        self.wallet.address()
    }

    pub fn group(&self) -> Group {
        Group::load(&self.context).expect("group loads")
    }

    pub fn account(&self, group: &Group) -> Account {
        Account::load(&self.context, &ACCOUNT, group).expect("account loads")
    }

    pub fn wallet_btc(&self) -> TokenAccount {
        TokenAccount::load(&self.context, &WALLET_BTC, btc()).expect("token account loads")
    }

    pub fn wallet_usdc(&self) -> TokenAccount {
        TokenAccount::load(&self.context, &WALLET_USDC, usdc()).expect("token account loads")
    }

    pub fn btc_market(&self, group: &Group) -> SpotMarket {
        SpotMarket::load(&self.context, group, 0).expect("market loads")
    }

    /// Add a second BTC node bank holding `raw_deposits`.
    pub fn add_btc_node_bank(&self, raw_deposits: I80F48, deposit_index: I80F48) {
        self.ledger.set_layout(
            BTC_ROOT,
            &root_bank_layout(&[BTC_NODE, BTC_NODE_2], deposit_index),
        );
        self.ledger
            .set_layout(BTC_NODE_2, &node_bank_layout(BTC_VAULT_2, raw_deposits));
        self.ledger.set_token_account(
            BTC_VAULT_2,
            &TokenAccountLayout::new(BTC_MINT.to_bytes(), SIGNER_KEY.to_bytes(), 0),
        );
    }

    /// Store another account for `owner` at `address`.
    pub fn add_account(&self, address: Pubkey, owner: &Pubkey) {
        self.ledger.set_layout(address, &account_layout(owner));
    }

    /// A keypair-backed wallet other than the fixture's.
    pub fn stranger() -> Pubkey {
        Keypair::new().pubkey()
    }
}
