//! In-memory ledger that executes Mango, token and system instructions.
//!
//! Each submitted transaction runs against a scratch copy of the account
//! map and is committed only if every instruction succeeds. Cache and root
//! bank refreshes stamp the ledger clock; orders lock funds in open orders
//! without matching.

use std::collections::BTreeMap;
use std::sync::Mutex;

use fixed::types::I80F48;
use mango_client::{AccountFilter, Ledger, LedgerError};
use mango_interface::{
    AccountLayout, AccountSlotLayout, CacheLayout, GroupLayout, MangoAccountLayout,
    MangoErrorCode, MangoInstruction, MarketStateLayout, NodeBankLayout, OpenOrdersLayout,
    PlaceSpotOrderArgs, QUOTE_INDEX, RootBankLayout, Side, TOKEN_PROGRAM_ID, TokenAccountLayout,
    TokenInstruction, cache_accounts, close_account_accounts, deposit_accounts,
    init_account_accounts, init_spot_open_orders_accounts, initialize_account_accounts,
    is_zero_address, place_spot_order_accounts, transfer_checked_accounts,
    update_root_bank_accounts, withdraw_accounts,
};
use solana_hash::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::Transaction;

/// Lamports charged per byte for rent exemption.
const RENT_PER_BYTE: u64 = 6_960;

#[derive(Debug, Clone)]
struct StoredAccount {
    owner: Pubkey,
    data: Vec<u8>,
}

type Accounts = BTreeMap<Pubkey, StoredAccount>;

/// Blockhash served until the first rotation.
const GENESIS_BLOCKHASH: [u8; 32] = [7u8; 32];

struct LedgerState {
    accounts: Accounts,
    submissions: usize,
    confirmed: Vec<Signature>,
    fetches: usize,
    rejections: BTreeMap<usize, LedgerError>,
    clock: u64,
    blockhash: Hash,
    rotate_blockhash: bool,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            accounts: Accounts::new(),
            submissions: 0,
            confirmed: Vec::new(),
            fetches: 0,
            rejections: BTreeMap::new(),
            clock: 0,
            blockhash: Hash::new_from_array(GENESIS_BLOCKHASH),
            rotate_blockhash: false,
        }
    }
}

struct Failure {
    code: Option<MangoErrorCode>,
    message: String,
}

impl Failure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    fn code(code: MangoErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Ledger double holding raw account payloads.
pub struct SimulatedLedger {
    program_id: Pubkey,
    state: Mutex<LedgerState>,
}

impl SimulatedLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Store `data` at `address`, owned by `owner`.
    pub fn set_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(address, StoredAccount { owner, data });
    }

    /// Store a Mango-owned layout.
    pub fn set_layout<T: AccountLayout>(&self, address: Pubkey, layout: &T) {
        self.set_account(address, self.program_id, layout.to_account_data());
    }

    /// Store a token account.
    pub fn set_token_account(&self, address: Pubkey, layout: &TokenAccountLayout) {
        self.set_account(
            address,
            Pubkey::new_from_array(mango_interface::TOKEN_PROGRAM_ID),
            bytemuck::bytes_of(layout).to_vec(),
        );
    }

    pub fn remove_account(&self, address: &Pubkey) {
        self.state.lock().unwrap().accounts.remove(address);
    }

    pub fn data(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|account| account.data.clone())
    }

    /// Decode a Mango-owned layout, panicking if absent.
    pub fn layout<T: AccountLayout>(&self, address: &Pubkey) -> T {
        let data = self.data(address).expect("account exists");
        T::from_account_data(&data).expect("layout decodes")
    }

    pub fn token_amount(&self, address: &Pubkey) -> u64 {
        let data = self.data(address).expect("token account exists");
        TokenAccountLayout::from_account_data(&data)
            .expect("token account decodes")
            .amount()
    }

    /// Number of `submit` calls, including rejected ones.
    pub fn submissions(&self) -> usize {
        self.state.lock().unwrap().submissions
    }

    /// Signatures of confirmed transactions, in order.
    pub fn confirmed(&self) -> Vec<Signature> {
        self.state.lock().unwrap().confirmed.clone()
    }

    /// Number of single-account fetches served.
    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    /// Reject the `submission`-th (zero-based) call to `submit` with `error`.
    pub fn reject_submission(&self, submission: usize, error: LedgerError) {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert(submission, error);
    }

    /// Unix time stamped by cache and root bank refreshes.
    pub fn set_clock(&self, now: u64) {
        self.state.lock().unwrap().clock = now;
    }

    /// Move to a new blockhash after every confirmed transaction, expiring
    /// the previous one.
    pub fn rotate_blockhash_per_submission(&self) {
        self.state.lock().unwrap().rotate_blockhash = true;
    }

    /// Whether an account exists at `address`.
    pub fn exists(&self, address: &Pubkey) -> bool {
        self.state.lock().unwrap().accounts.contains_key(address)
    }

    /// Owner program of the account at `address`.
    pub fn owner_of(&self, address: &Pubkey) -> Option<Pubkey> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|account| account.owner)
    }

    fn execute(&self, accounts: &mut Accounts, clock: u64, transaction: &Transaction) -> Result<(), LedgerError> {
        let message = &transaction.message;
        for (index, compiled) in message.instructions.iter().enumerate() {
            let program_id = message.account_keys[usize::from(compiled.program_id_index)];
            let keys: Vec<Pubkey> = compiled
                .accounts
                .iter()
                .map(|&key| message.account_keys[usize::from(key)])
                .collect();
            let signed: Vec<bool> = compiled
                .accounts
                .iter()
                .map(|&key| message.is_signer(usize::from(key)))
                .collect();

            let outcome = if program_id == self.program_id {
                self.execute_mango(accounts, clock, &keys, &signed, &compiled.data)
            } else if program_id == solana_system_interface::program::ID {
                execute_system(accounts, &keys, &signed, &compiled.data)
            } else if program_id.to_bytes() == TOKEN_PROGRAM_ID {
                execute_token(accounts, &keys, &signed, &compiled.data)
            } else {
                Err(Failure::new(format!("unsupported program {program_id}")))
            };
            if let Err(failure) = outcome {
                return Err(LedgerError::Rejected {
                    instruction_index: Some(index),
                    custom_code: failure.code.map(MangoErrorCode::to_u32),
                    message: failure.message,
                });
            }
        }
        Ok(())
    }

    fn execute_mango(
        &self,
        accounts: &mut Accounts,
        clock: u64,
        keys: &[Pubkey],
        signed: &[bool],
        data: &[u8],
    ) -> Result<(), Failure> {
        match MangoInstruction::unpack(data) {
            Some(MangoInstruction::Deposit(args)) => deposit(accounts, keys, signed, args.quantity),
            Some(MangoInstruction::Withdraw(args)) => {
                withdraw(accounts, keys, signed, args.quantity, args.allow_borrow)
            }
            Some(MangoInstruction::InitMangoAccount) => {
                self.init_account(accounts, keys, signed)
            }
            Some(MangoInstruction::InitSpotOpenOrders) => init_spot_open_orders(accounts, keys, signed),
            Some(MangoInstruction::PlaceSpotOrder(args)) => place_spot_order(accounts, keys, signed, &args),
            Some(MangoInstruction::UpdateRootBank) => update_root_bank(accounts, clock, keys),
            Some(MangoInstruction::CachePrices) => cache_prices(accounts, clock, keys),
            Some(MangoInstruction::CacheRootBanks) => cache_root_banks(accounts, clock, keys),
            None => Err(Failure::new("invalid instruction data")),
        }
    }

    fn init_account(
        &self,
        accounts: &mut Accounts,
        keys: &[Pubkey],
        signed: &[bool],
    ) -> Result<(), Failure> {
        if !signed[init_account_accounts::OWNER] {
            return Err(Failure::code(MangoErrorCode::SignerNecessary, "owner must sign"));
        }
        read::<GroupLayout>(accounts, &keys[init_account_accounts::GROUP])?;
        let address = keys[init_account_accounts::MANGO_ACCOUNT];
        let stored = accounts
            .get(&address)
            .ok_or_else(|| Failure::new("account not allocated"))?;
        if stored.owner != self.program_id || stored.data.len() != MangoAccountLayout::SIZE {
            return Err(Failure::new("account not allocated for the program"));
        }
        if stored.data.iter().any(|&byte| byte != 0) {
            return Err(Failure::new("account already initialized"));
        }
        let layout = MangoAccountLayout {
            mango_group: keys[init_account_accounts::GROUP].to_bytes(),
            owner: keys[init_account_accounts::OWNER].to_bytes(),
            ..Default::default()
        };
        write(accounts, &address, &layout);
        Ok(())
    }
}

impl Ledger for SimulatedLedger {
    fn fetch(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;
        Ok(state.accounts.get(address).map(|account| account.data.clone()))
    }

    fn find_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, LedgerError> {
        let state = self.state.lock().unwrap();
        // Reverse address order so callers cannot rely on ledger ordering
        Ok(state
            .accounts
            .iter()
            .rev()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| filters.iter().all(|filter| filter.matches(&account.data)))
            .map(|(address, account)| (*address, account.data.clone()))
            .collect())
    }

    fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LedgerError> {
        Ok((data_len as u64 + 128) * RENT_PER_BYTE)
    }

    fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(self.state.lock().unwrap().blockhash)
    }

    fn submit(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let submission = state.submissions;
        state.submissions += 1;
        if let Some(error) = state.rejections.remove(&submission) {
            return Err(error);
        }
        if !transaction.is_signed() {
            return Err(LedgerError::Rejected {
                instruction_index: None,
                custom_code: None,
                message: "transaction is not fully signed".to_string(),
            });
        }

        if transaction.message.recent_blockhash != state.blockhash {
            return Err(LedgerError::Rejected {
                instruction_index: None,
                custom_code: None,
                message: "blockhash not found".to_string(),
            });
        }

        let mut scratch = state.accounts.clone();
        self.execute(&mut scratch, state.clock, transaction)?;
        state.accounts = scratch;
        let signature = transaction.signatures[0];
        state.confirmed.push(signature);
        if state.rotate_blockhash {
            let serial = state.confirmed.len() as u8;
            state.blockhash = Hash::new_from_array([GENESIS_BLOCKHASH[0].wrapping_add(serial); 32]);
        }
        Ok(signature)
    }
}

fn read<T: AccountLayout>(accounts: &Accounts, address: &Pubkey) -> Result<T, Failure> {
    let account = accounts
        .get(address)
        .ok_or_else(|| Failure::new(format!("missing account {address}")))?;
    T::from_account_data(&account.data)
        .map_err(|err| Failure::new(format!("account {address}: {err}")))
}

fn write<T: AccountLayout>(accounts: &mut Accounts, address: &Pubkey, layout: &T) {
    if let Some(account) = accounts.get_mut(address) {
        account.data = layout.to_account_data();
    }
}

fn read_token(accounts: &Accounts, address: &Pubkey) -> Result<TokenAccountLayout, Failure> {
    let account = accounts
        .get(address)
        .ok_or_else(|| Failure::new(format!("missing token account {address}")))?;
    TokenAccountLayout::from_account_data(&account.data)
        .map_err(|err| Failure::new(format!("token account {address}: {err}")))
}

fn write_token(accounts: &mut Accounts, address: &Pubkey, layout: &TokenAccountLayout) {
    if let Some(account) = accounts.get_mut(address) {
        account.data = bytemuck::bytes_of(layout).to_vec();
    }
}

/// Root bank, node bank and token index for a bank route, validated.
fn route(
    accounts: &Accounts,
    group_key: &Pubkey,
    root_key: &Pubkey,
    node_key: &Pubkey,
    vault_key: &Pubkey,
) -> Result<(GroupLayout, RootBankLayout, NodeBankLayout, usize), Failure> {
    let group = read::<GroupLayout>(accounts, group_key)?;
    let root = read::<RootBankLayout>(accounts, root_key)?;
    let node = read::<NodeBankLayout>(accounts, node_key)?;
    let token_index = group
        .tokens
        .iter()
        .position(|token| !is_zero_address(&token.mint) && token.root_bank == root_key.to_bytes())
        .ok_or_else(|| Failure::code(MangoErrorCode::InvalidRootBank, "root bank not in group"))?;
    if !root.node_bank_addresses().contains(&node_key.to_bytes()) {
        return Err(Failure::code(MangoErrorCode::InvalidNodeBank, "node bank not in root bank"));
    }
    if node.vault != vault_key.to_bytes() {
        return Err(Failure::code(MangoErrorCode::InvalidVault, "vault mismatch"));
    }
    Ok((group, root, node, token_index))
}

fn load_account(
    accounts: &Accounts,
    account_key: &Pubkey,
    group_key: &Pubkey,
    owner_key: &Pubkey,
) -> Result<MangoAccountLayout, Failure> {
    let account = read::<MangoAccountLayout>(accounts, account_key)?;
    if account.mango_group != group_key.to_bytes() {
        return Err(Failure::code(MangoErrorCode::InvalidAccount, "account in another group"));
    }
    if account.owner != owner_key.to_bytes() {
        return Err(Failure::code(MangoErrorCode::InvalidOwner, "owner mismatch"));
    }
    Ok(account)
}

fn deposit(accounts: &mut Accounts, keys: &[Pubkey], signed: &[bool], quantity: u64) -> Result<(), Failure> {
    use deposit_accounts as ix;
    if !signed[ix::OWNER] {
        return Err(Failure::code(MangoErrorCode::SignerNecessary, "owner must sign"));
    }
    let (group, root, mut node, token_index) =
        route(accounts, &keys[ix::GROUP], &keys[ix::ROOT_BANK], &keys[ix::NODE_BANK], &keys[ix::VAULT])?;
    let mut account = load_account(accounts, &keys[ix::MANGO_ACCOUNT], &keys[ix::GROUP], &keys[ix::OWNER])?;
    let mut source = read_token(accounts, &keys[ix::OWNER_TOKEN_ACCOUNT])?;
    let mut vault = read_token(accounts, &keys[ix::VAULT])?;
    if source.owner != keys[ix::OWNER].to_bytes() || source.mint != group.tokens[token_index].mint {
        return Err(Failure::code(MangoErrorCode::InvalidOwner, "source token account mismatch"));
    }
    if source.amount() < quantity {
        return Err(Failure::code(MangoErrorCode::InsufficientFunds, "source balance too low"));
    }

    let raw = I80F48::from_num(quantity) / root.deposit_index();
    node.deposits = (node.deposits() + raw).to_bits();
    account.deposits[token_index] = (fixed(account.deposits[token_index]) + raw).to_bits();
    source.set_amount(source.amount() - quantity);
    vault.set_amount(vault.amount() + quantity);

    write(accounts, &keys[ix::NODE_BANK], &node);
    write(accounts, &keys[ix::MANGO_ACCOUNT], &account);
    write_token(accounts, &keys[ix::OWNER_TOKEN_ACCOUNT], &source);
    write_token(accounts, &keys[ix::VAULT], &vault);
    Ok(())
}

fn withdraw(
    accounts: &mut Accounts,
    keys: &[Pubkey],
    signed: &[bool],
    quantity: u64,
    allow_borrow: bool,
) -> Result<(), Failure> {
    use withdraw_accounts as ix;
    if !signed[ix::OWNER] {
        return Err(Failure::code(MangoErrorCode::SignerNecessary, "owner must sign"));
    }
    let (group, root, mut node, token_index) =
        route(accounts, &keys[ix::GROUP], &keys[ix::ROOT_BANK], &keys[ix::NODE_BANK], &keys[ix::VAULT])?;
    let mut account = load_account(accounts, &keys[ix::MANGO_ACCOUNT], &keys[ix::GROUP], &keys[ix::OWNER])?;
    let mut destination = read_token(accounts, &keys[ix::TOKEN_ACCOUNT])?;
    let mut vault = read_token(accounts, &keys[ix::VAULT])?;
    if destination.mint != group.tokens[token_index].mint {
        return Err(Failure::code(MangoErrorCode::InvalidToken, "destination mint mismatch"));
    }
    if vault.amount() < quantity {
        return Err(Failure::code(MangoErrorCode::InsufficientLiquidity, "vault too small"));
    }

    let wanted = I80F48::from_num(quantity);
    let deposit_raw = fixed(account.deposits[token_index]);
    let deposited = deposit_raw * root.deposit_index();
    if wanted <= deposited {
        let raw = wanted / root.deposit_index();
        account.deposits[token_index] = (deposit_raw - raw).to_bits();
        node.deposits = (node.deposits() - raw).to_bits();
    } else if allow_borrow {
        let borrow_raw = (wanted - deposited) / root.borrow_index();
        account.deposits[token_index] = 0;
        account.borrows[token_index] = (fixed(account.borrows[token_index]) + borrow_raw).to_bits();
        node.deposits = (node.deposits() - deposit_raw).to_bits();
        node.borrows = (node.borrows() + borrow_raw).to_bits();
    } else {
        return Err(Failure::code(MangoErrorCode::InsufficientFunds, "deposit too small"));
    }
    destination.set_amount(destination.amount() + quantity);
    vault.set_amount(vault.amount() - quantity);

    write(accounts, &keys[ix::NODE_BANK], &node);
    write(accounts, &keys[ix::MANGO_ACCOUNT], &account);
    write_token(accounts, &keys[ix::TOKEN_ACCOUNT], &destination);
    write_token(accounts, &keys[ix::VAULT], &vault);
    Ok(())
}

/// Group slot listing `market`.
fn market_slot(group: &GroupLayout, market: &Pubkey) -> Result<usize, Failure> {
    group
        .spot_markets
        .iter()
        .position(|listed| *listed == market.to_bytes())
        .ok_or_else(|| Failure::code(MangoErrorCode::InvalidMarket, "market not in group"))
}

fn read_market(accounts: &Accounts, address: &Pubkey) -> Result<MarketStateLayout, Failure> {
    let account = accounts
        .get(address)
        .ok_or_else(|| Failure::new(format!("missing market {address}")))?;
    MarketStateLayout::from_account_data(&account.data)
        .map_err(|err| Failure::code(MangoErrorCode::InvalidMarket, format!("market {address}: {err}")))
}

fn init_spot_open_orders(accounts: &mut Accounts, keys: &[Pubkey], signed: &[bool]) -> Result<(), Failure> {
    use init_spot_open_orders_accounts as ix;
    if !signed[ix::OWNER] {
        return Err(Failure::code(MangoErrorCode::SignerNecessary, "owner must sign"));
    }
    let group = read::<GroupLayout>(accounts, &keys[ix::GROUP])?;
    let mut account = load_account(accounts, &keys[ix::MANGO_ACCOUNT], &keys[ix::GROUP], &keys[ix::OWNER])?;
    if group.dex_program_id != keys[ix::DEX_PROGRAM].to_bytes() {
        return Err(Failure::code(MangoErrorCode::InvalidProgramId, "dex program mismatch"));
    }
    let slot_index = market_slot(&group, &keys[ix::SPOT_MARKET])?;
    let market = read_market(accounts, &keys[ix::SPOT_MARKET])?;
    if !is_zero_address(&account.slots[slot_index].open_orders) {
        return Err(Failure::code(MangoErrorCode::InvalidAccountState, "slot already has open orders"));
    }

    let address = keys[ix::OPEN_ORDERS];
    let stored = accounts
        .get(&address)
        .ok_or_else(|| Failure::new("open orders not allocated"))?;
    if stored.owner.to_bytes() != group.dex_program_id || stored.data.len() != OpenOrdersLayout::SIZE {
        return Err(Failure::new("open orders not allocated for the dex"));
    }
    if stored.data.iter().any(|&byte| byte != 0) {
        return Err(Failure::new("open orders already initialized"));
    }

    let open_orders = OpenOrdersLayout {
        mango_account: keys[ix::MANGO_ACCOUNT].to_bytes(),
        market: keys[ix::SPOT_MARKET].to_bytes(),
        owner: keys[ix::MANGO_ACCOUNT].to_bytes(),
        base_mint: market.base_mint,
        quote_mint: market.quote_mint,
        ..Default::default()
    };
    account.slots[slot_index] = AccountSlotLayout {
        open_orders: address.to_bytes(),
        base_root_bank: group.tokens[slot_index].root_bank,
        quote_root_bank: group.tokens[QUOTE_INDEX].root_bank,
    };
    if account.in_margin_basket[slot_index] == 0 {
        account.in_margin_basket[slot_index] = 1;
        account.num_in_margin_basket += 1;
    }
    write(accounts, &address, &open_orders);
    write(accounts, &keys[ix::MANGO_ACCOUNT], &account);
    Ok(())
}

/// Locks the order's funds in open orders; nothing is matched.
fn place_spot_order(
    accounts: &mut Accounts,
    keys: &[Pubkey],
    signed: &[bool],
    args: &PlaceSpotOrderArgs,
) -> Result<(), Failure> {
    use place_spot_order_accounts as ix;
    if !signed[ix::OWNER] {
        return Err(Failure::code(MangoErrorCode::SignerNecessary, "owner must sign"));
    }
    let (group, root, mut node, token_index) =
        route(accounts, &keys[ix::GROUP], &keys[ix::ROOT_BANK], &keys[ix::NODE_BANK], &keys[ix::VAULT])?;
    let mut account = load_account(accounts, &keys[ix::MANGO_ACCOUNT], &keys[ix::GROUP], &keys[ix::OWNER])?;
    let slot_index = market_slot(&group, &keys[ix::SPOT_MARKET])?;
    let market = read_market(accounts, &keys[ix::SPOT_MARKET])?;
    if account.slots[slot_index].open_orders != keys[ix::OPEN_ORDERS].to_bytes() {
        return Err(Failure::code(MangoErrorCode::InvalidAccount, "open orders not linked to account"));
    }
    let mut open_orders = read::<OpenOrdersLayout>(accounts, &keys[ix::OPEN_ORDERS])?;

    let side = args
        .side()
        .ok_or_else(|| Failure::code(MangoErrorCode::InvalidParam, "unknown side"))?;
    let (paying_index, market_vault_key, amount) = match side {
        Side::Bid => (QUOTE_INDEX, market.quote_vault, args.max_native_pc_qty_including_fees),
        Side::Ask => (
            slot_index,
            market.base_vault,
            args.max_coin_qty
                .checked_mul(market.base_lot_size())
                .ok_or_else(|| Failure::code(MangoErrorCode::MathError, "order size overflows"))?,
        ),
    };
    if token_index != paying_index {
        return Err(Failure::code(MangoErrorCode::InvalidRootBank, "bank does not pay for this side"));
    }
    let market_vault_key = Pubkey::new_from_array(market_vault_key);
    let vault_index = match side {
        Side::Bid => ix::MARKET_QUOTE_VAULT,
        Side::Ask => ix::MARKET_BASE_VAULT,
    };
    if keys[vault_index] != market_vault_key {
        return Err(Failure::code(MangoErrorCode::InvalidVault, "market vault mismatch"));
    }

    let wanted = I80F48::from_num(amount);
    let deposit_raw = fixed(account.deposits[token_index]);
    if wanted > deposit_raw * root.deposit_index() {
        return Err(Failure::code(MangoErrorCode::InsufficientFunds, "deposit too small for order"));
    }
    let mut vault = read_token(accounts, &keys[ix::VAULT])?;
    let mut market_vault = read_token(accounts, &market_vault_key)?;
    if vault.amount() < amount {
        return Err(Failure::code(MangoErrorCode::InsufficientLiquidity, "vault too small"));
    }

    let raw = wanted / root.deposit_index();
    account.deposits[token_index] = (deposit_raw - raw).to_bits();
    node.deposits = (node.deposits() - raw).to_bits();
    vault.set_amount(vault.amount() - amount);
    market_vault.set_amount(market_vault.amount() + amount);
    match side {
        Side::Bid => open_orders.quote_token_total += amount,
        Side::Ask => open_orders.base_token_total += amount,
    }

    write(accounts, &keys[ix::NODE_BANK], &node);
    write(accounts, &keys[ix::MANGO_ACCOUNT], &account);
    write(accounts, &keys[ix::OPEN_ORDERS], &open_orders);
    write_token(accounts, &keys[ix::VAULT], &vault);
    write_token(accounts, &market_vault_key, &market_vault);
    Ok(())
}

fn update_root_bank(accounts: &mut Accounts, clock: u64, keys: &[Pubkey]) -> Result<(), Failure> {
    use update_root_bank_accounts as ix;
    read::<GroupLayout>(accounts, &keys[ix::GROUP])?;
    let mut root = read::<RootBankLayout>(accounts, &keys[ix::ROOT_BANK])?;
    let listed = &keys[ix::FIRST_NODE_BANK..];
    if listed.iter().map(|key| key.to_bytes()).ne(root.node_bank_addresses().iter().copied()) {
        return Err(Failure::code(MangoErrorCode::InvalidNodeBank, "node banks do not match"));
    }
    root.last_updated = clock;
    write(accounts, &keys[ix::ROOT_BANK], &root);
    Ok(())
}

fn cache_prices(accounts: &mut Accounts, clock: u64, keys: &[Pubkey]) -> Result<(), Failure> {
    let (group, mut cache) = load_cache(accounts, keys)?;
    for oracle in &keys[cache_accounts::FIRST_SOURCE..] {
        let slot_index = group
            .oracles
            .iter()
            .position(|listed| *listed == oracle.to_bytes())
            .ok_or_else(|| Failure::code(MangoErrorCode::InvalidParam, "oracle not in group"))?;
        cache.price_cache[slot_index].last_update = clock;
    }
    write(accounts, &keys[cache_accounts::CACHE], &cache);
    Ok(())
}

fn cache_root_banks(accounts: &mut Accounts, clock: u64, keys: &[Pubkey]) -> Result<(), Failure> {
    let (group, mut cache) = load_cache(accounts, keys)?;
    for root_key in &keys[cache_accounts::FIRST_SOURCE..] {
        let token_index = group
            .tokens
            .iter()
            .position(|token| !is_zero_address(&token.mint) && token.root_bank == root_key.to_bytes())
            .ok_or_else(|| Failure::code(MangoErrorCode::InvalidRootBank, "root bank not in group"))?;
        let root = read::<RootBankLayout>(accounts, root_key)?;
        let entry = &mut cache.root_bank_cache[token_index];
        entry.deposit_index = root.deposit_index;
        entry.borrow_index = root.borrow_index;
        entry.last_update = clock;
    }
    write(accounts, &keys[cache_accounts::CACHE], &cache);
    Ok(())
}

fn load_cache(accounts: &Accounts, keys: &[Pubkey]) -> Result<(GroupLayout, CacheLayout), Failure> {
    let group = read::<GroupLayout>(accounts, &keys[cache_accounts::GROUP])?;
    if group.mango_cache != keys[cache_accounts::CACHE].to_bytes() {
        return Err(Failure::code(MangoErrorCode::InvalidCache, "cache mismatch"));
    }
    let cache = read::<CacheLayout>(accounts, &keys[cache_accounts::CACHE])?;
    Ok((group, cache))
}

/// Handles `InitializeAccount3`, `TransferChecked` and `CloseAccount`.
fn execute_token(accounts: &mut Accounts, keys: &[Pubkey], signed: &[bool], data: &[u8]) -> Result<(), Failure> {
    match TokenInstruction::unpack(data) {
        Some(TokenInstruction::InitializeAccount3 { owner }) => {
            use initialize_account_accounts as ix;
            let address = keys[ix::ACCOUNT];
            let stored = accounts
                .get(&address)
                .ok_or_else(|| Failure::new("token account not allocated"))?;
            if stored.owner.to_bytes() != TOKEN_PROGRAM_ID || stored.data.len() != TokenAccountLayout::SIZE {
                return Err(Failure::new("token account not allocated for the token program"));
            }
            if stored.data.iter().any(|&byte| byte != 0) {
                return Err(Failure::new("token account already initialized"));
            }
            let layout = TokenAccountLayout::new(keys[ix::MINT].to_bytes(), owner, 0);
            write_token(accounts, &address, &layout);
            Ok(())
        }
        Some(TokenInstruction::TransferChecked { amount, .. }) => {
            use transfer_checked_accounts as ix;
            let mut source = read_token(accounts, &keys[ix::SOURCE])?;
            let destination = read_token(accounts, &keys[ix::DESTINATION])?;
            if !signed[ix::AUTHORITY] || source.owner != keys[ix::AUTHORITY].to_bytes() {
                return Err(Failure::new("owner must sign"));
            }
            let mint = keys[ix::MINT].to_bytes();
            if source.mint != mint || destination.mint != mint {
                return Err(Failure::new("mint mismatch"));
            }
            if source.amount() < amount {
                return Err(Failure::new("insufficient funds"));
            }
            source.set_amount(source.amount() - amount);
            write_token(accounts, &keys[ix::SOURCE], &source);
            // Re-read so a self-transfer nets to zero
            let mut destination = read_token(accounts, &keys[ix::DESTINATION])?;
            destination.set_amount(destination.amount() + amount);
            write_token(accounts, &keys[ix::DESTINATION], &destination);
            Ok(())
        }
        Some(TokenInstruction::CloseAccount) => {
            use close_account_accounts as ix;
            let account = read_token(accounts, &keys[ix::ACCOUNT])?;
            if !signed[ix::AUTHORITY] || account.owner != keys[ix::AUTHORITY].to_bytes() {
                return Err(Failure::new("owner must sign"));
            }
            if account.amount() != 0 {
                return Err(Failure::new("non-native account has balance"));
            }
            accounts.remove(&keys[ix::ACCOUNT]);
            Ok(())
        }
        None => Err(Failure::new("unsupported token instruction")),
    }
}

/// Handles system `CreateAccount` (tag 0): lamports, space, owner.
fn execute_system(accounts: &mut Accounts, keys: &[Pubkey], signed: &[bool], data: &[u8]) -> Result<(), Failure> {
    let tag = data.get(..4).map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
    if tag != Some(0) || data.len() < 52 || keys.len() < 2 {
        return Err(Failure::new("unsupported system instruction"));
    }
    if !signed[0] || !signed[1] {
        return Err(Failure::new("funder and new account must sign"));
    }
    let mut space = [0u8; 8];
    space.copy_from_slice(&data[12..20]);
    let mut owner = [0u8; 32];
    owner.copy_from_slice(&data[20..52]);
    if accounts.contains_key(&keys[1]) {
        return Err(Failure::new("account already in use"));
    }
    accounts.insert(
        keys[1],
        StoredAccount {
            owner: Pubkey::new_from_array(owner),
            data: vec![0u8; u64::from_le_bytes(space) as usize],
        },
    );
    Ok(())
}

fn fixed(bits: i128) -> I80F48 {
    I80F48::from_bits(bits)
}
