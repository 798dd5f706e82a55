//! Instruction builders.
//!
//! Builders validate their inputs against the loaded snapshots and fail
//! before anything reaches the ledger. They return [`CombinableInstructions`]
//! carrying every signer they introduce, except the owner wallet: callers
//! combine with [`CombinableInstructions::from_wallet`] for that.

use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;
use mango_interface::{
    AccountLayout, DepositArgs, MangoAccountLayout, MangoInstruction, OpenOrdersLayout, Side,
    TOKEN_PROGRAM_ID, TokenAccountLayout, TokenInstruction, WithdrawArgs, cache_accounts,
    close_account_accounts, deposit_accounts, init_account_accounts, init_spot_open_orders_accounts,
    initialize_account_accounts, place_spot_order_accounts, transfer_checked_accounts,
    update_root_bank_accounts, withdraw_accounts,
};
use solana_instruction::{AccountMeta, Instruction};
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;

use crate::{
    Account, ClientError, CombinableInstructions, Context, Group, InstrumentValue, NodeBank, Order,
    Result, RootBank, SpotMarket, Token, TokenAccount,
};

fn token_program() -> Pubkey {
    Pubkey::new_from_array(TOKEN_PROGRAM_ID)
}

/// Account must belong to `group` and be owned by `owner`.
fn check_account(owner: &Pubkey, group: &Group, account: &Account) -> Result<()> {
    if account.group != group.address {
        return Err(ClientError::validation(format!(
            "account {} belongs to group {}, not {}",
            account.address, account.group, group.address
        )));
    }
    if account.owner != *owner {
        return Err(ClientError::validation(format!(
            "account {} is owned by {}, not {owner}",
            account.address, account.owner
        )));
    }
    Ok(())
}

/// Root bank must be listed in `group` and hold `node_bank`.
fn check_banks(group: &Group, root_bank: &RootBank, node_bank: &NodeBank) -> Result<()> {
    if !group.tokens().any(|(_, info)| info.root_bank == root_bank.address) {
        return Err(ClientError::validation(format!(
            "root bank {} is not registered in group {}",
            root_bank.address, group.name
        )));
    }
    if node_bank.root_bank != root_bank.address || !root_bank.contains_node_bank(&node_bank.address) {
        return Err(ClientError::validation(format!(
            "node bank {} is not registered under root bank {}",
            node_bank.address, root_bank.address
        )));
    }
    Ok(())
}

/// Checks shared by deposit and withdraw.
fn check_bank_route(
    group: &Group,
    account: &Account,
    root_bank: &RootBank,
    node_bank: &NodeBank,
    token_account: &TokenAccount,
    quantity: &InstrumentValue,
) -> Result<u64> {
    let token = Token::ensure(quantity.instrument())?;
    if token != root_bank.token {
        return Err(ClientError::validation(format!(
            "{token} cannot move through the {} root bank",
            root_bank.token
        )));
    }
    if token_account.token != root_bank.token {
        return Err(ClientError::validation(format!(
            "token account {} holds {}, not {}",
            token_account.address, token_account.token, root_bank.token
        )));
    }
    check_banks(group, root_bank, node_bank)?;
    if account.group != group.address {
        return Err(ClientError::validation(format!(
            "account {} belongs to group {}, not {}",
            account.address, account.group, group.address
        )));
    }
    let native = quantity.to_native_u64()?;
    if native == 0 {
        return Err(ClientError::validation("quantity must be positive"));
    }
    Ok(native)
}

/// Move `quantity` from `source` into `node_bank` and credit `account`.
///
/// The source balance is checked client-side; the ledger remains the final
/// arbiter.
///
/// # Errors
/// Returns [`ClientError::Validation`] if the quantity, source, banks,
/// account and group do not all line up, and
/// [`ClientError::InsufficientFunds`] if `source` holds less than `quantity`.
#[allow(clippy::too_many_arguments)]
pub fn build_deposit_instructions(
    context: &Context,
    owner: &Pubkey,
    group: &Group,
    account: &Account,
    root_bank: &RootBank,
    node_bank: &NodeBank,
    source: &TokenAccount,
    quantity: &InstrumentValue,
) -> Result<CombinableInstructions> {
    let native = check_bank_route(group, account, root_bank, node_bank, source, quantity)?;
    if source.owner != *owner {
        return Err(ClientError::validation(format!(
            "token account {} is owned by {}, not {owner}",
            source.address, source.owner
        )));
    }
    if quantity.compare(&source.value)? == Ordering::Greater {
        return Err(ClientError::InsufficientFunds {
            requested: quantity.to_string(),
            available: source.value.to_string(),
        });
    }

    let mut accounts = vec![AccountMeta::new_readonly(Pubkey::default(), false); deposit_accounts::COUNT];
    accounts[deposit_accounts::GROUP] = AccountMeta::new_readonly(group.address, false);
    accounts[deposit_accounts::MANGO_ACCOUNT] = AccountMeta::new(account.address, false);
    accounts[deposit_accounts::OWNER] = AccountMeta::new_readonly(*owner, true);
    accounts[deposit_accounts::CACHE] = AccountMeta::new_readonly(group.cache, false);
    accounts[deposit_accounts::ROOT_BANK] = AccountMeta::new_readonly(root_bank.address, false);
    accounts[deposit_accounts::NODE_BANK] = AccountMeta::new(node_bank.address, false);
    accounts[deposit_accounts::VAULT] = AccountMeta::new(node_bank.vault, false);
    accounts[deposit_accounts::TOKEN_PROGRAM] = AccountMeta::new_readonly(token_program(), false);
    accounts[deposit_accounts::OWNER_TOKEN_ACCOUNT] = AccountMeta::new(source.address, false);

    debug!("Deposit {quantity} into node bank {}", node_bank.address);
    Ok(CombinableInstructions::from_instruction(Instruction {
        program_id: context.program_id(),
        accounts,
        data: MangoInstruction::Deposit(DepositArgs { quantity: native }).pack(),
    }))
}

/// Move `quantity` out of `node_bank` into `destination`, debiting `account`.
///
/// Without `allow_borrow` the account's interest-accrued deposit is checked
/// client-side.
///
/// # Errors
/// Returns [`ClientError::Validation`] if the quantity, destination, banks,
/// account and group do not all line up or `owner` does not own the account,
/// and [`ClientError::InsufficientFunds`] if borrowing is not allowed and the
/// deposit is smaller than `quantity`.
#[allow(clippy::too_many_arguments)]
pub fn build_withdraw_instructions(
    context: &Context,
    owner: &Pubkey,
    group: &Group,
    account: &Account,
    root_bank: &RootBank,
    node_bank: &NodeBank,
    destination: &TokenAccount,
    quantity: &InstrumentValue,
    allow_borrow: bool,
) -> Result<CombinableInstructions> {
    let native = check_bank_route(group, account, root_bank, node_bank, destination, quantity)?;
    if account.owner != *owner {
        return Err(ClientError::validation(format!(
            "account {} is owned by {}, not {owner}",
            account.address, account.owner
        )));
    }
    if !allow_borrow {
        let token_index = group.token_index_of(quantity.instrument()).ok_or_else(|| {
            ClientError::not_found("token", quantity.instrument().symbol().to_string())
        })?;
        let available = account.deposit_value_at(root_bank, token_index)?;
        if quantity.compare(&available)? == Ordering::Greater {
            return Err(ClientError::InsufficientFunds {
                requested: quantity.to_string(),
                available: available.to_string(),
            });
        }
    }

    let mut accounts = vec![AccountMeta::new_readonly(Pubkey::default(), false); withdraw_accounts::COUNT];
    accounts[withdraw_accounts::GROUP] = AccountMeta::new_readonly(group.address, false);
    accounts[withdraw_accounts::MANGO_ACCOUNT] = AccountMeta::new(account.address, false);
    accounts[withdraw_accounts::OWNER] = AccountMeta::new_readonly(*owner, true);
    accounts[withdraw_accounts::CACHE] = AccountMeta::new_readonly(group.cache, false);
    accounts[withdraw_accounts::ROOT_BANK] = AccountMeta::new_readonly(root_bank.address, false);
    accounts[withdraw_accounts::NODE_BANK] = AccountMeta::new(node_bank.address, false);
    accounts[withdraw_accounts::VAULT] = AccountMeta::new(node_bank.vault, false);
    accounts[withdraw_accounts::TOKEN_ACCOUNT] = AccountMeta::new(destination.address, false);
    accounts[withdraw_accounts::SIGNER_KEY] = AccountMeta::new_readonly(group.signer_key, false);
    accounts[withdraw_accounts::TOKEN_PROGRAM] = AccountMeta::new_readonly(token_program(), false);

    debug!("Withdraw {quantity} from node bank {} (borrow: {allow_borrow})", node_bank.address);
    Ok(CombinableInstructions::from_instruction(Instruction {
        program_id: context.program_id(),
        accounts,
        data: MangoInstruction::Withdraw(WithdrawArgs {
            quantity: native,
            allow_borrow,
        })
        .pack(),
    }))
}

/// Allocate a rent-exempt account at `new_account`'s address and initialize
/// it under `group` for `owner`.
///
/// `new_account` becomes a signer of the returned unit; `owner` funds the
/// allocation and must be supplied through a wallet unit.
///
/// # Errors
/// Returns a ledger error if the rent-exempt minimum cannot be fetched.
pub fn build_create_account_instructions(
    context: &Context,
    owner: &Pubkey,
    group: &Group,
    new_account: Keypair,
) -> Result<CombinableInstructions> {
    let address = new_account.pubkey();
    let space = MangoAccountLayout::SIZE;
    let lamports = context.ledger.minimum_balance_for_rent_exemption(space)?;
    let create = solana_system_interface::instruction::create_account(
        owner,
        &address,
        lamports,
        space as u64,
        &context.program_id(),
    );

    let mut accounts =
        vec![AccountMeta::new_readonly(Pubkey::default(), false); init_account_accounts::COUNT];
    accounts[init_account_accounts::GROUP] = AccountMeta::new_readonly(group.address, false);
    accounts[init_account_accounts::MANGO_ACCOUNT] = AccountMeta::new(address, false);
    accounts[init_account_accounts::OWNER] = AccountMeta::new_readonly(*owner, true);
    let init = Instruction {
        program_id: context.program_id(),
        accounts,
        data: MangoInstruction::InitMangoAccount.pack(),
    };

    debug!("Create account {address} in group {} ({lamports} lamports)", group.name);
    Ok(CombinableInstructions::from_signers(vec![Arc::new(new_account)])
        + CombinableInstructions::from_instructions(vec![create, init]))
}

/// Allocate an open orders account for `market` at `new_open_orders`'s
/// address and link it to the account slot trading the market.
///
/// `new_open_orders` becomes a signer of the returned unit; `owner` funds the
/// allocation.
///
/// # Errors
/// Returns [`ClientError::Validation`] if `owner` does not own the account,
/// the account is in another group, or the slot already has open orders, and
/// a ledger error if the rent-exempt minimum cannot be fetched.
pub fn build_create_open_orders_instructions(
    context: &Context,
    owner: &Pubkey,
    group: &Group,
    account: &Account,
    market: &SpotMarket,
    new_open_orders: Keypair,
) -> Result<CombinableInstructions> {
    check_account(owner, group, account)?;
    if group.slot(market.slot_index)?.spot_market != Some(market.address) {
        return Err(ClientError::validation(format!(
            "market {} is not listed in slot {} of group {}",
            market.address, market.slot_index, group.name
        )));
    }
    let slot = account.slots.get(market.slot_index).ok_or_else(|| {
        ClientError::not_found("account slot", format!("index {}", market.slot_index))
    })?;
    if let Some(existing) = &slot.open_orders {
        return Err(ClientError::validation(format!(
            "account {} already trades {} through open orders {}",
            account.address,
            market.symbol(),
            existing.address
        )));
    }

    let address = new_open_orders.pubkey();
    let space = OpenOrdersLayout::SIZE;
    let lamports = context.ledger.minimum_balance_for_rent_exemption(space)?;
    let create = solana_system_interface::instruction::create_account(
        owner,
        &address,
        lamports,
        space as u64,
        &market.dex_program_id,
    );

    let mut accounts =
        vec![AccountMeta::new_readonly(Pubkey::default(), false); init_spot_open_orders_accounts::COUNT];
    accounts[init_spot_open_orders_accounts::GROUP] = AccountMeta::new_readonly(group.address, false);
    accounts[init_spot_open_orders_accounts::MANGO_ACCOUNT] = AccountMeta::new(account.address, false);
    accounts[init_spot_open_orders_accounts::OWNER] = AccountMeta::new_readonly(*owner, true);
    accounts[init_spot_open_orders_accounts::DEX_PROGRAM] =
        AccountMeta::new_readonly(market.dex_program_id, false);
    accounts[init_spot_open_orders_accounts::OPEN_ORDERS] = AccountMeta::new(address, false);
    accounts[init_spot_open_orders_accounts::SPOT_MARKET] = AccountMeta::new_readonly(market.address, false);
    accounts[init_spot_open_orders_accounts::SIGNER_KEY] = AccountMeta::new_readonly(group.signer_key, false);
    let init = Instruction {
        program_id: context.program_id(),
        accounts,
        data: MangoInstruction::InitSpotOpenOrders.pack(),
    };

    debug!("Create {} open orders {address} for account {}", market.symbol(), account.address);
    Ok(CombinableInstructions::from_signers(vec![Arc::new(new_open_orders)])
        + CombinableInstructions::from_instructions(vec![create, init]))
}

/// Place `order` on `market`, paying from the account's deposit in
/// `root_bank`: the quote bank for bids, the base bank for asks.
///
/// Deposits are not checked client-side, so a deposit and an order can be
/// combined in one unit.
///
/// # Errors
/// Returns [`ClientError::Validation`] if `owner` does not own the account,
/// the banks do not pay for the order's side, or the order cannot be
/// expressed in the market's lots, and [`ClientError::NotFound`] if the
/// account has no open orders for the market.
#[allow(clippy::too_many_arguments)]
pub fn build_place_spot_order_instructions(
    context: &Context,
    owner: &Pubkey,
    group: &Group,
    account: &Account,
    market: &SpotMarket,
    root_bank: &RootBank,
    node_bank: &NodeBank,
    order: &Order,
) -> Result<CombinableInstructions> {
    check_account(owner, group, account)?;
    check_banks(group, root_bank, node_bank)?;
    let open_orders = account
        .slots
        .get(market.slot_index)
        .and_then(|slot| slot.open_orders.as_ref())
        .ok_or_else(|| {
            ClientError::not_found(
                "open orders",
                format!("{} for account {}", market.symbol(), account.address),
            )
        })?;
    let paying = match order.side {
        Side::Bid => &market.quote,
        Side::Ask => &market.base,
    };
    if *paying != root_bank.token {
        return Err(ClientError::validation(format!(
            "{} {} pays in {}, not through the {} root bank",
            market.symbol(),
            order.side,
            paying,
            root_bank.token
        )));
    }
    let args = market.order_args(order)?;

    let mut accounts = vec![AccountMeta::new_readonly(Pubkey::default(), false); place_spot_order_accounts::COUNT];
    accounts[place_spot_order_accounts::GROUP] = AccountMeta::new_readonly(group.address, false);
    accounts[place_spot_order_accounts::MANGO_ACCOUNT] = AccountMeta::new(account.address, false);
    accounts[place_spot_order_accounts::OWNER] = AccountMeta::new_readonly(*owner, true);
    accounts[place_spot_order_accounts::CACHE] = AccountMeta::new_readonly(group.cache, false);
    accounts[place_spot_order_accounts::DEX_PROGRAM] = AccountMeta::new_readonly(market.dex_program_id, false);
    accounts[place_spot_order_accounts::SPOT_MARKET] = AccountMeta::new(market.address, false);
    accounts[place_spot_order_accounts::BIDS] = AccountMeta::new(market.bids, false);
    accounts[place_spot_order_accounts::ASKS] = AccountMeta::new(market.asks, false);
    accounts[place_spot_order_accounts::REQUEST_QUEUE] = AccountMeta::new(market.request_queue, false);
    accounts[place_spot_order_accounts::EVENT_QUEUE] = AccountMeta::new(market.event_queue, false);
    accounts[place_spot_order_accounts::MARKET_BASE_VAULT] = AccountMeta::new(market.base_vault, false);
    accounts[place_spot_order_accounts::MARKET_QUOTE_VAULT] = AccountMeta::new(market.quote_vault, false);
    accounts[place_spot_order_accounts::ROOT_BANK] = AccountMeta::new_readonly(root_bank.address, false);
    accounts[place_spot_order_accounts::NODE_BANK] = AccountMeta::new(node_bank.address, false);
    accounts[place_spot_order_accounts::VAULT] = AccountMeta::new(node_bank.vault, false);
    accounts[place_spot_order_accounts::TOKEN_PROGRAM] = AccountMeta::new_readonly(token_program(), false);
    accounts[place_spot_order_accounts::SIGNER_KEY] = AccountMeta::new_readonly(group.signer_key, false);
    accounts[place_spot_order_accounts::OPEN_ORDERS] = AccountMeta::new(open_orders.address, false);

    debug!("Place {order} on {} for account {}", market.symbol(), account.address);
    Ok(CombinableInstructions::from_instruction(Instruction {
        program_id: context.program_id(),
        accounts,
        data: MangoInstruction::PlaceSpotOrder(args).pack(),
    }))
}

/// Allocate a rent-exempt token account for `token` at `new_account`'s
/// address, owned by `owner`.
///
/// `new_account` becomes a signer of the returned unit; `owner` funds the
/// allocation.
///
/// # Errors
/// Returns a ledger error if the rent-exempt minimum cannot be fetched.
pub fn build_create_spl_account_instructions(
    context: &Context,
    owner: &Pubkey,
    token: &Token,
    new_account: Keypair,
) -> Result<CombinableInstructions> {
    let address = new_account.pubkey();
    let space = TokenAccountLayout::SIZE;
    let lamports = context.ledger.minimum_balance_for_rent_exemption(space)?;
    let create = solana_system_interface::instruction::create_account(
        owner,
        &address,
        lamports,
        space as u64,
        &token_program(),
    );

    let mut accounts =
        vec![AccountMeta::new_readonly(Pubkey::default(), false); initialize_account_accounts::COUNT];
    accounts[initialize_account_accounts::ACCOUNT] = AccountMeta::new(address, false);
    accounts[initialize_account_accounts::MINT] = AccountMeta::new_readonly(token.mint, false);
    let init = Instruction {
        program_id: token_program(),
        accounts,
        data: TokenInstruction::InitializeAccount3 {
            owner: owner.to_bytes(),
        }
        .pack(),
    };

    debug!("Create {} token account {address} for {owner}", token.symbol);
    Ok(CombinableInstructions::from_signers(vec![Arc::new(new_account)])
        + CombinableInstructions::from_instructions(vec![create, init]))
}

/// Move `quantity` between two token accounts of the same token.
///
/// # Errors
/// Returns [`ClientError::Validation`] if the accounts and quantity are not
/// all in one token, `owner` does not own `source`, or the quantity is not
/// positive, and [`ClientError::InsufficientFunds`] if `source` holds less
/// than `quantity`.
pub fn build_transfer_spl_tokens_instructions(
    owner: &Pubkey,
    source: &TokenAccount,
    destination: &TokenAccount,
    quantity: &InstrumentValue,
) -> Result<CombinableInstructions> {
    let token = Token::ensure(quantity.instrument())?;
    for account in [source, destination] {
        if account.token != token {
            return Err(ClientError::validation(format!(
                "token account {} holds {}, not {token}",
                account.address, account.token
            )));
        }
    }
    if source.owner != *owner {
        return Err(ClientError::validation(format!(
            "token account {} is owned by {}, not {owner}",
            source.address, source.owner
        )));
    }
    let amount = quantity.to_native_u64()?;
    if amount == 0 {
        return Err(ClientError::validation("quantity must be positive"));
    }
    if quantity.compare(&source.value)? == Ordering::Greater {
        return Err(ClientError::InsufficientFunds {
            requested: quantity.to_string(),
            available: source.value.to_string(),
        });
    }

    let mut accounts =
        vec![AccountMeta::new_readonly(Pubkey::default(), false); transfer_checked_accounts::COUNT];
    accounts[transfer_checked_accounts::SOURCE] = AccountMeta::new(source.address, false);
    accounts[transfer_checked_accounts::MINT] = AccountMeta::new_readonly(token.mint, false);
    accounts[transfer_checked_accounts::DESTINATION] = AccountMeta::new(destination.address, false);
    accounts[transfer_checked_accounts::AUTHORITY] = AccountMeta::new_readonly(*owner, true);

    debug!("Transfer {quantity} from {} to {}", source.address, destination.address);
    Ok(CombinableInstructions::from_instruction(Instruction {
        program_id: token_program(),
        accounts,
        data: TokenInstruction::TransferChecked {
            amount,
            decimals: token.decimals,
        }
        .pack(),
    }))
}

/// Close `account`, sending its lamports to `destination`.
///
/// The ledger refuses to close an account that still holds tokens.
///
/// # Errors
/// Returns [`ClientError::Validation`] if `owner` does not own `account`.
pub fn build_close_spl_account_instructions(
    owner: &Pubkey,
    account: &TokenAccount,
    destination: &Pubkey,
) -> Result<CombinableInstructions> {
    if account.owner != *owner {
        return Err(ClientError::validation(format!(
            "token account {} is owned by {}, not {owner}",
            account.address, account.owner
        )));
    }

    let mut accounts = vec![AccountMeta::new_readonly(Pubkey::default(), false); close_account_accounts::COUNT];
    accounts[close_account_accounts::ACCOUNT] = AccountMeta::new(account.address, false);
    accounts[close_account_accounts::DESTINATION] = AccountMeta::new(*destination, false);
    accounts[close_account_accounts::AUTHORITY] = AccountMeta::new_readonly(*owner, true);

    debug!("Close token account {} into {destination}", account.address);
    Ok(CombinableInstructions::from_instruction(Instruction {
        program_id: token_program(),
        accounts,
        data: TokenInstruction::CloseAccount.pack(),
    }))
}

/// Accrue interest on `root_bank` across all its node banks.
pub fn build_update_root_bank_instructions(
    context: &Context,
    group: &Group,
    root_bank: &RootBank,
) -> CombinableInstructions {
    let mut accounts = Vec::with_capacity(update_root_bank_accounts::FIRST_NODE_BANK + root_bank.node_banks.len());
    accounts.push(AccountMeta::new_readonly(group.address, false));
    accounts.push(AccountMeta::new(root_bank.address, false));
    accounts.extend(
        root_bank
            .node_banks
            .iter()
            .map(|node_bank| AccountMeta::new_readonly(*node_bank, false)),
    );
    CombinableInstructions::from_instruction(Instruction {
        program_id: context.program_id(),
        accounts,
        data: MangoInstruction::UpdateRootBank.pack(),
    })
}

/// Refresh the cache's oracle prices for every slot with an oracle.
pub fn build_cache_prices_instructions(context: &Context, group: &Group) -> CombinableInstructions {
    let oracles = group.slots.iter().filter_map(|slot| slot.oracle);
    cache_instruction(context, group, oracles, MangoInstruction::CachePrices)
}

/// Refresh the cache's root bank indices for every token in the group.
pub fn build_cache_root_banks_instructions(context: &Context, group: &Group) -> CombinableInstructions {
    let root_banks = group.tokens().map(|(_, info)| info.root_bank);
    cache_instruction(context, group, root_banks, MangoInstruction::CacheRootBanks)
}

fn cache_instruction(
    context: &Context,
    group: &Group,
    sources: impl Iterator<Item = Pubkey>,
    instruction: MangoInstruction,
) -> CombinableInstructions {
    let mut accounts = Vec::with_capacity(cache_accounts::FIRST_SOURCE);
    accounts.push(AccountMeta::new_readonly(group.address, false));
    accounts.push(AccountMeta::new(group.cache, false));
    accounts.extend(sources.map(|source| AccountMeta::new_readonly(source, false)));
    CombinableInstructions::from_instruction(Instruction {
        program_id: context.program_id(),
        accounts,
        data: instruction.pack(),
    })
}
