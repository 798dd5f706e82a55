//! Account scout.
//!
//! Inspects an account against its group (and optionally the group's cache)
//! before anything risky is done with it. Every check runs on every pass, so
//! one call yields the complete list of findings. Findings are data: the
//! scout never fails.
//!
//! | Check                | Finding                                  | Severity    |
//! |----------------------|------------------------------------------|-------------|
//! | group membership     | account belongs to another group         | problem     |
//! | structural alignment | slot bank refs differ from group slot    | problem     |
//! | open orders          | missing, undecodable, wrong mints/owner  | problem     |
//! | bank references      | open orders without base or quote bank   | problem     |
//! | cache staleness      | price or index older than policy         | warning     |
//! | liquidation state    | bankrupt / being liquidated              | problem / warning |
//! | funding              | no balances anywhere                     | information |

use mango_interface::QUOTE_INDEX;

use crate::{Account, Cache, Group, OpenOrdersState, StalenessPolicy};

/// How urgent a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Severity {
    /// Must be fixed before trading
    Problem,
    /// Should be reviewed
    Warning,
    /// Informational
    Information,
}

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FindingKind {
    /// Account is registered under a different group
    GroupMismatch,
    /// Account slot references differ from the group slot at the same index
    SlotMisaligned,
    /// Open orders account could not be loaded or was never loaded
    OpenOrdersUnavailable,
    /// Open orders mints differ from the group slot's tokens
    OpenOrdersMintMismatch,
    /// Open orders account belongs to another account
    OpenOrdersOwnerMismatch,
    /// Slot with open orders lacks a base or quote bank reference
    MissingBankReference,
    /// No cache was supplied, so staleness was not checked
    NoCache,
    /// Cached price is older than policy allows
    StalePrice,
    /// Cached root bank index is older than policy allows
    StaleRootBankIndex,
    /// Account is being liquidated
    BeingLiquidated,
    /// Account is bankrupt
    Bankrupt,
    /// Account holds nothing
    Unfunded,
}

/// One scout finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// What the finding is about
    pub kind: FindingKind,
    /// Slot index, for slot-level findings
    pub slot: Option<usize>,
    /// Instrument symbol involved, if any
    pub instrument: Option<String>,
    /// What was observed
    pub observed: String,
    /// What was expected
    pub expected: String,
    /// Human-readable summary
    pub message: String,
}

impl Finding {
    fn new(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            slot: None,
            instrument: None,
            observed: String::new(),
            expected: String::new(),
            message: message.into(),
        }
    }

    fn at_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    fn for_instrument(mut self, symbol: &str) -> Self {
        self.instrument = Some(symbol.to_string());
        self
    }

    fn observed(mut self, observed: impl ToString, expected: impl ToString) -> Self {
        self.observed = observed.to_string();
        self.expected = expected.to_string();
        self
    }
}

/// Scout output: findings grouped by severity, each group in slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoutReport {
    /// Must be fixed before trading
    pub problems: Vec<Finding>,
    /// Should be reviewed
    pub warnings: Vec<Finding>,
    /// Informational
    pub information: Vec<Finding>,
}

impl ScoutReport {
    /// True if any problem was found.
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// True if any warning was found.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// True if there are neither problems nor warnings.
    pub fn is_clean(&self) -> bool {
        !self.has_problems() && !self.has_warnings()
    }

    /// Findings of one severity.
    pub fn findings(&self, severity: Severity) -> &[Finding] {
        match severity {
            Severity::Problem => &self.problems,
            Severity::Warning => &self.warnings,
            Severity::Information => &self.information,
        }
    }

    /// Every finding with its severity, problems first.
    pub fn iter(&self) -> impl Iterator<Item = (Severity, &Finding)> {
        [Severity::Problem, Severity::Warning, Severity::Information]
            .into_iter()
            .flat_map(move |severity| {
                self.findings(severity)
                    .iter()
                    .map(move |finding| (severity, finding))
            })
    }

    fn push(&mut self, severity: Severity, finding: Finding) {
        match severity {
            Severity::Problem => self.problems.push(finding),
            Severity::Warning => self.warnings.push(finding),
            Severity::Information => self.information.push(finding),
        }
    }

    fn sort_by_slot(&mut self) {
        // Account-level findings first, then slots ascending; stable within a slot.
        let key = |finding: &Finding| finding.slot.map_or(0, |slot| slot + 1);
        self.problems.sort_by_key(key);
        self.warnings.sort_by_key(key);
        self.information.sort_by_key(key);
    }
}

struct Inspection<'a> {
    group: &'a Group,
    account: &'a Account,
    cache: Option<&'a Cache>,
    now: u64,
    policy: &'a StalenessPolicy,
}

type Check = fn(&Inspection<'_>, &mut ScoutReport);

const CHECKS: &[Check] = &[
    check_group_membership,
    check_structural_alignment,
    check_open_orders,
    check_bank_references,
    check_cache_staleness,
    check_liquidation_state,
    check_funding,
];

/// Rule engine producing a [`ScoutReport`] for an account.
#[derive(Debug, Clone, Default)]
pub struct AccountScout {
    policy: StalenessPolicy,
}

impl AccountScout {
    /// Scout judging cache staleness by `policy`.
    pub fn new(policy: StalenessPolicy) -> Self {
        Self { policy }
    }

    /// Inspect `account` against `group`.
    ///
    /// `cache` enables the staleness check; `now` is the Unix time staleness
    /// is judged at. Identical inputs always produce an identical report.
    pub fn verify(
        &self,
        group: &Group,
        account: &Account,
        cache: Option<&Cache>,
        now: u64,
    ) -> ScoutReport {
        let inspection = Inspection {
            group,
            account,
            cache,
            now,
            policy: &self.policy,
        };
        let mut report = ScoutReport::default();
        for check in CHECKS {
            check(&inspection, &mut report);
        }
        report.sort_by_slot();
        report
    }
}

fn check_group_membership(inspection: &Inspection<'_>, report: &mut ScoutReport) {
    let (group, account) = (inspection.group, inspection.account);
    if account.group != group.address {
        report.push(
            Severity::Problem,
            Finding::new(
                FindingKind::GroupMismatch,
                format!("account {} is not part of group {}", account.address, group.name),
            )
            .observed(account.group, group.address),
        );
    }
}

fn check_structural_alignment(inspection: &Inspection<'_>, report: &mut ScoutReport) {
    let group = inspection.group;
    for slot in inspection.account.slots.iter().filter(|slot| !slot.is_empty()) {
        let Some(base) = group.slots.get(slot.index).and_then(|g| g.base.as_ref()) else {
            report.push(
                Severity::Problem,
                Finding::new(
                    FindingKind::SlotMisaligned,
                    format!("slot {} holds references but the group slot is empty", slot.index),
                )
                .at_slot(slot.index)
                .observed("populated account slot", "empty account slot"),
            );
            continue;
        };
        if let Some(base_bank) = slot.base_bank
            && base_bank != base.root_bank
        {
            report.push(
                Severity::Problem,
                Finding::new(
                    FindingKind::SlotMisaligned,
                    format!("slot {} base bank is not the {} root bank", slot.index, base.token.symbol),
                )
                .at_slot(slot.index)
                .for_instrument(&base.token.symbol)
                .observed(base_bank, base.root_bank),
            );
        }
        if let Some(quote_bank) = slot.quote_bank
            && quote_bank != group.quote.root_bank
        {
            report.push(
                Severity::Problem,
                Finding::new(
                    FindingKind::SlotMisaligned,
                    format!(
                        "slot {} quote bank is not the {} root bank",
                        slot.index, group.quote.token.symbol
                    ),
                )
                .at_slot(slot.index)
                .for_instrument(&group.quote.token.symbol)
                .observed(quote_bank, group.quote.root_bank),
            );
        }
    }
}

fn check_open_orders(inspection: &Inspection<'_>, report: &mut ScoutReport) {
    let (group, account) = (inspection.group, inspection.account);
    for slot in &account.slots {
        let Some(reference) = slot.open_orders.as_ref() else {
            continue;
        };
        let (severity, reason) = match &reference.state {
            OpenOrdersState::Loaded(_) => (Severity::Information, String::new()),
            OpenOrdersState::Unloaded => (Severity::Warning, "was not loaded".to_string()),
            OpenOrdersState::Missing => (Severity::Problem, "does not exist".to_string()),
            OpenOrdersState::Malformed(err) => (Severity::Problem, format!("is malformed: {err}")),
        };
        let Some(open_orders) = reference.loaded() else {
            report.push(
                severity,
                Finding::new(
                    FindingKind::OpenOrdersUnavailable,
                    format!("open orders {} for slot {} {reason}", reference.address, slot.index),
                )
                .at_slot(slot.index),
            );
            continue;
        };

        if open_orders.mango_account != account.address {
            report.push(
                Severity::Problem,
                Finding::new(
                    FindingKind::OpenOrdersOwnerMismatch,
                    format!("open orders for slot {} belong to another account", slot.index),
                )
                .at_slot(slot.index)
                .observed(open_orders.mango_account, account.address),
            );
        }

        // An empty group slot is already reported by the alignment check.
        let Some(base) = group.slots.get(slot.index).and_then(|g| g.base.as_ref()) else {
            continue;
        };
        if open_orders.base_mint != base.token.mint {
            report.push(
                Severity::Problem,
                Finding::new(
                    FindingKind::OpenOrdersMintMismatch,
                    format!("open orders for slot {} trade a different base token", slot.index),
                )
                .at_slot(slot.index)
                .for_instrument(&base.token.symbol)
                .observed(open_orders.base_mint, base.token.mint),
            );
        }
        if open_orders.quote_mint != group.quote.token.mint {
            report.push(
                Severity::Problem,
                Finding::new(
                    FindingKind::OpenOrdersMintMismatch,
                    format!("open orders for slot {} trade a different quote token", slot.index),
                )
                .at_slot(slot.index)
                .for_instrument(&group.quote.token.symbol)
                .observed(open_orders.quote_mint, group.quote.token.mint),
            );
        }
    }
}

fn check_bank_references(inspection: &Inspection<'_>, report: &mut ScoutReport) {
    for slot in &inspection.account.slots {
        if slot.open_orders.is_none() {
            continue;
        }
        for (side, bank) in [("base", slot.base_bank), ("quote", slot.quote_bank)] {
            if bank.is_none() {
                report.push(
                    Severity::Problem,
                    Finding::new(
                        FindingKind::MissingBankReference,
                        format!("slot {} has open orders but no {side} bank", slot.index),
                    )
                    .at_slot(slot.index)
                    .observed("none", format!("{side} root bank")),
                );
            }
        }
    }
}

fn check_cache_staleness(inspection: &Inspection<'_>, report: &mut ScoutReport) {
    let Some(cache) = inspection.cache else {
        report.push(
            Severity::Information,
            Finding::new(FindingKind::NoCache, "no cache supplied; staleness not checked"),
        );
        return;
    };
    let (group, account, now, policy) =
        (inspection.group, inspection.account, inspection.now, inspection.policy);
    let limit = format!("at most {}s old", policy.max_age_secs);

    for slot in &group.slots {
        let Some(base) = slot.base.as_ref() else {
            continue;
        };
        let Some(price) = cache.price(slot.index) else {
            continue;
        };
        if policy.is_stale(price.last_update, now) {
            let age = StalenessPolicy::age(price.last_update, now);
            report.push(
                Severity::Warning,
                Finding::new(
                    FindingKind::StalePrice,
                    format!("{} price is {age}s old", base.token.symbol),
                )
                .at_slot(slot.index)
                .for_instrument(&base.token.symbol)
                .observed(format!("{age}s old"), &limit),
            );
        }
    }

    for (token_index, info) in group.tokens() {
        let holds_position = account
            .position(token_index)
            .is_some_and(|position| !position.is_zero());
        let Some(entry) = cache.root_bank(token_index) else {
            continue;
        };
        if holds_position && policy.is_stale(entry.last_update, now) {
            let age = StalenessPolicy::age(entry.last_update, now);
            let finding = Finding::new(
                FindingKind::StaleRootBankIndex,
                format!("{} interest index is {age}s old", info.token.symbol),
            )
            .for_instrument(&info.token.symbol)
            .observed(format!("{age}s old"), &limit);
            let finding = if token_index == QUOTE_INDEX {
                finding
            } else {
                finding.at_slot(token_index)
            };
            report.push(Severity::Warning, finding);
        }
    }
}

fn check_liquidation_state(inspection: &Inspection<'_>, report: &mut ScoutReport) {
    let account = inspection.account;
    if account.is_bankrupt {
        report.push(
            Severity::Problem,
            Finding::new(FindingKind::Bankrupt, format!("account {} is bankrupt", account.address))
                .observed("bankrupt", "solvent"),
        );
    }
    if account.being_liquidated {
        report.push(
            Severity::Warning,
            Finding::new(
                FindingKind::BeingLiquidated,
                format!("account {} is being liquidated", account.address),
            )
            .observed("being liquidated", "not being liquidated"),
        );
    }
}

fn check_funding(inspection: &Inspection<'_>, report: &mut ScoutReport) {
    if !inspection.account.has_any_balance() {
        report.push(
            Severity::Information,
            Finding::new(
                FindingKind::Unfunded,
                format!("account {} holds no balances", inspection.account.address),
            )
            .observed("no balances", "some balance"),
        );
    }
}
