// 9.0 ledger.rs: the collateral token boundary. the market only ever talks to a
// CollateralLedger; InMemoryLedger is the mocked token used by tests and the simulation.
// amounts crossing this boundary are in the token's native decimals.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Address;

// boolean results follow the token convention; callers must treat `false` as a hard failure.
pub trait CollateralLedger {
    fn decimals(&self) -> u32;

    fn balance_of(&self, holder: Address) -> u128;

    // move `amount` from `owner` to `spender` using the allowance owner granted spender.
    fn transfer_from(&mut self, owner: Address, spender: Address, amount: u128) -> bool;

    fn transfer(&mut self, from: Address, to: Address, amount: u128) -> bool;

    // pay several recipients from one holder. the default checks the combined amount against
    // the balance first, then transfers in order. ledgers that can batch atomically override it.
    fn transfer_batch(&mut self, from: Address, payouts: &[(Address, u128)]) -> bool {
        let total = payouts
            .iter()
            .try_fold(0u128, |acc, (_, amount)| acc.checked_add(*amount));
        match total {
            Some(total) if total <= self.balance_of(from) => {}
            _ => return false,
        }
        payouts
            .iter()
            .filter(|(_, amount)| *amount > 0)
            .all(|(to, amount)| self.transfer(from, *to, *amount))
    }
}

// Supported collateral types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollateralType {
    Usd,
    Usdc,
    Usdt,
    Dai,
}

impl CollateralType {
    pub fn decimals(&self) -> u32 {
        match self {
            CollateralType::Usd => 2,
            CollateralType::Usdc => 6,
            CollateralType::Usdt => 6,
            CollateralType::Dai => 18,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CollateralType::Usd => "USD",
            CollateralType::Usdc => "USDC",
            CollateralType::Usdt => "USDT",
            CollateralType::Dai => "DAI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub amount: u128,
    pub status: TransferStatus,
}

// 9.1: MOCKED token. balances and allowances only, plus failure injection.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    collateral: CollateralType,
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    history: Vec<TransferRecord>,
    fail_all: bool,
    blocked: Vec<Address>,
}

impl InMemoryLedger {
    pub fn new(collateral: CollateralType) -> Self {
        Self {
            collateral,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            history: Vec::new(),
            fail_all: false,
            blocked: Vec::new(),
        }
    }

    pub fn collateral(&self) -> CollateralType {
        self.collateral
    }

    pub fn mint(&mut self, holder: Address, amount: u128) {
        *self.balances.entry(holder).or_insert(0) += amount;
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    // every subsequent transfer returns false
    pub fn set_fail_all(&mut self, fail: bool) {
        self.fail_all = fail;
    }

    // transfers touching `address` on either side return false
    pub fn block(&mut self, address: Address) {
        if !self.blocked.contains(&address) {
            self.blocked.push(address);
        }
    }

    pub fn unblock(&mut self, address: Address) {
        self.blocked.retain(|a| *a != address);
    }

    pub fn history(&self) -> &[TransferRecord] {
        &self.history
    }

    pub fn confirmed_transfers(&self) -> usize {
        self.history
            .iter()
            .filter(|r| r.status == TransferStatus::Confirmed)
            .count()
    }

    fn record(&mut self, from: Address, to: Address, amount: u128, ok: bool) -> bool {
        self.history.push(TransferRecord {
            from,
            to,
            amount,
            status: if ok { TransferStatus::Confirmed } else { TransferStatus::Failed },
        });
        ok
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: u128) -> bool {
        if self.fail_all || self.blocked.contains(&from) || self.blocked.contains(&to) {
            return false;
        }
        let available = self.balance_of(from);
        if available < amount {
            return false;
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        true
    }
}

impl CollateralLedger for InMemoryLedger {
    fn decimals(&self) -> u32 {
        self.collateral.decimals()
    }

    fn balance_of(&self, holder: Address) -> u128 {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    fn transfer_from(&mut self, owner: Address, spender: Address, amount: u128) -> bool {
        let allowance = self.allowance(owner, spender);
        let ok = allowance >= amount && self.move_balance(owner, spender, amount);
        if ok {
            self.allowances.insert((owner, spender), allowance - amount);
        }
        self.record(owner, spender, amount, ok)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: u128) -> bool {
        let ok = self.move_balance(from, to, amount);
        self.record(from, to, amount, ok)
    }

    // all legs or none
    fn transfer_batch(&mut self, from: Address, payouts: &[(Address, u128)]) -> bool {
        let legs: Vec<(Address, u128)> = payouts.iter().copied().filter(|(_, a)| *a > 0).collect();
        let total = legs.iter().try_fold(0u128, |acc, (_, a)| acc.checked_add(*a));
        let blocked = self.fail_all
            || self.blocked.contains(&from)
            || legs.iter().any(|(to, _)| self.blocked.contains(to));

        let ok = !blocked && matches!(total, Some(t) if t <= self.balance_of(from));
        for (to, amount) in legs {
            if ok {
                self.move_balance(from, to, amount);
            }
            self.record(from, to, amount, ok);
        }
        ok
    }
}
