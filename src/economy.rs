//! Coin economy arithmetic
//!
//! A confirmed duel mints a flat reward for both duelists and, when the house
//! can afford it, pays each of them a share of the house balance. The house is
//! refilled only by coin spending. All functions here are pure; the ledger
//! applier runs them against rows it already holds locks on.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::domain::HouseAccount;
use crate::error::{MatchbookError, Result};

/// Coin movements for one confirmed duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Newly minted coins per duelist
    pub reward_each: i64,
    /// House bonus per duelist
    pub payout_each: i64,
    pub house_before: i64,
    pub house_after: i64,
}

impl Settlement {
    /// Total coins credited to one duelist
    pub fn credit_each(&self) -> i64 {
        self.reward_each + self.payout_each
    }

    /// Coins that did not exist before this settlement
    pub fn minted(&self) -> i64 {
        self.reward_each * 2
    }

    /// Coins moved out of the house
    pub fn house_debit(&self) -> i64 {
        self.house_before - self.house_after
    }
}

/// Bonus paid to each duelist: `round(balance * rate / 100)`, half to even
pub fn house_payout(balance: i64, payout_rate: Decimal) -> i64 {
    if balance <= 0 || payout_rate <= Decimal::ZERO {
        return 0;
    }
    (Decimal::from(balance) * payout_rate / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
pub struct EconomyAccount {
    match_reward: i64,
}

impl EconomyAccount {
    pub fn new(match_reward: i64) -> Self {
        Self { match_reward }
    }

    pub fn from_config(config: &EconomyConfig) -> Self {
        Self::new(config.match_reward)
    }

    /// Compute the reward and house skim for a duel against the locked house row
    pub fn settle(&self, house: &HouseAccount) -> Settlement {
        let payout = house_payout(house.balance, house.payout_rate);
        let (payout_each, house_after) = if payout > 0 && house.balance >= payout * 2 {
            (payout, house.balance - payout * 2)
        } else {
            (0, house.balance)
        };

        Settlement {
            reward_each: self.match_reward,
            payout_each,
            house_before: house.balance,
            house_after,
        }
    }
}

/// Balance left after a participant spends `amount` coins
pub fn debit_coins(coins: i64, amount: i64) -> Result<i64> {
    if amount <= 0 {
        return Err(MatchbookError::validation("spend amount must be positive"));
    }
    if coins < amount {
        return Err(MatchbookError::validation(format!(
            "insufficient coins: have {}, need {}",
            coins, amount
        )));
    }
    Ok(coins - amount)
}

pub fn validate_payout_rate(rate: Decimal) -> Result<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(MatchbookError::validation(format!(
            "payout rate must be between 0 and 100, got {}",
            rate
        )));
    }
    Ok(())
}
