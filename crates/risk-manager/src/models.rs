use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Limits the ledger enforces before any analysis work is done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum trades across all symbols per trading day
    pub daily_trade_limit: u32,
    /// Maximum realized daily loss as percentage of account balance before halting
    pub max_daily_loss_percent: Decimal,
    /// Optional per-symbol daily trade cap
    #[serde(default)]
    pub max_trades_per_symbol: Option<u32>,
    /// Optional halt after this many losing trades in a row
    #[serde(default)]
    pub max_consecutive_losses: Option<u32>,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            daily_trade_limit: 3,
            max_daily_loss_percent: Decimal::from(5),
            max_trades_per_symbol: None,
            max_consecutive_losses: None,
        }
    }
}

/// Cached account balance, refreshed once per decision cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub total_balance: Decimal,
    pub refreshed_at: DateTime<Utc>,
}

/// Per-day risk counters. Replaced wholesale on date rollover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRiskState {
    pub trading_day: NaiveDate,
    pub trades_today: u32,
    pub trades_by_symbol: BTreeMap<String, u32>,
    pub realized_pnl: Decimal,
    pub consecutive_losses: u32,
}

impl DailyRiskState {
    pub fn new(trading_day: NaiveDate) -> Self {
        Self {
            trading_day,
            trades_today: 0,
            trades_by_symbol: BTreeMap::new(),
            realized_pnl: Decimal::ZERO,
            consecutive_losses: 0,
        }
    }

    pub fn symbol_trades(&self, symbol: &str) -> u32 {
        self.trades_by_symbol.get(symbol).copied().unwrap_or(0)
    }
}

/// Result of the pre-trade ledger check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCheck {
    pub can_trade: bool,
    /// Empty when trading is allowed
    pub reason: String,
}

impl TradeCheck {
    pub fn allowed() -> Self {
        Self {
            can_trade: true,
            reason: String::new(),
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            can_trade: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub daily_trades: u32,
    pub daily_pnl: Decimal,
    pub consecutive_losses: u32,
    pub account_balance: Decimal,
}
