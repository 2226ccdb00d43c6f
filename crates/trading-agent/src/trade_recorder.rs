use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use risk_manager::{should_reset, RiskLedger};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::TradeRecord;

/// Aggregate statistics over the trade log and today's risk counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub trading_day: NaiveDate,
    pub daily_trades: u32,
    pub daily_trade_limit: u32,
    pub daily_pnl: Decimal,
    pub consecutive_losses: u32,
    pub total_executed_trades: usize,
    pub symbol_trades: BTreeMap<String, u32>,
    pub account_balance: Decimal,
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} trades {}/{}, pnl {:.2}, losses in a row {}, total executed {}, balance {:.2}",
            self.trading_day,
            self.daily_trades,
            self.daily_trade_limit,
            self.daily_pnl,
            self.consecutive_losses,
            self.total_executed_trades,
            self.account_balance
        )
    }
}

/// Append-only trade log on top of the risk ledger
#[derive(Debug, Clone)]
pub struct TradeRecorder {
    ledger: RiskLedger,
    trades: Vec<TradeRecord>,
}

impl TradeRecorder {
    pub fn new(ledger: RiskLedger) -> Self {
        Self {
            ledger,
            trades: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &RiskLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut RiskLedger {
        &mut self.ledger
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Append an executed trade and book its estimated result
    pub fn record(&mut self, trade: TradeRecord, pnl_estimate: Decimal) {
        self.ledger.update_trade_result(pnl_estimate);
        let symbol_count = self.ledger.count_symbol_trade(&trade.symbol);

        tracing::info!(
            "Trade recorded: {} {} {} @ {} (daily {}/{}, {} today on this symbol)",
            trade.side,
            trade.size,
            trade.symbol,
            trade.entry_price,
            self.ledger.state().trades_today,
            self.ledger.limits().daily_trade_limit,
            symbol_count
        );

        self.trades.push(trade);
    }

    /// Roll the daily counters over when `today` is past the ledger's day.
    /// Returns whether a reset happened.
    pub fn reset_if_new_day(&mut self, today: NaiveDate) -> bool {
        if !should_reset(self.ledger.trading_day(), today) {
            return false;
        }
        self.ledger.reset_daily_stats(today);
        true
    }

    pub fn stats(&self) -> PipelineStats {
        let summary = self.ledger.summary();
        PipelineStats {
            trading_day: self.ledger.trading_day(),
            daily_trades: summary.daily_trades,
            daily_trade_limit: self.ledger.limits().daily_trade_limit,
            daily_pnl: summary.daily_pnl,
            consecutive_losses: summary.consecutive_losses,
            total_executed_trades: self.trades.len(),
            symbol_trades: self.ledger.state().trades_by_symbol.clone(),
            account_balance: summary.account_balance,
        }
    }
}
