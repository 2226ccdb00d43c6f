use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::models::*;

/// Whether the daily counters must be rolled over.
/// Only a forward move of the calendar date triggers a reset; a clock that
/// jumps back across midnight keeps today's counters rather than resetting
/// on any date change.
pub fn should_reset(last: NaiveDate, now: NaiveDate) -> bool {
    now > last
}

/// Daily and account risk bookkeeping.
///
/// Limits reached are normal business outcomes: the ledger reports them
/// through [`TradeCheck`] and never errors.
#[derive(Debug, Clone)]
pub struct RiskLedger {
    limits: RiskLimits,
    state: DailyRiskState,
    account: Option<AccountSnapshot>,
}

impl RiskLedger {
    pub fn new(limits: RiskLimits, trading_day: NaiveDate) -> Self {
        Self {
            limits,
            state: DailyRiskState::new(trading_day),
            account: None,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Replace the limits, keeping today's counters
    pub fn set_limits(&mut self, limits: RiskLimits) {
        self.limits = limits;
    }

    pub fn state(&self) -> &DailyRiskState {
        &self.state
    }

    pub fn trading_day(&self) -> NaiveDate {
        self.state.trading_day
    }

    pub fn account(&self) -> Option<&AccountSnapshot> {
        self.account.as_ref()
    }

    /// Cached balance, zero before the first refresh
    pub fn account_balance(&self) -> Decimal {
        self.account
            .as_ref()
            .map(|a| a.total_balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Loss level at or below which trading halts for the day
    pub fn daily_loss_threshold(&self) -> Option<Decimal> {
        self.account.as_ref().map(|a| {
            -(a.total_balance * self.limits.max_daily_loss_percent / Decimal::ONE_HUNDRED)
        })
    }

    /// Check whether another trade on `symbol` is allowed today
    pub fn can_trade_today(&self, symbol: &str) -> TradeCheck {
        if self.state.trades_today >= self.limits.daily_trade_limit {
            return TradeCheck::blocked(format!(
                "Daily trade limit reached: {}/{}",
                self.state.trades_today, self.limits.daily_trade_limit
            ));
        }

        if let Some(threshold) = self.daily_loss_threshold() {
            if self.state.realized_pnl <= threshold {
                return TradeCheck::blocked(format!(
                    "Daily loss limit reached: PnL {:.2} <= {:.2} ({}% of balance {:.2})",
                    self.state.realized_pnl,
                    threshold,
                    self.limits.max_daily_loss_percent,
                    self.account_balance()
                ));
            }
        }

        if let Some(per_symbol) = self.limits.max_trades_per_symbol {
            let taken = self.state.symbol_trades(symbol);
            if taken >= per_symbol {
                return TradeCheck::blocked(format!(
                    "Symbol trade limit reached for {}: {}/{}",
                    symbol, taken, per_symbol
                ));
            }
        }

        if let Some(max_losses) = self.limits.max_consecutive_losses {
            if self.state.consecutive_losses >= max_losses {
                return TradeCheck::blocked(format!(
                    "Consecutive loss limit reached: {}/{}",
                    self.state.consecutive_losses, max_losses
                ));
            }
        }

        TradeCheck::allowed()
    }

    /// Overwrite the cached balance with a fresh reading
    pub fn set_account_balance(&mut self, total_balance: Decimal, refreshed_at: DateTime<Utc>) {
        self.account = Some(AccountSnapshot {
            total_balance,
            refreshed_at,
        });
    }

    /// Book a trade result against today's counters
    pub fn update_trade_result(&mut self, pnl: Decimal) {
        self.state.realized_pnl += pnl;
        self.state.trades_today += 1;
        if pnl < Decimal::ZERO {
            self.state.consecutive_losses += 1;
        } else {
            self.state.consecutive_losses = 0;
        }

        tracing::debug!(
            "Risk ledger: trade booked (pnl={:.2}, daily_pnl={:.2}, trades={}/{}, losses_in_row={})",
            pnl,
            self.state.realized_pnl,
            self.state.trades_today,
            self.limits.daily_trade_limit,
            self.state.consecutive_losses
        );
    }

    pub fn count_symbol_trade(&mut self, symbol: &str) -> u32 {
        let count = self
            .state
            .trades_by_symbol
            .entry(symbol.to_string())
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Start a fresh trading day. All daily counters go together.
    /// Consecutive losses span days, except that a streak which tripped
    /// `max_consecutive_losses` is cleared so the halt lasts one day.
    pub fn reset_daily_stats(&mut self, trading_day: NaiveDate) {
        let streak = self.state.consecutive_losses;
        let halted = self
            .limits
            .max_consecutive_losses
            .is_some_and(|max| streak >= max);
        let consecutive_losses = if halted { 0 } else { streak };

        self.state = DailyRiskState {
            consecutive_losses,
            ..DailyRiskState::new(trading_day)
        };
        if halted {
            tracing::info!(
                "Risk ledger: consecutive loss halt ({} in a row) released for {}",
                streak,
                trading_day
            );
        }
        tracing::info!("Risk ledger: daily stats reset for {}", trading_day);
    }

    pub fn summary(&self) -> RiskSummary {
        RiskSummary {
            daily_trades: self.state.trades_today,
            daily_pnl: self.state.realized_pnl,
            consecutive_losses: self.state.consecutive_losses,
            account_balance: self.account_balance(),
        }
    }
}
