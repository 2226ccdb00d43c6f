use analysis_core::TradeAction;
use broker_trait::OrderSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Stop distance in ATRs
pub const STOP_LOSS_ATR_MULTIPLE: Decimal = dec!(1.5);
/// Target distance in ATRs (1:2 risk:reward against the stop)
pub const TAKE_PROFIT_ATR_MULTIPLE: Decimal = dec!(3.0);

/// Stop-loss and take-profit levels around an entry price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketLevels {
    pub side: OrderSide,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl BracketLevels {
    /// BUY places the stop below and the target above; anything else is
    /// treated as SELL and mirrored.
    pub fn from_atr(action: TradeAction, entry_price: Decimal, atr: Decimal) -> Self {
        let stop_distance = atr * STOP_LOSS_ATR_MULTIPLE;
        let target_distance = atr * TAKE_PROFIT_ATR_MULTIPLE;

        match action {
            TradeAction::Buy => Self {
                side: OrderSide::Buy,
                entry_price,
                stop_loss: entry_price - stop_distance,
                take_profit: entry_price + target_distance,
            },
            TradeAction::Sell | TradeAction::Hold => Self {
                side: OrderSide::Sell,
                entry_price,
                stop_loss: entry_price + stop_distance,
                take_profit: entry_price - target_distance,
            },
        }
    }

    /// Stop and target collapse onto the entry (zero ATR)
    pub fn is_degenerate(&self) -> bool {
        self.stop_loss == self.entry_price || self.take_profit == self.entry_price
    }

    /// A short whose target would sit at or below zero cannot be placed
    pub fn has_valid_prices(&self) -> bool {
        self.stop_loss > Decimal::ZERO && self.take_profit > Decimal::ZERO
    }

    pub fn risk_per_unit(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn reward_per_unit(&self) -> Decimal {
        (self.take_profit - self.entry_price).abs()
    }
}
