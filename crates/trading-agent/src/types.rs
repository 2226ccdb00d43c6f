use analysis_core::TrendLabel;
use broker_trait::OrderSide;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed trade. Never mutated once appended to the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: OrderSide,
    /// Size in base units
    pub size: Decimal,
    /// Position value in quote units
    pub notional: Decimal,
    /// Collateral locked at the trade's leverage
    pub margin: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub leverage: u32,
    pub confidence: f64,
    pub trend: TrendLabel,
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of one pipeline evaluation for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum DecisionOutcome {
    Hold {
        reason: String,
        confidence: f64,
    },
    Executed {
        trade: TradeRecord,
        confidence: f64,
        reason: String,
    },
}

impl DecisionOutcome {
    pub fn hold(reason: impl Into<String>, confidence: f64) -> Self {
        DecisionOutcome::Hold {
            reason: reason.into(),
            confidence,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, DecisionOutcome::Executed { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            DecisionOutcome::Hold { reason, .. } | DecisionOutcome::Executed { reason, .. } => {
                reason
            }
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            DecisionOutcome::Hold { confidence, .. }
            | DecisionOutcome::Executed { confidence, .. } => *confidence,
        }
    }

    pub fn trade(&self) -> Option<&TradeRecord> {
        match self {
            DecisionOutcome::Executed { trade, .. } => Some(trade),
            DecisionOutcome::Hold { .. } => None,
        }
    }
}
