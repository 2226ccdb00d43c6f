use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// Directional action proposed by the entry signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn is_hold(&self) -> bool {
        matches!(self, TradeAction::Hold)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::Hold => write!(f, "HOLD"),
        }
    }
}

impl FromStr for TradeAction {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            "HOLD" => Ok(TradeAction::Hold),
            other => Err(AnalysisError::InvalidData(format!(
                "unknown trade action '{}'",
                other
            ))),
        }
    }
}

/// Entry signal produced by the multi-timeframe analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySignal {
    pub action: TradeAction,
    pub confidence: f64, // 0.0 to 1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSection {
    pub current_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSection {
    /// Average true range in quote units
    pub atr: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSection {
    /// Trend strength (ADX), 0 to 100
    pub adx: f64,
}

/// Bundle produced by the technical analysis engine for one symbol.
/// Consumed read-only by the decision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub symbol: String,
    pub entry: EntrySignal,
    pub execution: ExecutionSection,
    pub risk: RiskSection,
    pub trend: TrendSection,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl TechnicalSnapshot {
    /// Check the numeric invariants the pipeline relies on:
    /// confidence in [0,1], price > 0, ATR >= 0.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let confidence = self.entry.confidence;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(AnalysisError::InvalidData(format!(
                "{}: entry confidence {} outside [0, 1]",
                self.symbol, confidence
            )));
        }
        if self.execution.current_price <= Decimal::ZERO {
            return Err(AnalysisError::InvalidData(format!(
                "{}: current price {} must be positive",
                self.symbol, self.execution.current_price
            )));
        }
        if self.risk.atr < Decimal::ZERO {
            return Err(AnalysisError::InvalidData(format!(
                "{}: ATR {} must not be negative",
                self.symbol, self.risk.atr
            )));
        }
        if !self.trend.adx.is_finite() {
            return Err(AnalysisError::InvalidData(format!(
                "{}: ADX is not a finite number",
                self.symbol
            )));
        }
        Ok(())
    }
}

/// Primary trend label from the trend classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Sideways,
}

impl TrendLabel {
    /// Whether the trend points against the given action
    pub fn opposes(&self, action: TradeAction) -> bool {
        matches!(
            (self, action),
            (TrendLabel::Bullish, TradeAction::Sell) | (TrendLabel::Bearish, TradeAction::Buy)
        )
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendLabel::Bullish => write!(f, "bullish"),
            TrendLabel::Bearish => write!(f, "bearish"),
            TrendLabel::Sideways => write!(f, "sideways"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAssessment {
    pub trend: TrendLabel,
    pub rationale: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Decision handed to the sentiment guard once the quality gate admits a trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedDecision {
    pub action: TradeAction,
    pub primary_trend: TrendAssessment,
    pub confidence: f64,
}

/// Pass/fail verdict from a gate, with a human-readable reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub approved: bool,
    pub reason: String,
}

impl GateDecision {
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
        }
    }
}

/// Answer of a sentiment guard. `avoid == true` vetoes the trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentVerdict {
    pub avoid: bool,
    pub reason: String,
}

impl SentimentVerdict {
    pub fn avoid(reason: impl Into<String>) -> Self {
        Self {
            avoid: true,
            reason: reason.into(),
        }
    }

    pub fn proceed(reason: impl Into<String>) -> Self {
        Self {
            avoid: false,
            reason: reason.into(),
        }
    }
}

/// Context handed to the analysis engine alongside the symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketContext {
    pub exchange: String,
    pub as_of: DateTime<Utc>,
}
