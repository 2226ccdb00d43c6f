use analysis_core::{EntrySignal, GateDecision, QualityGate, TechnicalSnapshot, TrendAssessment};

use crate::config::TradingParameters;

/// Strict entry filter: the signal must be directional, confident enough,
/// and backed by a trend strong enough to follow.
#[derive(Debug, Clone)]
pub struct ThresholdQualityGate {
    min_confidence: f64,
    min_adx: f64,
}

impl ThresholdQualityGate {
    pub fn new(min_confidence: f64, min_adx: f64) -> Self {
        Self {
            min_confidence,
            min_adx,
        }
    }

    pub fn from_parameters(params: &TradingParameters) -> Self {
        Self::new(params.min_confidence, params.min_adx)
    }
}

impl QualityGate for ThresholdQualityGate {
    fn should_enter_trade(
        &self,
        symbol: &str,
        snapshot: &TechnicalSnapshot,
        trend: &TrendAssessment,
        entry: &EntrySignal,
    ) -> GateDecision {
        if entry.action.is_hold() {
            return GateDecision::reject(format!("{}: entry signal is HOLD", symbol));
        }

        if entry.confidence < self.min_confidence {
            return GateDecision::reject(format!(
                "{}: confidence {:.0}% below minimum {:.0}%",
                symbol,
                entry.confidence * 100.0,
                self.min_confidence * 100.0
            ));
        }

        let adx = snapshot.trend.adx;
        if adx < self.min_adx {
            return GateDecision::reject(format!(
                "{}: trend too weak (ADX {:.1} < {:.1})",
                symbol, adx, self.min_adx
            ));
        }

        tracing::debug!(
            "Quality gate: {} {} approved (confidence={:.2}, ADX={:.1}, trend={})",
            entry.action,
            symbol,
            entry.confidence,
            adx,
            trend.trend
        );

        GateDecision::approve(format!(
            "{} {} passes quality (confidence {:.0}%, ADX {:.1})",
            symbol,
            entry.action,
            entry.confidence * 100.0,
            adx
        ))
    }
}
