use analysis_core::{AnalysisError, ProposedDecision, SentimentGuard, SentimentVerdict, TrendLabel};
use async_trait::async_trait;

/// Vetoes trades that fight the classified primary trend, and low-conviction
/// trades in a market the classifier calls sideways.
#[derive(Debug, Clone)]
pub struct TrendConflictGuard {
    sideways_min_confidence: f64,
}

impl Default for TrendConflictGuard {
    fn default() -> Self {
        Self {
            sideways_min_confidence: 0.75,
        }
    }
}

impl TrendConflictGuard {
    pub fn new(sideways_min_confidence: f64) -> Self {
        Self {
            sideways_min_confidence,
        }
    }
}

#[async_trait]
impl SentimentGuard for TrendConflictGuard {
    async fn should_avoid_trade(
        &self,
        symbol: &str,
        proposed: &ProposedDecision,
    ) -> Result<SentimentVerdict, AnalysisError> {
        let trend = proposed.primary_trend.trend;

        if trend.opposes(proposed.action) {
            return Ok(SentimentVerdict::avoid(format!(
                "{}: {} against {} primary trend ({})",
                symbol, proposed.action, trend, proposed.primary_trend.rationale
            )));
        }

        if trend == TrendLabel::Sideways && proposed.confidence < self.sideways_min_confidence {
            return Ok(SentimentVerdict::avoid(format!(
                "{}: sideways market needs confidence >= {:.0}%, got {:.0}%",
                symbol,
                self.sideways_min_confidence * 100.0,
                proposed.confidence * 100.0
            )));
        }

        Ok(SentimentVerdict::proceed(format!(
            "{}: {} aligned with {} trend",
            symbol, proposed.action, trend
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{TradeAction, TrendAssessment};

    fn proposed(action: TradeAction, trend: TrendLabel, confidence: f64) -> ProposedDecision {
        ProposedDecision {
            action,
            primary_trend: TrendAssessment {
                trend,
                rationale: "test".to_string(),
                confidence: None,
            },
            confidence,
        }
    }

    #[tokio::test]
    async fn counter_trend_is_vetoed() {
        let guard = TrendConflictGuard::default();
        let verdict = guard
            .should_avoid_trade("BTC/USDT:USDT", &proposed(TradeAction::Buy, TrendLabel::Bearish, 0.95))
            .await
            .unwrap();
        assert!(verdict.avoid);
        assert!(verdict.reason.contains("bearish"));
    }

    #[tokio::test]
    async fn aligned_trade_passes() {
        let guard = TrendConflictGuard::default();
        let verdict = guard
            .should_avoid_trade("BTC/USDT:USDT", &proposed(TradeAction::Sell, TrendLabel::Bearish, 0.7))
            .await
            .unwrap();
        assert!(!verdict.avoid);
    }

    #[tokio::test]
    async fn sideways_needs_conviction() {
        let guard = TrendConflictGuard::new(0.8);
        let weak = guard
            .should_avoid_trade("SOL/USDT:USDT", &proposed(TradeAction::Buy, TrendLabel::Sideways, 0.7))
            .await
            .unwrap();
        assert!(weak.avoid);

        let strong = guard
            .should_avoid_trade("SOL/USDT:USDT", &proposed(TradeAction::Buy, TrendLabel::Sideways, 0.85))
            .await
            .unwrap();
        assert!(!strong.avoid);
    }
}
