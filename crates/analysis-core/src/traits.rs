use async_trait::async_trait;
use crate::{
    AnalysisError, EntrySignal, GateDecision, MarketContext, ProposedDecision, SentimentVerdict,
    TechnicalSnapshot, TrendAssessment,
};

/// Trait for multi-timeframe technical analysis engines
#[async_trait]
pub trait TechnicalAnalyzer: Send + Sync {
    async fn get_multi_timeframe_analysis(
        &self,
        symbol: &str,
        context: &MarketContext,
    ) -> Result<TechnicalSnapshot, AnalysisError>;
}

/// Trait for primary trend classifiers (LLM or rule based)
#[async_trait]
pub trait TrendClassifier: Send + Sync {
    async fn analyze_primary_trend(
        &self,
        symbol: &str,
        snapshot: &TechnicalSnapshot,
    ) -> Result<TrendAssessment, AnalysisError>;
}

/// Trait for entry quality filters.
/// A rejection must carry a reason suitable for direct display.
pub trait QualityGate: Send + Sync {
    fn should_enter_trade(
        &self,
        symbol: &str,
        snapshot: &TechnicalSnapshot,
        trend: &TrendAssessment,
        entry: &EntrySignal,
    ) -> GateDecision;
}

/// Trait for sentiment guards that may veto an admitted trade
#[async_trait]
pub trait SentimentGuard: Send + Sync {
    async fn should_avoid_trade(
        &self,
        symbol: &str,
        proposed: &ProposedDecision,
    ) -> Result<SentimentVerdict, AnalysisError>;
}
