use std::collections::HashSet;
use std::sync::Arc;

use analysis_core::{
    AnalysisError, MarketContext, ProposedDecision, QualityGate, SentimentGuard,
    TechnicalAnalyzer, TechnicalSnapshot, TrendAssessment, TrendClassifier,
};
use broker_trait::{BracketOrderRequest, BrokerError, ExchangeClient};
use position_sizer::PositionSizer;
use risk_manager::RiskLedger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::bracket::BracketLevels;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ParameterField, ParameterUpdate, TradingParameters};
use crate::quality_gate::ThresholdQualityGate;
use crate::trade_recorder::{PipelineStats, TradeRecorder};
use crate::types::{DecisionOutcome, TradeRecord};

/// Expected result booked for a fresh trade, as a fraction of its notional
pub const EXPECTED_PNL_FRACTION: Decimal = dec!(0.02);

/// Quality score handed to the sizer until a real scorer exists
const DEFAULT_QUALITY_SCORE: f64 = 1.0;

/// How the EXECUTE stage ended when the exchange itself did not fail
enum Execution {
    Filled(TradeRecord),
    Abandoned(String),
}

/// Gated decision pipeline for one account.
///
/// Each evaluation runs the gates in a fixed order and stops at the first
/// rejection:
///
/// 1. risk ledger (daily caps)
/// 2. technical analysis and primary trend classification
/// 3. quality gate
/// 4. sentiment guard
/// 5. sizing, bracket computation and order submission
/// 6. trade recording
///
/// Every path returns a [`DecisionOutcome`]; collaborator failures become
/// HOLD outcomes with confidence 0 and are never propagated.
pub struct DecisionPipeline {
    params: TradingParameters,
    exchange: Arc<dyn ExchangeClient>,
    analyzer: Arc<dyn TechnicalAnalyzer>,
    classifier: Arc<dyn TrendClassifier>,
    threshold_gate: ThresholdQualityGate,
    custom_gate: Option<Arc<dyn QualityGate>>,
    sentiment_guard: Arc<dyn SentimentGuard>,
    sizer: PositionSizer,
    recorder: TradeRecorder,
    clock: Arc<dyn Clock>,
}

impl DecisionPipeline {
    pub fn new(
        params: TradingParameters,
        exchange: Arc<dyn ExchangeClient>,
        analyzer: Arc<dyn TechnicalAnalyzer>,
        classifier: Arc<dyn TrendClassifier>,
        sentiment_guard: Arc<dyn SentimentGuard>,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        Ok(Self {
            threshold_gate: ThresholdQualityGate::from_parameters(&params),
            sizer: params.position_sizer(),
            recorder: TradeRecorder::new(RiskLedger::new(params.risk_limits(), clock.today())),
            custom_gate: None,
            params,
            exchange,
            analyzer,
            classifier,
            sentiment_guard,
            clock,
        })
    }

    /// Replace the clock. Today's counters start over on the new clock's date.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.recorder = TradeRecorder::new(RiskLedger::new(self.params.risk_limits(), clock.today()));
        self.clock = clock;
        self
    }

    /// Use a custom quality gate instead of the parameter-driven threshold gate
    pub fn with_quality_gate(mut self, gate: Arc<dyn QualityGate>) -> Self {
        self.custom_gate = Some(gate);
        self
    }

    pub fn parameters(&self) -> &TradingParameters {
        &self.params
    }

    pub fn recorder(&self) -> &TradeRecorder {
        &self.recorder
    }

    pub fn stats(&self) -> PipelineStats {
        self.recorder.stats()
    }

    fn quality_gate(&self) -> &dyn QualityGate {
        match &self.custom_gate {
            Some(gate) => gate.as_ref(),
            None => &self.threshold_gate,
        }
    }

    /// Apply a validated parameter update and re-derive the ledger limits,
    /// sizer and threshold gate. Nothing changes when validation fails.
    pub fn update_parameters(
        &mut self,
        update: ParameterUpdate,
    ) -> Result<Vec<ParameterField>, ConfigError> {
        let changed = self.params.apply(update)?;
        self.recorder
            .ledger_mut()
            .set_limits(self.params.risk_limits());
        self.sizer = self.params.position_sizer();
        self.threshold_gate = ThresholdQualityGate::from_parameters(&self.params);
        Ok(changed)
    }

    /// Evaluate every configured symbol once, in order
    pub async fn run_cycle(&mut self) -> Vec<(String, DecisionOutcome)> {
        let symbols = self.params.trading_pairs.clone();
        let mut seen = HashSet::new();
        let mut outcomes = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            if !seen.insert(symbol.clone()) {
                tracing::debug!("{} already evaluated this cycle", symbol);
                continue;
            }
            let outcome = self.process_trade_decision(&symbol).await;
            outcomes.push((symbol, outcome));
        }

        let executed = outcomes.iter().filter(|(_, o)| o.is_executed()).count();
        tracing::info!(
            "Cycle complete: {} evaluated, {} executed | {}",
            outcomes.len(),
            executed,
            self.stats()
        );
        outcomes
    }

    /// Run the full gate sequence for `symbol`
    pub async fn process_trade_decision(&mut self, symbol: &str) -> DecisionOutcome {
        let now = self.clock.now();
        if self.recorder.reset_if_new_day(self.clock.today()) {
            tracing::info!("New trading day {}", self.recorder.ledger().trading_day());
        }

        // 1. Risk ledger
        let check = self.recorder.ledger().can_trade_today(symbol);
        if !check.can_trade {
            tracing::info!("{} blocked by risk ledger: {}", symbol, check.reason);
            return DecisionOutcome::hold(check.reason, 0.0);
        }

        // 2. Analysis
        let context = MarketContext {
            exchange: self.exchange.exchange_name().to_string(),
            as_of: now,
        };
        let (snapshot, trend) = match self.analyze(symbol, &context).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("{} analysis failed: {}", symbol, e);
                return DecisionOutcome::hold(format!("Pipeline error: {}", e), 0.0);
            }
        };
        let entry = snapshot.entry.clone();

        // 3. Quality gate
        let quality = self
            .quality_gate()
            .should_enter_trade(symbol, &snapshot, &trend, &entry);
        if !quality.approved {
            tracing::info!("{} rejected by quality gate: {}", symbol, quality.reason);
            return DecisionOutcome::hold(quality.reason, entry.confidence);
        }

        // 4. Sentiment guard
        let proposed = ProposedDecision {
            action: entry.action,
            primary_trend: trend.clone(),
            confidence: entry.confidence,
        };
        match self.sentiment_guard.should_avoid_trade(symbol, &proposed).await {
            Ok(verdict) if verdict.avoid => {
                tracing::info!("{} vetoed by sentiment guard: {}", symbol, verdict.reason);
                return DecisionOutcome::hold(verdict.reason, entry.confidence);
            }
            Ok(verdict) => tracing::debug!("{} sentiment ok: {}", symbol, verdict.reason),
            Err(e) => {
                tracing::warn!("{} sentiment guard failed: {}", symbol, e);
                return DecisionOutcome::hold(format!("Sentiment guard error: {}", e), 0.0);
            }
        }

        // 5. Execution
        let trade = match self.execute(symbol, &snapshot, &trend).await {
            Ok(Execution::Filled(trade)) => trade,
            Ok(Execution::Abandoned(reason)) => {
                tracing::info!("{} not executed: {}", symbol, reason);
                return DecisionOutcome::hold(reason, entry.confidence);
            }
            Err(e) => {
                tracing::warn!("{} execution failed: {}", symbol, e);
                return DecisionOutcome::hold(format!("Execution error: {}", e), 0.0);
            }
        };

        // 6. Record
        let pnl_estimate = trade.notional * EXPECTED_PNL_FRACTION;
        let reason = format!(
            "Quality trade executed: {} {} notional {:.2} at {}x ({})",
            trade.side, trade.symbol, trade.notional, trade.leverage, quality.reason
        );
        self.recorder.record(trade.clone(), pnl_estimate);

        DecisionOutcome::Executed {
            trade,
            confidence: entry.confidence,
            reason,
        }
    }

    async fn analyze(
        &self,
        symbol: &str,
        context: &MarketContext,
    ) -> Result<(TechnicalSnapshot, TrendAssessment), AnalysisError> {
        let snapshot = self
            .analyzer
            .get_multi_timeframe_analysis(symbol, context)
            .await?;
        snapshot.validate()?;
        let trend = self
            .classifier
            .analyze_primary_trend(symbol, &snapshot)
            .await?;
        Ok((snapshot, trend))
    }

    async fn execute(
        &mut self,
        symbol: &str,
        snapshot: &TechnicalSnapshot,
        trend: &TrendAssessment,
    ) -> Result<Execution, BrokerError> {
        let price = snapshot.execution.current_price;
        let atr = snapshot.risk.atr;
        let entry = &snapshot.entry;

        if atr.is_zero() {
            return Ok(Execution::Abandoned(format!(
                "{}: ATR is zero, no room for stop-loss and take-profit",
                symbol
            )));
        }

        let account = self.exchange.get_account_info().await?;
        self.recorder
            .ledger_mut()
            .set_account_balance(account.total_balance, self.clock.now());

        let sizing = match self.sizer.calculate_position_size(
            symbol,
            account.total_balance,
            atr,
            price,
            entry.confidence,
            DEFAULT_QUALITY_SCORE,
        ) {
            Ok(sizing) => sizing,
            Err(e) => {
                return Ok(Execution::Abandoned(format!("Position sizing failed: {}", e)));
            }
        };

        if !self.sizer.is_viable(sizing.notional) || sizing.size <= Decimal::ZERO {
            return Ok(Execution::Abandoned(format!(
                "Position too small: {:.2} USDT of {:.2} base (minimum {:.2})",
                sizing.notional, sizing.base_notional, self.sizer.min_order_notional
            )));
        }

        let levels = BracketLevels::from_atr(entry.action, price, atr);
        if levels.is_degenerate() || !levels.has_valid_prices() {
            return Ok(Execution::Abandoned(format!(
                "{}: invalid bracket (stop {}, target {}) around {}",
                symbol, levels.stop_loss, levels.take_profit, price
            )));
        }

        let leverage = self.params.leverage;
        self.exchange.set_leverage(symbol, leverage).await?;

        let order = BracketOrderRequest::market(
            symbol,
            levels.side,
            sizing.size,
            levels.take_profit,
            levels.stop_loss,
        );
        let Some(handle) = self.exchange.create_order(order).await? else {
            return Ok(Execution::Abandoned(format!(
                "Order creation failed: {} did not accept the order",
                self.exchange.exchange_name()
            )));
        };

        tracing::info!(
            "Executed {} {} {} @ {} | SL {} TP {} | {}x, margin {:.2} | {}",
            levels.side,
            sizing.size,
            symbol,
            price,
            levels.stop_loss,
            levels.take_profit,
            leverage,
            sizing.margin_required,
            sizing.reasoning
        );

        Ok(Execution::Filled(TradeRecord {
            symbol: symbol.to_string(),
            side: levels.side,
            size: sizing.size,
            notional: sizing.notional,
            margin: sizing.margin_required,
            entry_price: price,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            leverage,
            confidence: entry.confidence,
            trend: trend.trend,
            order_id: handle.id,
            timestamp: self.clock.now(),
        }))
    }
}
