//! Gated decision pipeline for leveraged derivatives trading.
//!
//! For each symbol the [`DecisionPipeline`] checks the daily risk budget,
//! pulls multi-timeframe analysis, passes it through a quality gate and a
//! sentiment guard, sizes the position and submits a bracketed market order.

pub mod bracket;
pub mod clock;
pub mod config;
pub mod pipeline;
pub mod quality_gate;
pub mod replay;
pub mod sentiment_guard;
pub mod trade_recorder;
pub mod types;


pub use bracket::BracketLevels;
pub use clock::{Clock, SystemClock};
pub use config::{AgentConfig, ConfigError, ParameterField, ParameterUpdate, TradingParameters};
pub use pipeline::DecisionPipeline;
pub use quality_gate::ThresholdQualityGate;
pub use replay::SnapshotReplay;
pub use sentiment_guard::TrendConflictGuard;
pub use trade_recorder::{PipelineStats, TradeRecorder};
pub use types::{DecisionOutcome, TradeRecord};
