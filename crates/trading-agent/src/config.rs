use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use position_sizer::PositionSizer;
use risk_manager::RiskLimits;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest leverage accepted by the parameter validation
pub const MAX_LEVERAGE: u32 = broker_trait::MAX_EXCHANGE_LEVERAGE;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidValue {
        field: ParameterField,
        value: String,
        reason: String,
    },

    #[error("{field} out of range: {reason}")]
    OutOfRange {
        field: ParameterField,
        reason: String,
    },
}

/// The set of parameters that may be changed at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterField {
    Leverage,
    PositionSizePercent,
    MaxDailyLossPercent,
    DailyTradeLimit,
    MinConfidence,
    MinAdx,
    MinOrderNotional,
    MaxTradesPerSymbol,
    MaxConsecutiveLosses,
    TradingPairs,
}

impl ParameterField {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterField::Leverage => "leverage",
            ParameterField::PositionSizePercent => "position_size_percent",
            ParameterField::MaxDailyLossPercent => "max_daily_loss_percent",
            ParameterField::DailyTradeLimit => "daily_trade_limit",
            ParameterField::MinConfidence => "min_confidence",
            ParameterField::MinAdx => "min_adx",
            ParameterField::MinOrderNotional => "min_order_notional",
            ParameterField::MaxTradesPerSymbol => "max_trades_per_symbol",
            ParameterField::MaxConsecutiveLosses => "max_consecutive_losses",
            ParameterField::TradingPairs => "trading_pairs",
        }
    }

    /// Environment variable carrying this parameter
    pub fn env_key(&self) -> String {
        self.name().to_ascii_uppercase()
    }

    pub fn all() -> [ParameterField; 10] {
        [
            ParameterField::Leverage,
            ParameterField::PositionSizePercent,
            ParameterField::MaxDailyLossPercent,
            ParameterField::DailyTradeLimit,
            ParameterField::MinConfidence,
            ParameterField::MinAdx,
            ParameterField::MinOrderNotional,
            ParameterField::MaxTradesPerSymbol,
            ParameterField::MaxConsecutiveLosses,
            ParameterField::TradingPairs,
        ]
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterField {
    type Err = ConfigError;

    /// Accepts both `daily_trade_limit` and `DAILY_TRADE_LIMIT`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ParameterField::all()
            .into_iter()
            .find(|f| f.name() == normalized)
            .ok_or_else(|| ConfigError::UnknownParameter(s.to_string()))
    }
}

/// Trading parameters shared by the ledger, sizer and gates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingParameters {
    pub leverage: u32,                       // 5-10x in practice
    pub position_size_percent: Decimal,      // 25% of equity
    pub max_daily_loss_percent: Decimal,     // 5%
    pub daily_trade_limit: u32,              // 3 trades/day
    pub min_confidence: f64,                 // 0.65
    pub min_adx: f64,                        // 20
    pub min_order_notional: Decimal,         // 10 USDT
    pub max_trades_per_symbol: Option<u32>,
    pub max_consecutive_losses: Option<u32>,
    pub trading_pairs: Vec<String>,
}

impl Default for TradingParameters {
    fn default() -> Self {
        Self {
            leverage: 8,
            position_size_percent: Decimal::from(25),
            max_daily_loss_percent: Decimal::from(5),
            daily_trade_limit: 3,
            min_confidence: 0.65,
            min_adx: 20.0,
            min_order_notional: Decimal::TEN,
            max_trades_per_symbol: None,
            max_consecutive_losses: None,
            trading_pairs: vec![
                "BTC/USDT:USDT".to_string(),
                "ETH/USDT:USDT".to_string(),
                "SOL/USDT:USDT".to_string(),
                "BNB/USDT:USDT".to_string(),
            ],
        }
    }
}

fn check_percent(field: ParameterField, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ConfigError::OutOfRange {
            field,
            reason: format!("{} must be in (0, 100]", value),
        });
    }
    Ok(())
}

impl TradingParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leverage == 0 || self.leverage > MAX_LEVERAGE {
            return Err(ConfigError::OutOfRange {
                field: ParameterField::Leverage,
                reason: format!("{} must be in 1..={}", self.leverage, MAX_LEVERAGE),
            });
        }
        check_percent(ParameterField::PositionSizePercent, self.position_size_percent)?;
        check_percent(ParameterField::MaxDailyLossPercent, self.max_daily_loss_percent)?;

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::OutOfRange {
                field: ParameterField::MinConfidence,
                reason: format!("{} must be in [0, 1]", self.min_confidence),
            });
        }
        if !(0.0..=100.0).contains(&self.min_adx) {
            return Err(ConfigError::OutOfRange {
                field: ParameterField::MinAdx,
                reason: format!("{} must be in [0, 100]", self.min_adx),
            });
        }
        if self.min_order_notional < Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: ParameterField::MinOrderNotional,
                reason: format!("{} must not be negative", self.min_order_notional),
            });
        }
        if self.trading_pairs.is_empty() {
            return Err(ConfigError::OutOfRange {
                field: ParameterField::TradingPairs,
                reason: "at least one symbol is required".to_string(),
            });
        }
        for (i, pair) in self.trading_pairs.iter().enumerate() {
            if pair.trim().is_empty() {
                return Err(ConfigError::OutOfRange {
                    field: ParameterField::TradingPairs,
                    reason: "symbols must not be blank".to_string(),
                });
            }
            if self.trading_pairs[..i].contains(pair) {
                return Err(ConfigError::OutOfRange {
                    field: ParameterField::TradingPairs,
                    reason: format!("duplicate symbol {}", pair),
                });
            }
        }
        Ok(())
    }

    /// Apply a typed update. Either every field is applied or none is.
    pub fn apply(&mut self, update: ParameterUpdate) -> Result<Vec<ParameterField>, ConfigError> {
        let mut next = self.clone();
        let mut changed = Vec::new();

        if let Some(v) = update.leverage {
            next.leverage = v;
            changed.push(ParameterField::Leverage);
        }
        if let Some(v) = update.position_size_percent {
            next.position_size_percent = v;
            changed.push(ParameterField::PositionSizePercent);
        }
        if let Some(v) = update.max_daily_loss_percent {
            next.max_daily_loss_percent = v;
            changed.push(ParameterField::MaxDailyLossPercent);
        }
        if let Some(v) = update.daily_trade_limit {
            next.daily_trade_limit = v;
            changed.push(ParameterField::DailyTradeLimit);
        }
        if let Some(v) = update.min_confidence {
            next.min_confidence = v;
            changed.push(ParameterField::MinConfidence);
        }
        if let Some(v) = update.min_adx {
            next.min_adx = v;
            changed.push(ParameterField::MinAdx);
        }
        if let Some(v) = update.min_order_notional {
            next.min_order_notional = v;
            changed.push(ParameterField::MinOrderNotional);
        }
        if let Some(v) = update.max_trades_per_symbol {
            next.max_trades_per_symbol = v;
            changed.push(ParameterField::MaxTradesPerSymbol);
        }
        if let Some(v) = update.max_consecutive_losses {
            next.max_consecutive_losses = v;
            changed.push(ParameterField::MaxConsecutiveLosses);
        }
        if let Some(v) = update.trading_pairs {
            next.trading_pairs = v;
            changed.push(ParameterField::TradingPairs);
        }

        next.validate()?;
        *self = next;

        for field in &changed {
            tracing::info!("Configuration updated: {}", field);
        }
        Ok(changed)
    }

    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            daily_trade_limit: self.daily_trade_limit,
            max_daily_loss_percent: self.max_daily_loss_percent,
            max_trades_per_symbol: self.max_trades_per_symbol,
            max_consecutive_losses: self.max_consecutive_losses,
        }
    }

    pub fn position_sizer(&self) -> PositionSizer {
        PositionSizer {
            position_size_percent: self.position_size_percent,
            min_confidence: self.min_confidence,
            leverage: self.leverage,
            min_order_notional: self.min_order_notional,
        }
    }

    pub fn summary(&self) -> ParameterSummary {
        ParameterSummary {
            leverage: self.leverage,
            position_size_percent: self.position_size_percent,
            max_daily_loss_percent: self.max_daily_loss_percent,
            daily_trade_limit: self.daily_trade_limit,
            min_confidence: self.min_confidence,
            min_adx: self.min_adx,
            trading_pairs: self.trading_pairs.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub leverage: u32,
    pub position_size_percent: Decimal,
    pub max_daily_loss_percent: Decimal,
    pub daily_trade_limit: u32,
    pub min_confidence: f64,
    pub min_adx: f64,
    pub trading_pairs: Vec<String>,
}

/// Typed parameter update. `None` leaves a field untouched; for the optional
/// caps, `Some(None)` clears the cap. Built from name/value pairs through
/// [`ParameterUpdate::from_pairs`] or field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterUpdate {
    pub leverage: Option<u32>,
    pub position_size_percent: Option<Decimal>,
    pub max_daily_loss_percent: Option<Decimal>,
    pub daily_trade_limit: Option<u32>,
    pub min_confidence: Option<f64>,
    pub min_adx: Option<f64>,
    pub min_order_notional: Option<Decimal>,
    pub max_trades_per_symbol: Option<Option<u32>>,
    pub max_consecutive_losses: Option<Option<u32>>,
    pub trading_pairs: Option<Vec<String>>,
}

fn parse_value<T>(field: ParameterField, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_optional_cap(field: ParameterField, raw: &str) -> Result<Option<u32>, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "none" | "off" => Ok(None),
        _ => parse_value(field, raw).map(Some),
    }
}

impl ParameterUpdate {
    /// Build an update from `(name, value)` pairs. Unknown names are an error.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut update = Self::default();
        for (name, value) in pairs {
            let field: ParameterField = name.as_ref().parse()?;
            update.set(field, value.as_ref())?;
        }
        Ok(update)
    }

    /// Parse `raw` into the slot for `field`
    pub fn set(&mut self, field: ParameterField, raw: &str) -> Result<(), ConfigError> {
        match field {
            ParameterField::Leverage => self.leverage = Some(parse_value(field, raw)?),
            ParameterField::PositionSizePercent => {
                self.position_size_percent = Some(parse_value(field, raw)?)
            }
            ParameterField::MaxDailyLossPercent => {
                self.max_daily_loss_percent = Some(parse_value(field, raw)?)
            }
            ParameterField::DailyTradeLimit => {
                self.daily_trade_limit = Some(parse_value(field, raw)?)
            }
            ParameterField::MinConfidence => self.min_confidence = Some(parse_value(field, raw)?),
            ParameterField::MinAdx => self.min_adx = Some(parse_value(field, raw)?),
            ParameterField::MinOrderNotional => {
                self.min_order_notional = Some(parse_value(field, raw)?)
            }
            ParameterField::MaxTradesPerSymbol => {
                self.max_trades_per_symbol = Some(parse_optional_cap(field, raw)?)
            }
            ParameterField::MaxConsecutiveLosses => {
                self.max_consecutive_losses = Some(parse_optional_cap(field, raw)?)
            }
            ParameterField::TradingPairs => {
                self.trading_pairs = Some(
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                )
            }
        }
        Ok(())
    }
}

/// Exchange and sentiment API credentials
#[derive(Clone, Default)]
pub struct ApiCredentials {
    pub exchange_api_key: String,
    pub exchange_secret: String,
    pub sentiment_api_key: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |s: &str| if s.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("ApiCredentials")
            .field("exchange_api_key", &mask(self.exchange_api_key.as_str()))
            .field("exchange_secret", &mask(self.exchange_secret.as_str()))
            .field("sentiment_api_key", &mask(self.sentiment_api_key.as_str()))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub parameters: TradingParameters,
    pub credentials: ApiCredentials,
    pub scan_interval_seconds: u64, // 300 (5 minutes)
    pub snapshot_file: PathBuf,
    pub paper_balance: Decimal,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        let mut update = ParameterUpdate::default();
        for field in ParameterField::all() {
            if let Ok(raw) = env::var(field.env_key()) {
                update
                    .set(field, &raw)
                    .with_context(|| format!("{} is invalid", field.env_key()))?;
            }
        }

        let mut parameters = TradingParameters::default();
        parameters
            .apply(update)
            .context("trading parameters from environment are invalid")?;

        let config = Self {
            parameters,
            credentials: ApiCredentials {
                exchange_api_key: env::var("EXCHANGE_API_KEY").unwrap_or_default(),
                exchange_secret: env::var("EXCHANGE_SECRET").unwrap_or_default(),
                sentiment_api_key: env::var("SENTIMENT_API_KEY").unwrap_or_default(),
            },
            scan_interval_seconds: env::var("SCAN_INTERVAL")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("SCAN_INTERVAL must be a number of seconds")?,
            snapshot_file: env::var("SNAPSHOT_FILE")
                .unwrap_or_else(|_| "snapshots.json".to_string())
                .into(),
            paper_balance: env::var("PAPER_BALANCE")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .context("PAPER_BALANCE must be a decimal amount")?,
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_are_valid() {
        let params = TradingParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.leverage, 8);
        assert_eq!(params.trading_pairs.len(), 4);
    }

    #[test]
    fn field_names_parse_in_both_cases() {
        assert_eq!(
            "DAILY_TRADE_LIMIT".parse::<ParameterField>().unwrap(),
            ParameterField::DailyTradeLimit
        );
        assert_eq!("min_adx".parse::<ParameterField>().unwrap(), ParameterField::MinAdx);
        assert_eq!(
            "GROK_MODEL".parse::<ParameterField>(),
            Err(ConfigError::UnknownParameter("GROK_MODEL".to_string()))
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = ParameterUpdate::from_pairs([("leverage", "5"), ("turbo", "on")]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownParameter("turbo".to_string()));
    }

    #[test]
    fn update_applies_recognized_fields() {
        let mut params = TradingParameters::default();
        let update = ParameterUpdate::from_pairs([
            ("LEVERAGE", "5"),
            ("position_size_percent", "20"),
            ("trading_pairs", "BTC/USDT:USDT, ETH/USDT:USDT"),
            ("max_trades_per_symbol", "2"),
        ])
        .unwrap();

        let changed = params.apply(update).unwrap();
        assert_eq!(changed.len(), 4);
        assert_eq!(params.leverage, 5);
        assert_eq!(params.position_size_percent, dec!(20));
        assert_eq!(params.trading_pairs, vec!["BTC/USDT:USDT", "ETH/USDT:USDT"]);
        assert_eq!(params.max_trades_per_symbol, Some(2));
    }

    #[test]
    fn invalid_update_leaves_parameters_untouched() {
        let mut params = TradingParameters::default();
        let update = ParameterUpdate {
            leverage: Some(10),
            max_daily_loss_percent: Some(dec!(150)),
            ..ParameterUpdate::default()
        };

        let err = params.apply(update).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: ParameterField::MaxDailyLossPercent,
                ..
            }
        ));
        assert_eq!(params, TradingParameters::default());
    }

    #[test]
    fn bounds_enforced() {
        for (name, value) in [
            ("leverage", "0"),
            ("leverage", "200"),
            ("position_size_percent", "0"),
            ("min_confidence", "1.5"),
            ("min_adx", "-1"),
            ("trading_pairs", ""),
            ("trading_pairs", "BTC/USDT:USDT,BTC/USDT:USDT"),
        ] {
            let mut params = TradingParameters::default();
            let update = ParameterUpdate::from_pairs([(name, value)]).unwrap();
            assert!(params.apply(update).is_err(), "{}={} should be rejected", name, value);
        }
    }

    #[test]
    fn unparsable_value_reported() {
        let err = ParameterUpdate::from_pairs([("daily_trade_limit", "three")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: ParameterField::DailyTradeLimit,
                ..
            }
        ));
    }

    #[test]
    fn optional_caps_can_be_cleared() {
        let mut params = TradingParameters {
            max_consecutive_losses: Some(3),
            ..TradingParameters::default()
        };
        let untouched = ParameterUpdate {
            leverage: Some(6),
            ..ParameterUpdate::default()
        };
        params.apply(untouched).unwrap();
        assert_eq!(params.max_consecutive_losses, Some(3));

        let update = ParameterUpdate::from_pairs([("max_consecutive_losses", "none")]).unwrap();
        assert_eq!(update.max_consecutive_losses, Some(None));
        params.apply(update).unwrap();
        assert_eq!(params.max_consecutive_losses, None);
    }

    #[test]
    fn derived_components_follow_parameters() {
        let params = TradingParameters::default();
        let limits = params.risk_limits();
        assert_eq!(limits.daily_trade_limit, 3);
        assert_eq!(limits.max_daily_loss_percent, dec!(5));

        let sizer = params.position_sizer();
        assert_eq!(sizer.position_size_percent, dec!(25));
        assert_eq!(sizer.leverage, 8);
    }

    #[test]
    fn summary_reports_trading_parameters() {
        let summary = TradingParameters::default().summary();
        assert_eq!(summary.leverage, 8);
        assert_eq!(summary.daily_trade_limit, 3);
        assert_eq!(summary.trading_pairs[0], "BTC/USDT:USDT");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["min_adx"], 20.0);
    }

    #[test]
    fn credentials_are_redacted_in_debug() {
        let creds = ApiCredentials {
            exchange_api_key: "key-123".to_string(),
            exchange_secret: "shh".to_string(),
            sentiment_api_key: String::new(),
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("key-123"));
        assert!(printed.contains("<unset>"));
    }
}
