use anyhow::{bail, Result};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed-fraction position sizer for leveraged derivatives.
///
/// The base notional is a fixed percentage of account equity. It is scaled
/// down by a multiplier built from signal confidence and a quality score:
///   multiplier = min(confidence / min_confidence, 1) * clamp(quality, 0, 1)
/// so the result never exceeds the base, and any trade that cleared the
/// confidence gate with maximal quality gets the full base notional.
///
/// Volatility (ATR) never increases the notional; it only drives the
/// stop/target distances chosen by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizer {
    /// Fraction of equity committed per position, in percent (e.g. 25 = 25%)
    pub position_size_percent: Decimal,

    /// Confidence at or above which the confidence factor saturates at 1.0
    pub min_confidence: f64,

    /// Exchange leverage; determines margin, not notional
    pub leverage: u32,

    /// Smallest notional worth sending to the exchange, in quote units
    pub min_order_notional: Decimal,
}

/// Position sizing recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSize {
    /// Quote-currency value of the position
    pub notional: Decimal,

    /// balance * position_size_percent / 100, before scaling
    pub base_notional: Decimal,

    /// Applied confidence/quality multiplier (0.0 to 1.0)
    pub multiplier: f64,

    /// Size in base units (notional / price)
    pub size: Decimal,

    /// Margin the exchange will lock at the configured leverage
    pub margin_required: Decimal,

    /// Reasoning for the position size
    pub reasoning: String,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self {
            position_size_percent: Decimal::from(25),
            min_confidence: 0.65,
            leverage: 8,
            min_order_notional: Decimal::TEN,
        }
    }
}

impl PositionSizer {
    pub fn new(
        position_size_percent: Decimal,
        min_confidence: f64,
        leverage: u32,
        min_order_notional: Decimal,
    ) -> Result<Self> {
        if position_size_percent <= Decimal::ZERO || position_size_percent > Decimal::ONE_HUNDRED {
            bail!("position_size_percent must be in (0, 100]");
        }
        if !(0.0..=1.0).contains(&min_confidence) {
            bail!("min_confidence must be between 0 and 1");
        }
        if leverage == 0 {
            bail!("leverage must be at least 1");
        }
        if min_order_notional < Decimal::ZERO {
            bail!("min_order_notional must be >= 0");
        }

        Ok(Self {
            position_size_percent,
            min_confidence,
            leverage,
            min_order_notional,
        })
    }

    /// Confidence/quality multiplier, non-decreasing in both inputs and capped at 1.0
    pub fn multiplier(&self, confidence: f64, quality_score: f64) -> f64 {
        let confidence_factor = if self.min_confidence <= 0.0 {
            1.0
        } else {
            (confidence / self.min_confidence).clamp(0.0, 1.0)
        };
        let quality_factor = quality_score.clamp(0.0, 1.0);
        confidence_factor * quality_factor
    }

    /// Calculate the position notional for a trade on `symbol`
    pub fn calculate_position_size(
        &self,
        symbol: &str,
        account_balance: Decimal,
        atr: Decimal,
        current_price: Decimal,
        confidence: f64,
        quality_score: f64,
    ) -> Result<PositionSize> {
        if account_balance < Decimal::ZERO {
            bail!("{}: account balance {} is negative", symbol, account_balance);
        }
        if current_price <= Decimal::ZERO {
            bail!("{}: current price {} must be positive", symbol, current_price);
        }
        if atr < Decimal::ZERO {
            bail!("{}: ATR {} must not be negative", symbol, atr);
        }
        if !confidence.is_finite() || !quality_score.is_finite() {
            bail!("{}: confidence and quality score must be finite", symbol);
        }

        let base_notional = account_balance * self.position_size_percent / Decimal::ONE_HUNDRED;
        let multiplier = self.multiplier(confidence, quality_score);

        // A multiplier of exactly 1.0 keeps the base untouched
        let notional = if multiplier >= 1.0 {
            base_notional
        } else {
            let factor = Decimal::from_f64(multiplier).unwrap_or(Decimal::ZERO);
            (base_notional * factor).round_dp(8).min(base_notional)
        };

        let size = (notional / current_price).round_dp(8);
        let margin_required = notional / Decimal::from(self.leverage);

        let reasoning = format!(
            "Fixed fraction: {:.2} of {:.2} ({}%) x {:.2} (confidence {:.0}%, quality {:.2}), ATR {}",
            notional,
            account_balance,
            self.position_size_percent,
            multiplier,
            confidence * 100.0,
            quality_score,
            atr
        );

        tracing::debug!("{} sizing: {}", symbol, reasoning);

        Ok(PositionSize {
            notional,
            base_notional,
            multiplier,
            size,
            margin_required,
            reasoning,
        })
    }

    /// Whether a notional clears the minimum order floor
    pub fn is_viable(&self, notional: Decimal) -> bool {
        notional >= self.min_order_notional
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn full_size_at_max_confidence_and_quality() {
        let sizer = PositionSizer::default();

        let result = sizer
            .calculate_position_size("BTC/USDT:USDT", dec!(10000), dec!(2), dec!(100), 1.0, 1.0)
            .unwrap();

        // 25% of 10_000
        assert_eq!(result.notional, dec!(2500));
        assert_eq!(result.size, dec!(25));
        assert_eq!(result.margin_required, dec!(312.5));
    }

    #[test]
    fn gated_confidence_sizes_at_full_base() {
        let sizer = PositionSizer::default();

        // Anything at or above min_confidence saturates
        let result = sizer
            .calculate_position_size("ETH/USDT:USDT", dec!(10000), dec!(2), dec!(100), 0.65, 1.0)
            .unwrap();
        assert_eq!(result.notional, dec!(2500));
    }

    #[test]
    fn low_confidence_scales_down() {
        let sizer = PositionSizer::default();

        let result = sizer
            .calculate_position_size("ETH/USDT:USDT", dec!(10000), dec!(2), dec!(100), 0.325, 1.0)
            .unwrap();
        assert_relative_eq!(result.multiplier, 0.5, epsilon = 1e-9);
        assert_eq!(result.notional, dec!(1250));
    }

    #[test]
    fn monotone_in_confidence_and_quality() {
        let sizer = PositionSizer::default();
        let grid = [0.0, 0.1, 0.3, 0.5, 0.65, 0.8, 1.0];
        let balance = dec!(7321.55);
        let cap = balance * dec!(25) / dec!(100);

        for &quality in &grid {
            let mut previous = Decimal::ZERO;
            for &confidence in &grid {
                let n = sizer
                    .calculate_position_size("SOL/USDT:USDT", balance, dec!(3), dec!(150), confidence, quality)
                    .unwrap()
                    .notional;
                assert!(n >= previous, "confidence {} quality {}", confidence, quality);
                assert!(n <= cap);
                previous = n;
            }
        }

        for &confidence in &grid {
            let mut previous = Decimal::ZERO;
            for &quality in &grid {
                let n = sizer
                    .calculate_position_size("SOL/USDT:USDT", balance, dec!(3), dec!(150), confidence, quality)
                    .unwrap()
                    .notional;
                assert!(n >= previous, "confidence {} quality {}", confidence, quality);
                previous = n;
            }
        }
    }

    #[test]
    fn atr_does_not_change_notional() {
        let sizer = PositionSizer::default();
        let calm = sizer
            .calculate_position_size("BNB/USDT:USDT", dec!(5000), dec!(0.5), dec!(600), 0.9, 1.0)
            .unwrap();
        let wild = sizer
            .calculate_position_size("BNB/USDT:USDT", dec!(5000), dec!(60), dec!(600), 0.9, 1.0)
            .unwrap();
        assert_eq!(calm.notional, wild.notional);
    }

    #[test]
    fn viability_floor() {
        let sizer = PositionSizer::default();
        let result = sizer
            .calculate_position_size("BTC/USDT:USDT", dec!(32), dec!(2), dec!(100), 1.0, 1.0)
            .unwrap();
        assert_eq!(result.notional, dec!(8));
        assert!(!sizer.is_viable(result.notional));
        assert!(sizer.is_viable(dec!(10)));
    }

    #[test]
    fn invalid_inputs_rejected() {
        let sizer = PositionSizer::default();
        assert!(sizer
            .calculate_position_size("X", dec!(100), dec!(1), dec!(0), 0.9, 1.0)
            .is_err());
        assert!(sizer
            .calculate_position_size("X", dec!(-1), dec!(1), dec!(10), 0.9, 1.0)
            .is_err());
        assert!(sizer
            .calculate_position_size("X", dec!(100), dec!(-1), dec!(10), 0.9, 1.0)
            .is_err());
        assert!(sizer
            .calculate_position_size("X", dec!(100), dec!(1), dec!(10), f64::NAN, 1.0)
            .is_err());
    }

    #[test]
    fn constructor_validation() {
        assert!(PositionSizer::new(dec!(0), 0.65, 8, dec!(10)).is_err());
        assert!(PositionSizer::new(dec!(101), 0.65, 8, dec!(10)).is_err());
        assert!(PositionSizer::new(dec!(25), 1.5, 8, dec!(10)).is_err());
        assert!(PositionSizer::new(dec!(25), 0.65, 0, dec!(10)).is_err());

        let sizer = PositionSizer::new(dec!(20), 0.7, 5, dec!(10)).unwrap();
        assert_eq!(sizer.leverage, 5);
    }
}
