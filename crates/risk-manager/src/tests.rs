#[cfg(test)]
mod risk_ledger_tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{should_reset, RiskLedger, RiskLimits};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn ledger_with_balance(balance: Decimal) -> RiskLedger {
        let mut ledger = RiskLedger::new(RiskLimits::default(), day(2));
        ledger.set_account_balance(balance, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        ledger
    }

    #[test]
    fn fresh_ledger_allows_trading() {
        let ledger = ledger_with_balance(dec!(10000));
        let check = ledger.can_trade_today("BTC/USDT:USDT");
        assert!(check.can_trade);
        assert!(check.reason.is_empty());
    }

    #[test]
    fn trade_limit_blocks_regardless_of_pnl() {
        // Profitable, flat and losing days all halt once the count is reached
        for pnl in [dec!(300), dec!(0), dec!(-10)] {
            let mut ledger = ledger_with_balance(dec!(10000));
            for _ in 0..3 {
                ledger.update_trade_result(pnl / dec!(3));
            }
            let check = ledger.can_trade_today("ETH/USDT:USDT");
            assert!(!check.can_trade, "pnl {} should still be blocked", pnl);
            assert!(check.reason.contains("3/3"));
        }
    }

    #[test]
    fn daily_loss_limit_blocks_at_threshold() {
        // 5% of 10_000 = 500
        let mut ledger = ledger_with_balance(dec!(10000));
        ledger.update_trade_result(dec!(-499.99));
        assert!(ledger.can_trade_today("SOL/USDT:USDT").can_trade);

        let mut ledger = ledger_with_balance(dec!(10000));
        ledger.update_trade_result(dec!(-500));
        let check = ledger.can_trade_today("SOL/USDT:USDT");
        assert!(!check.can_trade);
        assert!(check.reason.contains("Daily loss limit"));

        let mut ledger = ledger_with_balance(dec!(10000));
        ledger.update_trade_result(dec!(-800));
        assert!(!ledger.can_trade_today("SOL/USDT:USDT").can_trade);
    }

    #[test]
    fn loss_cap_skipped_before_first_balance() {
        let ledger = RiskLedger::new(RiskLimits::default(), day(2));
        assert_eq!(ledger.daily_loss_threshold(), None);
        assert!(ledger.can_trade_today("BTC/USDT:USDT").can_trade);
    }

    #[test]
    fn consecutive_losses_count_and_reset() {
        let mut ledger = ledger_with_balance(dec!(10000));
        ledger.update_trade_result(dec!(-10));
        ledger.update_trade_result(dec!(-5));
        assert_eq!(ledger.summary().consecutive_losses, 2);

        ledger.update_trade_result(dec!(0));
        assert_eq!(ledger.summary().consecutive_losses, 0);
    }

    #[test]
    fn optional_symbol_cap() {
        let limits = RiskLimits {
            max_trades_per_symbol: Some(2),
            ..RiskLimits::default()
        };
        let mut ledger = RiskLedger::new(limits, day(2));
        ledger.count_symbol_trade("BTC/USDT:USDT");
        ledger.count_symbol_trade("BTC/USDT:USDT");

        let check = ledger.can_trade_today("BTC/USDT:USDT");
        assert!(!check.can_trade);
        assert!(check.reason.contains("BTC/USDT:USDT"));
        assert!(ledger.can_trade_today("ETH/USDT:USDT").can_trade);
    }

    #[test]
    fn optional_consecutive_loss_halt() {
        let limits = RiskLimits {
            daily_trade_limit: 10,
            max_consecutive_losses: Some(2),
            ..RiskLimits::default()
        };
        let mut ledger = RiskLedger::new(limits, day(2));
        ledger.update_trade_result(dec!(-1));
        assert!(ledger.can_trade_today("BTC/USDT:USDT").can_trade);
        ledger.update_trade_result(dec!(-1));
        assert!(!ledger.can_trade_today("BTC/USDT:USDT").can_trade);
    }

    #[test]
    fn consecutive_loss_halt_released_next_day() {
        let limits = RiskLimits {
            daily_trade_limit: 10,
            max_consecutive_losses: Some(2),
            ..RiskLimits::default()
        };
        let mut ledger = RiskLedger::new(limits, day(2));
        ledger.update_trade_result(dec!(-1));
        ledger.update_trade_result(dec!(-1));
        assert!(!ledger.can_trade_today("BTC/USDT:USDT").can_trade);

        ledger.reset_daily_stats(day(3));

        let check = ledger.can_trade_today("BTC/USDT:USDT");
        assert!(check.can_trade, "still halted: {}", check.reason);
        assert_eq!(ledger.summary().consecutive_losses, 0);
    }

    #[test]
    fn streak_below_cap_carries_over() {
        let limits = RiskLimits {
            daily_trade_limit: 10,
            max_consecutive_losses: Some(3),
            ..RiskLimits::default()
        };
        let mut ledger = RiskLedger::new(limits, day(2));
        ledger.update_trade_result(dec!(-1));
        ledger.update_trade_result(dec!(-1));

        ledger.reset_daily_stats(day(3));
        assert_eq!(ledger.summary().consecutive_losses, 2);

        ledger.update_trade_result(dec!(-1));
        assert!(!ledger.can_trade_today("BTC/USDT:USDT").can_trade);
    }

    #[test]
    fn reset_clears_all_daily_counters() {
        let mut ledger = ledger_with_balance(dec!(10000));
        ledger.update_trade_result(dec!(-50));
        ledger.count_symbol_trade("BTC/USDT:USDT");

        ledger.reset_daily_stats(day(3));

        let state = ledger.state();
        assert_eq!(state.trading_day, day(3));
        assert_eq!(state.trades_today, 0);
        assert_eq!(state.realized_pnl, Decimal::ZERO);
        assert!(state.trades_by_symbol.is_empty());
        // Balance is account state, not daily state
        assert_eq!(ledger.account_balance(), dec!(10000));
    }

    #[test]
    fn summary_reflects_bookings() {
        let mut ledger = ledger_with_balance(dec!(2000));
        ledger.update_trade_result(dec!(12.5));
        ledger.update_trade_result(dec!(-2.5));

        let summary = ledger.summary();
        assert_eq!(summary.daily_trades, 2);
        assert_eq!(summary.daily_pnl, dec!(10));
        assert_eq!(summary.consecutive_losses, 1);
        assert_eq!(summary.account_balance, dec!(2000));
    }

    #[test]
    fn reset_only_on_forward_date_change() {
        assert!(!should_reset(day(2), day(2)));
        assert!(should_reset(day(2), day(3)));
        assert!(!should_reset(day(3), day(2)));
    }
}
