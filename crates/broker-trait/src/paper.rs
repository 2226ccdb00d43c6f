//! In-process simulated exchange.
//!
//! Accepts bracket orders without touching a venue, tracks leverage per
//! symbol, and keeps the submitted orders for inspection.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    AccountInfo, BracketOrderRequest, BrokerError, ExchangeClient, OrderHandle, OrderSide,
    MAX_EXCHANGE_LEVERAGE,
};

#[derive(Debug, Default)]
struct PaperState {
    balance: Decimal,
    leverage: HashMap<String, u32>,
    orders: Vec<BracketOrderRequest>,
}

pub struct PaperExchange {
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            state: Mutex::new(PaperState {
                balance: starting_balance,
                ..PaperState::default()
            }),
        }
    }

    pub async fn set_balance(&self, balance: Decimal) {
        self.state.lock().await.balance = balance;
    }

    pub async fn leverage_for(&self, symbol: &str) -> Option<u32> {
        self.state.lock().await.leverage.get(symbol).copied()
    }

    pub async fn submitted_orders(&self) -> Vec<BracketOrderRequest> {
        self.state.lock().await.orders.clone()
    }
}

/// Reject brackets whose exits sit on the wrong side of each other
fn check_bracket(order: &BracketOrderRequest) -> Result<(), BrokerError> {
    if order.size <= Decimal::ZERO {
        return Err(BrokerError::InvalidRequest(format!(
            "order size {} must be positive",
            order.size
        )));
    }
    let ordered = match order.side {
        OrderSide::Buy => order.stop_loss < order.take_profit,
        OrderSide::Sell => order.stop_loss > order.take_profit,
    };
    if !ordered {
        return Err(BrokerError::InvalidRequest(format!(
            "{} bracket has stop {} and target {} on the wrong sides",
            order.side, order.stop_loss, order.take_profit
        )));
    }
    Ok(())
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    async fn get_account_info(&self) -> Result<AccountInfo, BrokerError> {
        let state = self.state.lock().await;
        Ok(AccountInfo {
            total_balance: state.balance,
            currency: Some("USDT".to_string()),
        })
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), BrokerError> {
        if leverage == 0 || leverage > MAX_EXCHANGE_LEVERAGE {
            return Err(BrokerError::InvalidRequest(format!(
                "leverage {} outside 1..={}",
                leverage, MAX_EXCHANGE_LEVERAGE
            )));
        }
        self.state
            .lock()
            .await
            .leverage
            .insert(symbol.to_string(), leverage);
        tracing::debug!("Paper exchange: leverage for {} set to {}x", symbol, leverage);
        Ok(())
    }

    async fn create_order(
        &self,
        order: BracketOrderRequest,
    ) -> Result<Option<OrderHandle>, BrokerError> {
        check_bracket(&order)?;

        let handle = OrderHandle {
            id: Uuid::new_v4().to_string(),
            symbol: order.symbol.clone(),
            side: order.side,
            size: order.size,
            created_at: Utc::now(),
        };
        tracing::info!(
            "Paper exchange: {} {} {} (SL {}, TP {}) -> order {}",
            order.side,
            order.size,
            order.symbol,
            order.stop_loss,
            order.take_profit,
            handle.id
        );
        self.state.lock().await.orders.push(order);
        Ok(Some(handle))
    }

    fn is_paper(&self) -> bool {
        true
    }

    fn exchange_name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn accepts_well_formed_bracket() {
        let exchange = PaperExchange::new(dec!(1000));
        let order =
            BracketOrderRequest::market("ETH/USDT:USDT", OrderSide::Buy, dec!(0.5), dec!(106), dec!(97));

        let handle = exchange.create_order(order).await.unwrap().unwrap();
        assert_eq!(handle.symbol, "ETH/USDT:USDT");
        assert_eq!(exchange.submitted_orders().await.len(), 1);
    }

    #[tokio::test]
    async fn rejects_inverted_bracket() {
        let exchange = PaperExchange::new(dec!(1000));
        let order =
            BracketOrderRequest::market("ETH/USDT:USDT", OrderSide::Sell, dec!(0.5), dec!(106), dec!(97));

        assert!(exchange.create_order(order).await.is_err());
        assert!(exchange.submitted_orders().await.is_empty());
    }

    #[tokio::test]
    async fn leverage_bounds_enforced() {
        let exchange = PaperExchange::new(dec!(1000));
        assert!(exchange.set_leverage("BTC/USDT:USDT", 0).await.is_err());
        assert!(exchange.set_leverage("BTC/USDT:USDT", 126).await.is_err());

        exchange.set_leverage("BTC/USDT:USDT", 8).await.unwrap();
        assert_eq!(exchange.leverage_for("BTC/USDT:USDT").await, Some(8));
    }

    #[tokio::test]
    async fn reports_current_balance() {
        let exchange = PaperExchange::new(dec!(1000));
        exchange.set_balance(dec!(2500)).await;
        let info = exchange.get_account_info().await.unwrap();
        assert_eq!(info.total_balance, dec!(2500));
        assert!(exchange.is_paper());
    }
}
