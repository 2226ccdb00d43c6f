use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod paper;

pub use paper::PaperExchange;

/// Highest leverage any supported derivatives venue accepts
pub const MAX_EXCHANGE_LEVERAGE: u32 = 125;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("API error: {0}")]
    Api(String),
}

// ---------------------------------------------------------------------------
// Exchange types (venue-agnostic)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub total_balance: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
}

/// Entry order with attached stop-loss and take-profit exits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketOrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    /// Size in base units
    pub size: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

impl BracketOrderRequest {
    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        size: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Market,
            side,
            size,
            take_profit,
            stop_loss,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHandle {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Exchange trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Get account information (total balance in quote currency)
    async fn get_account_info(&self) -> Result<AccountInfo, BrokerError>;

    /// Set the leverage used for subsequent orders on `symbol`
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), BrokerError>;

    /// Submit a bracket order. `Ok(None)` means the venue did not accept it.
    async fn create_order(
        &self,
        order: BracketOrderRequest,
    ) -> Result<Option<OrderHandle>, BrokerError>;

    /// Whether this is a paper/simulated account
    fn is_paper(&self) -> bool;

    /// Exchange name for logging
    fn exchange_name(&self) -> &str;
}
