use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Trade direction. Free-text direction columns are normalized into this
/// at the ingest boundary; the core never sees raw strings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping key shared by orders and broker trades.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchKey {
    pub symbol: String,
    pub side: Side,
    pub trade_date: NaiveDate,
}

/// A client order for one trading day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Client (UCC) code.
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub trade_date: NaiveDate,
    pub quantity: u64,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        trade_date: NaiveDate,
        quantity: u64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            trade_date,
            quantity,
        }
    }

    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            symbol: self.symbol.clone(),
            side: self.side,
            trade_date: self.trade_date,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        require_text("id", &self.id)?;
        require_text("symbol", &self.symbol)
    }
}

/// A broker-executed trade. Never mutated by reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerTrade {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub trade_date: NaiveDate,
    pub quantity: u64,
    pub brokerage: Money,
    /// Securities transaction tax.
    pub stt: Money,
    /// Signed per the broker's side convention.
    pub net_amount: Money,
    /// Party code / SEBI registration code of the reporting broker, if present.
    pub broker_code: Option<String>,
}

impl BrokerTrade {
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        trade_date: NaiveDate,
        quantity: u64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            trade_date,
            quantity,
            brokerage: Money::ZERO,
            stt: Money::ZERO,
            net_amount: Money::ZERO,
            broker_code: None,
        }
    }

    pub fn with_amounts(mut self, brokerage: Money, stt: Money, net_amount: Money) -> Self {
        self.brokerage = brokerage;
        self.stt = stt;
        self.net_amount = net_amount;
        self
    }

    pub fn with_broker_code(mut self, code: impl Into<String>) -> Self {
        self.broker_code = Some(code.into());
        self
    }

    pub fn match_key(&self) -> MatchKey {
        MatchKey {
            symbol: self.symbol.clone(),
            side: self.side,
            trade_date: self.trade_date,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        require_text("id", &self.id)?;
        require_text("symbol", &self.symbol)
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), DataError> {
    if value.trim().is_empty() {
        return Err(DataError::MissingField { field });
    }
    Ok(())
}

/// Outcome label carried by every result record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultStatus {
    Matched,
    Partial,
    Excess,
    Pending,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Matched => "MATCHED",
            ResultStatus::Partial => "PARTIAL",
            ResultStatus::Excess => "EXCESS",
            ResultStatus::Pending => "PENDING",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One order-to-trade allocation with attributed costs.
/// Lands in the matched bucket (MATCHED / PARTIAL) or the excess bucket (EXCESS).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub order_id: String,
    pub trade_id: String,
    pub symbol: String,
    pub quantity: u64,
    pub status: ResultStatus,
    pub brokerage_cost: Money,
    pub stt: Money,
    pub total_cost: Money,
    pub slippage: Money,
}

/// An order for which no allocation was produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub order_id: String,
    pub symbol: String,
    pub quantity: u64,
    pub status: ResultStatus,
}

impl PendingRecord {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            quantity: order.quantity,
            status: ResultStatus::Pending,
        }
    }
}

/// An order that received some allocations but fewer units than requested.
/// Diagnostic only: it does not change the order's bucket placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub order_id: String,
    pub symbol: String,
    pub requested: u64,
    pub allocated: u64,
    pub shortfall: u64,
}

/// Which input collection a diagnostic refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Order,
    Trade,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Order => "order",
            RecordKind::Trade => "trade",
        }
    }
}

/// Recoverable, record-level data problems. The offending record is skipped
/// and the run continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataError {
    /// A required field is absent or blank.
    MissingField { field: &'static str },
    /// Quantity is negative, fractional or not a number.
    InvalidQuantity { raw: String },
    /// Any other field that could not be normalized (side, date, amount).
    InvalidField { field: &'static str, raw: String },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::MissingField { field } => write!(f, "missing required field '{field}'"),
            DataError::InvalidQuantity { raw } => {
                write!(f, "invalid quantity '{raw}': expected a non-negative integer")
            }
            DataError::InvalidField { field, raw } => {
                write!(f, "cannot parse field '{field}' from value '{raw}'")
            }
        }
    }
}

impl std::error::Error for DataError {}

/// A [`DataError`] tied to the record it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub record: RecordKind,
    /// Human-readable location, e.g. `orders.csv row 4` or `order #2`.
    pub origin: String,
    pub error: DataError,
}

impl Diagnostic {
    pub fn new(record: RecordKind, origin: impl Into<String>, error: DataError) -> Self {
        Self {
            record,
            origin: origin.into(),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.record.as_str(), self.origin, self.error)
    }
}
