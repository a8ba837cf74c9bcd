use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use mkt_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::traits::LedgerError;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}")]
pub struct ConversionError(String);

//--------------------------------------   LedgerEntryType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    /// Goods revenue credited to the seller
    SaleSubtotal,
    /// Shipping charged to the buyer and passed through to the seller
    ShippingCollected,
    /// The platform's percentage commission on the subtotal
    PlatformFee,
    /// Tax collected on the marketplace's behalf. Informational only.
    TaxCollected,
    /// A flat listing fee owed by the seller, recovered from future sales
    ListingFeeAccrued,
    /// Audit record of a listing fee debt being recovered. Informational only.
    ListingFeeSettled,
    /// Money returned to a buyer and debited from the seller
    Refund,
    /// Manual correction, either sign. Also notes, without touching the balance, listing fee recovery that was
    /// withheld from a sale but did not settle a whole fee.
    Adjustment,
}

impl LedgerEntryType {
    pub const ALL: [LedgerEntryType; 8] = [
        Self::SaleSubtotal,
        Self::ShippingCollected,
        Self::PlatformFee,
        Self::TaxCollected,
        Self::ListingFeeAccrued,
        Self::ListingFeeSettled,
        Self::Refund,
        Self::Adjustment,
    ];

    /// Whether entries of this type count towards the seller's balance unless told otherwise.
    pub fn affects_balance_by_default(&self) -> bool {
        !matches!(self, Self::TaxCollected | Self::ListingFeeSettled)
    }

    /// The sign an amount of this type must carry. `None` means either sign is acceptable.
    pub fn required_sign(&self) -> Option<AmountSign> {
        match self {
            Self::SaleSubtotal | Self::ShippingCollected | Self::TaxCollected | Self::ListingFeeSettled => {
                Some(AmountSign::Credit)
            },
            Self::PlatformFee | Self::ListingFeeAccrued | Self::Refund => Some(AmountSign::Debit),
            Self::Adjustment => None,
        }
    }
}

impl Display for LedgerEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SaleSubtotal => "SALE_SUBTOTAL",
            Self::ShippingCollected => "SHIPPING_COLLECTED",
            Self::PlatformFee => "PLATFORM_FEE",
            Self::TaxCollected => "TAX_COLLECTED",
            Self::ListingFeeAccrued => "LISTING_FEE_ACCRUED",
            Self::ListingFeeSettled => "LISTING_FEE_SETTLED",
            Self::Refund => "REFUND",
            Self::Adjustment => "ADJUSTMENT",
        };
        f.write_str(s)
    }
}

impl FromStr for LedgerEntryType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.to_string() == s)
            .copied()
            .ok_or_else(|| LedgerError::ValidationError(format!("Unrecognised ledger entry type: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSign {
    Credit,
    Debit,
}

impl AmountSign {
    pub fn matches(&self, amount: Cents) -> bool {
        match self {
            AmountSign::Credit => amount.is_positive(),
            AmountSign::Debit => amount.is_negative(),
        }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     LedgerEntry      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub store_id: i64,
    pub entry_type: LedgerEntryType,
    pub amount: Cents,
    pub currency: String,
    pub affects_seller_balance: bool,
    pub order_id: Option<OrderId>,
    pub order_item_id: Option<i64>,
    pub product_id: Option<i64>,
    pub description: Option<String>,
    pub is_settled: bool,
    pub settled_at: Option<DateTime<Utc>>,
    pub settled_order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The amount owed by the seller for an accrued listing fee. Zero for every other entry type.
    pub fn debt(&self) -> Cents {
        match self.entry_type {
            LedgerEntryType::ListingFeeAccrued => self.amount.abs(),
            _ => Cents::ZERO,
        }
    }

    pub fn balance_contribution(&self) -> Cents {
        if self.affects_seller_balance {
            self.amount
        } else {
            Cents::ZERO
        }
    }
}

//--------------------------------------    NewLedgerEntry    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub store_id: i64,
    pub entry_type: LedgerEntryType,
    pub amount: Cents,
    /// When `None`, the configured default currency is used
    pub currency: Option<String>,
    pub affects_seller_balance: bool,
    pub order_id: Option<OrderId>,
    pub order_item_id: Option<i64>,
    pub product_id: Option<i64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn new(store_id: i64, entry_type: LedgerEntryType, amount: Cents) -> Self {
        Self {
            store_id,
            entry_type,
            amount,
            currency: None,
            affects_seller_balance: entry_type.affects_balance_by_default(),
            order_id: None,
            order_item_id: None,
            product_id: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_order_item_id(mut self, order_item_id: i64) -> Self {
        self.order_item_id = Some(order_item_id);
        self
    }

    pub fn with_product_id(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn informational(mut self) -> Self {
        self.affects_seller_balance = false;
        self
    }

    /// Checks the entry before anything is written. A malformed entry is never committed.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.store_id <= 0 {
            return Err(LedgerError::ValidationError(format!(
                "A ledger entry requires a store id. Got {}",
                self.store_id
            )));
        }
        if self.amount.is_zero() {
            return Err(LedgerError::ValidationError(format!(
                "{} entry for store {} has a zero amount",
                self.entry_type, self.store_id
            )));
        }
        if let Some(sign) = self.entry_type.required_sign() {
            if !sign.matches(self.amount) {
                return Err(LedgerError::ValidationError(format!(
                    "{} entries must be {}. Got {}",
                    self.entry_type,
                    if sign == AmountSign::Credit { "positive" } else { "negative" },
                    self.amount
                )));
            }
        }
        if let Some(currency) = &self.currency {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(LedgerError::ValidationError(format!("{currency} is not an ISO currency code")));
            }
        }
        Ok(())
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Checkout has started and payment has not been confirmed
    Pending,
    /// The processor has confirmed payment
    Processing,
    /// The processor reported a failed payment attempt. A later attempt may still succeed.
    PaymentFailed,
    /// The order has been refunded (in full or in part)
    Refunded,
    /// The order was cancelled by the buyer, seller or an admin
    Cancelled,
}

impl OrderStatusType {
    /// Terminal statuses are never changed by processor events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded | Self::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "PENDING"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::PaymentFailed => write!(f, "PAYMENT_FAILED"),
            OrderStatusType::Refunded => write!(f, "REFUNDED"),
            OrderStatusType::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "PAYMENT_FAILED" => Ok(Self::PaymentFailed),
            "REFUNDED" => Ok(Self::Refunded),
            "CANCELLED" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("order status: {s}"))),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
/// The ledger's local view of a marketplace order. Only the fields that payment reconciliation touches are kept here.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub store_id: Option<i64>,
    pub total_price: Cents,
    pub currency: String,
    pub status: OrderStatusType,
    pub payment_intent_id: Option<String>,
    pub charge_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The order id as assigned by the checkout flow. This is the correlation id carried in processor metadata.
    pub order_id: OrderId,
    /// The seller store fulfilling the order, if it has been assigned yet
    pub store_id: Option<i64>,
    pub total_price: Cents,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, total_price: Cents) -> Self {
        Self {
            order_id,
            store_id: None,
            total_price,
            currency: mkt_common::DEFAULT_CURRENCY_CODE.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn for_store(mut self, store_id: i64) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

//--------------------------------------    IdempotencyKey     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub id: i64,
    pub idempotency_key: String,
    pub operation_type: String,
    pub resource_id: String,
    pub used_at: DateTime<Utc>,
}

//--------------------------------------     WebhookEvent      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
}
