use std::{env, str::FromStr};

use log::*;
use mkt_common::DEFAULT_CURRENCY_CODE;
use rust_decimal::Decimal;

use crate::db_types::Cents;

pub const DEFAULT_PLATFORM_FEE_PERCENT: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
pub const DEFAULT_LISTING_FEE: Cents = Cents::from_const(25);
pub const DEFAULT_ORDER_METADATA_KEY: &str = "order_id";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/marketplace_ledger.db";

/// Business rules for the ledger. Constructed once at startup and passed to the API objects explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// The platform's commission, as a percentage of each sale's subtotal
    pub platform_fee_percent: Decimal,
    /// The flat fee accrued when a product is listed, unless the caller provides an amount
    pub default_listing_fee: Cents,
    /// ISO currency code used when an entry or sale does not specify one
    pub currency: String,
    /// The key in payment processor metadata that carries the marketplace order id
    pub order_metadata_key: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            platform_fee_percent: DEFAULT_PLATFORM_FEE_PERCENT,
            default_listing_fee: DEFAULT_LISTING_FEE,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            order_metadata_key: DEFAULT_ORDER_METADATA_KEY.to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn with_platform_fee_percent(mut self, percent: Decimal) -> Self {
        self.platform_fee_percent = percent;
        self
    }

    pub fn with_default_listing_fee(mut self, fee: Cents) -> Self {
        self.default_listing_fee = fee;
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_order_metadata_key<S: Into<String>>(mut self, key: S) -> Self {
        self.order_metadata_key = key.into();
        self
    }

    /// Reads the configuration from `MKT_*` environment variables. Missing or invalid values fall back to their
    /// defaults; invalid values are logged.
    pub fn from_env_or_default() -> Self {
        let platform_fee_percent = env::var("MKT_PLATFORM_FEE_PERCENT")
            .map(|s| match Decimal::from_str(s.trim()) {
                Ok(p) if p >= Decimal::ZERO && p <= Decimal::ONE_HUNDRED => p,
                Ok(p) => {
                    error!(
                        "🪛️ MKT_PLATFORM_FEE_PERCENT must be between 0 and 100. Got {p}. Using the default, \
                         {DEFAULT_PLATFORM_FEE_PERCENT}%, instead."
                    );
                    DEFAULT_PLATFORM_FEE_PERCENT
                },
                Err(e) => {
                    error!(
                        "🪛️ {s} is not a valid value for MKT_PLATFORM_FEE_PERCENT. {e} Using the default, \
                         {DEFAULT_PLATFORM_FEE_PERCENT}%, instead."
                    );
                    DEFAULT_PLATFORM_FEE_PERCENT
                },
            })
            .unwrap_or(DEFAULT_PLATFORM_FEE_PERCENT);
        let default_listing_fee = env::var("MKT_DEFAULT_LISTING_FEE_CENTS")
            .map(|s| match s.trim().parse::<i64>() {
                Ok(v) if v > 0 => Cents::from(v),
                _ => {
                    error!(
                        "🪛️ {s} is not a valid value for MKT_DEFAULT_LISTING_FEE_CENTS. It must be a positive number \
                         of cents. Using the default, {DEFAULT_LISTING_FEE}, instead."
                    );
                    DEFAULT_LISTING_FEE
                },
            })
            .unwrap_or(DEFAULT_LISTING_FEE);
        let currency = env::var("MKT_CURRENCY")
            .map(|s| {
                let s = s.trim().to_uppercase();
                if s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic()) {
                    s
                } else {
                    error!(
                        "🪛️ {s} is not a valid ISO currency code for MKT_CURRENCY. Using the default, \
                         {DEFAULT_CURRENCY_CODE}, instead."
                    );
                    DEFAULT_CURRENCY_CODE.to_string()
                }
            })
            .unwrap_or_else(|_| DEFAULT_CURRENCY_CODE.to_string());
        let order_metadata_key = env::var("MKT_ORDER_METADATA_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ORDER_METADATA_KEY.to_string());
        info!(
            "🪛️ Ledger configured with a {platform_fee_percent}% platform fee, {default_listing_fee} listing fee in \
             {currency}. Orders are correlated with the '{order_metadata_key}' metadata key."
        );
        Self { platform_fee_percent, default_listing_fee, currency, order_metadata_key }
    }
}

/// The ledger database URL, from `MKT_DATABASE_URL`.
pub fn database_url_from_env() -> String {
    env::var("MKT_DATABASE_URL").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| {
        warn!("🪛️ MKT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
        DEFAULT_DATABASE_URL.to_string()
    })
}
