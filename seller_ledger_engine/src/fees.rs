//! Platform fee and listing-fee recovery for a single transaction.
//!
//! The calculation is a pure function of its four inputs, so a fee breakdown can always be re-derived when auditing a
//! sale.
use mkt_common::MoneyError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db_types::Cents;

/// The amounts the platform withholds from a seller's proceeds for one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeFeeBreakdown {
    /// The platform's percentage commission. Charged on the subtotal only.
    pub platform_fee_cents: Cents,
    /// The part of the seller's outstanding listing-fee debt recovered from this transaction.
    pub listing_fee_applied_cents: Cents,
    /// `platform_fee_cents + listing_fee_applied_cents`
    pub application_fee_cents: Cents,
}

/// Calculates the fee breakdown for a transaction.
///
/// * The platform fee is `platform_fee_percent` of the subtotal, rounded half-up. Shipping passes through to the
///   seller and is not part of the fee base.
/// * The listing fee recovered is the outstanding debt, capped at the seller-facing revenue of this transaction
///   (subtotal plus shipping). It is never negative.
pub fn calculate(
    subtotal: Cents,
    shipping: Cents,
    platform_fee_percent: Decimal,
    outstanding_listing_fee: Cents,
) -> Result<StripeFeeBreakdown, MoneyError> {
    if platform_fee_percent.is_sign_negative() || platform_fee_percent > Decimal::ONE_HUNDRED {
        return Err(MoneyError::InvalidPercentage(platform_fee_percent));
    }
    let platform_fee_cents = subtotal.max(Cents::ZERO).percent_of(platform_fee_percent)?;
    let revenue = subtotal
        .checked_add(shipping)
        .ok_or_else(|| MoneyError::PrecisionError(format!("{subtotal} + {shipping} overflows")))?
        .max(Cents::ZERO);
    let listing_fee_applied_cents = outstanding_listing_fee.min(revenue).max(Cents::ZERO);
    let application_fee_cents = platform_fee_cents.checked_add(listing_fee_applied_cents).ok_or_else(|| {
        MoneyError::PrecisionError(format!("{platform_fee_cents} + {listing_fee_applied_cents} overflows"))
    })?;
    Ok(StripeFeeBreakdown { platform_fee_cents, listing_fee_applied_cents, application_fee_cents })
}
