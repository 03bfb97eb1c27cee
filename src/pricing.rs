//! Nightly pricing.
//!
//! A stay is charged per night. Night `n` of a stay starting at `start` is
//! the calendar date `date_of(start) + n`, and a stay has exactly
//! [`day_count`] nights. Each night costs the date's override when one is
//! set, otherwise the base rate. All arithmetic is `Decimal`; nothing here
//! touches floating point.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::BookingError;
use crate::limits::MAX_PRICE_UNITS;
use crate::model::{DAY_MS, DailyRate, Ms, NightPrice, date_of};

/// Snapshot of the base rate plus the overrides relevant to a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    base: Decimal,
    overrides: BTreeMap<NaiveDate, Decimal>,
}

impl RateTable {
    pub fn new(base: Decimal) -> Self {
        Self {
            base,
            overrides: BTreeMap::new(),
        }
    }

    pub fn from_parts<'a>(base: Decimal, overrides: impl IntoIterator<Item = &'a DailyRate>) -> Self {
        Self {
            base,
            overrides: overrides.into_iter().map(|o| (o.date, o.price)).collect(),
        }
    }

    pub fn with_override(mut self, date: NaiveDate, price: Decimal) -> Self {
        self.overrides.insert(date, price);
        self
    }

    pub fn nightly(&self, date: NaiveDate) -> Decimal {
        self.overrides.get(&date).copied().unwrap_or(self.base)
    }
}

/// Whole days in `[start, end)`, clamped at zero.
pub fn day_count(start: Ms, end: Ms) -> u32 {
    u32::try_from((end - start).max(0) / DAY_MS).unwrap_or(u32::MAX)
}

/// The calendar dates charged for `[start, end)`.
pub fn nights(start: Ms, end: Ms) -> impl Iterator<Item = NaiveDate> {
    date_of(start)
        .iter_days()
        .take(day_count(start, end) as usize)
}

pub fn compute_total(start: Ms, end: Ms, rates: &RateTable) -> Decimal {
    nights(start, end).map(|d| rates.nightly(d)).sum()
}

pub fn nightly_breakdown(start: Ms, end: Ms, rates: &RateTable) -> Vec<NightPrice> {
    nights(start, end)
        .map(|date| NightPrice {
            date,
            price: rates.nightly(date),
        })
        .collect()
}

/// Validate a price at write time and normalise it to two decimal places.
pub fn validate_price(price: Decimal) -> Result<Decimal, BookingError> {
    if price <= Decimal::ZERO
        || price > Decimal::from(MAX_PRICE_UNITS)
        || price.normalize().scale() > 2
    {
        return Err(BookingError::InvalidRate(price));
    }
    let mut normalised = price;
    normalised.rescale(2);
    Ok(normalised)
}
