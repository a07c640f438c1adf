//! # Depreciation
//!
//! Reducing-balance depreciation, charged once per completed year since
//! acquisition. Each year's charge is rounded to the minor unit before it is
//! taken off the balance, so the result is exact and replayable.
//!
//! ```text
//! cost 2,500,000 @ 25%
//!   year 1: charge 625,000  ──► 1,875,000
//!   year 2: charge 468,750  ──► 1,406,250   (= cost × 0.75²)
//! ```
//!
//! Nothing here is stored: net book value is a pure function of the asset
//! and the `as_of` date.

use chrono::{Datelike, NaiveDate};

use crate::money::Money;
use crate::types::Rate;
use crate::views::Asset;

/// Years fully elapsed between `acquired` and `as_of` (anniversary based).
pub fn completed_years(acquired: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= acquired {
        return 0;
    }
    let mut years = as_of.year() - acquired.year();
    if (as_of.month(), as_of.day()) < (acquired.month(), acquired.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Net book value after `years` reducing-balance charges.
pub fn value_after_years(cost: Money, rate: Rate, years: u32) -> Money {
    let mut value = cost;
    for _ in 0..years {
        if value.is_zero() {
            break;
        }
        value -= value.apply_rate(rate);
    }
    value
}

/// Net book value of a cost basis as of a date.
pub fn net_book_value(cost: Money, rate: Rate, acquired: NaiveDate, as_of: NaiveDate) -> Money {
    value_after_years(cost, rate, completed_years(acquired, as_of))
}

/// Depreciation charged up to `as_of`.
pub fn accumulated_depreciation(
    cost: Money,
    rate: Rate,
    acquired: NaiveDate,
    as_of: NaiveDate,
) -> Money {
    cost - net_book_value(cost, rate, acquired, as_of)
}

impl Asset {
    pub fn net_book_value(&self, as_of: NaiveDate) -> Money {
        net_book_value(self.cost, self.depreciation_rate, self.acquisition_date, as_of)
    }

    pub fn accumulated_depreciation(&self, as_of: NaiveDate) -> Money {
        accumulated_depreciation(self.cost, self.depreciation_rate, self.acquisition_date, as_of)
    }
}
