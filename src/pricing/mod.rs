//! Order pricing: price resolution, discount policy and final-price calculation.
//!
//! Store-touching functions take the caller's connection (normally the open
//! `DatabaseTransaction` of the order being written) and never commit.

pub mod calculator;
pub mod discounts;
pub mod resolver;

use serde::Serialize;
use utoipa::ToSchema;

pub use calculator::{PriceSummary, aggregate_for_display, calculate, raw_total};
pub use discounts::{DiscountPolicy, Discounts, SeasonalWindow, compute_discounts};
pub use resolver::{resolve_line, resolve_lines, resolve_unit_price};

/// One order line with its unit price resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PricedLine {
    pub item_id: i32,
    pub quantity: i32,
    pub unit_price: f64,
}

impl PricedLine {
    pub fn new(item_id: i32, quantity: i32, unit_price: f64) -> Self {
        Self {
            item_id,
            quantity,
            unit_price,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}
