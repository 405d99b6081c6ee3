use chrono::{Datelike, NaiveDate};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use utoipa::ToSchema;

use super::PricedLine;
use crate::{
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult, OrderStep},
};

/// Annual date window, inclusive on both ends, within a single month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonalWindow {
    pub month: u32,
    pub first_day: u32,
    pub last_day: u32,
}

impl SeasonalWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.month() == self.month && (self.first_day..=self.last_day).contains(&date.day())
    }
}

/// The fixed discount rules applied when an order is created.
///
/// `Default` is the production policy; tests build their own to move the
/// seasonal window or change rates.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountPolicy {
    pub seasonal_window: SeasonalWindow,
    /// Fraction of the raw total.
    pub seasonal_rate: f64,
    /// Minimum quantity on a single line for it to earn the volume discount.
    pub volume_min_quantity: i32,
    /// Fraction of a qualifying line's subtotal.
    pub volume_rate: f64,
    /// Minimum number of live orders the user must already hold.
    pub loyalty_min_orders: u64,
    /// Fraction of the raw total.
    pub loyalty_rate: f64,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            seasonal_window: SeasonalWindow {
                month: 12,
                first_day: 3,
                last_day: 31,
            },
            seasonal_rate: 0.15,
            volume_min_quantity: 10,
            volume_rate: 0.10,
            loyalty_min_orders: 5,
            loyalty_rate: 0.05,
        }
    }
}

/// Discount breakdown for one order. Rates apply to the raw total, the
/// volume discount is already an absolute amount.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct Discounts {
    pub seasonal_rate: f64,
    pub volume_discount: f64,
    pub loyalty_rate: f64,
}

impl DiscountPolicy {
    /// Evaluates all three rules independently; none suppresses another.
    pub fn evaluate(&self, lines: &[PricedLine], order_count: u64, today: NaiveDate) -> Discounts {
        let mut discounts = Discounts::default();

        if self.seasonal_window.contains(today) {
            discounts.seasonal_rate = self.seasonal_rate;
            tracing::debug!(rate = self.seasonal_rate, %today, "seasonal discount applies");
        }

        for line in lines {
            if line.quantity >= self.volume_min_quantity {
                let amount = self.volume_rate * line.subtotal();
                discounts.volume_discount += amount;
                tracing::debug!(item_id = line.item_id, amount, "volume discount for line");
            }
        }

        if order_count >= self.loyalty_min_orders {
            discounts.loyalty_rate = self.loyalty_rate;
            tracing::debug!(order_count, rate = self.loyalty_rate, "loyalty discount applies");
        }

        discounts
    }
}

/// Reads the user's live order count through `conn` and evaluates the policy.
///
/// Called before the new order header is written, so the count covers prior
/// orders only.
pub async fn compute_discounts<C: ConnectionTrait>(
    conn: &C,
    policy: &DiscountPolicy,
    user_id: i32,
    lines: &[PricedLine],
    today: NaiveDate,
) -> AppResult<Discounts> {
    let order_count = Orders::find()
        .filter(OrderCol::UserId.eq(user_id))
        .filter(OrderCol::DeletedAt.is_null())
        .count(conn)
        .await
        .map_err(AppError::at(OrderStep::ComputeDiscounts))?;

    Ok(policy.evaluate(lines, order_count, today))
}
