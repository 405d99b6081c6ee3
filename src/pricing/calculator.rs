use serde::Serialize;
use utoipa::ToSchema;

use super::{Discounts, PricedLine};

/// Amounts derived from the raw lines and a discount breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PriceSummary {
    pub total_price: f64,
    pub seasonal_discount: f64,
    pub volume_discount: f64,
    pub loyalty_discount: f64,
    /// Sum of the three discounts, capped at `total_price`.
    pub total_discount: f64,
    pub final_price: f64,
}

pub fn raw_total(lines: &[PricedLine]) -> f64 {
    lines.iter().map(PricedLine::subtotal).sum()
}

/// Applies `discounts` to the raw total of `lines`. Rates are summed, not
/// compounded, and the final price never drops below zero.
pub fn calculate(lines: &[PricedLine], discounts: &Discounts) -> PriceSummary {
    let total_price = raw_total(lines);
    let seasonal_discount = total_price * discounts.seasonal_rate;
    let loyalty_discount = total_price * discounts.loyalty_rate;
    let volume_discount = discounts.volume_discount;

    let total_discount = (seasonal_discount + loyalty_discount + volume_discount).min(total_price);
    let final_price = total_price - total_discount;

    tracing::debug!(total_price, total_discount, final_price, "order priced");

    PriceSummary {
        total_price,
        seasonal_discount,
        volume_discount,
        loyalty_discount,
        total_discount,
        final_price,
    }
}

/// Groups lines by item for display, summing quantity and price.
///
/// When an item shows up again, the merged entry takes the position of the
/// later line.
pub fn aggregate_for_display<I>(lines: I) -> Vec<PricedLine>
where
    I: IntoIterator<Item = PricedLine>,
{
    let mut merged: Vec<PricedLine> = Vec::new();
    for line in lines {
        match merged.iter().position(|m| m.item_id == line.item_id) {
            Some(idx) => {
                let mut existing = merged.remove(idx);
                existing.quantity += line.quantity;
                existing.unit_price += line.unit_price;
                merged.push(existing);
            }
            None => merged.push(line),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn worked_example_outside_december_with_loyal_user() {
        let lines = [PricedLine::new(1, 12, 10.0), PricedLine::new(2, 1, 5.0)];
        let discounts = Discounts {
            seasonal_rate: 0.0,
            volume_discount: 0.10 * 120.0,
            loyalty_rate: 0.05,
        };

        let summary = calculate(&lines, &discounts);
        assert!(approx(summary.total_price, 125.0));
        assert!(approx(summary.volume_discount, 12.0));
        assert!(approx(summary.loyalty_discount, 6.25));
        assert!(approx(summary.seasonal_discount, 0.0));
        assert!(approx(summary.total_discount, 18.25));
        assert!(approx(summary.final_price, 106.75));
    }

    #[test]
    fn discount_is_capped_at_total() {
        let lines = [PricedLine::new(1, 10, 1.0)];
        let discounts = Discounts {
            seasonal_rate: 0.9,
            volume_discount: 50.0,
            loyalty_rate: 0.9,
        };

        let summary = calculate(&lines, &discounts);
        assert!(approx(summary.total_discount, 10.0));
        assert!(approx(summary.final_price, 0.0));
    }

    #[test]
    fn final_price_follows_capping_formula() {
        let cases = [
            (vec![PricedLine::new(1, 3, 7.0)], Discounts::default()),
            (
                vec![PricedLine::new(1, 10, 3.0), PricedLine::new(2, 2, 40.0)],
                Discounts {
                    seasonal_rate: 0.15,
                    volume_discount: 3.0,
                    loyalty_rate: 0.05,
                },
            ),
        ];
        for (lines, discounts) in cases {
            let s = calculate(&lines, &discounts);
            let uncapped = s.total_price * discounts.seasonal_rate
                + s.total_price * discounts.loyalty_rate
                + discounts.volume_discount;
            assert!(approx(s.final_price, s.total_price - uncapped.min(s.total_price)));
            assert!(s.final_price >= 0.0);
            assert!(s.final_price <= s.total_price);
        }
    }

    #[test]
    fn empty_lines_price_to_zero() {
        let s = calculate(&[], &Discounts::default());
        assert_eq!(s.total_price, 0.0);
        assert_eq!(s.final_price, 0.0);
    }

    #[test]
    fn display_aggregation_merges_duplicates_at_later_position() {
        let lines = vec![
            PricedLine::new(1, 2, 10.0),
            PricedLine::new(2, 1, 5.0),
            PricedLine::new(1, 3, 10.0),
            PricedLine::new(3, 4, 1.0),
        ];

        let merged = aggregate_for_display(lines);
        assert_eq!(
            merged,
            vec![
                PricedLine::new(2, 1, 5.0),
                PricedLine::new(1, 5, 20.0),
                PricedLine::new(3, 4, 1.0),
            ]
        );
    }

    #[test]
    fn display_aggregation_keeps_distinct_items_in_order() {
        let lines = vec![PricedLine::new(3, 1, 1.0), PricedLine::new(1, 1, 2.0)];
        assert_eq!(aggregate_for_display(lines.clone()), lines);
    }
}
