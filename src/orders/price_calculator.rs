use rust_decimal::Decimal;
use uuid::Uuid;

use crate::orders::OrderItemRequest;

/// Order arithmetic: line subtotals, totals and the discounted final amount
pub struct PriceCalculator;

impl PriceCalculator {
    /// quantity × unit price
    pub fn calculate_subtotal(quantity: i32, unit_price: Decimal) -> Decimal {
        Decimal::from(quantity) * unit_price
    }

    /// Sum of line subtotals before any coupon
    pub fn calculate_total(subtotals: &[Decimal]) -> Decimal {
        subtotals.iter().sum()
    }

    /// total − discount, with the discount clamped to [0, total]
    ///
    /// Returns the clamped discount and the final amount.
    pub fn apply_discount(total: Decimal, discount: Decimal) -> (Decimal, Decimal) {
        let discount = discount.max(Decimal::ZERO).min(total);
        (discount, total - discount)
    }

    /// Merge repeated products into one line, keeping first-seen order
    ///
    /// Fails when the combined quantity of a product overflows.
    pub fn merge_lines(items: &[OrderItemRequest]) -> Result<Vec<(Uuid, i32)>, String> {
        let mut merged: Vec<(Uuid, i32)> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, quantity)) => {
                    *quantity = quantity
                        .checked_add(item.quantity)
                        .ok_or_else(|| format!("Quantity too large for product {}", item.product_id))?;
                }
                None => merged.push((item.product_id, item.quantity)),
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product_id: Uuid, quantity: i32) -> OrderItemRequest {
        OrderItemRequest { product_id, quantity }
    }

    #[test]
    fn test_subtotal() {
        assert_eq!(PriceCalculator::calculate_subtotal(3, dec!(100.00)), dec!(300.00));
        assert_eq!(PriceCalculator::calculate_subtotal(3, dec!(4.33)), dec!(12.99));
    }

    #[test]
    fn test_total() {
        assert_eq!(
            PriceCalculator::calculate_total(&[dec!(300.00), dec!(19.99), dec!(0.01)]),
            dec!(320.00)
        );
        assert_eq!(PriceCalculator::calculate_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_apply_discount() {
        assert_eq!(
            PriceCalculator::apply_discount(dec!(300.00), dec!(30.00)),
            (dec!(30.00), dec!(270.00))
        );
        assert_eq!(
            PriceCalculator::apply_discount(dec!(20.00), dec!(25.00)),
            (dec!(20.00), dec!(0.00))
        );
        assert_eq!(
            PriceCalculator::apply_discount(dec!(20.00), dec!(-5)),
            (Decimal::ZERO, dec!(20.00))
        );
    }

    #[test]
    fn test_merge_lines_sums_duplicates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let merged = PriceCalculator::merge_lines(&[line(a, 1), line(b, 2), line(a, 4)]).unwrap();
        assert_eq!(merged, vec![(a, 5), (b, 2)]);
    }

    #[test]
    fn test_merge_lines_overflow() {
        let a = Uuid::new_v4();
        assert!(PriceCalculator::merge_lines(&[line(a, i32::MAX), line(a, 1)]).is_err());
    }
}
