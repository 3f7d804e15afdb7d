// Coupon/Discount Evaluator
//
// Pure verdict and discount computation. Callers load the coupon and the
// user's prior usage count; nothing here touches the database.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::coupons::{Coupon, DiscountType};

pub const MSG_NOT_FOUND: &str = "Coupon not found";
pub const MSG_NOT_ACTIVE: &str = "Coupon is not active";
pub const MSG_OUTSIDE_WINDOW: &str = "Coupon is not valid at this time";
pub const MSG_MAX_USES: &str = "Coupon has reached maximum uses";
pub const MSG_MAX_USES_PER_USER: &str = "You have reached the maximum uses for this coupon";
pub const MSG_NOT_APPLICABLE: &str = "Coupon is not applicable to the items in this order";
pub const MSG_VALID: &str = "Coupon is valid";

/// Outcome of evaluating a coupon against an order amount
#[derive(Debug, Clone, PartialEq)]
pub struct CouponEvaluation {
    pub valid: bool,
    pub message: String,
    pub discount_amount: Decimal,
}

impl CouponEvaluation {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            discount_amount: Decimal::ZERO,
        }
    }
}

/// Product and category of one order line, for scope checks
#[derive(Debug, Clone, Copy)]
pub struct ScopedLine {
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
}

pub struct CouponEvaluator;

impl CouponEvaluator {
    /// Run the ordered checks, stopping at the first failure
    ///
    /// `prior_user_uses` is the number of recorded redemptions of this coupon
    /// by the requesting user.
    pub fn evaluate(
        coupon: Option<&Coupon>,
        order_amount: Decimal,
        prior_user_uses: i64,
        now: DateTime<Utc>,
    ) -> CouponEvaluation {
        let Some(coupon) = coupon else {
            return CouponEvaluation::rejected(MSG_NOT_FOUND);
        };

        if !coupon.is_active {
            return CouponEvaluation::rejected(MSG_NOT_ACTIVE);
        }

        if !Self::is_within_window(coupon, now) {
            return CouponEvaluation::rejected(MSG_OUTSIDE_WINDOW);
        }

        if Self::is_exhausted(coupon) {
            return CouponEvaluation::rejected(MSG_MAX_USES);
        }

        if let Some(per_user) = coupon.max_uses_per_user {
            if prior_user_uses >= i64::from(per_user) {
                return CouponEvaluation::rejected(MSG_MAX_USES_PER_USER);
            }
        }

        if let Some(minimum) = coupon.minimum_order_amount {
            if order_amount < minimum {
                return CouponEvaluation::rejected(format!(
                    "Order amount does not meet the minimum required amount of {}",
                    minimum
                ));
            }
        }

        CouponEvaluation {
            valid: true,
            message: MSG_VALID.to_string(),
            discount_amount: Self::calculate_discount(coupon, order_amount),
        }
    }

    /// Inclusive on both ends
    pub fn is_within_window(coupon: &Coupon, now: DateTime<Utc>) -> bool {
        coupon.start_date <= now && now <= coupon.end_date
    }

    pub fn is_exhausted(coupon: &Coupon) -> bool {
        matches!(coupon.max_uses, Some(max) if coupon.current_uses >= max)
    }

    /// Discount for `order_amount`, never more than the amount itself
    ///
    /// Percentages are applied to the amount and rounded half-up to cents
    /// before the maximum-discount cap.
    pub fn calculate_discount(coupon: &Coupon, order_amount: Decimal) -> Decimal {
        if order_amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let discount = match coupon.discount_type {
            DiscountType::Percentage => {
                let raw = (order_amount * coupon.discount_value / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                match coupon.maximum_discount_amount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountType::FixedAmount => coupon.discount_value,
        };

        discount.max(Decimal::ZERO).min(order_amount)
    }

    /// Unscoped coupons apply to every order; scoped ones need a matching line
    pub fn applies_to(coupon: &Coupon, lines: &[ScopedLine]) -> bool {
        if !coupon.is_scoped() {
            return true;
        }
        lines.iter().any(|line| {
            coupon.product_id == Some(line.product_id)
                || (coupon.category_id.is_some() && coupon.category_id == line.category_id)
        })
    }
}


#[cfg(test)]
mod property_tests {
    use super::tests::coupon;
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn discount_type_strategy() -> impl Strategy<Value = DiscountType> {
        prop_oneof![Just(DiscountType::Percentage), Just(DiscountType::FixedAmount)]
    }

    proptest! {
        /// Outside the window the verdict is invalid whatever the other fields say
        #[test]
        fn prop_outside_window_is_invalid(
            offset_hours in 1i64..10_000,
            before in any::<bool>(),
            discount_type in discount_type_strategy(),
            amount_cents in 0i64..10_000_000,
        ) {
            let now = Utc::now();
            let mut c = coupon(discount_type, Decimal::new(10, 0));
            if before {
                c.start_date = now + Duration::hours(offset_hours);
                c.end_date = c.start_date + Duration::days(1);
            } else {
                c.end_date = now - Duration::hours(offset_hours);
                c.start_date = c.end_date - Duration::days(1);
            }
            let result = CouponEvaluator::evaluate(Some(&c), Decimal::new(amount_cents, 2), 0, now);
            prop_assert!(!result.valid);
            prop_assert_eq!(result.discount_amount, Decimal::ZERO);
        }

        /// Percentage discount equals min(amount × rate / 100, cap), within rounding
        #[test]
        fn prop_percentage_discount_matches_formula(
            amount_cents in 1i64..10_000_000,
            rate in 1i64..=100,
            cap_cents in proptest::option::of(1i64..1_000_000),
        ) {
            let mut c = coupon(DiscountType::Percentage, Decimal::from(rate));
            c.maximum_discount_amount = cap_cents.map(|cents| Decimal::new(cents, 2));
            let amount = Decimal::new(amount_cents, 2);

            let discount = CouponEvaluator::calculate_discount(&c, amount);
            let exact = amount * Decimal::from(rate) / Decimal::ONE_HUNDRED;
            let expected = match c.maximum_discount_amount {
                Some(cap) => exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero).min(cap),
                None => exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            };
            prop_assert_eq!(discount, expected.min(amount));
        }

        /// The discount never makes the final amount negative
        #[test]
        fn prop_discount_bounded_by_amount(
            amount_cents in 0i64..10_000_000,
            value_cents in 1i64..10_000_000,
            discount_type in discount_type_strategy(),
        ) {
            let value = match discount_type {
                DiscountType::Percentage => Decimal::new(value_cents % 10_000, 2).max(Decimal::ONE),
                DiscountType::FixedAmount => Decimal::new(value_cents, 2),
            };
            let c = coupon(discount_type, value);
            let amount = Decimal::new(amount_cents, 2);
            let discount = CouponEvaluator::calculate_discount(&c, amount);
            prop_assert!(discount >= Decimal::ZERO);
            prop_assert!(discount <= amount);
        }
    }
}
