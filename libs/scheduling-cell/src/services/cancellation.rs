// libs/scheduling-cell/src/services/cancellation.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Minimum notice, in minutes, for a free cancellation.
pub const FREE_CANCELLATION_NOTICE_MINUTES: i64 = 120;

/// Tiered cancellation fee policy. Tiers are evaluated highest notice first;
/// the first match wins.
#[derive(Debug, Clone, Default)]
pub struct CancellationPolicy;

impl CancellationPolicy {
    /// Fee owed for cancelling `notice_minutes` before the attendance start,
    /// as a fraction of the single service's price. Rounded to cents.
    pub fn fee_for(&self, notice_minutes: i64, service_price: Decimal) -> Decimal {
        let fraction = if notice_minutes >= 120 {
            Decimal::ZERO
        } else if notice_minutes >= 90 {
            Decimal::new(40, 2)
        } else if notice_minutes >= 60 {
            Decimal::new(45, 2)
        } else if notice_minutes >= 30 {
            Decimal::new(50, 2)
        } else {
            Decimal::ONE
        };

        (service_price * fraction).round_dp(2)
    }

    /// Whole minutes of notice between `now` and the attendance start.
    /// Negative when the start has already passed.
    pub fn notice_minutes(&self, now: DateTime<Utc>, starts_at: DateTime<Utc>) -> i64 {
        (starts_at - now).num_minutes()
    }

    pub fn can_cancel_free(&self, now: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
        self.notice_minutes(now, starts_at) >= FREE_CANCELLATION_NOTICE_MINUTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    #[test]
    fn fee_tiers_match_the_notice_given() {
        let policy = CancellationPolicy;
        let price = dec!(50.00);

        assert_eq!(policy.fee_for(200, price), dec!(0.00));
        assert_eq!(policy.fee_for(120, price), dec!(0.00));
        assert_eq!(policy.fee_for(100, price), dec!(20.00)); // 40%
        assert_eq!(policy.fee_for(90, price), dec!(20.00));
        assert_eq!(policy.fee_for(75, price), dec!(22.50)); // 45%
        assert_eq!(policy.fee_for(60, price), dec!(22.50));
        assert_eq!(policy.fee_for(45, price), dec!(25.00)); // 50%
        assert_eq!(policy.fee_for(30, price), dec!(25.00));
        assert_eq!(policy.fee_for(10, price), dec!(50.00)); // 100%
        assert_eq!(policy.fee_for(0, price), dec!(50.00));
    }

    #[test]
    fn fee_never_increases_with_more_notice() {
        let policy = CancellationPolicy;
        let price = dec!(80.00);

        let mut previous = policy.fee_for(0, price);
        for notice in 1..=180 {
            let fee = policy.fee_for(notice, price);
            assert!(fee <= previous, "fee rose at {} minutes of notice", notice);
            previous = fee;
        }
    }

    #[test]
    fn past_start_times_charge_the_full_price() {
        let policy = CancellationPolicy;

        assert_eq!(policy.fee_for(-15, dec!(35.00)), dec!(35.00));
    }

    #[test]
    fn fees_round_to_cents() {
        let policy = CancellationPolicy;

        // 45% of 33.33 is 14.9985.
        assert_eq!(policy.fee_for(60, dec!(33.33)), dec!(15.00));
    }

    #[test]
    fn free_cancellation_requires_two_hours_of_notice() {
        let policy = CancellationPolicy;
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();

        assert!(policy.can_cancel_free(now, now + Duration::minutes(120)));
        assert!(policy.can_cancel_free(now, now + Duration::hours(3)));
        assert!(!policy.can_cancel_free(now, now + Duration::minutes(119)));
    }
}
