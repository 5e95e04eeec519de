//! Fee computation

use chrono::{DateTime, Local};
use lotkeeper_api::Tariff;
use lotkeeper_util::{LotError, Result, minutes_between};

/// Fractional minutes parked. Fails if `exit` precedes `entry`.
pub fn elapsed_minutes(entry: DateTime<Local>, exit: DateTime<Local>) -> Result<f64> {
    if exit < entry {
        return Err(LotError::invalid_timestamp(format!(
            "exit time {} is before entry time {}",
            exit.to_rfc3339(),
            entry.to_rfc3339()
        )));
    }
    Ok(minutes_between(entry, exit))
}

/// Largest fee that can be billed; the history table stores fees as SQLite integers
pub const MAX_FEE: u64 = i64::MAX as u64;

/// Fee for `minutes` at `tariff`, rounded to the nearest unit with halves
/// rounded up. Saturates at [`MAX_FEE`].
pub fn compute_fee(minutes: f64, tariff: Tariff) -> u64 {
    let amount = minutes * tariff.rate();
    // Non-negative, so f64::round (half away from zero) is half-up
    (amount.max(0.0).round() as u64).min(MAX_FEE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tariff(rate: f64) -> Tariff {
        Tariff::per_minute(rate).unwrap()
    }

    #[test]
    fn ten_minutes_at_fifty() {
        assert_eq!(compute_fee(10.0, tariff(50.0)), 500);
    }

    #[test]
    fn half_minute_at_fifty() {
        assert_eq!(compute_fee(0.5, tariff(50.0)), 25);
    }

    #[test]
    fn halves_round_up() {
        // 0.25 min * 10 = 2.5
        assert_eq!(compute_fee(0.25, tariff(10.0)), 3);
        // 0.05 min * 10 = 0.5
        assert_eq!(compute_fee(0.05, tariff(10.0)), 1);
        assert_eq!(compute_fee(0.04, tariff(10.0)), 0);
    }

    #[test]
    fn zero_duration_is_free() {
        assert_eq!(compute_fee(0.0, tariff(50.0)), 0);
        assert_eq!(compute_fee(30.0, tariff(0.0)), 0);
    }

    #[test]
    fn fee_is_monotone_in_duration() {
        let t = tariff(37.5);
        let mut last = 0;
        for ms in (0..600_000).step_by(1_337) {
            let fee = compute_fee(ms as f64 / 60_000.0, t);
            assert!(fee >= last, "fee dropped at {} ms", ms);
            last = fee;
        }
    }

    #[test]
    fn fee_saturates_at_max_fee() {
        let top = tariff(Tariff::MAX_PER_MINUTE);
        assert_eq!(compute_fee(f64::MAX, top), MAX_FEE);
        assert_eq!(compute_fee(10.0, top), 10_000_000);
    }

    #[test]
    fn elapsed_is_fractional() {
        let entry = lotkeeper_util::now();
        let exit = entry + Duration::seconds(90);
        assert_eq!(elapsed_minutes(entry, exit).unwrap(), 1.5);
        assert_eq!(elapsed_minutes(entry, entry).unwrap(), 0.0);
    }

    #[test]
    fn exit_before_entry_is_rejected() {
        let entry = lotkeeper_util::now();
        let exit = entry - Duration::milliseconds(1);
        assert!(matches!(
            elapsed_minutes(entry, exit),
            Err(LotError::InvalidTimestamp(_))
        ));
    }
}
