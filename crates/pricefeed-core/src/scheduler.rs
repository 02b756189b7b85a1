//! Power-based refresh scheduling.
//!
//! A signal's total power buys it a tighter refresh interval and a tighter
//! deviation tolerance, in discrete steps of `power_step_threshold`:
//!
//! ```text
//! factor   = power / threshold            (0 if power < threshold)
//! interval = max(min_interval, max_interval / factor)
//! ```
//!
//! Signals below one step get interval 0 and are never tracked.

use pricefeed_types::Params;

/// Refresh interval in seconds for a signal with `power`.
///
/// Returns 0 when `power` is below one step.
pub fn calculate_interval(power: i64, step_threshold: i64, min_interval: i64, max_interval: i64) -> i64 {
    step_down(power, step_threshold, min_interval, max_interval)
}

/// Deviation tolerance in basis points for a signal with `power`.
///
/// Returns 0 when `power` is below one step.
pub fn calculate_deviation(
    power: i64,
    step_threshold: i64,
    min_deviation: i64,
    max_deviation: i64,
) -> i64 {
    step_down(power, step_threshold, min_deviation, max_deviation)
}

/// [`calculate_interval`] with the bounds taken from `params`.
pub fn interval_for(params: &Params, power: i64) -> i64 {
    calculate_interval(
        power,
        params.power_step_threshold,
        params.min_interval,
        params.max_interval,
    )
}

/// [`calculate_deviation`] with the bounds taken from `params`.
pub fn deviation_for(params: &Params, power: i64) -> i64 {
    calculate_deviation(
        power,
        params.power_step_threshold,
        params.min_deviation_basis_point,
        params.max_deviation_basis_point,
    )
}

fn step_down(power: i64, step_threshold: i64, min: i64, max: i64) -> i64 {
    if step_threshold <= 0 || power < step_threshold {
        return 0;
    }
    let factor = power / step_threshold;
    (max / factor).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const THRESHOLD: i64 = 1_000_000_000;

    #[test]
    fn test_below_threshold_is_untracked() {
        assert_eq!(calculate_interval(THRESHOLD - 1, THRESHOLD, 60, 3600), 0);
        assert_eq!(calculate_deviation(0, THRESHOLD, 50, 3000), 0);
    }

    #[test]
    fn test_one_step_gets_max() {
        assert_eq!(calculate_interval(THRESHOLD, THRESHOLD, 60, 3600), 3600);
        assert_eq!(calculate_deviation(THRESHOLD, THRESHOLD, 50, 3000), 3000);
    }

    #[test]
    fn test_ten_steps() {
        let params = Params::default();
        assert_eq!(interval_for(&params, 10_000_000_000), 360);
        assert_eq!(deviation_for(&params, 10_000_000_000), 300);
    }

    #[test]
    fn test_clamped_to_min() {
        assert_eq!(calculate_interval(THRESHOLD * 1000, THRESHOLD, 60, 3600), 60);
        assert_eq!(calculate_deviation(THRESHOLD * 1000, THRESHOLD, 50, 3000), 50);
    }

    #[test]
    fn test_partial_step_rounds_down() {
        // 1.9 steps is still one step.
        assert_eq!(calculate_interval(1_900_000_000, THRESHOLD, 60, 3600), 3600);
        assert_eq!(calculate_interval(2_000_000_000, THRESHOLD, 60, 3600), 1800);
    }

    proptest! {
        #[test]
        fn interval_non_increasing_in_power(a in 0i64..1_000_000_000_000, b in 0i64..1_000_000_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let params = Params::default();
            let i_lo = interval_for(&params, lo);
            let i_hi = interval_for(&params, hi);
            if i_lo > 0 {
                prop_assert!(i_hi <= i_lo);
                prop_assert!(i_hi >= params.min_interval);
            }
        }
    }
}
