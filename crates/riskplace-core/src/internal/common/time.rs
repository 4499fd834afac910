use std::time::Duration;

/// Simulated time, measured as an offset from the start of the simulation.
pub type SimTime = Duration;

const SECS_PER_HOUR: f64 = 3600.0;

/// Converts a (non-negative) number of hours into a duration.
/// Negative and non-finite inputs map to zero.
pub fn duration_from_hours(value: f64) -> Duration {
    if !value.is_finite() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(value * SECS_PER_HOUR)
}

#[inline]
pub fn hours(duration: Duration) -> f64 {
    duration.as_secs_f64() / SECS_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_conversion() {
        assert_eq!(duration_from_hours(1.0), Duration::from_secs(3600));
        assert_eq!(duration_from_hours(0.1), Duration::from_secs(360));
        assert_eq!(duration_from_hours(-2.0), Duration::ZERO);
        assert_eq!(duration_from_hours(f64::NAN), Duration::ZERO);
        assert!((hours(Duration::from_secs(5400)) - 1.5).abs() < 1e-12);
    }
}
