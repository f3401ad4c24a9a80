use chrono::TimeDelta;

/// Converts elapsed time into the fractional seconds stored in the ledger. Millisecond precision
/// is kept, anything finer is dropped.
pub fn elapsed_seconds(elapsed: TimeDelta) -> f64 {
    elapsed.num_milliseconds() as f64 / 1000.
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::elapsed_seconds;

    #[test]
    fn test_elapsed_seconds() {
        assert_eq!(elapsed_seconds(TimeDelta::seconds(3)), 3.);
        assert_eq!(elapsed_seconds(TimeDelta::milliseconds(1500)), 1.5);
        assert_eq!(elapsed_seconds(TimeDelta::microseconds(999)), 0.);
        assert_eq!(elapsed_seconds(TimeDelta::seconds(-2)), -2.);
    }
}
