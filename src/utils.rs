//! Utility functions for the rating collector

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Rounded display label for a stored rating (engine scale x 100)
pub fn rating_label(rating: f64) -> i64 {
    (rating * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_label() {
        assert_eq!(rating_label(16.0), 1600);
        assert_eq!(rating_label(16.004), 1600);
        assert_eq!(rating_label(16.006), 1601);
        assert_eq!(rating_label(0.0), 0);
    }
}
