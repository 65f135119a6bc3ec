//! Common types used across the platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Offset pagination, as used by the list endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}

impl Pagination {
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        let defaults = Self::default();
        Self {
            skip: skip.unwrap_or(defaults.skip).max(0),
            limit: limit.unwrap_or(defaults.limit).max(0),
        }
    }

    /// Clamp the page size to `max_limit`
    pub fn capped(self, max_limit: i64) -> Self {
        Self {
            skip: self.skip,
            limit: self.limit.min(max_limit),
        }
    }
}

/// Inclusive timestamp range; either bound may be open
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_pagination_defaults_and_cap() {
        let page = Pagination::new(None, None);
        assert_eq!(page, Pagination { skip: 0, limit: 100 });

        let page = Pagination::new(Some(-5), Some(5000)).capped(500);
        assert_eq!(page, Pagination { skip: 0, limit: 500 });
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(DateRange::new(Some(at), Some(at)).contains(at));
        assert!(DateRange::default().contains(at));
        assert!(!DateRange::new(Some(at + Duration::seconds(1)), None).contains(at));
        assert!(!DateRange::new(None, Some(at - Duration::seconds(1))).contains(at));
    }
}
