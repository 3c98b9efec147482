//! Date-based partition keys.
//!
//! Every record is routed by the UTC calendar date of its start time to a
//! `YYYY/MM/DD` directory under the output root.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Routing key for one output partition, formatted `YYYY/MM/DD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Key for the calendar date of `start_time`.
    ///
    /// Uses the same UTC interpretation the timestamp parser applies, so a
    /// record never changes partition depending on the host timezone.
    pub fn from_start_time(start_time: &DateTime<Utc>) -> Self {
        Self(start_time.format("%Y/%m/%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory for this partition under `root`.
    pub fn dir_in(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |dir, segment| dir.join(segment))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_timestamp;

    fn key(text: &str) -> PartitionKey {
        PartitionKey::from_start_time(&parse_timestamp(text).unwrap())
    }

    #[test]
    fn test_key_is_zero_padded() {
        assert_eq!(key("3/7/2019 9:15:00 AM").as_str(), "2019/03/07");
        assert_eq!(key("12/31/2020 11:59:59 PM").as_str(), "2020/12/31");
    }

    #[test]
    fn test_same_date_same_key() {
        assert_eq!(key("01/14/2017 12:00:00 AM"), key("01/14/2017 11:59:59 PM"));
    }

    #[test]
    fn test_different_dates_different_keys() {
        assert_ne!(key("01/14/2017 11:59:59 PM"), key("01/15/2017 12:00:00 AM"));
        assert_ne!(key("01/14/2017 10:00:00 AM"), key("01/14/2018 10:00:00 AM"));
    }

    #[test]
    fn test_offset_timestamps_use_utc_date() {
        assert_eq!(key("2021-06-01T23:30:00-05:00").as_str(), "2021/06/02");
    }

    #[test]
    fn test_dir_in_nests_segments() {
        let dir = key("01/14/2017 10:00:00 AM").dir_in(Path::new("/out"));
        assert_eq!(dir, Path::new("/out").join("2017").join("01").join("14"));
    }
}
