use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::byte_helper::u64_to_bytes;

/// 100-nanosecond intervals between 1601-01-01 and 1970-01-01.
const INTERVALS_BETWEEN_1601_AND_EPOCH: u64 = 116_444_736_000_000_000;
const INTERVALS_PER_SECOND: u64 = 10_000_000;

/// A Windows FILETIME: 100-nanosecond intervals since 1601-01-01 UTC.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default, PartialOrd, Ord)]
pub struct FileTime {
    intervals: u64,
}

impl FileTime {
    pub fn from_intervals(intervals: u64) -> Self {
        Self { intervals }
    }

    /// Saturates at the largest representable FILETIME.
    pub fn from_unix(unix_timestamp: u64) -> Self {
        Self::from_intervals(unix_timestamp
            .saturating_mul(INTERVALS_PER_SECOND)
            .saturating_add(INTERVALS_BETWEEN_1601_AND_EPOCH))
    }

    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let intervals = since_epoch.as_secs() * INTERVALS_PER_SECOND + (since_epoch.subsec_nanos() / 100) as u64;
        Self::from_intervals(intervals + INTERVALS_BETWEEN_1601_AND_EPOCH)
    }

    pub fn to_unix(&self) -> u64 {
        self.intervals.saturating_sub(INTERVALS_BETWEEN_1601_AND_EPOCH) / INTERVALS_PER_SECOND
    }

    pub fn intervals(&self) -> u64 {
        self.intervals
    }

    pub fn as_bytes(&self) -> [u8; 8] {
        u64_to_bytes(self.intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_offset() {
        let time = FileTime::from_unix(0);
        assert_eq!(time.intervals(), 116_444_736_000_000_000);
        assert_eq!(time.as_bytes(), [0x00, 0x80, 0x3e, 0xd5, 0xde, 0xb1, 0x9d, 0x01]);
    }

    #[test]
    fn unix_round_trip() {
        let time = FileTime::from_unix(1_700_000_000);
        assert_eq!(time.to_unix(), 1_700_000_000);
    }

    #[test]
    fn far_future_saturates() {
        assert_eq!(FileTime::from_unix(u64::MAX).intervals(), u64::MAX);
        assert_eq!(FileTime::from_unix(u64::MAX / INTERVALS_PER_SECOND).intervals(), u64::MAX);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(FileTime::now().to_unix() > 1_577_836_800);
    }
}
