use std::cmp::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::firestore::error::{invalid_argument, unsupported_type, FirestoreResult};

/// `0001-01-01T00:00:00Z`, the earliest instant Firestore stores.
const MIN_SECONDS: i64 = -62_135_596_800;
/// `9999-12-31T23:59:59Z`, the latest whole second Firestore stores.
const MAX_SECONDS: i64 = 253_402_300_799;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let mut timestamp = Self { seconds, nanos };
        timestamp.normalize();
        timestamp
    }

    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0));
        Self {
            seconds: duration.as_secs() as i64,
            nanos: duration.subsec_nanos() as i32,
        }
    }

    /// Renders the instant as RFC 3339 in UTC with nanosecond precision.
    ///
    /// Only years 0001 through 9999 have a four-digit RFC 3339 form; anything
    /// outside fails with `UnsupportedType`.
    pub fn to_rfc3339(&self) -> FirestoreResult<String> {
        if !(MIN_SECONDS..=MAX_SECONDS).contains(&self.seconds) {
            return Err(unsupported_type(format!(
                "Timestamp {}s/{}ns is outside years 0001..=9999",
                self.seconds, self.nanos
            )));
        }
        Utc.timestamp_opt(self.seconds, self.nanos as u32)
            .single()
            .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Nanos, true))
            .ok_or_else(|| {
                unsupported_type(format!(
                    "Timestamp {}s/{}ns is outside the representable range",
                    self.seconds, self.nanos
                ))
            })
    }

    pub fn parse_rfc3339(value: &str) -> FirestoreResult<Self> {
        let datetime = DateTime::parse_from_rfc3339(value)
            .map_err(|err| invalid_argument(format!("Invalid timestamp '{value}': {err}")))?;
        let datetime_utc = datetime.with_timezone(&Utc);
        Ok(Timestamp::new(
            datetime_utc.timestamp(),
            datetime_utc.timestamp_subsec_nanos() as i32,
        ))
    }

    fn normalize(&mut self) {
        let extra_seconds = self.nanos.div_euclid(1_000_000_000);
        self.seconds = self.seconds.saturating_add(extra_seconds as i64);
        self.nanos = self.nanos.rem_euclid(1_000_000_000);
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.seconds.cmp(&other.seconds) {
            Ordering::Equal => self.nanos.cmp(&other.nanos),
            ordering => ordering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_nanoseconds() {
        let timestamp = Timestamp::new(1, 1_500_000_000);
        assert_eq!(timestamp.seconds, 2);
        assert_eq!(timestamp.nanos, 500_000_000);

        let negative = Timestamp::new(0, -1);
        assert_eq!(negative.seconds, -1);
        assert_eq!(negative.nanos, 999_999_999);
    }

    #[test]
    fn rfc3339_keeps_nanoseconds() {
        let timestamp = Timestamp::new(1_700_000_000, 123_456_789);
        let rendered = timestamp.to_rfc3339().unwrap();
        assert_eq!(rendered, "2023-11-14T22:13:20.123456789Z");
        assert_eq!(Timestamp::parse_rfc3339(&rendered).unwrap(), timestamp);
    }

    #[test]
    fn parse_converts_offsets_to_utc() {
        let parsed = Timestamp::parse_rfc3339("1970-01-01T01:00:00+01:00").unwrap();
        assert_eq!(parsed, Timestamp::new(0, 0));
    }

    #[test]
    fn out_of_range_is_unsupported() {
        let err = Timestamp::new(i64::MAX, 0).to_rfc3339().unwrap_err();
        assert_eq!(err.code_str(), "firestore/unsupported-type");
    }

    #[test]
    fn rfc3339_covers_years_one_through_9999() {
        let first = Timestamp::new(MIN_SECONDS, 0);
        assert_eq!(first.to_rfc3339().unwrap(), "0001-01-01T00:00:00.000000000Z");
        let last = Timestamp::new(MAX_SECONDS, 999_999_999);
        assert_eq!(last.to_rfc3339().unwrap(), "9999-12-31T23:59:59.999999999Z");

        for outside in [Timestamp::new(MAX_SECONDS + 1, 0), Timestamp::new(MIN_SECONDS, -1)] {
            let err = outside.to_rfc3339().unwrap_err();
            assert_eq!(err.code_str(), "firestore/unsupported-type");
        }
    }

    #[test]
    fn normalize_saturates_at_the_extremes() {
        let timestamp = Timestamp::new(i64::MAX, 1_000_000_000);
        assert_eq!(timestamp.seconds, i64::MAX);
        assert_eq!(timestamp.nanos, 0);

        let timestamp = Timestamp::new(i64::MIN, -1);
        assert_eq!(timestamp.seconds, i64::MIN);
        assert_eq!(timestamp.nanos, 999_999_999);
    }

    #[test]
    fn ordering() {
        assert!(Timestamp::new(1, 0) < Timestamp::new(1, 1));
    }
}
