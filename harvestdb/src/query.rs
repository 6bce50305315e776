//! Range queries over tenant sub-namespaces.
//!
//! Entry keys carry no time information the engine relies on, so a query
//! walks every entry of a sub-namespace in key order, decodes it, and keeps
//! the ones whose embedded timestamp falls in the requested [`TimeRange`]
//! and whose payload contains the [`TypeFilter`] tag. Cost is linear in
//! the namespace size; tenant volumes are small enough for that.
//!
//! A payload that fails to decode does not fail the query. It is logged
//! and reported through [`ScanResult::skipped`] so that one bad record
//! cannot hide the rest of a tenant's history.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use harvestdb::{SensorType, Store, StoreConfig, TimeRange, TypeFilter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open(StoreConfig::new("data/main.db"))?;
//!
//! // Temperature readings from the last 24 hours (and up to 24h ahead).
//! let result = store.scan_sensor_entries(
//!     "1GYJU7OD2KFJRBUWDPP5I8P5VCL",
//!     TimeRange::from_span(24),
//!     &TypeFilter::from(SensorType::Temperature),
//! )?;
//! if !result.skipped().is_empty() {
//!     eprintln!("{} unreadable entries", result.skipped().len());
//! }
//! for reading in result {
//!     println!("{} {}", reading.time, reading.value);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use redb::ReadableTable;
use tracing::{debug, warn};

use crate::error::Result;
use crate::namespace::ReadTable;
use crate::record::{Record, RecordKind, SensorType};

/// Seconds in one hour, the unit of query spans.
pub const SECS_PER_HOUR: i64 = 3600;

/// Current wall-clock time in unix seconds.
///
/// Clocks set before the epoch read as `0`.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

/// A closed time interval `[start, end]` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// First second included.
    pub start: i64,
    /// Last second included.
    pub end: i64,
}

impl TimeRange {
    /// Creates the range `[start, end]`.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// The range covering every representable timestamp.
    pub fn all() -> Self {
        Self {
            start: i64::MIN,
            end: i64::MAX,
        }
    }

    /// The single-second range `[time, time]`.
    pub fn at(time: i64) -> Self {
        Self {
            start: time,
            end: time,
        }
    }

    /// The range `[now - span, now + span]` for a span given in hours.
    ///
    /// Arithmetic saturates at the `i64` limits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use harvestdb::TimeRange;
    ///
    /// let range = TimeRange::around(10_000, 2);
    /// assert_eq!(range, TimeRange::new(10_000 - 7200, 10_000 + 7200));
    /// ```
    pub fn around(now: i64, span_hours: i64) -> Self {
        let span = span_hours.saturating_abs().saturating_mul(SECS_PER_HOUR);
        Self {
            start: now.saturating_sub(span),
            end: now.saturating_add(span),
        }
    }

    /// Converts an hour span relative to the current time into absolute
    /// bounds. A span of `0` selects everything.
    pub fn from_span(span_hours: i64) -> Self {
        if span_hours == 0 {
            Self::all()
        } else {
            Self::around(unix_now(), span_hours)
        }
    }

    /// Returns true if `time` lies within the range, both ends inclusive.
    pub fn contains(&self, time: i64) -> bool {
        self.start <= time && time <= self.end
    }

    /// Returns true if the range covers every timestamp.
    pub fn is_unbounded(&self) -> bool {
        self.start == i64::MIN && self.end == i64::MAX
    }
}

/// Substring filter applied to raw payload bytes.
///
/// The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFilter(String);

impl TypeFilter {
    /// A filter that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// A filter matching payloads that contain `tag`.
    pub fn tag(tag: &str) -> Self {
        Self(tag.to_string())
    }

    /// Returns the tag, empty for the match-all filter.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the payload contains the tag.
    pub fn matches(&self, payload: &[u8]) -> bool {
        crate::codec::contains_tag(payload, self.0.as_bytes())
    }
}

impl From<SensorType> for TypeFilter {
    fn from(sensor: SensorType) -> Self {
        Self::tag(sensor.as_str())
    }
}

impl From<Option<SensorType>> for TypeFilter {
    fn from(sensor: Option<SensorType>) -> Self {
        sensor.map_or_else(Self::all, Self::from)
    }
}

/// An entry that could not be decoded during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// The entry key, lossily converted to UTF-8.
    pub key: String,
    /// Why decoding failed.
    pub reason: String,
}

/// Result of a range query.
///
/// Holds the matching records in namespace key order together with
/// metadata about the scan. Iterating the result yields the records.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult<T> {
    /// Records that matched, in key order.
    records: Vec<T>,

    /// Entries that could not be decoded.
    skipped: Vec<SkippedRecord>,

    /// Number of entries examined.
    examined: usize,

    /// The range that was requested.
    range: TimeRange,
}

impl<T> ScanResult<T> {
    /// An empty result, used when the sub-namespace does not exist.
    pub fn empty(range: TimeRange) -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
            examined: 0,
            range,
        }
    }

    /// Matching records, in namespace key order.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Consumes the result, returning the records.
    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    /// Entries that were skipped because they could not be decoded.
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    /// Number of entries examined by the scan.
    pub fn examined(&self) -> usize {
        self.examined
    }

    /// The requested time range.
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Number of matching records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stably reorders the records by a key.
    pub fn sort_by_key<K, F>(&mut self, f: F)
    where
        K: Ord,
        F: FnMut(&T) -> K,
    {
        self.records.sort_by_key(f);
    }

    /// Converts the records, dropping those `f` rejects. Metadata is kept.
    pub fn filter_map<U, F>(self, f: F) -> ScanResult<U>
    where
        F: FnMut(T) -> Option<U>,
    {
        ScanResult {
            records: self.records.into_iter().filter_map(f).collect(),
            skipped: self.skipped,
            examined: self.examined,
            range: self.range,
        }
    }
}

impl<T> IntoIterator for ScanResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Scans every entry of `source`, decoding payloads as `kind`.
///
/// Records without a timestamp (farm details) only match the unbounded
/// range.
pub(crate) fn scan_table(
    source: &ReadTable,
    kind: RecordKind,
    range: TimeRange,
    filter: &TypeFilter,
) -> Result<ScanResult<Record>> {
    let mut result = ScanResult::empty(range);

    for item in source.iter()? {
        let (key, value) = item?;
        let payload = value.value();
        result.examined += 1;

        let record = match Record::decode(kind, payload) {
            Ok(record) => record,
            Err(e) => {
                let key = String::from_utf8_lossy(key.value()).into_owned();
                warn!(key = %key, kind = kind.name(), error = %e, "skipping undecodable entry");
                result.skipped.push(SkippedRecord {
                    key,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let in_range = match record.time() {
            Some(time) => range.contains(time),
            None => range.is_unbounded(),
        };

        if in_range && filter.matches(payload) {
            result.records.push(record);
        }
    }

    debug!(
        kind = kind.name(),
        examined = result.examined,
        matched = result.records.len(),
        skipped = result.skipped.len(),
        "scan complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_bounds_inclusive() {
        let range = TimeRange::new(100, 200);
        assert!(range.contains(100));
        assert!(range.contains(200));
        assert!(!range.contains(99));
        assert!(!range.contains(201));

        let point = TimeRange::at(150);
        assert!(point.contains(150));
        assert!(!point.contains(151));
    }

    #[test]
    fn test_around_saturates() {
        let range = TimeRange::around(i64::MAX - 10, 1);
        assert_eq!(range.end, i64::MAX);
        assert_eq!(range.start, i64::MAX - 10 - SECS_PER_HOUR);

        let range = TimeRange::around(0, i64::MAX);
        assert_eq!(range.start, -i64::MAX);
        assert_eq!(range.end, i64::MAX);
    }

    #[test]
    fn test_around_negative_span_is_symmetric() {
        assert_eq!(TimeRange::around(1000, -1), TimeRange::around(1000, 1));
    }

    #[test]
    fn test_zero_span_is_unbounded() {
        assert!(TimeRange::from_span(0).is_unbounded());
        assert!(TimeRange::all().is_unbounded());
        assert!(!TimeRange::from_span(1).is_unbounded());
    }

    #[test]
    fn test_type_filter() {
        let payload = br#"{"time":1,"sensorType":"ph","value":7.1}"#;
        assert!(TypeFilter::all().matches(payload));
        assert!(TypeFilter::from(SensorType::Ph).matches(payload));
        assert!(!TypeFilter::from(SensorType::Ec).matches(payload));
        assert!(TypeFilter::from(None).matches(payload));
        assert_eq!(TypeFilter::from(Some(SensorType::Ec)).as_str(), "ec");
    }

    #[test]
    fn test_scan_result_filter_map_keeps_metadata() {
        let mut result = ScanResult::empty(TimeRange::at(1));
        result.records = vec![1, 2, 3, 4];
        result.examined = 5;
        result.skipped.push(SkippedRecord {
            key: "bad".to_string(),
            reason: "garbage".to_string(),
        });

        let evens = result.filter_map(|n| (n % 2 == 0).then_some(n * 10));
        assert_eq!(evens.records(), &[20, 40]);
        assert_eq!(evens.examined(), 5);
        assert_eq!(evens.skipped().len(), 1);
        assert_eq!(evens.range(), TimeRange::at(1));
        assert_eq!(evens.into_iter().sum::<i32>(), 60);
    }

    #[test]
    fn test_unix_now_is_after_2020() {
        assert!(unix_now() > 1_577_836_800);
    }
}
