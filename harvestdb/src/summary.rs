//! Weekly summaries of a tenant's growth window.
//!
//! A summary splits `[plantedOn, harvestOn]` into consecutive weeks and
//! collects the sensor readings that fall into each one.
//!
//! # Week Layout
//!
//! ```text
//! plantedOn                                                harvestOn
//! |--- week 1 ---|--- week 2 ---| ... |--- week N ---|-- tail --|
//! [p, p+7d)      [p+7d, p+14d)        full weeks      [p+7Nd, harvestOn]
//! ```
//!
//! `N` is the number of whole weeks in the window, counted in whole days.
//! The trailing week is always present, even when it is zero seconds long,
//! so every summary has at least one week and the weeks tile the window
//! with no gaps or overlaps.
//!
//! Only temperature and water-level readings are aggregated; they are the
//! two series growth reports use.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FarmError, Result};
use crate::record::{FarmDetails, SensorEntry, SensorType, Summary, Week, WeekOf};

/// Seconds in one day.
pub const SECS_PER_DAY: i64 = 86_400;

/// Days in one summary week.
pub const DAYS_PER_WEEK: i64 = 7;

/// Seconds in one summary week.
pub const SECS_PER_WEEK: i64 = DAYS_PER_WEEK * SECS_PER_DAY;

/// Upper bound on the number of weeks in one summary (about twenty years).
///
/// Keeps a corrupted or mistyped harvest date from allocating an enormous
/// summary.
pub const MAX_WEEKS: i64 = 1_040;

/// Sensor types collected into summary weeks.
pub const AGGREGATED_SENSORS: [SensorType; 2] = [SensorType::Temperature, SensorType::WaterLevel];

/// Returns the summary id for a growth window, `"<plantedOn>-<harvestOn>"`.
pub fn summary_id(details: &FarmDetails) -> String {
    format!("{}-{}", details.planted_on, details.harvest_on)
}

/// Computes the weekly partition of `[planted_on, harvest_on]`.
///
/// # Errors
///
/// Returns [`FarmError::InvalidGrowthWindow`] if harvest precedes planting
/// and [`FarmError::GrowthWindowTooLong`] if the window exceeds
/// [`MAX_WEEKS`].
///
/// # Examples
///
/// ```rust
/// use harvestdb::summary::{week_windows, SECS_PER_DAY};
///
/// // 21 days: three full weeks plus a zero-length trailing week.
/// let weeks = week_windows(0, 21 * SECS_PER_DAY).unwrap();
/// assert_eq!(weeks.len(), 4);
/// assert_eq!(weeks[3].len_secs(), 0);
/// ```
pub fn week_windows(planted_on: i64, harvest_on: i64) -> Result<Vec<WeekOf>> {
    if harvest_on < planted_on {
        return Err(FarmError::InvalidGrowthWindow {
            planted_on,
            harvest_on,
        }
        .into());
    }

    let span = harvest_on
        .checked_sub(planted_on)
        .ok_or(FarmError::GrowthWindowTooLong {
            weeks: i64::MAX,
            max_weeks: MAX_WEEKS,
        })?;

    let total_days = span / SECS_PER_DAY;
    let full_weeks = (total_days - total_days % DAYS_PER_WEEK) / DAYS_PER_WEEK;
    if full_weeks >= MAX_WEEKS {
        return Err(FarmError::GrowthWindowTooLong {
            weeks: full_weeks + 1,
            max_weeks: MAX_WEEKS,
        }
        .into());
    }

    let mut weeks = Vec::new();
    for week in 1..=full_weeks {
        weeks.push(WeekOf {
            start: planted_on + (week - 1) * SECS_PER_WEEK,
            end: planted_on + week * SECS_PER_WEEK,
        });
    }
    weeks.push(WeekOf {
        start: planted_on + full_weeks * SECS_PER_WEEK,
        end: harvest_on,
    });

    Ok(weeks)
}

/// Index of the week containing `time`, given the partition's length.
///
/// `time` must lie in the growth window. Readings past the last full week
/// land in the trailing week.
fn week_index(planted_on: i64, time: i64, week_count: usize) -> usize {
    let offset = (time - planted_on) / SECS_PER_WEEK;
    usize::try_from(offset)
        .unwrap_or(0)
        .min(week_count.saturating_sub(1))
}

/// Builds a summary from farm details and the sensor readings of its growth
/// window.
///
/// Readings outside `[planted_on, harvest_on]` and readings of sensor types
/// not in [`AGGREGATED_SENSORS`] are ignored.
///
/// # Errors
///
/// Returns an error if the growth window is invalid (see [`week_windows`]).
pub fn build_summary<I>(details: &FarmDetails, readings: I, generated_at: i64) -> Result<Summary>
where
    I: IntoIterator<Item = SensorEntry>,
{
    let windows = week_windows(details.planted_on, details.harvest_on)?;
    let mut weeks: Vec<Week> = windows
        .into_iter()
        .map(|week_of| Week {
            week_of,
            data: AGGREGATED_SENSORS
                .iter()
                .map(|sensor| (*sensor, Vec::new()))
                .collect(),
        })
        .collect();

    let mut assigned = 0usize;
    for reading in readings {
        if reading.time < details.planted_on || reading.time > details.harvest_on {
            continue;
        }
        let index = week_index(details.planted_on, reading.time, weeks.len());
        if let Some(values) = weeks[index].data.get_mut(&reading.sensor_type) {
            values.push(reading.value);
            assigned += 1;
        }
    }

    debug!(weeks = weeks.len(), assigned, "summary built");

    Ok(Summary {
        id: summary_id(details),
        generated_at,
        farm_details: details.clone(),
        data: weeks,
    })
}

impl Week {
    /// Values recorded for `sensor` in this week. Empty for sensor types
    /// that are not aggregated.
    pub fn values(&self, sensor: SensorType) -> &[f64] {
        self.data.get(&sensor).map_or(&[], Vec::as_slice)
    }

    /// Applies an aggregation to this week's values for `sensor`.
    ///
    /// Returns `None` if the week has no values for that sensor.
    pub fn aggregate(&self, sensor: SensorType, aggregation: Aggregation) -> Option<f64> {
        let values = self.values(sensor);
        if values.is_empty() {
            return None;
        }
        Some(aggregation.apply(values))
    }
}

/// Reduction applied to a week's readings for reporting.
///
/// NaN and infinite values are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Arithmetic mean.
    Average,

    /// Smallest value.
    Min,

    /// Largest value.
    Max,

    /// Last value in scan order.
    Last,

    /// Sum of values.
    Sum,

    /// Number of values.
    Count,
}

impl Aggregation {
    /// All aggregations, in declaration order.
    pub const ALL: [Aggregation; 6] = [
        Self::Average,
        Self::Min,
        Self::Max,
        Self::Last,
        Self::Sum,
        Self::Count,
    ];

    /// Applies this aggregation to a slice of values.
    ///
    /// Returns NaN if no finite values are present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use harvestdb::summary::Aggregation;
    ///
    /// let values = [1.0, 2.0, f64::NAN, 4.0];
    ///
    /// assert!((Aggregation::Average.apply(&values) - 7.0 / 3.0).abs() < 1e-10);
    /// assert_eq!(Aggregation::Min.apply(&values), 1.0);
    /// assert_eq!(Aggregation::Max.apply(&values), 4.0);
    /// assert_eq!(Aggregation::Last.apply(&values), 4.0);
    /// assert_eq!(Aggregation::Sum.apply(&values), 7.0);
    /// assert_eq!(Aggregation::Count.apply(&values), 3.0);
    /// ```
    #[allow(clippy::cast_precision_loss)] // counts far below 2^52
    pub fn apply(self, values: &[f64]) -> f64 {
        let mut finite = values.iter().copied().filter(|v| v.is_finite()).peekable();
        if finite.peek().is_none() {
            return f64::NAN;
        }

        match self {
            Self::Average => {
                let (sum, count) = finite.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
                sum / count as f64
            }
            Self::Min => finite.fold(f64::INFINITY, f64::min),
            Self::Max => finite.fold(f64::NEG_INFINITY, f64::max),
            Self::Last => finite.last().unwrap_or(f64::NAN),
            Self::Sum => finite.sum(),
            Self::Count => finite.count() as f64,
        }
    }

    /// Returns the lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Min => "min",
            Self::Max => "max",
            Self::Last => "last",
            Self::Sum => "sum",
            Self::Count => "count",
        }
    }
}
