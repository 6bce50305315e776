//! Record types persisted by the engine.
//!
//! Every payload stored in a tenant namespace is one of the record kinds in
//! this module. [`Record`] is the tagged sum of all of them; stored bytes
//! are decoded into a `Record` exactly once at the storage boundary and
//! callers then work with the concrete types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{FarmError, Result};
use crate::namespace::SubNamespace;

/// Kind of sensor that produced a reading.
///
/// The serialized name doubles as the type tag that range queries filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    /// Air temperature.
    Temperature,
    /// Relative humidity.
    Humidity,
    /// Nutrient solution pH.
    Ph,
    /// Electrical conductivity.
    Ec,
    /// Reservoir water level.
    WaterLevel,
}

impl SensorType {
    /// All sensor types, in declaration order.
    pub const ALL: [SensorType; 5] = [
        Self::Temperature,
        Self::Humidity,
        Self::Ph,
        Self::Ec,
        Self::WaterLevel,
    ];

    /// Returns the serialized tag for this sensor type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Ph => "ph",
            Self::Ec => "ec",
            Self::WaterLevel => "waterlevel",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| format!("unknown sensor type '{s}'"))
    }
}

/// A single sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorEntry {
    /// Reading time, unix seconds.
    pub time: i64,
    /// Which sensor produced the reading.
    pub sensor_type: SensorType,
    /// The measured value. Must be finite.
    pub value: f64,
}

/// An event reported by the control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Event time, unix seconds.
    pub time: i64,
    /// Whether the reported action succeeded.
    pub success: bool,
    /// Human-readable description.
    pub message: String,
    /// Free-form event category (device name, subsystem, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Crop and growth-window settings for a farm. One per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmDetails {
    /// Crop being grown.
    pub crop_type: String,
    /// Planting time, unix seconds.
    pub planted_on: i64,
    /// Expected harvest time, unix seconds.
    pub harvest_on: i64,
    /// Fertilizer N-P-K ratio, e.g. `"10-10-10"`.
    pub npk: String,
    /// Days from planting to maturity.
    pub maturity_time: i64,
    /// Set once the details have been written at least once.
    pub configured: bool,
}

impl FarmDetails {
    /// Checks that harvest does not precede planting.
    ///
    /// # Errors
    ///
    /// Returns [`FarmError::InvalidGrowthWindow`] for an inverted window.
    pub fn validate(&self) -> Result<()> {
        if self.harvest_on < self.planted_on {
            return Err(FarmError::InvalidGrowthWindow {
                planted_on: self.planted_on,
                harvest_on: self.harvest_on,
            }
            .into());
        }
        Ok(())
    }
}

/// Bounds of one summary week, unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekOf {
    /// First second of the week (inclusive).
    pub start: i64,
    /// End of the week. Exclusive for full weeks; the trailing week of a
    /// summary ends exactly at the harvest time, inclusive.
    pub end: i64,
}

impl WeekOf {
    /// Length of the week in seconds.
    pub fn len_secs(&self) -> i64 {
        self.end - self.start
    }
}

/// Sensor values that fell inside one week of the growth window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    /// The week's bounds.
    pub week_of: WeekOf,
    /// Values per aggregated sensor type, in scan order.
    pub data: BTreeMap<SensorType, Vec<f64>>,
}

/// Weekly rollup of a tenant's growth window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// `"<plantedOn>-<harvestOn>"`.
    pub id: String,
    /// When this summary was generated, unix seconds.
    pub generated_at: i64,
    /// Farm details the summary was computed from.
    pub farm_details: FarmDetails,
    /// Weeks covering the growth window, in order.
    pub data: Vec<Week>,
}

/// A registered user. Keyed by normalized email in the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Login email; unique across the identity store.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Password hash produced by the authentication layer.
    #[serde(rename = "password")]
    pub password_hash: String,
    /// The tenant key owned by this user.
    pub key: String,
    /// Registration time, unix seconds.
    pub created_at: i64,
}

/// Record kinds, used to pick a decode path for stored bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// [`SensorEntry`].
    Sensor,
    /// [`LogEntry`].
    Log,
    /// [`FarmDetails`].
    FarmDetails,
    /// [`Summary`].
    Summary,
    /// [`User`].
    User,
}

impl RecordKind {
    /// Name used in error messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sensor => "sensor entry",
            Self::Log => "log entry",
            Self::FarmDetails => "farm details",
            Self::Summary => "summary",
            Self::User => "user",
        }
    }
}

/// Any record the engine stores, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A sensor reading.
    Sensor(SensorEntry),
    /// A control-loop event.
    Log(LogEntry),
    /// Farm settings.
    FarmDetails(FarmDetails),
    /// A weekly rollup.
    Summary(Summary),
    /// A registered user.
    User(User),
}

impl Record {
    /// Decodes stored bytes as a record of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CodecError::Decode`] if the bytes do not parse
    /// into that kind.
    pub fn decode(kind: RecordKind, bytes: &[u8]) -> Result<Self> {
        let name = kind.name();
        Ok(match kind {
            RecordKind::Sensor => Self::Sensor(codec::decode(name, bytes)?),
            RecordKind::Log => Self::Log(codec::decode(name, bytes)?),
            RecordKind::FarmDetails => Self::FarmDetails(codec::decode(name, bytes)?),
            RecordKind::Summary => Self::Summary(codec::decode(name, bytes)?),
            RecordKind::User => Self::User(codec::decode(name, bytes)?),
        })
    }

    /// Encodes the record's payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CodecError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let name = self.kind().name();
        match self {
            Self::Sensor(entry) => codec::encode(name, entry),
            Self::Log(entry) => codec::encode(name, entry),
            Self::FarmDetails(details) => codec::encode(name, details),
            Self::Summary(summary) => codec::encode(name, summary),
            Self::User(user) => codec::encode(name, user),
        }
    }

    /// Checks that the record can be stored and read back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::CodecError::NonFiniteValue`] for NaN or
    /// infinite values and [`FarmError::InvalidGrowthWindow`] for inverted
    /// farm details.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Sensor(entry) => entry.validate(),
            Self::Summary(summary) => summary.validate(),
            Self::FarmDetails(details) => details.validate(),
            Self::Log(_) | Self::User(_) => Ok(()),
        }
    }

    /// Returns the kind of this record.
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Sensor(_) => RecordKind::Sensor,
            Self::Log(_) => RecordKind::Log,
            Self::FarmDetails(_) => RecordKind::FarmDetails,
            Self::Summary(_) => RecordKind::Summary,
            Self::User(_) => RecordKind::User,
        }
    }

    /// Returns the timestamp range queries filter on, if the kind has one.
    pub fn time(&self) -> Option<i64> {
        match self {
            Self::Sensor(entry) => Some(entry.time),
            Self::Log(entry) => Some(entry.time),
            Self::Summary(summary) => Some(summary.generated_at),
            Self::FarmDetails(_) | Self::User(_) => None,
        }
    }
}

/// A record kind that is appended to a tenant sub-namespace and can be
/// range-scanned.
pub trait Entry: Serialize + Sized {
    /// Sub-namespace the entries live in.
    const NAMESPACE: SubNamespace;

    /// Checks that the entry can be encoded losslessly.
    ///
    /// # Errors
    ///
    /// Returns a codec error describing the offending field.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Extracts this kind from a decoded record.
    fn from_record(record: Record) -> Option<Self>;
}

impl Entry for SensorEntry {
    const NAMESPACE: SubNamespace = SubNamespace::Sensor;

    fn validate(&self) -> Result<()> {
        codec::ensure_finite(self.value)
    }

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Sensor(entry) => Some(entry),
            _ => None,
        }
    }
}

impl Entry for LogEntry {
    const NAMESPACE: SubNamespace = SubNamespace::Log;

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Log(entry) => Some(entry),
            _ => None,
        }
    }
}

impl Entry for Summary {
    const NAMESPACE: SubNamespace = SubNamespace::Summary;

    fn validate(&self) -> Result<()> {
        for week in &self.data {
            for value in week.data.values().flatten() {
                codec::ensure_finite(*value)?;
            }
        }
        Ok(())
    }

    fn from_record(record: Record) -> Option<Self> {
        match record {
            Record::Summary(summary) => Some(summary),
            _ => None,
        }
    }
}
