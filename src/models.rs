use std::fmt;
use std::str::FromStr;
use time::Date;

use crate::packet::{MagnetState, PacketTypeInfo};
use crate::utils::{tohex_i32, toint_i32, IdParseError};

/// Serial id of a sensor node as the gateway stores it (signed 32-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub i32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&tohex_i32(self.0))
    }
}

impl FromStr for DeviceId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toint_i32(s).map(DeviceId)
    }
}

/// One row of `sensor_data` / `sensor_last`
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: i64,
    pub logical_id: i32,
    pub link_quality: i32,
    pub packet_type: i32,
    pub values: [Option<f64>; 4],
    pub supply_voltage_mv: i32,
    pub status_bits: u32,
    pub event_code: i32,
}

/// A value column after decoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    /// NULL in the store
    Absent,
    /// Raw number, passed through unchanged
    Number(f64),
    /// Resolved by one of the bitfield decoders
    Label(&'static str),
    /// A decoder applied but could not interpret the raw value
    Degraded(Option<f64>),
}

impl Field {
    pub fn from_raw(raw: Option<f64>) -> Self {
        raw.map_or(Field::Absent, Field::Number)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Field::Degraded(_))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Absent | Field::Degraded(None) => Ok(()),
            Field::Number(v) | Field::Degraded(Some(v)) => write!(f, "{}", v),
            Field::Label(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledField {
    /// Column index 0..=3 in the raw sample
    pub slot: usize,
    pub label: &'static str,
    pub value: Field,
}

/// Display-ready form of a [`RawSample`]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSample {
    pub timestamp: i64,
    pub logical_id: i32,
    pub link_quality: i32,
    pub packet_type: i32,
    pub info: &'static PacketTypeInfo,
    pub values: Vec<LabeledField>,
    pub supply_voltage_mv: i32,
    pub magnet_state: Option<MagnetState>,
    pub event_code: i32,
    pub event_label: Option<&'static str>,
}

impl DecodedSample {
    pub fn field(&self, slot: usize) -> Option<&LabeledField> {
        self.values.iter().find(|f| f.slot == slot)
    }

    /// Event label if one was resolved, the raw code otherwise
    pub fn event(&self) -> String {
        self.event_label
            .map(str::to_string)
            .unwrap_or_else(|| self.event_code.to_string())
    }
}

/// Time range of a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// One calendar day as recorded by the gateway
    Day(Date),
    /// The 24 hours ending at (and including) this timestamp
    Latest(i64),
}

impl Window {
    /// Length of a rolling window minus one, both ends are inclusive
    pub const LATEST_SPAN_SECS: i64 = 86_399;

    /// Inclusive timestamp bounds of a rolling window
    pub fn ts_range(&self) -> Option<(i64, i64)> {
        match *self {
            Window::Day(_) => None,
            Window::Latest(ts) => Some((ts.saturating_sub(Self::LATEST_SPAN_SECS), ts)),
        }
    }
}

/// One chartable value column, aligned with [`TimeSeriesBundle::timestamps`]
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub slot: usize,
    pub label: &'static str,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesBundle {
    pub sid: DeviceId,
    pub date: Date,
    pub packet_type: Option<i32>,
    pub logical_id: Option<i32>,
    pub info: &'static PacketTypeInfo,
    pub timestamps: Vec<i64>,
    pub series: Vec<Series>,
}

impl TimeSeriesBundle {
    pub fn device_label(&self) -> &'static str {
        self.info.device_name
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Latest sample of a node together with its registered names
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub sid: DeviceId,
    pub sid_text: String,
    pub description: String,
    pub latest: DecodedSample,
}

/// All decoded samples of one node for one day
#[derive(Debug, Clone, PartialEq)]
pub struct DayTable {
    pub sid: DeviceId,
    pub date: Date,
    pub logical_id: Option<i32>,
    pub info: &'static PacketTypeInfo,
    pub rows: Vec<DecodedSample>,
}
