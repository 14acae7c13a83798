use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::format::{format_distance, format_signal_quality};

/// Distance register value meaning "sensor disconnected".
pub const DISTANCE_DISCONNECTED: u16 = 0;
/// Distance register value meaning "no target within range".
pub const DISTANCE_OUT_OF_RANGE: u16 = 65535;

/// Operational status reported by the radar sensor.
///
/// The raw codes come from observed DXM behavior: 303 (0x012F) during normal
/// operation and 271 (0x010F) when the target is beyond range. The set is
/// open; unrecognized codes map to `Unknown` and the raw value is always
/// preserved alongside on the reading, so new codes only need a match arm
/// here, not a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorStatus {
    Normal,
    OutOfRange,
    ErrorState,
    Unknown,
}

impl SensorStatus {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            303 => SensorStatus::Normal,
            271 => SensorStatus::OutOfRange,
            0 => SensorStatus::ErrorState,
            _ => SensorStatus::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorStatus::Normal => "NORMAL",
            SensorStatus::OutOfRange => "OUT_OF_RANGE",
            SensorStatus::ErrorState => "ERROR_STATE",
            SensorStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SensorStatus::Normal => "Sensor operating normally with valid readings",
            SensorStatus::OutOfRange => "Target beyond sensor measurement range",
            SensorStatus::ErrorState => "Sensor error or communication failure",
            SensorStatus::Unknown => "Unrecognized status code - check sensor documentation",
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded sensor reading, immutable once constructed.
///
/// The distance register folds two sentinels into the measurement field:
/// 0 means the IO-Link sensor is disconnected from the DXM, 65535 means the
/// sensor is present but sees no target. Both are resolved once at
/// construction into `distance_mm` (the derived optional measurement) and
/// `connected`, so call sites never re-derive the sentinel logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub unit_id: u8,
    pub timestamp: DateTime<Utc>,
    pub status: SensorStatus,
    pub status_raw: u16,
    pub bdc_states: u16,
    pub distance_mm: Option<u16>,
    pub distance_raw: u16,
    pub signal_quality: u16,
    pub connected: bool,
    pub valid: bool,
}

impl SensorReading {
    /// Build a reading from raw register values, deriving `status`,
    /// `distance_mm` and `connected`. `valid` defaults to true; it is a
    /// caller-assigned flag, not derived from the registers.
    pub fn from_registers(
        unit_id: u8,
        timestamp: DateTime<Utc>,
        status_raw: u16,
        bdc_states: u16,
        distance_raw: u16,
        signal_quality: u16,
    ) -> Self {
        let (connected, distance_mm) = match distance_raw {
            DISTANCE_DISCONNECTED => (false, None),
            DISTANCE_OUT_OF_RANGE => (true, None),
            raw => (true, Some(raw)),
        };

        Self {
            unit_id,
            timestamp,
            status: SensorStatus::from_raw(status_raw),
            status_raw,
            bdc_states,
            distance_mm,
            distance_raw,
            signal_quality,
            connected,
            valid: true,
        }
    }

    /// Single-line rendering for tables and monitor output.
    pub fn format_for_display(&self, distance_unit: &str) -> String {
        format!(
            "Unit {}: {} | Distance: {} | Signal: {}",
            self.unit_id,
            self.status,
            format_distance(self.distance_raw, distance_unit, 1),
            format_signal_quality(self.signal_quality)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_sentinel() {
        let r = SensorReading::from_registers(1, Utc::now(), 0, 0, 0, 0);
        assert!(!r.connected);
        assert_eq!(r.distance_mm, None);
        assert_eq!(r.status, SensorStatus::ErrorState);
    }

    #[test]
    fn out_of_range_sentinel_keeps_connected() {
        let r = SensorReading::from_registers(2, Utc::now(), 271, 0, 65535, 12);
        assert!(r.connected);
        assert_eq!(r.distance_mm, None);
        assert_eq!(r.status, SensorStatus::OutOfRange);
    }

    #[test]
    fn normal_distance_passes_through() {
        let r = SensorReading::from_registers(1, Utc::now(), 303, 0, 1250, 45);
        assert!(r.connected);
        assert_eq!(r.distance_mm, Some(1250));
        assert!(r.valid);
    }

    #[test]
    fn distance_some_implies_connected() {
        for raw in [1u16, 500, 65534] {
            let r = SensorReading::from_registers(1, Utc::now(), 303, 0, raw, 10);
            assert!(r.distance_mm.is_some());
            assert!(r.connected);
        }
    }

    #[test]
    fn status_serializes_as_name() {
        let r = SensorReading::from_registers(1, Utc::now(), 271, 0, 100, 5);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "OUT_OF_RANGE");
        assert_eq!(json["unit_id"], 1);
        assert_eq!(json["distance_mm"], 100);
    }

    #[test]
    fn display_line() {
        let r = SensorReading::from_registers(3, Utc::now(), 303, 0, 1250, 45);
        assert_eq!(
            r.format_for_display("mm"),
            "Unit 3: NORMAL | Distance: 1250.0 mm | Signal: Good Signal (45)"
        );
    }
}
