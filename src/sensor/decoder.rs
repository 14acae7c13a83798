//! Register decoding for DXM-bridged radar sensors.
//!
//! The DXM controller maps each IO-Link sensor to four consecutive holding
//! registers starting at address 0:
//!
//! | Register | Contents                                              |
//! |----------|-------------------------------------------------------|
//! | 0        | Status (303=Normal, 271=Out of Range, 0=Error)        |
//! | 1        | BDC states (diagnostic bitfield)                      |
//! | 2        | Distance in mm (0=Disconnected, 65535=Out of Range)   |
//! | 3        | Signal quality (excess gain)                          |
//!
//! Everything in this module is a pure function of its inputs (plus the
//! clock for timestamps); there is no I/O and no state, so it is safe to
//! call from any number of clients concurrently.

use chrono::Utc;
use serde::Serialize;

use super::reading::{SensorReading, SensorStatus};
use crate::utils::error::DxmError;
use crate::utils::format::{format_bdc_states, format_distance, format_signal_quality};

pub const STATUS_REGISTER: u16 = 0;
pub const BDC_REGISTER: u16 = 1;
pub const DISTANCE_REGISTER: u16 = 2;
pub const SIGNAL_QUALITY_REGISTER: u16 = 3;

/// Minimum register count for a complete reading.
pub const MIN_REGISTERS: usize = 4;

/// Decode raw holding registers into a structured reading.
///
/// Requires at least [`MIN_REGISTERS`] values; fails with
/// [`DxmError::InsufficientData`] otherwise. The timestamp is stamped at
/// decode time.
pub fn decode(unit_id: u8, registers: &[u16]) -> Result<SensorReading, DxmError> {
    if registers.len() < MIN_REGISTERS {
        return Err(DxmError::InsufficientData {
            required: MIN_REGISTERS,
            actual: registers.len(),
        });
    }

    Ok(SensorReading::from_registers(
        unit_id,
        Utc::now(),
        registers[STATUS_REGISTER as usize],
        registers[BDC_REGISTER as usize],
        registers[DISTANCE_REGISTER as usize],
        registers[SIGNAL_QUALITY_REGISTER as usize],
    ))
}

/// Decoded descriptor for a single register, for diagnostics and the
/// `registers` CLI command.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterInfo {
    pub address: u16,
    pub raw_value: u16,
    pub hex_value: String,
    pub binary_value: String,
    pub register_name: Option<&'static str>,
    pub interpretation: String,
    pub description: &'static str,
}

/// Interpret one register value in isolation.
///
/// Addresses at or beyond the known map decode as "Unknown register" while
/// still carrying the hex/binary renderings.
pub fn decode_single_register(address: u16, value: u16) -> RegisterInfo {
    let hex_value = format!("0x{:04X}", value);
    let binary_value = format!("{:016b}", value);

    match address {
        STATUS_REGISTER => RegisterInfo {
            address,
            raw_value: value,
            hex_value,
            binary_value,
            register_name: Some("Status"),
            interpretation: SensorStatus::from_raw(value).name().to_string(),
            description: "Sensor operational status",
        },
        BDC_REGISTER => RegisterInfo {
            address,
            raw_value: value,
            hex_value,
            binary_value,
            register_name: Some("BDC States"),
            interpretation: format_bdc_states(value),
            description: "Binary Diagnostic Code states",
        },
        DISTANCE_REGISTER => RegisterInfo {
            address,
            raw_value: value,
            hex_value,
            binary_value,
            register_name: Some("Distance"),
            interpretation: format_distance(value, "mm", 1),
            description: "Distance measurement in millimeters",
        },
        SIGNAL_QUALITY_REGISTER => RegisterInfo {
            address,
            raw_value: value,
            hex_value,
            binary_value,
            register_name: Some("Signal Quality"),
            interpretation: format_signal_quality(value),
            description: "Excess gain indicating signal strength",
        },
        _ => RegisterInfo {
            address,
            raw_value: value,
            hex_value,
            binary_value,
            register_name: None,
            interpretation: "Unknown register".to_string(),
            description: "Not part of the known sensor register map",
        },
    }
}

/// Static metadata for the known register map.
pub fn register_info() -> [(u16, &'static str, &'static str, &'static str); 4] {
    [
        (
            STATUS_REGISTER,
            "Status",
            "Sensor operational status",
            "303=Normal, 271=Out of Range, 0=Error",
        ),
        (
            BDC_REGISTER,
            "BDC States",
            "Binary Diagnostic Code states",
            "Bitfield indicating diagnostic conditions",
        ),
        (
            DISTANCE_REGISTER,
            "Distance",
            "Distance measurement in millimeters",
            "0=Disconnected, 65535=Out of Range, 1-65534=Distance in mm",
        ),
        (
            SIGNAL_QUALITY_REGISTER,
            "Signal Quality",
            "Signal strength indicator (excess gain)",
            "0=No signal, >0=Signal strength level",
        ),
    ]
}

/// Maximum plausible distance for the supported radar sensors, in mm.
const MAX_DISTANCE_MM: u16 = 30000;

/// Validate a reading and return the issues found (empty = valid).
///
/// Validation reports, it never fails. The disconnected/out-of-range
/// partition established at construction is re-checked here rather than
/// trusted.
pub fn validate(reading: &SensorReading) -> Vec<String> {
    let mut issues = Vec::new();

    if reading.status == SensorStatus::Unknown {
        issues.push(format!("Unknown status code: {}", reading.status_raw));
    }

    if reading.distance_raw == 0 && reading.connected {
        issues.push("Distance indicates disconnected but sensor shows connected".to_string());
    }

    // Registers are unsigned 16-bit, so this cannot fire from decode();
    // kept for parity with the signed representations some exports use.
    if i32::from(reading.signal_quality) < 0 {
        issues.push(format!("Invalid signal quality: {}", reading.signal_quality));
    }

    if reading.timestamp > Utc::now() {
        issues.push("Reading timestamp is in the future".to_string());
    }

    if let Some(mm) = reading.distance_mm {
        if mm > MAX_DISTANCE_MM {
            issues.push(format!("Distance value outside expected range: {}mm", mm));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn decode_normal_operation() {
        let reading = decode(1, &[303, 0, 1250, 45]).unwrap();
        assert_eq!(reading.unit_id, 1);
        assert_eq!(reading.status, SensorStatus::Normal);
        assert_eq!(reading.status_raw, 303);
        assert_eq!(reading.bdc_states, 0);
        assert_eq!(reading.distance_raw, 1250);
        assert_eq!(reading.distance_mm, Some(1250));
        assert_eq!(reading.signal_quality, 45);
        assert!(reading.connected);
        assert!(reading.valid);
        // timestamp is assigned at decode time
        assert!((Utc::now() - reading.timestamp).num_seconds() < 1);
    }

    #[test]
    fn decode_out_of_range() {
        let reading = decode(2, &[271, 0, 65535, 12]).unwrap();
        assert_eq!(reading.status, SensorStatus::OutOfRange);
        assert_eq!(reading.distance_mm, None);
        assert!(reading.connected);
    }

    #[test]
    fn decode_disconnected_sensor() {
        let reading = decode(3, &[0, 0, 0, 0]).unwrap();
        assert_eq!(reading.status, SensorStatus::ErrorState);
        assert_eq!(reading.distance_mm, None);
        assert!(!reading.connected);
    }

    #[test]
    fn decode_unknown_status_keeps_distance() {
        let reading = decode(4, &[999, 0, 1000, 30]).unwrap();
        assert_eq!(reading.status, SensorStatus::Unknown);
        assert_eq!(reading.status_raw, 999);
        assert_eq!(reading.distance_mm, Some(1000));
    }

    #[test]
    fn decode_preserves_bdc_bits() {
        let reading = decode(5, &[303, 0x0007, 1500, 55]).unwrap();
        assert_eq!(reading.bdc_states, 0x0007);
    }

    #[test]
    fn decode_ignores_extra_registers() {
        let reading = decode(1, &[303, 0, 800, 20, 1234, 5678]).unwrap();
        assert_eq!(reading.distance_mm, Some(800));
    }

    #[test]
    fn decode_insufficient_registers() {
        for count in 0..MIN_REGISTERS {
            let registers = vec![303u16; count];
            match decode(1, &registers) {
                Err(DxmError::InsufficientData { required, actual }) => {
                    assert_eq!(required, MIN_REGISTERS);
                    assert_eq!(actual, count);
                }
                other => panic!("expected InsufficientData, got {:?}", other),
            }
        }
    }

    #[test]
    fn decode_is_deterministic_apart_from_timestamp() {
        let a = decode(1, &[271, 2, 400, 9]).unwrap();
        let b = decode(1, &[271, 2, 400, 9]).unwrap();
        assert_eq!(a.status, b.status);
        assert_eq!(a.distance_mm, b.distance_mm);
        assert_eq!(a.connected, b.connected);
        assert_eq!(a.signal_quality, b.signal_quality);
    }

    #[test]
    fn single_register_status() {
        let info = decode_single_register(0, 303);
        assert_eq!(info.register_name, Some("Status"));
        assert_eq!(info.interpretation, "NORMAL");
        assert_eq!(info.hex_value, "0x012F");
    }

    #[test]
    fn single_register_bdc() {
        let info = decode_single_register(1, 0x0001);
        assert_eq!(info.register_name, Some("BDC States"));
        assert!(info.interpretation.contains("Configuration Error"));
    }

    #[test]
    fn single_register_unknown_address() {
        let info = decode_single_register(7, 42);
        assert_eq!(info.register_name, None);
        assert_eq!(info.interpretation, "Unknown register");
        assert_eq!(info.binary_value, "0000000000101010");
    }

    #[test]
    fn validate_clean_reading() {
        let reading = decode(1, &[303, 0, 1250, 45]).unwrap();
        assert!(validate(&reading).is_empty());
    }

    #[test]
    fn validate_unknown_status() {
        let reading = decode(1, &[999, 0, 1000, 30]).unwrap();
        let issues = validate(&reading);
        assert!(issues.iter().any(|i| i.contains("Unknown status code: 999")));
    }

    #[test]
    fn validate_future_timestamp() {
        let mut reading = decode(1, &[303, 0, 1250, 45]).unwrap();
        reading.timestamp = Utc::now() + Duration::seconds(60);
        let issues = validate(&reading);
        assert!(issues.iter().any(|i| i.contains("future")));
    }

    #[test]
    fn validate_inconsistent_disconnect() {
        let mut reading = decode(1, &[303, 0, 0, 45]).unwrap();
        // force the inconsistency the partition normally prevents
        reading.connected = true;
        let issues = validate(&reading);
        assert!(issues
            .iter()
            .any(|i| i.contains("disconnected but sensor shows connected")));
    }

    #[test]
    fn validate_distance_out_of_physical_range() {
        let reading = decode(1, &[303, 0, 32000, 45]).unwrap();
        let issues = validate(&reading);
        assert!(issues.iter().any(|i| i.contains("outside expected range")));
    }
}
