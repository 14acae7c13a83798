//! Display helpers for register values.
//!
//! The distance and signal-quality registers carry sentinel encodings that
//! every display surface has to agree on, so the text rendering lives here
//! rather than being re-derived at each call site.

/// Valid Modbus unit ID range for TCP (0 is reserved for broadcast).
pub fn validate_unit_id(unit_id: u8) -> bool {
    (1..=247).contains(&unit_id)
}

/// Format a raw distance register for display.
///
/// 0 means the sensor is disconnected, 65535 means no target within range.
/// Anything else is a distance in millimeters, converted to the requested
/// unit ("mm", "cm", "m", "in", "ft"; unknown units fall back to mm).
pub fn format_distance(distance_raw: u16, unit: &str, precision: usize) -> String {
    match distance_raw {
        0 => "DISCONNECTED".to_string(),
        65535 => "OUT OF RANGE".to_string(),
        raw => {
            let factor = match unit {
                "cm" => 0.1,
                "m" => 0.001,
                "in" => 0.0393701,
                "ft" => 0.00328084,
                _ => 1.0,
            };
            let unit = if matches!(unit, "cm" | "m" | "in" | "ft") {
                unit
            } else {
                "mm"
            };
            format!("{:.*} {}", precision, raw as f64 * factor, unit)
        }
    }
}

/// Format the excess-gain register with a strength tier.
pub fn format_signal_quality(excess_gain: u16) -> String {
    match excess_gain {
        0 => "No Signal (0)".to_string(),
        1..=9 => format!("Weak Signal ({})", excess_gain),
        10..=49 => format!("Good Signal ({})", excess_gain),
        _ => format!("Strong Signal ({})", excess_gain),
    }
}

/// Decompose a BDC (Binary Diagnostic Code) bitfield into labels.
///
/// Bits 0-3 have known meanings on the radar sensors we have tested against;
/// any other set bits are reported as an unlabeled hex value.
pub fn format_bdc_states(bdc_value: u16) -> String {
    if bdc_value == 0 {
        return "No Diagnostics".to_string();
    }

    let mut diagnostics = Vec::new();
    if bdc_value & 0x01 != 0 {
        diagnostics.push("Configuration Error");
    }
    if bdc_value & 0x02 != 0 {
        diagnostics.push("Temperature Warning");
    }
    if bdc_value & 0x04 != 0 {
        diagnostics.push("Voltage Warning");
    }
    if bdc_value & 0x08 != 0 {
        diagnostics.push("Signal Quality Warning");
    }

    if diagnostics.is_empty() {
        format!("Unknown Diagnostic (0x{:04X})", bdc_value)
    } else {
        format!("{} (0x{:04X})", diagnostics.join(" | "), bdc_value)
    }
}
