use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;

use crate::sensor::SensorReading;

pub trait ReadingFormatter: Send + Sync {
    fn format_single_reading(&self, reading: &SensorReading, distance_unit: &str) -> String;
    fn format_multiple_readings(
        &self,
        readings: &HashMap<u8, Option<SensorReading>>,
        distance_unit: &str,
    ) -> String;
    fn format_header(&self) -> String;
}

/// Resolve a formatter by name. Unknown names fall back to console output.
pub fn formatter_for(name: &str) -> Box<dyn ReadingFormatter> {
    match name {
        "json" => Box::new(JsonFormatter),
        "csv" => Box::new(CsvFormatter),
        _ => Box::new(ConsoleFormatter),
    }
}

pub struct ConsoleFormatter;

impl ReadingFormatter for ConsoleFormatter {
    fn format_single_reading(&self, reading: &SensorReading, distance_unit: &str) -> String {
        reading.format_for_display(distance_unit)
    }

    fn format_multiple_readings(
        &self,
        readings: &HashMap<u8, Option<SensorReading>>,
        distance_unit: &str,
    ) -> String {
        let mut output = String::from("📊 Sensor Readings:\n");
        output.push_str(&"═".repeat(60));
        output.push('\n');

        let mut unit_ids: Vec<u8> = readings.keys().copied().collect();
        unit_ids.sort_unstable();

        for unit_id in unit_ids {
            match &readings[&unit_id] {
                Some(reading) => {
                    output.push_str(&self.format_single_reading(reading, distance_unit));
                    output.push('\n');
                }
                None => {
                    output.push_str(&format!("🔹 Sensor {}: READ FAILED\n", unit_id));
                }
            }
            output.push_str(&"-".repeat(30));
            output.push('\n');
        }

        output
    }

    fn format_header(&self) -> String {
        format!(
            "🚀 DXM Radar Sensor Data - {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

pub struct JsonFormatter;

impl ReadingFormatter for JsonFormatter {
    fn format_single_reading(&self, reading: &SensorReading, _distance_unit: &str) -> String {
        serde_json::to_string_pretty(reading).unwrap_or_default()
    }

    fn format_multiple_readings(
        &self,
        readings: &HashMap<u8, Option<SensorReading>>,
        _distance_unit: &str,
    ) -> String {
        let mut unit_ids: Vec<u8> = readings.keys().copied().collect();
        unit_ids.sort_unstable();

        let sensors: Vec<Value> = unit_ids
            .iter()
            .map(|unit_id| match &readings[unit_id] {
                Some(reading) => serde_json::json!({
                    "unit_id": unit_id,
                    "reading": reading
                }),
                None => serde_json::json!({
                    "unit_id": unit_id,
                    "reading": Value::Null
                }),
            })
            .collect();

        let result = serde_json::json!({
            "timestamp": Utc::now().timestamp(),
            "sensors": sensors
        });

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    fn format_header(&self) -> String {
        String::new() // JSON doesn't need headers
    }
}

pub struct CsvFormatter;

impl ReadingFormatter for CsvFormatter {
    fn format_single_reading(&self, reading: &SensorReading, _distance_unit: &str) -> String {
        format!(
            "{},{},{},{},{},{},{}\n",
            reading.unit_id,
            reading.status.name(),
            reading
                .distance_mm
                .map(|d| d.to_string())
                .unwrap_or_default(),
            reading.signal_quality,
            reading.bdc_states,
            reading.connected,
            reading.timestamp.to_rfc3339()
        )
    }

    fn format_multiple_readings(
        &self,
        readings: &HashMap<u8, Option<SensorReading>>,
        distance_unit: &str,
    ) -> String {
        let mut csv = String::new();
        let mut unit_ids: Vec<u8> = readings.keys().copied().collect();
        unit_ids.sort_unstable();

        for unit_id in unit_ids {
            if let Some(reading) = &readings[&unit_id] {
                csv.push_str(&self.format_single_reading(reading, distance_unit));
            }
        }

        csv
    }

    fn format_header(&self) -> String {
        "UnitId,Status,DistanceMm,SignalQuality,BdcStates,Connected,Timestamp\n".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::decoder::decode;

    fn sample_reading() -> SensorReading {
        decode(3, &[303, 0, 1250, 45]).unwrap()
    }

    #[test]
    fn csv_row_carries_reading_fields() {
        let row = CsvFormatter.format_single_reading(&sample_reading(), "mm");
        assert!(row.starts_with("3,NORMAL,1250,45,0,true,"));
    }

    #[test]
    fn csv_header_matches_row_columns() {
        let header = CsvFormatter.format_header();
        let row = CsvFormatter.format_single_reading(&sample_reading(), "mm");
        assert_eq!(
            header.trim_end().split(',').count(),
            row.trim_end().split(',').count()
        );
    }

    #[test]
    fn json_batch_keeps_failed_units_as_null() {
        let mut readings = HashMap::new();
        readings.insert(3, Some(sample_reading()));
        readings.insert(7, None);

        let output = JsonFormatter.format_multiple_readings(&readings, "mm");
        let parsed: Value = serde_json::from_str(&output).unwrap();
        let sensors = parsed["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0]["unit_id"], 3);
        assert!(sensors[1]["reading"].is_null());
    }

    #[test]
    fn console_batch_puts_each_reading_on_its_own_line() {
        let mut readings = HashMap::new();
        readings.insert(3, Some(sample_reading()));

        let output = ConsoleFormatter.format_multiple_readings(&readings, "mm");
        assert!(output.contains("Good Signal (45)\n"));
        let reading_line = output
            .lines()
            .find(|l| l.starts_with("Unit 3:"))
            .unwrap();
        assert!(!reading_line.contains("---"));
    }

    #[test]
    fn console_batch_marks_failed_units() {
        let mut readings = HashMap::new();
        readings.insert(2, None);
        let output = ConsoleFormatter.format_multiple_readings(&readings, "mm");
        assert!(output.contains("Sensor 2: READ FAILED"));
    }

    #[test]
    fn formatter_lookup_falls_back_to_console() {
        let formatter = formatter_for("unknown");
        assert!(formatter.format_header().contains("DXM Radar"));
    }
}
