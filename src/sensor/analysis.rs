//! Aggregate statistics over sequences of readings.

use serde::Serialize;
use std::collections::BTreeMap;

use super::reading::SensorReading;
use crate::utils::error::DxmError;

/// Min/max/mean over a set of register values.
#[derive(Debug, Clone, Serialize)]
pub struct ValueStats {
    pub min: u16,
    pub max: u16,
    pub avg: f64,
    pub count: usize,
}

impl ValueStats {
    fn from_values(values: &[u16]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
        Some(Self {
            min: *values.iter().min().unwrap(),
            max: *values.iter().max().unwrap(),
            avg: sum as f64 / values.len() as f64,
            count: values.len(),
        })
    }
}

/// Aggregate view over a sequence of readings from one monitoring session.
#[derive(Debug, Clone, Serialize)]
pub struct PatternAnalysis {
    pub reading_count: usize,
    /// Seconds between oldest and newest reading; `None` for a single reading.
    pub time_span_secs: Option<f64>,
    pub status_distribution: BTreeMap<&'static str, usize>,
    /// Stats over readings that carried a distance; `None` when none did.
    pub distance_stats: Option<ValueStats>,
    pub signal_quality_stats: ValueStats,
    /// Percentage of readings with `connected == true`.
    pub connection_stability: f64,
}

/// Analyze patterns across readings.
///
/// Fails with a validation error on empty input instead of producing a
/// degenerate all-zero analysis.
pub fn analyze_pattern(readings: &[SensorReading]) -> Result<PatternAnalysis, DxmError> {
    if readings.is_empty() {
        return Err(DxmError::Validation("No readings provided".to_string()));
    }

    let time_span_secs = if readings.len() > 1 {
        let min_ts = readings.iter().map(|r| r.timestamp).min().unwrap();
        let max_ts = readings.iter().map(|r| r.timestamp).max().unwrap();
        Some((max_ts - min_ts).num_milliseconds() as f64 / 1000.0)
    } else {
        None
    };

    let mut status_distribution: BTreeMap<&'static str, usize> = BTreeMap::new();
    for reading in readings {
        *status_distribution.entry(reading.status.name()).or_insert(0) += 1;
    }

    let distances: Vec<u16> = readings.iter().filter_map(|r| r.distance_mm).collect();
    let signals: Vec<u16> = readings.iter().map(|r| r.signal_quality).collect();

    let connected_count = readings.iter().filter(|r| r.connected).count();

    Ok(PatternAnalysis {
        reading_count: readings.len(),
        time_span_secs,
        status_distribution,
        distance_stats: ValueStats::from_values(&distances),
        // signals is never empty here since readings is non-empty
        signal_quality_stats: ValueStats::from_values(&signals).unwrap(),
        connection_stability: connected_count as f64 / readings.len() as f64 * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::decoder::decode;
    use chrono::{Duration, Utc};

    #[test]
    fn empty_input_is_an_error() {
        match analyze_pattern(&[]) {
            Err(DxmError::Validation(msg)) => assert!(msg.contains("No readings")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn single_reading_has_no_time_span() {
        let readings = vec![decode(1, &[303, 0, 500, 10]).unwrap()];
        let analysis = analyze_pattern(&readings).unwrap();
        assert_eq!(analysis.reading_count, 1);
        assert_eq!(analysis.time_span_secs, None);
        assert_eq!(analysis.connection_stability, 100.0);
    }

    #[test]
    fn synthetic_series_statistics() {
        // distances 1250, 1260, ..., 1320 with signal 40..47
        let readings: Vec<_> = (0..8)
            .map(|i| decode(1, &[303, 0, 1250 + i * 10, 40 + i]).unwrap())
            .collect();

        let analysis = analyze_pattern(&readings).unwrap();
        let dist = analysis.distance_stats.unwrap();
        assert_eq!(dist.min, 1250);
        assert_eq!(dist.max, 1320);
        assert_eq!(dist.avg, 1285.0);
        assert_eq!(dist.count, 8);

        assert_eq!(analysis.signal_quality_stats.min, 40);
        assert_eq!(analysis.signal_quality_stats.max, 47);
        assert_eq!(analysis.signal_quality_stats.avg, 43.5);
        assert_eq!(analysis.status_distribution.get("NORMAL"), Some(&8));
    }

    #[test]
    fn mixed_connectivity_and_statuses() {
        let readings = vec![
            decode(1, &[303, 0, 1000, 20]).unwrap(),
            decode(1, &[271, 0, 65535, 3]).unwrap(),
            decode(1, &[0, 0, 0, 0]).unwrap(),
            decode(1, &[0, 0, 0, 0]).unwrap(),
        ];

        let analysis = analyze_pattern(&readings).unwrap();
        assert_eq!(analysis.reading_count, 4);
        assert_eq!(analysis.connection_stability, 50.0);
        assert_eq!(analysis.status_distribution.get("NORMAL"), Some(&1));
        assert_eq!(analysis.status_distribution.get("OUT_OF_RANGE"), Some(&1));
        assert_eq!(analysis.status_distribution.get("ERROR_STATE"), Some(&2));

        // only the first reading carries a distance
        let dist = analysis.distance_stats.unwrap();
        assert_eq!(dist.count, 1);
        assert_eq!(dist.min, 1000);
        assert_eq!(dist.max, 1000);
    }

    #[test]
    fn time_span_spans_oldest_to_newest() {
        let mut a = decode(1, &[303, 0, 100, 5]).unwrap();
        let mut b = decode(1, &[303, 0, 110, 5]).unwrap();
        let base = Utc::now();
        a.timestamp = base;
        b.timestamp = base + Duration::seconds(5);
        let analysis = analyze_pattern(&[b, a]).unwrap();
        assert_eq!(analysis.time_span_secs, Some(5.0));
    }
}
