use log::{info, warn};
use std::time::Duration;

use crate::config::Config;
use crate::modbus::DxmClient;
use crate::output::{formatter_for, ReadingFormatter};
use crate::sensor::{analyze_pattern, PatternAnalysis, SensorReading};
use crate::utils::error::DxmError;

/// Continuous acquisition service: owns the client, a formatter, and a
/// per-unit reading history used for the end-of-run pattern summary.
pub struct MonitorService {
    config: Config,
    client: DxmClient,
    formatter: Box<dyn ReadingFormatter>,
    history: Vec<SensorReading>,
}

impl MonitorService {
    pub fn new(config: Config) -> Self {
        info!("🚀 Initializing DXM monitor service");
        info!("📡 Target: {}:{}", config.host, config.port);
        info!(
            "⏱️  Polling every {}s, timeout {}s, {} retries",
            config.poll_interval_secs, config.timeout_secs, config.retry_attempts
        );

        let client = DxmClient::new(
            &config.host,
            config.port,
            config.timeout(),
            config.retry_attempts,
        );
        let formatter = formatter_for(&config.output_format);

        Self {
            config,
            client,
            formatter,
            history: Vec::new(),
        }
    }

    /// Connect, resolve the unit list (explicit or discovered), then poll
    /// until the duration elapses or Ctrl-C arrives. Always disconnects and
    /// prints a pattern summary of everything collected.
    pub async fn run(
        &mut self,
        unit_ids: Vec<u8>,
        duration: Option<Duration>,
    ) -> Result<(), DxmError> {
        self.client.connect().await?;

        let unit_ids = if unit_ids.is_empty() {
            info!("No units specified, discovering sensors first");
            let discovered = self.client.discover_sensors(self.config.max_scan_units).await?;
            if discovered.is_empty() {
                self.client.disconnect().await;
                return Err(DxmError::Communication(
                    "No sensors discovered to monitor".to_string(),
                ));
            }
            discovered
        } else {
            unit_ids
        };

        if self.config.show_timestamps {
            let header = self.formatter.format_header();
            if !header.is_empty() {
                print!("{}", header);
            }
        }

        let interval = self.config.poll_interval();
        let distance_unit = self.config.distance_unit.clone();
        let mut poller = self.client.poll_sensors(unit_ids, interval, duration);

        loop {
            tokio::select! {
                batch = poller.next_batch() => {
                    let Some(batch) = batch else { break };

                    print!("{}", self.formatter.format_multiple_readings(&batch.readings, &distance_unit));
                    for reading in batch.readings.values().flatten() {
                        self.history.push(reading.clone());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("🛑 Shutdown signal received, stopping monitor");
                    break;
                }
            }
        }
        drop(poller);

        self.client.disconnect().await;
        self.print_summary();
        Ok(())
    }

    /// Readings collected so far, oldest first.
    pub fn history(&self) -> &[SensorReading] {
        &self.history
    }

    pub fn summary(&self) -> Result<PatternAnalysis, DxmError> {
        analyze_pattern(&self.history)
    }

    fn print_summary(&self) {
        match self.summary() {
            Ok(analysis) => {
                info!("📈 Session summary:");
                info!("  Readings collected: {}", analysis.reading_count);
                if let Some(span) = analysis.time_span_secs {
                    info!("  Time span: {:.1}s", span);
                }
                for (status, count) in &analysis.status_distribution {
                    info!("  Status {}: {}", status, count);
                }
                if let Some(stats) = &analysis.distance_stats {
                    info!(
                        "  Distance: min {} mm, max {} mm, avg {:.1} mm",
                        stats.min, stats.max, stats.avg
                    );
                }
                info!(
                    "  Signal quality: min {}, max {}, avg {:.1}",
                    analysis.signal_quality_stats.min,
                    analysis.signal_quality_stats.max,
                    analysis.signal_quality_stats.avg
                );
                info!(
                    "  Connection stability: {:.1}%",
                    analysis.connection_stability
                );
            }
            Err(_) => {
                warn!("No readings collected, skipping summary");
            }
        }
    }
}
