use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};

use super::transport::{ModbusTransport, TcpTransport};
use crate::sensor::decoder::{decode, MIN_REGISTERS};
use crate::sensor::reading::SensorReading;
use crate::utils::error::DxmError;
use crate::utils::format::validate_unit_id;

/// Fixed delay between register-read retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);
/// Fixed delay between discovery probes, to avoid flooding the controller.
const DISCOVERY_DELAY: Duration = Duration::from_millis(50);
/// Unit IDs probed by `test_connection`.
const TEST_UNIT_RANGE: std::ops::RangeInclusive<u8> = 1..=4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot of the client's connection parameters and state.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub connected: bool,
    pub timeout_secs: f64,
    pub retry_attempts: u32,
    pub last_error: Option<String>,
}

/// Result of a layered connectivity test. Collects problems instead of
/// failing fast; its job is to report.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub tcp_connection: bool,
    pub modbus_communication: bool,
    pub sensor_detection: bool,
    pub latency_ms: Option<f64>,
    pub errors: Vec<String>,
}

/// Client for one DXM controller over a single Modbus TCP session.
///
/// The session is not safe for concurrent use; all I/O methods take
/// `&mut self` so the one-request-in-flight discipline is enforced at
/// compile time. Callers that need higher throughput run multiple
/// independent client instances.
pub struct DxmClient {
    transport: Box<dyn ModbusTransport>,
    host: String,
    port: u16,
    timeout: Duration,
    retry_attempts: u32,
    state: ClientState,
    last_error: Option<String>,
}

impl DxmClient {
    /// Create a client for `host:port` with the given connection timeout and
    /// per-read retry budget. Does not connect yet.
    pub fn new(host: &str, port: u16, timeout: Duration, retry_attempts: u32) -> Self {
        Self::with_transport(
            Box::new(TcpTransport::new(host, port, timeout)),
            host,
            port,
            timeout,
            retry_attempts,
        )
    }

    /// Create a client over an arbitrary transport implementation.
    pub fn with_transport(
        transport: Box<dyn ModbusTransport>,
        host: &str,
        port: u16,
        timeout: Duration,
        retry_attempts: u32,
    ) -> Self {
        Self {
            transport,
            host: host.to_string(),
            port,
            timeout,
            retry_attempts,
            state: ClientState::Disconnected,
            last_error: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.state == ClientState::Connected && self.transport.is_connected()
    }

    /// Last connection/communication error recorded, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            host: self.host.clone(),
            port: self.port,
            connected: self.connected(),
            timeout_secs: self.timeout.as_secs_f64(),
            retry_attempts: self.retry_attempts,
            last_error: self.last_error.clone(),
        }
    }

    /// Establish the Modbus TCP session and verify it with a liveness probe
    /// (one register from unit 1). On any failure the client returns to the
    /// disconnected state and records the cause.
    pub async fn connect(&mut self) -> Result<(), DxmError> {
        info!("🔌 Connecting to DXM at {}:{}", self.host, self.port);
        self.state = ClientState::Connecting;

        if let Err(e) = self.transport.connect().await {
            self.state = ClientState::Disconnected;
            self.last_error = Some(e.to_string());
            return Err(DxmError::Connection(format!(
                "Failed to connect to DXM: {}",
                e
            )));
        }

        // Verify the Modbus layer responds, not just the TCP accept
        if let Err(e) = self.transport.read_holding_registers(0, 1, 1).await {
            self.transport.close().await;
            self.state = ClientState::Disconnected;
            self.last_error = Some(e.to_string());
            return Err(DxmError::Connection(format!(
                "Modbus communication test failed: {}",
                e
            )));
        }

        self.state = ClientState::Connected;
        self.last_error = None;
        info!("✅ Successfully connected to DXM at {}:{}", self.host, self.port);
        Ok(())
    }

    /// Close the session. Idempotent, never fails, always leaves the client
    /// disconnected; safe to call from cleanup paths even if `connect` never
    /// succeeded.
    pub async fn disconnect(&mut self) {
        if self.transport.is_connected() {
            self.transport.close().await;
            info!("✅ Disconnected from DXM");
        }
        self.state = ClientState::Disconnected;
    }

    /// Layered connectivity diagnostics: a raw TCP probe (independent of the
    /// Modbus session) for reachability and latency, then Modbus reads
    /// across units 1-4 for protocol responsiveness and sensor presence.
    pub async fn test_connection(&mut self) -> ConnectionReport {
        let mut report = ConnectionReport {
            tcp_connection: false,
            modbus_communication: false,
            sensor_detection: false,
            latency_ms: None,
            errors: Vec::new(),
        };

        let endpoint = format!("{}:{}", self.host, self.port);
        let start = Instant::now();
        match tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(&endpoint)).await {
            Ok(Ok(_stream)) => {
                report.tcp_connection = true;
                report.latency_ms = Some(start.elapsed().as_secs_f64() * 1000.0);
            }
            Ok(Err(e)) => {
                report.errors.push(format!("TCP connection failed: {}", e));
            }
            Err(_) => {
                report
                    .errors
                    .push(format!("TCP connection timed out after {:?}", self.timeout));
            }
        }

        if !report.tcp_connection {
            return report;
        }

        if !self.connected() {
            if let Err(e) = self.connect().await {
                report.errors.push(e.to_string());
                return report;
            }
        }

        for unit_id in TEST_UNIT_RANGE {
            match self
                .transport
                .read_holding_registers(0, MIN_REGISTERS as u16, unit_id)
                .await
            {
                Ok(_) => {
                    report.modbus_communication = true;
                    report.sensor_detection = true;
                    break;
                }
                Err(e) => {
                    report.errors.push(format!("Unit {}: {}", unit_id, e));
                }
            }
        }

        report
    }

    /// Read `count` holding registers from one sensor unit, starting at
    /// address 0, retrying transient failures.
    ///
    /// Fails with `Validation` for unit IDs outside 1-247 and `Connection`
    /// when no session is open; `Communication` is raised only after the
    /// retry budget is exhausted and carries the last underlying cause.
    pub async fn read_registers(
        &mut self,
        unit_id: u8,
        count: u16,
    ) -> Result<Vec<u16>, DxmError> {
        if !validate_unit_id(unit_id) {
            return Err(DxmError::Validation(format!(
                "Invalid unit ID: {} (must be 1-247)",
                unit_id
            )));
        }

        if !self.connected() {
            return Err(DxmError::Connection("Not connected to DXM".to_string()));
        }

        let mut last_cause = String::new();
        for attempt in 1..=self.retry_attempts {
            debug!(
                "📊 Reading {} registers from unit {} (attempt {}/{})",
                count, unit_id, attempt, self.retry_attempts
            );

            match self.transport.read_holding_registers(0, count, unit_id).await {
                Ok(registers) => {
                    debug!("Successfully read registers: {:?}", registers);
                    return Ok(registers);
                }
                Err(e) => {
                    warn!(
                        "⚠️  Read from unit {} failed on attempt {}/{}: {}",
                        unit_id, attempt, self.retry_attempts, e
                    );
                    last_cause = e.to_string();
                }
            }

            if attempt < self.retry_attempts {
                sleep(RETRY_BACKOFF).await;
            }
        }

        let msg = format!(
            "Failed to read registers from unit {} after {} attempts: {}",
            unit_id, self.retry_attempts, last_cause
        );
        self.last_error = Some(msg.clone());
        Err(DxmError::Communication(msg))
    }

    /// Read and decode one sensor. Errors from both layers propagate
    /// unchanged.
    pub async fn read_sensor(&mut self, unit_id: u8) -> Result<SensorReading, DxmError> {
        let registers = self.read_registers(unit_id, MIN_REGISTERS as u16).await?;
        let reading = decode(unit_id, &registers)?;
        debug!("Decoded reading for unit {}: {:?}", unit_id, reading);
        Ok(reading)
    }

    /// Scan unit IDs 1..=`max_units` for responding sensors.
    ///
    /// Each probe is a minimal single-register read with no retries; an
    /// unresponsive unit is recorded as absent and never aborts the scan.
    /// Returns unit IDs in ascending scan order.
    pub async fn discover_sensors(&mut self, max_units: u8) -> Result<Vec<u8>, DxmError> {
        if !self.connected() {
            return Err(DxmError::Connection("Not connected to DXM".to_string()));
        }

        info!("🔍 Scanning for sensors (units 1-{})", max_units);
        let mut discovered = Vec::new();

        for unit_id in 1..=max_units {
            match self.transport.read_holding_registers(0, 1, unit_id).await {
                Ok(_) => {
                    info!("✅ Found sensor at unit ID {}", unit_id);
                    discovered.push(unit_id);
                }
                Err(e) => {
                    debug!("No response from unit ID {}: {}", unit_id, e);
                }
            }

            sleep(DISCOVERY_DELAY).await;
        }

        info!(
            "🔍 Discovery complete. Found {} sensors: {:?}",
            discovered.len(),
            discovered
        );
        Ok(discovered)
    }

    /// Read several sensors over the single open session, sequentially.
    /// A failed unit maps to `None`; one failure never aborts the batch.
    pub async fn read_multiple_sensors(
        &mut self,
        unit_ids: &[u8],
    ) -> HashMap<u8, Option<SensorReading>> {
        let mut readings = HashMap::new();

        for &unit_id in unit_ids {
            match self.read_sensor(unit_id).await {
                Ok(reading) => {
                    readings.insert(unit_id, Some(reading));
                }
                Err(e) => {
                    warn!("⚠️  Failed to read sensor {}: {}", unit_id, e);
                    readings.insert(unit_id, None);
                }
            }
        }

        readings
    }

    /// Start a timed polling sequence over `unit_ids`.
    ///
    /// The returned poller yields one batch per cycle, forever when
    /// `duration` is `None`, else until the elapsed time reaches it. It
    /// borrows the client exclusively; dropping it between cycles cancels
    /// polling and leaves the session usable.
    pub fn poll_sensors(
        &mut self,
        unit_ids: Vec<u8>,
        interval: Duration,
        duration: Option<Duration>,
    ) -> SensorPoller<'_> {
        info!(
            "🔄 Polling units {:?} every {:?}{}",
            unit_ids,
            interval,
            duration
                .map(|d| format!(" for {:?}", d))
                .unwrap_or_default()
        );
        SensorPoller {
            client: self,
            unit_ids,
            interval,
            started: Instant::now(),
            duration,
            next_cycle_at: None,
            cycle: 0,
        }
    }
}

/// One polling cycle's worth of readings.
#[derive(Debug)]
pub struct PollBatch {
    pub readings: HashMap<u8, Option<SensorReading>>,
    /// Cycle counter, starting at 1.
    pub cycle: u64,
    /// True when the previous cycle took longer than the interval; the next
    /// cycle then started without sleeping.
    pub lagging: bool,
}

/// Lazy, cancelable polling sequence over a borrowed client.
///
/// Pull-based: each `next_batch` call runs one cycle. Cancellation is just
/// not calling again (or racing the call against a shutdown signal with
/// `tokio::select!`); between cycles no transport state is in flight.
pub struct SensorPoller<'a> {
    client: &'a mut DxmClient,
    unit_ids: Vec<u8>,
    interval: Duration,
    started: Instant,
    duration: Option<Duration>,
    next_cycle_at: Option<Instant>,
    cycle: u64,
}

impl SensorPoller<'_> {
    /// Run the next cycle, or return `None` once the configured duration has
    /// elapsed. The first cycle always runs; the duration bound is checked
    /// between cycles, so even a zero duration yields one batch.
    pub async fn next_batch(&mut self) -> Option<PollBatch> {
        if self.cycle > 0 {
            if let Some(duration) = self.duration {
                if self.started.elapsed() >= duration {
                    info!("⏱️  Polling duration reached after {} cycles", self.cycle);
                    return None;
                }
            }
        }

        if let Some(at) = self.next_cycle_at {
            sleep_until(at).await;
        }

        let cycle_start = Instant::now();
        let readings = self.client.read_multiple_sensors(&self.unit_ids).await;
        let cycle_elapsed = cycle_start.elapsed();

        let lagging = cycle_elapsed > self.interval;
        if lagging {
            warn!(
                "⚠️  Polling cycle took {:?}, longer than interval {:?}",
                cycle_elapsed, self.interval
            );
            self.next_cycle_at = None;
        } else {
            self.next_cycle_at = Some(cycle_start + self.interval);
        }

        self.cycle += 1;
        Some(PollBatch {
            readings,
            cycle: self.cycle,
            lagging,
        })
    }
}
