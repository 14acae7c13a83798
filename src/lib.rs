//! DXM Radar Sensor Toolkit
//!
//! Library for acquiring telemetry from Banner IO-Link radar sensors bridged
//! through a DXM controller over Modbus TCP. Provides a connection-managed
//! acquisition client with retries, discovery and polling, plus a stateless
//! decoder that turns raw holding registers into typed sensor readings.

pub mod cli;
pub mod config;
pub mod modbus;
pub mod output;
pub mod sensor;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use modbus::{ConnectionInfo, ConnectionReport, DxmClient, ModbusTransport, PollBatch, SensorPoller, TcpTransport};
pub use output::{ConsoleFormatter, CsvFormatter, JsonFormatter, ReadingFormatter};
pub use sensor::{analyze_pattern, decode, PatternAnalysis, SensorReading, SensorStatus};
pub use services::MonitorService;
pub use utils::error::DxmError;

pub const VERSION: &str = "0.1.0";
