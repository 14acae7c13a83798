pub mod client;
pub mod transport;

pub use client::{ConnectionInfo, ConnectionReport, DxmClient, PollBatch, SensorPoller};
pub use transport::{ModbusTransport, TcpTransport};
