pub mod analysis;
pub mod decoder;
pub mod reading;

pub use analysis::{analyze_pattern, PatternAnalysis, ValueStats};
pub use decoder::{decode, decode_single_register, validate, RegisterInfo, MIN_REGISTERS};
pub use reading::{SensorReading, SensorStatus};
