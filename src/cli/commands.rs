use clap::ArgMatches;
use log::info;
use std::time::Duration;

use crate::config::Config;
use crate::modbus::DxmClient;
use crate::output::formatter_for;
use crate::sensor::decoder::{decode_single_register, register_info, validate};
use crate::services::MonitorService;
use crate::utils::error::DxmError;

/// Dispatch the matched subcommand. Returns true when one was handled.
pub async fn handle_subcommands(
    matches: &ArgMatches,
    config: &Config,
) -> Result<bool, Box<dyn std::error::Error>> {
    if let Some(_matches) = matches.subcommand_matches("test") {
        info!("🔍 Executing connection test...");
        run_test(config).await?;
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("discover") {
        info!("🔍 Executing sensor discovery...");
        let max_units = match matches.get_one::<String>("max-units") {
            Some(raw) => raw
                .parse::<u8>()
                .map_err(|_| DxmError::Config(format!("Invalid max units: {}", raw)))?,
            None => config.max_scan_units,
        };
        run_discover(config, max_units).await?;
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("read") {
        info!("📊 Executing sensor read...");
        let unit_ids = parse_unit_list(matches.get_one::<String>("units"))?;
        run_read(config, unit_ids).await?;
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("monitor") {
        info!("🔄 Executing monitor...");
        let unit_ids = parse_unit_list(matches.get_one::<String>("units"))?;
        let duration = match matches.get_one::<String>("duration") {
            Some(raw) => {
                let secs: f64 = raw
                    .parse()
                    .map_err(|_| DxmError::Config(format!("Invalid duration: {}", raw)))?;
                Some(Duration::from_secs_f64(secs))
            }
            None => None,
        };
        let mut service = MonitorService::new(config.clone());
        service.run(unit_ids, duration).await?;
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("registers") {
        match matches.get_one::<String>("unit") {
            Some(raw) => {
                let unit_id: u8 = raw
                    .parse()
                    .map_err(|_| DxmError::Config(format!("Invalid unit ID: {}", raw)))?;
                run_register_dump(config, unit_id).await?;
            }
            None => print_register_map(),
        }
        return Ok(true);
    }

    Ok(false)
}

fn parse_unit_list(raw: Option<&String>) -> Result<Vec<u8>, DxmError> {
    match raw {
        Some(list) => list
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<u8>()
                    .map_err(|_| DxmError::Config(format!("Invalid unit ID: {}", s.trim())))
            })
            .collect(),
        None => Ok(Vec::new()),
    }
}

async fn run_test(config: &Config) -> Result<(), DxmError> {
    let mut client = DxmClient::new(
        &config.host,
        config.port,
        config.timeout(),
        config.retry_attempts,
    );

    let report = client.test_connection().await;
    let info = client.connection_info();
    client.disconnect().await;

    println!("🔍 Connection Test: {}:{}", info.host, info.port);
    println!("{}", "═".repeat(50));
    println!(
        "  Settings: timeout {}s, {} retries",
        info.timeout_secs, info.retry_attempts
    );
    println!(
        "  TCP connection:        {}",
        if report.tcp_connection { "✅ OK" } else { "❌ FAILED" }
    );
    if let Some(latency) = report.latency_ms {
        println!("  Latency:               {:.1} ms", latency);
    }
    println!(
        "  Modbus communication:  {}",
        if report.modbus_communication { "✅ OK" } else { "❌ FAILED" }
    );
    println!(
        "  Sensor detection:      {}",
        if report.sensor_detection { "✅ OK" } else { "❌ NONE FOUND" }
    );
    for error in &report.errors {
        println!("  ⚠️  {}", error);
    }
    Ok(())
}

async fn run_discover(config: &Config, max_units: u8) -> Result<(), DxmError> {
    let mut client = DxmClient::new(
        &config.host,
        config.port,
        config.timeout(),
        config.retry_attempts,
    );
    client.connect().await?;

    let discovered = client.discover_sensors(max_units).await?;
    client.disconnect().await;

    if discovered.is_empty() {
        println!("❌ No sensors found in units 1-{}", max_units);
    } else {
        println!("✅ Found {} sensor(s): {:?}", discovered.len(), discovered);
    }
    Ok(())
}

async fn run_read(config: &Config, unit_ids: Vec<u8>) -> Result<(), DxmError> {
    let mut client = DxmClient::new(
        &config.host,
        config.port,
        config.timeout(),
        config.retry_attempts,
    );
    client.connect().await?;

    let unit_ids = if unit_ids.is_empty() {
        let discovered = client.discover_sensors(config.max_scan_units).await?;
        if discovered.is_empty() {
            client.disconnect().await;
            return Err(DxmError::Communication("No sensors found to read".to_string()));
        }
        discovered
    } else {
        unit_ids
    };

    let readings = client.read_multiple_sensors(&unit_ids).await;
    client.disconnect().await;

    let formatter = formatter_for(&config.output_format);
    if config.show_timestamps {
        let header = formatter.format_header();
        if !header.is_empty() {
            print!("{}", header);
        }
    }
    print!(
        "{}",
        formatter.format_multiple_readings(&readings, &config.distance_unit)
    );

    for reading in readings.values().flatten() {
        for problem in validate(reading) {
            println!("⚠️  Sensor {}: {}", reading.unit_id, problem);
        }
    }
    Ok(())
}

async fn run_register_dump(config: &Config, unit_id: u8) -> Result<(), DxmError> {
    let mut client = DxmClient::new(
        &config.host,
        config.port,
        config.timeout(),
        config.retry_attempts,
    );
    client.connect().await?;

    let result = client.read_registers(unit_id, 4).await;
    client.disconnect().await;
    let registers = result?;

    println!("🔍 Raw registers for sensor {}:", unit_id);
    println!("{}", "═".repeat(70));
    for (address, value) in registers.iter().enumerate() {
        let info = decode_single_register(address as u16, *value);
        println!(
            "  [{}] {:5} ({}) {:20} {}",
            info.address,
            info.raw_value,
            info.hex_value,
            info.register_name.unwrap_or("Unknown"),
            info.interpretation
        );
    }
    Ok(())
}

fn print_register_map() {
    println!("📋 DXM Radar Sensor Register Map:");
    println!("{}", "═".repeat(70));
    for (address, name, description, values) in register_info() {
        println!("  Register {}: {}", address, name);
        println!("    Values:      {}", values);
        println!("    Description: {}", description);
    }
}
