use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use log::error;

use dxm_radar::cli::handle_subcommands;
use dxm_radar::config::Config;

fn build_cli() -> Command {
    Command::new("dxm_radar")
        .version(dxm_radar::VERSION)
        .about("Acquire telemetry from DXM-bridged radar sensors over Modbus TCP")
        .arg(
            Arg::new("host")
                .long("host")
                .short('H')
                .value_name("HOST")
                .help("DXM controller hostname or IP address"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .help("Modbus TCP port (default 502)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .short('t')
                .value_name("SECONDS")
                .help("Connection and read timeout in seconds"),
        )
        .arg(
            Arg::new("retries")
                .long("retries")
                .short('r')
                .value_name("COUNT")
                .help("Register read retry attempts"),
        )
        .arg(
            Arg::new("unit")
                .long("unit")
                .short('u')
                .value_name("UNIT")
                .help("Distance display unit: mm, cm, m, in, ft"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .value_name("FORMAT")
                .help("Output format: console, json, csv"),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .short('i')
                .value_name("SECONDS")
                .help("Polling interval in seconds"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Path to TOML configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(clap::ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(Command::new("test").about("Run layered connectivity diagnostics"))
        .subcommand(
            Command::new("discover")
                .about("Scan unit IDs for responding sensors")
                .arg(
                    Arg::new("max-units")
                        .long("max-units")
                        .value_name("N")
                        .help("Highest unit ID to probe"),
                ),
        )
        .subcommand(
            Command::new("read")
                .about("Read sensors once and print their readings")
                .arg(
                    Arg::new("units")
                        .long("units")
                        .value_name("LIST")
                        .help("Comma-separated unit IDs (discovered when omitted)"),
                ),
        )
        .subcommand(
            Command::new("monitor")
                .about("Poll sensors continuously until stopped")
                .arg(
                    Arg::new("units")
                        .long("units")
                        .value_name("LIST")
                        .help("Comma-separated unit IDs (discovered when omitted)"),
                )
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .short('d')
                        .value_name("SECONDS")
                        .help("Stop after this many seconds (runs until Ctrl-C when omitted)"),
                ),
        )
        .subcommand(
            Command::new("registers")
                .about("Show the register map, or dump one sensor's raw registers")
                .arg(
                    Arg::new("unit")
                        .long("unit")
                        .short('u')
                        .value_name("UNIT")
                        .help("Read and decode raw registers from this unit"),
                ),
        )
}

async fn run(matches: ArgMatches) -> Result<()> {
    let config = Config::from_matches(&matches)?;

    let handled = handle_subcommands(&matches, &config)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if !handled {
        // No subcommand given; default to a one-shot read
        let read_matches = build_cli().get_matches_from(vec!["dxm_radar", "read"]);
        handle_subcommands(&read_matches, &config)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(matches).await {
        error!("❌ {}", e);
        std::process::exit(1);
    }
}
