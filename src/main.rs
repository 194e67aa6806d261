use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::process;

use atermscan::{
    config::ScanConfig,
    output::{DeviceWriter, OutputConfig, OutputFormat},
    scanner::ScanEngine,
};
use tokio_util::sync::CancellationToken;

fn build_cli() -> Command {
    Command::new("atermscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find NEC Aterm routers and access points on the local network")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Address or CIDR range to scan. A bare IPv4 address scans its classful network")
                .index(1),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .help("Timeout for each address in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_name("N")
                .help("Maximum number of addresses probed at once")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("HTTP port of the device query endpoint")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("deadline")
                .short('d')
                .long("deadline")
                .value_name("MS")
                .help("Stop the whole scan after this many milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .help("Output format")
                .value_parser(["text", "json", "csv"])
                .default_value("text"),
        )
        .arg(
            Arg::new("output-file")
                .long("output-file")
                .value_name("FILE")
                .help("Write results to FILE instead of stdout"),
        )
        .arg(
            Arg::new("japanese")
                .long("ja")
                .help("Show mode names in Japanese")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Do not warn about addresses that answered but are not Aterm devices")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML config file (default: ~/.atermscan.toml)"),
        )
}

/// Command-line flags override the config file
fn load_config(matches: &ArgMatches) -> atermscan::Result<ScanConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ScanConfig::from_toml_file(path)?,
        None => ScanConfig::load_default_config(),
    };

    if let Some(target) = matches.get_one::<String>("target") {
        config.target = target.clone();
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config.timeout = timeout;
    }
    if let Some(&concurrency) = matches.get_one::<usize>("concurrency") {
        config.concurrency = concurrency;
    }
    if let Some(&port) = matches.get_one::<u16>("port") {
        config.port = port;
    }
    if let Some(&deadline) = matches.get_one::<u64>("deadline") {
        config.deadline = Some(deadline);
    }
    if matches.get_flag("quiet") {
        config.verbose = false;
    }

    config.validate()?;
    Ok(config)
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config = load_config(&matches)?;

    let format = match matches.get_one::<String>("output") {
        Some(s) => s.parse::<OutputFormat>().map_err(anyhow::Error::msg)?,
        None => OutputFormat::default(),
    };

    let (out, to_terminal): (Box<dyn Write>, bool) = match matches.get_one::<String>("output-file") {
        Some(path) => (Box::new(File::create(path)?), false),
        None => (Box::new(io::stdout()), io::stdout().is_terminal()),
    };
    let mut writer = DeviceWriter::new(
        out,
        OutputConfig {
            format,
            colored: to_terminal && !matches.get_flag("no-color"),
            japanese: matches.get_flag("japanese"),
        },
    );

    let engine = ScanEngine::new(config)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, stopping the scan");
                cancel.cancel();
            }
        });
    }

    let mut devices = engine.scan(cancel).await?;

    writer.write_header()?;
    while let Some(device) = devices.next().await {
        writer.write_device(&device)?;
    }
    writer.into_inner()?;

    let summary = devices.wait().await?;
    if format == OutputFormat::Text {
        eprintln!(
            "{} {} device(s) found, {} of {} addresses probed in {:.2}s",
            "[~]".bright_blue(),
            summary.found,
            summary.scheduled,
            summary.total_addresses,
            summary.duration.as_secs_f64()
        );
    }
    if summary.cancelled {
        eprintln!(
            "{} scan stopped early, results may be incomplete",
            "[!]".bright_yellow()
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = build_cli().get_matches();
    if let Err(e) = run(matches).await {
        eprintln!("{} {:#}", "[!]".bright_red(), e);
        process::exit(1);
    }
}
