//! Spring network converter entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use spring_network_editor::{cli, load_config, Args};

fn main() {
    let args = Args::parse();

    // The config supplies the log level unless --log-level is given
    let config = load_config(args.config.as_ref()).unwrap_or_else(|err| {
        eprintln!("{err}");
        process::exit(1);
    });

    let level_name = args.log_level(&config);
    let log_level = LevelFilter::from_str(level_name).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {level_name}. Using 'warn' instead.");
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting spring network converter");
    debug!(args:?, config:?; "Parsed arguments");

    if let Err(err) = cli::run(&args) {
        error!("{err:#}");
        process::exit(1);
    }

    info!("Completed successfully");
}
