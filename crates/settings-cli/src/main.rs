//! Settings sync CLI.

use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use settings_cli::commands::{
    DemoOptions, default_store_path, load_config, run_demo, run_get, run_list, run_set,
};
use settings_cli::logging::{LogConfig, LogFormat, init_logging};
use settings_cli::summary::{
    entries_json, error_report, print_demo, print_entries, set_message,
};
use settings_store::FileStore;
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error_report(&error));
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    let store_path = cli.store.clone().unwrap_or_else(default_store_path);

    match cli.command {
        Command::Get { key } => {
            let store = FileStore::new(store_path);
            match run_get(&store, &key).await? {
                Some(value) => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                    Ok(0)
                }
                None => {
                    eprintln!("{key} is not set");
                    Ok(2)
                }
            }
        }
        Command::Set { key, value } => {
            let store = Arc::new(FileStore::new(store_path));
            let outcome = run_set(&store, &key, &value, config).await?;
            println!("{}", set_message(&outcome));
            Ok(0)
        }
        Command::List { json } => {
            let store = FileStore::new(store_path);
            let entries = run_list(&store).await?;
            if json {
                println!("{}", entries_json(&entries));
            } else {
                print_entries(&entries);
            }
            Ok(0)
        }
        Command::Demo(args) => {
            let report = run_demo(&DemoOptions {
                windows: args.windows,
                writes: args.writes,
                interval: Duration::from_millis(args.interval_ms),
                config,
            })
            .await?;
            print_demo(&report);
            Ok(if report.converged() { 0 } else { 1 })
        }
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
