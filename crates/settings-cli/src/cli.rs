//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "settings-sync",
    version,
    about = "Inspect and edit synchronized application settings",
    long_about = "Inspect and edit the settings file shared by every window of an application.\n\n\
                  Writes go through the same persist-and-announce protocol the windows use,\n\
                  and `demo` runs several in-process windows to show them converge."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: <config dir>/.settings.dat).
    #[arg(long = "store", value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,

    /// Sync configuration file (TOML).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the stored value of one key as JSON.
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Store a JSON value under a key.
    Set {
        #[arg(value_name = "KEY")]
        key: String,

        /// Value as a JSON document, e.g. '"dark"', '14' or '["calc"]'.
        #[arg(value_name = "JSON")]
        value: String,
    },

    /// List every stored setting.
    List {
        /// Print JSON instead of a table.
        #[arg(long = "json")]
        json: bool,
    },

    /// Run several in-process windows against one store and show them converge.
    Demo(DemoArgs),
}

#[derive(Parser)]
pub struct DemoArgs {
    /// Number of windows.
    #[arg(long = "windows", default_value_t = 3)]
    pub windows: usize,

    /// Number of writes, spread round-robin over the windows.
    #[arg(long = "writes", default_value_t = 10)]
    pub writes: usize,

    /// Milliseconds between writes.
    #[arg(long = "interval-ms", default_value_t = 10)]
    pub interval_ms: u64,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
