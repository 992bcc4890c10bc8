//! Command-line argument parsing for double-check.
//!
//! Uses clap; DSN flags fall back to the `DATABEND_DSN_V1`/`DATABEND_DSN_V2`
//! environment variables.

use crate::config::{Config, Side};
use crate::script::DEFAULT_DELIMITER;
use crate::session::SessionSettings;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Run the same SQL against two database versions and compare the results.
#[derive(Parser, Debug)]
#[command(name = "double-check")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Recreate the database on V1 and run the setup script instead of comparing
    #[arg(long)]
    pub setup: bool,

    /// Database name (default: double_check_<YYYYMMDD>)
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// DSN of the baseline side
    #[arg(long, value_name = "DSN", env = "DATABEND_DSN_V1", hide_env_values = true)]
    pub dsn_v1: Option<String>,

    /// DSN of the candidate side
    #[arg(long, value_name = "DSN", env = "DATABEND_DSN_V2", hide_env_values = true)]
    pub dsn_v2: Option<String>,

    /// Setup script path (default: sql/setup.sql)
    #[arg(long, value_name = "PATH")]
    pub setup_file: Option<PathBuf>,

    /// Check script path (default: sql/check.sql)
    #[arg(long, value_name = "PATH")]
    pub check_file: Option<PathBuf>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Default log level for the given verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// DSN for a side: flag or environment, then config file, then placeholder.
    pub fn dsn(&self, side: Side, config: &Config) -> String {
        let flag = match side {
            Side::V1 => self.dsn_v1.as_deref(),
            Side::V2 => self.dsn_v2.as_deref(),
        };
        flag.or_else(|| config.dsn(side))
            .unwrap_or_else(|| side.placeholder_dsn())
            .to_string()
    }

    /// Builds session settings, with CLI values taking precedence over the config file.
    pub fn session_settings(&self, config: &Config) -> SessionSettings {
        SessionSettings {
            database: self.database.clone().or_else(|| config.database.clone()),
            setup: self.setup,
            setup_script: self
                .setup_file
                .clone()
                .unwrap_or_else(|| config.scripts.setup.clone()),
            check_script: self
                .check_file
                .clone()
                .unwrap_or_else(|| config.scripts.check.clone()),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}
