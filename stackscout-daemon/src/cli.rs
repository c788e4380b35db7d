//! CLI argument definitions for stackscout-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use stackscout_core::config::StackscoutConfig;

/// StackScout package metadata collection daemon.
///
/// Runs the collector worker pool and per-source refresh schedule,
/// seeds the catalog from configuration and persists it across restarts.
#[derive(Parser, Debug)]
#[command(name = "stackscout-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to stackscout.toml configuration file.
    #[arg(short, long, default_value = "/etc/stackscout/stackscout.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut StackscoutConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file.clone_from(pid_file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_system_config() {
        let cli = DaemonCli::parse_from(["stackscout-daemon"]);
        assert_eq!(cli.config, PathBuf::from("/etc/stackscout/stackscout.toml"));
        assert!(!cli.validate);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn overrides_take_precedence() {
        let cli = DaemonCli::parse_from([
            "stackscout-daemon",
            "--config",
            "/tmp/s.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--pid-file",
            "",
        ]);
        let mut config = StackscoutConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.general.pid_file, "");
    }

    #[test]
    fn missing_overrides_keep_config_values() {
        let cli = DaemonCli::parse_from(["stackscout-daemon", "--validate"]);
        let mut config = StackscoutConfig::default();
        cli.apply_overrides(&mut config);
        assert!(cli.validate);
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.pid_file, "/var/run/stackscout.pid");
    }
}
