//! Argument surfaces shared by the daemon and the operator tool.

use std::path::PathBuf;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};

pub const DEFAULT_CONFIG_DIR: &str = "/etc/smartcron/jobs";
pub const DEFAULT_DB_PATH: &str = "/var/lib/smartcron/logs.db";
pub const DEFAULT_LOG_DIR: &str = "/var/log/smartcron";

#[derive(Debug, Parser)]
#[clap(name = "smartcrond", version, about = "Resource-aware job scheduler daemon")]
pub struct DaemonArgs {
    /// Job configuration directory
    #[clap(long, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Success-prediction model path
    #[clap(long, default_value = "models/model.bin")]
    pub model: PathBuf,

    /// Execution database path
    #[clap(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Per-job log directory
    #[clap(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Seconds between scheduler ticks
    #[clap(long, default_value_t = 60)]
    pub interval: u64,
}

impl DaemonArgs {
    /// System paths are not writable without root; untouched defaults
    /// relocate to the working directory.
    pub fn relocate_for_unprivileged(&mut self) {
        self.relocate(is_root());
    }

    fn relocate(&mut self, is_root: bool) {
        if is_root {
            return;
        }
        if self.config_dir == PathBuf::from(DEFAULT_CONFIG_DIR) {
            self.config_dir = "./jobs".into();
        }
        if self.db == PathBuf::from(DEFAULT_DB_PATH) {
            self.db = "./smartcron_logs.db".into();
        }
        if self.log_dir == PathBuf::from(DEFAULT_LOG_DIR) {
            self.log_dir = "./logs".into();
        }
    }
}

#[derive(Debug, Parser)]
#[clap(name = "smartcronctl", version, about = "SmartCron control CLI")]
pub struct CtlArgs {
    /// Job configuration directory
    #[clap(long, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Execution database path
    #[clap(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    #[clap(subcommand)]
    pub command: CtlCommand,
}

impl CtlArgs {
    pub fn relocate_for_unprivileged(&mut self) {
        self.relocate(is_root());
    }

    fn relocate(&mut self, is_root: bool) {
        if is_root {
            return;
        }
        if self.config_dir == PathBuf::from(DEFAULT_CONFIG_DIR) {
            self.config_dir = "./jobs".into();
        }
        if self.db == PathBuf::from(DEFAULT_DB_PATH) {
            self.db = "./smartcron_logs.db".into();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CtlCommand {
    /// List all configured jobs
    List,

    /// Show details of a specific job
    Show { job_name: String },

    /// Show system status
    Status,

    /// Show job execution history
    History {
        job_name: String,

        /// Number of records to show
        #[clap(long, default_value_t = 10)]
        limit: u32,

        /// Include captured output
        #[clap(long, short)]
        verbose: bool,
    },

    /// Enable a job
    Enable { job_name: String },

    /// Disable a job
    Disable { job_name: String },
}

pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

pub fn format_epoch(epoch: f64) -> String {
    Local
        .timestamp_opt(epoch as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daemon_args(argv: &[&str]) -> DaemonArgs {
        DaemonArgs::parse_from(argv)
    }

    #[test]
    fn unprivileged_defaults_relocate() {
        let mut args = daemon_args(&["smartcrond"]);
        args.relocate(false);

        assert_eq!(args.config_dir, PathBuf::from("./jobs"));
        assert_eq!(args.db, PathBuf::from("./smartcron_logs.db"));
        assert_eq!(args.log_dir, PathBuf::from("./logs"));
    }

    #[test]
    fn explicit_paths_survive_relocation() {
        let mut args = daemon_args(&["smartcrond", "--db", "/tmp/my.db"]);
        args.relocate(false);

        assert_eq!(args.db, PathBuf::from("/tmp/my.db"));
        assert_eq!(args.config_dir, PathBuf::from("./jobs"));
    }

    #[test]
    fn root_keeps_system_paths() {
        let mut args = daemon_args(&["smartcrond"]);
        args.relocate(true);

        assert_eq!(args.config_dir, PathBuf::from(DEFAULT_CONFIG_DIR));
        assert_eq!(args.db, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn ctl_subcommands_parse() {
        let args = CtlArgs::parse_from(["smartcronctl", "history", "backup", "--limit", "5", "-v"]);
        match args.command {
            CtlCommand::History {
                job_name,
                limit,
                verbose,
            } => {
                assert_eq!(job_name, "backup");
                assert_eq!(limit, 5);
                assert!(verbose);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
