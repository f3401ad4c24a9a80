use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "tabtally", version, long_about = None)]
#[command(about = "Native messaging host that tallies time spent per website domain")]
pub struct DaemonArgs {
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds between two time-accounting ticks"
    )]
    pub interval: u64,
    /// Mirrors logs to stderr. This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    /// Browsers launch native hosts with the caller's origin and, on Windows, the parent window
    /// handle. None of it is needed.
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub host_args: Vec<String>,
}
