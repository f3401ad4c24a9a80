use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tabtally::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::{run_to_completion, single_thread_runtime},
    },
};
use tracing::error;

fn main() -> Result<()> {
    let args = DaemonArgs::parse();
    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    enable_logging(DAEMON_PREFIX, &app_dir, args.log, args.log_console)?;

    let period = Duration::from_secs(args.interval);
    let runtime = single_thread_runtime()?;
    run_to_completion(runtime, start_daemon(app_dir, period))
        .inspect_err(|e| error!("Error running daemon {e:?}"))?;
    Ok(())
}
