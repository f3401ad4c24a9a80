use std::future::Future;

use anyhow::Result;
use tokio::runtime::Runtime;

/// The daemon never needs more than one thread: every module is a future joined on the same
/// task, which keeps the tracker state single-owner.
pub fn single_thread_runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Drives `future` to completion, then shuts the runtime down without joining blocking threads.
/// A read from stdin sits on such a thread until the browser writes again, so joining it would
/// keep the process alive after the daemon finished.
pub fn run_to_completion<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}
