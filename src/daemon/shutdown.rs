use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels the token on Ctrl-C. Returns early if something else cancels it first, for example
/// the browser closing the connection.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
