//! Native messaging bridge. The extension forwards tab and window events to this process over
//! stdin, each message being a 4 byte little-endian length followed by a json payload.

use std::io::ErrorKind;

use anyhow::{bail, Result};
use serde::Deserialize;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{mirror::BrowserMirror, BrowserEvent, TabId, WindowId};

/// Browsers refuse to send native messages larger than 1MB.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// State of one tab as reported in a [NativeMessage::Snapshot].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub tab_id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NativeMessage {
    /// Sent once when the extension connects, describing the tabs that are already open.
    #[serde(rename_all = "camelCase")]
    Snapshot {
        focused_window_id: WindowId,
        #[serde(default)]
        tabs: Vec<TabSnapshot>,
    },
    #[serde(rename_all = "camelCase")]
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TabUpdated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        url: Option<String>,
        active: bool,
    },
    #[serde(rename_all = "camelCase")]
    TabRemoved { tab_id: TabId },
    #[serde(rename_all = "camelCase")]
    WindowFocusChanged { window_id: WindowId },
}

impl NativeMessage {
    /// Converts the message into an event for the tracker. Messages that only keep the mirror
    /// up to date produce nothing.
    pub fn into_event(self) -> Option<BrowserEvent> {
        match self {
            NativeMessage::Snapshot {
                focused_window_id, ..
            } => Some(BrowserEvent::WindowFocusChanged(focused_window_id.into())),
            NativeMessage::TabActivated { tab_id, .. } => Some(BrowserEvent::TabActivated { tab_id }),
            NativeMessage::TabUpdated {
                tab_id,
                url,
                active,
                ..
            } => Some(BrowserEvent::TabUpdated {
                tab_id,
                url,
                active,
            }),
            NativeMessage::TabRemoved { .. } => None,
            NativeMessage::WindowFocusChanged { window_id } => {
                Some(BrowserEvent::WindowFocusChanged(window_id.into()))
            }
        }
    }
}

/// Reads a single frame. Returns [None] when the stream ends cleanly between frames, which is how
/// the browser signals that the extension disconnected.
pub async fn read_frame(reader: &mut (impl AsyncRead + Unpin)) -> Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_MESSAGE_SIZE {
        bail!("Message too large: {len} bytes (max: {MAX_MESSAGE_SIZE} bytes)");
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(Some(buffer))
}

/// Reads messages coming from the browser, keeps [BrowserMirror] in sync and forwards events to
/// the tracker.
pub struct NativeHostModule<R> {
    reader: R,
    mirror: BrowserMirror,
    next: mpsc::Sender<BrowserEvent>,
    shutdown: CancellationToken,
}

impl<R: AsyncRead + Unpin> NativeHostModule<R> {
    pub fn new(
        reader: R,
        mirror: BrowserMirror,
        next: mpsc::Sender<BrowserEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reader,
            mirror,
            next,
            shutdown,
        }
    }

    async fn handle_frame(&mut self, frame: &[u8]) -> Result<()> {
        let message = match serde_json::from_slice::<NativeMessage>(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "Skipping undecodable message {}: {e}",
                    String::from_utf8_lossy(frame)
                );
                return Ok(());
            }
        };
        debug!("Received message {:?}", message);

        self.mirror.apply(&message)?;
        if let Some(event) = message.into_event() {
            self.next
                .send(event)
                .await
                .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        }
        Ok(())
    }

    /// Executes the reading loop. Whatever way the loop ends, the shutdown token gets cancelled
    /// since the daemon has nothing to track without the browser.
    pub async fn run(mut self) -> Result<()> {
        let result = self.run_inner().await;
        self.shutdown.cancel();
        result
    }

    async fn run_inner(&mut self) -> Result<()> {
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                frame = read_frame(&mut self.reader) => frame?,
            };

            match frame {
                Some(frame) => self.handle_frame(&frame).await?,
                None => {
                    info!("Browser closed the connection");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn encode_frame(payload: &str) -> Vec<u8> {
    let mut frame = (payload.len() as u32).to_le_bytes().to_vec();
    frame.extend_from_slice(payload.as_bytes());
    frame
}
