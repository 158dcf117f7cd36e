use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::events::{FrameEvent, FrameRequest};

const FILE_SCHEME: &str = "file://";

fn path_for_uri(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri))
}

// Decodes a frame to RGBA8; the format is sniffed from content, not the extension.
fn decode_rgba8(path: &Path) -> Result<image::RgbaImage> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(img.to_rgba8())
}

async fn load_frame(request: FrameRequest, timeout: Option<Duration>) -> FrameEvent {
    let FrameRequest { index, uri } = request;
    let path = path_for_uri(&uri);
    let decode = tokio::task::spawn_blocking(move || decode_rgba8(&path));
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, decode).await {
            Ok(joined) => joined.map_err(anyhow::Error::from).and_then(|res| res),
            Err(_) => Err(anyhow!(
                "decode timed out after {}",
                humantime::format_duration(limit)
            )),
        },
        None => decode.await.map_err(anyhow::Error::from).and_then(|res| res),
    };
    match outcome {
        Ok(image) => FrameEvent::Loaded { index, image },
        Err(err) => FrameEvent::Failed {
            index,
            uri,
            reason: format!("{err:#}"),
        },
    }
}

/// Decodes every requested frame, at most `max_in_flight` at a time, and
/// forwards each terminal outcome to the engine in completion order.
#[instrument(skip_all, fields(frames = requests.len(), max_in_flight))]
pub async fn run(
    requests: Vec<FrameRequest>,
    to_engine: Sender<FrameEvent>,
    cancel: CancellationToken,
    max_in_flight: usize,
    timeout: Option<Duration>,
) -> Result<()> {
    let max_in_flight = max_in_flight.max(1);
    let mut queue = requests.into_iter();
    let mut tasks: JoinSet<FrameEvent> = JoinSet::new();

    loop {
        while tasks.len() < max_in_flight {
            let Some(request) = queue.next() else { break };
            tasks.spawn(load_frame(request, timeout));
        }

        select! {
            _ = cancel.cancelled() => {
                debug!(in_flight = tasks.len(), "loader cancelled");
                tasks.abort_all();
                break;
            },

            joined = tasks.join_next() => {
                match joined {
                    Some(Ok(event)) => {
                        if to_engine.send(event).await.is_err() {
                            debug!("engine channel closed; stopping loader");
                            break;
                        }
                    }
                    Some(Err(err)) => warn!(error = %err, "frame load task failed to join"),
                    None => break,
                }
            }
        }
    }
    Ok(())
}
