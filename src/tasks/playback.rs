use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::engine::Engine;
use crate::events::{FrameEvent, PlaybackEvent};
use crate::labels::OverlayHost;

/// Owns the engine and feeds it progress ticks, load completions and resizes,
/// one at a time. Returns the engine once `cancel` fires.
#[instrument(skip_all, fields(tick_ms = tick_interval.as_millis() as u64))]
pub async fn run<H: OverlayHost>(
    mut engine: Engine<H>,
    progress_rx: watch::Receiver<f32>,
    mut frames_rx: Receiver<FrameEvent>,
    mut resize_rx: Receiver<(u32, u32)>,
    events_tx: Sender<PlaybackEvent>,
    tick_interval: Duration,
    cancel: CancellationToken,
) -> Result<Engine<H>> {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames_open = true;
    let mut resize_open = true;

    loop {
        select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("playback cancelled");
                break;
            },

            maybe = frames_rx.recv(), if frames_open => match maybe {
                Some(event) => {
                    if let Some(settled) = engine.on_frame_event(event) {
                        // Redraw at the current viewport now that every frame is available.
                        let (width, height) = engine.surface().dimensions();
                        engine.on_resize(width, height);
                        let _ = events_tx.send(PlaybackEvent::Settled(settled)).await;
                    }
                }
                None => {
                    debug!("loader channel closed");
                    frames_open = false;
                }
            },

            maybe = resize_rx.recv(), if resize_open => match maybe {
                Some((width, height)) => {
                    engine.on_resize(width, height);
                }
                None => resize_open = false,
            },

            _ = ticker.tick() => {
                let progress = *progress_rx.borrow();
                let report = engine.on_progress_tick(progress, Instant::now().into_std());
                if let Some(change) = report.label {
                    info!(from = ?change.from, to = ?change.to, progress, "label changed");
                    let _ = events_tx.send(PlaybackEvent::Label(change)).await;
                }
            }
        }
    }
    Ok(engine)
}
