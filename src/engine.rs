//! The playback engine: single owner of frames, surface and label state.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::events::{FrameEvent, FrameRequest, SequenceSettled};
use crate::labels::{
    DEFAULT_SETTLE_DELAY, LabelChange, LabelInterval, LabelScheduler, LabelState, OverlayHost,
};
use crate::placement::PlacementAnalyzer;
use crate::render::renderer::{DrawParams, Renderer};
use crate::render::surface::DisplaySurface;
use crate::store::{FrameStore, LoadState, frame_index};

/// Result of one progress tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub draw: Option<DrawParams>,
    pub label: Option<LabelChange>,
}

pub struct EngineBuilder<H> {
    frame_count: usize,
    uri_for_index: Box<dyn Fn(usize) -> String>,
    labels: Vec<LabelInterval>,
    analyzer: PlacementAnalyzer,
    viewport: (u32, u32),
    settle_delay: Duration,
    host: Option<H>,
}

impl<H: OverlayHost> EngineBuilder<H> {
    fn new(frame_count: usize) -> Self {
        Self {
            frame_count,
            uri_for_index: Box::new(|i| i.to_string()),
            labels: Vec::new(),
            analyzer: PlacementAnalyzer::default(),
            viewport: (0, 0),
            settle_delay: DEFAULT_SETTLE_DELAY,
            host: None,
        }
    }

    /// Maps a 1-based asset index to its URI.
    pub fn uri_for_index(mut self, f: impl Fn(usize) -> String + 'static) -> Self {
        self.uri_for_index = Box::new(f);
        self
    }

    pub fn labels(mut self, labels: Vec<LabelInterval>) -> Self {
        self.labels = labels;
        self
    }

    pub fn analyzer(mut self, analyzer: PlacementAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn overlay_host(mut self, host: H) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> Result<Engine<H>> {
        if self.frame_count == 0 {
            return Err(Error::InvalidConfig(
                "frame count must be greater than zero".into(),
            ));
        }
        let host = self.host.ok_or(Error::MissingOverlayHost)?;
        let store = FrameStore::new(self.frame_count, self.uri_for_index);
        let (width, height) = self.viewport;
        Ok(Engine {
            store,
            renderer: Renderer::new(width, height),
            labels: LabelScheduler::new(self.labels, self.analyzer, self.settle_delay, host),
            progress: 0.0,
        })
    }
}

/// Drives rendering and labels from progress ticks, resizes and load completions.
///
/// All mutation goes through `&mut self`, so whoever owns the engine
/// serializes ticks and completions.
pub struct Engine<H: OverlayHost> {
    store: FrameStore,
    renderer: Renderer,
    labels: LabelScheduler<H>,
    progress: f32,
}

impl<H: OverlayHost> Engine<H> {
    pub fn builder(frame_count: usize) -> EngineBuilder<H> {
        EngineBuilder::new(frame_count)
    }

    pub fn from_config(cfg: &Configuration, host: H) -> Result<Self> {
        let frames = cfg.frames.clone();
        Self::builder(cfg.frames.count)
            .uri_for_index(move |i| frames.uri_for_index(i))
            .labels(cfg.labels.clone())
            .analyzer(cfg.placement.analyzer())
            .viewport(cfg.viewport.width, cfg.viewport.height)
            .settle_delay(cfg.overlay.settle_delay)
            .overlay_host(host)
            .build()
    }

    /// Decode jobs for every frame, in sequence order.
    pub fn frame_requests(&self) -> Vec<FrameRequest> {
        self.store
            .assets()
            .iter()
            .map(|asset| FrameRequest {
                index: asset.index(),
                uri: asset.uri().to_string(),
            })
            .collect()
    }

    /// Samples `value`, draws the matching frame, then updates labels against it.
    pub fn on_progress_tick(&mut self, value: f32, now: Instant) -> TickReport {
        self.progress = value;
        let draw = self.renderer.render(value, &self.store);
        let label = frame_index(value)
            .and_then(|frame| self.labels.tick(frame, self.renderer.surface(), now));
        TickReport { draw, label }
    }

    pub fn on_resize(&mut self, width: u32, height: u32) -> Option<DrawParams> {
        debug!(width, height, "surface resized");
        self.renderer.resize(width, height, &self.store)
    }

    /// Applies one load completion. Returns the settlement exactly once.
    pub fn on_frame_event(&mut self, event: FrameEvent) -> Option<SequenceSettled> {
        let completion = match event {
            FrameEvent::Loaded { index, image } => {
                debug!(index, width = image.width(), height = image.height(), "frame loaded");
                self.store.mark_loaded(index, image)
            }
            FrameEvent::Failed { index, uri, reason } => {
                let completion = self.store.mark_failed(index);
                if completion.is_some_and(|c| c.first_failure) {
                    error!(index, %uri, %reason, "error loading frame");
                } else {
                    debug!(index, %uri, %reason, "frame failed to load");
                }
                completion
            }
        };
        let Some(completion) = completion else {
            warn!("ignoring completion for an unknown or already settled frame");
            return None;
        };

        if completion.state == LoadState::Loaded {
            let needed = frame_index(self.progress).map(|f| f + 1);
            if needed == Some(completion.index) || completion.index == 1 {
                self.renderer.render(self.progress, &self.store);
            }
        }

        if !completion.settled {
            return None;
        }
        let settled = SequenceSettled {
            loaded: self.store.loaded_count(),
            failed: self.store.failed_count(),
        };
        if settled.failed == 0 {
            info!(frames = settled.loaded, "all frames loaded");
        } else {
            warn!(
                loaded = settled.loaded,
                failed = settled.failed,
                "frames loaded with errors"
            );
        }
        Some(settled)
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn surface(&self) -> &DisplaySurface {
        self.renderer.surface()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn last_draw(&self) -> Option<DrawParams> {
        self.renderer.last_draw()
    }

    pub fn label_state(&self) -> &LabelState {
        self.labels.state()
    }

    pub fn mounted_labels(&self) -> usize {
        self.labels.mounted()
    }

    pub fn host(&self) -> &H {
        self.labels.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.labels.host_mut()
    }
}
