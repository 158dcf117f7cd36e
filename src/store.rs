//! Ordered frame assets and their load status.

use std::sync::Arc;

use image::RgbaImage;

/// Load status of a single frame asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    Failed,
}

/// One still image in the sequence.
#[derive(Debug, Clone)]
pub struct FrameAsset {
    index: usize,
    uri: String,
    state: LoadState,
    image: Option<Arc<RgbaImage>>,
}

impl FrameAsset {
    /// 1-based asset index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Pixel dimensions, present only once the asset is loaded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| img.dimensions())
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_deref()
    }
}

/// What a terminal completion did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// 1-based asset index that completed.
    pub index: usize,
    pub state: LoadState,
    /// True only for the first failure seen by this store.
    pub first_failure: bool,
    /// True only for the completion that brought every asset to a terminal state.
    pub settled: bool,
}

/// Fixed-length, index-addressable sequence of frame assets.
#[derive(Debug, Clone)]
pub struct FrameStore {
    assets: Vec<FrameAsset>,
    terminal: usize,
    failed: usize,
}

impl FrameStore {
    /// Creates `frame_count` pending assets; `uri_for_index` receives 1-based indices.
    pub fn new(frame_count: usize, uri_for_index: impl Fn(usize) -> String) -> Self {
        let assets = (1..=frame_count)
            .map(|index| FrameAsset {
                index,
                uri: uri_for_index(index),
                state: LoadState::Pending,
                image: None,
            })
            .collect();
        Self {
            assets,
            terminal: 0,
            failed: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Asset for a 0-based frame number (the progress axis).
    pub fn frame(&self, frame: usize) -> Option<&FrameAsset> {
        self.assets.get(frame)
    }

    /// Asset for a 1-based asset index (the loader's numbering).
    pub fn asset(&self, index: usize) -> Option<&FrameAsset> {
        index.checked_sub(1).and_then(|i| self.assets.get(i))
    }

    pub fn assets(&self) -> &[FrameAsset] {
        &self.assets
    }

    pub fn loaded_or_failed_count(&self) -> usize {
        self.terminal
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn loaded_count(&self) -> usize {
        self.terminal - self.failed
    }

    pub fn is_settled(&self) -> bool {
        self.terminal == self.assets.len()
    }

    /// Records a successful load. Returns `None` when the index is unknown or
    /// the asset already reached a terminal state.
    pub fn mark_loaded(&mut self, index: usize, image: RgbaImage) -> Option<Completion> {
        let asset = self.pending_mut(index)?;
        asset.state = LoadState::Loaded;
        asset.image = Some(Arc::new(image));
        Some(self.complete(index, LoadState::Loaded))
    }

    /// Records a failed load; the asset still counts toward settlement.
    pub fn mark_failed(&mut self, index: usize) -> Option<Completion> {
        let asset = self.pending_mut(index)?;
        asset.state = LoadState::Failed;
        self.failed += 1;
        Some(self.complete(index, LoadState::Failed))
    }

    fn pending_mut(&mut self, index: usize) -> Option<&mut FrameAsset> {
        let asset = index.checked_sub(1).and_then(|i| self.assets.get_mut(i))?;
        (asset.state == LoadState::Pending).then_some(asset)
    }

    fn complete(&mut self, index: usize, state: LoadState) -> Completion {
        self.terminal += 1;
        Completion {
            index,
            state,
            first_failure: state == LoadState::Failed && self.failed == 1,
            settled: self.terminal == self.assets.len(),
        }
    }
}

/// Maps a progress value to a 0-based frame number.
///
/// Rounds half toward positive infinity so `-0.5` lands on frame 0. Returns
/// `None` for non-finite or negative results; the upper bound is checked by
/// callers against the store length.
pub fn frame_index(progress: f32) -> Option<usize> {
    if !progress.is_finite() {
        return None;
    }
    let rounded = (progress + 0.5).floor();
    (rounded >= 0.0).then_some(rounded as usize)
}
