use image::RgbaImage;

use crate::labels::LabelChange;

/// One decode job handed to the loader. `index` is the 1-based asset index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest {
    pub index: usize,
    pub uri: String,
}

/// Terminal outcome of a single frame load, funneled back into the engine.
#[derive(Debug)]
pub enum FrameEvent {
    Loaded { index: usize, image: RgbaImage },
    Failed { index: usize, uri: String, reason: String },
}

impl FrameEvent {
    pub fn index(&self) -> usize {
        match self {
            Self::Loaded { index, .. } | Self::Failed { index, .. } => *index,
        }
    }
}

/// Emitted once every frame has reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSettled {
    pub loaded: usize,
    pub failed: usize,
}

/// Notifications published by the playback loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Settled(SequenceSettled),
    Label(LabelChange),
}
