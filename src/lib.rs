pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod labels;
pub mod overlay;
pub mod placement;
pub mod store;
pub mod processing {
    pub mod layout;
    pub mod luma;
}
pub mod render {
    pub mod renderer;
    pub mod surface;
}
pub mod tasks {
    pub mod loader;
    pub mod playback;
    pub mod scrub;
}

pub use config::Configuration;
pub use engine::{Engine, EngineBuilder, TickReport};
pub use error::{Error, Result};
pub use events::{FrameEvent, FrameRequest, PlaybackEvent, SequenceSettled};
pub use labels::{LabelChange, LabelInterval, LabelState, OverlayHost};
pub use placement::{Placement, PlacementAnalyzer};
