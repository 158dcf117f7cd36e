//! Overlay host that renders labels as log lines.
//!
//! Used by the binary, which has no windowing surface of its own.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::labels::OverlayHost;
use crate::placement::Placement;

/// Length of the fade-out reported for every exit transition.
pub const DEFAULT_EXIT_DURATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OverlayId(u64);

#[derive(Debug)]
struct LiveOverlay {
    text: String,
    settled: bool,
}

#[derive(Debug)]
pub struct TracingOverlay {
    next_id: u64,
    exit_duration: Duration,
    live: BTreeMap<OverlayId, LiveOverlay>,
}

impl Default for TracingOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_EXIT_DURATION)
    }
}

impl TracingOverlay {
    pub fn new(exit_duration: Duration) -> Self {
        Self {
            next_id: 0,
            exit_duration,
            live: BTreeMap::new(),
        }
    }

    /// Number of overlays currently mounted, exiting ones included.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Texts of mounted overlays, oldest first.
    pub fn live_texts(&self) -> Vec<&str> {
        self.live.values().map(|o| o.text.as_str()).collect()
    }

    pub fn is_settled(&self, id: OverlayId) -> bool {
        self.live.get(&id).is_some_and(|o| o.settled)
    }
}

impl OverlayHost for TracingOverlay {
    type Handle = OverlayId;

    fn create_overlay(&mut self, text: &str, quote: &str) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        debug!(id = id.0, text, quote, "overlay created");
        self.live.insert(
            id,
            LiveOverlay {
                text: text.to_string(),
                settled: false,
            },
        );
        id
    }

    fn destroy_overlay(&mut self, handle: OverlayId) {
        if let Some(overlay) = self.live.remove(&handle) {
            debug!(id = handle.0, text = %overlay.text, "overlay removed");
        }
    }

    fn apply_placement(&mut self, handle: &OverlayId, placement: &Placement) {
        info!(
            id = handle.0,
            x_pct = placement.anchor_x_pct,
            y_pct = placement.anchor_y_pct,
            align = ?placement.align,
            "overlay placed"
        );
    }

    fn play_enter(&mut self, handle: &OverlayId) {
        debug!(id = handle.0, "enter transition");
    }

    fn play_exit(&mut self, handle: &OverlayId) -> Duration {
        debug!(id = handle.0, duration = ?self.exit_duration, "exit transition");
        self.exit_duration
    }

    fn mark_settled(&mut self, handle: &OverlayId) {
        if let Some(overlay) = self.live.get_mut(handle) {
            overlay.settled = true;
        }
    }
}
