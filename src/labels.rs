//! Label scheduling over frame intervals.
//!
//! A single overlay is shown at a time. Switching straight from one label to
//! another removes the old overlay immediately; only leaving every interval
//! (a gap) plays an exit transition.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::placement::{PixelSource, Placement, PlacementAnalyzer};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// A contiguous frame range during which a label is shown.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LabelInterval {
    /// Defaults to `text` when left empty.
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub quote: String,
    pub start_frame: u32,
    pub duration_frames: u32,
}

impl LabelInterval {
    pub fn new(
        id: impl Into<String>,
        quote: impl Into<String>,
        start_frame: u32,
        duration_frames: u32,
    ) -> Self {
        let id = id.into();
        Self {
            text: id.clone(),
            id,
            quote: quote.into(),
            start_frame,
            duration_frames,
        }
    }

    /// Half-open: `start <= frame < start + duration`.
    pub fn contains(&self, frame: usize) -> bool {
        let start = u64::from(self.start_frame);
        let end = start + u64::from(self.duration_frames);
        let frame = frame as u64;
        start <= frame && frame < end
    }

    fn overlaps(&self, other: &LabelInterval) -> bool {
        let (a0, a1) = (
            u64::from(self.start_frame),
            u64::from(self.start_frame) + u64::from(self.duration_frames),
        );
        let (b0, b1) = (
            u64::from(other.start_frame),
            u64::from(other.start_frame) + u64::from(other.duration_frames),
        );
        a0 < b1 && b0 < a1
    }
}

/// Capabilities the scheduler needs from whatever displays the labels.
pub trait OverlayHost {
    type Handle;

    fn create_overlay(&mut self, text: &str, quote: &str) -> Self::Handle;
    fn destroy_overlay(&mut self, handle: Self::Handle);
    fn apply_placement(&mut self, handle: &Self::Handle, placement: &Placement);
    fn play_enter(&mut self, handle: &Self::Handle);
    /// Starts the exit transition; returns how long it runs before the
    /// overlay may be destroyed.
    fn play_exit(&mut self, handle: &Self::Handle) -> Duration;
    fn mark_settled(&mut self, handle: &Self::Handle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelState {
    Idle,
    Showing(String),
}

impl LabelState {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Showing(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelChange {
    pub from: LabelState,
    pub to: LabelState,
}

struct Mounted<H> {
    handle: H,
    settle_at: Option<Instant>,
}

struct Exiting<H> {
    handle: H,
    done_at: Instant,
}

pub struct LabelScheduler<H: OverlayHost> {
    intervals: Vec<LabelInterval>,
    analyzer: PlacementAnalyzer,
    settle_delay: Duration,
    host: H,
    state: LabelState,
    /// Interval behind `state`, so duplicate ids still switch.
    current: Option<usize>,
    active: Option<Mounted<H::Handle>>,
    exiting: Option<Exiting<H::Handle>>,
}

impl<H: OverlayHost> LabelScheduler<H> {
    pub fn new(
        intervals: Vec<LabelInterval>,
        analyzer: PlacementAnalyzer,
        settle_delay: Duration,
        host: H,
    ) -> Self {
        let mut intervals = intervals;
        for interval in &mut intervals {
            if interval.id.trim().is_empty() {
                interval.id = interval.text.clone();
            }
        }
        warn_on_overlaps(&intervals);
        Self {
            intervals,
            analyzer,
            settle_delay,
            host,
            state: LabelState::Idle,
            current: None,
            active: None,
            exiting: None,
        }
    }

    pub fn state(&self) -> &LabelState {
        &self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Number of overlays currently mounted, including one mid-exit. Never above one.
    pub fn mounted(&self) -> usize {
        usize::from(self.active.is_some()) + usize::from(self.exiting.is_some())
    }

    /// First interval, in declaration order, containing `frame`.
    pub fn interval_at(&self, frame: usize) -> Option<&LabelInterval> {
        self.intervals.iter().find(|iv| iv.contains(frame))
    }

    /// Advances the state machine for the frame just drawn on `surface`.
    ///
    /// Pending settle marks and exit completions are flushed first, using `now`.
    pub fn tick(
        &mut self,
        frame: usize,
        surface: &impl PixelSource,
        now: Instant,
    ) -> Option<LabelChange> {
        self.flush_timers(now);

        let matched = self.intervals.iter().position(|iv| iv.contains(frame));
        match matched {
            Some(i) if self.current == Some(i) => None,
            Some(i) => Some(self.show(i, surface, now)),
            None if self.state != LabelState::Idle => Some(self.hide(now)),
            None => None,
        }
    }

    fn show(&mut self, index: usize, surface: &impl PixelSource, now: Instant) -> LabelChange {
        self.clear_now();

        let interval = &self.intervals[index];
        let handle = self.host.create_overlay(&interval.text, &interval.quote);
        let placement = self.analyzer.select_placement(surface);
        self.host.apply_placement(&handle, &placement);
        self.host.play_enter(&handle);

        let settle_at = if self.settle_delay.is_zero() {
            self.host.mark_settled(&handle);
            None
        } else {
            Some(now + self.settle_delay)
        };
        self.active = Some(Mounted { handle, settle_at });
        self.current = Some(index);

        let id = interval.id.clone();
        info!(label = %id, align = ?placement.align, source = ?placement.source, "label shown");
        self.goto(LabelState::Showing(id))
    }

    fn hide(&mut self, now: Instant) -> LabelChange {
        if let Some(Mounted { handle, .. }) = self.active.take() {
            let exit = self.host.play_exit(&handle);
            if exit.is_zero() {
                self.host.destroy_overlay(handle);
            } else {
                self.exiting = Some(Exiting {
                    handle,
                    done_at: now + exit,
                });
            }
        }
        self.current = None;
        info!(label = ?self.state.label(), "label hidden");
        self.goto(LabelState::Idle)
    }

    /// Removes every mounted overlay without animation.
    fn clear_now(&mut self) {
        if let Some(Exiting { handle, .. }) = self.exiting.take() {
            self.host.destroy_overlay(handle);
        }
        if let Some(Mounted { handle, .. }) = self.active.take() {
            self.host.destroy_overlay(handle);
        }
    }

    fn flush_timers(&mut self, now: Instant) {
        if let Some(mounted) = self.active.as_mut()
            && mounted.settle_at.is_some_and(|at| now >= at)
        {
            mounted.settle_at = None;
            self.host.mark_settled(&mounted.handle);
        }
        if self.exiting.as_ref().is_some_and(|e| now >= e.done_at)
            && let Some(Exiting { handle, .. }) = self.exiting.take()
        {
            debug!("exit transition finished; overlay removed");
            self.host.destroy_overlay(handle);
        }
    }

    fn goto(&mut self, to: LabelState) -> LabelChange {
        let from = std::mem::replace(&mut self.state, to.clone());
        LabelChange { from, to }
    }
}

fn warn_on_overlaps(intervals: &[LabelInterval]) {
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            if a.overlaps(b) {
                warn!(
                    first = %a.id,
                    second = %b.id,
                    "label intervals overlap; the earlier one wins"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{PlacementSource, SampleError};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(u32, String),
        Destroy(u32),
        Place(u32),
        Enter(u32),
        Exit(u32),
        Settled(u32),
    }

    #[derive(Default)]
    struct Recorder {
        next: u32,
        calls: Vec<Call>,
        live: Vec<u32>,
        max_live: usize,
        exit: Duration,
    }

    impl OverlayHost for Recorder {
        type Handle = u32;

        fn create_overlay(&mut self, text: &str, _quote: &str) -> u32 {
            self.next += 1;
            self.calls.push(Call::Create(self.next, text.to_string()));
            self.live.push(self.next);
            self.max_live = self.max_live.max(self.live.len());
            self.next
        }

        fn destroy_overlay(&mut self, handle: u32) {
            self.calls.push(Call::Destroy(handle));
            self.live.retain(|h| *h != handle);
        }

        fn apply_placement(&mut self, handle: &u32, _placement: &Placement) {
            self.calls.push(Call::Place(*handle));
        }

        fn play_enter(&mut self, handle: &u32) {
            self.calls.push(Call::Enter(*handle));
        }

        fn play_exit(&mut self, handle: &u32) -> Duration {
            self.calls.push(Call::Exit(*handle));
            self.exit
        }

        fn mark_settled(&mut self, handle: &u32) {
            self.calls.push(Call::Settled(*handle));
        }
    }

    struct Dark;

    impl PixelSource for Dark {
        fn dimensions(&self) -> (u32, u32) {
            (100, 100)
        }

        fn read_block(&self, _: u32, _: u32, size: u32) -> Result<Vec<u8>, SampleError> {
            Ok(vec![0; (size * size * 4) as usize])
        }
    }

    fn planets() -> Vec<LabelInterval> {
        vec![
            LabelInterval::new("Sun", "Soul • Power • Authority", 550, 250),
            LabelInterval::new("Moon", "Mind • Emotion • Comfort", 880, 100),
        ]
    }

    fn scheduler(exit: Duration) -> LabelScheduler<Recorder> {
        let host = Recorder {
            exit,
            ..Recorder::default()
        };
        LabelScheduler::new(
            planets(),
            PlacementAnalyzer::default(),
            DEFAULT_SETTLE_DELAY,
            host,
        )
    }

    fn showing(id: &str) -> LabelState {
        LabelState::Showing(id.to_string())
    }

    #[test]
    fn follows_the_reference_table() {
        let t0 = Instant::now();
        let mut s = scheduler(Duration::from_millis(500));

        assert!(s.tick(549, &Dark, t0).is_none());
        assert_eq!(*s.state(), LabelState::Idle);

        let ch = s.tick(550, &Dark, t0).unwrap();
        assert_eq!((ch.from, ch.to), (LabelState::Idle, showing("Sun")));
        assert_eq!(
            s.host().calls,
            vec![
                Call::Create(1, "Sun".into()),
                Call::Place(1),
                Call::Enter(1)
            ]
        );

        let before = s.host().calls.len();
        assert!(s.tick(799, &Dark, t0).is_none());
        assert_eq!(s.host().calls.len(), before);
        assert_eq!(*s.state(), showing("Sun"));

        let ch = s.tick(800, &Dark, t0).unwrap();
        assert_eq!(ch.to, LabelState::Idle);
        assert_eq!(s.host().calls.last(), Some(&Call::Exit(1)));
        assert_eq!(s.mounted(), 1);

        assert!(s.tick(801, &Dark, t0 + Duration::from_millis(500)).is_none());
        assert_eq!(s.host().calls.last(), Some(&Call::Destroy(1)));
        assert_eq!(s.mounted(), 0);

        let ch = s.tick(880, &Dark, t0 + Duration::from_secs(1)).unwrap();
        assert_eq!((ch.from, ch.to), (LabelState::Idle, showing("Moon")));
        assert_eq!(s.host().live, vec![2]);
    }

    #[test]
    fn settles_after_the_delay_only_once() {
        let t0 = Instant::now();
        let mut s = scheduler(Duration::ZERO);
        s.tick(600, &Dark, t0);
        s.tick(601, &Dark, t0 + Duration::from_millis(50));
        assert!(!s.host().calls.contains(&Call::Settled(1)));
        s.tick(602, &Dark, t0 + Duration::from_millis(100));
        s.tick(603, &Dark, t0 + Duration::from_millis(200));
        let settled = s
            .host()
            .calls
            .iter()
            .filter(|c| **c == Call::Settled(1))
            .count();
        assert_eq!(settled, 1);
    }

    #[test]
    fn backward_scrub_never_mounts_two_labels() {
        let t0 = Instant::now();
        let mut s = scheduler(Duration::from_millis(500));
        for (step, frame) in (600..=900).rev().enumerate() {
            s.tick(frame, &Dark, t0 + Duration::from_millis(step as u64));
            assert!(s.host().live.len() <= 1);
        }
        assert_eq!(*s.state(), showing("Sun"));
        assert_eq!(s.host().live.len(), 1);
        assert_eq!(s.host().max_live, 1);
    }

    #[test]
    fn reentering_during_exit_replaces_the_fading_overlay() {
        let t0 = Instant::now();
        let mut s = scheduler(Duration::from_millis(500));
        s.tick(700, &Dark, t0);
        s.tick(820, &Dark, t0);
        assert_eq!(s.mounted(), 1);
        s.tick(790, &Dark, t0 + Duration::from_millis(10));
        assert_eq!(s.host().live, vec![2]);
        assert_eq!(s.host().max_live, 1);
        assert_eq!(*s.state(), showing("Sun"));
    }

    #[test]
    fn adjacent_intervals_switch_without_exit_animation() {
        let t0 = Instant::now();
        let host = Recorder::default();
        let mut s = LabelScheduler::new(
            vec![
                LabelInterval::new("A", "", 0, 10),
                LabelInterval::new("B", "", 10, 10),
            ],
            PlacementAnalyzer::default(),
            DEFAULT_SETTLE_DELAY,
            host,
        );
        s.tick(9, &Dark, t0);
        let ch = s.tick(10, &Dark, t0).unwrap();
        assert_eq!((ch.from, ch.to), (showing("A"), showing("B")));
        assert!(!s.host().calls.iter().any(|c| matches!(c, Call::Exit(_))));
        assert_eq!(s.host().calls[3], Call::Destroy(1));
        assert_eq!(s.host().live, vec![2]);
    }

    #[test]
    fn intervals_without_ids_switch_by_text() {
        let t0 = Instant::now();
        let unnamed = |text: &str, start| LabelInterval {
            id: String::new(),
            text: text.to_string(),
            quote: String::new(),
            start_frame: start,
            duration_frames: 10,
        };
        let mut s = LabelScheduler::new(
            vec![unnamed("Sun", 0), unnamed("Moon", 10)],
            PlacementAnalyzer::default(),
            DEFAULT_SETTLE_DELAY,
            Recorder::default(),
        );
        assert_eq!(s.tick(5, &Dark, t0).unwrap().to, showing("Sun"));
        let ch = s.tick(12, &Dark, t0).unwrap();
        assert_eq!((ch.from, ch.to), (showing("Sun"), showing("Moon")));
        assert_eq!(s.host().live, vec![2]);
    }

    #[test]
    fn repeated_ids_still_remount_per_interval() {
        let t0 = Instant::now();
        let mut s = LabelScheduler::new(
            vec![
                LabelInterval::new("p", "first", 0, 10),
                LabelInterval::new("p", "second", 10, 10),
            ],
            PlacementAnalyzer::default(),
            DEFAULT_SETTLE_DELAY,
            Recorder::default(),
        );
        s.tick(5, &Dark, t0);
        assert!(s.tick(12, &Dark, t0).is_some());
        assert_eq!(s.host().calls[3], Call::Destroy(1));
        assert_eq!(s.host().live, vec![2]);
    }

    #[test]
    fn overlapping_intervals_resolve_to_first_declared() {
        let host = Recorder::default();
        let mut s = LabelScheduler::new(
            vec![
                LabelInterval::new("Wide", "", 0, 100),
                LabelInterval::new("Narrow", "", 40, 10),
            ],
            PlacementAnalyzer::default(),
            DEFAULT_SETTLE_DELAY,
            host,
        );
        assert_eq!(s.interval_at(45).unwrap().id, "Wide");
        s.tick(45, &Dark, Instant::now());
        assert_eq!(*s.state(), showing("Wide"));
    }

    #[test]
    fn placement_uses_the_drawn_surface() {
        struct Refusing;
        impl PixelSource for Refusing {
            fn dimensions(&self) -> (u32, u32) {
                (10, 10)
            }
            fn read_block(&self, _: u32, _: u32, _: u32) -> Result<Vec<u8>, SampleError> {
                Err(SampleError::Refused("nope".into()))
            }
        }

        struct Placed(Vec<Placement>);
        impl OverlayHost for Placed {
            type Handle = ();
            fn create_overlay(&mut self, _: &str, _: &str) {}
            fn destroy_overlay(&mut self, _: ()) {}
            fn apply_placement(&mut self, _: &(), placement: &Placement) {
                self.0.push(*placement);
            }
            fn play_enter(&mut self, _: &()) {}
            fn play_exit(&mut self, _: &()) -> Duration {
                Duration::ZERO
            }
            fn mark_settled(&mut self, _: &()) {}
        }

        let mut s = LabelScheduler::new(
            planets(),
            PlacementAnalyzer::default(),
            Duration::ZERO,
            Placed(Vec::new()),
        );
        s.tick(560, &Refusing, Instant::now());
        assert_eq!(s.host().0[0].source, PlacementSource::Fallback);
    }

    #[test]
    fn contains_is_half_open_and_overflow_safe() {
        let iv = LabelInterval::new("X", "", u32::MAX - 1, u32::MAX);
        assert!(iv.contains(u32::MAX as usize));
        let sun = &planets()[0];
        assert!(!sun.contains(549));
        assert!(sun.contains(550));
        assert!(sun.contains(799));
        assert!(!sun.contains(800));
    }
}
