//! Content-aware label placement.
//!
//! Samples a few fixed regions of the rendered surface and anchors the label
//! over the darkest one, so a light label keeps its contrast.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::processing::luma::mean_luma;

/// Why a pixel read was refused.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("surface has no pixels to sample")]
    EmptySurface,
    #[error("pixel read refused: {0}")]
    Refused(String),
}

/// Anything the analyzer can read pixel blocks from.
pub trait PixelSource {
    fn dimensions(&self) -> (u32, u32);

    /// Reads a `size`x`size` RGBA8 block whose top-left corner is `(x, y)`.
    /// Pixels outside the source read as transparent black.
    fn read_block(&self, x: u32, y: u32, size: u32) -> Result<Vec<u8>, SampleError>;
}

/// Horizontal text alignment hint for a placed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// The four default sample regions, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn candidate(self) -> Candidate {
        match self {
            Corner::TopLeft => Candidate::new(20.0, 20.0),
            Corner::TopRight => Candidate::new(80.0, 20.0),
            Corner::BottomLeft => Candidate::new(20.0, 80.0),
            Corner::BottomRight => Candidate::new(80.0, 80.0),
        }
    }

    pub fn align(self) -> TextAlign {
        match self {
            Corner::TopLeft | Corner::BottomLeft => TextAlign::Left,
            Corner::TopRight | Corner::BottomRight => TextAlign::Right,
        }
    }

    fn from_candidate(candidate: &Candidate) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.candidate() == *candidate)
    }
}

/// A sample region position, in percent of the surface size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Candidate {
    pub x_pct: f32,
    pub y_pct: f32,
}

impl Candidate {
    pub const fn new(x_pct: f32, y_pct: f32) -> Self {
        Self { x_pct, y_pct }
    }

    /// Text alignment that keeps the label growing away from the nearer edge.
    pub fn align(&self) -> TextAlign {
        if self.x_pct < 50.0 {
            TextAlign::Left
        } else if self.x_pct > 50.0 {
            TextAlign::Right
        } else {
            TextAlign::Center
        }
    }

    fn origin(&self, width: u32, height: u32) -> (u32, u32) {
        let x = (width as f32 * self.x_pct / 100.0).floor().max(0.0) as u32;
        let y = (height as f32 * self.y_pct / 100.0).floor().max(0.0) as u32;
        (x, y)
    }
}

/// Where a placement decision came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementSource {
    /// A default corner won.
    Corner(Corner),
    /// A configured, non-corner candidate won (index into the candidate list).
    Candidate(usize),
    /// Sampling failed.
    Fallback,
}

/// Anchor descriptor applied to an overlay, independent of any styling system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub anchor_x_pct: f32,
    pub anchor_y_pct: f32,
    pub align: TextAlign,
    pub source: PlacementSource,
}

impl Placement {
    /// Bottom-center, center-aligned.
    pub const FALLBACK: Placement = Placement {
        anchor_x_pct: 50.0,
        anchor_y_pct: 85.0,
        align: TextAlign::Center,
        source: PlacementSource::Fallback,
    };

    fn from_candidate(index: usize, candidate: &Candidate) -> Self {
        let (align, source) = match Corner::from_candidate(candidate) {
            Some(corner) => (corner.align(), PlacementSource::Corner(corner)),
            None => (candidate.align(), PlacementSource::Candidate(index)),
        };
        Self {
            anchor_x_pct: candidate.x_pct,
            anchor_y_pct: candidate.y_pct,
            align,
            source,
        }
    }
}

pub const DEFAULT_SAMPLE_SIZE: u32 = 20;
/// Largest sample block side; bigger regions are clamped to this.
pub const MAX_SAMPLE_SIZE: u32 = 256;

#[derive(Debug, Clone)]
pub struct PlacementAnalyzer {
    candidates: Vec<Candidate>,
    sample_size: u32,
}

impl Default for PlacementAnalyzer {
    fn default() -> Self {
        Self {
            candidates: Corner::ALL.map(Corner::candidate).to_vec(),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl PlacementAnalyzer {
    /// An empty candidate list always yields the fallback. `sample_size` is
    /// clamped to `1..=MAX_SAMPLE_SIZE`.
    pub fn new(candidates: Vec<Candidate>, sample_size: u32) -> Self {
        Self {
            candidates,
            sample_size: sample_size.clamp(1, MAX_SAMPLE_SIZE),
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    /// Mean luma of every candidate region, in candidate order.
    pub fn scores(&self, source: &impl PixelSource) -> Result<Vec<f32>, SampleError> {
        let (width, height) = source.dimensions();
        self.candidates
            .iter()
            .map(|candidate| {
                let (x, y) = candidate.origin(width, height);
                let block = source.read_block(x, y, self.sample_size)?;
                Ok(mean_luma(&block))
            })
            .collect()
    }

    /// Picks the darkest candidate, or [`Placement::FALLBACK`] if the surface
    /// cannot be read.
    pub fn select_placement(&self, source: &impl PixelSource) -> Placement {
        let scores = match self.scores(source) {
            Ok(scores) => scores,
            Err(err) => {
                debug!(error = %err, "placement sampling failed; using fallback");
                return Placement::FALLBACK;
            }
        };
        match darkest(&scores) {
            Some(index) => Placement::from_candidate(index, &self.candidates[index]),
            None => Placement::FALLBACK,
        }
    }
}

/// Index of the lowest score; ties go to the earliest index.
pub fn darkest(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
}
