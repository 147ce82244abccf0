//! Frame and pair types.
//!
//! - `Frame`: one RGB8 image read from a single source.
//! - `FramePair`: the two frames read in one capture cycle.
//! - `PersistedPair`: where a pair landed on disk once it was written.
//!
//! A pair carries no sequence index. The index is chosen by the session at
//! persistence time, so previewed cycles never consume numbers.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use crate::error::SourceError;

/// Which half of the stereo rig a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Operator-facing camera label, e.g. `Camera 0 (Left)`.
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "Camera 0 (Left)",
            Side::Right => "Camera 1 (Right)",
        }
    }

    /// Default output directory name for this side.
    pub fn default_dir(self) -> &'static str {
        match self {
            Side::Left => "camera0",
            Side::Right => "camera1",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// A single packed RGB8 image.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Per-source read counter, starting at 1.
    pub sequence: u64,
    /// Monotonic instant at which the read completed.
    pub captured_at: Instant,
}

impl Frame {
    /// Build a frame, rejecting buffers that do not hold `width * height` RGB pixels.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self, SourceError> {
        let expected = rgb_len(width, height)
            .ok_or_else(|| SourceError::Read("frame dimensions overflow".to_string()))?;
        if pixels.len() != expected {
            return Err(SourceError::Read(format!(
                "short frame: expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            pixels,
            width,
            height,
            sequence,
            captured_at: Instant::now(),
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
}

// ----------------------------------------------------------------------------
// FramePair
// ----------------------------------------------------------------------------

/// Both frames of one capture cycle.
#[derive(Clone, Debug)]
pub struct FramePair {
    pub left: Frame,
    pub right: Frame,
    /// Capture-cycle ordinal within the session, starting at 1.
    pub cycle: u64,
    /// Wall clock taken once after both reads; labels both files.
    pub captured_at: DateTime<Local>,
}

/// Paths of a pair that was written successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedPair {
    pub index: u32,
    pub left: PathBuf,
    pub right: PathBuf,
}
