use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::frame::Side;

/// Failure reported by a single frame source, before the session knows which
/// side it belongs to.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open {identifier}: {reason}")]
    Unavailable { identifier: String, reason: String },
    #[error("frame read failed: {0}")]
    Read(String),
    #[error("source already released")]
    Released,
}

/// Errors surfaced by the capture session.
///
/// `SourceUnavailable` is fatal at startup, `FrameRead` is fatal inside the
/// loop, `Write` is recoverable.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{side} source {identifier} unavailable: {reason}")]
    SourceUnavailable {
        side: Side,
        identifier: String,
        reason: String,
    },
    #[error("failed to read frame from {side}: {reason}")]
    FrameRead { side: Side, reason: String },
    #[error("failed to write {side} image {}: {source}", .path.display())]
    Write {
        side: Side,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("capture session is closed")]
    SessionClosed,
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CaptureError {
    pub(crate) fn from_source(side: Side, err: SourceError) -> Self {
        match err {
            SourceError::Unavailable { identifier, reason } => CaptureError::SourceUnavailable {
                side,
                identifier,
                reason,
            },
            SourceError::Read(reason) => CaptureError::FrameRead { side, reason },
            SourceError::Released => CaptureError::FrameRead {
                side,
                reason: "source already released".to_string(),
            },
        }
    }

    /// The side a write failure belongs to, if this is a write failure.
    pub fn write_side(&self) -> Option<Side> {
        match self {
            CaptureError::Write { side, .. } => Some(*side),
            _ => None,
        }
    }
}
