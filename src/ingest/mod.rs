//! Frame sources.
//!
//! This module provides the sources a capture session polls:
//! - USB/V4L2 devices (feature: ingest-v4l2)
//! - Synthetic `stub://` sources (testing, demos)
//!
//! Sources are opened through a `SourceOpener` so the session decides the
//! open order and can release a half-opened rig. Every source produces RGB8
//! `Frame` values regardless of the device's native pixel format.

#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

use crate::error::SourceError;
use crate::frame::Frame;

/// A camera-like device that yields one frame per poll.
pub trait FrameSource {
    /// Identifier the source was opened with.
    fn identifier(&self) -> &str;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame, SourceError>;

    /// Release the underlying device. Calling this more than once is a no-op.
    fn release(&mut self);

    fn stats(&self) -> SourceStats;
}

/// Opens frame sources by identifier.
pub trait SourceOpener {
    type Source: FrameSource;

    fn open(&mut self, identifier: &str, width: u32, height: u32)
        -> Result<Self::Source, SourceError>;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_read: u64,
    pub identifier: String,
}

// ----------------------------------------------------------------------------
// Production dispatch
// ----------------------------------------------------------------------------

/// A source backed by either a synthetic generator or a real device.
pub enum CameraSource {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(V4l2Source),
}

impl FrameSource for CameraSource {
    fn identifier(&self) -> &str {
        match self {
            CameraSource::Synthetic(source) => source.identifier(),
            #[cfg(feature = "ingest-v4l2")]
            CameraSource::Device(source) => source.identifier(),
        }
    }

    fn read_frame(&mut self) -> Result<Frame, SourceError> {
        match self {
            CameraSource::Synthetic(source) => source.read_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CameraSource::Device(source) => source.read_frame(),
        }
    }

    fn release(&mut self) {
        match self {
            CameraSource::Synthetic(source) => source.release(),
            #[cfg(feature = "ingest-v4l2")]
            CameraSource::Device(source) => source.release(),
        }
    }

    fn stats(&self) -> SourceStats {
        match self {
            CameraSource::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraSource::Device(source) => source.stats(),
        }
    }
}

/// Opens `stub://` identifiers synthetically and everything else as a device.
#[derive(Clone, Copy, Debug, Default)]
pub struct CameraOpener;

impl SourceOpener for CameraOpener {
    type Source = CameraSource;

    fn open(
        &mut self,
        identifier: &str,
        width: u32,
        height: u32,
    ) -> Result<CameraSource, SourceError> {
        if identifier.starts_with("stub://") {
            let config = SyntheticConfig::parse(identifier, width, height)?;
            return Ok(CameraSource::Synthetic(SyntheticSource::open(config)?));
        }
        let device = device_path(identifier);
        open_device(identifier, device, width, height)
    }
}

#[cfg(feature = "ingest-v4l2")]
fn open_device(
    _identifier: &str,
    device: String,
    width: u32,
    height: u32,
) -> Result<CameraSource, SourceError> {
    let source = V4l2Source::open(V4l2Config {
        device,
        width,
        height,
    })?;
    Ok(CameraSource::Device(source))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_device(
    identifier: &str,
    _device: String,
    _width: u32,
    _height: u32,
) -> Result<CameraSource, SourceError> {
    Err(SourceError::Unavailable {
        identifier: identifier.to_string(),
        reason: "device capture requires the ingest-v4l2 feature".to_string(),
    })
}

/// Map a bare camera index (`0`, `1`, ...) to its V4L2 device node.
pub fn device_path(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        format!("/dev/video{}", trimmed)
    } else {
        trimmed.to_string()
    }
}
