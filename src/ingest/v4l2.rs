//! V4L2 frame source.
//!
//! This module provides `V4l2Source` for reading frames from local USB
//! cameras through their V4L2 device nodes (e.g. /dev/video0).
//!
//! The source requests the configured size in MJPG, falls back to whatever
//! format the driver negotiates, and normalizes every buffer to RGB8.
//! There is no retry: a failed dequeue is reported to the caller as a read
//! error.

use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{FrameSource, SourceStats};
use crate::error::SourceError;
use crate::frame::Frame;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

/// V4L2 frame source.
pub struct V4l2Source {
    config: V4l2Config,
    state: Option<V4l2State>,
    format: PixelFormat,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    /// Open the device, negotiate a format, and start streaming.
    pub fn open(config: V4l2Config) -> Result<Self, SourceError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let unavailable = |reason: String| SourceError::Unavailable {
            identifier: config.device.clone(),
            reason,
        };

        let device = v4l::Device::with_path(&config.device)
            .map_err(|e| unavailable(format!("open v4l2 device: {}", e)))?;
        let mut format = device
            .format()
            .map_err(|e| unavailable(format!("read v4l2 format: {}", e)))?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"MJPG");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    config.device,
                    err
                );
                device
                    .format()
                    .map_err(|e| unavailable(format!("read v4l2 format after set failure: {}", e)))?
            }
        };

        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            unavailable(format!("unsupported pixel format {}", format.fourcc))
        })?;
        if format.width != config.width || format.height != config.height {
            log::warn!(
                "V4l2Source: {} negotiated {}x{} instead of {}x{}",
                config.device,
                format.width,
                format.height,
                config.width,
                config.height
            );
        }

        let state = V4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|e| unavailable(format!("create v4l2 buffer stream: {}", e)))?;

        log::info!(
            "V4l2Source: opened {} ({}x{} {:?})",
            config.device,
            format.width,
            format.height,
            pixel_format
        );
        Ok(Self {
            active_width: format.width,
            active_height: format.height,
            config,
            state: Some(state),
            format: pixel_format,
            frame_count: 0,
        })
    }
}

impl FrameSource for V4l2Source {
    fn identifier(&self) -> &str {
        &self.config.device
    }

    fn read_frame(&mut self) -> Result<Frame, SourceError> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().ok_or(SourceError::Released)?;
        let (width, height, format) = (self.active_width, self.active_height, self.format);
        let (pixels, width, height) = state.with_mut(|fields| {
            let (buf, meta) = fields
                .stream
                .next()
                .map_err(|e| SourceError::Read(format!("capture v4l2 frame: {}", e)))?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            normalize_to_rgb(&buf[..used], width, height, format)
        })?;

        self.frame_count += 1;
        Frame::new(pixels, width, height, self.frame_count)
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!(
                "V4l2Source: released {} after {} frames",
                self.config.device,
                self.frame_count
            );
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            identifier: self.config.device.clone(),
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.release();
    }
}
