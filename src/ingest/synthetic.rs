//! Synthetic frame source (`stub://`).
//!
//! Produces a moving RGB gradient so previews and captured files visibly
//! change between cycles. Reads are paced to `target_fps` (default 30,
//! `stub://name?fps=N`, 0 for unpaced) the way a camera blocks until its
//! next frame. Two query options script failures:
//! - `stub://name?unavailable` refuses to open
//! - `stub://name?fail_after=N` fails every read after the N-th frame

use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::error::SourceError;
use crate::frame::{rgb_len, Frame};

pub const DEFAULT_STUB_FPS: u32 = 30;

/// Configuration for a synthetic source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub identifier: String,
    pub width: u32,
    pub height: u32,
    /// Frame rate reads are paced to. 0 disables pacing.
    pub target_fps: u32,
    /// Refuse to open, as a missing device would.
    pub unavailable: bool,
    /// Number of frames served before every further read fails.
    pub fail_after: Option<u64>,
}

impl SyntheticConfig {
    pub fn new(identifier: &str, width: u32, height: u32) -> Self {
        Self {
            identifier: identifier.to_string(),
            width,
            height,
            target_fps: DEFAULT_STUB_FPS,
            unavailable: false,
            fail_after: None,
        }
    }

    /// Parse a `stub://name[?option&option]` identifier.
    pub fn parse(identifier: &str, width: u32, height: u32) -> Result<Self, SourceError> {
        let mut config = Self::new(identifier, width, height);
        let Some((_, query)) = identifier.split_once('?') else {
            return Ok(config);
        };
        for option in query.split('&').filter(|o| !o.is_empty()) {
            match option.split_once('=') {
                None if option == "unavailable" => config.unavailable = true,
                Some(("fail_after", value)) => {
                    let n = value.parse::<u64>().map_err(|_| SourceError::Unavailable {
                        identifier: identifier.to_string(),
                        reason: format!("fail_after must be an integer, got {:?}", value),
                    })?;
                    config.fail_after = Some(n);
                }
                Some(("fps", value)) => {
                    let fps = value.parse::<u32>().map_err(|_| SourceError::Unavailable {
                        identifier: identifier.to_string(),
                        reason: format!("fps must be an integer, got {:?}", value),
                    })?;
                    config.target_fps = fps;
                }
                _ => {
                    return Err(SourceError::Unavailable {
                        identifier: identifier.to_string(),
                        reason: format!("unknown stub option {:?}", option),
                    })
                }
            }
        }
        Ok(config)
    }
}

/// Synthetic frame source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    next_frame_at: Option<Instant>,
    released: bool,
}

impl SyntheticSource {
    pub fn open(config: SyntheticConfig) -> Result<Self, SourceError> {
        if config.unavailable {
            return Err(SourceError::Unavailable {
                identifier: config.identifier.clone(),
                reason: "synthetic source configured as unavailable".to_string(),
            });
        }
        if config.width == 0 || config.height == 0 || rgb_len(config.width, config.height).is_none()
        {
            return Err(SourceError::Unavailable {
                identifier: config.identifier.clone(),
                reason: format!("unsupported size {}x{}", config.width, config.height),
            });
        }
        log::info!(
            "SyntheticSource: opened {} ({}x{} @ {} fps)",
            config.identifier,
            config.width,
            config.height,
            config.target_fps
        );
        Ok(Self {
            config,
            frame_count: 0,
            next_frame_at: None,
            released: false,
        })
    }

    /// Block until the next frame is due.
    fn wait_for_frame(&mut self) {
        let interval = frame_interval(self.config.target_fps);
        if interval.is_zero() {
            return;
        }
        if let Some(due) = self.next_frame_at {
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        self.next_frame_at = Some(Instant::now() + interval);
    }

    fn generate_pixels(&self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let shift = self.frame_count as usize;
        let mut pixels = vec![0u8; width * height * 3];
        for (i, px) in pixels.chunks_exact_mut(3).enumerate() {
            let x = i % width;
            let y = i / width;
            px[0] = ((x + shift) * 255 / width.max(1)) as u8;
            px[1] = (y * 255 / height.max(1)) as u8;
            px[2] = (shift % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn identifier(&self) -> &str {
        &self.config.identifier
    }

    fn read_frame(&mut self) -> Result<Frame, SourceError> {
        if self.released {
            return Err(SourceError::Released);
        }
        if let Some(limit) = self.config.fail_after {
            if self.frame_count >= limit {
                return Err(SourceError::Read(format!(
                    "{}: device stopped responding after {} frames",
                    self.config.identifier, limit
                )));
            }
        }
        self.wait_for_frame();
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Frame::new(pixels, self.config.width, self.config.height, self.frame_count)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        log::info!(
            "SyntheticSource: released {} after {} frames",
            self.config.identifier,
            self.frame_count
        );
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            identifier: self.config.identifier.clone(),
        }
    }
}

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_failure_options() -> anyhow::Result<()> {
        let config = SyntheticConfig::parse("stub://cam?fail_after=3", 4, 4)?;
        assert_eq!(config.fail_after, Some(3));
        assert!(!config.unavailable);

        let config = SyntheticConfig::parse("stub://cam?unavailable", 4, 4)?;
        assert!(config.unavailable);
        assert_eq!(config.target_fps, DEFAULT_STUB_FPS);

        let config = SyntheticConfig::parse("stub://cam?fps=0&fail_after=2", 4, 4)?;
        assert_eq!(config.target_fps, 0);
        assert_eq!(config.fail_after, Some(2));

        assert!(SyntheticConfig::parse("stub://cam?bogus", 4, 4).is_err());
        assert!(SyntheticConfig::parse("stub://cam?fail_after=x", 4, 4).is_err());
        assert!(SyntheticConfig::parse("stub://cam?fps=fast", 4, 4).is_err());
        Ok(())
    }

    #[test]
    fn unavailable_stub_refuses_to_open() {
        let config = SyntheticConfig::parse("stub://cam?unavailable", 4, 4).unwrap();
        assert!(matches!(
            SyntheticSource::open(config),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn frames_change_between_reads() -> anyhow::Result<()> {
        let mut source = SyntheticSource::open(SyntheticConfig::new("stub://cam", 16, 8))?;
        let first = source.read_frame()?;
        let second = source.read_frame()?;
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_ne!(first.pixels(), second.pixels());
        assert_eq!(source.stats().frames_read, 2);
        Ok(())
    }

    #[test]
    fn reads_fail_after_limit_and_after_release() -> anyhow::Result<()> {
        let config = SyntheticConfig::parse("stub://cam?fail_after=1", 4, 4)?;
        let mut source = SyntheticSource::open(config)?;
        assert!(source.read_frame().is_ok());
        assert!(matches!(source.read_frame(), Err(SourceError::Read(_))));

        source.release();
        source.release();
        assert!(matches!(source.read_frame(), Err(SourceError::Released)));
        Ok(())
    }

    #[test]
    fn reads_are_paced_to_target_fps() -> anyhow::Result<()> {
        let config = SyntheticConfig::parse("stub://cam?fps=50", 4, 4)?;
        let mut source = SyntheticSource::open(config)?;
        let frames = (0..4)
            .map(|_| source.read_frame())
            .collect::<Result<Vec<_>, _>>()?;
        for pair in frames.windows(2) {
            let gap = pair[1].captured_at - pair[0].captured_at;
            assert!(gap >= Duration::from_millis(19), "frames {:?} apart", gap);
        }
        Ok(())
    }

    #[test]
    fn zero_fps_is_unpaced() -> anyhow::Result<()> {
        let config = SyntheticConfig::parse("stub://cam?fps=0", 4, 4)?;
        let mut source = SyntheticSource::open(config)?;
        let start = Instant::now();
        for _ in 0..20 {
            source.read_frame()?;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
        Ok(())
    }
}
