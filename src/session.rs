//! Capture session: pair controller and session state machine.
//!
//! ```text
//! Uninitialized -> Ready -> (Previewing <-> Capturing) -> Closed
//! ```
//!
//! The session exclusively owns both sources. `pair_count` advances once per
//! persisted pair and doubles as the index of the next pair, so indices are
//! strictly increasing by one and never reused within a session.

use chrono::Local;

use crate::controls::ControlEvent;
use crate::error::CaptureError;
use crate::frame::{FramePair, PersistedPair, Side};
use crate::ingest::{FrameSource, SourceOpener, SourceStats};
use crate::persist::{OutputLayout, Persister};

/// What a session needs to open its sources.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub left: String,
    pub right: String,
    pub width: u32,
    pub height: u32,
    pub output: OutputLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Sources not yet opened. `open` either returns a `Ready` session or
    /// fails, so a constructed session never reports this.
    Uninitialized,
    Ready,
    Previewing,
    Capturing,
    Closed,
}

/// Result of one loop iteration.
#[derive(Debug)]
pub enum StepOutcome {
    /// Frames were read and nothing else happened.
    Previewed(FramePair),
    /// The pair was written.
    Captured {
        pair: FramePair,
        persisted: PersistedPair,
    },
    /// The pair could not be written; the count did not move.
    CaptureFailed {
        pair: FramePair,
        error: CaptureError,
    },
    /// The operator quit; the session is closed.
    Quit,
}

pub struct CaptureSession<S: FrameSource> {
    left: S,
    right: S,
    persister: Persister,
    pair_count: u32,
    cycles: u64,
    state: SessionState,
}

impl<S: FrameSource> CaptureSession<S> {
    /// Prepare the output directories and open both sources, left first.
    ///
    /// If the right source cannot be opened the left one is released before
    /// the error is returned.
    pub fn open<O>(opener: &mut O, config: &SessionConfig) -> Result<Self, CaptureError>
    where
        O: SourceOpener<Source = S>,
    {
        if config.width == 0 || config.height == 0 {
            return Err(CaptureError::Config(format!(
                "frame size must be non-zero, got {}x{}",
                config.width, config.height
            )));
        }
        config.output.prepare()?;

        let mut left = opener
            .open(&config.left, config.width, config.height)
            .map_err(|e| CaptureError::from_source(Side::Left, e))?;
        let right = match opener.open(&config.right, config.width, config.height) {
            Ok(right) => right,
            Err(e) => {
                left.release();
                return Err(CaptureError::from_source(Side::Right, e));
            }
        };

        log::info!(
            "capture session ready: left={} right={} ({}x{})",
            left.identifier(),
            right.identifier(),
            config.width,
            config.height
        );
        Ok(Self {
            left,
            right,
            persister: Persister::new(config.output.clone()),
            pair_count: 0,
            cycles: 0,
            state: SessionState::Ready,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of pairs persisted so far.
    pub fn pair_count(&self) -> u32 {
        self.pair_count
    }

    /// Number of capture cycles polled so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn output(&self) -> &OutputLayout {
        self.persister.layout()
    }

    pub fn stats(&self) -> (SourceStats, SourceStats) {
        (self.left.stats(), self.right.stats())
    }

    /// Read one frame from each source, left then right. No retry.
    pub fn poll_pair(&mut self) -> Result<FramePair, CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::SessionClosed);
        }
        let left = self
            .left
            .read_frame()
            .map_err(|e| CaptureError::from_source(Side::Left, e))?;
        let right = self
            .right
            .read_frame()
            .map_err(|e| CaptureError::from_source(Side::Right, e))?;

        self.cycles += 1;
        if self.state == SessionState::Ready {
            self.state = SessionState::Previewing;
        }
        Ok(FramePair {
            left,
            right,
            cycle: self.cycles,
            captured_at: Local::now(),
        })
    }

    /// Persist `pair` as the next index. The count only moves on success.
    pub fn capture(&mut self, pair: &FramePair) -> Result<PersistedPair, CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::SessionClosed);
        }
        let resume = if self.state == SessionState::Ready {
            SessionState::Previewing
        } else {
            self.state
        };
        self.state = SessionState::Capturing;
        let result = self.persister.persist(pair, self.pair_count);
        self.state = resume;

        match result {
            Ok(persisted) => {
                self.pair_count += 1;
                log::info!(
                    "captured pair {}: {}, {}",
                    self.pair_count,
                    persisted.left.display(),
                    persisted.right.display()
                );
                Ok(persisted)
            }
            Err(e) => {
                log::warn!("capture of pair {} failed: {}", self.pair_count, e);
                Err(e)
            }
        }
    }

    /// One loop iteration: poll both sources, then react to `event`.
    ///
    /// A frame read failure closes the session and is returned. A write
    /// failure is reported in the outcome and the loop can continue.
    pub fn step(&mut self, event: ControlEvent) -> Result<StepOutcome, CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::SessionClosed);
        }
        if event == ControlEvent::Quit {
            self.close();
            return Ok(StepOutcome::Quit);
        }

        let pair = match self.poll_pair() {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("{}", e);
                self.close();
                return Err(e);
            }
        };

        if event != ControlEvent::Capture {
            return Ok(StepOutcome::Previewed(pair));
        }
        match self.capture(&pair) {
            Ok(persisted) => Ok(StepOutcome::Captured { pair, persisted }),
            Err(error) => Ok(StepOutcome::CaptureFailed { pair, error }),
        }
    }

    /// Release both sources. Safe to call more than once.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.left.release();
        self.right.release();
        self.state = SessionState::Closed;
        log::info!(
            "capture session closed after {} cycles, {} pairs captured",
            self.cycles,
            self.pair_count
        );
    }
}

impl<S: FrameSource> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}
