//! Stereo capture
//!
//! Captures synchronized image pairs from two cameras for later stereo
//! calibration.
//!
//! # Architecture
//!
//! ```text
//! FrameSource x2 -> CaptureSession -> preview/status (ui)
//!                                  -> Persister (on capture)
//! ```
//!
//! - `ingest`: frame sources (V4L2 devices, synthetic `stub://` sources)
//! - `session`: pair controller and session state machine
//! - `persist`: file naming and JPEG persistence
//! - `controls`: capture/quit events from the operator
//! - `ui`: banner, status line, preview and summary
//! - `config`: file + environment configuration
//!
//! The loop is single threaded. Both sources are read sequentially in every
//! cycle, so the right frame trails the left by the duration of one read.

pub mod config;
pub mod controls;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod persist;
pub mod session;
pub mod ui;

pub use config::CaptureConfig;
pub use controls::{parse_command, ControlEvent, Controls};
pub use error::{CaptureError, SourceError};
pub use frame::{Frame, FramePair, PersistedPair, Side};
pub use ingest::{CameraOpener, CameraSource, FrameSource, SourceOpener, SourceStats};
pub use persist::{file_name, OutputLayout, Persister};
pub use session::{CaptureSession, SessionConfig, SessionState, StepOutcome};
