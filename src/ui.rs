//! Operator-facing output: start banner, live status line, preview image and
//! session summary. A spinner is used on a TTY, plain stderr lines otherwise.

use image::{imageops, RgbImage};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::frame::{Frame, FramePair, Side};
use crate::persist::OutputLayout;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Text drawn over each camera's preview.
pub fn overlay_text(side: Side, count: u32) -> String {
    format!("{} - Images: {}", side.label(), count)
}

pub fn banner(output: &OutputLayout) -> String {
    format!(
        "=== Stereo Camera Image Collection ===\n\
         Controls:\n  \
         ENTER (or c) - Capture image pair\n  \
         q (or Ctrl-C) - Quit\n\
         {} -> {}\n\
         {} -> {}",
        Side::Left.label(),
        output.left.display(),
        Side::Right.label(),
        output.right.display()
    )
}

pub fn summary(count: u32) -> String {
    format!(
        "=== Session Complete ===\nTotal image pairs captured: {}",
        count
    )
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    /// `disable_pretty` turns the spinner off in auto mode (e.g. when stdout
    /// is redirected); `pretty` overrides it.
    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    /// Live status line showing both overlays.
    pub fn status(&self) -> StatusLine {
        if self.use_pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            StatusLine {
                spinner: Some(spinner),
                last: String::new(),
            }
        } else {
            StatusLine {
                spinner: None,
                last: String::new(),
            }
        }
    }
}

pub struct StatusLine {
    spinner: Option<ProgressBar>,
    last: String,
}

impl StatusLine {
    /// Refresh the status for `count` captured pairs after `cycles` polls.
    pub fn update(&mut self, count: u32, cycles: u64) {
        let text = format!(
            "{} | {}",
            overlay_text(Side::Left, count),
            overlay_text(Side::Right, count)
        );
        match &self.spinner {
            Some(spinner) => spinner.set_message(format!("{text} (cycle {cycles})")),
            None if text != self.last => eprintln!("==> {}", text),
            None => {}
        }
        self.last = text;
    }

    /// Print a line without tearing the spinner.
    pub fn println(&self, line: &str) {
        match &self.spinner {
            Some(spinner) => spinner.println(line),
            None => eprintln!("{line}"),
        }
    }

    pub fn finish(self) {
        if let Some(spinner) = self.spinner {
            spinner.finish_and_clear();
        }
    }
}

// ----------------------------------------------------------------------------
// Preview
// ----------------------------------------------------------------------------

/// Left and right frames side by side in one image.
pub fn side_by_side(pair: &FramePair) -> Option<RgbImage> {
    let left = to_image(&pair.left)?;
    let right = to_image(&pair.right)?;
    let mut combined = RgbImage::new(
        left.width() + right.width(),
        left.height().max(right.height()),
    );
    imageops::replace(&mut combined, &left, 0, 0);
    imageops::replace(&mut combined, &right, i64::from(left.width()), 0);
    Some(combined)
}

fn to_image(frame: &Frame) -> Option<RgbImage> {
    RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
}

/// Write the combined preview of `pair` to `path` as JPEG.
pub fn write_preview(pair: &FramePair, path: &Path) -> anyhow::Result<()> {
    let combined =
        side_by_side(pair).ok_or_else(|| anyhow::anyhow!("frame buffer does not match its size"))?;
    let tmp_path = path.with_extension("partial");
    combined.save_with_format(&tmp_path, image::ImageFormat::Jpeg)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
