//! Pair labeling and persistence.
//!
//! Files are named `img_{index:03}_{YYYYMMDD_HHMMSS}.jpg` inside one directory
//! per side. Indices of 1000 and above are written with all their digits.
//! Both names share the pair's single wall-clock timestamp.

use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::CaptureError;
use crate::frame::{Frame, FramePair, PersistedPair, Side};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// File name for one half of pair `index`.
pub fn file_name(index: u32, timestamp: &DateTime<Local>) -> String {
    format!("img_{:03}_{}.jpg", index, timestamp.format(TIMESTAMP_FORMAT))
}

/// Where each side's images go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub left: PathBuf,
    pub right: PathBuf,
}

impl OutputLayout {
    /// `camera0/` and `camera1/` under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            left: root.join(Side::Left.default_dir()),
            right: root.join(Side::Right.default_dir()),
        }
    }

    pub fn dir(&self, side: Side) -> &Path {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Create both directories if they do not exist yet.
    pub fn prepare(&self) -> Result<(), CaptureError> {
        for side in [Side::Left, Side::Right] {
            let dir = self.dir(side);
            if dir.is_dir() {
                continue;
            }
            fs::create_dir_all(dir).map_err(|source| CaptureError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })?;
            log::info!("created output directory {}", dir.display());
        }
        Ok(())
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::under(".")
    }
}

/// Writes frame pairs as JPEG files.
#[derive(Clone, Debug)]
pub struct Persister {
    layout: OutputLayout,
}

impl Persister {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Paths pair `index` would be written to.
    pub fn paths_for(&self, index: u32, timestamp: &DateTime<Local>) -> (PathBuf, PathBuf) {
        let name = file_name(index, timestamp);
        (self.layout.left.join(&name), self.layout.right.join(name))
    }

    /// Write both images of `pair` under `index`.
    ///
    /// Left is written first. If the right image cannot be written the left
    /// file is removed again, so a successful return is the only way both
    /// files end up on disk.
    pub fn persist(&self, pair: &FramePair, index: u32) -> Result<PersistedPair, CaptureError> {
        let (left_path, right_path) = self.paths_for(index, &pair.captured_at);

        let left_jpeg = encode_side(Side::Left, &pair.left, &left_path)?;
        let right_jpeg = encode_side(Side::Right, &pair.right, &right_path)?;

        write_new(&left_path, &left_jpeg).map_err(|source| CaptureError::Write {
            side: Side::Left,
            path: left_path.clone(),
            source,
        })?;
        if let Err(source) = write_new(&right_path, &right_jpeg) {
            if let Err(e) = fs::remove_file(&left_path) {
                log::warn!(
                    "could not remove orphaned {}: {}",
                    left_path.display(),
                    e
                );
            }
            return Err(CaptureError::Write {
                side: Side::Right,
                path: right_path,
                source,
            });
        }

        Ok(PersistedPair {
            index,
            left: left_path,
            right: right_path,
        })
    }
}

/// Encode an RGB8 frame as JPEG at the encoder's default quality.
pub fn encode_jpeg(frame: &Frame) -> image::ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new(&mut out).encode(
        frame.pixels(),
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

fn encode_side(side: Side, frame: &Frame, path: &Path) -> Result<Vec<u8>, CaptureError> {
    encode_jpeg(frame).map_err(|e| CaptureError::Write {
        side,
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })
}

/// Write `data` to a temporary sibling, then link it into place.
///
/// Fails with `AlreadyExists` if `path` exists; an existing image is never
/// replaced.
fn write_new(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp_path = path.with_extension("jpg.partial");
    let result = (|| {
        let mut file: File = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::hard_link(&tmp_path, path)
    })();
    if let Err(e) = fs::remove_file(&tmp_path) {
        if result.is_ok() {
            log::warn!("could not remove {}: {}", tmp_path.display(), e);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_timestamp() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 5, 14, 7, 9)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn file_name_pads_index_to_three_digits() {
        let ts = fixed_timestamp();
        assert_eq!(file_name(7, &ts), "img_007_20240305_140709.jpg");
        assert_eq!(file_name(0, &ts), "img_000_20240305_140709.jpg");
    }

    #[test]
    fn file_name_keeps_all_digits_past_999() {
        let ts = fixed_timestamp();
        assert_eq!(file_name(1234, &ts), "img_1234_20240305_140709.jpg");
    }

    #[test]
    fn both_sides_share_one_name() {
        let persister = Persister::new(OutputLayout::under("/data"));
        let (left, right) = persister.paths_for(3, &fixed_timestamp());
        assert_eq!(left, PathBuf::from("/data/camera0/img_003_20240305_140709.jpg"));
        assert_eq!(right, PathBuf::from("/data/camera1/img_003_20240305_140709.jpg"));
    }

    #[test]
    fn encode_produces_jpeg_magic() -> anyhow::Result<()> {
        let frame = Frame::new(vec![200u8; 8 * 8 * 3], 8, 8, 1)?;
        let jpeg = encode_jpeg(&frame)?;
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        Ok(())
    }

    fn solid_pair(value: u8) -> FramePair {
        let frame = Frame::new(vec![value; 8 * 8 * 3], 8, 8, 1).unwrap();
        FramePair {
            left: frame.clone(),
            right: frame,
            cycle: 1,
            captured_at: fixed_timestamp(),
        }
    }

    #[test]
    fn write_new_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img_000.jpg");
        fs::write(&path, b"earlier capture").unwrap();

        let err = write_new(&path, b"new bytes").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), b"earlier capture");
        assert!(!path.with_extension("jpg.partial").exists());
    }

    #[test]
    fn write_new_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img_000.jpg");

        write_new(&path, b"jpeg bytes").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"jpeg bytes");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn existing_right_image_is_kept_and_left_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::under(dir.path());
        layout.prepare().unwrap();
        let persister = Persister::new(layout);
        let pair = solid_pair(90);
        let (left, right) = persister.paths_for(0, &pair.captured_at);
        fs::write(&right, b"earlier capture").unwrap();

        let err = persister.persist(&pair, 0).unwrap_err();
        assert_eq!(err.write_side(), Some(Side::Right));
        assert!(!left.exists());
        assert_eq!(fs::read(&right).unwrap(), b"earlier capture");
    }
}
