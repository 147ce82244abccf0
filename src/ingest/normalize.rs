use crate::error::SourceError;
use crate::frame::rgb_len;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Mjpeg,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"MJPG" => Some(PixelFormat::Mjpeg),
            _ => None,
        }
    }
}

/// Convert a driver buffer to packed RGB8, returning the pixels and the
/// dimensions they actually have.
pub(crate) fn normalize_to_rgb(
    buf: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<(Vec<u8>, u32, u32), SourceError> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = rgb_len(width, height)
                .ok_or_else(|| SourceError::Read("RGB frame dimensions overflow".to_string()))?;
            if buf.len() < expected {
                return Err(SourceError::Read(format!(
                    "short RGB frame: expected {}, got {}",
                    expected,
                    buf.len()
                )));
            }
            Ok((buf[..expected].to_vec(), width, height))
        }
        PixelFormat::Yuyv => yuyv_to_rgb(buf, width, height).map(|rgb| (rgb, width, height)),
        PixelFormat::Mjpeg => decode_mjpeg(buf),
    }
}

fn yuyv_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, SourceError> {
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| SourceError::Read("YUYV frame dimensions overflow".to_string()))?;
    let expected = pixels * 2;
    if width % 2 != 0 {
        return Err(SourceError::Read(format!(
            "YUYV frame width {} is odd",
            width
        )));
    }
    if buf.len() < expected {
        return Err(SourceError::Read(format!(
            "short YUYV frame: expected {}, got {}",
            expected,
            buf.len()
        )));
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in buf[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    Ok(rgb)
}

fn decode_mjpeg(buf: &[u8]) -> Result<(Vec<u8>, u32, u32), SourceError> {
    let image = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
        .map_err(|e| SourceError::Read(format!("decode mjpeg frame: {}", e)))?;
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    Ok((rgb.into_raw(), width, height))
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_neutral_chroma_produces_gray() -> Result<(), SourceError> {
        let yuyv = vec![128u8; 2 * 2 * 2];
        let (rgb, w, h) = normalize_to_rgb(&yuyv, 2, 2, PixelFormat::Yuyv)?;
        assert_eq!((w, h), (2, 2));
        assert_eq!(rgb, vec![128u8; 12]);
        Ok(())
    }

    #[test]
    fn rgb_short_buffer_is_a_read_error() {
        let pixels = vec![1u8; 8];
        assert!(normalize_to_rgb(&pixels, 1, 3, PixelFormat::Rgb24).is_err());
    }

    #[test]
    fn yuyv_odd_width_is_not_reported_as_short() {
        let yuyv = vec![128u8; 3 * 2 * 2];
        let err = normalize_to_rgb(&yuyv, 3, 2, PixelFormat::Yuyv).unwrap_err();
        assert!(matches!(&err, SourceError::Read(msg) if msg.contains("width 3 is odd")));

        let err = normalize_to_rgb(&yuyv[..4], 2, 2, PixelFormat::Yuyv).unwrap_err();
        assert!(matches!(&err, SourceError::Read(msg) if msg.starts_with("short YUYV frame")));
    }

    #[test]
    fn fourcc_mapping() {
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), Some(PixelFormat::Mjpeg));
        assert_eq!(PixelFormat::from_fourcc(b"NV12"), None);
    }
}
