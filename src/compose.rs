//! Frame compositing: put a screenshot behind a device frame and encode PNG.
//!
//! The blending itself is a pure function over pixel buffers; only
//! `FrameCompositor` touches the filesystem.

use crate::{Error, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::debug;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Load a frame, underlay a screenshot, encode the result.
pub trait ImageCompositor: Send + Sync {
    /// `frame_path` is relative to the compositor's asset root.
    fn composite(&self, frame_path: &Path, screenshot: &[u8]) -> Result<Vec<u8>>;
}

/// Compositor backed by the `image` crate, reading frames from disk.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    asset_root: PathBuf,
}

impl FrameCompositor {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    fn load_frame(&self, frame_path: &Path) -> Result<RgbaImage> {
        let path = self.asset_root.join(frame_path);
        let asset_error = |reason: String| Error::AssetError {
            path: path.display().to_string(),
            reason,
        };

        let bytes = std::fs::read(&path).map_err(|e| asset_error(e.to_string()))?;
        let frame = image::load_from_memory(&bytes).map_err(|e| asset_error(e.to_string()))?;
        Ok(frame.to_rgba8())
    }
}

impl ImageCompositor for FrameCompositor {
    fn composite(&self, frame_path: &Path, screenshot: &[u8]) -> Result<Vec<u8>> {
        let frame = self.load_frame(frame_path)?;
        let shot = image::load_from_memory(screenshot)
            .map_err(|e| Error::ImageError(format!("Failed to decode screenshot: {}", e)))?
            .to_rgba8();

        debug!(
            "compositing {}x{} screenshot into {}x{} frame {}",
            shot.width(),
            shot.height(),
            frame.width(),
            frame.height(),
            frame_path.display()
        );

        encode_png(underlay(&frame, &shot))
    }
}

/// Place `shot` centred behind `frame` using a destination-over blend.
///
/// The output has the frame's dimensions; parts of the screenshot that fall
/// outside the frame are clipped.
pub fn underlay(frame: &RgbaImage, shot: &RgbaImage) -> RgbaImage {
    let mut out = frame.clone();
    let left = (i64::from(frame.width()) - i64::from(shot.width())) / 2;
    let top = (i64::from(frame.height()) - i64::from(shot.height())) / 2;

    for (sx, sy, src) in shot.enumerate_pixels() {
        let x = left + i64::from(sx);
        let y = top + i64::from(sy);
        if x < 0 || y < 0 || x >= i64::from(frame.width()) || y >= i64::from(frame.height()) {
            continue;
        }
        let dst = out.get_pixel_mut(x as u32, y as u32);
        *dst = image::Rgba(dest_over(dst.0, src.0));
    }

    out
}

/// Destination-over for straight-alpha RGBA: `dst` stays on top of `src`.
fn dest_over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let da = u32::from(dst[3]);
    let sa = u32::from(src[3]);
    if da == 255 || sa == 0 {
        return dst;
    }

    // alpha scaled by 255
    let out_a = da * 255 + sa * (255 - da);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut px = [0u8; 4];
    for c in 0..3 {
        let num = u32::from(dst[c]) * da * 255 + u32::from(src[c]) * sa * (255 - da);
        px[c] = ((num + out_a / 2) / out_a) as u8;
    }
    px[3] = ((out_a + 127) / 255) as u8;
    px
}

fn encode_png(img: RgbaImage) -> Result<Vec<u8>> {
    let mut png_bytes: Vec<u8> = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| Error::ImageError(format!("PNG encoding failed: {}", e)))?;
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);
    const BEZEL: Rgba<u8> = Rgba([20, 20, 20, 255]);
    const PAGE: Rgba<u8> = Rgba([250, 10, 10, 255]);

    /// Opaque frame with a transparent hole of `hole` size in the middle.
    fn frame_with_hole(w: u32, h: u32, hole: (u32, u32)) -> RgbaImage {
        let (hx, hy) = ((w - hole.0) / 2, (h - hole.1) / 2);
        RgbaImage::from_fn(w, h, |x, y| {
            if x >= hx && x < hx + hole.0 && y >= hy && y < hy + hole.1 {
                CLEAR
            } else {
                BEZEL
            }
        })
    }

    #[test]
    fn screenshot_shows_through_cutout_only() {
        let frame = frame_with_hole(10, 10, (4, 4));
        let shot = RgbaImage::from_pixel(6, 6, PAGE);
        let out = underlay(&frame, &shot);

        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(*out.get_pixel(5, 5), PAGE);
        assert_eq!(*out.get_pixel(3, 3), PAGE);
        // bezel covers the screenshot margin
        assert_eq!(*out.get_pixel(2, 2), BEZEL);
        assert_eq!(*out.get_pixel(0, 0), BEZEL);
    }

    #[test]
    fn oversized_screenshot_is_clipped() {
        let frame = RgbaImage::from_pixel(4, 4, CLEAR);
        let shot = RgbaImage::from_pixel(8, 8, PAGE);
        let out = underlay(&frame, &shot);
        assert_eq!(out.dimensions(), (4, 4));
        assert!(out.pixels().all(|p| *p == PAGE));
    }

    #[test]
    fn translucent_frame_blends_over_screenshot() {
        let px = dest_over([255, 255, 255, 128], [0, 0, 0, 255]);
        assert_eq!(px[3], 255);
        assert!(px[0] > 120 && px[0] < 135, "got {:?}", px);
    }

    #[test]
    fn transparent_over_transparent_stays_clear() {
        assert_eq!(dest_over([9, 9, 9, 0], [7, 7, 7, 0]), [9, 9, 9, 0]);
    }

    #[test]
    fn compositor_reads_frame_from_asset_root() {
        let dir = tempfile::tempdir().unwrap();
        frame_with_hole(12, 8, (6, 4))
            .save(dir.path().join("frame.png"))
            .unwrap();
        let shot = encode_png(RgbaImage::from_pixel(6, 4, PAGE)).unwrap();

        let compositor = FrameCompositor::new(dir.path());
        let png = compositor.composite(Path::new("frame.png"), &shot).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (12, 8));
        assert_eq!(*decoded.get_pixel(6, 4), PAGE);
    }

    #[test]
    fn missing_frame_is_an_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let compositor = FrameCompositor::new(dir.path());
        let err = compositor
            .composite(Path::new("nope.png"), &[])
            .unwrap_err();
        assert!(matches!(err, Error::AssetError { .. }));
    }

    #[test]
    fn garbage_screenshot_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(2, 2, BEZEL)
            .save(dir.path().join("f.png"))
            .unwrap();
        let compositor = FrameCompositor::new(dir.path());
        let err = compositor
            .composite(Path::new("f.png"), b"not a png")
            .unwrap_err();
        assert!(matches!(err, Error::ImageError(_)));
    }
}
