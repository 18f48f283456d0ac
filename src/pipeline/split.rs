//! Image splitting: one two-column page scan → two half-page JPEG buffers.
//!
//! The questionnaires are printed two columns to a page and scanned as one
//! image. Sending the whole page makes the model interleave rows from both
//! columns, so each page is bisected at ⌊W/2⌋ and the halves are dispatched
//! as independent images. JPEG is the re-encode format: the input is already
//! a lossy scan, and payload size matters far more than preserving scanner
//! noise.

use crate::error::HalfError;
use image::imageops;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// The two encoded halves of one page, in reading order.
#[derive(Debug)]
pub struct SplitHalves {
    pub left: Vec<u8>,
    pub right: Vec<u8>,
}

/// Load a page scan and split it into left/right JPEG halves.
///
/// The image is forced to 3-channel RGB first so grayscale and paletted
/// scans encode uniformly. For a page of width W the left half gets columns
/// `[0, W/2)` and the right half `[W/2, W)` — an odd column count leaves the
/// extra column on the right.
///
/// Any load, decode, or encode failure comes back as
/// [`HalfError::LoadFailed`]; callers treat that as "skip this file".
pub fn split_page(path: &Path) -> Result<SplitHalves, HalfError> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let load_failed = |detail: String| HalfError::LoadFailed {
        file: file.clone(),
        detail,
    };

    let page = image::open(path)
        .map_err(|e| load_failed(e.to_string()))?
        .to_rgb8();

    let (width, height) = page.dimensions();
    if width < 2 {
        return Err(load_failed(format!("{width} px wide, cannot split")));
    }
    let split_col = width / 2;

    let left = imageops::crop_imm(&page, 0, 0, split_col, height).to_image();
    let right = imageops::crop_imm(&page, split_col, 0, width - split_col, height).to_image();

    debug!(
        "{}: {}x{} split at column {}",
        file, width, height, split_col
    );

    Ok(SplitHalves {
        left: encode_jpeg(&left).map_err(|e| load_failed(e.to_string()))?,
        right: encode_jpeg(&right).map_err(|e| load_failed(e.to_string()))?,
    })
}

/// Encode an RGB image as JPEG at the default quality.
fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn page(width: u32, height: u32) -> RgbImage {
        // Left side red, right side blue, so halves are tellable apart.
        RgbImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgb([200, 30, 30])
            } else {
                Rgb([30, 30, 200])
            }
        })
    }

    fn write_page(dir: &tempfile::TempDir, name: &str, img: &RgbImage) -> std::path::PathBuf {
        let path = dir.path().join(name);
        img.save(&path).expect("save test page");
        path
    }

    #[test]
    fn even_width_splits_in_half() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_page(&dir, "page.png", &page(100, 40));

        let halves = split_page(&path).expect("split must succeed");
        let left = image::load_from_memory(&halves.left).unwrap();
        let right = image::load_from_memory(&halves.right).unwrap();

        assert_eq!((left.width(), left.height()), (50, 40));
        assert_eq!((right.width(), right.height()), (50, 40));
    }

    #[test]
    fn odd_width_rounds_down_on_the_left() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_page(&dir, "page.jpeg", &page(101, 30));

        let halves = split_page(&path).expect("split must succeed");
        let left = image::load_from_memory(&halves.left).unwrap();
        let right = image::load_from_memory(&halves.right).unwrap();

        assert_eq!(left.width(), 50);
        assert_eq!(right.width(), 51);
        assert_eq!(left.height(), 30);
        assert_eq!(right.height(), 30);
    }

    #[test]
    fn halves_are_jpeg_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_page(&dir, "page.png", &page(60, 20));

        let halves = split_page(&path).unwrap();
        // JPEG SOI marker.
        assert_eq!(&halves.left[..2], &[0xFF, 0xD8]);
        assert_eq!(&halves.right[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let err = split_page(Path::new("/no/such/scan.jpeg")).unwrap_err();
        match err {
            HalfError::LoadFailed { file, .. } => assert_eq!(file, "scan.jpeg"),
            other => panic!("expected LoadFailed, got {other:?}"),
        }
    }

    #[test]
    fn garbage_bytes_are_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.jpeg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(matches!(
            split_page(&path),
            Err(HalfError::LoadFailed { .. })
        ));
    }
}
