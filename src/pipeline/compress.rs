//! Size-adaptive compression: shrink an encoded half under the payload
//! ceiling.
//!
//! Inline image payloads are rejected above a hard byte limit, and a 600-DPI
//! half-page scan regularly lands over it. Two phases, cheapest first:
//!
//! * **Quality** — re-encode the same pixels at quality 90, 80, … 20.
//!   Costs nothing legibility-wise until the low 30s and usually suffices.
//! * **Resolution** — scale both dimensions by 0.9 per iteration at a fixed
//!   quality of 70, resampling from the original decode each time so repeated
//!   iterations don't compound resampling blur.
//!
//! Both phases are floor-bounded (quality 10, dimension `min_dimension`), so
//! the loop always terminates. The result is best-effort: bytes that still
//! exceed the ceiling after both floors are returned as-is rather than
//! rejected, leaving the backend to have the final word.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::{debug, warn};

/// Quality floor for phase 1. Stepping below this produces artefacts the
/// model reads as circle marks.
const MIN_QUALITY: u8 = 10;

/// Fixed re-encode quality during the resolution phase.
const RESIZE_QUALITY: u8 = 70;

/// Per-iteration scale factor for the resolution phase.
const SCALE_FACTOR: f32 = 0.9;

/// Shrink `data` until it fits `max_bytes`, best-effort.
///
/// Bytes already at or under the ceiling are returned untouched. Undecodable
/// input is returned untouched too (with a warning) — the guarantee is
/// "always returns some bytes", and the dispatcher will surface whatever the
/// backend thinks of them.
pub fn shrink_to_fit(data: Vec<u8>, max_bytes: usize, min_dimension: u32) -> Vec<u8> {
    if data.len() <= max_bytes {
        return data;
    }

    let original = match image::load_from_memory(&data) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            warn!("cannot decode {} bytes for compression: {}", data.len(), e);
            return data;
        }
    };

    // Phase 1: walk the quality ladder down. A re-encode can come out
    // larger than the input (the scan was saved at a lower quality than the
    // current rung), so only improvements are kept.
    let mut best = data;
    let mut quality = 90u8;
    while best.len() > max_bytes && quality > MIN_QUALITY {
        match encode_jpeg_quality(&original, quality) {
            Ok(candidate) => {
                debug!("quality {} → {} bytes", quality, candidate.len());
                if candidate.len() < best.len() {
                    best = candidate;
                }
            }
            Err(e) => {
                warn!("re-encode at quality {} failed: {}", quality, e);
                break;
            }
        }
        quality -= 10;
    }

    if best.len() <= max_bytes {
        return best;
    }

    // Phase 2: shrink dimensions, always resampling from the original.
    let (mut width, mut height) = original.dimensions();
    while best.len() > max_bytes && width > min_dimension && height > min_dimension {
        width = (width as f32 * SCALE_FACTOR) as u32;
        height = (height as f32 * SCALE_FACTOR) as u32;
        let resized = imageops::resize(&original, width, height, FilterType::Triangle);
        match encode_jpeg_quality(&resized, RESIZE_QUALITY) {
            Ok(candidate) => {
                debug!("resize {}x{} → {} bytes", width, height, candidate.len());
                if candidate.len() < best.len() {
                    best = candidate;
                }
            }
            Err(e) => {
                warn!("re-encode at {}x{} failed: {}", width, height, e);
                break;
            }
        }
    }

    if best.len() > max_bytes {
        warn!(
            "floors reached at {} bytes (ceiling {}); sending oversized payload",
            best.len(),
            max_bytes
        );
    }
    best
}

fn encode_jpeg_quality(img: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(img)?;
    Ok(buf)
}
