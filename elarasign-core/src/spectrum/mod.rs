// DCT spread-spectrum codec: additive watermark over mid-frequency
// red/green coefficients, keyed off meta_hash, detected by normalized
// correlation. This is the layer that survives JPEG recompression and
// screenshots (`spec.md` §4.6). Blue is excluded from the per-block signal
// (see `load_signal_block`) since it is the channel `embed` writes its
// output into; signing the same image twice must stay byte-identical
// (`spec.md` §8 invariant #2), which requires the embed's input to be
// independent of its own prior output.

mod dct;
mod pn;

use crate::canvas::Canvas;
use crate::error::Result;

pub use dct::{BLOCK_LEN, BLOCK_SIDE, MID_FREQUENCY_POSITIONS};

/// Embedding strength. Fixed protocol constant; changing it is wire-breaking.
pub const ALPHA: f32 = 0.1;
/// Floor added to every mid-frequency coefficient so zero-valued
/// coefficients still receive signal. Fixed protocol constant.
pub const BETA: f32 = 0.5;
/// Correlation above this reports the watermark present.
pub const DETECTION_THRESHOLD: f32 = 0.35;
/// Images with fewer complete 8x8 blocks than this skip the layer entirely.
pub const MIN_BLOCKS: usize = 64;
/// Below this per-block coefficient energy, the image's luminance plane is
/// considered near-flat; detection still runs but is flagged `low_energy`.
pub const LOW_ENERGY_THRESHOLD: f32 = 1.0;

const POSITIONS_PER_BLOCK: usize = MID_FREQUENCY_POSITIONS.len();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectrumEmbedResult {
    pub blocks_embedded: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumDetectResult {
    pub present: bool,
    pub confidence: f32,
    pub correlation: f32,
    pub low_energy: bool,
}

/// Row-major origins of every complete (non-partial) 8x8 block in an image
/// of the given dimensions.
fn complete_block_origins(width: u32, height: u32) -> Vec<(u32, u32)> {
    let side = BLOCK_SIDE as u32;
    let blocks_x = width / side;
    let blocks_y = height / side;
    let mut origins = Vec::with_capacity((blocks_x * blocks_y) as usize);
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            origins.push((bx * side, by * side));
        }
    }
    origins
}

/// Red/green weight of `Canvas::luminance`'s `Y = 0.299R + 0.587G + 0.114B`,
/// renormalized to sum to 1 with blue dropped entirely.
const LUMA_R_WEIGHT: f32 = 0.299 / (0.299 + 0.587);
const LUMA_G_WEIGHT: f32 = 0.587 / (0.299 + 0.587);

/// Per-block signal fed to the DCT: red/green only, deliberately excluding
/// blue, which is the channel `embed` writes its output into. Reading the
/// full RGB luminance here would feed `embed`'s own prior output back into
/// itself on a second signing pass (since blue carries the previous round's
/// watermark), making the embed non-idempotent. Red and green are never
/// touched by this layer or by `lsb`, so this block is identical on every
/// call for a given image, regardless of how many times it was signed
/// before.
fn load_signal_block(canvas: &Canvas, origin: (u32, u32)) -> [f32; BLOCK_LEN] {
    let mut block = [0f32; BLOCK_LEN];
    for row in 0..BLOCK_SIDE as u32 {
        for col in 0..BLOCK_SIDE as u32 {
            let idx = (row * BLOCK_SIDE as u32 + col) as usize;
            let [r, g, _b, _a] = canvas.pixel(origin.0 + col, origin.1 + row);
            block[idx] = LUMA_R_WEIGHT * r as f32 + LUMA_G_WEIGHT * g as f32;
        }
    }
    block
}

/// Additively embed the spread-spectrum watermark, keyed off `meta_hash`,
/// into every complete 8x8 luminance block. Images with fewer than
/// `MIN_BLOCKS` complete blocks are left untouched (`blocks_embedded == 0`).
pub fn embed(canvas: &mut Canvas, meta_hash: &[u8; 32]) -> Result<SpectrumEmbedResult> {
    let origins = complete_block_origins(canvas.width(), canvas.height());
    if origins.len() < MIN_BLOCKS {
        return Ok(SpectrumEmbedResult { blocks_embedded: 0 });
    }

    let pn_sequence = pn::generate(meta_hash, origins.len() * POSITIONS_PER_BLOCK);

    for (block_index, &origin) in origins.iter().enumerate() {
        let mut block = load_signal_block(canvas, origin);
        dct::forward_dct_8x8(&mut block);

        for (j, &pos) in MID_FREQUENCY_POSITIONS.iter().enumerate() {
            let pn_value = pn_sequence[block_index * POSITIONS_PER_BLOCK + j];
            let c = block[pos];
            block[pos] = c + ALPHA * pn_value * c.abs() + BETA;
        }

        dct::inverse_dct_8x8(&mut block);

        for row in 0..BLOCK_SIDE as u32 {
            for col in 0..BLOCK_SIDE as u32 {
                let idx = (row * BLOCK_SIDE as u32 + col) as usize;
                let clamped = block[idx].round().clamp(0.0, 255.0) as u8;
                canvas.set_blue_high_bits(origin.0 + col, origin.1 + row, clamped & !1);
            }
        }
    }

    Ok(SpectrumEmbedResult {
        blocks_embedded: origins.len(),
    })
}

/// Detect the spread-spectrum watermark keyed off `meta_hash`. Returns
/// `None` when the image has fewer than `MIN_BLOCKS` complete blocks (the
/// layer is skipped entirely, not reported absent).
pub fn detect(canvas: &Canvas, meta_hash: &[u8; 32]) -> Option<SpectrumDetectResult> {
    let origins = complete_block_origins(canvas.width(), canvas.height());
    if origins.len() < MIN_BLOCKS {
        return None;
    }

    let pn_sequence = pn::generate(meta_hash, origins.len() * POSITIONS_PER_BLOCK);

    let mut coefficients = Vec::with_capacity(origins.len() * POSITIONS_PER_BLOCK);
    for &origin in &origins {
        let mut block = load_signal_block(canvas, origin);
        dct::forward_dct_8x8(&mut block);
        for &pos in &MID_FREQUENCY_POSITIONS {
            coefficients.push(block[pos]);
        }
    }

    // Deterministic, canonically-ordered reduction: a single accumulator
    // walking `coefficients`/`pn_sequence` in block-then-position order, so
    // the correlation is bit-identical regardless of how many threads a
    // caller's own parallelization might use around this call.
    let mut dot = 0.0f64;
    let mut energy_c = 0.0f64;
    let mut energy_pn = 0.0f64;
    for (c, p) in coefficients.iter().zip(pn_sequence.iter()) {
        let (c, p) = (*c as f64, *p as f64);
        dot += c * p;
        energy_c += c * c;
        energy_pn += p * p;
    }

    let denom = (energy_c * energy_pn).sqrt();
    let correlation = if denom > 0.0 { (dot / denom) as f32 } else { 0.0 };
    let confidence = correlation.clamp(0.0, 1.0);
    let present = correlation > DETECTION_THRESHOLD;
    let low_energy = (energy_c as f32) < LOW_ENERGY_THRESHOLD * origins.len() as f32;

    Some(SpectrumDetectResult {
        present,
        confidence,
        correlation,
        low_energy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BYTES_PER_PIXEL;

    fn natural_image(width: u32, height: u32, seed: u32) -> Vec<u8> {
        // A synthetic "natural" image: smoothly varying gradients plus a
        // little high-frequency texture, enough to exercise real DCT energy.
        let mut buf = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
        for y in 0..height {
            for x in 0..width {
                let off = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
                let r = ((x * 3 + y * 5 + seed) % 256) as u8;
                let g = ((x * 7 + y * 2 + seed) % 256) as u8;
                let b = ((x * 2 + y * 11 + seed) % 256) as u8;
                buf[off] = r;
                buf[off + 1] = g;
                buf[off + 2] = b;
                buf[off + 3] = 255;
            }
        }
        buf
    }

    #[test]
    fn small_image_skips_layer() {
        let mut buf = natural_image(128, 128, 1);
        // 128x128 has plenty of blocks; shrink the declared dims to force a skip.
        let canvas = Canvas::new_unchecked(&mut buf, 16, 16).unwrap();
        assert!(detect(&canvas, &[0x11; 32]).is_none());
    }

    #[test]
    fn embed_then_detect_reports_present() {
        let mut buf = natural_image(512, 512, 7);
        let meta_hash = [0x22u8; 32];
        {
            let mut canvas = Canvas::new(&mut buf, 512, 512).unwrap();
            let result = embed(&mut canvas, &meta_hash).unwrap();
            assert!(result.blocks_embedded >= MIN_BLOCKS);
        }
        let canvas = Canvas::new(&mut buf, 512, 512).unwrap();
        let detection = detect(&canvas, &meta_hash).unwrap();
        assert!(detection.present);
        assert!(detection.confidence >= DETECTION_THRESHOLD);
    }

    #[test]
    fn detect_without_embedding_is_independent() {
        let mut buf = natural_image(512, 512, 99);
        let canvas = Canvas::new(&mut buf, 512, 512).unwrap();
        let detection = detect(&canvas, &[0x33u8; 32]).unwrap();
        assert!(!detection.present);
    }

    #[test]
    fn wrong_meta_hash_does_not_detect() {
        let mut buf = natural_image(512, 512, 13);
        let embed_hash = [0x44u8; 32];
        {
            let mut canvas = Canvas::new(&mut buf, 512, 512).unwrap();
            embed(&mut canvas, &embed_hash).unwrap();
        }
        let canvas = Canvas::new(&mut buf, 512, 512).unwrap();
        let wrong_hash = [0x55u8; 32];
        let detection = detect(&canvas, &wrong_hash).unwrap();
        assert!(!detection.present);
    }

    #[test]
    fn embed_is_idempotent_under_repeated_signing() {
        let mut buf = natural_image(256, 256, 42);
        let meta_hash = [0x66u8; 32];

        {
            let mut canvas = Canvas::new(&mut buf, 256, 256).unwrap();
            embed(&mut canvas, &meta_hash).unwrap();
        }
        let first = buf.clone();

        {
            let mut canvas = Canvas::new(&mut buf, 256, 256).unwrap();
            embed(&mut canvas, &meta_hash).unwrap();
        }

        assert_eq!(first, buf);
    }
}
