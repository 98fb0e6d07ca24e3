// LSB embedder: one bit per pixel into the blue channel's least significant
// bit, row-major within a region, MSB-first within each byte.
//
// The embedder never reads or depends on pixels outside the declared
// region; embedding the same bytes at the same region twice is idempotent.

use crate::canvas::{Canvas, Region};
use crate::error::{ElaraError, Result};

/// Embed `data` into `region`'s blue-channel LSBs, row-major, MSB-first
/// within each byte. Fails with `RegionTooSmall` if the region does not fit
/// the buffer or cannot hold `data.len() * 8` bits.
pub fn embed(canvas: &mut Canvas, region: &Region, data: &[u8]) -> Result<()> {
    let needed_bits = data.len() * 8;
    if needed_bits > region.slot_count() {
        return Err(ElaraError::RegionTooSmall(format!(
            "region holds {} bits, need {needed_bits}",
            region.slot_count()
        )));
    }
    if !region.fits_within(canvas.width(), canvas.height()) {
        return Err(ElaraError::RegionTooSmall(format!(
            "region {region:?} does not fit {}x{}",
            canvas.width(),
            canvas.height()
        )));
    }

    let mut slots = region.iter_slots();
    for &byte in data {
        for bit_index in (0..8).rev() {
            let bit = (byte >> bit_index) & 1;
            let (x, y) = slots
                .next()
                .expect("slot_count checked to cover data.len() * 8 bits above");
            canvas.set_blue_lsb(x, y, bit);
        }
    }
    Ok(())
}

/// Extract `len` bytes from `region`'s blue-channel LSBs, inverse of
/// [`embed`]. Always lossless: no escape codes, no framing beyond what the
/// caller supplies as `len`.
pub fn extract(canvas: &Canvas, region: &Region, len: usize) -> Result<Vec<u8>> {
    let needed_bits = len * 8;
    if needed_bits > region.slot_count() {
        return Err(ElaraError::RegionTooSmall(format!(
            "region holds {} bits, need {needed_bits}",
            region.slot_count()
        )));
    }
    if !region.fits_within(canvas.width(), canvas.height()) {
        return Err(ElaraError::RegionTooSmall(format!(
            "region {region:?} does not fit {}x{}",
            canvas.width(),
            canvas.height()
        )));
    }

    let mut out = Vec::with_capacity(len);
    let mut slots = region.iter_slots();
    for _ in 0..len {
        let mut byte = 0u8;
        for _ in 0..8 {
            let (x, y) = slots
                .next()
                .expect("slot_count checked to cover len * 8 bits above");
            byte = (byte << 1) | canvas.blue_lsb(x, y);
        }
        out.push(byte);
    }
    Ok(out)
}
