// 8x8 type-II forward DCT / type-III inverse DCT, via `rustdct`.
//
// `rustdct`'s DCT-II and DCT-III are the unnormalized pair: running a
// DCT-II followed by a DCT-III over the same axis multiplies the original
// values by `2 * len`. We apply DCT-II row-then-column going forward, so
// inverting requires DCT-III column-then-row, each pass divided by `2 * 8`.

use std::sync::OnceLock;

use rustdct::{Dct2, Dct3, DctPlanner};

pub const BLOCK_SIDE: usize = 8;
pub const BLOCK_LEN: usize = BLOCK_SIDE * BLOCK_SIDE;

fn dct2_plan() -> &'static dyn Dct2<f32> {
    static PLAN: OnceLock<std::sync::Arc<dyn Dct2<f32>>> = OnceLock::new();
    PLAN.get_or_init(|| DctPlanner::new().plan_dct2(BLOCK_SIDE)).as_ref()
}

fn dct3_plan() -> &'static dyn Dct3<f32> {
    static PLAN: OnceLock<std::sync::Arc<dyn Dct3<f32>>> = OnceLock::new();
    PLAN.get_or_init(|| DctPlanner::new().plan_dct3(BLOCK_SIDE)).as_ref()
}

/// In-place forward 2D DCT-II over a row-major 8x8 block (`block[row*8+col]`).
pub fn forward_dct_8x8(block: &mut [f32; BLOCK_LEN]) {
    let dct2 = dct2_plan();

    for row in 0..BLOCK_SIDE {
        dct2.process_dct2(&mut block[row * BLOCK_SIDE..(row + 1) * BLOCK_SIDE]);
    }

    let mut column = [0f32; BLOCK_SIDE];
    for col in 0..BLOCK_SIDE {
        for row in 0..BLOCK_SIDE {
            column[row] = block[row * BLOCK_SIDE + col];
        }
        dct2.process_dct2(&mut column);
        for row in 0..BLOCK_SIDE {
            block[row * BLOCK_SIDE + col] = column[row];
        }
    }
}

/// In-place inverse 2D DCT (DCT-III pair), undoing [`forward_dct_8x8`].
pub fn inverse_dct_8x8(block: &mut [f32; BLOCK_LEN]) {
    let dct3 = dct3_plan();
    let scale = 1.0 / (2.0 * BLOCK_SIDE as f32);

    let mut column = [0f32; BLOCK_SIDE];
    for col in 0..BLOCK_SIDE {
        for row in 0..BLOCK_SIDE {
            column[row] = block[row * BLOCK_SIDE + col];
        }
        dct3.process_dct3(&mut column);
        for row in 0..BLOCK_SIDE {
            block[row * BLOCK_SIDE + col] = column[row] * scale;
        }
    }

    for row in 0..BLOCK_SIDE {
        let slice = &mut block[row * BLOCK_SIDE..(row + 1) * BLOCK_SIDE];
        dct3.process_dct3(slice);
        for v in slice.iter_mut() {
            *v *= scale;
        }
    }
}

/// Zig-zag scan order for an 8x8 block: `ZIGZAG[k]` is the row-major linear
/// index (`row * 8 + col`) of the coefficient at zig-zag position `k`.
pub const ZIGZAG: [usize; BLOCK_LEN] = [
    0, 1, 8, 16, 9, 2, 3, 10,
    17, 24, 32, 25, 18, 11, 4, 5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13, 6, 7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// The fixed mid-frequency coefficient positions used by the
/// spread-spectrum codec: zig-zag indices 4..=11, as row-major linear
/// indices into an 8x8 block. This set is a protocol constant; embed and
/// detect must use the identical set.
pub const MID_FREQUENCY_POSITIONS: [usize; 8] = [
    ZIGZAG[4],
    ZIGZAG[5],
    ZIGZAG[6],
    ZIGZAG[7],
    ZIGZAG[8],
    ZIGZAG[9],
    ZIGZAG[10],
    ZIGZAG[11],
];
