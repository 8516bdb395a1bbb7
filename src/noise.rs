//! Noise and smoothing
//!
//! Index jitter emulates the particles of the gas: every shockwave sample is
//! taken one pixel off in a random direction. The 3x3 gaussian softens the
//! accumulated shockwave where it is re-painted. Value noise / fBm textures
//! the procedural explosion sprite.

use crate::color;
use crate::display::PixelBuffer;
use crate::util::Rng;

/// 3x3 gaussian kernel, indexed `[dx][dy]`
const GAUSS_3X3: [[f64; 3]; 3] = [
    [1.0 / 16.0, 1.0 / 8.0, 1.0 / 16.0],
    [1.0 / 8.0, 1.0 / 4.0, 1.0 / 8.0],
    [1.0 / 16.0, 1.0 / 8.0, 1.0 / 16.0],
];

/// Offset `index` by -1, 0 or +1. If the result leaves `[min, max]` the
/// original index is returned (rejected, not clamped).
///
/// Draws exactly one value from `rng` per call, whatever the outcome.
#[inline]
pub fn jitter_index(rng: &mut Rng, index: i32, min: i32, max: i32) -> i32 {
    let noisy = index + rng.range_i32(-1, 1);
    if noisy < min || noisy > max {
        index
    } else {
        noisy
    }
}

/// 3x3 gaussian read centered at (x, y).
///
/// Taps with a coordinate `<= 0` or `>=` the buffer size contribute nothing
/// and the kernel is not renormalized, so row 0 and column 0 never feed the
/// blur. Channels are truncated from the unnormalized sums.
pub fn gaussian_blur_3x3(x: i32, y: i32, buffer: &PixelBuffer) -> u32 {
    let (mut a, mut r, mut g, mut b) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let w = buffer.width() as i32;
    let h = buffer.height() as i32;

    for (dx, column) in GAUSS_3X3.iter().enumerate() {
        for (dy, &k) in column.iter().enumerate() {
            let xx = x - 1 + dx as i32;
            let yy = y - 1 + dy as i32;

            if 0 < xx && xx < w && 0 < yy && yy < h {
                let (pa, pr, pg, pb) = color::channels(buffer.get_or_transparent(xx, yy));
                a += k * pa as f64;
                r += k * pr as f64;
                g += k * pg as f64;
                b += k * pb as f64;
            }
        }
    }

    color::pack(a as i32, r as i32, g as i32, b as i32)
}

/// Hash-based pseudo-random value for integer grid coordinates.
/// Returns a value in [0.0, 1.0].
#[inline]
pub fn noise_hash_2d(x: i32, y: i32, seed: u32) -> f32 {
    let mut h = seed.wrapping_add(x as u32).wrapping_mul(374761393);
    h = h.wrapping_add(y as u32).wrapping_mul(668265263);
    h = (h ^ (h >> 13)).wrapping_mul(1274126177);
    h = h ^ (h >> 16);
    (h & 0x7fff) as f32 / 0x7fff as f32
}

/// Smoothstep interpolation: 3t² - 2t³
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// 2D value noise with smoothstep interpolation.
/// Returns a value in approximately [0.0, 1.0].
pub fn value_noise_2d(x: f32, y: f32, seed: u32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = smoothstep(x - ix as f32);
    let fy = smoothstep(y - iy as f32);

    let c00 = noise_hash_2d(ix, iy, seed);
    let c10 = noise_hash_2d(ix + 1, iy, seed);
    let c01 = noise_hash_2d(ix, iy + 1, seed);
    let c11 = noise_hash_2d(ix + 1, iy + 1, seed);

    let x0 = c00 + (c10 - c00) * fx;
    let x1 = c01 + (c11 - c01) * fx;

    x0 + (x1 - x0) * fy
}

/// 2D fractional Brownian motion. Each octave doubles frequency and halves
/// amplitude.
pub fn fbm_2d(x: f32, y: f32, octaves: u32, seed: u32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    for _ in 0..octaves {
        value += amplitude * value_noise_2d(x * frequency, y * frequency, seed);
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    value
}
