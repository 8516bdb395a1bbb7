//! 32-bit ARGB pixel algebra
//!
//! Pixels are packed `u32` values with alpha in the highest byte:
//! `0xAARRGGBB`. Zero is the fully transparent pixel every fresh buffer
//! starts with.
//!
//! `merge` deliberately weights the two inputs by their normalized alphas
//! instead of doing source-over compositing. The accumulation buffers rely on
//! that behavior, so it must not be "fixed".

pub const TRANSPARENT: u32 = 0;

/// Pack four channels into an ARGB pixel, clamping each to [0, 255]
#[inline]
pub fn pack(a: i32, r: i32, g: i32, b: i32) -> u32 {
    let c = |v: i32| v.clamp(0, 255) as u32;
    (c(a) << 24) | (c(r) << 16) | (c(g) << 8) | c(b)
}

#[inline]
pub fn alpha(argb: u32) -> u8 {
    (argb >> 24) as u8
}

#[inline]
pub fn red(argb: u32) -> u8 {
    (argb >> 16) as u8
}

#[inline]
pub fn green(argb: u32) -> u8 {
    (argb >> 8) as u8
}

#[inline]
pub fn blue(argb: u32) -> u8 {
    argb as u8
}

/// Split into (a, r, g, b)
#[inline]
pub fn channels(argb: u32) -> (u8, u8, u8, u8) {
    (alpha(argb), red(argb), green(argb), blue(argb))
}

/// Replace the alpha channel, keeping RGB
#[inline]
pub fn with_alpha(argb: u32, a: i32) -> u32 {
    pack(a, red(argb) as i32, green(argb) as i32, blue(argb) as i32)
}

/// Multiply alpha by `percent` (truncating), RGB unchanged
#[inline]
pub fn scale_alpha(argb: u32, percent: f64) -> u32 {
    with_alpha(argb, (alpha(argb) as f64 * percent) as i32)
}

/// Alpha-weighted merge of two pixels.
///
/// Every channel, alpha included, becomes `bg * ab/(ab+af) + fg * af/(ab+af)`.
/// Two fully transparent inputs give `TRANSPARENT` regardless of their RGB.
pub fn merge(background: u32, foreground: u32) -> u32 {
    let ab = alpha(background) as f32 / 255.0;
    let af = alpha(foreground) as f32 / 255.0;

    if ab == 0.0 && af == 0.0 {
        return TRANSPARENT;
    }

    let ap = ab + af;
    let wb = ab / ap;
    let wf = af / ap;

    let mix = |b: u8, f: u8| (b as f32 * wb + f as f32 * wf) as i32;

    pack(
        mix(alpha(background), alpha(foreground)),
        mix(red(background), red(foreground)),
        mix(green(background), green(foreground)),
        mix(blue(background), blue(foreground)),
    )
}

/// Unweighted per-channel mean (integer division), alpha included
pub fn average(a: u32, b: u32) -> u32 {
    let mean = |x: u8, y: u8| (x as i32 + y as i32) / 2;
    pack(
        mean(alpha(a), alpha(b)),
        mean(red(a), red(b)),
        mean(green(a), green(b)),
        mean(blue(a), blue(b)),
    )
}
