//! Procedural sprites: the cotton-like explosion puff and the crosshair
//! marker shown on a blast's birth frame.

use crate::color;
use crate::display::PixelBuffer;
use crate::noise::fbm_2d;

const PUFF_OCTAVES: u32 = 4;
const PUFF_FREQUENCY: f32 = 6.0;
const CROSSHAIR_ARGB: u32 = 0xFFE0_2020;

/// Soft white puff of `size`×`size`. Alpha falls off radially and is
/// broken up by fBm so the edge looks billowy. Cells outside the disc stay
/// transparent.
pub fn explosion_sprite(size: u32, seed: u32) -> PixelBuffer {
    let mut sprite = PixelBuffer::with_size(size, size);
    if size == 0 {
        return sprite;
    }
    let half = size as f32 / 2.0;

    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32 + 0.5 - half) / half;
            let dy = (y as f32 + 0.5 - half) / half;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist >= 1.0 {
                continue;
            }

            let billow = fbm_2d(dx * PUFF_FREQUENCY, dy * PUFF_FREQUENCY, PUFF_OCTAVES, seed);
            let t = ((1.0 - dist) * (0.4 + 1.2 * billow)).clamp(0.0, 1.0);
            let shade = 200 + (55.0 * billow) as i32;
            sprite.set(
                x as i32,
                y as i32,
                color::pack((t * 255.0) as i32, shade, shade, shade),
            );
        }
    }
    sprite
}

/// Transparent square with a ring and a cross through its center
pub fn crosshair_sprite(size: u32) -> PixelBuffer {
    let mut sprite = PixelBuffer::with_size(size, size);
    if size == 0 {
        return sprite;
    }
    let c = size as i32 / 2;
    let radius = (size as i32 / 2 - 1).max(0);

    sprite.draw_circle(c, c, radius, CROSSHAIR_ARGB);
    sprite.draw_circle(c, c, radius / 3, CROSSHAIR_ARGB);
    sprite.hline(0, size as i32 - 1, c, CROSSHAIR_ARGB);
    sprite.vline(c, 0, size as i32 - 1, CROSSHAIR_ARGB);
    sprite
}
