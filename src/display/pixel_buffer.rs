use crate::color;

// ============================================================================
// Utility Functions
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u16) -> u8 {
    let result = src as u16 * alpha + dst as u16 * (255 - alpha);
    ((result + 1 + (result >> 8)) >> 8) as u8
}

/// Source-over of one ARGB pixel onto another
#[inline]
fn over(src: u32, dst: u32) -> u32 {
    let sa = color::alpha(src);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }
    let alpha = sa as u16;
    let (da, dr, dg, db) = color::channels(dst);
    let out_a = sa as u16 + ((da as u16 * (255 - alpha) + 127) / 255);
    color::pack(
        out_a as i32,
        blend_channel(color::red(src), dr, alpha) as i32,
        blend_channel(color::green(src), dg, alpha) as i32,
        blend_channel(color::blue(src), db, alpha) as i32,
    )
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// ARGB8888 pixel buffer for software rendering
///
/// Every frame buffer of the blast renderer is one of these. Cells start out
/// as `color::TRANSPARENT`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a fully transparent buffer
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![color::TRANSPARENT; (width as usize) * (height as usize)],
            width,
            height,
        }
    }

    /// Wrap raw ARGB pixels. Returns None if the length does not match.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        if pixels.len() == (width as usize) * (height as usize) {
            Some(Self {
                pixels,
                width,
                height,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check if coordinates are within bounds
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    /// Read a pixel (bounds checked)
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        if self.in_bounds(x, y) {
            Some(self.pixels[self.pixel_index(x as u32, y as u32)])
        } else {
            None
        }
    }

    /// Read a pixel, treating out-of-bounds as transparent
    #[inline]
    pub fn get_or_transparent(&self, x: i32, y: i32) -> u32 {
        self.get(x, y).unwrap_or(color::TRANSPARENT)
    }

    /// Write a pixel (bounds checked, silently dropped outside)
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, argb: u32) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            self.pixels[idx] = argb;
        }
    }

    /// Fill every cell with one pixel value
    pub fn fill(&mut self, argb: u32) {
        self.pixels.fill(argb);
    }

    /// Reset to fully transparent
    pub fn clear(&mut self) {
        self.fill(color::TRANSPARENT);
    }

    /// Copy contents from another buffer (must be same size)
    pub fn copy_from(&mut self, src: &PixelBuffer) {
        if self.pixels.len() == src.pixels.len() {
            self.pixels.copy_from_slice(&src.pixels);
        }
    }

    /// Count cells whose alpha is non-zero
    pub fn opaque_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| color::alpha(p) != 0).count()
    }

    /// Iterate `(x, y, argb)` over every cell
    pub fn iter_pixels(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let w = self.width.max(1);
        self.pixels
            .iter()
            .enumerate()
            .map(move |(i, &p)| (i as u32 % w, i as u32 / w, p))
    }

    /// Draw a horizontal line
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, argb: u32) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let start = x1.max(0);
        let end = x2.min(self.width as i32 - 1);
        if start > end {
            return;
        }

        let row = self.pixel_index(0, y as u32);
        self.pixels[row + start as usize..=row + end as usize].fill(argb);
    }

    /// Draw a vertical line
    pub fn vline(&mut self, x: i32, y1: i32, y2: i32, argb: u32) {
        if x < 0 || x >= self.width as i32 {
            return;
        }
        let (y1, y2) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        let start = y1.max(0);
        let end = y2.min(self.height as i32 - 1);
        for y in start..=end {
            let idx = self.pixel_index(x as u32, y as u32);
            self.pixels[idx] = argb;
        }
    }

    /// Draw a circle outline (1px thick)
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, argb: u32) {
        // Midpoint circle algorithm
        let mut x = radius;
        let mut y = 0;
        let mut err = 0;

        while x >= y {
            self.set(cx + x, cy + y, argb);
            self.set(cx + y, cy + x, argb);
            self.set(cx - y, cy + x, argb);
            self.set(cx - x, cy + y, argb);
            self.set(cx - x, cy - y, argb);
            self.set(cx - y, cy - x, argb);
            self.set(cx + y, cy - x, argb);
            self.set(cx + x, cy - y, argb);

            y += 1;
            err += 1 + 2 * y;
            if 2 * (err - x) + 1 > 0 {
                x -= 1;
                err += 1 - 2 * x;
            }
        }
    }

    /// Opaque top-to-bottom gradient between two colors
    pub fn fill_vertical_gradient(&mut self, top: (u8, u8, u8), bottom: (u8, u8, u8)) {
        let h = self.height.max(2) - 1;
        for y in 0..self.height {
            let (r, g, b) = crate::util::lerp_color(top, bottom, y as f32 / h as f32);
            let argb = color::pack(255, r as i32, g as i32, b as i32);
            self.hline(0, self.width as i32 - 1, y as i32, argb);
        }
    }

    // ========================================================================
    // Buffer Operations
    // ========================================================================

    /// Composite a source buffer onto this one using per-pixel source alpha
    /// (source-over). Skips fully transparent pixels, copies fully opaque ones.
    pub fn composite(&mut self, src: &PixelBuffer, dst_x: i32, dst_y: i32) {
        let src_w = src.width() as i32;
        let src_h = src.height() as i32;
        let dst_w = self.width as i32;
        let dst_h = self.height as i32;

        for sy in 0..src_h {
            let dy = dst_y + sy;
            if dy < 0 || dy >= dst_h {
                continue;
            }

            for sx in 0..src_w {
                let dx = dst_x + sx;
                if dx < 0 || dx >= dst_w {
                    continue;
                }

                let sp = src.pixels[src.pixel_index(sx as u32, sy as u32)];
                if color::alpha(sp) == 0 {
                    continue;
                }

                let di = self.pixel_index(dx as u32, dy as u32);
                self.pixels[di] = over(sp, self.pixels[di]);
            }
        }
    }

    /// Convenience: composite at (0, 0)
    pub fn composite_full(&mut self, src: &PixelBuffer) {
        self.composite(src, 0, 0);
    }

    /// Composite `src` so that its center lands on (cx, cy)
    pub fn composite_centered(&mut self, src: &PixelBuffer, cx: i32, cy: i32) {
        self.composite(
            src,
            cx - src.width() as i32 / 2,
            cy - src.height() as i32 / 2,
        );
    }

    /// ARGB pixels as a slice
    pub fn as_argb(&self) -> &[u32] {
        &self.pixels
    }

    /// Raw native-endian bytes for ARGB8888 texture upload
    pub fn as_bytes(&self) -> &[u8] {
        // Safety: u32 has no padding and any bit pattern is a valid u8, the
        // byte slice covers exactly the same allocation and borrows `self`.
        unsafe {
            std::slice::from_raw_parts(
                self.pixels.as_ptr() as *const u8,
                self.pixels.len() * std::mem::size_of::<u32>(),
            )
        }
    }
}
