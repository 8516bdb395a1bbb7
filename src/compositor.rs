//! Blast compositor
//!
//! Renders every live blast into the frame buffers by direct pixel
//! synthesis. Each blast paints a translucent ring-shaped cloud into the
//! cloud layer and a displaced, jittered and smoothed copy of
//! background + cloud into the shockwave layer. Both layers accumulate across
//! frames and are only cleared when the viewport is resized.
//!
//! All noise comes from one seeded generator owned here. Frames are only
//! reproducible if the order of jitter calls is preserved: blasts in set
//! order, columns outer, rows inner, new coordinates before old ones.

use crate::blast::Blast;
use crate::color::{self, TRANSPARENT};
use crate::config::BlastConfig;
use crate::display::PixelBuffer;
use crate::distortion::{self, FieldSample};
use crate::noise::{gaussian_blur_3x3, jitter_index};
use crate::sprite::{crosshair_sprite, explosion_sprite};
use crate::util::Rng;
use tracing::debug;

/// The shockwave trails the cloud edge by this many pixels
const SHOCKWAVE_LAG: f64 = 2.0;
const PRESENT_BASE: u32 = 0xFF00_0000;

pub struct Compositor {
    config: BlastConfig,
    rng: Rng,
    width: u32,
    height: u32,

    background: PixelBuffer,
    cloud_layer: PixelBuffer,
    shockwave_layer: PixelBuffer,
    /// Crosshairs plus shockwave content of the current frame
    output: PixelBuffer,
    /// Explosion sprites stamped this frame
    sprite_layer: PixelBuffer,
    /// Pristine transparent raster `output` and `sprite_layer` are reset from
    pristine: PixelBuffer,
    /// Background + output, what gets presented
    presented: PixelBuffer,

    explosion: PixelBuffer,
    crosshair: PixelBuffer,
}

impl Compositor {
    pub fn new(config: BlastConfig, width: u32, height: u32) -> Self {
        let explosion = explosion_sprite(config.sprite_size, config.seed as u32);
        let crosshair = crosshair_sprite(config.crosshair_size);
        Self {
            rng: Rng::new(config.seed),
            config,
            width,
            height,
            background: PixelBuffer::with_size(width, height),
            cloud_layer: PixelBuffer::with_size(width, height),
            shockwave_layer: PixelBuffer::with_size(width, height),
            output: PixelBuffer::with_size(width, height),
            sprite_layer: PixelBuffer::with_size(width, height),
            pristine: PixelBuffer::with_size(width, height),
            presented: PixelBuffer::with_size(width, height),
            explosion,
            crosshair,
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

    pub fn config(&self) -> &BlastConfig {
        &self.config
    }

    pub fn background(&self) -> &PixelBuffer {
        &self.background
    }

    pub fn cloud_layer(&self) -> &PixelBuffer {
        &self.cloud_layer
    }

    pub fn shockwave_layer(&self) -> &PixelBuffer {
        &self.shockwave_layer
    }

    pub fn output(&self) -> &PixelBuffer {
        &self.output
    }

    /// Last presented frame
    pub fn presented(&self) -> &PixelBuffer {
        &self.presented
    }

    /// Swap in a new configuration. Sprites are rebuilt only when their
    /// size or seed changed; the noise generator keeps its sequence.
    pub fn set_config(&mut self, config: BlastConfig) {
        if config.sprite_size != self.config.sprite_size || config.seed != self.config.seed {
            self.explosion = explosion_sprite(config.sprite_size, config.seed as u32);
        }
        if config.crosshair_size != self.config.crosshair_size {
            self.crosshair = crosshair_sprite(config.crosshair_size);
        }
        self.config = config;
    }

    /// Replace the background. Its size may differ from the viewport.
    pub fn set_background(&mut self, background: PixelBuffer) {
        self.background = background;
    }

    /// Reallocate every viewport buffer, discarding accumulated layers
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.cloud_layer = PixelBuffer::with_size(width, height);
        self.shockwave_layer = PixelBuffer::with_size(width, height);
        self.output = PixelBuffer::with_size(width, height);
        self.sprite_layer = PixelBuffer::with_size(width, height);
        self.pristine = PixelBuffer::with_size(width, height);
        self.presented = PixelBuffer::with_size(width, height);
        debug!(width, height, "frame buffers reallocated");
    }

    /// Render one frame for the given blasts and return the presented image
    pub fn render(&mut self, blasts: &[Blast]) -> &PixelBuffer {
        self.output.copy_from(&self.pristine);
        self.sprite_layer.copy_from(&self.pristine);

        for blast in blasts {
            if blast.pixel_radius() <= 0 {
                self.output
                    .composite_centered(&self.crosshair, blast.x(), blast.y());
            } else {
                self.sprite_layer
                    .composite_centered(&self.explosion, blast.x(), blast.y());
                self.render_blast(blast);
            }
        }

        self.output.composite_full(&self.shockwave_layer);

        self.presented.fill(PRESENT_BASE);
        self.presented.composite_full(&self.background);
        self.presented.composite_full(&self.output);
        &self.presented
    }

    fn render_blast(&mut self, blast: &Blast) {
        let (cx, cy, r) = (blast.x(), blast.y(), blast.pixel_radius());
        let (left, top, right, bottom) = blast.bounds();
        let max_r = self.config.max_radius();
        let w = self.width as i32;
        let h = self.height as i32;

        for i in left.max(0)..=right.min(w - 1) {
            for j in top.max(0)..=bottom.min(h - 1) {
                let Some(field) = distortion::sample(cx, cy, r, i, j, max_r) else {
                    continue;
                };
                if !field.paints() {
                    continue;
                }

                self.paint_cloud(i, j, cx, cy, r, field.alpha_cloud_percent);

                if field.hypot_r <= r as f64 - SHOCKWAVE_LAG
                    && self.shockwave_layer.in_bounds(field.new_i, field.new_j)
                {
                    self.paint_shockwave(i, j, &field);
                }
            }
        }
    }

    fn paint_cloud(&mut self, i: i32, j: i32, cx: i32, cy: i32, r: i32, alpha_cloud: f64) {
        let a = distortion::cloud_falloff(cx, cy, r, i, j);
        let fog_alpha = (self.config.fog_height * 255.0 / 2.0) as i32;
        let white = color::pack(fog_alpha, 255, 255, 255);
        let puff = color::scale_alpha(white, a);

        let old = self.cloud_layer.get_or_transparent(i, j);
        let argb = if old == TRANSPARENT {
            color::scale_alpha(puff, alpha_cloud)
        } else {
            color::scale_alpha(color::merge(old, puff), alpha_cloud)
        };
        self.cloud_layer.set(i, j, argb);
    }

    fn paint_shockwave(&mut self, i: i32, j: i32, field: &FieldSample) {
        let old = self.shockwave_layer.get_or_transparent(i, j);

        // Random noise emulates the particles of gas
        let bg_max_i = self.background.width() as i32 - 1;
        let bg_max_j = self.background.height() as i32 - 1;
        let noisy_i = jitter_index(&mut self.rng, field.new_i, 0, bg_max_i);
        let noisy_j = jitter_index(&mut self.rng, field.new_j, 0, bg_max_j);

        let sampled = self.sample_scene(noisy_i, noisy_j);

        let argb = if old == TRANSPARENT {
            sampled
        } else {
            let old_i = jitter_index(&mut self.rng, i, 0, self.width as i32 - 1);
            let old_j = jitter_index(&mut self.rng, j, 0, self.height as i32 - 1);
            let smoothed = gaussian_blur_3x3(old_i, old_j, &self.shockwave_layer);
            let sprite = self.sprite_layer.get_or_transparent(noisy_i, noisy_j);
            color::merge(sprite, color::average(smoothed, sampled))
        };

        self.shockwave_layer
            .set(i, j, color::scale_alpha(argb, field.alpha_percent));
    }

    /// Background merged with cloud at (i, j); transparent outside either
    fn sample_scene(&self, i: i32, j: i32) -> u32 {
        let w = self.background.width().min(self.cloud_layer.width()) as i32;
        let h = self.background.height().min(self.cloud_layer.height()) as i32;
        if 0 <= i && i < w && 0 <= j && j < h {
            color::merge(
                self.background.get_or_transparent(i, j),
                self.cloud_layer.get_or_transparent(i, j),
            )
        } else {
            TRANSPARENT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grown(x: i32, y: i32, ticks: u32, config: &BlastConfig) -> Blast {
        let mut b = Blast::new(x, y);
        for _ in 0..ticks {
            b.advance(config.blast_increment, config.max_radius());
        }
        b
    }

    #[test]
    fn test_birth_frame_draws_crosshair_only() {
        let config = BlastConfig::default();
        let mut c = Compositor::new(config, 100, 100);
        c.render(&[Blast::new(50, 50)]);
        assert_eq!(c.cloud_layer().opaque_count(), 0);
        assert_eq!(c.shockwave_layer().opaque_count(), 0);
        assert!(c.output().opaque_count() > 0);
    }

    #[test]
    fn test_growing_blast_paints_inside_its_square() {
        let config = BlastConfig::default();
        let blast = grown(30, 30, 40, &config); // r = 24
        let mut c = Compositor::new(config, 100, 100);
        c.render(&[blast]);
        let (left, top, right, bottom) = blast.bounds();
        assert!(c.cloud_layer().opaque_count() > 0);
        for (x, y, p) in c.cloud_layer().iter_pixels() {
            if color::alpha(p) != 0 {
                let (x, y) = (x as i32, y as i32);
                assert!(x >= left && x <= right && y >= top && y <= bottom);
            }
        }
    }

    #[test]
    fn test_shockwave_samples_background() {
        let config = BlastConfig::default();
        let blast = grown(50, 50, 100, &config); // r = 60, mid-life
        let mut c = Compositor::new(config, 100, 100);
        let mut bg = PixelBuffer::with_size(100, 100);
        bg.fill(0xFF20_40C0);
        c.set_background(bg);
        c.render(&[blast]);
        let p = c.shockwave_layer().get(50, 50).unwrap();
        assert!(color::alpha(p) > 200);
        // Presented frame is opaque everywhere
        assert_eq!(c.presented().opaque_count(), 100 * 100);
    }

    fn peak_cloud_alpha(fog_height: f64) -> u8 {
        let config = BlastConfig::default().with_fog_height(fog_height).unwrap();
        let blast = grown(50, 50, 100, &config);
        let mut c = Compositor::new(config, 100, 100);
        c.render(&[blast]);
        c.cloud_layer()
            .iter_pixels()
            .map(|(_, _, p)| color::alpha(p))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn test_fog_height_scales_cloud_opacity() {
        let full = peak_cloud_alpha(1.0);
        let half = peak_cloud_alpha(0.5);
        // Fog alpha is fog_height * 255 / 2 before falloff and envelope
        assert!((120..=127).contains(&full), "full fog peak {}", full);
        assert!(half > 0 && half < full);
        assert!((half as i32 - full as i32 / 2).abs() <= 2, "half {} full {}", half, full);
    }

    #[test]
    fn test_expired_radius_paints_nothing() {
        let config = BlastConfig::default();
        let blast = grown(50, 50, 199, &config); // r = 119.4, progress > 1
        let mut c = Compositor::new(config, 100, 100);
        c.render(&[blast]);
        assert_eq!(c.cloud_layer().opaque_count(), 0);
        assert_eq!(c.shockwave_layer().opaque_count(), 0);
    }

    #[test]
    fn test_layers_accumulate_across_frames() {
        let config = BlastConfig::default();
        let mut c = Compositor::new(config.clone(), 100, 100);
        c.render(&[grown(50, 50, 20, &config)]);
        let first = c.cloud_layer().opaque_count();
        // A later frame without blasts keeps the trail
        c.render(&[]);
        assert_eq!(c.cloud_layer().opaque_count(), first);
        // A larger radius reaches past the first square
        c.render(&[grown(50, 50, 60, &config)]);
        assert!(c
            .cloud_layer()
            .iter_pixels()
            .any(|(x, _, p)| x > 62 && color::alpha(p) != 0));
    }

    #[test]
    fn test_same_seed_same_frames() {
        let config = BlastConfig::default();
        let blasts = [grown(40, 40, 60, &config), grown(60, 55, 30, &config)];
        let mut a = Compositor::new(config.clone(), 100, 100);
        let mut b = Compositor::new(config, 100, 100);
        for _ in 0..3 {
            a.render(&blasts);
            b.render(&blasts);
        }
        assert_eq!(a.shockwave_layer(), b.shockwave_layer());
    }

    #[test]
    fn test_off_viewport_blast_is_clipped() {
        let config = BlastConfig::default();
        let mut c = Compositor::new(config.clone(), 50, 50);
        c.render(&[grown(500, 500, 50, &config), Blast::new(-40, 900)]);
        assert_eq!(c.cloud_layer().opaque_count(), 0);
        assert_eq!(c.output().opaque_count(), 0);
    }

    #[test]
    fn test_resize_clears_layers() {
        let config = BlastConfig::default();
        let mut c = Compositor::new(config.clone(), 100, 100);
        c.set_background(crate::background::default_scene(100, 100));
        c.render(&[grown(50, 50, 80, &config)]);
        assert!(c.shockwave_layer().opaque_count() > 0);
        c.resize(60, 40);
        assert_eq!((c.width(), c.height()), (60, 40));
        assert_eq!(c.cloud_layer().opaque_count(), 0);
        assert_eq!(c.shockwave_layer().opaque_count(), 0);
        assert_eq!(c.render(&[]).width(), 60);
    }
}
