//! Blast engine
//!
//! The surface front-ends talk to. Owns the active blast set, the compositor
//! and, while playing, the scheduler thread. Everything here is driven from
//! the thread that presents frames; only the blast set is shared with the
//! scheduler.

use crate::background;
use crate::blast::{Blast, BlastSet, TickReport};
use crate::command::Command;
use crate::compositor::Compositor;
use crate::config::BlastConfig;
use crate::display::PixelBuffer;
use crate::error::Result;
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::util::Rng;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Mixed into the seed so random placement never replays the noise sequence
const PLACEMENT_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// What the front-end should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct BlastEngine {
    config: BlastConfig,
    blasts: BlastSet,
    compositor: Compositor,
    placement: Rng,
    scheduler: Option<SchedulerHandle>,
}

impl BlastEngine {
    /// Create a stopped engine with a transparent background of the
    /// configured size
    pub fn new(config: BlastConfig) -> Result<Self> {
        config.validate()?;
        let compositor = Compositor::new(config.clone(), config.width, config.height);
        let mut engine = Self {
            placement: Rng::new(config.seed ^ PLACEMENT_SALT),
            config,
            blasts: BlastSet::new(),
            compositor,
            scheduler: None,
        };
        engine.set_background(PixelBuffer::with_size(
            engine.config.width,
            engine.config.height,
        ));
        Ok(engine)
    }

    pub fn config(&self) -> &BlastConfig {
        &self.config
    }

    /// Shared handle to the active blasts
    pub fn blasts(&self) -> BlastSet {
        self.blasts.clone()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Current viewport `(width, height)`
    pub fn viewport(&self) -> (u32, u32) {
        (self.compositor.width(), self.compositor.height())
    }

    fn in_viewport(&self, x: i32, y: i32) -> bool {
        let (w, h) = self.viewport();
        x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h
    }

    /// Add a blast at a viewport position. Returns false if the position is
    /// outside the viewport or the set is unreachable.
    pub fn add_blast(&mut self, x: i32, y: i32) -> bool {
        if !self.in_viewport(x, y) {
            debug!(x, y, "blast outside viewport ignored");
            return false;
        }
        match self.blasts.add(Blast::new(x, y)) {
            Ok(()) => {
                debug!(x, y, "blast added");
                true
            },
            Err(e) => {
                error!(error = %e, "cannot add blast");
                false
            },
        }
    }

    /// Add a blast at a uniformly random viewport position
    pub fn fire_random(&mut self) -> bool {
        let (w, h) = self.viewport();
        let x = self.placement.below(w) as i32;
        let y = self.placement.below(h) as i32;
        self.add_blast(x, y)
    }

    /// Add a blast on every viewport pixel with probability `percent / 100`.
    /// Returns how many were added.
    pub fn randomly_fill(&mut self, percent: f64) -> usize {
        let p = (percent / 100.0).clamp(0.0, 1.0);
        let (w, h) = self.viewport();
        let mut added = Vec::new();
        for x in 0..w as i32 {
            for y in 0..h as i32 {
                if self.placement.next_f64() < p {
                    added.push(Blast::new(x, y));
                }
            }
        }
        let count = added.len();
        match self.blasts.extend(added) {
            Ok(()) => {
                info!(percent, count, "board filled");
                count
            },
            Err(e) => {
                error!(error = %e, "cannot fill board");
                0
            },
        }
    }

    /// Remove every active blast. Accumulated layers are kept.
    pub fn reset_board(&mut self) {
        match self.blasts.clear() {
            Ok(()) => info!("board reset"),
            Err(e) => error!(error = %e, "cannot reset board"),
        }
    }

    /// Reallocate every frame buffer for a new viewport, even one of the
    /// same size. Blasts keep their positions and are clipped on the next
    /// render.
    pub fn on_viewport_resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!(width, height, "ignoring empty viewport");
            return;
        }
        self.compositor.resize(width, height);
        info!(width, height, "viewport resized");
    }

    /// Replace the background. Its size may differ from the viewport.
    pub fn set_background(&mut self, background: PixelBuffer) {
        debug!(
            width = background.width(),
            height = background.height(),
            "background replaced"
        );
        self.compositor.set_background(background);
    }

    /// Decode an image file and use it as background, resizing the viewport
    /// to match. On failure the previous background stays and `None` is
    /// returned.
    pub fn load_background(&mut self, path: impl AsRef<Path>) -> Option<(u32, u32)> {
        let path = path.as_ref();
        if !background::is_supported(path) {
            warn!(path = %path.display(), "unsupported background format");
            return None;
        }
        match background::load(path) {
            Ok(image) => {
                let size = (image.width(), image.height());
                info!(path = %path.display(), width = size.0, height = size.1, "background loaded");
                self.set_background(image);
                self.on_viewport_resized(size.0, size.1);
                Some(size)
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "keeping previous background");
                None
            },
        }
    }

    /// Render one frame from a snapshot of the active blasts. If the set
    /// cannot be read the frame is dropped and the previous one returned.
    pub fn render_frame(&mut self) -> &PixelBuffer {
        match self.blasts.snapshot() {
            Ok(blasts) => self.compositor.render(&blasts),
            Err(e) => {
                error!(error = %e, "frame dropped");
                self.compositor.presented()
            },
        }
    }

    /// Advance every blast by one step
    pub fn tick(&mut self) -> TickReport {
        self.blasts
            .advance_all(self.config.blast_increment, self.config.max_radius())
            .unwrap_or_else(|e| {
                error!(error = %e, "tick skipped");
                TickReport::default()
            })
    }

    /// Validate and install a new configuration everywhere it is consumed
    pub fn apply_config(&mut self, config: BlastConfig) -> Result<()> {
        config.validate()?;
        if let Some(scheduler) = &self.scheduler {
            scheduler.update_config(config.clone());
        }
        self.compositor.set_config(config.clone());
        info!(
            fog_height = config.fog_height,
            propagation_speed = config.propagation_speed,
            moves_per_second = config.moves_per_second,
            "configuration applied"
        );
        self.config = config;
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.as_ref().is_some_and(SchedulerHandle::is_running)
    }

    /// Start the scheduler if it is not already running
    pub fn play(&mut self) -> Result<()> {
        if self.is_playing() {
            return Ok(());
        }
        self.scheduler = Some(Scheduler::start(self.blasts.clone(), self.config.clone())?);
        Ok(())
    }

    /// Stop the scheduler after its current tick
    pub fn stop(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
    }

    /// True if the scheduler asked for a redraw since the last call
    pub fn poll_redraw(&self) -> bool {
        self.scheduler.as_ref().is_some_and(SchedulerHandle::poll_redraw)
    }

    /// Run a remote or keyboard command
    pub fn apply_command(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Fire { x, y } => {
                self.add_blast(x, y);
            },
            Command::Random => {
                self.fire_random();
            },
            Command::Fill(percent) => {
                self.randomly_fill(percent);
            },
            Command::Reset => self.reset_board(),
            Command::Play => self.play()?,
            Command::Stop => self.stop(),
            Command::FogHeight(v) => {
                let config = self.config.clone().with_fog_height(v)?;
                self.apply_config(config)?;
            },
            Command::PropagationSpeed(v) => {
                let config = self.config.clone().with_propagation_speed(v)?;
                self.apply_config(config)?;
            },
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;
    use crate::error::BlastError;
    use std::time::{Duration, Instant};

    fn engine(width: u32, height: u32) -> BlastEngine {
        BlastEngine::new(BlastConfig {
            width,
            height,
            ..BlastConfig::default()
        })
        .unwrap()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("blastfield-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_single_blast_runs_to_completion() {
        let mut e = engine(100, 100);
        assert!(e.add_blast(50, 50));
        let mut ticks = 0;
        while !e.blasts().is_empty().unwrap() {
            e.render_frame();
            e.tick();
            ticks += 1;
            assert!(ticks <= 200, "blast outlived its lifetime");
        }
        assert_eq!(ticks, 200);
        assert_eq!(e.render_frame().width(), 100);
    }

    /// Run one blast to expiry and check that no layer pixel lies outside the
    /// union of the bounding squares it rendered with. Returns that union.
    fn run_and_check_confinement(config: BlastConfig, x: i32, y: i32) -> (i32, i32, i32, i32) {
        let mut e = BlastEngine::new(config).unwrap();
        assert!(e.add_blast(x, y));
        let (mut left, mut top, mut right, mut bottom) = (x, y, x, y);
        while let Some(blast) = e.blasts().snapshot().unwrap().first().copied() {
            let (l, t, r, b) = blast.bounds();
            left = left.min(l);
            top = top.min(t);
            right = right.max(r);
            bottom = bottom.max(b);
            e.render_frame();
            e.tick();
        }

        let c = e.compositor();
        assert!(c.cloud_layer().opaque_count() > 0);
        for layer in [c.cloud_layer(), c.shockwave_layer()] {
            for (px, py, p) in layer.iter_pixels() {
                if color::alpha(p) != 0 {
                    let (px, py) = (px as i32, py as i32);
                    assert!(
                        px >= left && px <= right && py >= top && py <= bottom,
                        "({}, {}) outside ({}, {})..=({}, {})",
                        px,
                        py,
                        left,
                        top,
                        right,
                        bottom
                    );
                }
            }
        }
        (left, top, right, bottom)
    }

    #[test]
    fn test_centered_blast_stays_inside_visited_squares() {
        let config = BlastConfig {
            width: 100,
            height: 100,
            ..BlastConfig::default()
        };
        let (left, top, right, bottom) = run_and_check_confinement(config, 50, 50);
        // Last rendered radius is 119
        assert_eq!((left, top, right, bottom), (-69, -69, 169, 169));
    }

    #[test]
    fn test_short_lived_blast_stays_inside_visited_squares() {
        let config = BlastConfig {
            width: 100,
            height: 100,
            max_iterations: 50,
            ..BlastConfig::default()
        };
        let (left, top, right, bottom) = run_and_check_confinement(config, 20, 20);
        assert_eq!((left, top, right, bottom), (-9, -9, 49, 49));
    }

    #[test]
    fn test_same_size_resize_clears_layers() {
        let mut e = engine(100, 100);
        e.add_blast(50, 50);
        for _ in 0..60 {
            e.tick();
        }
        e.render_frame();
        assert!(e.compositor().cloud_layer().opaque_count() > 0);

        e.on_viewport_resized(100, 100);
        assert_eq!(e.viewport(), (100, 100));
        assert_eq!(e.compositor().cloud_layer().opaque_count(), 0);
        assert_eq!(e.compositor().shockwave_layer().opaque_count(), 0);
        assert_eq!(e.blasts().len().unwrap(), 1);
    }

    #[test]
    fn test_unreadable_blast_set_drops_frame() {
        let mut e = engine(60, 60);
        e.set_background(background::default_scene(60, 60));
        e.add_blast(30, 30);
        for _ in 0..30 {
            e.tick();
        }
        let previous = e.render_frame().clone();

        e.blasts().poison();
        assert_eq!(e.render_frame(), &previous);
        assert_eq!(e.tick(), TickReport::default());
        assert!(!e.add_blast(10, 10));
        assert_eq!(e.render_frame(), &previous);
    }

    #[test]
    fn test_render_while_scheduler_ticks() {
        let mut e = BlastEngine::new(BlastConfig {
            width: 40,
            height: 40,
            moves_per_second: 1000,
            max_iterations: 30,
            ..BlastConfig::default()
        })
        .unwrap();
        for k in 0..8 {
            e.add_blast(5 * k, 39 - 5 * k);
        }
        e.play().unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut frames = 0;
        while !e.blasts().is_empty().unwrap() && Instant::now() < deadline {
            let frame = e.render_frame();
            assert_eq!((frame.width(), frame.height()), (40, 40));
            frames += 1;
            // Blasts added mid-run join the next snapshot
            if frames == 3 {
                e.add_blast(20, 20);
            }
        }
        e.stop();
        assert!(e.blasts().is_empty().unwrap(), "blasts never retired");
        assert!(frames > 0);
    }

    #[test]
    fn test_add_blast_rejects_outside_viewport() {
        let mut e = engine(40, 30);
        assert!(!e.add_blast(-1, 5));
        assert!(!e.add_blast(40, 5));
        assert!(!e.add_blast(5, 30));
        assert!(e.add_blast(39, 29));
        assert_eq!(e.blasts().len().unwrap(), 1);
    }

    #[test]
    fn test_resize_clears_layers_and_keeps_blasts() {
        let mut e = engine(100, 100);
        e.set_background(background::default_scene(100, 100));
        e.add_blast(90, 90);
        e.add_blast(20, 20);
        for _ in 0..40 {
            e.tick();
        }
        e.render_frame();
        assert!(e.compositor().shockwave_layer().opaque_count() > 0);

        e.on_viewport_resized(50, 50);
        assert_eq!(e.viewport(), (50, 50));
        assert_eq!(e.compositor().cloud_layer().opaque_count(), 0);
        assert_eq!(e.compositor().shockwave_layer().opaque_count(), 0);
        assert_eq!(e.blasts().len().unwrap(), 2);

        // The blast at (90, 90) is now entirely off-screen and simply clipped
        let frame = e.render_frame();
        assert_eq!((frame.width(), frame.height()), (50, 50));
        assert_eq!(e.blasts().len().unwrap(), 2);
    }

    #[test]
    fn test_reset_keeps_layers() {
        let mut e = engine(60, 60);
        e.add_blast(30, 30);
        for _ in 0..30 {
            e.tick();
        }
        e.render_frame();
        let painted = e.compositor().cloud_layer().opaque_count();
        e.reset_board();
        assert!(e.blasts().is_empty().unwrap());
        e.render_frame();
        assert_eq!(e.compositor().cloud_layer().opaque_count(), painted);
    }

    #[test]
    fn test_random_placement_stays_in_viewport() {
        let mut e = engine(7, 3);
        for _ in 0..50 {
            assert!(e.fire_random());
        }
        for b in e.blasts().snapshot().unwrap() {
            assert!((0..7).contains(&b.x()) && (0..3).contains(&b.y()));
        }
    }

    #[test]
    fn test_randomly_fill_extremes() {
        let mut e = engine(10, 10);
        assert_eq!(e.randomly_fill(0.0), 0);
        assert_eq!(e.randomly_fill(100.0), 100);
        assert_eq!(e.blasts().len().unwrap(), 100);
    }

    #[test]
    fn test_bad_background_keeps_previous() {
        let mut e = engine(20, 20);
        let mut bg = PixelBuffer::with_size(20, 20);
        bg.fill(0xFF11_2233);
        e.set_background(bg.clone());

        let path = temp_path("broken.png");
        std::fs::write(&path, b"nope").unwrap();
        assert_eq!(e.load_background(&path), None);
        let _ = std::fs::remove_file(&path);

        assert_eq!(e.load_background("scene.txt"), None);
        assert_eq!(e.compositor().background(), &bg);
    }

    #[test]
    fn test_background_load_resizes_viewport() {
        let path = temp_path("scene.png");
        image::RgbaImage::from_pixel(30, 20, image::Rgba([200, 100, 50, 255]))
            .save(&path)
            .unwrap();

        let mut e = engine(100, 100);
        let loaded = e.load_background(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, Some((30, 20)));
        assert_eq!(e.viewport(), (30, 20));
        assert_eq!(e.render_frame().get(5, 5), Some(0xFFC8_6432));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut e = engine(10, 10);
        let bad = BlastConfig {
            fog_height: 2.0,
            ..e.config().clone()
        };
        assert!(matches!(
            e.apply_config(bad),
            Err(BlastError::InvalidConfig { field: "fog_height", .. })
        ));
        assert_eq!(e.config().fog_height, 1.0);
    }

    #[test]
    fn test_commands() {
        let mut e = engine(10, 10);
        assert_eq!(e.apply_command(Command::Fire { x: 1, y: 2 }).unwrap(), Flow::Continue);
        e.apply_command(Command::FogHeight(0.5)).unwrap();
        assert_eq!(e.config().fog_height, 0.5);
        assert!(e.apply_command(Command::PropagationSpeed(0.0)).is_err());
        e.apply_command(Command::Reset).unwrap();
        assert!(e.blasts().is_empty().unwrap());
        assert_eq!(e.apply_command(Command::Quit).unwrap(), Flow::Quit);
    }

    #[test]
    fn test_play_and_stop() {
        let mut e = BlastEngine::new(BlastConfig {
            width: 20,
            height: 20,
            moves_per_second: 1000,
            ..BlastConfig::default()
        })
        .unwrap();
        e.add_blast(10, 10);
        e.play().unwrap();
        assert!(e.is_playing());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !e.poll_redraw() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        e.stop();
        assert!(!e.is_playing());
        assert!(e.blasts().snapshot().unwrap()[0].radius() > 0.0);
    }
}
