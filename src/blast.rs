//! Blasts and the shared set of active blasts
//!
//! A blast is born with radius 0, grows by a fixed increment per scheduler
//! tick and retires once its radius reaches `max_R`. The set is shared
//! between the ticking thread (mutates) and the render thread (reads a
//! snapshot per frame) behind a single mutex.

use crate::error::{BlastError, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Slack for accumulated float error when comparing against `max_R`
const RADIUS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blast {
    x: i32,
    y: i32,
    r: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlastState {
    /// r == 0, shown as a crosshair
    Born,
    Growing,
    /// Reached max_R, to be removed
    Expired,
}

impl Blast {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, r: 0.0 }
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Exact radius
    #[inline]
    pub fn radius(&self) -> f64 {
        self.r
    }

    /// Radius truncated for rendering and geometry checks
    #[inline]
    pub fn pixel_radius(&self) -> i32 {
        self.r as i32
    }

    pub fn state(&self, max_r: f64) -> BlastState {
        if self.r + RADIUS_EPSILON >= max_r {
            BlastState::Expired
        } else if self.r <= 0.0 {
            BlastState::Born
        } else {
            BlastState::Growing
        }
    }

    /// One scheduler step: grow by `increment` and report the new state
    pub fn advance(&mut self, increment: f64, max_r: f64) -> BlastState {
        self.r += increment.max(0.0);
        self.state(max_r)
    }

    /// Integer bounding square `(left, top, right, bottom)`, inclusive
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        let r = self.pixel_radius();
        (self.x - r, self.y - r, self.x + r, self.y + r)
    }
}

/// Outcome of one tick over the whole set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub advanced: usize,
    pub retired: usize,
}

/// Thread-safe collection of active blasts, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct BlastSet {
    inner: Arc<Mutex<Vec<Blast>>>,
}

impl BlastSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Blast>>> {
        self.inner.lock().map_err(|_| BlastError::BlastSetPoisoned)
    }

    /// Poison the lock by panicking while holding it
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let inner = Arc::clone(&self.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock();
            panic!("blast set poisoned on purpose");
        })
        .join();
    }

    pub fn add(&self, blast: Blast) -> Result<()> {
        self.lock()?.push(blast);
        Ok(())
    }

    /// Add many blasts under one lock
    pub fn extend(&self, blasts: impl IntoIterator<Item = Blast>) -> Result<()> {
        self.lock()?.extend(blasts);
        Ok(())
    }

    /// Remove every blast
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Copy of the current blasts for one frame of rendering
    pub fn snapshot(&self) -> Result<Vec<Blast>> {
        Ok(self.lock()?.clone())
    }

    /// Grow every blast by `increment` and drop the ones that reached `max_r`
    pub fn advance_all(&self, increment: f64, max_r: f64) -> Result<TickReport> {
        let mut blasts = self.lock()?;
        let before = blasts.len();
        blasts.retain_mut(|blast| match blast.advance(increment, max_r) {
            BlastState::Expired => {
                debug!(x = blast.x, y = blast.y, "blast retired");
                false
            },
            _ => true,
        });
        let retired = before - blasts.len();
        Ok(TickReport {
            advanced: blasts.len(),
            retired,
        })
    }
}
