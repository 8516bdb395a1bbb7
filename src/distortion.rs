//! Distortion field of an expanding gas front
//!
//! For a blast at (cx, cy) with integer radius R, every pixel (i, j) inside
//! the disc maps to a displaced source coordinate closer to the center. The
//! pull `p = 20R / (z + 20R)` with `z = hypot(hypot(i - cx, j - cy), R)`
//! gives the front its curvature. Two opacity envelopes derived from the
//! blast's growth progress fade it in and out.

/// Share of `max_R` added to the growth progress so the last grown frame
/// overshoots 1 and is trimmed.
const PROGRESS_BIAS: f64 = 0.01;
const CURVATURE: f64 = 20.0;

/// Field sample for one pixel of one blast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    /// Distance from the blast center
    pub hypot_r: f64,
    /// Pull factor in (0, 1)
    pub pull: f64,
    /// Displaced source column
    pub new_i: i32,
    /// Displaced source row
    pub new_j: i32,
    pub radius_percent: f64,
    /// Shockwave opacity envelope
    pub alpha_percent: f64,
    /// Cloud opacity envelope
    pub alpha_cloud_percent: f64,
}

impl FieldSample {
    /// Whether this blast is still inside its visible lifetime
    #[inline]
    pub fn paints(&self) -> bool {
        self.radius_percent <= 1.0
    }
}

/// Normalized growth progress of a radius, biased up by 1% of `max_r`
#[inline]
pub fn radius_percent(radius: i32, max_r: f64) -> f64 {
    (radius as f64 + PROGRESS_BIAS * max_r) / max_r
}

/// Parabolic envelope: 0 at both ends, 1 at the midpoint
#[inline]
pub fn alpha_percent(radius_percent: f64) -> f64 {
    1.0 - (2.0 * radius_percent - 1.0).powi(2)
}

/// Flatter quartic envelope for the cloud layer, same zeros and peak
#[inline]
pub fn alpha_cloud_percent(radius_percent: f64) -> f64 {
    1.0 - (2.0 * radius_percent - 1.0).powi(4)
}

/// Sample the field at (i, j). Returns None outside the disc of `radius`.
pub fn sample(cx: i32, cy: i32, radius: i32, i: i32, j: i32, max_r: f64) -> Option<FieldSample> {
    let hypot_r = ((i - cx) as f64).hypot((j - cy) as f64);
    if hypot_r > radius as f64 {
        return None;
    }

    let r = radius as f64;
    let z = hypot_r.hypot(r);
    let pull = CURVATURE * r / (z + CURVATURE * r);

    let new_di = pull * (cx - i) as f64;
    let new_dj = pull * (cy - j) as f64;

    let radius_percent = radius_percent(radius, max_r);

    Some(FieldSample {
        hypot_r,
        pull,
        new_i: cx - new_di as i32,
        new_j: cy - new_dj as i32,
        radius_percent,
        alpha_percent: alpha_percent(radius_percent),
        alpha_cloud_percent: alpha_cloud_percent(radius_percent),
    })
}

/// Ring-shaped falloff of the cloud: `exp(-((2dx/R)² + (2dy/R)² - 2)²)`.
/// Peaks on the annulus at `R/√2` from the center, not at the center.
#[inline]
pub fn cloud_falloff(cx: i32, cy: i32, radius: i32, i: i32, j: i32) -> f64 {
    let r = radius as f64;
    let u = (2 * (i - cx)) as f64 / r;
    let v = (2 * (j - cy)) as f64 / r;
    (-(u * u + v * v - 2.0).powi(2)).exp()
}
