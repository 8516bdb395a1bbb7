//! blastfield
//!
//! Software-rendered expanding blasts over a background raster. Each blast
//! grows on a fixed tick, leaves a translucent gas cloud behind and drags a
//! displaced, noisy copy of the scene along as its shockwave.
//!
//! The core is window-agnostic: `BlastEngine` takes clicks, resizes and
//! backgrounds and hands back ARGB frames. The `sdl` feature adds the window
//! front-end used by the `blastfield` binary.

pub mod background;
pub mod blast;
pub mod color;
pub mod command;
pub mod compositor;
pub mod config;
#[cfg(unix)]
pub mod control;
pub mod display;
pub mod distortion;
pub mod engine;
pub mod error;
pub mod mqtt;
pub mod noise;
pub mod scheduler;
pub mod sprite;
pub mod util;

pub use blast::{Blast, BlastSet, BlastState, TickReport};
pub use command::Command;
pub use compositor::Compositor;
pub use config::{BlastConfig, MqttConfig, PERCENT_OPTIONS};
pub use display::PixelBuffer;
pub use engine::{BlastEngine, Flow};
pub use error::{BlastError, Result};
pub use scheduler::{Scheduler, SchedulerHandle};
