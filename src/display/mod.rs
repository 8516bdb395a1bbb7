mod pixel_buffer;
#[cfg(feature = "sdl")]
mod window;

pub use pixel_buffer::PixelBuffer;
#[cfg(feature = "sdl")]
pub use window::{Display, InputEvent, RenderTarget};

pub const DEFAULT_WIDTH: u32 = 1100;
pub const DEFAULT_HEIGHT: u32 = 850;
