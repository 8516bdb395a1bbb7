//! Background images
//!
//! Decoding is done with the `image` crate; the compositor only ever sees
//! an ARGB `PixelBuffer`.

use crate::color;
use crate::display::PixelBuffer;
use crate::error::Result;
use image::RgbaImage;
use std::path::Path;

/// File extensions offered when browsing for a background
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "bmp"];

/// Whether a path looks like a supported image file
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|&ext| ext == e)
        })
        .unwrap_or(false)
}

/// Decode an image file into an ARGB buffer
pub fn load(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    let img = image::open(path)?.to_rgba8();
    Ok(from_rgba(&img))
}

/// Convert an RGBA image into an ARGB buffer
pub fn from_rgba(img: &RgbaImage) -> PixelBuffer {
    let (width, height) = img.dimensions();
    let pixels = img
        .pixels()
        .map(|px| {
            let [r, g, b, a] = px.0;
            color::pack(a as i32, r as i32, g as i32, b as i32)
        })
        .collect();
    PixelBuffer::from_argb(width, height, pixels)
        .unwrap_or_else(|| PixelBuffer::with_size(width, height))
}

/// Default scene shown before any image is chosen: an opaque dusk gradient
pub fn default_scene(width: u32, height: u32) -> PixelBuffer {
    let mut buffer = PixelBuffer::with_size(width, height);
    buffer.fill_vertical_gradient((18, 24, 58), (196, 112, 64));
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported("a/b/photo.JPG"));
        assert!(is_supported("scene.png"));
        assert!(!is_supported("notes.txt"));
        assert!(!is_supported("no_extension"));
    }

    #[test]
    fn test_from_rgba_reorders_channels() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(1, 0, image::Rgba([10, 20, 30, 40]));
        let buf = from_rgba(&img);
        assert_eq!(buf.get(1, 0), Some(0x280A_141E));
        assert_eq!(buf.get(0, 0), Some(color::TRANSPARENT));
    }

    #[test]
    fn test_load_garbage_is_error() {
        let path = std::env::temp_dir().join(format!("blastfield-bad-{}.png", std::process::id()));
        std::fs::write(&path, b"definitely not a png").unwrap();
        let result = load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_scene_is_opaque() {
        let buf = default_scene(10, 10);
        assert_eq!(buf.opaque_count(), 100);
    }
}
