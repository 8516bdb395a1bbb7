use super::PixelBuffer;
use crate::error::{BlastError, Result};

use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

pub struct Display {
    canvas: Canvas<Window>,
    event_pump: EventPump,
    width: u32,
    height: u32,
}

pub struct RenderTarget<'a> {
    texture: Texture<'a>,
    width: u32,
    height: u32,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Quit,
    KeyDown(Keycode),
    /// Pointer moved with the left button held
    MouseDrag { x: i32, y: i32 },
    /// Any button released; places a blast
    MouseUp { x: i32, y: i32 },
    Resized { width: u32, height: u32 },
}

fn sdl_err(e: impl ToString) -> BlastError {
    BlastError::Display(e.to_string())
}

impl Display {
    /// Create a resizable window with the given client size
    pub fn with_options(
        title: &str,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<(Self, TextureCreator<WindowContext>)> {
        let sdl_context = sdl2::init().map_err(sdl_err)?;
        let video_subsystem = sdl_context.video().map_err(sdl_err)?;

        let window = video_subsystem
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(sdl_err)?;

        let mut canvas_builder = window.into_canvas().accelerated();
        if vsync {
            canvas_builder = canvas_builder.present_vsync();
        }
        let canvas = canvas_builder.build().map_err(sdl_err)?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump().map_err(sdl_err)?;

        Ok((
            Self {
                canvas,
                event_pump,
                width,
                height,
            },
            texture_creator,
        ))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize the window client area (a Resized event follows)
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas
            .window_mut()
            .set_size(width, height)
            .map_err(sdl_err)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn present(&mut self, target: &mut RenderTarget, buffer: &PixelBuffer) -> Result<()> {
        if buffer.width() != target.width || buffer.height() != target.height {
            // Frame from before a resize; the next one will match
            return Ok(());
        }
        target
            .texture
            .update(None, buffer.as_bytes(), (buffer.width() * 4) as usize)
            .map_err(sdl_err)?;

        self.canvas.clear();
        self.canvas
            .copy(&target.texture, None, None)
            .map_err(sdl_err)?;
        self.canvas.present();
        Ok(())
    }

    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();

        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => events.push(InputEvent::Quit),
                Event::KeyDown {
                    keycode: Some(k), ..
                } => events.push(InputEvent::KeyDown(k)),
                Event::MouseMotion {
                    x, y, mousestate, ..
                } if mousestate.left() => events.push(InputEvent::MouseDrag { x, y }),
                Event::MouseButtonUp { x, y, .. } => events.push(InputEvent::MouseUp { x, y }),
                Event::Window {
                    win_event: WindowEvent::SizeChanged(w, h),
                    ..
                } if w > 0 && h > 0 => {
                    self.width = w as u32;
                    self.height = h as u32;
                    events.push(InputEvent::Resized {
                        width: w as u32,
                        height: h as u32,
                    });
                },
                _ => {},
            }
        }

        events
    }
}

impl<'a> RenderTarget<'a> {
    /// Create a streaming ARGB8888 texture of the given size
    pub fn with_size(
        texture_creator: &'a TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(sdl_err)?;
        Ok(Self {
            texture,
            width,
            height,
        })
    }
}
