//! PNG frame sink.
//!
//! Rasterizes gathered body positions into an RGBA framebuffer and writes
//! one numbered PNG per presented frame. The sink is addressed in
//! simulation coordinates; the linear map to pixel space lives here.

use std::io;
use std::path::PathBuf;

use image::{Rgba, RgbaImage};

use crate::simulation::engine::Renderer;

pub struct FrameSink {
    img: RgbaImage,
    width: u32,
    height: u32,
    /// Simulation radius: [-radius, radius] maps onto the framebuffer.
    radius: f64,
    out_dir: PathBuf,
    frame: u32,
}

impl FrameSink {
    pub fn new(out_dir: PathBuf, width: u32, height: u32, radius: f64) -> io::Result<Self> {
        std::fs::create_dir_all(&out_dir)?;
        Ok(Self {
            img: RgbaImage::new(width, height),
            width,
            height,
            radius,
            out_dir,
            frame: 0,
        })
    }

    pub fn frames_written(&self) -> u32 {
        self.frame
    }
}

impl Renderer for FrameSink {
    fn clear(&mut self, background: [u8; 3]) {
        let fill = Rgba([background[0], background[1], background[2], 255]);
        for px in self.img.pixels_mut() {
            *px = fill;
        }
    }

    fn draw_point(&mut self, x: f64, y: f64, color: [u8; 3]) {
        // y grows upward in simulation space and downward in image space.
        let px = (x + self.radius) / (2.0 * self.radius) * self.width as f64;
        let py = (self.radius - y) / (2.0 * self.radius) * self.height as f64;
        if px < 0.0 || py < 0.0 {
            return;
        }
        let (px, py) = (px as u32, py as u32);
        if px < self.width && py < self.height {
            self.img
                .put_pixel(px, py, Rgba([color[0], color[1], color[2], 255]));
        }
    }

    fn present(&mut self) -> io::Result<()> {
        let path = self.out_dir.join(format!("frame_{:05}.png", self.frame));
        self.img
            .save(&path)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.frame += 1;
        Ok(())
    }
}
