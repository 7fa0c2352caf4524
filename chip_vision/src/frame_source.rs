// THEORY:
// Frame acquisition.
//
// Camera mode only ever sees frames through the `FrameSource` trait, so a
// directory of stills, a synthetic conveyor and the "no device" placeholder
// are interchangeable. Every failure is a `FrameError`; the tick loop treats
// them all as recoverable.

use crate::config::{SceneConfig, StationConfig};
use crate::core_modules::color_profile::ColorProfile;
use crate::core_modules::tracker::ChipTracker;
use crate::error::{FrameError, Result};
use image::{Rgb, RgbImage};
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

pub const BACKGROUND_RGB: [u8; 3] = [50, 50, 50];
pub const BELT_RGB: [u8; 3] = [75, 180, 60];
pub const BELT_STRIPE_RGB: [u8; 3] = [55, 140, 40];
pub const BELT_EDGE_RGB: [u8; 3] = [200, 200, 200];
const STRIPE_SPACING: i32 = 100;

pub trait FrameSource: Send {
    fn read_frame(&mut self) -> std::result::Result<RgbImage, FrameError>;
}

/// Fills the clipped intersection of a rectangle with the image.
pub fn fill_rect(image: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, color: [u8; 3]) {
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = (x + width as i32).clamp(0, image.width() as i32) as u32;
    let y1 = (y + height as i32).clamp(0, image.height() as i32) as u32;
    for py in y0..y1 {
        for px in x0..x1 {
            image.put_pixel(px, py, Rgb(color));
        }
    }
}

/// Gray floor, green belt with stripes scrolled by `tick`, light belt edges.
pub fn conveyor_background(scene: &SceneConfig, tick: u64) -> RgbImage {
    let mut frame = RgbImage::from_pixel(scene.width, scene.height, Rgb(BACKGROUND_RGB));
    let (belt_x, belt_width) = scene.belt();
    fill_rect(&mut frame, belt_x, 0, belt_width, scene.height, BELT_RGB);

    let offset = ((tick as i64 * scene.conveyor_speed as i64) % STRIPE_SPACING as i64) as i32;
    let mut y = offset - STRIPE_SPACING;
    while y < scene.height as i32 {
        fill_rect(&mut frame, belt_x, y, belt_width, 2, BELT_STRIPE_RGB);
        y += STRIPE_SPACING;
    }

    fill_rect(&mut frame, belt_x - 1, 0, 3, scene.height, BELT_EDGE_RGB);
    fill_rect(&mut frame, belt_x + belt_width as i32 - 1, 0, 3, scene.height, BELT_EDGE_RGB);
    frame
}

/// Sorted still images from a directory, played back once as a camera feed.
pub struct DirectorySource {
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
                .unwrap_or(false);
            if is_image {
                files.push(path);
            }
        }
        files.sort();
        info!("Frame directory {}: {} images", dir.display(), files.len());
        Ok(Self { files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for DirectorySource {
    fn read_frame(&mut self) -> std::result::Result<RgbImage, FrameError> {
        let path = self.files.get(self.next).ok_or(FrameError::Exhausted)?;
        self.next += 1;
        image::open(path)
            .map(|image| image.to_rgb8())
            .map_err(|e| FrameError::Decode(format!("{}: {e}", path.display())))
    }
}

/// A simulated camera looking at a conveyor. Chips are drawn as solid blocks
/// in their class display colors, so the default profiles pick them up.
pub struct SyntheticSource {
    tracker: ChipTracker,
    scene: SceneConfig,
    noise: ChaCha8Rng,
    remaining: Option<u64>,
}

impl SyntheticSource {
    pub fn new(config: &StationConfig, seed: u64) -> Result<Self> {
        Ok(Self {
            tracker: ChipTracker::seeded(config, seed)?,
            scene: config.scene.clone(),
            noise: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            remaining: None,
        })
    }

    /// Stops with `Exhausted` after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }

    /// The chips currently in view, for checking what a detector should find.
    pub fn tracker(&self) -> &ChipTracker {
        &self.tracker
    }

    pub fn render(&mut self) -> RgbImage {
        let mut frame = conveyor_background(&self.scene, self.tracker.tick());
        let (belt_x, belt_width) = self.scene.belt();
        let belt_end = belt_x + belt_width as i32;
        for pixel in frame.pixels_mut() {
            if pixel.0 == BELT_RGB {
                for channel in pixel.0.iter_mut() {
                    let jitter: i16 = self.noise.gen_range(-10..10);
                    *channel = (*channel as i16 + jitter).clamp(0, 255) as u8;
                }
            }
        }
        for chip in self.tracker.chips() {
            let position = chip.position();
            if position.x + (chip.size().0 as i32) < belt_x || position.x > belt_end {
                continue;
            }
            let (width, height) = chip.size();
            let color = ColorProfile::default_for(chip.class()).display_rgb;
            fill_rect(&mut frame, position.x, position.y, width, height, color);
        }
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn read_frame(&mut self) -> std::result::Result<RgbImage, FrameError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(FrameError::Exhausted);
            }
            *remaining -= 1;
        }
        self.tracker.advance();
        Ok(self.render())
    }
}

/// Stands in for a camera that is not attached.
pub struct PlaceholderSource {
    width: u32,
    height: u32,
}

impl PlaceholderSource {
    pub fn new(scene: &SceneConfig) -> Self {
        Self {
            width: scene.width,
            height: scene.height,
        }
    }

    /// The blank frame shown in place of a live one.
    pub fn frame(&self) -> RgbImage {
        RgbImage::new(self.width, self.height)
    }
}

impl FrameSource for PlaceholderSource {
    fn read_frame(&mut self) -> std::result::Result<RgbImage, FrameError> {
        Err(FrameError::Unavailable)
    }
}
