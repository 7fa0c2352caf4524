// THEORY:
// Chip artwork is photographed on a green screen. Before a template can be
// blended onto the belt the green has to go: every pixel whose HSV lies in the
// chroma-key box (hue 35..=85, saturation and value at least 40) becomes fully
// transparent, everything else fully opaque.
//
// Templates are optional. A missing or unreadable file is logged and replaced
// with a solid block in the class display color, so the station always has
// something to draw.

use crate::core_modules::chip::ChipClass;
use crate::core_modules::color_profile::ColorProfile;
use crate::core_modules::pixel::pixel::Pixel;
use crate::error::Result;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use log::{info, warn};
use std::path::Path;

pub const CHROMA_KEY_LOWER: [u8; 3] = [35, 40, 40];
pub const CHROMA_KEY_UPPER: [u8; 3] = [85, 255, 255];

fn is_key_green(pixel: &Rgb<u8>) -> bool {
    let channels = Pixel::from(pixel).to_hsv().channels();
    (0..3).all(|i| CHROMA_KEY_LOWER[i] <= channels[i] && channels[i] <= CHROMA_KEY_UPPER[i])
}

/// Copies `image` into RGBA, clearing the alpha of chroma-key green pixels.
pub fn remove_green_background(image: &RgbImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y);
        let alpha = if is_key_green(pixel) { 0 } else { 255 };
        Rgba([pixel[0], pixel[1], pixel[2], alpha])
    })
}

/// An opaque block of the class display color.
pub fn placeholder(class: ChipClass, width: u32, height: u32) -> RgbaImage {
    let [r, g, b] = ColorProfile::default_for(class).display_rgb;
    RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]))
}

/// One keyed, chip-sized template per class.
pub struct ChipTemplates {
    templates: [RgbaImage; 3],
}

impl ChipTemplates {
    /// Loads `{gold,silver,bronze}.png` from `dir`, falling back to placeholders.
    pub fn load(dir: &Path, width: u32, height: u32) -> Self {
        let templates = ChipClass::ALL.map(|class| {
            let path = dir.join(format!("{}.png", class.name().to_lowercase()));
            match load_template(&path, width, height) {
                Ok(template) => {
                    info!("Loaded {} template from {}", class, path.display());
                    template
                }
                Err(e) => {
                    warn!("{} template unavailable ({}): {}; using placeholder", class, path.display(), e);
                    placeholder(class, width, height)
                }
            }
        });
        Self { templates }
    }

    pub fn placeholders(width: u32, height: u32) -> Self {
        Self {
            templates: ChipClass::ALL.map(|class| placeholder(class, width, height)),
        }
    }

    pub fn get(&self, class: ChipClass) -> &RgbaImage {
        &self.templates[class.index()]
    }
}

fn load_template(path: &Path, width: u32, height: u32) -> Result<RgbaImage> {
    let image = image::open(path)?.to_rgb8();
    let keyed = remove_green_background(&image);
    Ok(imageops::resize(&keyed, width, height, FilterType::Triangle))
}
