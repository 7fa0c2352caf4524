// THEORY:
// The renderer turns pipeline state into an RGB frame for snapshots. It never
// feeds anything back into the engine.
//
// Simulated modes draw the scrolling belt, the scan line and every chip as its
// keyed template with a green (authentic) or red (fake) border. Camera mode
// draws on top of the captured frame instead: detections are outlined in their
// class display color and tracked chips get the same authenticity border.

use chip_vision::config::SceneConfig;
use chip_vision::core_modules::template::ChipTemplates;
use chip_vision::frame_source::{conveyor_background, fill_rect};
use chip_vision::{Chip, ChipPipeline};
use image::{RgbImage, RgbaImage};

pub const SCAN_LINE_RGB: [u8; 3] = [0, 255, 255];
pub const REAL_RGB: [u8; 3] = [0, 255, 0];
pub const FAKE_RGB: [u8; 3] = [255, 0, 0];

/// Alpha-blends `overlay` onto `frame` with its top-left corner at (x, y), clipped.
pub fn blend(frame: &mut RgbImage, overlay: &RgbaImage, x: i32, y: i32) {
    for (ox, oy, pixel) in overlay.enumerate_pixels() {
        let (fx, fy) = (x + ox as i32, y + oy as i32);
        if fx < 0 || fy < 0 || fx >= frame.width() as i32 || fy >= frame.height() as i32 {
            continue;
        }
        let alpha = pixel[3] as u32;
        if alpha == 0 {
            continue;
        }
        let target = frame.get_pixel_mut(fx as u32, fy as u32);
        for c in 0..3 {
            target[c] = ((pixel[c] as u32 * alpha + target[c] as u32 * (255 - alpha)) / 255) as u8;
        }
    }
}

pub fn outline(frame: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, color: [u8; 3]) {
    const THICKNESS: u32 = 2;
    fill_rect(frame, x, y, width, THICKNESS, color);
    fill_rect(frame, x, y + height as i32 - THICKNESS as i32, width, THICKNESS, color);
    fill_rect(frame, x, y, THICKNESS, height, color);
    fill_rect(frame, x + width as i32 - THICKNESS as i32, y, THICKNESS, height, color);
}

fn authenticity_color(chip: &Chip) -> [u8; 3] {
    if chip.is_authentic() { REAL_RGB } else { FAKE_RGB }
}

pub struct Renderer {
    scene: SceneConfig,
    templates: ChipTemplates,
}

impl Renderer {
    pub fn new(scene: SceneConfig, templates: ChipTemplates) -> Self {
        Self { scene, templates }
    }

    fn draw_scan_line(&self, frame: &mut RgbImage) {
        let (belt_x, belt_width) = self.scene.belt();
        fill_rect(frame, belt_x, self.scene.scan_line() - 1, belt_width, 3, SCAN_LINE_RGB);
    }

    pub fn conveyor(&self, pipeline: &ChipPipeline) -> RgbImage {
        let mut frame = conveyor_background(&self.scene, pipeline.tracker().tick());
        self.draw_scan_line(&mut frame);
        for chip in pipeline.chips() {
            let position = chip.position();
            let (width, height) = chip.size();
            blend(&mut frame, self.templates.get(chip.class()), position.x, position.y);
            outline(&mut frame, position.x, position.y, width, height, authenticity_color(chip));
        }
        frame
    }

    pub fn camera(&self, captured: &RgbImage, pipeline: &ChipPipeline) -> RgbImage {
        let mut frame = captured.clone();
        self.draw_scan_line(&mut frame);
        for detection in pipeline.last_detections() {
            let b = detection.bounding_box;
            let color = pipeline.classifier().profile(detection.class).display_rgb;
            outline(&mut frame, b.x as i32 - 3, b.y as i32 - 3, b.width + 6, b.height + 6, color);
        }
        for chip in pipeline.chips().iter().filter(|c| c.missed_frames() == 0) {
            let position = chip.position();
            let (width, height) = chip.size();
            outline(&mut frame, position.x, position.y, width, height, authenticity_color(chip));
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chip_vision::{ChipClass, Command, RunMode, StationConfig};
    use image::{Rgb, Rgba};

    #[test]
    fn blend_respects_alpha_and_clips() {
        let mut frame = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let mut overlay = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        overlay.put_pixel(1, 0, Rgba([255, 255, 255, 0]));
        overlay.put_pixel(0, 1, Rgba([200, 100, 0, 128]));
        blend(&mut frame, &overlay, 3, -1);
        // Only overlay row 1 lands in the frame, at frame row 0.
        assert_eq!(frame.get_pixel(3, 0), &Rgb([100, 50, 0]));
        blend(&mut frame, &overlay, 0, 0);
        assert_eq!(frame.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(frame.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn conveyor_frame_shows_scan_line_and_chips() {
        let config = StationConfig::default();
        let mut pipeline = ChipPipeline::new(RunMode::Interactive, &config, 3).unwrap();
        pipeline.apply(Command::Spawn(Some(ChipClass::Gold)));
        for _ in 0..60 {
            pipeline.tick();
        }
        let renderer = Renderer::new(
            config.scene.clone(),
            ChipTemplates::placeholders(config.scene.chip_width, config.scene.chip_height),
        );
        let frame = renderer.conveyor(&pipeline);
        assert_eq!(frame.dimensions(), (1280, 720));
        assert_eq!(frame.get_pixel(640, 360).0, SCAN_LINE_RGB);

        let chip = &pipeline.chips()[0];
        let (x, y) = (chip.position().x as u32, chip.position().y as u32);
        let border = if chip.is_authentic() { REAL_RGB } else { FAKE_RGB };
        assert_eq!(frame.get_pixel(x, y).0, border);
        assert_eq!(frame.get_pixel(x + 60, y + 40).0, [255, 215, 0]);
    }
}
