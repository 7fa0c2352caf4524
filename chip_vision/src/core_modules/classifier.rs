// THEORY:
// The `Classifier` decides which class a patch of color belongs to. It owns one
// `ColorProfile` per class and answers three questions:
//
// 1.  **classify**: does a single HSV sample (or the mean of a region) fall inside
//     a profile? Profiles are tested in declaration order GOLD, SILVER, BRONZE and
//     the first match wins, so overlapping profiles stay deterministic. No match
//     is a valid negative result, not an error.
// 2.  **detect**: where are the chips in a frame? The frame is blurred, converted
//     to HSV once, and for every class an in-range mask is built, cleaned with
//     morphology (close, then open) and split into size-filtered regions.
//     A color inside two profiles produces a region in both masks; the
//     later-class region is dropped when its box overlaps one already kept, so
//     each chip is reported once, with the same precedence `classify` uses.
// 3.  **calibrate**: given a region known to show exactly one chip of a class,
//     what profile fits it? The box is mean ± (std + tolerance) per channel,
//     clipped to the channel range. Calibration is one-shot: it replaces the
//     stored profile until the next calibration or a reset.

use crate::config::DetectorConfig;
use crate::core_modules::blob_detector::{BoundingBox, blob_detector};
use crate::core_modules::chip::ChipClass;
use crate::core_modules::color_profile::ColorProfile;
use crate::core_modules::mask::Mask;
use crate::core_modules::pixel::pixel::{HSV_MAX, Hsv, Pixel};
use crate::error::{Error, Result};
use image::RgbImage;
use log::info;

/// A chip-sized colored region found in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class: ChipClass,
    pub bounding_box: BoundingBox,
    pub centroid: (f64, f64),
    pub area: usize,
}

/// Per-channel mean and population standard deviation of an HSV region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvStats {
    pub mean: [f64; 3],
    pub std_dev: [f64; 3],
}

impl HsvStats {
    pub fn from_samples(samples: &[Hsv]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::InvalidInput("no samples in region".into()));
        }
        let count = samples.len() as f64;
        let mut mean = [0.0; 3];
        for sample in samples {
            for (m, c) in mean.iter_mut().zip(sample.channels()) {
                *m += c as f64;
            }
        }
        mean.iter_mut().for_each(|m| *m /= count);

        let mut variance = [0.0; 3];
        for sample in samples {
            for ((v, c), m) in variance.iter_mut().zip(sample.channels()).zip(mean) {
                *v += (c as f64 - m).powi(2);
            }
        }
        let std_dev = variance.map(|v| (v / count).sqrt());
        Ok(Self { mean, std_dev })
    }

    /// The mean rounded back into a sample.
    pub fn mean_sample(&self) -> Hsv {
        let [h, s, v] = self.mean.map(|m| m.round().clamp(0.0, 255.0) as u8);
        Hsv::new(h, s, v)
    }
}

/// `mean ± (std + tolerance)`, clipped to the channel range and truncated.
pub fn calibration_bounds(stats: &HsvStats, tolerance: [f64; 3]) -> ([u8; 3], [u8; 3]) {
    let mut lower = [0u8; 3];
    let mut upper = [0u8; 3];
    for i in 0..3 {
        let spread = stats.std_dev[i] + tolerance[i];
        lower[i] = (stats.mean[i] - spread).max(0.0) as u8;
        upper[i] = (stats.mean[i] + spread).min(HSV_MAX[i] as f64) as u8;
    }
    (lower, upper)
}

/// Converts an RGB frame to a flat row-major HSV buffer.
pub fn hsv_image(frame: &RgbImage) -> Vec<Hsv> {
    frame.pixels().map(|p| Pixel::from(p).to_hsv()).collect()
}

pub struct Classifier {
    profiles: [ColorProfile; 3],
    config: DetectorConfig,
}

impl Classifier {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            profiles: ColorProfile::defaults(),
            config,
        }
    }

    pub fn profiles(&self) -> &[ColorProfile; 3] {
        &self.profiles
    }

    pub fn profile(&self, class: ChipClass) -> &ColorProfile {
        &self.profiles[class.index()]
    }

    pub fn set_profile(&mut self, profile: ColorProfile) {
        let index = profile.class.index();
        self.profiles[index] = profile;
    }

    /// Restores the default profiles, discarding any calibration.
    pub fn reset_profiles(&mut self) {
        self.profiles = ColorProfile::defaults();
    }

    pub fn classify(&self, sample: Hsv) -> Option<ChipClass> {
        self.profiles
            .iter()
            .find(|profile| profile.contains(sample))
            .map(|profile| profile.class)
    }

    /// Classifies a region by its mean color. An empty region is not detected.
    pub fn classify_region(&self, samples: &[Hsv]) -> Option<ChipClass> {
        let stats = HsvStats::from_samples(samples).ok()?;
        self.classify(stats.mean_sample())
    }

    pub fn detect(&self, frame: &RgbImage) -> Vec<Detection> {
        let (width, height) = frame.dimensions();
        let hsv = if self.config.blur_sigma > 0.0 {
            hsv_image(&image::imageops::blur(frame, self.config.blur_sigma))
        } else {
            hsv_image(frame)
        };

        let mut detections = Vec::new();
        for profile in &self.profiles {
            let mask = Mask::in_range(&hsv, width, height, profile)
                .close(self.config.kernel_size)
                .open(self.config.kernel_size);

            for region in
                blob_detector::find_blobs(&mask, self.config.min_area, self.config.max_area)
            {
                if detections.iter().any(|d: &Detection| {
                    d.class != profile.class && d.bounding_box.overlaps(&region.bounding_box)
                }) {
                    continue;
                }
                detections.push(Detection {
                    class: profile.class,
                    bounding_box: region.bounding_box,
                    centroid: region.centroid,
                    area: region.area,
                });
            }
        }
        detections
    }

    /// Fits a profile to samples of one class. Does not store it.
    pub fn calibrate(&self, samples: &[Hsv], class: ChipClass) -> Result<ColorProfile> {
        let stats = HsvStats::from_samples(samples)?;
        let (lower, upper) = calibration_bounds(&stats, self.config.calibration_tolerance);
        Ok(ColorProfile {
            lower,
            upper,
            ..self.profile(class).clone()
        })
    }

    /// Calibrates from the centred square of a frame and stores the result.
    /// On error the previous profile is kept.
    pub fn calibrate_frame(&mut self, frame: &RgbImage, class: ChipClass) -> Result<&ColorProfile> {
        let samples = centre_samples(frame, self.config.calibration_roi);
        let profile = self.calibrate(&samples, class)?;
        info!(
            "Calibrated {}: {:?} - {:?} from {} samples",
            class,
            profile.lower,
            profile.upper,
            samples.len()
        );
        self.set_profile(profile);
        Ok(self.profile(class))
    }
}

fn centre_samples(frame: &RgbImage, half: u32) -> Vec<Hsv> {
    let (width, height) = frame.dimensions();
    let (cx, cy) = (width / 2, height / 2);
    let (x0, x1) = (cx.saturating_sub(half), (cx + half).min(width));
    let (y0, y1) = (cy.saturating_sub(half), (cy + half).min(height));

    let mut samples = Vec::with_capacity(((x1 - x0) * (y1 - y0)) as usize);
    for y in y0..y1 {
        for x in x0..x1 {
            samples.push(Pixel::from(frame.get_pixel(x, y)).to_hsv());
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame_with(rects: &[([u8; 3], u32, u32, u32, u32)]) -> RgbImage {
        let mut frame = RgbImage::from_pixel(320, 240, Rgb([50, 50, 50]));
        for &(color, x0, y0, w, h) in rects {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    frame.put_pixel(x, y, Rgb(color));
                }
            }
        }
        frame
    }

    #[test]
    fn classify_uses_declaration_order() {
        let classifier = Classifier::new(DetectorConfig::default());
        // Inside both GOLD and BRONZE boxes.
        let overlap = Hsv::new(22, 150, 150);
        assert!(classifier.profile(ChipClass::Bronze).contains(overlap));
        assert_eq!(classifier.classify(overlap), Some(ChipClass::Gold));
        assert_eq!(classifier.classify(Hsv::new(100, 200, 200)), None);
    }

    #[test]
    fn empty_region_is_not_detected() {
        let classifier = Classifier::new(DetectorConfig::default());
        assert_eq!(classifier.classify_region(&[]), None);
        assert_eq!(
            classifier.classify_region(&[Hsv::new(0, 10, 200), Hsv::new(0, 20, 180)]),
            Some(ChipClass::Silver)
        );
    }

    #[test]
    fn calibration_matches_worked_example() {
        let stats = HsvStats {
            mean: [30.0, 150.0, 200.0],
            std_dev: [5.0, 10.0, 10.0],
        };
        let (lower, upper) = calibration_bounds(&stats, [15.0, 50.0, 50.0]);
        assert_eq!(lower, [10, 90, 140]);
        assert_eq!(upper, [50, 210, 255]);
    }

    #[test]
    fn calibrate_from_samples() {
        let classifier = Classifier::new(DetectorConfig::default());
        let samples = [Hsv::new(25, 140, 190), Hsv::new(35, 160, 210)];
        let profile = classifier.calibrate(&samples, ChipClass::Gold).unwrap();
        assert_eq!(profile.lower, [10, 90, 140]);
        assert_eq!(profile.upper, [50, 210, 255]);
        assert_eq!(profile.value_multiplier, 10);
        assert_eq!(profile.display_rgb, [255, 215, 0]);
    }

    #[test]
    fn failed_calibration_keeps_previous_profile() {
        let mut classifier = Classifier::new(DetectorConfig::default());
        let before = classifier.profile(ChipClass::Bronze).clone();
        let empty = RgbImage::new(0, 0);
        assert!(matches!(
            classifier.calibrate_frame(&empty, ChipClass::Bronze),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(classifier.profile(ChipClass::Bronze), &before);
    }

    #[test]
    fn calibrate_frame_replaces_profile_until_reset() {
        let mut classifier = Classifier::new(DetectorConfig::default());
        let frame = RgbImage::from_pixel(300, 300, Rgb([0, 0, 255]));
        let profile = classifier.calibrate_frame(&frame, ChipClass::Silver).unwrap();
        assert_eq!(profile.lower, [105, 205, 205]);
        assert_eq!(profile.upper, [135, 255, 255]);
        assert_eq!(classifier.classify(Hsv::new(120, 255, 255)), Some(ChipClass::Silver));

        classifier.reset_profiles();
        assert_eq!(classifier.classify(Hsv::new(120, 255, 255)), None);
    }

    #[test]
    fn detects_each_class_by_color() {
        let classifier = Classifier::new(DetectorConfig::default());
        let frame = frame_with(&[
            ([255, 215, 0], 10, 10, 60, 50),
            ([200, 200, 200], 100, 20, 60, 50),
            ([200, 100, 0], 200, 120, 60, 50),
        ]);
        let mut detections = classifier.detect(&frame);
        detections.sort_by_key(|d| d.class.index());
        let classes: Vec<ChipClass> = detections.iter().map(|d| d.class).collect();
        assert_eq!(classes, ChipClass::ALL.to_vec());

        let gold = &detections[0];
        assert!((gold.centroid.0 - 39.5).abs() < 1.5);
        assert!((gold.centroid.1 - 34.5).abs() < 1.5);
        assert!(gold.area > 2500 && gold.area < 3500);
    }

    #[test]
    fn overlapping_profiles_report_one_detection() {
        let classifier = Classifier::new(DetectorConfig::default());
        // RGB(150,127,62) is HSV(22,150,150): inside both GOLD and BRONZE.
        let frame = frame_with(&[([150, 127, 62], 50, 50, 80, 60)]);
        let detections = classifier.detect(&frame);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class, ChipClass::Gold);
    }

    #[test]
    fn size_filter_drops_noise_and_background() {
        let classifier = Classifier::new(DetectorConfig::default());
        // 20x20 gold speck is below min_area; a thin silver line is opened away.
        let frame = frame_with(&[
            ([255, 215, 0], 10, 10, 20, 20),
            ([200, 200, 200], 150, 0, 3, 240),
        ]);
        assert!(classifier.detect(&frame).is_empty());
    }
}
