// THEORY (single-pixel color space):
// The `Pixel` module is the smallest unit of the classifier. It is a "dumb" data
// container for one RGB pixel plus the conversion into the hue-saturation-value
// space every color decision in this crate is made in.
//
// HSV uses the 8-bit convention common to camera tooling:
// - hue        0..=180 (degrees halved so it fits a byte)
// - saturation 0..=255 (chroma / value)
// - value      0..=255 (max channel)
//
// Everything here is single-pixel. Region statistics (means, deviations,
// masks) live in `classifier` and `mask`.

pub mod pixel {
    pub type Channel = u8;
    pub type NormalizedChannel = f32;

    /// Upper bound of each HSV channel (inclusive).
    pub const HSV_MAX: [u8; 3] = [180, 255, 255];

    /// A pixel in 8-bit HSV space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hsv {
        pub hue: u8,
        pub saturation: u8,
        pub value: u8,
    }

    impl Hsv {
        pub fn new(hue: u8, saturation: u8, value: u8) -> Self {
            Self { hue, saturation, value }
        }

        pub fn channels(&self) -> [u8; 3] {
            [self.hue, self.saturation, self.value]
        }
    }

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Pixel {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
        red_normalized: NormalizedChannel,
        green_normalized: NormalizedChannel,
        blue_normalized: NormalizedChannel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                red_normalized: red as NormalizedChannel / 255.0,
                green_normalized: green as NormalizedChannel / 255.0,
                blue_normalized: blue as NormalizedChannel / 255.0,
            }
        }

        fn max_channel(&self) -> NormalizedChannel {
            self.red_normalized
                .max(self.green_normalized.max(self.blue_normalized))
        }

        fn min_channel(&self) -> NormalizedChannel {
            self.red_normalized
                .min(self.green_normalized.min(self.blue_normalized))
        }

        /// Hue angle in degrees [0, 360).
        pub fn hue(&self) -> f32 {
            let maximum_channel = self.max_channel();
            let chroma = maximum_channel - self.min_channel();

            if chroma <= 1e-6 {
                return 0.0;
            }

            let (base_difference, sector_offset) = if maximum_channel == self.red_normalized {
                (self.green_normalized - self.blue_normalized, 0.0)
            } else if maximum_channel == self.green_normalized {
                (self.blue_normalized - self.red_normalized, 2.0)
            } else {
                (self.red_normalized - self.green_normalized, 4.0)
            };

            let mut hue_degrees = (base_difference / chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        /// HSV saturation in [0, 1]: chroma / value.
        pub fn saturation_hsv(&self) -> f32 {
            let maximum_channel = self.max_channel();
            if maximum_channel <= 1e-6 {
                return 0.0;
            }
            (maximum_channel - self.min_channel()) / maximum_channel
        }

        /// HSV value in [0, 1]: the brightest channel.
        pub fn value_hsv(&self) -> f32 {
            self.max_channel()
        }

        /// Converts to the 8-bit HSV scale used by color profiles.
        pub fn to_hsv(&self) -> Hsv {
            let hue = (self.hue() / 2.0).round().min(HSV_MAX[0] as f32);
            Hsv {
                hue: hue as u8,
                saturation: (self.saturation_hsv() * 255.0).round() as u8,
                value: self.red.max(self.green.max(self.blue)),
            }
        }
    }

    impl From<[Channel; 3]> for Pixel {
        fn from(channels: [Channel; 3]) -> Self {
            Pixel::new(channels[0], channels[1], channels[2])
        }
    }

    impl From<&image::Rgb<u8>> for Pixel {
        fn from(rgb: &image::Rgb<u8>) -> Self {
            Pixel::from(rgb.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn pure_colors_land_on_expected_hues() {
        assert_eq!(Pixel::new(255, 0, 0).to_hsv(), Hsv::new(0, 255, 255));
        assert_eq!(Pixel::new(0, 255, 0).to_hsv(), Hsv::new(60, 255, 255));
        assert_eq!(Pixel::new(0, 0, 255).to_hsv(), Hsv::new(120, 255, 255));
    }

    #[test]
    fn grays_have_no_saturation() {
        let hsv = Pixel::new(200, 200, 200).to_hsv();
        assert_eq!(hsv.hue, 0);
        assert_eq!(hsv.saturation, 0);
        assert_eq!(hsv.value, 200);
        assert_eq!(Pixel::new(0, 0, 0).to_hsv(), Hsv::default());
    }

    #[test]
    fn gold_display_color_is_a_yellow_orange() {
        // 255,215,0 -> ~50.6 degrees -> 25 on the halved scale.
        let hsv = Pixel::new(255, 215, 0).to_hsv();
        assert_eq!(hsv.hue, 25);
        assert_eq!(hsv.saturation, 255);
        assert_eq!(hsv.value, 255);
    }
}
