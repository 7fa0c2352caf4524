// THEORY:
// A `ColorProfile` is the closed, axis-aligned HSV box that says "pixels like
// this belong to a chip of this class", plus the display color the renderer
// uses and the value-multiplier hint printed on the chip face. Profiles are
// static defaults until a calibration replaces one of them.

use crate::core_modules::chip::ChipClass;
use crate::core_modules::pixel::pixel::Hsv;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorProfile {
    pub class: ChipClass,
    /// Inclusive lower HSV bound.
    pub lower: [u8; 3],
    /// Inclusive upper HSV bound.
    pub upper: [u8; 3],
    /// RGB color used when drawing chips of this class.
    pub display_rgb: [u8; 3],
    /// Credits per positional unit (GOLD 10, SILVER 1); BRONZE multiplies digits instead.
    pub value_multiplier: u32,
}

impl ColorProfile {
    pub fn contains(&self, hsv: Hsv) -> bool {
        let channels = hsv.channels();
        (0..3).all(|i| self.lower[i] <= channels[i] && channels[i] <= self.upper[i])
    }

    /// Default profile for a class.
    pub fn default_for(class: ChipClass) -> Self {
        match class {
            ChipClass::Gold => Self {
                class,
                lower: [20, 100, 100],
                upper: [35, 255, 255],
                display_rgb: [255, 215, 0],
                value_multiplier: 10,
            },
            ChipClass::Silver => Self {
                class,
                lower: [0, 0, 100],
                upper: [180, 50, 255],
                display_rgb: [200, 200, 200],
                value_multiplier: 1,
            },
            ChipClass::Bronze => Self {
                class,
                lower: [5, 50, 50],
                upper: [25, 255, 200],
                display_rgb: [200, 100, 0],
                value_multiplier: 0,
            },
        }
    }

    /// The three default profiles in precedence order.
    pub fn defaults() -> [ColorProfile; 3] {
        ChipClass::ALL.map(Self::default_for)
    }
}
