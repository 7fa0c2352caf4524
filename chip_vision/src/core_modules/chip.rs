// THEORY:
// The `Chip` is the record type at the centre of the engine: one token moving
// across the scene. It replaces the loose per-mode dictionaries with a fixed set
// of fields. Identity, class, digits, authenticity and value are decided once at
// creation and never change; only the position (and the one-shot `crossed`
// flag) evolve, and only the tracker is allowed to touch them.

use crate::core_modules::value_rule;
use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three chip classes, in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChipClass {
    Gold,
    Silver,
    Bronze,
}

impl ChipClass {
    /// Declaration order; also the order in which color profiles are tested.
    pub const ALL: [ChipClass; 3] = [ChipClass::Gold, ChipClass::Silver, ChipClass::Bronze];

    pub fn name(&self) -> &'static str {
        match self {
            ChipClass::Gold => "GOLD",
            ChipClass::Silver => "SILVER",
            ChipClass::Bronze => "BRONZE",
        }
    }

    /// How many digits a chip of this class carries.
    pub fn digit_count(&self) -> usize {
        match self {
            ChipClass::Gold | ChipClass::Silver => 3,
            ChipClass::Bronze => 2,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ChipClass::Gold => 0,
            ChipClass::Silver => 1,
            ChipClass::Bronze => 2,
        }
    }
}

impl fmt::Display for ChipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unique, monotonically assigned chip identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChipId(pub u64);

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pixel coordinate of a chip's top-left corner. `y` is the transit axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// The digits printed on a chip, validated against its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitSequence(Vec<u8>);

impl DigitSequence {
    /// Validates caller-supplied digits: correct length for the class, each 0..=9.
    pub fn new(class: ChipClass, digits: &[u8]) -> Result<Self> {
        if digits.len() != class.digit_count() {
            return Err(Error::InvalidInput(format!(
                "{} chips carry {} digits, got {}",
                class,
                class.digit_count(),
                digits.len()
            )));
        }
        if let Some(bad) = digits.iter().find(|&&d| d > 9) {
            return Err(Error::InvalidInput(format!("{bad} is not a decimal digit")));
        }
        Ok(Self(digits.to_vec()))
    }

    /// Draws digits for a new chip. GOLD and SILVER never lead with zero;
    /// BRONZE digits are 1..=9 so an authentic bronze chip is never worth 0.
    pub fn random<R: Rng + ?Sized>(class: ChipClass, rng: &mut R) -> Self {
        let digits = match class {
            ChipClass::Gold | ChipClass::Silver => vec![
                rng.gen_range(1..=9),
                rng.gen_range(0..=9),
                rng.gen_range(0..=9),
            ],
            ChipClass::Bronze => vec![rng.gen_range(1..=9), rng.gen_range(1..=9)],
        };
        Self(digits)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for DigitSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.0 {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// A classified, valued token moving through the scene.
#[derive(Debug, Clone)]
pub struct Chip {
    id: ChipId,
    class: ChipClass,
    position: Position,
    size: (u32, u32),
    digits: DigitSequence,
    is_authentic: bool,
    value: u32,
    crossed: bool,
    missed_frames: u32,
}

impl Chip {
    pub fn new(
        id: ChipId,
        class: ChipClass,
        position: Position,
        size: (u32, u32),
        digits: DigitSequence,
        is_authentic: bool,
    ) -> Self {
        let value = value_rule::chip_value(class, digits.as_slice(), is_authentic);
        Self {
            id,
            class,
            position,
            size,
            digits,
            is_authentic,
            value,
            crossed: false,
            missed_frames: 0,
        }
    }

    pub fn id(&self) -> ChipId {
        self.id
    }

    pub fn class(&self) -> ChipClass {
        self.class
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn digits(&self) -> &DigitSequence {
        &self.digits
    }

    pub fn is_authentic(&self) -> bool {
        self.is_authentic
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn crossed(&self) -> bool {
        self.crossed
    }

    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    /// Centre of the chip box, used for camera-mode association.
    pub fn centroid(&self) -> (f64, f64) {
        (
            self.position.x as f64 + self.size.0 as f64 / 2.0,
            self.position.y as f64 + self.size.1 as f64 / 2.0,
        )
    }

    pub(crate) fn advance(&mut self, velocity: i32) {
        self.position.y += velocity;
    }

    pub(crate) fn observe_at(&mut self, position: Position, size: (u32, u32)) {
        self.position = position;
        self.size = size;
        self.missed_frames = 0;
    }

    pub(crate) fn miss(&mut self) -> u32 {
        self.missed_frames += 1;
        self.missed_frames
    }

    /// Flips `crossed` the first time the transit coordinate reaches the line.
    /// Returns true only on that first call.
    pub(crate) fn try_cross(&mut self, scan_line: i32) -> bool {
        if self.crossed || self.position.y < scan_line {
            return false;
        }
        self.crossed = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn chip(class: ChipClass, digits: &[u8], authentic: bool) -> Chip {
        Chip::new(
            ChipId(0),
            class,
            Position::default(),
            (10, 10),
            DigitSequence::new(class, digits).unwrap(),
            authentic,
        )
    }

    #[test]
    fn value_is_fixed_at_creation() {
        assert_eq!(chip(ChipClass::Gold, &[7, 5, 2], true).value(), 7520);
        assert_eq!(chip(ChipClass::Silver, &[7, 5, 6], true).value(), 756);
        assert_eq!(chip(ChipClass::Bronze, &[2, 4], true).value(), 8);
        assert_eq!(chip(ChipClass::Gold, &[7, 5, 2], false).value(), 0);
    }

    #[test]
    fn digit_validation() {
        assert!(DigitSequence::new(ChipClass::Bronze, &[1, 2, 3]).is_err());
        assert!(DigitSequence::new(ChipClass::Gold, &[1, 2]).is_err());
        assert!(DigitSequence::new(ChipClass::Silver, &[1, 12, 3]).is_err());
        assert!(DigitSequence::new(ChipClass::Silver, &[0, 5, 2]).is_ok());
    }

    #[test]
    fn random_digits_respect_class_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            for class in ChipClass::ALL {
                let digits = DigitSequence::random(class, &mut rng);
                assert_eq!(digits.as_slice().len(), class.digit_count());
                assert!(digits.as_slice()[0] >= 1);
                assert!(digits.as_slice().iter().all(|&d| d <= 9));
                assert!(DigitSequence::new(class, digits.as_slice()).is_ok());
            }
        }
    }

    #[test]
    fn crossing_fires_once() {
        let mut c = chip(ChipClass::Silver, &[1, 2, 3], true);
        assert!(!c.try_cross(5));
        c.advance(5);
        assert!(c.try_cross(5));
        assert!(c.crossed());
        c.advance(5);
        assert!(!c.try_cross(5));
    }
}
