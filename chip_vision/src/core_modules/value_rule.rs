// THEORY:
// The value rule turns a chip's class and its printed digits into credits.
// It is a pure function: no randomness, no position or time dependence. All
// randomness lives upstream in digit generation (`chip::DigitSequence`).
//
// GOLD and SILVER read their digits as a positional base-10 number (first digit
// most significant), so a leading zero stays a leading zero: (0,5,2) is 52.
// BRONZE multiplies its digits together.

use crate::core_modules::chip::ChipClass;

/// Reads the digits as a positional base-10 number, first digit most significant.
fn positional(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0u32, |acc, &d| acc.saturating_mul(10).saturating_add(d as u32))
}

/// Computes the credit value of an authentic chip.
///
/// - GOLD:   positional number × 10 (7,5,2 → 7520)
/// - SILVER: positional number      (7,5,6 → 756)
/// - BRONZE: product of the digits  (2,4   → 8)
pub fn compute_value(class: ChipClass, digits: &[u8]) -> u32 {
    match class {
        ChipClass::Gold => positional(digits).saturating_mul(10),
        ChipClass::Silver => positional(digits),
        ChipClass::Bronze => digits
            .iter()
            .fold(1u32, |acc, &d| acc.saturating_mul(d as u32)),
    }
}

/// Value as recorded on a chip: zero for fakes regardless of digits.
pub fn chip_value(class: ChipClass, digits: &[u8], is_authentic: bool) -> u32 {
    if is_authentic {
        compute_value(class, digits)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worked_examples() {
        assert_eq!(compute_value(ChipClass::Gold, &[7, 5, 2]), 7520);
        assert_eq!(compute_value(ChipClass::Silver, &[7, 5, 6]), 756);
        assert_eq!(compute_value(ChipClass::Bronze, &[2, 4]), 8);
    }

    #[test]
    fn leading_zero_is_positional() {
        assert_eq!(compute_value(ChipClass::Silver, &[0, 5, 2]), 52);
        assert_eq!(compute_value(ChipClass::Gold, &[0, 0, 9]), 90);
    }

    #[test]
    fn matches_closed_form_for_every_triple() {
        for d0 in 0..10u8 {
            for d1 in 0..10u8 {
                for d2 in 0..10u8 {
                    let n = 100 * d0 as u32 + 10 * d1 as u32 + d2 as u32;
                    assert_eq!(compute_value(ChipClass::Silver, &[d0, d1, d2]), n);
                    assert_eq!(compute_value(ChipClass::Gold, &[d0, d1, d2]), n * 10);
                }
                assert_eq!(
                    compute_value(ChipClass::Bronze, &[d0, d1]),
                    d0 as u32 * d1 as u32
                );
            }
        }
    }

    #[test]
    fn fakes_are_worth_nothing() {
        for class in ChipClass::ALL {
            assert_eq!(chip_value(class, &[9, 9, 9], false), 0);
        }
        assert_eq!(chip_value(ChipClass::Gold, &[7, 5, 2], true), 7520);
    }

    #[test]
    fn is_deterministic() {
        let digits = [3, 1, 4];
        assert_eq!(
            compute_value(ChipClass::Gold, &digits),
            compute_value(ChipClass::Gold, &digits)
        );
    }
}
