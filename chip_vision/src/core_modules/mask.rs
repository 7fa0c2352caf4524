// THEORY:
// A `Mask` is a binary image: true where a pixel's HSV lies inside a color
// profile. Raw masks are noisy (sensor speckle, thin highlights, small holes in
// a chip face), so they are cleaned with morphology before regions are grouped:
//
// - closing (dilate, then erode) fills small holes and gaps inside a chip;
// - opening (erode, then dilate) removes speckle and thin lines narrower than
//   the kernel.
//
// The kernel is a square of odd side anchored at its centre. Pixels outside the
// image are ignored, so neither operation eats or grows from the border.

use crate::core_modules::color_profile::ColorProfile;
use crate::core_modules::pixel::pixel::Hsv;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width * height) as usize],
        }
    }

    /// Builds the in-range mask of an HSV image for one profile.
    pub fn in_range(hsv: &[Hsv], width: u32, height: u32, profile: &ColorProfile) -> Self {
        Self {
            width,
            height,
            data: hsv.iter().map(|p| profile.contains(*p)).collect(),
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.data[(y * self.width + x) as usize] = on;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&on| on).count()
    }

    pub fn dilate(&self, kernel: u32) -> Self {
        self.sweep(kernel, |window| window.iter().any(|&on| on))
    }

    pub fn erode(&self, kernel: u32) -> Self {
        self.sweep(kernel, |window| window.iter().all(|&on| on))
    }

    /// Dilation followed by erosion.
    pub fn close(&self, kernel: u32) -> Self {
        self.dilate(kernel).erode(kernel)
    }

    /// Erosion followed by dilation.
    pub fn open(&self, kernel: u32) -> Self {
        self.erode(kernel).dilate(kernel)
    }

    // A square kernel is separable: a horizontal pass then a vertical pass.
    fn sweep(&self, kernel: u32, reduce: impl Fn(&[bool]) -> bool) -> Self {
        let radius = (kernel / 2) as i64;
        if radius == 0 || self.data.is_empty() {
            return self.clone();
        }
        let horizontal = self.pass(radius, true, &reduce);
        horizontal.pass(radius, false, &reduce)
    }

    fn pass(&self, radius: i64, horizontal: bool, reduce: &impl Fn(&[bool]) -> bool) -> Self {
        let mut out = Mask::new(self.width, self.height);
        let mut window = Vec::with_capacity((radius * 2 + 1) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                window.clear();
                for offset in -radius..=radius {
                    let (nx, ny) = if horizontal {
                        (x as i64 + offset, y as i64)
                    } else {
                        (x as i64, y as i64 + offset)
                    };
                    if nx >= 0 && nx < self.width as i64 && ny >= 0 && ny < self.height as i64 {
                        window.push(self.get(nx as u32, ny as u32));
                    }
                }
                out.set(x, y, reduce(&window));
            }
        }
        out
    }
}
