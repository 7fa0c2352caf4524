// THEORY:
// The `BlobDetector` is the spatial grouping step of the classifier. It takes a
// cleaned binary `Mask` and finds every contiguous region of "on" pixels.
//
// Algorithm:
// 1.  **Seeding**: scan the mask row by row; every unvisited "on" pixel seeds a
//     new region.
// 2.  **Region Growing**: an iterative depth-first fill over the 8 neighbours
//     collects the whole region, marking pixels visited so none is counted twice.
// 3.  **Data Aggregation**: bounding box, pixel area and centroid are computed
//     from the collected pixels.
// 4.  **Size Filtering**: only regions whose area lies in [min_area, max_area]
//     are candidate chips. Smaller ones are noise; larger ones are background
//     that happens to share a chip's color.
//
// Like the mask, this is a stateless utility with no memory across frames.

use crate::core_modules::mask::Mask;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// True when the two rectangles share at least one pixel.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// One contiguous region of a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bounding_box: BoundingBox,
    /// Number of pixels in the region.
    pub area: usize,
    pub centroid: (f64, f64),
}

pub mod blob_detector {
    use super::*;

    /// Finds every 8-connected region of the mask, in scan order of their first pixel.
    pub fn find_regions(mask: &Mask) -> Vec<Region> {
        let mut visited = vec![false; (mask.width * mask.height) as usize];
        let mut regions = Vec::new();

        for y in 0..mask.height {
            for x in 0..mask.width {
                let index = (y * mask.width + x) as usize;
                if visited[index] || !mask.get(x, y) {
                    continue;
                }
                regions.push(grow_region(mask, &mut visited, x, y));
            }
        }

        regions
    }

    /// Regions whose area lies within `[min_area, max_area]`.
    pub fn find_blobs(mask: &Mask, min_area: usize, max_area: usize) -> Vec<Region> {
        find_regions(mask)
            .into_iter()
            .filter(|region| region.area >= min_area && region.area <= max_area)
            .collect()
    }

    fn grow_region(mask: &Mask, visited: &mut [bool], seed_x: u32, seed_y: u32) -> Region {
        let mut stack = vec![(seed_x, seed_y)];
        visited[(seed_y * mask.width + seed_x) as usize] = true;

        let mut min_x = seed_x;
        let mut min_y = seed_y;
        let mut max_x = seed_x;
        let mut max_y = seed_y;
        let mut area = 0usize;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;

        while let Some((x, y)) = stack.pop() {
            area += 1;
            sum_x += x as f64;
            sum_y += y as f64;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= mask.width as i64 || ny >= mask.height as i64 {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    let index = (ny * mask.width + nx) as usize;
                    if !visited[index] && mask.get(nx, ny) {
                        visited[index] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }

        Region {
            bounding_box: BoundingBox {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            },
            area,
            centroid: (sum_x / area as f64, sum_y / area as f64),
        }
    }
}
