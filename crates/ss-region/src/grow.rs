use std::collections::VecDeque;

use ss_core::{Error, ImageView, Pixel};

use crate::mask::VisitMask;
use crate::segment::Segment;

const DX: [isize; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [isize; 8] = [0, -1, -1, -1, 0, 1, 1, 1];
const DIRS_C4: [usize; 4] = [0, 2, 4, 6];
const DIRS_C8: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    C4,
    #[default]
    C8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowConfig {
    pub connectivity: Connectivity,
    /// Longest run of consecutive sub-threshold pixels that growth may
    /// cross. Bridges gaps that split one object into several fragments.
    pub max_gap_px: usize,
}

impl Default for GrowConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::C8,
            max_gap_px: 2,
        }
    }
}

/// Turns a seed and an acceptance threshold into a segment.
///
/// Implementations must mark every pixel they add to `seg` in `mask` and
/// must never add a pixel that `mask` already holds.
pub trait RegionGrower {
    fn set_threshold(&mut self, threshold: i32);

    fn threshold(&self) -> i32;

    fn create_segment(
        &mut self,
        seg: &mut Segment,
        mask: &mut VisitMask,
        img: &ImageView<'_, u16>,
        seed: Pixel,
    ) -> Result<(), Error>;
}

const NO_GAP: u32 = u32::MAX;

/// Breadth-first growth over intensity `> threshold`, with bounded gap
/// bridging.
///
/// A sub-threshold pixel joins when it lies at most `max_gap_px` steps from
/// an above-threshold member. Its gap is the shortest such distance, so the
/// result does not depend on neighbour visiting order.
#[derive(Debug, Clone, Default)]
pub struct FloodFillGrower {
    cfg: GrowConfig,
    threshold: i32,
    queue: VecDeque<(Pixel, u32)>,
    // Per-pixel gap of the segment being grown; only `touched` entries are
    // set between calls.
    gaps: Vec<u32>,
    touched: Vec<usize>,
}

impl FloodFillGrower {
    pub fn new(cfg: GrowConfig) -> Self {
        Self {
            cfg,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &GrowConfig {
        &self.cfg
    }

    fn reset_gaps(&mut self, len: usize) {
        for &i in &self.touched {
            self.gaps[i] = NO_GAP;
        }
        self.touched.clear();
        if self.gaps.len() != len {
            self.gaps.clear();
            self.gaps.resize(len, NO_GAP);
        }
    }

    fn enqueue(&mut self, px: Pixel, gap: u32) {
        if gap == 0 {
            self.queue.push_front((px, gap));
        } else {
            self.queue.push_back((px, gap));
        }
    }
}

impl RegionGrower for FloodFillGrower {
    fn set_threshold(&mut self, threshold: i32) {
        self.threshold = threshold;
    }

    fn threshold(&self) -> i32 {
        self.threshold
    }

    fn create_segment(
        &mut self,
        seg: &mut Segment,
        mask: &mut VisitMask,
        img: &ImageView<'_, u16>,
        seed: Pixel,
    ) -> Result<(), Error> {
        let (width, height) = (img.width(), img.height());
        if mask.width() != width || mask.height() != height {
            return Err(Error::SizeMismatch {
                expected: width * height,
                actual: mask.len(),
            });
        }

        seg.begin(seed, self.threshold);
        let seed_value = *img.get(seed.x, seed.y).ok_or(Error::OutOfBounds {
            x: seed.x as isize,
            y: seed.y as isize,
            width,
            height,
        })?;

        // A seed claimed by an earlier segment yields an empty one.
        if !mask.mark(seed) {
            return Ok(());
        }
        seg.push(seed, seed_value);

        self.reset_gaps(width * height);
        self.queue.clear();
        let seed_idx = seed.y * width + seed.x;
        self.gaps[seed_idx] = 0;
        self.touched.push(seed_idx);
        self.queue.push_back((seed, 0));

        let dirs: &[usize] = match self.cfg.connectivity {
            Connectivity::C4 => &DIRS_C4,
            Connectivity::C8 => &DIRS_C8,
        };
        let max_gap = u32::try_from(self.cfg.max_gap_px).unwrap_or(u32::MAX - 1);

        while let Some((p, gap)) = self.queue.pop_front() {
            // Stale entry: the pixel was reached again with a smaller gap.
            if gap > self.gaps[p.y * width + p.x] {
                continue;
            }

            for &dir in dirs {
                let Some(nb) = neighbor(p, dir, width, height) else {
                    continue;
                };

                // SAFETY: `neighbor` only yields in-bounds coordinates.
                let value = unsafe { *img.get_unchecked(nb.x, nb.y) };
                let nb_gap = if i32::from(value) > self.threshold {
                    0
                } else {
                    gap + 1
                };
                if nb_gap > max_gap {
                    continue;
                }

                let idx = nb.y * width + nb.x;
                let known = self.gaps[idx];
                if known != NO_GAP {
                    // Already a member: only a shorter gap is news.
                    if nb_gap < known {
                        self.gaps[idx] = nb_gap;
                        self.enqueue(nb, nb_gap);
                    }
                    continue;
                }
                if !mask.mark(nb) {
                    continue;
                }

                seg.push(nb, value);
                self.gaps[idx] = nb_gap;
                self.touched.push(idx);
                self.enqueue(nb, nb_gap);
            }
        }

        Ok(())
    }
}

#[inline]
fn neighbor(p: Pixel, dir: usize, width: usize, height: usize) -> Option<Pixel> {
    let x = p.x as isize + DX[dir];
    let y = p.y as isize + DY[dir];
    if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
        return None;
    }
    Some(Pixel::new(x as usize, y as usize))
}

#[cfg(test)]
mod tests {
    use ss_core::{Error, Image, Pixel};

    use super::{Connectivity, FloodFillGrower, GrowConfig, RegionGrower};
    use crate::mask::VisitMask;
    use crate::segment::Segment;

    fn grower(connectivity: Connectivity, max_gap_px: usize, threshold: i32) -> FloodFillGrower {
        let mut g = FloodFillGrower::new(GrowConfig {
            connectivity,
            max_gap_px,
        });
        g.set_threshold(threshold);
        g
    }

    fn grow(
        g: &mut FloodFillGrower,
        img: &Image<u16>,
        mask: &mut VisitMask,
        seed: Pixel,
    ) -> Segment {
        let mut seg = Segment::default();
        g.create_segment(&mut seg, mask, &img.as_view(), seed)
            .expect("seed inside image");
        seg
    }

    #[test]
    fn diagonal_neighbor_needs_c8() {
        let img = Image::from_vec(
            3,
            3,
            vec![
                9u16, 0, 0, // row 0
                0, 9, 0, // row 1
                0, 0, 0, // row 2
            ],
        )
        .expect("valid image");

        let mut mask = VisitMask::new(3, 3);
        let mut g = grower(Connectivity::C4, 0, 5);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(1, 1));
        assert_eq!(seg.n(), 1);

        let mut mask = VisitMask::new(3, 3);
        let mut g = grower(Connectivity::C8, 0, 5);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(1, 1));
        assert_eq!(seg.n(), 2);
        assert!(seg.pixels().contains(&Pixel::new(0, 0)));
        assert_eq!(mask.visited_count(), 2);
    }

    #[test]
    fn gap_bridging_crosses_short_dark_runs() {
        let img = Image::from_vec(7, 1, vec![9u16, 9, 0, 9, 9, 0, 0]).expect("valid image");

        let mut mask = VisitMask::new(1, 7);
        let mut g = grower(Connectivity::C8, 0, 5);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(0, 0));
        assert_eq!(seg.n(), 2);

        let mut mask = VisitMask::new(1, 7);
        let mut g = grower(Connectivity::C8, 1, 5);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(0, 0));
        // Pixels 0..=5: the gap at 2 is bridged, 5 is one step past the
        // last bright pixel, 6 would be two.
        assert_eq!(seg.n(), 6);
        assert!(!mask.is_visited(Pixel::new(6, 0)));
    }

    #[test]
    fn pixel_at_threshold_is_not_accepted() {
        let img = Image::from_vec(3, 1, vec![95u16, 90, 95]).expect("valid image");
        let mut mask = VisitMask::new(1, 3);
        let mut g = grower(Connectivity::C8, 0, 90);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(0, 0));
        assert_eq!(seg.n(), 1);
        assert_eq!(seg.threshold(), 90);
        assert!(!mask.is_visited(Pixel::new(1, 0)));

        let mut mask = VisitMask::new(1, 3);
        let mut g = grower(Connectivity::C8, 1, 90);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(0, 0));
        assert_eq!(seg.n(), 3);
    }

    #[test]
    fn gap_is_distance_to_nearest_bright_pixel() {
        // Bright only at (0, 0) and (1, 1); every pixel within two steps of
        // either joins, whatever order the neighbours are visited in.
        let img = Image::from_fn(6, 6, |x, y| if x == y && x < 2 { 9u16 } else { 0 });
        let mut mask = VisitMask::new(6, 6);
        let mut g = grower(Connectivity::C8, 2, 5);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(0, 0));

        for y in 0..6 {
            for x in 0..6 {
                let px = Pixel::new(x, y);
                let near = x <= 3 && y <= 3;
                assert_eq!(seg.pixels().contains(&px), near, "pixel ({x}, {y})");
            }
        }
        assert_eq!(seg.n(), 16);
    }

    #[test]
    fn grower_state_does_not_leak_between_calls() {
        let img = Image::from_fn(6, 6, |x, y| if x == y && x < 2 { 9u16 } else { 0 });
        let mut g = grower(Connectivity::C8, 2, 5);

        let mut mask = VisitMask::new(6, 6);
        let first = grow(&mut g, &img, &mut mask, Pixel::new(0, 0));
        let mut mask = VisitMask::new(6, 6);
        let second = grow(&mut g, &img, &mut mask, Pixel::new(1, 1));
        assert_eq!(first.n(), second.n());
    }

    #[test]
    fn visited_pixels_stop_growth() {
        let img = Image::new_fill(5, 1, 50u16);
        let mut mask = VisitMask::new(1, 5);
        mask.mark(Pixel::new(2, 0));

        let mut g = grower(Connectivity::C8, 0, 10);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(0, 0));
        assert_eq!(seg.n(), 2);
        assert!(!seg.pixels().contains(&Pixel::new(3, 0)));
    }

    #[test]
    fn claimed_seed_gives_empty_segment() {
        let img = Image::new_fill(3, 3, 50u16);
        let mut mask = VisitMask::new(3, 3);
        mask.mark(Pixel::new(1, 1));

        let mut g = grower(Connectivity::C8, 0, 10);
        let seg = grow(&mut g, &img, &mut mask, Pixel::new(1, 1));
        assert!(seg.is_empty());
        assert_eq!(seg.seed(), Pixel::new(1, 1));
        assert_eq!(mask.visited_count(), 1);
    }

    #[test]
    fn rejects_seed_outside_and_mismatched_mask() {
        let img = Image::new_fill(3, 3, 50u16);
        let mut g = grower(Connectivity::C8, 0, 10);
        let mut seg = Segment::default();

        let mut mask = VisitMask::new(3, 3);
        let err = g
            .create_segment(&mut seg, &mut mask, &img.as_view(), Pixel::new(3, 0))
            .expect_err("seed outside");
        assert!(matches!(err, Error::OutOfBounds { x: 3, y: 0, .. }));

        let mut small = VisitMask::new(2, 2);
        let err = g
            .create_segment(&mut seg, &mut small, &img.as_view(), Pixel::new(0, 0))
            .expect_err("mask size");
        assert_eq!(
            err,
            Error::SizeMismatch {
                expected: 9,
                actual: 4
            }
        );
    }
}
