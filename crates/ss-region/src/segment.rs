use ss_core::Pixel;

use crate::mask::VisitMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl BoundingBox {
    fn from_pixel(px: Pixel) -> Self {
        Self {
            min_x: px.x,
            min_y: px.y,
            max_x: px.x,
            max_y: px.y,
        }
    }

    fn include(&mut self, px: Pixel) {
        self.min_x = self.min_x.min(px.x);
        self.min_y = self.min_y.min(px.y);
        self.max_x = self.max_x.max(px.x);
        self.max_y = self.max_y.max(px.y);
    }

    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// Connected pixel region grown from one seed.
#[derive(Debug, Clone, Default)]
pub struct Segment {
    pixels: Vec<Pixel>,
    seed: Pixel,
    threshold: i32,
    sum_intensity: u64,
    max_intensity: u16,
    bbox: Option<BoundingBox>,
}

impl Segment {
    /// Empties the segment, keeping its pixel buffer.
    pub fn clear(&mut self) {
        self.pixels.clear();
        self.seed = Pixel::default();
        self.threshold = 0;
        self.sum_intensity = 0;
        self.max_intensity = 0;
        self.bbox = None;
    }

    pub fn begin(&mut self, seed: Pixel, threshold: i32) {
        self.clear();
        self.seed = seed;
        self.threshold = threshold;
    }

    pub fn push(&mut self, px: Pixel, intensity: u16) {
        self.pixels.push(px);
        self.sum_intensity += u64::from(intensity);
        self.max_intensity = self.max_intensity.max(intensity);
        match self.bbox.as_mut() {
            Some(b) => b.include(px),
            None => self.bbox = Some(BoundingBox::from_pixel(px)),
        }
    }

    /// Pixel count.
    pub fn n(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn seed(&self) -> Pixel {
        self.seed
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    pub fn sum_intensity(&self) -> u64 {
        self.sum_intensity
    }

    pub fn max_intensity(&self) -> u16 {
        self.max_intensity
    }

    pub fn mean_intensity(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.sum_intensity as f32 / self.pixels.len() as f32
    }
}

/// Reusable segment handles plus the visited mask they share.
#[derive(Debug, Clone, Default)]
pub struct SegmentPool {
    mask: VisitMask,
    segments: Vec<Segment>,
}

impl SegmentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the visited mask for a new `rows x cols` image.
    pub fn reset_mask(&mut self, rows: usize, cols: usize) {
        self.mask.reset(rows, cols);
    }

    /// Cleared handle at `index`, allocating handles up to it if needed.
    pub fn segment(&mut self, index: usize) -> &mut Segment {
        self.slot(index).0
    }

    /// Cleared handle at `index` together with the shared mask.
    pub fn slot(&mut self, index: usize) -> (&mut Segment, &mut VisitMask) {
        if self.segments.len() <= index {
            self.segments.resize_with(index + 1, Segment::default);
        }
        let seg = &mut self.segments[index];
        seg.clear();
        (seg, &mut self.mask)
    }

    /// Every allocated handle, kept or not.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn mask(&self) -> &VisitMask {
        &self.mask
    }
}

#[cfg(test)]
mod tests {
    use ss_core::Pixel;

    use super::{BoundingBox, Segment, SegmentPool};

    #[test]
    fn segment_tracks_stats() {
        let mut seg = Segment::default();
        seg.begin(Pixel::new(3, 4), 90);
        seg.push(Pixel::new(3, 4), 100);
        seg.push(Pixel::new(5, 2), 200);

        assert_eq!(seg.n(), 2);
        assert_eq!(seg.threshold(), 90);
        assert_eq!(seg.max_intensity(), 200);
        assert_eq!(seg.sum_intensity(), 300);
        assert!((seg.mean_intensity() - 150.0).abs() < 1e-6);
        let b = seg.bbox().expect("non-empty");
        assert_eq!(
            b,
            BoundingBox {
                min_x: 3,
                min_y: 2,
                max_x: 5,
                max_y: 4
            }
        );
        assert_eq!((b.width(), b.height()), (3, 3));
    }

    #[test]
    fn pool_grows_and_clears_handles() {
        let mut pool = SegmentPool::new();
        pool.segment(2).push(Pixel::new(0, 0), 9);
        assert_eq!(pool.segments().len(), 3);
        assert_eq!(pool.segments()[2].n(), 1);

        let seg = pool.segment(2);
        assert!(seg.is_empty());
        assert!(seg.bbox().is_none());
        assert_eq!(pool.segments().len(), 3);
    }

    #[test]
    fn reset_mask_forgets_claims() {
        let mut pool = SegmentPool::new();
        pool.reset_mask(4, 4);
        let (_, mask) = pool.slot(0);
        mask.mark(Pixel::new(1, 1));
        assert_eq!(pool.mask().visited_count(), 1);

        pool.reset_mask(4, 4);
        assert_eq!(pool.mask().visited_count(), 0);
    }
}
