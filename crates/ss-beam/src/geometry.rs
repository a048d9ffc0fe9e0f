use ss_core::{Error, ImageView, Point2f, Vec2f, pixel_truncated, sample_truncated};

/// Beam layout of a fan-shaped sonar image.
///
/// The apex sits at `(width / 2, height + sonar_vertical_offset)`. Beam `i`
/// points at `-fov / 2 + i * increment` radians from the vertical, sweeping
/// from the right side of the image to the left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanGeometry {
    n_beams: usize,
    field_of_view: f32,
    start_bin: usize,
    n_bins: usize,
    apex: Point2f,
}

impl FanGeometry {
    pub fn new(
        width: usize,
        height: usize,
        n_beams: usize,
        field_of_view_deg: f32,
        start_bin: usize,
        sonar_vertical_offset: i32,
    ) -> Self {
        Self {
            n_beams,
            field_of_view: field_of_view_deg.to_radians(),
            start_bin,
            n_bins: height.saturating_sub(start_bin),
            apex: Point2f::new(
                width as f32 / 2.0,
                height as f32 + sonar_vertical_offset as f32,
            ),
        }
    }

    pub fn n_beams(&self) -> usize {
        self.n_beams
    }

    /// Bins sampled along every beam.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn apex(&self) -> Point2f {
        self.apex
    }

    /// Angular step between adjacent beams, in radians.
    ///
    /// A single beam has no neighbour; the step then falls back to twice the
    /// field of view so the division never happens.
    pub fn increment(&self) -> f32 {
        if self.n_beams > 1 {
            self.field_of_view / (self.n_beams - 1) as f32
        } else {
            2.0 * self.field_of_view
        }
    }

    pub fn beam_angle(&self, index: usize) -> f32 {
        -self.field_of_view / 2.0 + index as f32 * self.increment()
    }

    pub fn beam(&self, index: usize) -> BeamRay {
        BeamRay::new(index, self.beam_angle(index), self.apex, self.start_bin)
    }

    /// Ray at an arbitrary bearing (radians), used when a single beam is
    /// inspected outside the regular fan.
    pub fn ray_at(&self, angle: f32) -> BeamRay {
        BeamRay::new(0, angle, self.apex, self.start_bin)
    }

    pub fn beams(&self) -> impl Iterator<Item = BeamRay> + '_ {
        (0..self.n_beams).map(|i| self.beam(i))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamRay {
    pub index: usize,
    pub angle: f32,
    /// Unit direction `(-sin, -cos)`: angle zero points straight up.
    pub dir: Vec2f,
    /// Position of bin 0, `start_bin` samples out from the apex.
    pub origin: Point2f,
}

impl BeamRay {
    pub fn new(index: usize, angle: f32, apex: Point2f, start_bin: usize) -> Self {
        let (sin, cos) = angle.sin_cos();
        let dir = Vec2f::new(-sin, -cos);
        Self {
            index,
            angle,
            dir,
            origin: apex + dir * start_bin as f32,
        }
    }

    pub fn bin_position(&self, bin: usize) -> Point2f {
        self.origin + self.dir * bin as f32
    }
}

/// Reads intensities along one beam of a 16-bit image.
#[derive(Debug, Clone, Copy)]
pub struct BeamSampler<'a> {
    view: ImageView<'a, u16>,
    ray: BeamRay,
}

impl<'a> BeamSampler<'a> {
    pub fn new(view: ImageView<'a, u16>, ray: BeamRay) -> Self {
        Self { view, ray }
    }

    pub fn ray(&self) -> &BeamRay {
        &self.ray
    }

    pub fn sample(&self, bin: usize) -> Result<i32, Error> {
        sample_truncated(&self.view, self.ray.bin_position(bin)).map(i32::from)
    }

    /// Bounds check only; the pixel is not read.
    pub fn is_inside(&self, bin: usize) -> bool {
        pixel_truncated(
            self.ray.bin_position(bin),
            self.view.width(),
            self.view.height(),
        )
        .is_ok()
    }

    /// Number of leading bins, out of `n_bins`, that fall inside the image.
    pub fn leading_inside(&self, n_bins: usize) -> usize {
        (0..n_bins)
            .position(|bin| !self.is_inside(bin))
            .unwrap_or(n_bins)
    }
}
