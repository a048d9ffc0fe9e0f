use crate::Error;
use crate::geom::{Pixel, Point2f};
use crate::image::ImageView;

/// Converts a sub-pixel position to the pixel it falls in by truncating
/// toward zero, failing when the result lies outside a `width x height` grid.
pub fn pixel_truncated(p: Point2f, width: usize, height: usize) -> Result<Pixel, Error> {
    let xi = p.x.trunc() as isize;
    let yi = p.y.trunc() as isize;

    if xi < 0 || yi < 0 || xi >= width as isize || yi >= height as isize {
        return Err(Error::OutOfBounds {
            x: xi,
            y: yi,
            width,
            height,
        });
    }

    Ok(Pixel::new(xi as usize, yi as usize))
}

pub fn sample_truncated<T: Copy>(img: &ImageView<'_, T>, p: Point2f) -> Result<T, Error> {
    let px = pixel_truncated(p, img.width(), img.height())?;
    // SAFETY: `pixel_truncated` only returns coordinates inside the view.
    Ok(unsafe { *img.get_unchecked(px.x, px.y) })
}
