use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    SizeMismatch {
        expected: usize,
        actual: usize,
    },
    InvalidStride,
    /// A truncated sample position fell outside the image.
    OutOfBounds {
        x: isize,
        y: isize,
        width: usize,
        height: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "size mismatch: expected {expected}, got {actual}")
            }
            Self::InvalidStride => write!(f, "invalid stride"),
            Self::OutOfBounds {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "pixel ({x}, {y}) out of bounds for {width}x{height} image"
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn out_of_bounds_message_names_pixel_and_size() {
        let err = Error::OutOfBounds {
            x: -1,
            y: 12,
            width: 8,
            height: 10,
        };
        assert_eq!(err.to_string(), "pixel (-1, 12) out of bounds for 8x10 image");
    }
}
