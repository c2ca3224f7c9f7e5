use {base::Vec2, std::fmt};

/// Pixel layout of buffers produced for a frame-queue target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar 8-bit Y plane followed by quarter-size U and V planes.
    Yuv420,
    Yuyv,
    Rgb8,
    Jpeg,
}

impl PixelFormat {
    /// Size of the buffer needed to hold one frame of `size` pixels.
    ///
    /// JPEG frames are variable length; the uncompressed RGB size is used as
    /// an upper bound and producers truncate the buffer to the encoded length.
    /// Returns `None` if the length does not fit in `usize`.
    pub fn frame_len(&self, size: Vec2<usize>) -> Option<usize> {
        let pixels = size.area()?;
        match self {
            PixelFormat::Yuv420 => size
                .x
                .div_ceil(2)
                .checked_mul(size.y.div_ceil(2))?
                .checked_mul(2)?
                .checked_add(pixels),
            PixelFormat::Yuyv => pixels.checked_mul(2),
            PixelFormat::Rgb8 | PixelFormat::Jpeg => pixels.checked_mul(3),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Yuv420 => write!(f, "YUV_420_888"),
            PixelFormat::Yuyv => write!(f, "YUYV"),
            PixelFormat::Rgb8 => write!(f, "RGB8"),
            PixelFormat::Jpeg => write!(f, "JPEG"),
        }
    }
}
