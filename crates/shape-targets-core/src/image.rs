use crate::ImageError;

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer, checking its size.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        check_buffer(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn validate(&self) -> Result<(), ImageError> {
        check_buffer(self.width, self.height, self.data.len())
    }
}

#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Single-channel `f32` image, used for convolution output and gradients.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ImageF32 {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.width + x] = v;
    }

    /// Bilinear sample with clamped borders.
    #[inline]
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        bilinear(self.width, self.height, x, y, |xi, yi| self.get(xi, yi))
    }
}

/// Borrowed binary mask. Any non-zero byte is foreground.
#[derive(Clone, Copy, Debug)]
pub struct BinaryImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl<'a> BinaryImageView<'a> {
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        check_buffer(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != 0
    }

    /// Foreground test that treats everything outside the image as background.
    #[inline]
    pub fn is_set_i32(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.is_set(x as usize, y as usize)
    }

    pub fn validate(&self) -> Result<(), ImageError> {
        check_buffer(self.width, self.height, self.data.len())
    }
}

/// Owned binary mask holding 0/1 values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl BinaryImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.data[y * self.width + x] = on as u8;
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn view(&self) -> BinaryImageView<'_> {
        BinaryImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

fn check_buffer(width: usize, height: usize, len: usize) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::ZeroSize { width, height });
    }
    // a size whose area overflows can never match a real buffer
    let expected = width.checked_mul(height).unwrap_or(usize::MAX);
    if len != expected {
        return Err(ImageError::BufferSize { expected, got: len });
    }
    Ok(())
}

#[inline]
fn bilinear(
    width: usize,
    height: usize,
    x: f32,
    y: f32,
    px: impl Fn(usize, usize) -> f32,
) -> f32 {
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = px(x0, y0);
    let p10 = px(x1, y0);
    let p01 = px(x0, y1);
    let p11 = px(x1, y1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

/// Bilinear sample at pixel-center coordinates; coordinates outside the
/// image are clamped to the nearest border pixel.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    bilinear(src.width, src.height, x, y, |xi, yi| src.get(xi, yi) as f32)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}
