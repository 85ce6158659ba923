use std::ops::Index;

/// Row-major grid of packed pixels (one u32 per pixel).
///
/// Length is fixed at `width * height`. Accessors take `(row, column)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelGrid {
    /// Create a zero-filled grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Wrap an existing row-major buffer. Returns `None` on a length mismatch.
    pub fn from_vec(width: usize, height: usize, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == width * height).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.height && col < self.width).then_some(row * self.width + col)
    }

    /// Pixel at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.offset(row, col).map(|i| self.pixels[i])
    }

    /// Overwrite the pixel at `(row, col)`. Returns false outside the grid.
    pub fn set(&mut self, row: usize, col: usize, value: u32) -> bool {
        match self.offset(row, col) {
            Some(i) => {
                self.pixels[i] = value;
                true
            }
            None => false,
        }
    }

    /// One row of pixels.
    pub fn row(&self, row: usize) -> Option<&[u32]> {
        (row < self.height).then(|| &self.pixels[row * self.width..(row + 1) * self.width])
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        // chunks_exact panics on a zero chunk size; a zero-width grid has no pixels anyway.
        self.pixels.chunks_exact(self.width.max(1))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.pixels
    }

    /// Mutable flat view, used as the read-back destination.
    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.pixels
    }
}

impl Index<(usize, usize)> for PixelGrid {
    type Output = u32;

    fn index(&self, (row, col): (usize, usize)) -> &u32 {
        match self.offset(row, col) {
            Some(i) => &self.pixels[i],
            None => panic!(
                "pixel ({row}, {col}) out of bounds for {}x{} grid",
                self.width, self.height
            ),
        }
    }
}

/// Pack three color bytes into the low 24 bits, `r` in byte 0.
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    r as u32 | (g as u32) << 8 | (b as u32) << 16
}

/// Inverse of [`pack_rgb`]; the high byte is ignored.
pub fn unpack_rgb(pixel: u32) -> [u8; 3] {
    let [r, g, b, _] = pixel.to_le_bytes();
    [r, g, b]
}
