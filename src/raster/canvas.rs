use core::iter;

use super::Rotation;

/// Unset pixel in the intermediate representation.
pub const PAPER: u8 = b'0';
/// Pixel set in the foreground colour.
pub const INK: u8 = b'1';

/// Unrotated pixel buffer, one byte per pixel holding [PAPER], [INK] or a
/// colour letter.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![PAPER; width * height] }
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Width and height once rotated.
    pub const fn dimensions(&self, rotation: Rotation) -> (usize, usize) {
        match rotation {
            Rotation::R0 | Rotation::R180 => (self.width, self.height),
            Rotation::R90 | Rotation::R270 => (self.height, self.width),
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// Set a single pixel, ignoring anything off the canvas.
    #[inline]
    pub fn plot(&mut self, x: i32, y: i32, value: u8) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = value;
        }
    }

    /// Fill a rectangle, clipped to the canvas.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, value: u8) {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let x1 = (x + w).clamp(0, self.width as i32) as usize;
        let y1 = (y + h).clamp(0, self.height as i32) as usize;
        if x0 >= x1 {
            return;
        }
        for row in y0..y1 {
            let start = row * self.width;
            self.pixels[start + x0..start + x1].fill(value);
        }
    }

    /// Fill every pixel whose centre lies within `radius` of `(cx, cy)`.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, value: u8) {
        let r2 = radius * radius;
        let y0 = (cy - radius).floor() as i32;
        let y1 = (cy + radius).ceil() as i32;
        let x0 = (cx - radius).floor() as i32;
        let x1 = (cx + radius).ceil() as i32;
        for y in y0..y1 {
            let dy = y as f32 + 0.5 - cy;
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.plot(x, y, value);
                }
            }
        }
    }

    /// Pixels in row-major order of the rotated image. Nothing is copied, the
    /// rotation only changes where each pixel is read from.
    pub fn pixels(&self, rotation: Rotation) -> impl Iterator<Item = u8> + '_ {
        let (out_width, out_height) = self.dimensions(rotation);
        let (w, h) = (self.width, self.height);
        (0..out_height)
            .flat_map(move |row| iter::repeat(row).zip(0..out_width))
            .map(move |(row, col)| {
                let (x, y) = match rotation {
                    Rotation::R0 => (col, row),
                    Rotation::R90 => (row, h - 1 - col),
                    Rotation::R180 => (w - 1 - col, h - 1 - row),
                    Rotation::R270 => (w - 1 - row, col),
                };
                self.get(x, y)
            })
    }

    /// Write the rotated image into `target`, `N` values per pixel.
    pub fn fill<P: Copy, const N: usize>(&self, rotation: Rotation, target: &mut [P], mut map: impl FnMut(u8) -> [P; N]) {
        for (chunk, pixel) in target.chunks_exact_mut(N).zip(self.pixels(rotation)) {
            chunk.copy_from_slice(&map(pixel));
        }
    }
}
