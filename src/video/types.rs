use image::{ImageBuffer, Rgb, RgbImage};

use crate::video::paint::Color;

/// A single rendered video frame
///
/// Thin wrapper around an RGB image buffer with the alpha-blended drawing
/// primitives the styles are built from. Coordinates are in pixels with the
/// origin at the top-left corner; anything outside the frame is clipped.
#[derive(Clone, Debug)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: Color) -> Self {
        let pixel = Rgb(color.to_array());
        Self {
            buffer: ImageBuffer::from_pixel(width, height, pixel),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        self.buffer.put_pixel(x, y, Rgb(color.to_array()));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Raw interleaved RGB24 bytes, row-major
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Consume the frame and return its RGB24 bytes
    pub fn into_rgb_bytes(self) -> Vec<u8> {
        self.buffer.into_raw()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }

    /// Overwrite every pixel
    pub fn clear(&mut self, color: Color) {
        let pixel = Rgb(color.to_array());
        for p in self.buffer.pixels_mut() {
            *p = pixel;
        }
    }

    /// Blend `color` over one pixel. Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }

        let pixel = self.buffer.get_pixel_mut(x as u32, y as u32);
        let src = color.to_array();
        for (dst, s) in pixel.0.iter_mut().zip(src) {
            *dst = (s as f32 * alpha + *dst as f32 * (1.0 - alpha)).round() as u8;
        }
    }

    /// Blend `color` over the whole frame
    pub fn overlay(&mut self, color: Color, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let src = color.to_array();
        for pixel in self.buffer.pixels_mut() {
            for (dst, s) in pixel.0.iter_mut().zip(src) {
                *dst = (s as f32 * alpha + *dst as f32 * (1.0 - alpha)).round() as u8;
            }
        }
    }

    /// Scale every channel by `keep`, rounding down so faded pixels reach black
    pub fn fade(&mut self, keep: f32) {
        let keep = keep.clamp(0.0, 1.0);
        for value in self.buffer.iter_mut() {
            *value = (*value as f32 * keep) as u8;
        }
    }

    /// Paint every pixel with a position-dependent colour
    pub fn fill_with<F>(&mut self, paint: F)
    where
        F: Fn(f32, f32) -> Color,
    {
        for (x, y, pixel) in self.buffer.enumerate_pixels_mut() {
            *pixel = Rgb(paint(x as f32 + 0.5, y as f32 + 0.5).to_array());
        }
    }

    /// Filled disc; pixels whose centre lies within `radius` are painted
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color, alpha: f32) {
        if !(cx.is_finite() && cy.is_finite() && radius.is_finite()) || radius <= 0.0 {
            return;
        }
        // Sub-pixel discs still mark the pixel they sit on
        let r = radius.max(std::f32::consts::FRAC_1_SQRT_2);
        let r2 = r * r;

        let Some((x0, x1)) = self.clip_span(cx - r, cx + r, self.width()) else {
            return;
        };
        let Some((y0, y1)) = self.clip_span(cy - r, cy + r, self.height()) else {
            return;
        };

        for y in y0..=y1 {
            let dy = y as f32 + 0.5 - cy;
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.blend_pixel(x, y, color, alpha);
                }
            }
        }
    }

    /// Scanline fill of a closed polygon (even-odd rule)
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: Color, alpha: f32) {
        if points.len() < 3 || points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return;
        }

        let (min_y, max_y) = points
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
        let Some((y0, y1)) = self.clip_span(min_y, max_y, self.height()) else {
            return;
        };

        let mut crossings = Vec::with_capacity(points.len());
        for y in y0..=y1 {
            let sy = y as f32 + 0.5;
            crossings.clear();

            for i in 0..points.len() {
                let (ax, ay) = points[i];
                let (bx, by) = points[(i + 1) % points.len()];
                if (ay <= sy && by > sy) || (by <= sy && ay > sy) {
                    crossings.push(ax + (sy - ay) / (by - ay) * (bx - ax));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for pair in crossings.chunks_exact(2) {
                let start = (pair[0] - 0.5).ceil().max(0.0) as i64;
                let end = (pair[1] - 0.5).floor().min(self.width() as f32 - 1.0) as i64;
                for x in start..=end {
                    self.blend_pixel(x, y, color, alpha);
                }
            }
        }
    }

    /// Stroke the outline of a closed polygon
    pub fn stroke_polygon(&mut self, points: &[(f32, f32)], width: f32, color: Color, alpha: f32) {
        if points.len() < 2 {
            return;
        }
        let mut closed = points.to_vec();
        closed.push(points[0]);
        self.stroke_polyline(&closed, width, |_, _| color, alpha);
    }

    /// Stroke an open polyline with round joins and caps
    ///
    /// Each covered pixel is painted once, so translucent strokes do not
    /// darken where segments meet.
    pub fn stroke_polyline<F>(&mut self, points: &[(f32, f32)], width: f32, paint: F, alpha: f32)
    where
        F: Fn(f32, f32) -> Color,
    {
        let points: Vec<(f32, f32)> = points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        if points.is_empty() || !(width > 0.0) {
            return;
        }

        let half = (width / 2.0).max(std::f32::consts::FRAC_1_SQRT_2);
        let (min_x, max_x, min_y, max_y) = points.iter().fold(
            (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
            |(a, b, c, d), &(x, y)| (a.min(x), b.max(x), c.min(y), d.max(y)),
        );
        let Some((x0, x1)) = self.clip_span(min_x - half, max_x + half, self.width()) else {
            return;
        };
        let Some((y0, y1)) = self.clip_span(min_y - half, max_y + half, self.height()) else {
            return;
        };

        let span = (x1 - x0 + 1) as usize;
        let mut mask = vec![false; span * (y1 - y0 + 1) as usize];
        let segments: Vec<((f32, f32), (f32, f32))> = if points.len() == 1 {
            vec![(points[0], points[0])]
        } else {
            points.windows(2).map(|w| (w[0], w[1])).collect()
        };

        for &(a, b) in &segments {
            let Some((sx0, sx1)) = self.clip_span(a.0.min(b.0) - half, a.0.max(b.0) + half, self.width()) else {
                continue;
            };
            let Some((sy0, sy1)) = self.clip_span(a.1.min(b.1) - half, a.1.max(b.1) + half, self.height()) else {
                continue;
            };
            for y in sy0..=sy1 {
                for x in sx0..=sx1 {
                    let p = (x as f32 + 0.5, y as f32 + 0.5);
                    if distance_to_segment(p, a, b) <= half {
                        mask[(y - y0) as usize * span + (x - x0) as usize] = true;
                    }
                }
            }
        }

        for (i, covered) in mask.into_iter().enumerate() {
            if covered {
                let x = x0 + (i % span) as i64;
                let y = y0 + (i / span) as i64;
                let color = paint(x as f32 + 0.5, y as f32 + 0.5);
                self.blend_pixel(x, y, color, alpha);
            }
        }
    }

    /// Pixel index range covering `[lo, hi]`, clipped to `[0, limit)`
    fn clip_span(&self, lo: f32, hi: f32, limit: u32) -> Option<(i64, i64)> {
        if !(lo.is_finite() && hi.is_finite()) || limit == 0 {
            return None;
        }
        let start = lo.floor().max(0.0) as i64;
        let end = (hi.ceil() as i64).min(limit as i64 - 1);
        (start <= end).then_some((start, end))
    }
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}
