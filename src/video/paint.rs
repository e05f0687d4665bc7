//! Colours, gradients and 2D transforms used by the styles.

/// An opaque RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS-style `hsl(h, s%, l%)` with `saturation` and `lightness` in 0.0-1.0.
    /// Hue wraps around 360.
    pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = if hue.is_finite() { hue.rem_euclid(360.0) } else { 0.0 };
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = if h < 60.0 {
            (c, x, 0.0)
        } else if h < 120.0 {
            (x, c, 0.0)
        } else if h < 180.0 {
            (0.0, c, x)
        } else if h < 240.0 {
            (0.0, x, c)
        } else if h < 300.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    /// Linear interpolation towards `other`
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Colour ramp along the line from `start` to `end`
#[derive(Debug, Clone)]
pub struct LinearGradient {
    start: (f32, f32),
    end: (f32, f32),
    stops: Vec<(f32, Color)>,
}

impl LinearGradient {
    pub fn new(start: (f32, f32), end: (f32, f32)) -> Self {
        Self {
            start,
            end,
            stops: Vec::new(),
        }
    }

    /// Add a colour stop at `offset` (0.0-1.0). Stops are kept sorted.
    pub fn with_stop(mut self, offset: f32, color: Color) -> Self {
        self.stops.push((offset.clamp(0.0, 1.0), color));
        self.stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }

    /// Colour at a point, projected onto the gradient line and clamped
    pub fn color_at(&self, x: f32, y: f32) -> Color {
        let Some(&(_, first)) = self.stops.first() else {
            return Color::BLACK;
        };

        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let len2 = dx * dx + dy * dy;
        let t = if len2 > 0.0 {
            (((x - self.start.0) * dx + (y - self.start.1) * dy) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if t <= self.stops[0].0 {
            return first;
        }
        for pair in self.stops.windows(2) {
            let (a_off, a) = pair[0];
            let (b_off, b) = pair[1];
            if t <= b_off {
                let span = b_off - a_off;
                let local = if span > 0.0 { (t - a_off) / span } else { 1.0 };
                return a.lerp(b, local);
            }
        }
        self.stops[self.stops.len() - 1].1
    }
}

/// Affine 2D transform, composed like a canvas context
/// (later operations apply first to drawn points)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(self, x: f32, y: f32) -> Self {
        self.then(Transform {
            e: x,
            f: y,
            ..Self::IDENTITY
        })
    }

    pub fn rotate(self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        self.then(Transform {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        })
    }

    pub fn scale(self, sx: f32, sy: f32) -> Self {
        self.then(Transform {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        })
    }

    /// `self * local`
    fn then(self, m: Transform) -> Self {
        Transform {
            a: self.a * m.a + self.c * m.b,
            b: self.b * m.a + self.d * m.b,
            c: self.a * m.c + self.c * m.d,
            d: self.b * m.c + self.d * m.d,
            e: self.a * m.e + self.c * m.f + self.e,
            f: self.b * m.e + self.d * m.f + self.f,
        }
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    pub fn apply_all(&self, points: &[(f32, f32)]) -> Vec<(f32, f32)> {
        points.iter().map(|&p| self.apply(p)).collect()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
