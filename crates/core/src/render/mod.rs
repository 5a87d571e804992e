use std::fmt;

use serde::{Deserialize, Serialize};

/// Rendering backend abstraction: a 2D raster surface with the handful of
/// primitives the visual layers need.
pub trait Surface {
    fn width(&self) -> f32;

    fn height(&self) -> f32;

    /// Clears the whole surface.
    fn clear(&mut self);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: &Fill);

    /// Fills the closed polygon through `points`.
    fn fill_path(&mut self, points: &[Point], fill: &Fill);

    fn fill_circle(&mut self, center: Point, radius: f32, fill: &Fill);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Colour in one of the notations the layers use. `Display` produces the
/// matching CSS string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "lowercase")]
pub enum Color {
    Rgb { r: u8, g: u8, b: u8 },
    Rgba { r: u8, g: u8, b: u8, a: f32 },
    /// Hue in degrees, saturation and lightness in percent, alpha in `[0, 1]`.
    Hsla { h: f32, s: f32, l: f32, a: f32 },
}

impl Color {
    pub fn gray(level: u8) -> Self {
        Color::Rgb {
            r: level,
            g: level,
            b: level,
        }
    }

    pub fn hsl(h: f32, s: f32, l: f32) -> Self {
        Color::Hsla { h, s, l, a: 1.0 }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Color::Rgb { r, g, b } => write!(f, "rgb({r}, {g}, {b})"),
            Color::Rgba { r, g, b, a } => write!(f, "rgba({r}, {g}, {b}, {a})"),
            Color::Hsla { h, s, l, a } if a >= 1.0 => write!(f, "hsl({h}, {s}%, {l}%)"),
            Color::Hsla { h, s, l, a } => write!(f, "hsla({h}, {s}%, {l}%, {a})"),
        }
    }
}

/// Linear gradient between two points with offset-sorted colour stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<(f32, Color)>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            stops: Vec::new(),
        }
    }

    pub fn with_stop(mut self, offset: f32, color: Color) -> Self {
        self.stops.push((offset.clamp(0.0, 1.0), color));
        self.stops
            .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    Solid(Color),
    Gradient(LinearGradient),
}

impl From<Color> for Fill {
    fn from(value: Color) -> Self {
        Fill::Solid(value)
    }
}
