//! Visual layers and the mapping from the active slot to the layers drawn.

use std::f64::consts::TAU;

use crate::{
    audio::{Slot, SLOT_COUNT},
    config::VisualConfig,
    render::{Color, Fill, LinearGradient, Point, Surface},
    AnalysisFrame,
};

const HUE_START: f32 = 180.0;
const HUE_SPAN: f32 = 30.0;
const PARTICLE_ALPHA: f32 = 0.7;
const RIBBON_ALPHA: f32 = 0.4;

/// How frequency bars are coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarPalette {
    /// Channel intensity equals the bin magnitude.
    Grayscale,
    /// Hue sweeps from 180° to 210° across the bins.
    HueSweep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    FrequencyBars(BarPalette),
    WaveformRibbon,
    ParticleSphere,
}

impl Layer {
    pub fn draw(
        &self,
        frame: &AnalysisFrame,
        surface: &mut dyn Surface,
        sphere: &mut SphereAngle,
        visuals: &VisualConfig,
    ) {
        match *self {
            Layer::FrequencyBars(palette) => draw_frequency_bars(frame, palette, surface, visuals),
            Layer::WaveformRibbon => draw_waveform_ribbon(frame, surface),
            Layer::ParticleSphere => draw_particle_sphere(frame, surface, sphere, visuals.sphere_step),
        }
    }
}

/// Ordered layer list per slot.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMap {
    layers: [Vec<Layer>; SLOT_COUNT],
}

impl Default for LayerMap {
    fn default() -> Self {
        Self {
            layers: [
                vec![Layer::FrequencyBars(BarPalette::Grayscale)],
                vec![
                    Layer::FrequencyBars(BarPalette::HueSweep),
                    Layer::WaveformRibbon,
                    Layer::ParticleSphere,
                ],
            ],
        }
    }
}

impl LayerMap {
    pub fn layers_for(&self, slot: Slot) -> &[Layer] {
        &self.layers[slot.index()]
    }

    pub fn set_layers(&mut self, slot: Slot, layers: Vec<Layer>) {
        self.layers[slot.index()] = layers;
    }
}

/// Rotation accumulator for the particle sphere. Never reset; the
/// trigonometry wraps it. Kept in `f64` so small steps still register after
/// hours of frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SphereAngle(f64);

impl SphereAngle {
    pub fn from_radians(radians: f64) -> Self {
        Self(radians)
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn advance(&mut self, step: f64) {
        self.0 += step;
    }
}

pub fn bar_width(surface_width: f32, bins: usize, scale: f32) -> f32 {
    surface_width / bins as f32 * scale
}

pub fn bar_color(palette: BarPalette, index: usize, bins: usize, magnitude: u8) -> Color {
    match palette {
        BarPalette::Grayscale => Color::gray(magnitude),
        BarPalette::HueSweep => {
            let hue = HUE_START + index as f32 / bins as f32 * HUE_SPAN;
            Color::hsl(hue, 100.0, 50.0)
        }
    }
}

/// Bars run left to right from the bottom edge, one per bin. Wide bars may run
/// past the right edge.
pub fn draw_frequency_bars(
    frame: &AnalysisFrame,
    palette: BarPalette,
    surface: &mut dyn Surface,
    visuals: &VisualConfig,
) {
    let bins = frame.bin_count();
    if bins == 0 {
        return;
    }

    let width = bar_width(surface.width(), bins, visuals.bar_width_scale);
    let bottom = surface.height();
    let mut x = 0.0;

    for (index, &magnitude) in frame.frequency_bins.iter().enumerate() {
        let height = f32::from(magnitude);
        let fill = Fill::Solid(bar_color(palette, index, bins, magnitude));
        surface.fill_rect(x, bottom - height, width, height, &fill);
        x += width + visuals.bar_gap;
    }
}

/// Outline of the ribbon: the centre baseline at both ends with one point per
/// time-domain sample between them.
pub fn ribbon_outline(time_bins: &[u8], width: f32, height: f32) -> Vec<Point> {
    let center_y = height / 2.0;
    let slice = if time_bins.is_empty() {
        0.0
    } else {
        width / time_bins.len() as f32
    };

    let mut points = Vec::with_capacity(time_bins.len() + 2);
    points.push(Point::new(0.0, center_y));
    points.extend(time_bins.iter().enumerate().map(|(index, &sample)| {
        let offset = (f32::from(sample) / 128.0 - 1.0) * center_y;
        Point::new(index as f32 * slice, center_y + offset)
    }));
    points.push(Point::new(width, center_y));
    points
}

pub fn ribbon_fill(height: f32) -> Fill {
    let gradient = LinearGradient::new(Point::new(0.0, 0.0), Point::new(0.0, height))
        .with_stop(
            0.0,
            Color::Rgba {
                r: 0,
                g: 255,
                b: 255,
                a: RIBBON_ALPHA,
            },
        )
        .with_stop(
            1.0,
            Color::Rgba {
                r: 0,
                g: 128,
                b: 255,
                a: RIBBON_ALPHA,
            },
        );
    Fill::Gradient(gradient)
}

pub fn draw_waveform_ribbon(frame: &AnalysisFrame, surface: &mut dyn Surface) {
    let (width, height) = (surface.width(), surface.height());
    let outline = ribbon_outline(&frame.time_bins, width, height);
    surface.fill_path(&outline, &ribbon_fill(height));
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub center: Point,
    pub radius: f32,
    pub color: Color,
}

/// Places bin `index` on the rotating ring.
pub fn sphere_particle(
    index: usize,
    bins: usize,
    magnitude: u8,
    rotation: SphereAngle,
    width: f32,
    height: f32,
) -> Particle {
    let center_x = width / 2.0;
    let center_y = height / 2.0;
    let max_radius = center_x.min(center_y) * 1.5;
    let percent = f32::from(magnitude) / 255.0;

    let angle = index as f64 / bins as f64 * TAU + rotation.radians();
    let ring = percent * max_radius;
    let depth = (angle + rotation.radians()).cos() as f32;
    let (sin, cos) = angle.sin_cos();

    Particle {
        center: Point::new(center_x + ring * cos as f32, center_y + ring * sin as f32),
        radius: 20.0 + 40.0 * percent,
        color: Color::Hsla {
            h: HUE_START + percent * HUE_SPAN,
            s: 100.0,
            l: 50.0 + depth * 10.0,
            a: PARTICLE_ALPHA,
        },
    }
}

/// Advances the rotation, then draws one particle per bin in bin order.
pub fn draw_particle_sphere(
    frame: &AnalysisFrame,
    surface: &mut dyn Surface,
    sphere: &mut SphereAngle,
    step: f64,
) {
    sphere.advance(step);

    let bins = frame.bin_count();
    let (width, height) = (surface.width(), surface.height());
    for (index, &magnitude) in frame.frequency_bins.iter().enumerate() {
        let particle = sphere_particle(index, bins, magnitude, *sphere, width, height);
        surface.fill_circle(particle.center, particle.radius, &Fill::Solid(particle.color));
    }
}
