//! Flow path math for Stream Studio
//! Pure functions shared by the frame integrator and click hit-testing

use crate::config::StreamConfig;
use egui::Pos2;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f32::consts::{FRAC_1_SQRT_2, PI};

/// Screen dimensions the path is evaluated against
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Narrow (portrait-like) screens get their own spread and curve set
    pub fn is_narrow(&self) -> bool {
        self.width <= 768.0
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Position along the stream: diagonal from top-right to bottom-left with two
/// sine bends applied perpendicular to the diagonal, and the lateral offset
/// scaled by a river width that grows quadratically with progress.
pub fn flow_position(
    config: &StreamConfig,
    viewport: Viewport,
    t: f32,
    offset: f32,
    width: f32,
) -> Pos2 {
    let x = viewport.width * (1.0 - t);
    let y = viewport.height * t;

    // Narrow screens are tall, so the bend amplitude follows the height there
    let (curve, basis) = if viewport.is_narrow() {
        (config.narrow_curve, viewport.height)
    } else {
        (config.curve, viewport.width)
    };
    let bend = (t * PI * 2.0).sin() * basis * curve[0]
        + (t * PI * 3.5 + 0.5).sin() * basis * curve[1];

    // Perspective widening toward the end of the stream
    let river_width = width * (config.widening[0] + t * t * config.widening[1]);

    // The diagonal runs at 45 degrees, so perpendicular components project by 1/sqrt(2)
    let perp_x = -offset * river_width * FRAC_1_SQRT_2;
    let perp_y = offset * river_width * FRAC_1_SQRT_2;

    Pos2::new(
        x + bend * FRAC_1_SQRT_2 + perp_x,
        y + bend * FRAC_1_SQRT_2 + perp_y,
    )
}

/// Opacity envelope along the stream: ramps up over the first `fade_edge`
/// fraction of progress, down over the last, full in between.
pub fn edge_fade(t: f32, fade_edge: f32) -> f32 {
    (t / fade_edge).min((1.0 - t) / fade_edge).clamp(0.0, 1.0)
}

/// Linear falloff from 1 at distance 0 to 0 at the radius boundary
pub fn falloff(dist: f32, radius: f32) -> f32 {
    (1.0 - dist / radius).clamp(0.0, 1.0)
}

/// Gaussian lateral offset from the stream centerline
pub fn lateral_offset(rng: &mut impl Rng, spread: f32) -> f32 {
    let z: f32 = rng.sample(StandardNormal);
    z * spread
}
