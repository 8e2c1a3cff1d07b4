//! Click ripple overlay for Stream Studio
//! Expanding concentric rings that fade on a single exponential curve

use crate::config::RippleConfig;
use egui::{Color32, Painter, Pos2, Rect, Stroke};

#[derive(Clone, Copy, Debug)]
pub struct Ripple {
    pub origin: Pos2,
    pub radius: f32,
    pub life: u32,
    pub opacity: f32,
}

/// All live ripples, advanced once per frame by the same driver as the stream
#[derive(Default)]
pub struct RippleLayer {
    ripples: Vec<Ripple>,
}

impl RippleLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, origin: Pos2) {
        self.ripples.push(Ripple {
            origin,
            radius: 0.0,
            life: 0,
            opacity: 1.0,
        });
    }

    pub fn len(&self) -> usize {
        self.ripples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ripples.is_empty()
    }

    pub fn ripples(&self) -> &[Ripple] {
        &self.ripples
    }

    /// Expand and fade every ripple, dropping the ones that are invisible
    pub fn tick(&mut self, config: &RippleConfig) {
        let max_life = config.max_life.max(1) as f32;
        let speed = config.speed;
        self.ripples.retain_mut(|r| {
            r.life += 1;
            r.radius += speed;
            let progress = (r.life as f32 / max_life).min(1.0);
            r.opacity = (1.0 - progress).powf(2.5);
            r.opacity > 0.001
        });
    }

    pub fn render(&self, painter: &Painter, rect: Rect, config: &RippleConfig) {
        if !config.enabled {
            return;
        }
        for r in &self.ripples {
            let origin = rect.min + r.origin.to_vec2();
            for ring in 0..config.rings {
                let ring_radius = r.radius + ring as f32 * 20.0;
                let ring_opacity = r.opacity * (0.4 - ring as f32 * 0.2);
                if ring_opacity <= 0.01 {
                    continue;
                }
                let alpha = (ring_opacity * 255.0) as u8;
                let width = 1.5 - ring as f32 * 0.3;
                painter.circle_stroke(
                    origin,
                    ring_radius,
                    Stroke::new(width, Color32::from_rgba_unmultiplied(255, 255, 255, alpha)),
                );
            }
        }
    }
}
