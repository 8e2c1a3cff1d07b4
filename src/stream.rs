//! Particle Stream Engine for Stream Studio
//! Fixed pool of particles flowing along the S-curve path, with pointer
//! repulsion, click scatter and rapid-click bursts

use crate::config::{blend_for_theme, BlendStyle, IconShape, StreamColors, StreamConfig, ThemeMode};
use crate::flow::{edge_fade, falloff, flow_position, lateral_offset, Viewport};
use egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};
use rand::Rng;
use rayon::prelude::*;
use std::f32::consts::PI;

/// Scatter components below this are clamped to zero to stop perpetual drift
const SCATTER_EPSILON: f32 = 0.01;

/// Individual particle state. Progress, scatter velocity and color mix persist
/// across wraps; everything else is redrawn when a traversal completes.
#[derive(Clone, Debug)]
pub struct StreamParticle {
    /// Position along the path, always in [0, 1)
    pub t: f32,
    pub speed: f32,
    /// Signed perpendicular displacement from the centerline
    pub offset: f32,
    /// River-width sample for this life
    pub width: f32,
    /// 0 = plain dot, otherwise 1-based index into the configured icon set
    pub icon: u8,
    pub rotation: f32,
    /// Transient scatter velocity, decays geometrically
    pub sx: f32,
    pub sy: f32,
    /// Eased blend factor toward the hover color, in [0, 1]
    pub color_mix: f32,
}

impl StreamParticle {
    fn spawn(config: &StreamConfig, viewport: Viewport, rng: &mut impl Rng) -> Self {
        let mut p = Self {
            t: rng.gen::<f32>(),
            speed: 0.0,
            offset: 0.0,
            width: 0.0,
            icon: 0,
            rotation: 0.0,
            sx: 0.0,
            sy: 0.0,
            color_mix: 0.0,
        };
        p.redraw_life(config, viewport, rng);
        p
    }

    /// Redraw every per-life field; progress and transient state are untouched
    fn redraw_life(&mut self, config: &StreamConfig, viewport: Viewport, rng: &mut impl Rng) {
        let (width, spread) = if viewport.is_narrow() {
            (config.narrow_width, config.narrow_spread)
        } else {
            (config.width, config.spread)
        };
        self.speed = config.speed[0] + rng.gen::<f32>() * config.speed[1];
        self.offset = lateral_offset(rng, spread);
        self.width = width[0] + rng.gen::<f32>() * width[1];
        self.icon = if !config.icons.is_empty() && rng.gen::<f32>() < config.icon_ratio {
            rng.gen_range(0..config.icons.len()) as u8 + 1
        } else {
            0
        };
        self.rotation = rng.gen::<f32>() * PI * 2.0;
    }

    fn scatter_magnitude(&self) -> f32 {
        (self.sx * self.sx + self.sy * self.sy).sqrt()
    }
}

/// Per-frame render attributes, one slot per particle, rewritten every tick
/// and read by the draw pass immediately after.
#[derive(Default)]
pub struct FrameAttributes {
    pub positions: Vec<Pos2>,
    pub alphas: Vec<f32>,
    pub sizes: Vec<f32>,
    pub color_mix: Vec<f32>,
    pub icon_kind: Vec<u8>,
    pub rotations: Vec<f32>,
}

impl FrameAttributes {
    fn resize(&mut self, len: usize) {
        self.positions.resize(len, Pos2::ZERO);
        self.alphas.resize(len, 0.0);
        self.sizes.resize(len, 0.0);
        self.color_mix.resize(len, 0.0);
        self.icon_kind.resize(len, 0);
        self.rotations.resize(len, 0.0);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Owned stream state: particle pool, pointer, click history and burst flag.
/// Driven by an external frame loop calling [`StreamEngine::tick`].
pub struct StreamEngine {
    pub particles: Vec<StreamParticle>,
    viewport: Viewport,
    attrs: FrameAttributes,
    pointer: Option<Pos2>,
    click_times: Vec<f64>,
    bursting: bool,
    burst_until: f64,
    colors: StreamColors,
    blend: BlendStyle,
}

impl StreamEngine {
    pub fn new(config: &StreamConfig, viewport: Viewport, theme: ThemeMode) -> Self {
        let mut rng = rand::thread_rng();
        let particles = (0..config.count)
            .map(|_| StreamParticle::spawn(config, viewport, &mut rng))
            .collect();
        let mut attrs = FrameAttributes::default();
        attrs.resize(config.count);
        Self {
            particles,
            viewport,
            attrs,
            pointer: None,
            click_times: Vec::new(),
            bursting: false,
            burst_until: 0.0,
            colors: StreamColors::for_theme(theme),
            blend: blend_for_theme(theme),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Latest pointer position; consumed lazily by the next tick
    pub fn set_pointer(&mut self, pointer: Option<Pos2>) {
        self.pointer = pointer;
    }

    /// Theme-changed notification: swaps the color pair and blend style
    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.colors = StreamColors::for_theme(theme);
        self.blend = blend_for_theme(theme);
    }

    pub fn is_bursting(&self) -> bool {
        self.bursting
    }

    pub fn attributes(&self) -> &FrameAttributes {
        &self.attrs
    }

    fn ensure_count(&mut self, config: &StreamConfig) {
        if self.particles.len() == config.count {
            return;
        }
        let mut rng = rand::thread_rng();
        let viewport = self.viewport;
        self.particles.truncate(config.count);
        while self.particles.len() < config.count {
            self.particles
                .push(StreamParticle::spawn(config, viewport, &mut rng));
        }
        self.attrs.resize(config.count);
    }

    /// Advance the whole pool by one frame and rewrite the render attributes
    pub fn tick(&mut self, config: &StreamConfig, now_ms: f64) {
        if self.bursting && now_ms >= self.burst_until {
            self.bursting = false;
        }
        self.ensure_count(config);

        let mut rng = rand::thread_rng();
        let viewport = self.viewport;
        let pointer = self.pointer;

        for (i, p) in self.particles.iter_mut().enumerate() {
            // Advance progress; a completed traversal starts a fresh life
            p.t += p.speed;
            if p.t >= 1.0 {
                p.redraw_life(config, viewport, &mut rng);
                p.t = 0.0;
            }

            // Scatter decay with zero clamp
            if p.sx != 0.0 || p.sy != 0.0 {
                p.sx *= config.scatter_friction;
                p.sy *= config.scatter_friction;
                if p.sx.abs() < SCATTER_EPSILON {
                    p.sx = 0.0;
                }
                if p.sy.abs() < SCATTER_EPSILON {
                    p.sy = 0.0;
                }
            }

            let base = flow_position(config, viewport, p.t, p.offset, p.width);
            let mut px = base.x + p.sx;
            let mut py = base.y + p.sy;

            // Pointer repulsion and hover strength, linear falloff to the radius
            let mut hover_target = 0.0;
            if let Some(m) = pointer {
                let dx = px - m.x;
                let dy = py - m.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < config.pointer_radius {
                    hover_target = falloff(dist, config.pointer_radius);
                    if dist > 0.0 {
                        let force = hover_target * config.pointer_force;
                        px += (dx / dist) * force;
                        py += (dy / dist) * force;
                    }
                }
            }

            // Asymmetric easing: snap toward the hover color, linger on the way back
            let rate = if hover_target > p.color_mix {
                config.hover_ease_in
            } else {
                config.hover_ease_out
            };
            p.color_mix += (hover_target - p.color_mix) * rate;
            p.color_mix = p.color_mix.clamp(0.0, 1.0);

            let size = config.size_range[0] + p.t * config.size_range[1];

            self.attrs.positions[i] = Pos2::new(px, py);
            self.attrs.alphas[i] = edge_fade(p.t, config.fade_edge) * config.max_alpha;
            self.attrs.sizes[i] = if p.icon > 0 {
                size * config.icon_scale
            } else {
                size
            };
            self.attrs.color_mix[i] = p.color_mix;
            self.attrs.icon_kind[i] = p.icon;
            self.attrs.rotations[i] = p.rotation;
        }
    }

    /// Click handling: rolling rapid-click window, burst at the threshold,
    /// otherwise an accumulating local scatter impulse. Ignored while bursting.
    pub fn handle_click(&mut self, config: &StreamConfig, click: Pos2, now_ms: f64) {
        if self.bursting {
            return;
        }

        self.click_times.push(now_ms);
        self.click_times
            .retain(|&t| now_ms - t < config.burst_window_ms);

        if self.click_times.len() >= config.burst_clicks {
            self.click_times.clear();
            self.burst(config, now_ms);
            return;
        }

        let viewport = self.viewport;
        self.particles.par_iter_mut().for_each(|p| {
            // Hit-test against the undisturbed path position
            let pos = flow_position(config, viewport, p.t, p.offset, p.width);
            let dx = pos.x - click.x;
            let dy = pos.y - click.y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > 0.0 && dist < config.scatter_radius {
                let mut rng = rand::thread_rng();
                let strength = falloff(dist, config.scatter_radius);
                let vel = config.scatter_force[0] + rng.gen::<f32>() * config.scatter_force[1];
                p.sx += (dx / dist) * vel * strength;
                p.sy += (dy / dist) * vel * strength;
            }
        });
    }

    /// Throw every particle outward from the viewport center. Particles rejoin
    /// the stream through ordinary scatter decay; no explicit path snap.
    fn burst(&mut self, config: &StreamConfig, now_ms: f64) {
        log::debug!("stream burst triggered");
        self.bursting = true;
        self.burst_until = now_ms + config.burst_reset_ms;

        let viewport = self.viewport;
        let center = viewport.center();
        self.particles.par_iter_mut().for_each(|p| {
            let mut rng = rand::thread_rng();
            let pos = flow_position(config, viewport, p.t, p.offset, p.width);
            let angle =
                (pos.y - center.y).atan2(pos.x - center.x) + (rng.gen::<f32>() - 0.5) * 1.5;
            let vel = config.burst_force[0] + rng.gen::<f32>() * config.burst_force[1];
            p.sx = angle.cos() * vel;
            p.sy = angle.sin() * vel;
        });
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn render(&self, painter: &Painter, rect: Rect, config: &StreamConfig) {
        let base = self.colors.base;
        let hover = self.colors.hover;

        for i in 0..self.attrs.len() {
            let alpha = self.attrs.alphas[i];
            if alpha < 0.01 {
                continue;
            }
            let a = (alpha * 255.0).min(255.0) as u8;
            let mix = self.attrs.color_mix[i];
            let color = Color32::from_rgba_unmultiplied(
                lerp_channel(base[0], hover[0], mix),
                lerp_channel(base[1], hover[1], mix),
                lerp_channel(base[2], hover[2], mix),
                a,
            );
            let pos = rect.min + Vec2::new(self.attrs.positions[i].x, self.attrs.positions[i].y);
            let size = self.attrs.sizes[i];

            match self.attrs.icon_kind[i] {
                0 => self.draw_dot(painter, pos, size, color, a),
                _ if config.icons.is_empty() => self.draw_dot(painter, pos, size, color, a),
                k => {
                    let shape = config.icons[(k - 1) as usize % config.icons.len()];
                    let angle = self.attrs.rotations[i];
                    match shape {
                        IconShape::Star => draw_star(painter, pos, size, angle, color),
                        IconShape::Rocket => draw_rocket(painter, pos, size, angle, color),
                    }
                }
            }
        }
    }

    fn draw_dot(&self, painter: &Painter, pos: Pos2, size: f32, color: Color32, alpha: u8) {
        match self.blend {
            BlendStyle::Additive => {
                // Soft halo plus core reads as additive on dark backgrounds
                let glow = Color32::from_rgba_unmultiplied(
                    color.r(),
                    color.g(),
                    color.b(),
                    (alpha / 3).max(4),
                );
                painter.circle_filled(pos, size * 1.6, glow);
                painter.circle_filled(pos, size, color);
            }
            BlendStyle::Normal => {
                painter.circle_filled(pos, size, color);
            }
        }
    }
}

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}

fn draw_star(painter: &Painter, center: Pos2, size: f32, angle: f32, color: Color32) {
    let points = 5;
    let outer_r = size;
    let inner_r = size * 0.4;

    let mut vertices = Vec::with_capacity(points * 2);
    for i in 0..(points * 2) {
        let a = angle + (i as f32 * PI / points as f32);
        let r = if i % 2 == 0 { outer_r } else { inner_r };
        vertices.push(Pos2::new(center.x + a.cos() * r, center.y + a.sin() * r));
    }

    for i in 0..vertices.len() {
        let next = (i + 1) % vertices.len();
        painter.line_segment([vertices[i], vertices[next]], Stroke::new(1.0, color));
    }
}

fn draw_rocket(painter: &Painter, center: Pos2, size: f32, angle: f32, color: Color32) {
    let dir = Vec2::new(angle.cos(), angle.sin());
    let nose = center + dir * size;
    let tail = center - dir * size;

    // Body with a nose dot and two swept-back fins
    painter.line_segment([tail, nose], Stroke::new(2.0, color));
    painter.circle_filled(nose, size * 0.3, color);
    for side in [-1.0f32, 1.0] {
        let fin_angle = angle + PI * (1.0 - side * 0.25);
        let fin = Vec2::new(fin_angle.cos(), fin_angle.sin());
        painter.line_segment([tail + dir * size * 0.4, tail + fin * size * 0.7], Stroke::new(1.5, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(1280.0, 800.0)
    }

    fn engine_with(count: usize) -> (StreamEngine, StreamConfig) {
        let config = StreamConfig {
            count,
            ..StreamConfig::default()
        };
        let engine = StreamEngine::new(&config, viewport(), ThemeMode::Dark);
        (engine, config)
    }

    fn assert_life_fields_in_range(p: &StreamParticle, config: &StreamConfig) {
        assert!(p.speed >= config.speed[0] && p.speed <= config.speed[0] + config.speed[1]);
        assert!(p.width >= config.width[0] && p.width <= config.width[0] + config.width[1]);
        assert!((p.icon as usize) <= config.icons.len());
        assert!(p.rotation >= 0.0 && p.rotation < PI * 2.0 + 1e-3);
    }

    #[test]
    fn pool_starts_full_with_randomized_progress() {
        let (engine, config) = engine_with(200);
        assert_eq!(engine.particles.len(), 200);
        for p in &engine.particles {
            assert!(p.t >= 0.0 && p.t < 1.0);
            assert_eq!(p.sx, 0.0);
            assert_eq!(p.color_mix, 0.0);
            assert_life_fields_in_range(p, &config);
        }
        let spread: f32 = engine.particles.iter().map(|p| p.t).sum::<f32>() / 200.0;
        // Uniform initial progress should average well away from the ends
        assert!(spread > 0.3 && spread < 0.7);
    }

    #[test]
    fn invariants_hold_over_many_frames() {
        let (mut engine, config) = engine_with(100);
        engine.set_pointer(Some(Pos2::new(400.0, 300.0)));
        for frame in 0..600 {
            let now = frame as f64 * 16.0;
            if frame % 37 == 0 {
                engine.handle_click(&config, Pos2::new(600.0, 400.0), now);
            }
            engine.tick(&config, now);
            for p in &engine.particles {
                assert!(p.t >= 0.0 && p.t < 1.0, "progress out of range: {}", p.t);
                assert!(p.color_mix >= 0.0 && p.color_mix <= 1.0);
            }
            for &a in &engine.attributes().alphas {
                assert!(a >= 0.0 && a <= config.max_alpha + 1e-6);
            }
        }
    }

    #[test]
    fn wrap_redraws_life_fields_and_keeps_scatter() {
        let (mut engine, config) = engine_with(1);
        let p = &mut engine.particles[0];
        p.t = 0.9999;
        p.speed = 0.001;
        p.sx = 5.0;
        p.sy = -5.0;

        engine.tick(&config, 0.0);

        let p = &engine.particles[0];
        assert!(p.t < config.speed[0] + config.speed[1] + 1e-6);
        assert_life_fields_in_range(p, &config);
        // Scatter survives a wrap, reduced only by one frame of friction
        assert!((p.sx - 5.0 * config.scatter_friction).abs() < 1e-4);
        assert!((p.sy + 5.0 * config.scatter_friction).abs() < 1e-4);
    }

    #[test]
    fn scatter_decays_geometrically_to_zero() {
        let (mut engine, config) = engine_with(1);
        engine.particles[0].t = 0.1;
        engine.particles[0].sx = 10.0;
        engine.particles[0].sy = 0.0;

        for k in 1..=20 {
            engine.tick(&config, k as f64 * 16.0);
            let expected = 10.0 * config.scatter_friction.powi(k);
            assert!((engine.particles[0].sx - expected).abs() < 1e-3);
        }

        // Friction alone must reach the zero clamp in finite frames
        for k in 21..=400 {
            engine.tick(&config, k as f64 * 16.0);
        }
        assert_eq!(engine.particles[0].sx, 0.0);
        assert_eq!(engine.particles[0].sy, 0.0);
    }

    #[test]
    fn hover_ease_is_asymmetric() {
        let (mut engine, config) = engine_with(1);
        engine.particles[0].t = 0.5;
        engine.particles[0].offset = 0.0;

        // Park the pointer on top of the particle's path position
        let pos = flow_position(
            &config,
            engine.viewport(),
            engine.particles[0].t + engine.particles[0].speed,
            engine.particles[0].offset,
            engine.particles[0].width,
        );
        engine.set_pointer(Some(pos));
        engine.tick(&config, 0.0);
        let rise = engine.particles[0].color_mix;
        assert!(rise > 0.1, "hover strength near the pointer: {}", rise);

        engine.set_pointer(None);
        engine.tick(&config, 16.0);
        let fall = rise - engine.particles[0].color_mix;
        assert!(fall > 0.0);
        // Ease-out is slower than ease-in
        assert!(fall < rise * config.hover_ease_out * 1.5);
    }

    #[test]
    fn pointer_outside_radius_leaves_particles_alone() {
        let (mut engine, config) = engine_with(1);
        engine.particles[0].t = 0.5;
        engine.particles[0].offset = 0.0;
        engine.set_pointer(Some(Pos2::new(-10_000.0, -10_000.0)));
        engine.tick(&config, 0.0);
        assert_eq!(engine.particles[0].color_mix, 0.0);

        let expected = flow_position(
            &config,
            engine.viewport(),
            engine.particles[0].t,
            engine.particles[0].offset,
            engine.particles[0].width,
        );
        let got = engine.attributes().positions[0];
        assert!((got.x - expected.x).abs() < 1e-3);
        assert!((got.y - expected.y).abs() < 1e-3);
    }

    #[test]
    fn click_scatter_accumulates_within_radius() {
        let (mut engine, config) = engine_with(1);
        engine.particles[0].t = 0.5;
        engine.particles[0].offset = 0.0;
        let pos = flow_position(
            &config,
            engine.viewport(),
            0.5,
            0.0,
            engine.particles[0].width,
        );
        let click = Pos2::new(pos.x + 50.0, pos.y);

        engine.handle_click(&config, click, 0.0);
        let first = engine.particles[0].scatter_magnitude();
        assert!(first > 0.0);

        engine.handle_click(&config, click, 100.0);
        let second = engine.particles[0].scatter_magnitude();
        assert!(second > first, "impulses accumulate: {} -> {}", first, second);
    }

    #[test]
    fn click_outside_radius_is_ignored() {
        let (mut engine, config) = engine_with(50);
        engine.handle_click(&config, Pos2::new(-10_000.0, -10_000.0), 0.0);
        for p in &engine.particles {
            assert_eq!(p.scatter_magnitude(), 0.0);
        }
    }

    #[test]
    fn rapid_clicks_trigger_a_full_burst() {
        let (mut engine, config) = engine_with(80);
        let click = Pos2::new(-10_000.0, -10_000.0); // too far for normal scatter

        for i in 0..4 {
            engine.handle_click(&config, click, i as f64 * 100.0);
            assert!(!engine.is_bursting());
        }
        engine.handle_click(&config, click, 400.0);
        assert!(engine.is_bursting());

        let min = config.burst_force[0];
        let max = config.burst_force[0] + config.burst_force[1];
        for p in &engine.particles {
            let mag = p.scatter_magnitude();
            assert!(mag >= min - 1e-3 && mag <= max + 1e-3, "burst magnitude {}", mag);
        }
    }

    #[test]
    fn clicks_are_suppressed_while_bursting() {
        let (mut engine, config) = engine_with(40);
        let far = Pos2::new(-10_000.0, -10_000.0);
        for i in 0..5 {
            engine.handle_click(&config, far, i as f64 * 100.0);
        }
        assert!(engine.is_bursting());

        let before: Vec<(f32, f32)> = engine.particles.iter().map(|p| (p.sx, p.sy)).collect();
        // A sixth click lands inside the reset delay and must change nothing
        engine.handle_click(&config, Pos2::new(640.0, 400.0), 500.0);
        let after: Vec<(f32, f32)> = engine.particles.iter().map(|p| (p.sx, p.sy)).collect();
        assert_eq!(before, after);

        // The flag clears once the reset delay elapses
        engine.tick(&config, 400.0 + config.burst_reset_ms + 1.0);
        assert!(!engine.is_bursting());
    }

    #[test]
    fn stale_clicks_fall_out_of_the_window() {
        let (mut engine, config) = engine_with(10);
        let far = Pos2::new(-10_000.0, -10_000.0);
        // Five clicks spread wider than the window never reach the threshold
        for i in 0..5 {
            engine.handle_click(&config, far, i as f64 * config.burst_window_ms);
        }
        assert!(!engine.is_bursting());
    }

    #[test]
    fn icon_particles_render_larger() {
        let (mut engine, config) = engine_with(2);
        engine.particles[0].t = 0.5;
        engine.particles[0].icon = 0;
        engine.particles[1].t = 0.5;
        engine.particles[1].icon = 1;
        // Freeze progress so both sample the same point of the size ramp
        engine.particles[0].speed = 0.0;
        engine.particles[1].speed = 0.0;
        engine.tick(&config, 0.0);

        let attrs = engine.attributes();
        assert!((attrs.sizes[1] - attrs.sizes[0] * config.icon_scale).abs() < 1e-4);
        assert_eq!(attrs.icon_kind[1], 1);
    }

    #[test]
    fn count_changes_are_applied_on_the_next_tick() {
        let (mut engine, mut config) = engine_with(100);
        config.count = 40;
        engine.tick(&config, 0.0);
        assert_eq!(engine.particles.len(), 40);
        assert_eq!(engine.attributes().len(), 40);

        config.count = 150;
        engine.tick(&config, 16.0);
        assert_eq!(engine.particles.len(), 150);
        assert_eq!(engine.attributes().len(), 150);
    }
}
