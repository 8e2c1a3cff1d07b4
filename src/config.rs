//! Configuration System for Stream Studio
//! All stream, ripple and theme tunables with JSON persistence

use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Enums
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn is_dark(&self) -> bool {
        matches!(self, ThemeMode::Dark)
    }
}

impl Default for ThemeMode {
    fn default() -> Self {
        Self::Dark
    }
}

/// How particles are composited over the background
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum BlendStyle {
    /// Layered glow, reads as additive on a dark background
    Additive,
    /// Flat alpha-blended dots for light backgrounds
    Normal,
}

/// Glyph drawn for the occasional non-dot particle
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum IconShape {
    Star,
    Rocket,
}

// ============================================================================
// Theme colors
// ============================================================================

/// Base/hover color pair for one theme
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct StreamColors {
    pub name: String,
    pub base: [u8; 3],
    pub hover: [u8; 3],
    pub background: [u8; 3],
}

impl StreamColors {
    pub fn dark() -> Self {
        Self {
            name: "Dark".to_string(),
            base: [71, 138, 209],
            hover: [41, 255, 73],
            background: [10, 10, 16],
        }
    }

    pub fn light() -> Self {
        Self {
            name: "Light".to_string(),
            base: [46, 94, 148],
            hover: [20, 140, 45],
            background: [242, 242, 246],
        }
    }

    pub fn for_theme(theme: ThemeMode) -> Self {
        match theme {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }
}

pub fn blend_for_theme(theme: ThemeMode) -> BlendStyle {
    match theme {
        ThemeMode::Dark => BlendStyle::Additive,
        ThemeMode::Light => BlendStyle::Normal,
    }
}

// ============================================================================
// Stream configuration
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct StreamConfig {
    /// Total particle count
    pub count: usize,
    /// River width [base, random range]
    pub width: [f32; 2],
    /// River width on narrow viewports (<= 768 px wide)
    pub narrow_width: [f32; 2],
    /// Per-frame progress advance [base, random range]
    pub speed: [f32; 2],
    /// Lateral spread (gaussian multiplier)
    pub spread: f32,
    /// Lateral spread on narrow viewports
    pub narrow_spread: f32,
    /// S-bend amplitudes [primary, secondary]
    pub curve: [f32; 2],
    /// S-bend amplitudes on narrow viewports (basis is height, not width)
    pub narrow_curve: [f32; 2],
    /// Perspective widening [start, quadratic scale]
    pub widening: [f32; 2],
    /// Dot size [min at start, added at end]
    pub size_range: [f32; 2],
    /// Max particle opacity
    pub max_alpha: f32,
    /// Fade in/out zone at stream ends (fraction of progress)
    pub fade_edge: f32,
    /// Cursor repulsion radius (px)
    pub pointer_radius: f32,
    /// Cursor repulsion strength
    pub pointer_force: f32,
    /// Ease rate toward hover color (0-1)
    pub hover_ease_in: f32,
    /// Ease rate back to base color (0-1)
    pub hover_ease_out: f32,
    /// Click scatter radius (px)
    pub scatter_radius: f32,
    /// Scatter velocity [min, random range]
    pub scatter_force: [f32; 2],
    /// Scatter velocity decay per frame (0-1)
    pub scatter_friction: f32,
    /// Rapid clicks needed to break the stream
    pub burst_clicks: usize,
    /// Time window for rapid clicks (ms)
    pub burst_window_ms: f64,
    /// Explosion velocity [min, random range]
    pub burst_force: [f32; 2],
    /// Delay before the stream accepts clicks again (ms)
    pub burst_reset_ms: f64,
    /// Glyphs scattered through the stream
    pub icons: Vec<IconShape>,
    /// Fraction of particles that render as glyphs (0-1)
    pub icon_ratio: f32,
    /// Glyph size multiplier vs normal dots
    pub icon_scale: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            count: 800,
            width: [400.0, 100.0],
            narrow_width: [1600.0, 150.0],
            speed: [0.0003, 0.0004],
            spread: 1.3,
            narrow_spread: 3.4,
            curve: [0.28, 0.12],
            narrow_curve: [0.22, 0.10],
            widening: [0.3, 1.4],
            size_range: [2.0, 4.0],
            max_alpha: 0.8,
            fade_edge: 0.08,
            pointer_radius: 420.0,
            pointer_force: 60.0,
            hover_ease_in: 0.15,
            hover_ease_out: 0.04,
            scatter_radius: 300.0,
            scatter_force: [25.0, 15.0],
            scatter_friction: 0.96,
            burst_clicks: 5,
            burst_window_ms: 1500.0,
            burst_force: [130.0, 20.0],
            burst_reset_ms: 2000.0,
            icons: vec![IconShape::Star, IconShape::Rocket],
            icon_ratio: 0.06,
            icon_scale: 3.0,
        }
    }
}

// ============================================================================
// Ripple configuration
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct RippleConfig {
    pub enabled: bool,
    /// Radius growth per frame (px)
    pub speed: f32,
    /// Lifetime in frames
    pub max_life: u32,
    /// Concentric rings per ripple
    pub rings: u32,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 2.5,
            max_life: 280,
            rings: 2,
        }
    }
}

// ============================================================================
// App configuration
// ============================================================================

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct AppConfig {
    pub theme: ThemeMode,
    /// Persisted FX preference; the stream only runs while this is on
    pub fx_enabled: bool,
    pub stream: StreamConfig,
    pub ripples: RippleConfig,
}

impl AppConfig {
    pub fn colors(&self) -> StreamColors {
        StreamColors::for_theme(self.theme)
    }

    pub fn blend(&self) -> BlendStyle {
        blend_for_theme(self.theme)
    }

    /// Read settings from disk, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring malformed settings file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    log::warn!("Failed to write settings file {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Failed to serialize settings: {}", e),
        }
    }
}
