//! Stream Studio - Main Application
//! Particle stream background with pointer repulsion, click scatter,
//! rapid-click bursts and a click ripple overlay

mod config;
mod flow;
mod ripples;
mod stream;

use config::{AppConfig, ThemeMode};
use eframe::egui;
use flow::Viewport;
use ripples::RippleLayer;
use std::path::PathBuf;
use std::time::Instant;
use stream::StreamEngine;

const SETTINGS_FILE: &str = "stream_settings.json";

/// Main application state
struct StreamApp {
    config: AppConfig,
    settings_path: PathBuf,
    engine: StreamEngine,
    ripples: RippleLayer,
    start: Instant,
    show_settings: bool,
}

impl StreamApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings_path = PathBuf::from(SETTINGS_FILE);
        let config = AppConfig::load(&settings_path);
        log::info!(
            "Starting with {} particles, theme {:?}, fx {}",
            config.stream.count,
            config.theme,
            if config.fx_enabled { "on" } else { "off" }
        );

        apply_visuals(&cc.egui_ctx, config.theme);

        // Placeholder viewport; the canvas reports its real size every frame
        let engine = StreamEngine::new(&config.stream, Viewport::new(1280.0, 800.0), config.theme);

        Self {
            config,
            settings_path,
            engine,
            ripples: RippleLayer::new(),
            start: Instant::now(),
            show_settings: false,
        }
    }

    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// The stream only runs in dark mode while the FX preference is on
    fn fx_active(&self) -> bool {
        self.config.fx_enabled && self.config.theme.is_dark()
    }

    fn set_theme(&mut self, theme: ThemeMode, ctx: &egui::Context) {
        if self.config.theme == theme {
            return;
        }
        self.config.theme = theme;
        self.engine.set_theme(theme);
        apply_visuals(ctx, theme);
        self.config.save(&self.settings_path);
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Stream Studio");
                ui.separator();

                let mut dark = self.config.theme.is_dark();
                if ui.checkbox(&mut dark, "Dark").changed() {
                    let theme = if dark { ThemeMode::Dark } else { ThemeMode::Light };
                    self.set_theme(theme, ctx);
                }

                let mut fx = self.config.fx_enabled;
                if ui.checkbox(&mut fx, "FX").changed() {
                    self.config.fx_enabled = fx;
                    if fx {
                        // Turning the effect on forces dark mode
                        self.set_theme(ThemeMode::Dark, ctx);
                    }
                    self.config.save(&self.settings_path);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    if self.engine.is_bursting() {
                        ui.label("burst!");
                    }
                });
            });
        });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let stream = &mut self.config.stream;
                ui.label("Stream");
                ui.add(egui::Slider::new(&mut stream.count, 100..=2000).text("Particles"));
                ui.add(egui::Slider::new(&mut stream.max_alpha, 0.0..=1.0).text("Opacity"));
                ui.add(egui::Slider::new(&mut stream.spread, 0.0..=4.0).text("Spread"));
                ui.add(
                    egui::Slider::new(&mut stream.pointer_radius, 50.0..=800.0)
                        .text("Pointer radius"),
                );
                ui.add(
                    egui::Slider::new(&mut stream.pointer_force, 0.0..=200.0)
                        .text("Pointer force"),
                );
                ui.add(
                    egui::Slider::new(&mut stream.scatter_friction, 0.80..=0.99)
                        .text("Scatter friction"),
                );
                ui.separator();
                ui.label("Ripples");
                ui.checkbox(&mut self.config.ripples.enabled, "Enabled");

                ui.separator();
                if ui.button("Save settings").clicked() {
                    self.config.save(&self.settings_path);
                }
            });
        self.show_settings = open;
    }

    fn render_canvas(&mut self, ctx: &egui::Context) {
        let background = self.config.colors().background;
        let fill = egui::Color32::from_rgb(background[0], background[1], background[2]);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(fill))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response = ui.allocate_rect(rect, egui::Sense::click());
                let painter = ui.painter_at(rect);

                let viewport = Viewport::new(rect.width(), rect.height());
                if viewport != self.engine.viewport() {
                    self.engine.resize(viewport);
                }

                // Pointer coordinates are canvas-local
                let pointer = response
                    .hover_pos()
                    .map(|p| egui::Pos2::new(p.x - rect.min.x, p.y - rect.min.y));
                self.engine.set_pointer(pointer);

                let now = self.now_ms();
                if response.clicked() {
                    if let Some(click) = response.interact_pointer_pos() {
                        let local = egui::Pos2::new(click.x - rect.min.x, click.y - rect.min.y);
                        if self.fx_active() {
                            self.engine.handle_click(&self.config.stream, local, now);
                        }
                        if self.config.ripples.enabled {
                            self.ripples.add(local);
                        }
                    }
                }

                if self.fx_active() {
                    self.engine.tick(&self.config.stream, now);
                    self.engine.render(&painter, rect, &self.config.stream);
                }

                self.ripples.tick(&self.config.ripples);
                self.ripples.render(&painter, rect, &self.config.ripples);
            });
    }
}

impl eframe::App for StreamApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render_top_bar(ctx);
        if self.show_settings {
            self.render_settings_window(ctx);
        }
        self.render_canvas(ctx);

        // Continuous repaint drives the frame loop
        ctx.request_repaint();
    }
}

fn apply_visuals(ctx: &egui::Context, theme: ThemeMode) {
    ctx.set_visuals(if theme.is_dark() {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    });
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Stream Studio")
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Stream Studio",
        options,
        Box::new(|cc| Box::new(StreamApp::new(cc))),
    )
}
