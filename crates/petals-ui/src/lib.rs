//! eframe host for the petal trail: page scaffolding, pointer capture and
//! a foreground layer the petals are painted on.

use std::time::Duration;

use petals_core::{Clock, EngineConfig, SystemClock, TrailManager};
use petals_platform::{ChannelPointerSource, PointerEvent, Result};
use tracing::{info, warn};

mod petal_shape;

pub use petal_shape::{petal_outline, petal_shapes, PainterSurface, PetalTransform};

const APP_NAME: &str = "Petal Drift";
const PETAL_LAYER: &str = "petal_trail";

/// Open the window and run the trail until it is closed.
pub fn run_app() -> Result<()> {
    let app = PetalsApp::new(EngineConfig::default())?;
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_NAME)
            .with_inner_size([960.0, 640.0]),
        ..Default::default()
    };
    info!("opening {APP_NAME} window");
    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )
    .map_err(|err| format!("eframe failed: {err}").into())
}

pub struct PetalsApp {
    trail: TrailManager,
    pointer_source: ChannelPointerSource,
    clock: SystemClock,
}

impl PetalsApp {
    pub fn new(config: EngineConfig) -> petals_core::Result<Self> {
        let mut pointer_source = ChannelPointerSource::new();
        let mut trail = TrailManager::new(config)?;
        trail.activate(&mut pointer_source)?;
        Ok(Self {
            trail,
            pointer_source,
            clock: SystemClock::new(),
        })
    }

    fn forward_pointer_moves(&mut self, context: &egui::Context, now: f64) {
        let moves: Vec<egui::Pos2> = context.input(|input| {
            input
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::PointerMoved(position) => Some(*position),
                    _ => None,
                })
                .collect()
        });
        for position in moves {
            self.pointer_source
                .publish(PointerEvent::new(position.x, position.y, now));
        }
    }

    fn schedule_repaint(&self, context: &egui::Context, now: f64) {
        if self.trail.wants_frame() {
            context.request_repaint();
        } else if let Some(deadline) = self.trail.next_deadline() {
            let wait_ms = (deadline - now).max(0.0);
            context.request_repaint_after(Duration::from_secs_f64(wait_ms / 1000.0));
        }
    }
}

impl eframe::App for PetalsApp {
    fn update(&mut self, context: &egui::Context, _frame: &mut eframe::Frame) {
        let now = self.clock.now_ms();
        self.forward_pointer_moves(context, now);

        egui::CentralPanel::default().show(context, |ui| {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("Move your cursor to see the magic").size(18.0));
            });
        });

        self.trail.advance(now);

        let painter = context.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new(PETAL_LAYER),
        ));
        let mut surface = PainterSurface::new(&painter);
        if let Err(err) = self.trail.render(&mut surface) {
            warn!("petal layer render failed: {err}");
        }

        self.schedule_repaint(context, now);
    }
}

impl Drop for PetalsApp {
    fn drop(&mut self) {
        if let Err(err) = self.trail.deactivate(&mut self.pointer_source) {
            warn!("trail teardown failed: {err}");
        }
    }
}
