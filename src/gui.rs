//! Desktop front-end.
//!
//! A single window: voice picker, text box, generate/play/save buttons, a
//! spinner while busy and a status bar. All state changes arrive through
//! [`Controller::poll`], which runs once per repaint; the window repaints at
//! least every [`StudioConfig::poll_interval`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::app::{Controller, KokoroSpeaker, View};
use crate::audio::RodioPlayer;
use crate::config::StudioConfig;
use crate::error::StudioError;
use crate::voice::Voice;

/// Fonts tried, in order, for CJK glyphs. egui's bundled fonts have none.
const CJK_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
];

/// Widget state the controller writes into.
#[derive(Debug, Default)]
struct ViewState {
    busy: bool,
    status: String,
    /// Modal dialogs as (title, message), shown one at a time in order.
    dialogs: VecDeque<(String, String)>,
}

impl View for ViewState {
    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.dialogs.push_back((title.to_string(), message.to_string()));
    }
}

impl ViewState {
    fn report(&mut self, error: &StudioError) {
        self.show_error(error.title(), &error.to_string());
    }
}

pub struct StudioApp {
    controller: Controller<KokoroSpeaker>,
    view: ViewState,
    voice: Voice,
    text: String,
    poll_interval: Duration,
}

impl StudioApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        controller: Controller<KokoroSpeaker>,
        config: &StudioConfig,
        startup_error: Option<StudioError>,
    ) -> Self {
        install_cjk_font(&cc.egui_ctx);

        let mut view = ViewState::default();
        match &startup_error {
            Some(e) => view.report(e),
            None => view.set_status("Ready"),
        }

        Self {
            controller,
            view,
            voice: Voice::default(),
            text: String::new(),
            poll_interval: config.poll_interval,
        }
    }

    fn generate(&mut self) {
        let voice = self.voice.id();
        if let Err(e) = self.controller.request_generate(&self.text, &voice) {
            self.view.report(&e);
        }
    }

    fn play(&mut self) {
        match self.controller.request_play() {
            Ok(true) => self.view.set_status("Playing..."),
            Ok(false) => {}
            Err(e) => self.view.report(&e),
        }
    }

    fn save(&mut self) {
        if !self.controller.has_audio() {
            return;
        }
        let Some(path) = pick_save_path() else {
            return;
        };
        match self.controller.save_audio(&path) {
            Ok(Some(written)) => self
                .view
                .set_status(&format!("Saved to {}", written.display())),
            Ok(None) => {}
            Err(e) => self.view.report(&e),
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.label("Voice:");
        egui::ComboBox::from_id_salt("voice")
            .selected_text(self.voice.id())
            .show_ui(ui, |ui| {
                for voice in Voice::all() {
                    ui.selectable_value(&mut self.voice, voice, voice.id());
                }
            });

        ui.add_space(8.0);
        ui.label("Text:");
        let text_height = (ui.available_height() - 80.0).max(120.0);
        egui::ScrollArea::vertical()
            .max_height(text_height)
            .show(ui, |ui| {
                ui.add_sized(
                    [ui.available_width(), text_height],
                    egui::TextEdit::multiline(&mut self.text).desired_rows(10),
                );
            });

        ui.add_space(8.0);
        let enabled = !self.controller.is_busy();
        let audio_enabled = self.controller.can_use_audio();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(enabled, egui::Button::new("Generate"))
                .clicked()
            {
                self.generate();
            }
            if ui
                .add_enabled(audio_enabled, egui::Button::new("Play"))
                .clicked()
            {
                self.play();
            }
            if ui
                .add_enabled(audio_enabled, egui::Button::new("Save audio"))
                .clicked()
            {
                self.save();
            }
            if self.view.busy {
                ui.add(egui::Spinner::new());
            }
        });
    }

    fn dialog(&mut self, ctx: &egui::Context) {
        let Some((title, message)) = self.view.dialogs.front() else {
            return;
        };
        let mut close = false;
        egui::Window::new(title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message.as_str());
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
        if close {
            self.view.dialogs.pop_front();
        }
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.poll(&mut self.view);

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(self.view.status.as_str());
        });

        let modal_open = !self.view.dialogs.is_empty();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!modal_open, |ui| self.controls(ui));
        });

        self.dialog(ctx);
        ctx.request_repaint_after(self.poll_interval);
    }
}

/// Ask for a destination through the native save dialog.
fn pick_save_path() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Save audio")
        .add_filter("WAV files", &["wav"])
        .add_filter("All files", &["*"])
        .set_file_name("speech.wav")
        .save_file()
}

fn install_cjk_font(ctx: &egui::Context) {
    let Some((path, bytes)) = CJK_FONT_CANDIDATES
        .iter()
        .find_map(|path| std::fs::read(path).ok().map(|bytes| (*path, bytes)))
    else {
        log::warn!("No CJK font found; Chinese text may not render");
        return;
    };

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("cjk".to_string(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        fonts
            .families
            .entry(family)
            .or_default()
            .push("cjk".to_string());
    }
    ctx.set_fonts(fonts);
    log::info!("Using CJK font {path}");
}

/// Load the model and run the window until it is closed.
///
/// A model that fails to load is reported in the window rather than
/// aborting; generation then fails with "model not loaded".
pub fn run(config: StudioConfig) -> eframe::Result<()> {
    let mut speaker = KokoroSpeaker::new(&config);
    let startup_error = speaker.load(&config).err();
    if let Some(e) = &startup_error {
        log::error!("{e}");
    }

    let controller = Controller::new(speaker, Arc::new(RodioPlayer));
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(config.window_title.clone())
            .with_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    let title = config.window_title.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            Ok(Box::new(StudioApp::new(
                cc,
                controller,
                &config,
                startup_error,
            )))
        }),
    )
}
