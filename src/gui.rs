// src/gui.rs
use anyhow::Result;
use eframe::egui;
use egui::{Color32, RichText, ScrollArea, Stroke, Ui, Vec2};
use log::{error, info};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::ai::connector::VisionTriage;
use crate::ai::remote_model::{RemoteModel, DEFAULT_MODEL};
use crate::ai::report::TriageReport;
use crate::capture::CapturedImage;
use crate::error::TriageError;
use crate::history::SessionHistory;
use crate::state::TriageState;

const WINDOW_WIDTH: f32 = 1020.0;
const WINDOW_HEIGHT: f32 = 700.0;
const HISTORY_PANEL_WIDTH: f32 = 260.0;
const PREVIEW_MAX_HEIGHT: f32 = 280.0;

/// Outcome slot shared with the analysis worker thread. The worker writes
/// exactly once per request; the UI thread takes the value on its next frame.
struct AnalysisSlot {
    outcome: Option<Result<TriageReport, TriageError>>,
}

enum MainView {
    Idle,
    Ready,
    Analyzing,
    Failed(String),
    Resolved(TriageReport),
}

pub struct DermascopeApp {
    state: TriageState,
    history: SessionHistory,
    slot: Arc<Mutex<AnalysisSlot>>,
    model_name: String,
    preview: Option<egui::TextureHandle>,
    preview_dirty: bool,
    status_line: String,
    was_style_initialized: bool,
}

impl Default for DermascopeApp {
    fn default() -> Self {
        Self {
            state: TriageState::Idle,
            history: SessionHistory::new(),
            slot: Arc::new(Mutex::new(AnalysisSlot { outcome: None })),
            model_name: DEFAULT_MODEL.to_string(),
            preview: None,
            preview_dirty: false,
            status_line: String::new(),
            was_style_initialized: false,
        }
    }
}

impl eframe::App for DermascopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.was_style_initialized {
            let mut style = (*ctx.style()).clone();
            style.visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(30, 30, 30);
            style.visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 45, 45);
            style.visuals.widgets.hovered.bg_fill = Color32::from_rgb(55, 55, 55);
            style.visuals.widgets.active.bg_fill = Color32::from_rgb(65, 65, 65);
            style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
            style.visuals.selection.bg_fill = Color32::from_rgb(42, 90, 170);
            style.text_styles.insert(
                egui::TextStyle::Body,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Button,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Heading,
                egui::FontId::new(21.0, egui::FontFamily::Proportional),
            );
            ctx.set_style(style);
            self.was_style_initialized = true;
        }

        self.poll_analysis_outcome();
        self.refresh_preview(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        egui::SidePanel::right("history_panel")
            .exact_width(HISTORY_PANEL_WIDTH)
            .show(ctx, |ui| {
                self.draw_history_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                self.draw_main_panel(ui);
            });
        });

        if self.state.is_analyzing() {
            ctx.request_repaint_after(Duration::from_millis(150));
        }
    }
}

impl DermascopeApp {
    /// Pick up the worker's result, if any, and step the state machine.
    /// A result arriving after the user discarded the image is dropped by
    /// the transition guards.
    fn poll_analysis_outcome(&mut self) {
        let outcome = self.slot.lock().unwrap().outcome.take();
        let Some(outcome) = outcome else { return };

        match outcome {
            Ok(report) => {
                if let TriageState::Analyzing { image } = &self.state {
                    self.history.record(image.clone(), report.clone());
                }
                self.state =
                    std::mem::replace(&mut self.state, TriageState::Idle).complete(report);
            }
            Err(err) => {
                error!("Analysis failed: {}", err);
                self.state =
                    std::mem::replace(&mut self.state, TriageState::Idle).fail(err.to_string());
            }
        }
    }

    fn refresh_preview(&mut self, ctx: &egui::Context) {
        if !self.preview_dirty {
            return;
        }
        self.preview_dirty = false;
        self.preview = None;

        let Some(image) = self.state.current_image() else { return };
        match image::load_from_memory(&image.bytes) {
            Ok(decoded) => {
                let size = [decoded.width() as usize, decoded.height() as usize];
                let egui_image = egui::ColorImage::from_rgba_unmultiplied(
                    size,
                    decoded.to_rgba8().as_flat_samples().as_slice(),
                );
                self.preview = Some(ctx.load_texture(
                    "photo_preview",
                    egui_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
            Err(e) => error!("Failed to decode photo for preview: {}", e),
        }
    }

    fn draw_toolbar(&mut self, ui: &mut Ui) {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.heading("Dermascope");
            ui.separator();

            if ui
                .add_sized(
                    [130.0, 32.0],
                    egui::Button::new(RichText::new("📂 Open Photo").size(14.0))
                        .fill(Color32::from_rgb(45, 45, 45))
                        .rounding(8.0),
                )
                .clicked()
            {
                self.open_photo_dialog();
            }

            let can_analyze = self.state.can_analyze();
            if self.state.is_analyzing() {
                ui.spinner();
                ui.label(RichText::new("Analyzing…").color(Color32::from_rgb(180, 180, 180)));
            } else if ui
                .add_enabled(
                    can_analyze,
                    egui::Button::new(RichText::new("🔬 Analyze").size(14.0))
                        .fill(Color32::from_rgb(42, 90, 170))
                        .rounding(8.0),
                )
                .clicked()
            {
                self.start_analysis();
            }

            if self.state.current_image().is_some() && !self.state.is_analyzing() {
                if ui
                    .add_sized(
                        [90.0, 32.0],
                        egui::Button::new(RichText::new("✕ Discard").size(14.0))
                            .fill(Color32::from_rgb(45, 45, 45))
                            .rounding(8.0),
                    )
                    .clicked()
                {
                    self.state = std::mem::replace(&mut self.state, TriageState::Idle).discard();
                    self.preview = None;
                    self.status_line.clear();
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let current_model = self.model_name.clone();
                egui::ComboBox::from_id_source("model_selector")
                    .selected_text(&current_model)
                    .width(180.0)
                    .show_ui(ui, |ui| {
                        for model_choice in
                            &["gemini-2.0-flash", "gemini-2.0-flash-lite", "gemini-1.5-pro"]
                        {
                            if ui
                                .selectable_label(self.model_name == *model_choice, *model_choice)
                                .clicked()
                            {
                                self.model_name = model_choice.to_string();
                            }
                        }
                    });
                ui.label(RichText::new("Model:").size(14.0));
            });
        });
        ui.add_space(6.0);
    }

    fn draw_history_panel(&mut self, ui: &mut Ui) {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.heading(RichText::new("History").size(17.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if !self.history.is_empty() && ui.button(RichText::new("Clear").size(13.0)).clicked()
                {
                    self.history.clear();
                    info!("Session history cleared");
                }
            });
        });
        ui.separator();

        if self.history.is_empty() {
            ui.add_space(12.0);
            ui.label(
                RichText::new("Completed analyses appear here.")
                    .color(Color32::from_rgb(130, 130, 130)),
            );
            return;
        }

        let mut restore_id = None;
        ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
            for entry in self.history.entries() {
                let (r, g, b) = entry.report.urgency.color();
                let time_str = entry.captured_at.format("%H:%M").to_string();

                egui::Frame::none()
                    .fill(Color32::from_rgb(35, 35, 35))
                    .rounding(8.0)
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        ui.set_min_width(HISTORY_PANEL_WIDTH - 30.0);
                        ui.horizontal(|ui| {
                            ui.label(
                                RichText::new("●").color(Color32::from_rgb(r, g, b)).size(13.0),
                            );
                            ui.label(
                                RichText::new(&time_str)
                                    .color(Color32::from_rgb(130, 130, 130))
                                    .small(),
                            );
                        });
                        let label = truncated(&entry.report.diagnosis, 34);
                        if ui
                            .selectable_label(false, RichText::new(label).size(14.0))
                            .clicked()
                        {
                            restore_id = Some(entry.id);
                        }
                    });
                ui.add_space(4.0);
            }
        });

        if let Some(id) = restore_id {
            self.restore_entry(id);
        }
    }

    fn draw_main_panel(&mut self, ui: &mut Ui) {
        ui.add_space(8.0);

        if let Some(texture) = self.preview.clone() {
            let available_width = ui.available_width() - 16.0;
            let aspect_ratio = texture.size_vec2().x / texture.size_vec2().y;
            let mut height = if aspect_ratio > 0.0 {
                available_width / aspect_ratio
            } else {
                available_width
            };
            let mut width = available_width;
            if height > PREVIEW_MAX_HEIGHT {
                height = PREVIEW_MAX_HEIGHT;
                width = height * aspect_ratio;
            }
            ui.vertical_centered(|ui| {
                ui.image((texture.id(), Vec2::new(width, height)));
            });
            ui.add_space(8.0);
        }

        // Clone the displayable pieces up front; the draw helpers need
        // `&mut self` for button actions.
        let view = match &self.state {
            TriageState::Idle => MainView::Idle,
            TriageState::ImageReady { .. } => MainView::Ready,
            TriageState::Analyzing { .. } => MainView::Analyzing,
            TriageState::Failed { message, .. } => MainView::Failed(message.clone()),
            TriageState::Resolved { report, .. } => MainView::Resolved(report.clone()),
        };

        match view {
            MainView::Idle => {
                ui.add_space(40.0);
                ui.vertical_centered(|ui| {
                    ui.label(
                        RichText::new("Open a clinical photo to begin.")
                            .size(16.0)
                            .color(Color32::from_rgb(150, 150, 150)),
                    );
                    ui.add_space(4.0);
                    ui.label(
                        RichText::new(
                            "The assistant suggests possible conditions; it does not replace a clinician.",
                        )
                        .small()
                        .color(Color32::from_rgb(110, 110, 110)),
                    );
                });
            }
            MainView::Ready => {
                ui.vertical_centered(|ui| {
                    ui.label(
                        RichText::new("Photo ready. Press Analyze to request a triage opinion.")
                            .color(Color32::from_rgb(170, 170, 170)),
                    );
                });
            }
            MainView::Analyzing => {
                ui.vertical_centered(|ui| {
                    ui.add_space(10.0);
                    ui.spinner();
                    ui.label(
                        RichText::new("Waiting for the vision model…")
                            .color(Color32::from_rgb(170, 170, 170)),
                    );
                });
            }
            MainView::Failed(message) => {
                self.draw_failure(ui, &message);
            }
            MainView::Resolved(report) => {
                self.draw_report(ui, &report);
            }
        }

        if !self.status_line.is_empty() {
            ui.add_space(6.0);
            ui.label(
                RichText::new(&self.status_line)
                    .small()
                    .color(Color32::from_rgb(130, 160, 130)),
            );
        }
    }

    fn draw_failure(&mut self, ui: &mut Ui, message: &str) {
        egui::Frame::none()
            .fill(Color32::from_rgb(60, 30, 30))
            .rounding(8.0)
            .stroke(Stroke::new(1.0, Color32::from_rgb(120, 60, 60)))
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.label(
                    RichText::new("Analysis failed")
                        .size(16.0)
                        .color(Color32::from_rgb(240, 160, 160)),
                );
                ui.label(RichText::new(message).color(Color32::from_rgb(210, 180, 180)));
            });
        ui.add_space(8.0);
        if ui
            .add_sized(
                [100.0, 32.0],
                egui::Button::new(RichText::new("↻ Retry").size(14.0))
                    .fill(Color32::from_rgb(42, 90, 170))
                    .rounding(8.0),
            )
            .clicked()
        {
            self.state = std::mem::replace(&mut self.state, TriageState::Idle).retry();
            self.start_analysis();
        }
    }

    fn draw_report(&mut self, ui: &mut Ui, report: &TriageReport) {
        let (r, g, b) = report.urgency.color();
        ui.horizontal(|ui| {
            ui.heading(RichText::new(&report.diagnosis).size(19.0));
            egui::Frame::none()
                .fill(Color32::from_rgb(r, g, b))
                .rounding(10.0)
                .inner_margin(egui::Margin::symmetric(10.0, 3.0))
                .show(ui, |ui| {
                    ui.label(
                        RichText::new(report.urgency.as_str().to_uppercase())
                            .size(12.0)
                            .color(Color32::from_rgb(20, 20, 20)),
                    );
                });
        });
        ui.add_space(8.0);

        if !report.differential_diagnosis.is_empty() {
            ui.label(
                RichText::new("Differential diagnosis")
                    .size(15.0)
                    .color(Color32::from_rgb(180, 180, 180)),
            );
            for (i, candidate) in report.differential_diagnosis.iter().enumerate() {
                ui.label(format!("  {}. {}", i + 1, candidate));
            }
            ui.add_space(8.0);
        }

        ui.label(
            RichText::new("Reasoning")
                .size(15.0)
                .color(Color32::from_rgb(180, 180, 180)),
        );
        egui::Frame::none()
            .fill(Color32::from_rgb(35, 35, 35))
            .rounding(8.0)
            .inner_margin(10.0)
            .show(ui, |ui| {
                ui.label(&report.reasoning);
            });
        ui.add_space(8.0);

        if !report.recommendations.is_empty() {
            ui.label(
                RichText::new("Recommendations")
                    .size(15.0)
                    .color(Color32::from_rgb(180, 180, 180)),
            );
            for recommendation in &report.recommendations {
                ui.label(format!("  • {}", recommendation));
            }
            ui.add_space(8.0);
        }

        ui.horizontal(|ui| {
            if ui
                .add_sized(
                    [130.0, 32.0],
                    egui::Button::new(RichText::new("💾 Save Report").size(14.0))
                        .fill(Color32::from_rgb(45, 45, 45))
                        .rounding(8.0),
                )
                .clicked()
            {
                self.save_report(report);
            }
            ui.add_space(8.0);
            if ui
                .add_sized(
                    [100.0, 32.0],
                    egui::Button::new(RichText::new("📋 Copy").size(14.0))
                        .fill(Color32::from_rgb(45, 45, 45))
                        .rounding(8.0),
                )
                .clicked()
            {
                self.copy_report_to_clipboard(report);
            }
        });
    }

    fn open_photo_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
            .pick_file();
        let Some(path) = picked else { return };

        match CapturedImage::from_file(&path) {
            Ok(image) => {
                self.state =
                    std::mem::replace(&mut self.state, TriageState::Idle).select_image(image);
                self.preview_dirty = true;
                self.status_line.clear();
            }
            Err(e) => {
                error!("Failed to load photo: {}", e);
                self.status_line = format!("Could not load photo: {}", e);
            }
        }
    }

    fn start_analysis(&mut self) {
        if self.state.is_analyzing() {
            return;
        }
        self.state = std::mem::replace(&mut self.state, TriageState::Idle).begin_analysis();
        let TriageState::Analyzing { image } = &self.state else {
            return;
        };

        let image = image.clone();
        let model_name = self.model_name.clone();
        let slot = Arc::clone(&self.slot);
        info!("Starting triage analysis with {}", model_name);

        thread::spawn(move || {
            let outcome = RemoteModel::new(&model_name)
                .map_err(TriageError::analysis)
                .and_then(|model| model.analyze(&image));
            slot.lock().unwrap().outcome = Some(outcome);
        });
    }

    fn restore_entry(&mut self, id: u64) {
        if let Some(entry) = self.history.get(id) {
            self.state = std::mem::replace(&mut self.state, TriageState::Idle).restore(entry);
            self.preview_dirty = true;
            self.status_line.clear();
        }
    }

    fn save_report(&mut self, report: &TriageReport) {
        let picked = rfd::FileDialog::new()
            .add_filter("Text", &["txt"])
            .set_file_name("triage-report.txt")
            .save_file();
        let Some(path) = picked else { return };

        if let Err(e) = std::fs::write(&path, report.to_plain_text()) {
            error!("Failed to save report: {}", e);
            self.status_line = format!("Could not save report: {}", e);
        } else {
            info!("Report saved to: {}", path.display());
            self.status_line = format!("Report saved to {}", path.display());
        }
    }

    #[cfg(feature = "clipboard")]
    fn copy_report_to_clipboard(&mut self, report: &TriageReport) {
        match arboard::Clipboard::new() {
            Ok(mut clipboard) => {
                if let Err(e) = clipboard.set_text(report.to_plain_text()) {
                    error!("Failed to copy report to clipboard: {}", e);
                } else {
                    self.status_line = "Report copied to clipboard".to_string();
                }
            }
            Err(e) => error!("Failed to access clipboard: {}", e),
        }
    }

    #[cfg(not(feature = "clipboard"))]
    fn copy_report_to_clipboard(&mut self, _report: &TriageReport) {
        self.status_line = "Clipboard feature not enabled in this build.".to_string();
    }
}

fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{}…", prefix)
    } else {
        text.to_string()
    }
}

pub fn run_gui() -> Result<()> {
    info!("Dermascope GUI starting up...");

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(WINDOW_WIDTH, WINDOW_HEIGHT)),
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "Dermascope",
        native_options,
        Box::new(|_cc| Box::new(DermascopeApp::default())),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}
