//! Desktop front-end for yt-dlp: list a URL, pick entries, download them one by one.

// UI-thread state and the triggers
mod controller;
// Background fetch/download workers
mod downloader;
// Error types for each concern
mod error;
// Worker -> UI hand-off
mod events;
// Listing a URL with yt-dlp
mod fetcher;
// Tracing subscriber setup
mod logging;
// Data models for items, formats and controls
mod model;
// Progress parsing utilities
mod progress;
// Settings file and command line flags
mod settings;
// Locating yt-dlp and building its command lines
mod ytdlp;

#[cfg(test)]
mod testutil;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use clap::Parser;
// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::Visuals;
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use tokio::runtime::Runtime;
use tracing::info;

use controller::Controller;
use events::Repaint;
use model::DownloadFormat;
use settings::{Cli, Settings};
use ytdlp::Tool;

// Global Tokio runtime, alive for the whole process
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Program entry point: loads settings, starts the runtime and opens the window
fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    let tool = Tool::resolve(settings.ytdlp_path.as_deref())?
        .with_leading_args(settings.ytdlp_args.iter().cloned());

    let runtime = RUNTIME
        .get_or_try_init(Runtime::new)
        .context("failed to start the tokio runtime")?;
    let handle = runtime.handle().clone();

    info!(program = %tool.program().display(), "starting");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "YouTube Downloader",
        options,
        Box::new(move |cc| {
            // Use dark theme visuals
            cc.egui_ctx.set_visuals(Visuals::dark());
            let ctx = cc.egui_ctx.clone();
            let repaint: Repaint = Arc::new(move || ctx.request_repaint());
            Box::new(DownloaderApp::new(Controller::new(handle, tool, &settings, repaint)))
        }),
    )
    .map_err(|e| anyhow!("failed to open the window: {e}"))
}

/// Application state for the GUI
struct DownloaderApp {
    controller: Controller,
    /// Text of the output folder field
    output_dir_input: String,
}

impl DownloaderApp {
    fn new(controller: Controller) -> Self {
        let output_dir_input = controller.output_dir.display().to_string();
        Self {
            controller,
            output_dir_input,
        }
    }

    fn url_bar(&mut self, ui: &mut egui::Ui) {
        let controls = self.controller.controls();
        let fetch_allowed = controls.fetch_enabled && !self.controller.is_running();

        ui.horizontal(|ui| {
            let field = ui.add(
                egui::TextEdit::singleline(&mut self.controller.url)
                    .hint_text("Enter YouTube URL (video or playlist)")
                    .desired_width(ui.available_width() - 110.0),
            );
            let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let clicked = ui.add_enabled(fetch_allowed, egui::Button::new("Fetch Videos")).clicked();
            if clicked || (submitted && fetch_allowed) {
                self.controller.fetch();
            }
        });
    }

    fn controls_row(&mut self, ui: &mut egui::Ui) {
        let controls = self.controller.controls();
        let idle = !self.controller.is_running();

        ui.horizontal(|ui| {
            ui.label("Format:");
            ui.add_enabled_ui(idle, |ui| {
                egui::ComboBox::from_id_source("format")
                    .selected_text(self.controller.format.label())
                    .show_ui(ui, |ui| {
                        for format in DownloadFormat::ALL {
                            ui.selectable_value(&mut self.controller.format, format, format.label());
                        }
                    });
            });

            ui.label("Folder:");
            let field = ui.add_enabled(
                idle,
                egui::TextEdit::singleline(&mut self.output_dir_input).desired_width(180.0),
            );
            if field.changed() {
                self.controller.output_dir = PathBuf::from(self.output_dir_input.trim());
            }
            if ui.add_enabled(idle, egui::Button::new("Browse…")).clicked() {
                if let Some(folder) = FileDialog::new()
                    .set_directory(&self.controller.output_dir)
                    .pick_folder()
                {
                    self.output_dir_input = folder.display().to_string();
                    self.controller.output_dir = folder;
                }
            }

            if ui
                .add_enabled(controls.download_enabled, egui::Button::new("Download Selected"))
                .clicked()
            {
                self.controller.download();
            }
            if ui
                .add_enabled(controls.stop_enabled, egui::Button::new("Stop Download"))
                .clicked()
            {
                self.controller.stop();
            }
        });
    }

    fn status_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong("Status");
            if ui.small_button("Clear").clicked() {
                self.controller.clear_log();
            }
        });

        if let Some(progress) = self.controller.progress() {
            let mut text = format!("Video {}/{}", progress.index.max(1), progress.total);
            if self.controller.is_stopping() {
                text.push_str(" (stopping)");
            }
            ui.add(
                egui::ProgressBar::new(progress.overall())
                    .animate(self.controller.has_active_process())
                    .text(text),
            );
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in self.controller.log_lines() {
                    ui.monospace(line);
                }
            });
    }

    fn video_list(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Videos");
            let has_items = !self.controller.items().is_empty();
            if ui.add_enabled(has_items, egui::Button::new("Select all")).clicked() {
                self.controller.select_all(true);
            }
            if ui.add_enabled(has_items, egui::Button::new("Select none")).clicked() {
                self.controller.select_all(false);
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for listed in self.controller.items_mut() {
                    ui.checkbox(&mut listed.selected, listed.item.title.as_str())
                        .on_hover_text(&listed.item.id);
                }
            });
    }
}

/// GUI update loop: called each frame to apply worker events and redraw
impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.controller.poll();

        egui::TopBottomPanel::top("url_panel").show(ctx, |ui| {
            ui.add_space(6.0);
            self.url_bar(ui);
            self.controls_row(ui);
            ui.add_space(6.0);
        });

        egui::TopBottomPanel::bottom("status_panel")
            .resizable(true)
            .min_height(140.0)
            .show(ctx, |ui| self.status_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.video_list(ui));
    }
}
