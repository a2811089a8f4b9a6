use std::path::{Path, PathBuf};
use std::time::Instant;

use eframe::egui;
use image::{DynamicImage, Rgba};
use ndarray::Array2;

use crate::canvas::CanvasState;
use crate::composite::composite;
use crate::config::AppConfig;
use crate::export::export_annotation;
use crate::segment::{PointPrompt, Segmenter};
use crate::store::{scan_folder, ImageEntry};

// ── Commands ────────────────────────────────────────────────────────────────

/// One user action. Commands are handled in order, each to completion.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    LoadFolder(PathBuf),
    Select(usize),
    PointerPressed(egui::Pos2),
    PointerMoved(egui::Pos2),
    PointerReleased(egui::Pos2),
    ClearRectangles,
    RunSegmentation,
    ChooseClass(String),
    ConfirmClass,
}

/// Something the user must acknowledge before continuing.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

pub struct SegmentationResult {
    pub mask: Array2<bool>,
}

// ── Session ─────────────────────────────────────────────────────────────────

pub struct Session {
    entries: Vec<ImageEntry>,
    selected: Option<usize>,
    canvas: CanvasState,
    result: Option<SegmentationResult>,
    class_picker_open: bool,
    class_choice: Option<String>,

    classes: Vec<String>,
    max_display_size: (u32, u32),
    overlay_color: Rgba<u8>,
    export_dir: Option<PathBuf>,
}

impl Session {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            entries: Vec::new(),
            selected: None,
            canvas: CanvasState::default(),
            result: None,
            class_picker_open: false,
            class_choice: None,
            classes: config.classes.clone(),
            max_display_size: (config.max_display_size[0], config.max_display_size[1]),
            overlay_color: Rgba(config.overlay_color),
            export_dir: config.export_dir.clone(),
        }
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn canvas(&self) -> &CanvasState {
        &self.canvas
    }

    #[cfg(test)]
    pub fn result(&self) -> Option<&SegmentationResult> {
        self.result.as_ref()
    }

    pub fn class_picker_open(&self) -> bool {
        self.class_picker_open
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_choice(&self) -> Option<&str> {
        self.class_choice.as_deref()
    }

    pub fn dispatch(&mut self, command: Command, segmenter: &mut dyn Segmenter) -> Option<Notice> {
        match command {
            Command::LoadFolder(dir) => {
                self.load_folder(&dir);
                None
            }
            Command::Select(index) => self.select(index),
            Command::PointerPressed(pos) => {
                if self.canvas.source().is_some() {
                    self.canvas.press(pos);
                }
                None
            }
            Command::PointerMoved(pos) => {
                self.canvas.drag_to(pos);
                None
            }
            Command::PointerReleased(pos) => {
                self.canvas.release(pos);
                None
            }
            Command::ClearRectangles => {
                self.canvas.clear_rectangles();
                log::info!("rectangles removed");
                None
            }
            Command::RunSegmentation => self.run_segmentation(segmenter),
            Command::ChooseClass(class) => {
                self.class_choice = Some(class);
                None
            }
            Command::ConfirmClass => self.confirm_class(),
        }
    }

    fn clear_transient(&mut self) {
        self.canvas.reset();
        self.result = None;
        self.class_picker_open = false;
    }

    fn load_folder(&mut self, dir: &Path) {
        self.entries = scan_folder(dir);
        self.selected = None;
        self.clear_transient();
    }

    fn select(&mut self, index: usize) -> Option<Notice> {
        let path = self.entries.get(index)?.path.clone();
        self.selected = Some(index);
        self.clear_transient();

        match image::open(&path) {
            Ok(img) => {
                let img = self.fit_for_display(img);
                log::info!(
                    "showing {} ({}x{})",
                    path.display(),
                    img.width(),
                    img.height()
                );
                self.canvas.show_image(img);
                None
            }
            Err(e) => {
                log::error!("cannot open {}: {e}", path.display());
                Some(Notice::Error(format!("Cannot open {}: {e}", path.display())))
            }
        }
    }

    fn fit_for_display(&self, img: DynamicImage) -> DynamicImage {
        let (max_w, max_h) = self.max_display_size;
        if img.width() > max_w || img.height() > max_h {
            img.thumbnail(max_w, max_h)
        } else {
            img
        }
    }

    fn run_segmentation(&mut self, segmenter: &mut dyn Segmenter) -> Option<Notice> {
        let Some(source) = self.canvas.source() else {
            return Some(Notice::Warning("No image selected.".into()));
        };

        let rgb = source.to_rgb8();
        let prompt = PointPrompt::center(rgb.width(), rgb.height());
        let started = Instant::now();
        let mask = match segmenter.segment(&rgb, &[prompt]) {
            Ok(mask) => mask,
            Err(e) => {
                log::error!("segmentation failed: {e}");
                return Some(Notice::Error(format!("Segmentation failed: {e}")));
            }
        };
        log::info!("segmentation took {:.2?}", started.elapsed());

        let overlay = match composite(source, &mask, self.overlay_color) {
            Ok(overlay) => overlay,
            Err(e) => {
                log::error!("cannot overlay mask: {e}");
                return Some(Notice::Error(format!("Segmentation failed: {e}")));
            }
        };
        self.canvas.show_overlay(overlay);
        self.result = Some(SegmentationResult { mask });
        self.class_picker_open = true;
        None
    }

    fn confirm_class(&mut self) -> Option<Notice> {
        let Some(result) = self.result.as_ref() else {
            return Some(Notice::Warning("Run segmentation first.".into()));
        };
        let class = match self.class_choice.as_deref() {
            Some(class) if !class.is_empty() => class.to_owned(),
            _ => return Some(Notice::Warning("Select a class.".into())),
        };

        self.class_picker_open = false;
        let Some(entry) = self.selected.and_then(|i| self.entries.get_mut(i)) else {
            return Some(Notice::Info(format!("Image marked with class '{class}'.")));
        };
        entry.confirmed = true;
        log::info!("{} confirmed as '{class}'", entry.display_name);

        if let Some(out_dir) = &self.export_dir {
            if let Err(e) = export_annotation(
                out_dir,
                &entry.path,
                &class,
                &result.mask,
                self.canvas.rectangles(),
            ) {
                log::error!("export failed: {e:#}");
                return Some(Notice::Error(format!("Export failed: {e:#}")));
            }
        }
        Some(Notice::Info(format!("Image marked with class '{class}'.")))
    }
}
