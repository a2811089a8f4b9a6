use eframe::egui;

use crate::canvas::DrawState;
use crate::segment::Segmenter;
use crate::session::{Command, Notice, Session};

const RECT_COLOR: egui::Color32 = egui::Color32::RED;
const RECT_THICKNESS: f32 = 2.0;

pub struct AnnotatorApp {
    session: Session,
    segmenter: Box<dyn Segmenter>,
    texture: Option<egui::TextureHandle>,
    texture_revision: Option<u64>,
}

impl AnnotatorApp {
    pub fn new(session: Session, segmenter: Box<dyn Segmenter>) -> Self {
        Self {
            session,
            segmenter,
            texture: None,
            texture_revision: None,
        }
    }

    /// Reload the texture whenever the canvas shows a different picture.
    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let revision = self.session.canvas().revision();
        if self.texture_revision == Some(revision) {
            return;
        }
        self.texture_revision = Some(revision);
        self.texture = self.session.canvas().shown().map(|rgba| {
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            ctx.load_texture("canvas", color_image, egui::TextureOptions::LINEAR)
        });
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            if let Some(notice) = self.session.dispatch(command, self.segmenter.as_mut()) {
                show_notice(&notice);
            }
        }
    }

    fn file_panel(&self, ctx: &egui::Context, commands: &mut Vec<Command>) {
        egui::SidePanel::left("files")
            .default_width(200.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                if ui.button("Select folder").clicked() {
                    // Cancelling the dialog leaves the list as it was.
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        commands.push(Command::LoadFolder(dir));
                    }
                }
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (i, entry) in self.session.entries().iter().enumerate() {
                        let selected = self.session.selected() == Some(i);
                        if ui.selectable_label(selected, entry.label()).clicked() {
                            commands.push(Command::Select(i));
                        }
                    }
                });
            });
    }

    fn action_panel(&self, ctx: &egui::Context, commands: &mut Vec<Command>) {
        egui::SidePanel::right("actions")
            .default_width(200.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                if ui.button("Run segmentation").clicked() {
                    commands.push(Command::RunSegmentation);
                }
                if ui.button("Clear rectangles").clicked() {
                    commands.push(Command::ClearRectangles);
                }

                if self.session.class_picker_open() {
                    ui.separator();
                    ui.label("Class:");
                    let current = self.session.class_choice().unwrap_or("");
                    egui::ComboBox::from_id_salt("class")
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            for class in self.session.classes() {
                                if ui.selectable_label(current == class.as_str(), class.as_str()).clicked() {
                                    commands.push(Command::ChooseClass(class.clone()));
                                }
                            }
                        });
                    ui.add_space(10.0);
                    if ui.button("Confirm class").clicked() {
                        commands.push(Command::ConfirmClass);
                    }
                }
            });
    }

    fn canvas_panel(&self, ctx: &egui::Context, commands: &mut Vec<Command>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            let origin = canvas_rect.min;
            let to_canvas = |pos: egui::Pos2| egui::pos2(pos.x - origin.x, pos.y - origin.y);
            let to_screen = |rect: egui::Rect| rect.translate(origin.to_vec2());

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::BLACK);

            if let Some(ref tex) = self.texture {
                let img_rect = egui::Rect::from_min_size(origin, tex.size_vec2());
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            let stroke = egui::Stroke::new(RECT_THICKNESS, RECT_COLOR);
            let canvas = self.session.canvas();
            let drawing = match canvas.draw_state() {
                DrawState::Drawing(rect) => Some(rect),
                DrawState::Idle => None,
            };
            for rect in canvas.rectangles().iter().chain(drawing) {
                painter.rect_stroke(
                    to_screen(rect.to_egui()),
                    0.0,
                    stroke,
                    egui::StrokeKind::Middle,
                );
            }

            // Rectangles start where the button went down, before any drag
            // threshold, so a plain click commits one too.
            let (pressed, released, press_origin, latest) = ctx.input(|i| {
                (
                    i.pointer.primary_pressed(),
                    i.pointer.primary_released(),
                    i.pointer.press_origin(),
                    i.pointer.latest_pos(),
                )
            });
            if pressed && response.contains_pointer() {
                if let Some(pos) = press_origin {
                    commands.push(Command::PointerPressed(to_canvas(pos)));
                }
            }
            if response.dragged_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    commands.push(Command::PointerMoved(to_canvas(pos)));
                }
            }
            if released {
                if let Some(pos) = latest {
                    commands.push(Command::PointerReleased(to_canvas(pos)));
                }
            }
        });
    }
}

fn show_notice(notice: &Notice) {
    let (level, title, text) = match notice {
        Notice::Info(text) => (rfd::MessageLevel::Info, "Done", text),
        Notice::Warning(text) => (rfd::MessageLevel::Warning, "Warning", text),
        Notice::Error(text) => (rfd::MessageLevel::Error, "Error", text),
    };
    rfd::MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(text.as_str())
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for AnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ensure_texture(ctx);

        let mut commands = Vec::new();
        self.file_panel(ctx, &mut commands);
        self.action_panel(ctx, &mut commands);
        self.canvas_panel(ctx, &mut commands);

        if !commands.is_empty() {
            self.apply(commands);
            ctx.request_repaint();
        }
    }
}
