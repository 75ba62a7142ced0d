use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eframe::egui::{self, Color32, Pos2, Rect, Stroke, pos2, vec2};
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::editor::Editor;
use crate::gesture::GestureSet;
use crate::layout::{AspectMode, TOOLBAR_HEIGHT};
use crate::library::AlbumDirectory;
use crate::picker::{self, PickResult};

const BUTTON_INSET: f32 = 20.0;
const BORDER_COLOR: Color32 = Color32::from_rgb(0, 122, 255);
const BORDER_WIDTH: f32 = 2.0;
const BORDER_DASH: f32 = 6.0;
const BORDER_GAP: f32 = 3.0;
const CORNER_SEGMENTS: usize = 12;

/// Fonts with CJK coverage tried in order when none is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
];

#[derive(Clone, Copy, Debug, PartialEq)]
enum ToolbarAction {
    Reset,
    SelectImage,
    Save,
    Aspect(AspectMode),
}

pub struct PhotoEditor {
    editor: Editor,
    gestures: GestureSet,
    texture: Option<(u64, egui::TextureHandle)>,
}

impl PhotoEditor {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &Config) -> Self {
        install_fonts(&cc.egui_ctx, config.font_path.as_deref());
        let album = AlbumDirectory::new(config.library_dir());
        info!(album = %album.root().display(), "photo album ready");
        Self {
            editor: Editor::new(
                Arc::new(album),
                config.corner_radius(),
                config.reset_duration_secs(),
            ),
            gestures: GestureSet::default(),
            texture: None,
        }
    }

    /// Uploads the current image whenever a new one was installed. Only the
    /// texture is downscaled; saving still renders from the full bitmap.
    fn texture_id(&mut self, ctx: &egui::Context) -> Option<egui::TextureId> {
        let generation = self.editor.image_generation();
        if self.texture.as_ref().map(|(g, _)| *g) != Some(generation) {
            let max_side = ctx.input(|i| i.max_texture_side);
            self.texture = self.editor.image_view().image().map(|image| {
                let image = texture_image(image, max_side);
                let size = [image.width() as _, image.height() as _];
                let image_buffer = image.to_rgba8();
                let pixels = image_buffer.as_flat_samples();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
                let handle = ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR);
                (generation, handle)
            });
        }
        self.texture.as_ref().map(|(_, texture)| texture.id())
    }

    fn toolbar(&self, ui: &mut egui::Ui, toolbar: Rect) -> Option<ToolbarAction> {
        let mut action = None;

        ui.horizontal_centered(|ui| {
            ui.add_space(BUTTON_INSET);
            if ui.button("重置").clicked() {
                action = Some(ToolbarAction::Reset);
            }
            ui.separator();
            for mode in [AspectMode::Original, AspectMode::Square] {
                if self.aspect_button(ui, mode).clicked() {
                    action = Some(ToolbarAction::Aspect(mode));
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.add_space(BUTTON_INSET);
                if ui.button("保存").clicked() {
                    action = Some(ToolbarAction::Save);
                }
                if self.editor.is_saving() {
                    ui.spinner();
                }
            });
        });

        let select = Rect::from_center_size(toolbar.center(), vec2(96.0, 32.0));
        if ui.put(select, egui::Button::new("选择图片")).clicked() {
            action = Some(ToolbarAction::SelectImage);
        }
        action
    }

    /// Filled when active, plain otherwise.
    fn aspect_button(&self, ui: &mut egui::Ui, mode: AspectMode) -> egui::Response {
        let label = mode.to_string();
        if self.editor.aspect_mode() == mode {
            let text = egui::RichText::new(label).color(ui.visuals().selection.stroke.color);
            ui.add(egui::Button::new(text).fill(ui.visuals().selection.bg_fill))
        } else {
            ui.add(egui::Button::new(label).frame(false))
        }
    }

    fn paint_container(&mut self, ui: &mut egui::Ui, container: Rect, now: f64) {
        let texture = self.texture_id(ui.ctx());
        let painter = ui.painter_at(container);

        if let Some(texture) = texture {
            let pose = self.editor.display_pose(now);
            let center = container.center() + pose.offset;
            let matrix = pose.matrix();
            let frame = Rect::from_center_size(Pos2::ZERO, self.editor.image_view_size());

            let mut mesh = egui::Mesh::with_texture(texture);
            mesh.add_rect_with_uv(
                frame,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
            for vertex in &mut mesh.vertices {
                vertex.pos = center + matrix.apply(vertex.pos.to_vec2());
            }
            painter.add(egui::Shape::mesh(mesh));
        }

        let radius = self.editor.container().corner_radius;
        if radius > 0.0 {
            painter.add(corner_caps(container, radius, ui.visuals().panel_fill));
        }

        let border = [
            container.left_top(),
            container.right_top(),
            container.right_bottom(),
            container.left_bottom(),
            container.left_top(),
        ];
        ui.painter().extend(egui::Shape::dashed_line(
            &border,
            Stroke::new(BORDER_WIDTH, BORDER_COLOR),
            BORDER_DASH,
            BORDER_GAP,
        ));
    }

    fn apply(&mut self, ctx: &egui::Context, action: ToolbarAction, now: f64) {
        debug!(?action, "toolbar action");
        match action {
            ToolbarAction::Reset => self.editor.reset(now),
            ToolbarAction::SelectImage => {
                if let PickResult::Picked(image) = picker::present() {
                    self.editor.select_image(image);
                }
            }
            ToolbarAction::Save => {
                let repaint = ctx.clone();
                self.editor
                    .save(ctx.pixels_per_point(), move || repaint.request_repaint());
            }
            ToolbarAction::Aspect(mode) => self.editor.select_aspect(mode),
        }
        ctx.request_repaint();
    }
}

impl eframe::App for PhotoEditor {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.editor.poll_saves();
        let modal = self.editor.alert().is_some();
        let now = ctx.input(|i| i.time);

        if !modal {
            if let Some(PickResult::Picked(image)) = picker::take_dropped(ctx) {
                self.editor.select_image(image);
            }
        }

        let layout = self.editor.layout(ctx.available_rect());

        let mut action = None;
        egui::TopBottomPanel::bottom("toolbar")
            .exact_height(TOOLBAR_HEIGHT)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!modal, |ui| {
                    action = self.toolbar(ui, layout.toolbar);
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(ctx.style().visuals.panel_fill))
            .show(ctx, |ui| {
                let container = layout.container;
                let response = ui.interact(container, ui.id().with("container"), egui::Sense::drag());

                if modal {
                    self.gestures.cancel();
                } else {
                    let view = self.editor.image_view();
                    let gestures = &mut self.gestures;
                    ctx.input(|i| {
                        gestures.capture(i, &response, |pos| view.hit_test(container, pos));
                    });
                    self.editor.handle_gestures(&mut self.gestures);
                }

                self.paint_container(ui, container, now);
            });

        if let Some(action) = action {
            self.apply(ctx, action, now);
        }

        let acknowledged = self.editor.alert().is_some_and(|alert| alert.show(ctx));
        if acknowledged {
            self.editor.dismiss_alert();
        }

        if self.editor.is_animating() {
            ctx.request_repaint();
        }
    }
}

/// Shrinks `image` to fit the GPU's texture limit, keeping its aspect ratio.
fn texture_image(image: &DynamicImage, max_side: usize) -> Cow<'_, DynamicImage> {
    let max_side = u32::try_from(max_side).unwrap_or(u32::MAX).max(1);
    if image.width() <= max_side && image.height() <= max_side {
        return Cow::Borrowed(image);
    }
    debug!(
        width = image.width(),
        height = image.height(),
        max_side,
        "downscaling display texture"
    );
    Cow::Owned(image.thumbnail(max_side, max_side))
}

/// Fills the area between each square corner of `rect` and its rounded arc,
/// so content clipped to `rect` looks rounded.
fn corner_caps(rect: Rect, radius: f32, fill: Color32) -> egui::Shape {
    let radius = radius.min(rect.width() / 2.0).min(rect.height() / 2.0);
    let corners = [
        (rect.left_top(), pos2(rect.left() + radius, rect.top() + radius), 180.0f32),
        (rect.right_top(), pos2(rect.right() - radius, rect.top() + radius), 270.0),
        (rect.right_bottom(), pos2(rect.right() - radius, rect.bottom() - radius), 0.0),
        (rect.left_bottom(), pos2(rect.left() + radius, rect.bottom() - radius), 90.0),
    ];

    let mut mesh = egui::Mesh::default();
    for (corner, arc_center, start_deg) in corners {
        let apex = mesh.vertices.len() as u32;
        mesh.colored_vertex(corner, fill);
        for step in 0..=CORNER_SEGMENTS {
            let angle = (start_deg + 90.0 * step as f32 / CORNER_SEGMENTS as f32).to_radians();
            mesh.colored_vertex(arc_center + radius * vec2(angle.cos(), angle.sin()), fill);
        }
        for step in 0..CORNER_SEGMENTS as u32 {
            mesh.add_triangle(apex, apex + 1 + step, apex + 2 + step);
        }
    }
    egui::Shape::mesh(mesh)
}

fn install_fonts(ctx: &egui::Context, configured: Option<&Path>) {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        match std::fs::read(&path) {
            Ok(bytes) => {
                let mut fonts = egui::FontDefinitions::default();
                fonts
                    .font_data
                    .insert("cjk".to_owned(), egui::FontData::from_owned(bytes));
                for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                    fonts
                        .families
                        .entry(family)
                        .or_default()
                        .push("cjk".to_owned());
                }
                ctx.set_fonts(fonts);
                info!(font = %path.display(), "installed CJK font");
                return;
            }
            Err(err) => debug!(font = %path.display(), %err, "font not usable"),
        }
    }
    warn!("no CJK font found, Chinese labels may not render");
}
