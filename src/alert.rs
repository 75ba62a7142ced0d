use eframe::egui;

pub const SELECT_IMAGE_FIRST: &str = "请先选择图片";
pub const IMAGE_SAVED: &str = "图片已保存到相册";
pub const CONFIRM: &str = "确定";

pub fn save_failed(description: &str) -> String {
    format!("保存失败: {}", description)
}

/// A modal message with a single acknowledgement button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` once the user acknowledged the message.
    pub fn show(&self, ctx: &egui::Context) -> bool {
        let screen = ctx.screen_rect();
        egui::Area::new(egui::Id::new("alert_scrim"))
            .order(egui::Order::Middle)
            .fixed_pos(screen.min)
            .show(ctx, |ui| {
                ui.allocate_response(screen.size(), egui::Sense::click());
                ui.painter()
                    .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(100));
            });

        let mut acknowledged = false;
        egui::Window::new("alert")
            .title_bar(false)
            .collapsible(false)
            .resizable(false)
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.label(&self.message);
                    ui.add_space(8.0);
                    acknowledged = ui.button(CONFIRM).clicked()
                        || ui.input(|i| i.key_pressed(egui::Key::Enter));
                });
            });
        acknowledged
    }
}
