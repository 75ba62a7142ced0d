use std::path::{Path, PathBuf};

use eframe::egui;
use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::{EditorError, Result};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// What came back from presenting the picker.
pub enum PickResult {
    Picked(DynamicImage),
    Cancelled,
}

/// Shows the native open dialog and decodes the chosen file. A file that
/// fails to decode is logged and treated like a cancellation.
pub fn present() -> PickResult {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("图片", IMAGE_EXTENSIONS)
        .pick_file()
    else {
        debug!("image picker cancelled");
        return PickResult::Cancelled;
    };
    open_or_cancel(&path)
}

/// The first image file dropped onto the window this frame, if any.
pub fn take_dropped(ctx: &egui::Context) -> Option<PickResult> {
    let path: PathBuf = ctx.input(|i| {
        i.raw
            .dropped_files
            .iter()
            .find_map(|file| file.path.clone())
    })?;
    Some(open_or_cancel(&path))
}

pub fn open(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(EditorError::Decode)
}

fn open_or_cancel(path: &Path) -> PickResult {
    match open(path) {
        Ok(image) => PickResult::Picked(image),
        Err(err) => {
            warn!(path = %path.display(), %err, "could not open picked image");
            PickResult::Cancelled
        }
    }
}
