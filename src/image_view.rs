use eframe::egui::{Pos2, Rect, Vec2, vec2};
use image::{DynamicImage, GenericImageView};

use crate::layout::aspect_fit;
use crate::transform::TransformState;

/// The view that shows the selected image inside the container.
///
/// Its frame is `size` centered at the container center plus `offset`. Pans
/// move the offset; pinches and rotations go through `transform`.
#[derive(Default)]
pub struct ImageView {
    image: Option<DynamicImage>,
    size: Vec2,
    offset: Vec2,
    transform: TransformState,
}

impl ImageView {
    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }

    pub fn image_size(&self) -> Option<Vec2> {
        self.image.as_ref().map(|image| {
            let (w, h) = image.dimensions();
            vec2(w as f32, h as f32)
        })
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut TransformState {
        &mut self.transform
    }

    /// Installs a new bitmap, fits it inside the container and drops any
    /// previous gesture state.
    pub fn set_image(&mut self, image: DynamicImage, container: Vec2) {
        self.image = Some(image);
        self.refit(container);
        self.reset();
    }

    /// Recomputes the fitted size for the current container. Without an image
    /// the view matches the container.
    pub fn refit(&mut self, container: Vec2) {
        self.size = match self.image_size() {
            Some(image) => aspect_fit(image, container),
            None => container,
        };
    }

    pub fn pan(&mut self, translation: Vec2) {
        if translation.x.is_finite() && translation.y.is_finite() {
            self.offset += translation;
        }
    }

    pub fn reset(&mut self) {
        self.transform.reset();
        self.offset = Vec2::ZERO;
    }

    pub fn center_in(&self, container: Rect) -> Pos2 {
        container.center() + self.offset
    }

    pub fn hit_test(&self, container: Rect, pos: Pos2) -> bool {
        let Some(inverse) = self.transform.matrix().inverse() else {
            return false;
        };
        let local = inverse.apply(pos - self.center_in(container));
        let half = self.size / 2.0;
        local.x.abs() <= half.x && local.y.abs() <= half.y
    }
}
