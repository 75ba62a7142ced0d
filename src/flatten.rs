//! Flattening the container into a bitmap.
//!
//! Rendering works by inverse mapping: every output pixel center is carried
//! back through the image view's frame and transform into source image
//! coordinates and sampled with `imageops::sample_bilinear`. Pixels that land
//! outside the image stay transparent, and nothing outside the container
//! bounds is ever produced, so the output is exactly what the container clips.

use std::ops::Deref;

use eframe::egui::{Rect, Vec2, pos2, vec2};
use image::{Rgba, RgbaImage, imageops};
use tracing::debug;

use crate::error::{EditorError, Result};
use crate::image_view::ImageView;

/// Largest side accepted for an offscreen context, in pixels.
const MAX_CONTEXT_SIDE: f32 = 16_384.0;

/// Visual properties of the clipping container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerView {
    pub bounds: Rect,
    pub corner_radius: f32,
}

impl ContainerView {
    pub fn new(corner_radius: f32) -> Self {
        Self {
            bounds: Rect::NOTHING,
            corner_radius,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.bounds.size()
    }
}

/// Zeroes the container's corner radius while alive and puts it back on drop.
pub struct SquareCorners<'a> {
    container: &'a mut ContainerView,
    saved_radius: f32,
}

impl<'a> SquareCorners<'a> {
    pub fn new(container: &'a mut ContainerView) -> Self {
        let saved_radius = container.corner_radius;
        container.corner_radius = 0.0;
        Self {
            container,
            saved_radius,
        }
    }
}

impl Deref for SquareCorners<'_> {
    type Target = ContainerView;

    fn deref(&self) -> &ContainerView {
        self.container
    }
}

impl Drop for SquareCorners<'_> {
    fn drop(&mut self) {
        self.container.corner_radius = self.saved_radius;
    }
}

/// An offscreen RGBA target sized to a view in points at a given pixel
/// density. Starts fully transparent.
pub struct RenderContext {
    buffer: RgbaImage,
    pixels_per_point: f32,
}

impl RenderContext {
    pub fn new(size: Vec2, pixels_per_point: f32) -> Result<Self> {
        let width = (size.x * pixels_per_point).round();
        let height = (size.y * pixels_per_point).round();
        let valid = |side: f32| side.is_finite() && side >= 1.0 && side <= MAX_CONTEXT_SIDE;
        if !valid(width) || !valid(height) {
            return Err(EditorError::RenderContext { width, height });
        }
        Ok(Self {
            buffer: RgbaImage::new(width as u32, height as u32),
            pixels_per_point,
        })
    }

    pub fn into_image(self) -> RgbaImage {
        self.buffer
    }

    /// Draws the container and its image view. The container's own bounds
    /// become the context origin.
    pub fn draw_hierarchy(&mut self, container: &ContainerView, view: &ImageView) {
        if let Some(image) = view.image() {
            let source = image.to_rgba8();
            self.draw_image_view(&source, view, container.bounds);
        }
        if container.corner_radius > 0.0 {
            self.round_corners(container.corner_radius);
        }
        debug!(
            width = self.buffer.width(),
            height = self.buffer.height(),
            "rendered container hierarchy"
        );
    }

    fn draw_image_view(&mut self, source: &RgbaImage, view: &ImageView, container: Rect) {
        let Some(inverse) = view.transform().matrix().inverse() else {
            return;
        };
        let size = view.size();
        if size.x <= 0.0 || size.y <= 0.0 || source.width() == 0 || source.height() == 0 {
            return;
        }
        // Frame center relative to the container origin.
        let center = view.center_in(container) - container.min;
        let half = size / 2.0;
        let ppp = self.pixels_per_point;

        for (x, y, pixel) in self.buffer.enumerate_pixels_mut() {
            let point = pos2((x as f32 + 0.5) / ppp, (y as f32 + 0.5) / ppp);
            let local = inverse.apply(point.to_vec2() - center) + half;
            if local.x < 0.0 || local.y < 0.0 || local.x >= size.x || local.y >= size.y {
                continue;
            }
            // Edge texels extend outwards, so inside the frame a sample always exists.
            let sample = imageops::sample_bilinear(source, local.x / size.x, local.y / size.y);
            if let Some(sample) = sample {
                *pixel = sample;
            }
        }
    }

    /// Antialiased rounded-rect mask applied to alpha.
    fn round_corners(&mut self, radius_points: f32) {
        let (w, h) = (self.buffer.width() as f32, self.buffer.height() as f32);
        let radius = (radius_points * self.pixels_per_point).min(w / 2.0).min(h / 2.0);
        for (x, y, pixel) in self.buffer.enumerate_pixels_mut() {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let cx = px.clamp(radius, w - radius);
            let cy = py.clamp(radius, h - radius);
            let distance = vec2(px - cx, py - cy).length();
            let coverage = (radius - distance + 0.5).clamp(0.0, 1.0);
            if coverage < 1.0 {
                let Rgba([r, g, b, a]) = *pixel;
                *pixel = Rgba([r, g, b, (a as f32 * coverage).round() as u8]);
            }
        }
    }
}

/// Captures what the container currently shows.
///
/// Corner rounding is neutralized for the duration of the render so the
/// bitmap is a full rectangle. The radius is restored before the bitmap is
/// handed out, and also when the context cannot be created.
pub fn flatten(
    container: &mut ContainerView,
    view: &ImageView,
    pixels_per_point: f32,
) -> Result<RgbaImage> {
    if view.image().is_none() {
        return Err(EditorError::NoImage);
    }
    let square = SquareCorners::new(container);
    let mut context = RenderContext::new(square.size(), pixels_per_point)?;
    context.draw_hierarchy(&square, view);
    drop(square);
    Ok(context.into_image())
}
