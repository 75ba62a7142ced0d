use std::sync::Arc;

use eframe::egui::{Rect, Vec2};
use image::DynamicImage;
use tracing::{debug, error, info};

use crate::alert::{self, Alert};
use crate::error::EditorError;
use crate::flatten::{self, ContainerView};
use crate::gesture::{GestureSet, PanGesture, PinchGesture, RotationGesture};
use crate::image_view::ImageView;
use crate::layout::{self, AspectMode, AspectToggle, ScreenLayout};
use crate::library::{PendingSave, PhotoLibrary};
use crate::transform::{Pose, ease_in_out};

struct ResetAnimation {
    from: Pose,
    started: f64,
    duration: f32,
}

/// Owns the editing screen's state and every action that mutates it. All
/// methods run on the UI thread.
pub struct Editor {
    container: ContainerView,
    image_view: ImageView,
    aspect: AspectToggle,
    safe_area: Rect,
    layout: ScreenLayout,
    needs_refit: bool,
    reset_animation: Option<ResetAnimation>,
    reset_duration: f32,
    alert: Option<Alert>,
    pending_saves: Vec<PendingSave>,
    library: Arc<dyn PhotoLibrary>,
    image_generation: u64,
}

impl Editor {
    pub fn new(library: Arc<dyn PhotoLibrary>, corner_radius: f32, reset_duration: f32) -> Self {
        Self {
            container: ContainerView::new(corner_radius),
            image_view: ImageView::default(),
            aspect: AspectToggle::default(),
            safe_area: Rect::NOTHING,
            layout: ScreenLayout {
                container: Rect::NOTHING,
                toolbar: Rect::NOTHING,
            },
            needs_refit: false,
            reset_animation: None,
            reset_duration,
            alert: None,
            pending_saves: Vec::new(),
            library,
            image_generation: 0,
        }
    }

    pub fn container(&self) -> &ContainerView {
        &self.container
    }

    pub fn image_view(&self) -> &ImageView {
        &self.image_view
    }

    pub fn aspect_mode(&self) -> AspectMode {
        self.aspect.mode()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn is_saving(&self) -> bool {
        !self.pending_saves.is_empty()
    }

    /// Bumped every time a new bitmap is installed.
    pub fn image_generation(&self) -> u64 {
        self.image_generation
    }

    /// Runs the layout pass for this frame. A refit requested by an earlier
    /// aspect change happens here, after the container has settled.
    pub fn layout(&mut self, safe_area: Rect) -> ScreenLayout {
        if safe_area != self.safe_area {
            self.safe_area = safe_area;
            self.settle();
        }
        if self.needs_refit {
            self.needs_refit = false;
            self.image_view.refit(self.container.size());
            self.image_view.reset();
            self.reset_animation = None;
            debug!(size = ?self.image_view.size(), "image view refitted");
        }
        self.layout
    }

    fn settle(&mut self) {
        self.layout = layout::solve(self.safe_area, self.aspect.active());
        self.container.bounds = self.layout.container;
    }

    pub fn select_aspect(&mut self, mode: AspectMode) {
        self.aspect.select(mode, self.image_view.image_size());
        self.settle();
        self.needs_refit = true;
        info!(%mode, multiplier = ?self.aspect.active().map(|c| c.multiplier), "aspect mode selected");
    }

    /// Snaps the state back to identity and animates the view there from
    /// wherever it was shown.
    pub fn reset(&mut self, now: f64) {
        let from = self.display_pose(now);
        self.image_view.reset();
        self.reset_animation = Some(ResetAnimation {
            from,
            started: now,
            duration: self.reset_duration,
        });
        info!("transform reset");
    }

    pub fn select_image(&mut self, image: DynamicImage) {
        info!(width = image.width(), height = image.height(), "image selected");
        self.image_view.set_image(image, self.container.size());
        self.aspect
            .select(self.aspect.mode(), self.image_view.image_size());
        self.settle();
        self.needs_refit = true;
        self.reset_animation = None;
        self.image_generation += 1;
    }

    /// Flattens the container and hands the bitmap to the photo library on a
    /// worker thread. `notify` is called from that thread when it finishes.
    pub fn save(&mut self, pixels_per_point: f32, notify: impl FnOnce() + Send + 'static) {
        if self.image_view.image().is_none() {
            self.alert = Some(Alert::new(alert::SELECT_IMAGE_FIRST));
            return;
        }
        match flatten::flatten(&mut self.container, &self.image_view, pixels_per_point) {
            Ok(bitmap) => {
                info!(width = bitmap.width(), height = bitmap.height(), "submitting flattened image");
                self.pending_saves
                    .push(PendingSave::submit(Arc::clone(&self.library), bitmap, notify));
            }
            Err(err) => error!(%err, "could not flatten container"),
        }
    }

    /// Collects finished saves and turns them into alerts.
    pub fn poll_saves(&mut self) {
        let mut finished: Vec<Result<_, EditorError>> = Vec::new();
        self.pending_saves.retain(|pending| match pending.try_finish() {
            Some(result) => {
                finished.push(result);
                false
            }
            None => true,
        });
        for result in finished {
            self.alert = Some(match result {
                Ok(_) => Alert::new(alert::IMAGE_SAVED),
                Err(err) => Alert::new(alert::save_failed(&err.to_string())),
            });
        }
    }

    pub fn handle_pinch(&mut self, gesture: &mut PinchGesture) {
        if gesture.is_active() {
            self.image_view.transform_mut().pinch(gesture.value());
            gesture.reset_value();
        }
    }

    pub fn handle_rotation(&mut self, gesture: &mut RotationGesture) {
        if gesture.is_active() {
            self.image_view.transform_mut().rotate(gesture.value());
            gesture.reset_value();
        }
    }

    pub fn handle_pan(&mut self, gesture: &mut PanGesture) {
        if gesture.is_active() {
            self.image_view.pan(gesture.value());
            gesture.reset_value();
        }
    }

    pub fn handle_gestures(&mut self, gestures: &mut GestureSet) {
        if gestures.any_began() {
            self.reset_animation = None;
        }
        self.handle_pinch(&mut gestures.pinch);
        self.handle_rotation(&mut gestures.rotation);
        self.handle_pan(&mut gestures.pan);
    }

    pub fn is_animating(&self) -> bool {
        self.reset_animation.is_some()
    }

    /// The pose to draw at `now`, blending out of a running reset.
    pub fn display_pose(&mut self, now: f64) -> Pose {
        let target = Pose {
            scale: self.image_view.transform().scale(),
            rotation: self.image_view.transform().rotation(),
            offset: self.image_view.offset(),
        };
        let Some(animation) = &self.reset_animation else {
            return target;
        };
        let elapsed = (now - animation.started) as f32;
        if animation.duration <= 0.0 || elapsed >= animation.duration {
            self.reset_animation = None;
            return target;
        }
        animation
            .from
            .lerp(&target, ease_in_out(elapsed / animation.duration))
    }

    pub fn image_view_size(&self) -> Vec2 {
        self.image_view.size()
    }
}
