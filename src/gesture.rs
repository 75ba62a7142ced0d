use eframe::egui::{self, Pos2, Vec2};

const KEY_ROTATION_STEP: f32 = std::f32::consts::PI / 12.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Possible,
    Began,
    Changed,
    Ended,
}

/// A continuous gesture that accumulates incremental values between
/// consumptions. Handlers read [`Recognizer::value`] and then call
/// [`Recognizer::reset_value`], so each read is a delta since the last one.
#[derive(Clone, Copy, Debug)]
pub struct Recognizer<V: Copy> {
    phase: GesturePhase,
    value: V,
    neutral: V,
    combine: fn(V, V) -> V,
}

impl<V: Copy> Recognizer<V> {
    fn new(neutral: V, combine: fn(V, V) -> V) -> Self {
        Self {
            phase: GesturePhase::Possible,
            value: neutral,
            neutral,
            combine,
        }
    }

    pub fn feed(&mut self, delta: Option<V>) {
        match (delta, self.phase) {
            (Some(delta), GesturePhase::Possible | GesturePhase::Ended) => {
                self.phase = GesturePhase::Began;
                self.value = (self.combine)(self.neutral, delta);
            }
            (Some(delta), GesturePhase::Began | GesturePhase::Changed) => {
                self.phase = GesturePhase::Changed;
                self.value = (self.combine)(self.value, delta);
            }
            (None, GesturePhase::Began | GesturePhase::Changed) => {
                self.phase = GesturePhase::Ended;
            }
            (None, _) => {
                self.phase = GesturePhase::Possible;
                self.value = self.neutral;
            }
        }
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, GesturePhase::Began | GesturePhase::Changed)
    }

    pub fn value(&self) -> V {
        self.value
    }

    pub fn reset_value(&mut self) {
        self.value = self.neutral;
    }
}

pub type PinchGesture = Recognizer<f32>;
pub type RotationGesture = Recognizer<f32>;
pub type PanGesture = Recognizer<Vec2>;

pub fn pinch() -> PinchGesture {
    Recognizer::new(1.0, |a, b| a * b)
}

pub fn rotation() -> RotationGesture {
    Recognizer::new(0.0, |a, b| a + b)
}

pub fn pan() -> PanGesture {
    Recognizer::new(Vec2::ZERO, |a, b| a + b)
}

/// Raw per-frame deltas for each recognizer. `None` means the gesture is not
/// in progress this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub pinch: Option<f32>,
    pub rotation: Option<f32>,
    pub pan: Option<Vec2>,
}

impl FrameInput {
    /// Reads this frame's gesture deltas. `on_image` tells whether a screen
    /// position lies on the image view, since gestures are attached there.
    pub fn capture(
        input: &egui::InputState,
        response: &egui::Response,
        tracking_pan: &mut bool,
        on_image: impl Fn(Pos2) -> bool,
    ) -> Self {
        let mut frame = FrameInput::default();

        if let Some(touch) = input.multi_touch() {
            if on_image(touch.start_pos) {
                frame.pinch = Some(touch.zoom_delta);
                frame.rotation = Some(touch.rotation_delta);
                frame.pan = Some(touch.translation_delta);
            }
            *tracking_pan = false;
            return frame;
        }

        let hovering_image = response.hover_pos().is_some_and(&on_image);

        let zoom = input.zoom_delta();
        if hovering_image && zoom != 1.0 {
            frame.pinch = Some(zoom);
        }

        if hovering_image {
            let mut turn = 0.0;
            if input.key_pressed(egui::Key::Q) {
                turn -= KEY_ROTATION_STEP;
            }
            if input.key_pressed(egui::Key::E) {
                turn += KEY_ROTATION_STEP;
            }
            if turn != 0.0 {
                frame.rotation = Some(turn);
            }
        }

        if response.drag_started_by(egui::PointerButton::Primary) {
            *tracking_pan = response.interact_pointer_pos().is_some_and(&on_image);
        }
        if *tracking_pan && response.dragged_by(egui::PointerButton::Primary) {
            frame.pan = Some(response.drag_delta());
        } else {
            *tracking_pan = false;
        }

        frame
    }
}

/// The three recognizers attached to the image view. They all recognize
/// simultaneously.
#[derive(Clone, Copy, Debug)]
pub struct GestureSet {
    pub pinch: PinchGesture,
    pub rotation: RotationGesture,
    pub pan: PanGesture,
    tracking_pan: bool,
}

impl Default for GestureSet {
    fn default() -> Self {
        Self {
            pinch: pinch(),
            rotation: rotation(),
            pan: pan(),
            tracking_pan: false,
        }
    }
}

impl GestureSet {
    pub fn feed(&mut self, frame: FrameInput) {
        self.pinch.feed(frame.pinch);
        self.rotation.feed(frame.rotation);
        self.pan.feed(frame.pan);
    }

    pub fn capture(
        &mut self,
        input: &egui::InputState,
        response: &egui::Response,
        on_image: impl Fn(Pos2) -> bool,
    ) {
        let frame = FrameInput::capture(input, response, &mut self.tracking_pan, on_image);
        self.feed(frame);
    }

    pub fn any_began(&self) -> bool {
        self.pinch.phase() == GesturePhase::Began
            || self.rotation.phase() == GesturePhase::Began
            || self.pan.phase() == GesturePhase::Began
    }

    /// Drops any gesture in flight, e.g. while a modal covers the screen.
    pub fn cancel(&mut self) {
        self.tracking_pan = false;
        self.feed(FrameInput::default());
        self.feed(FrameInput::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_view::ImageView;
    use eframe::egui::{Rect, pos2, vec2};

    #[test]
    fn phases_follow_the_gesture_lifecycle() {
        let mut g = pinch();
        assert_eq!(g.phase(), GesturePhase::Possible);
        g.feed(Some(1.1));
        assert_eq!(g.phase(), GesturePhase::Began);
        g.feed(Some(1.1));
        assert_eq!(g.phase(), GesturePhase::Changed);
        g.feed(None);
        assert_eq!(g.phase(), GesturePhase::Ended);
        assert!(!g.is_active());
        g.feed(None);
        assert_eq!(g.phase(), GesturePhase::Possible);
    }

    #[test]
    fn unconsumed_pinch_accumulates_multiplicatively() {
        let mut g = pinch();
        g.feed(Some(2.0));
        g.feed(Some(1.5));
        assert_eq!(g.value(), 3.0);
        g.reset_value();
        assert_eq!(g.value(), 1.0);
        g.feed(Some(0.5));
        assert_eq!(g.value(), 0.5);
    }

    #[test]
    fn new_gesture_starts_from_neutral() {
        let mut g = rotation();
        g.feed(Some(0.3));
        g.feed(None);
        g.feed(Some(0.2));
        assert_eq!(g.phase(), GesturePhase::Began);
        assert_eq!(g.value(), 0.2);
    }

    #[test]
    fn recognizers_in_a_set_are_independent() {
        let mut set = GestureSet::default();
        set.feed(FrameInput {
            pinch: Some(1.2),
            rotation: Some(0.1),
            pan: Some(vec2(3.0, 4.0)),
        });
        assert!(set.pinch.is_active() && set.rotation.is_active() && set.pan.is_active());
        assert!(set.any_began());
        set.feed(FrameInput {
            pinch: None,
            rotation: Some(0.1),
            pan: None,
        });
        assert!(!set.pinch.is_active());
        assert!(set.rotation.is_active());
        assert_eq!(set.pan.phase(), GesturePhase::Ended);
    }

    #[test]
    fn cancel_leaves_everything_idle() {
        let mut set = GestureSet::default();
        set.feed(FrameInput {
            pinch: Some(2.0),
            rotation: None,
            pan: Some(vec2(1.0, 1.0)),
        });
        set.cancel();
        assert_eq!(set.pinch.phase(), GesturePhase::Possible);
        assert_eq!(set.pan.value(), Vec2::ZERO);
    }

    /// A 100x20 view turned upright, so it covers x 90..110 and y 50..150 of
    /// the container.
    fn upright_view() -> ImageView {
        let mut view = ImageView::default();
        view.refit(vec2(100.0, 20.0));
        view.transform_mut().rotate(std::f32::consts::FRAC_PI_2);
        view
    }

    fn container() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(200.0, 200.0))
    }

    /// Runs one headless egui frame per entry and captures gesture input the
    /// way the app does.
    fn capture_frames(view: &ImageView, frames: Vec<Vec<egui::Event>>) -> Vec<FrameInput> {
        let ctx = egui::Context::default();
        let container = container();
        let mut tracking_pan = false;
        let mut captured = Vec::new();
        for (index, events) in frames.into_iter().enumerate() {
            let raw = egui::RawInput {
                screen_rect: Some(Rect::from_min_size(Pos2::ZERO, vec2(400.0, 400.0))),
                time: Some(index as f64 / 60.0),
                events,
                ..Default::default()
            };
            let _ = ctx.run(raw, |ctx| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    let response =
                        ui.interact(container, ui.id().with("container"), egui::Sense::drag());
                    captured.push(ctx.input(|i| {
                        FrameInput::capture(i, &response, &mut tracking_pan, |pos| {
                            view.hit_test(container, pos)
                        })
                    }));
                });
            });
        }
        captured
    }

    fn drag_from(start: Pos2) -> Vec<Vec<egui::Event>> {
        let press = egui::Event::PointerButton {
            pos: start,
            button: egui::PointerButton::Primary,
            pressed: true,
            modifiers: egui::Modifiers::NONE,
        };
        vec![
            vec![egui::Event::PointerMoved(start)],
            vec![press],
            vec![egui::Event::PointerMoved(start + vec2(0.0, 10.0))],
            vec![egui::Event::PointerMoved(start + vec2(0.0, 20.0))],
            vec![egui::Event::PointerMoved(start + vec2(0.0, 30.0))],
        ]
    }

    fn key(key: egui::Key) -> egui::Event {
        egui::Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn drag_starting_on_rotated_image_pans() {
        let frames = capture_frames(&upright_view(), drag_from(pos2(100.0, 60.0)));
        let panned: Vec<Vec2> = frames.iter().filter_map(|frame| frame.pan).collect();
        assert!(!panned.is_empty(), "no pan captured: {frames:?}");
        assert!(panned.iter().all(|delta| delta.x == 0.0 && delta.y >= 0.0));
    }

    #[test]
    fn drag_starting_outside_rotated_image_does_not_pan() {
        // Inside the unrotated frame, outside the rotated one.
        let start = pos2(140.0, 100.0);
        assert!(!upright_view().hit_test(container(), start));

        let frames = capture_frames(&upright_view(), drag_from(start));

        assert!(frames.iter().all(|frame| frame.pan.is_none()), "{frames:?}");
    }

    #[test]
    fn q_and_e_rotate_in_fixed_steps_over_the_image() {
        let over_image = egui::Event::PointerMoved(pos2(100.0, 100.0));
        let frames = capture_frames(
            &upright_view(),
            vec![
                vec![over_image],
                vec![key(egui::Key::Q)],
                vec![key(egui::Key::E)],
                vec![],
            ],
        );
        assert_eq!(frames[1].rotation, Some(-KEY_ROTATION_STEP));
        assert_eq!(frames[2].rotation, Some(KEY_ROTATION_STEP));
        assert_eq!(frames[3].rotation, None);
        assert_eq!(KEY_ROTATION_STEP, std::f32::consts::PI / 12.0);
    }

    #[test]
    fn keys_away_from_the_image_do_nothing() {
        let frames = capture_frames(
            &upright_view(),
            vec![
                vec![egui::Event::PointerMoved(pos2(20.0, 20.0))],
                vec![key(egui::Key::Q)],
                vec![egui::Event::Zoom(1.5)],
            ],
        );
        assert!(frames.iter().all(|frame| *frame == FrameInput::default()), "{frames:?}");
    }

    #[test]
    fn zoom_over_the_image_pinches() {
        let frames = capture_frames(
            &upright_view(),
            vec![
                vec![egui::Event::PointerMoved(pos2(100.0, 100.0))],
                vec![egui::Event::Zoom(1.25)],
            ],
        );
        assert_eq!(frames[1].pinch, Some(1.25));
        assert_eq!(frames[1].pan, None);
    }
}
