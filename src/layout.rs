use eframe::egui::{Rect, Vec2, pos2, vec2};
use std::fmt;

pub const TOOLBAR_HEIGHT: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AspectMode {
    #[default]
    Original,
    Square,
}

impl fmt::Display for AspectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AspectMode::Original => "原始比例",
            AspectMode::Square => "正方形",
        };
        write!(f, "{}", s)
    }
}

/// `container.height = container.width * multiplier`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AspectConstraint {
    pub multiplier: f32,
}

/// Which aspect constraint is active on the container. At most one is
/// active at a time.
#[derive(Clone, Copy, Debug, Default)]
pub struct AspectToggle {
    mode: AspectMode,
    active: Option<AspectConstraint>,
}

impl AspectToggle {
    pub fn mode(&self) -> AspectMode {
        self.mode
    }

    pub fn active(&self) -> Option<AspectConstraint> {
        self.active
    }

    /// Deactivates the current constraint and activates the one for `mode`.
    /// Original mode needs an image to know its ratio; without one no
    /// constraint is active.
    pub fn select(&mut self, mode: AspectMode, image_size: Option<Vec2>) {
        self.active = None;
        self.mode = mode;
        let multiplier = match mode {
            AspectMode::Square => Some(1.0),
            AspectMode::Original => image_size
                .filter(|size| size.x > 0.0 && size.y > 0.0)
                .map(|size| size.y / size.x),
        };
        self.active = multiplier.map(|multiplier| AspectConstraint { multiplier });
    }
}

/// Result of one layout pass over the screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenLayout {
    pub container: Rect,
    pub toolbar: Rect,
}

/// The container hangs from the top of the safe area, spans the full width and
/// sits directly above the toolbar. An aspect constraint shrinks whichever
/// side would overflow and keeps the container horizontally centered.
pub fn solve(safe_area: Rect, aspect: Option<AspectConstraint>) -> ScreenLayout {
    let toolbar = Rect::from_min_max(
        pos2(safe_area.min.x, (safe_area.max.y - TOOLBAR_HEIGHT).max(safe_area.min.y)),
        safe_area.max,
    );
    let available = vec2(safe_area.width(), (toolbar.min.y - safe_area.min.y).max(0.0));

    let size = match aspect {
        Some(AspectConstraint { multiplier }) if multiplier > 0.0 => {
            let height = available.x * multiplier;
            if height <= available.y {
                vec2(available.x, height)
            } else {
                vec2(available.y / multiplier, available.y)
            }
        }
        _ => available,
    };

    let min = pos2(
        safe_area.min.x + (available.x - size.x) / 2.0,
        safe_area.min.y,
    );
    ScreenLayout {
        container: Rect::from_min_size(min, size),
        toolbar,
    }
}

/// Largest size with the image's aspect ratio that fits inside `container`.
pub fn aspect_fit(image: Vec2, container: Vec2) -> Vec2 {
    if image.x <= 0.0 || image.y <= 0.0 {
        return container;
    }
    let scale = (container.x / image.x).min(container.y / image.y);
    image * scale
}
