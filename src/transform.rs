//! Scale and rotation state for the image view.
//!
//! The on-screen transform is always rebuilt from two scalars, `scale` and
//! `rotation`, starting at identity. Translation never enters the matrix; the
//! image view moves by changing its center instead.

use eframe::egui::{Vec2, vec2};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 3.0;

/// 2x2 linear part of an affine transform, column-vector convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Affine {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
    };

    /// Applies `self` first, then the scale.
    pub fn scaled_by(self, sx: f32, sy: f32) -> Self {
        Self {
            a: self.a * sx,
            b: self.b * sy,
            c: self.c * sx,
            d: self.d * sy,
        }
    }

    /// Applies the rotation first, then `self`. Positive angles turn clockwise
    /// on screen since y grows downwards.
    pub fn rotated_by(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            a: self.a * cos + self.c * sin,
            b: self.b * cos + self.d * sin,
            c: -self.a * sin + self.c * cos,
            d: -self.b * sin + self.d * cos,
        }
    }

    pub fn apply(&self, v: Vec2) -> Vec2 {
        vec2(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() <= f32::EPSILON || !det.is_finite() {
            return None;
        }
        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
        })
    }

    #[cfg(test)]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    scale: f32,
    rotation: f32,
    matrix: Affine,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: 0.0,
            matrix: Affine::IDENTITY,
        }
    }
}

impl TransformState {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    /// Multiplies the accumulated scale by an incremental pinch factor.
    pub fn pinch(&mut self, factor: f32) {
        if factor.is_nan() {
            return;
        }
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.update_matrix();
    }

    /// Adds an incremental rotation in radians. No bounds apply.
    pub fn rotate(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.rotation += delta;
        self.update_matrix();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn update_matrix(&mut self) {
        self.matrix = compose(self.scale, self.rotation);
    }
}

pub fn compose(scale: f32, rotation: f32) -> Affine {
    Affine::IDENTITY
        .scaled_by(scale, scale)
        .rotated_by(rotation)
}

/// What the image view looks like on screen at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub scale: f32,
    pub rotation: f32,
    pub offset: Vec2,
}

impl Pose {
    #[cfg(test)]
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        rotation: 0.0,
        offset: Vec2::ZERO,
    };

    pub fn matrix(&self) -> Affine {
        compose(self.scale, self.rotation)
    }

    pub fn lerp(&self, to: &Pose, t: f32) -> Pose {
        let t = t.clamp(0.0, 1.0);
        Pose {
            scale: self.scale + (to.scale - self.scale) * t,
            rotation: self.rotation + (to.rotation - self.rotation) * t,
            offset: self.offset + (to.offset - self.offset) * t,
        }
    }
}

pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_close(a: Vec2, b: Vec2) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn pinch_scenario_clamps_then_reset_restores_unit_scale() {
        let mut state = TransformState::default();
        state.pinch(4.0);
        assert_eq!(state.scale(), 3.0);
        state.pinch(0.1);
        assert_eq!(state.scale(), 0.5);
        state.reset();
        assert_eq!(state.scale(), 1.0);
        assert_eq!(state.rotation(), 0.0);
        assert!(state.matrix().is_identity());
    }

    #[test]
    fn negative_and_infinite_factors_stay_in_bounds() {
        let mut state = TransformState::default();
        state.pinch(-2.0);
        assert_eq!(state.scale(), MIN_SCALE);
        state.pinch(f32::INFINITY);
        assert_eq!(state.scale(), MAX_SCALE);
        state.pinch(f32::NAN);
        assert_eq!(state.scale(), MAX_SCALE);
    }

    #[test]
    fn rotation_accumulates_without_clamping() {
        let mut state = TransformState::default();
        for _ in 0..10 {
            state.rotate(FRAC_PI_2);
        }
        assert!((state.rotation() - 5.0 * std::f32::consts::PI).abs() < 1e-4);
    }

    #[test]
    fn matrix_is_scale_and_rotation_from_identity() {
        let mut state = TransformState::default();
        state.pinch(2.0);
        state.rotate(FRAC_PI_2);
        let m = state.matrix();
        assert_close(m.apply(vec2(1.0, 0.0)), vec2(0.0, 2.0));
        assert_close(m.apply(vec2(0.0, 1.0)), vec2(-2.0, 0.0));
        assert_eq!(m, compose(state.scale(), state.rotation()));
    }

    #[test]
    fn inverse_undoes_the_transform() {
        let m = compose(1.7, 0.6);
        let inv = m.inverse().expect("invertible");
        let p = vec2(12.0, -3.5);
        assert_close(inv.apply(m.apply(p)), p);
    }

    #[test]
    fn pose_lerp_reaches_target() {
        let from = Pose {
            scale: 2.0,
            rotation: 1.0,
            offset: vec2(10.0, -10.0),
        };
        assert_eq!(from.lerp(&Pose::IDENTITY, 1.0), Pose::IDENTITY);
        assert_eq!(from.lerp(&Pose::IDENTITY, 0.0), from);
        assert_eq!(ease_in_out(0.5), 0.5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any pinch sequence keeps the scale in bounds.
            #[test]
            fn prop_scale_stays_in_bounds(factors in prop::collection::vec(-100.0f32..100.0, 1..50)) {
                let mut state = TransformState::default();
                for factor in factors {
                    state.pinch(factor);
                    prop_assert!(state.scale() >= MIN_SCALE && state.scale() <= MAX_SCALE);
                }
            }
        }
    }
}
