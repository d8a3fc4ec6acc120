use crate::touch::TouchSample;
use glam::{Mat4, Vec3};
use std::f32::consts::{FRAC_PI_4, TAU};

/// Vertical field of view.
pub const FIELD_OF_VIEW_Y: f32 = FRAC_PI_4;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 200.0;
/// Distance from the camera to the origin.
pub const ORBIT_RADIUS: f32 = 5.0;

/// The gopher mesh was authored with its up along -X and its forward along
/// +Z. The camera has to use the same up vector for it to stand upright.
pub const MODEL_UP: Vec3 = Vec3::NEG_X;

/// Drawable surface size in pixels. Never zero on either axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Projection, view and model matrices for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
}

/// Turns the latest touch position into the frame's transform chain.
///
/// Horizontal touch position orbits the camera around the model's up axis,
/// one full turn across the surface width. Vertical position scales the
/// model from 0.5 (top) to 1.5 (bottom). Nothing is cached between frames.
#[derive(Debug, Clone)]
pub struct TransformController {
    pub fov_y_rad: f32,
    pub near: f32,
    pub far: f32,
    pub orbit_radius: f32,
    pub up: Vec3,
}

impl Default for TransformController {
    fn default() -> Self {
        Self {
            fov_y_rad: FIELD_OF_VIEW_Y,
            near: NEAR,
            far: FAR,
            orbit_radius: ORBIT_RADIUS,
            up: MODEL_UP,
        }
    }
}

impl TransformController {
    /// Fraction of a full orbit for touch x, in [0, 1).
    pub fn orbit_fraction(&self, x: f32, surface: SurfaceSize) -> f32 {
        let fraction = (x / surface.width).rem_euclid(1.0);
        // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
        if fraction >= 1.0 {
            0.0
        } else {
            fraction
        }
    }

    /// Camera position on the orbit circle in the YZ plane.
    pub fn camera_position(&self, fraction: f32) -> Vec3 {
        let (sin, cos) = (TAU * fraction).sin_cos();
        // Starts on +z. Negating z would start the orbit on the opposite side.
        Vec3::new(0.0, self.orbit_radius * sin, self.orbit_radius * cos)
    }

    /// Uniform model scale for touch y. Not clamped beyond the surface bounds.
    pub fn model_scale(&self, y: f32, surface: SurfaceSize) -> f32 {
        y / surface.height + 0.5
    }

    pub fn projection(&self, surface: SurfaceSize) -> Mat4 {
        // wgpu clip space: right-handed, depth in [0, 1].
        Mat4::perspective_rh(self.fov_y_rad, surface.aspect(), self.near, self.far)
    }

    pub fn compute(&self, touch: TouchSample, surface: SurfaceSize) -> Transforms {
        let eye = self.camera_position(self.orbit_fraction(touch.x, surface));
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, self.up);

        let scale = self.model_scale(touch.y, surface);
        let model = Mat4::from_scale(Vec3::splat(scale));

        Transforms {
            projection: self.projection(surface),
            view,
            model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: SurfaceSize = SurfaceSize {
        width: 1280.0,
        height: 720.0,
    };

    fn controller() -> TransformController {
        TransformController::default()
    }

    #[test]
    fn scale_spans_half_to_one_and_a_half() {
        let c = controller();
        assert_eq!(c.model_scale(0.0, SURFACE), 0.5);
        assert_eq!(c.model_scale(SURFACE.height / 2.0, SURFACE), 1.0);
        assert_eq!(c.model_scale(SURFACE.height, SURFACE), 1.5);

        let t = c.compute(TouchSample::new(0.0, SURFACE.height), SURFACE);
        assert_eq!(t.model, Mat4::from_scale(Vec3::splat(1.5)));
    }

    #[test]
    fn orbit_wraps_at_surface_width() {
        let c = controller();
        let start = c.camera_position(c.orbit_fraction(0.0, SURFACE));
        let end = c.camera_position(c.orbit_fraction(SURFACE.width, SURFACE));
        assert!(start.distance(end) < 1e-5, "{start} vs {end}");
        assert!((start - Vec3::new(0.0, 0.0, ORBIT_RADIUS)).length() < 1e-6);
    }

    #[test]
    fn orbit_fraction_stays_in_unit_interval() {
        let c = controller();
        for x in [-640.0, -0.0001, 0.0, 320.0, 1279.9, 1280.0, 2000.0] {
            let f = c.orbit_fraction(x, SURFACE);
            assert!((0.0..1.0).contains(&f), "x={x} gave {f}");
        }
        assert_eq!(c.orbit_fraction(640.0, SURFACE), 0.5);
    }

    #[test]
    fn orbit_starts_on_positive_z() {
        let eye = controller().camera_position(0.0);
        assert_eq!(eye, Vec3::new(0.0, 0.0, ORBIT_RADIUS));
    }

    #[test]
    fn quarter_turn_puts_camera_on_y_axis() {
        let c = controller();
        let eye = c.camera_position(0.25);
        assert!(eye.x.abs() < 1e-6);
        assert!((eye.y - ORBIT_RADIUS).abs() < 1e-5);
        assert!(eye.z.abs() < 1e-5);
        assert!((eye.length() - ORBIT_RADIUS).abs() < 1e-5);
    }

    #[test]
    fn compute_is_pure() {
        let c = controller();
        let touch = TouchSample::new(417.3, 211.9);
        let a = c.compute(touch, SURFACE);
        let b = c.compute(touch, SURFACE);
        assert_eq!(a.projection.to_cols_array(), b.projection.to_cols_array());
        assert_eq!(a.view.to_cols_array(), b.view.to_cols_array());
        assert_eq!(a.model.to_cols_array(), b.model.to_cols_array());
    }

    #[test]
    fn view_looks_at_origin_from_orbit() {
        let c = controller();
        let touch = TouchSample::new(SURFACE.width / 8.0, 0.0);
        let t = c.compute(touch, SURFACE);
        let eye = c.camera_position(c.orbit_fraction(touch.x, SURFACE));

        assert!(t.view.transform_point3(eye).length() < 1e-5);
        // Right-handed view space looks down -Z.
        let origin = t.view.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, -ORBIT_RADIUS)).length() < 1e-5);
        // Model up (-X) maps to view-space up.
        let up = t.view.transform_vector3(MODEL_UP);
        assert!((up - Vec3::Y).length() < 1e-5, "{up}");
    }

    #[test]
    fn projection_uses_surface_aspect() {
        let c = controller();
        let t = c.compute(TouchSample::default(), SURFACE);
        let expected = Mat4::perspective_rh(FRAC_PI_4, 1280.0 / 720.0, 0.1, 200.0);
        assert_eq!(t.projection, expected);
    }

    #[test]
    fn zero_sized_surface_is_clamped() {
        let s = SurfaceSize::new(0, 0);
        assert_eq!(s.width, 1.0);
        assert_eq!(s.height, 1.0);
        assert_eq!(s.aspect(), 1.0);
    }
}
