//! Orbit camera with drag inertia and clamped dolly zoom.
//!
//! The camera orbits the showcase pedestal at the origin. Pointer drags feed
//! a short velocity history so releasing a drag keeps the view coasting with
//! exponential damping, and the zoom controls dolly the camera along its view
//! ray inside a fixed distance band.

use std::collections::VecDeque;

/// Closest the camera may dolly toward the model.
pub const MIN_DISTANCE: f64 = 1.0;

/// Farthest the camera may dolly away from the model.
pub const MAX_DISTANCE: f64 = 10.0;

/// Starting camera distance.
pub const DEFAULT_DISTANCE: f64 = 5.0;

/// Distance change per zoom command.
pub const ZOOM_SPEED: f64 = 0.05;

/// Vertical field of view.
pub const FOV_Y_RAD: f64 = std::f64::consts::FRAC_PI_4;

const NEAR_PLANE: f64 = 0.1;
const FAR_PLANE: f64 = 1000.0;

/// Radians of orbit per pixel of drag.
const DRAG_SPEED: f64 = 0.005;

/// Keep the camera short of the poles so the view never flips.
const PITCH_LIMIT: f64 = 1.55;

/// Angular velocity decay rate (per second) after a drag is released.
const ANGULAR_DAMPING: f64 = 4.0;

/// Angular speed below which coasting stops.
const ANGULAR_VELOCITY_THRESHOLD: f64 = 0.001;

/// Samples kept for release-velocity estimation.
const VELOCITY_HISTORY_SIZE: usize = 5;

#[derive(Debug, Clone, Copy)]
struct VelocitySample {
    d_yaw: f64,
    d_pitch: f64,
    dt: f64,
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    yaw_rad: f64,
    pitch_rad: f64,
    distance: f64,

    dragging: bool,
    last_pos_px: [f64; 2],
    last_sample_time_s: f64,
    velocity_history: VecDeque<VelocitySample>,

    /// Coasting velocity in rad/s, applied after release until damped out.
    angular_velocity: [f64; 2],
    inertia_active: bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw_rad: 0.0,
            pitch_rad: 0.0,
            distance: DEFAULT_DISTANCE,
            dragging: false,
            last_pos_px: [0.0, 0.0],
            last_sample_time_s: 0.0,
            velocity_history: VecDeque::with_capacity(VELOCITY_HISTORY_SIZE),
            angular_velocity: [0.0, 0.0],
            inertia_active: false,
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn yaw_rad(&self) -> f64 {
        self.yaw_rad
    }

    pub fn pitch_rad(&self) -> f64 {
        self.pitch_rad
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_inertia_active(&self) -> bool {
        self.inertia_active
    }

    /// Begin a drag. `now_s` is the caller's clock in seconds.
    pub fn on_pointer_down(&mut self, pos_px: [f64; 2], now_s: f64) {
        self.inertia_active = false;
        self.angular_velocity = [0.0, 0.0];
        self.velocity_history.clear();

        self.dragging = true;
        self.last_pos_px = pos_px;
        self.last_sample_time_s = now_s;
    }

    pub fn on_pointer_move(&mut self, pos_px: [f64; 2], now_s: f64) {
        if !self.dragging {
            return;
        }

        let dt = (now_s - self.last_sample_time_s).max(1e-6);
        self.last_sample_time_s = now_s;

        let dx = pos_px[0] - self.last_pos_px[0];
        let dy = pos_px[1] - self.last_pos_px[1];
        self.last_pos_px = pos_px;

        let d_yaw = -dx * DRAG_SPEED;
        let d_pitch = dy * DRAG_SPEED;
        self.apply_orbit(d_yaw, d_pitch);

        self.velocity_history.push_back(VelocitySample { d_yaw, d_pitch, dt });
        if self.velocity_history.len() > VELOCITY_HISTORY_SIZE {
            self.velocity_history.pop_front();
        }
    }

    pub fn on_pointer_up(&mut self) {
        if !self.dragging {
            return;
        }

        self.angular_velocity = self.estimate_release_velocity();
        let speed = self.angular_velocity[0].hypot(self.angular_velocity[1]);
        self.inertia_active = speed > ANGULAR_VELOCITY_THRESHOLD;

        self.dragging = false;
        self.velocity_history.clear();
    }

    /// Dolly by one zoom command. `direction` < 0 zooms in, > 0 zooms out.
    /// The resulting distance never leaves `[MIN_DISTANCE, MAX_DISTANCE]`.
    pub fn zoom_step(&mut self, direction: f64) {
        let step = ZOOM_SPEED * direction.signum();
        self.distance = (self.distance + step).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Advance coasting by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let dt = dt.clamp(0.0, 0.1);

        if self.inertia_active && !self.dragging {
            let [vy, vp] = self.angular_velocity;
            self.apply_orbit(vy * dt, vp * dt);

            let decay = (-ANGULAR_DAMPING * dt).exp();
            self.angular_velocity = [vy * decay, vp * decay];

            let speed = self.angular_velocity[0].hypot(self.angular_velocity[1]);
            if speed < ANGULAR_VELOCITY_THRESHOLD {
                self.inertia_active = false;
                self.angular_velocity = [0.0, 0.0];
            }
        }
    }

    /// Camera position in world coordinates.
    pub fn eye_position(&self) -> [f64; 3] {
        let cp = self.pitch_rad.cos();
        [
            self.distance * cp * self.yaw_rad.sin(),
            self.distance * self.pitch_rad.sin(),
            self.distance * cp * self.yaw_rad.cos(),
        ]
    }

    /// View matrix looking at the origin, column-major (WGSL layout).
    pub fn view_matrix(&self) -> [[f32; 4]; 4] {
        mat4_look_at_rh(self.eye_position(), [0.0, 0.0, 0.0], [0.0, 1.0, 0.0])
    }

    /// Combined projection * view matrix for the given aspect ratio.
    pub fn view_proj_matrix(&self, aspect: f64) -> [[f32; 4]; 4] {
        let aspect = aspect.max(1e-6);
        let proj = mat4_perspective_rh_z0(FOV_Y_RAD, aspect, NEAR_PLANE, FAR_PLANE);
        mat4_mul(proj, self.view_matrix())
    }

    fn apply_orbit(&mut self, d_yaw: f64, d_pitch: f64) {
        self.yaw_rad += d_yaw;
        self.pitch_rad = (self.pitch_rad + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    fn estimate_release_velocity(&self) -> [f64; 2] {
        let mut total_dt = 0.0;
        let mut total_yaw = 0.0;
        let mut total_pitch = 0.0;
        for sample in &self.velocity_history {
            total_dt += sample.dt;
            total_yaw += sample.d_yaw;
            total_pitch += sample.d_pitch;
        }
        if total_dt <= 0.0 {
            return [0.0, 0.0];
        }
        [total_yaw / total_dt, total_pitch / total_dt]
    }
}

// ============================================================================
// Matrix utilities
// ============================================================================

pub fn mat4_mul(a: [[f32; 4]; 4], b: [[f32; 4]; 4]) -> [[f32; 4]; 4] {
    // Column-major multiply: c = a * b.
    let mut c = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            c[col][row] = a[0][row] * b[col][0]
                + a[1][row] * b[col][1]
                + a[2][row] * b[col][2]
                + a[3][row] * b[col][3];
        }
    }
    c
}

fn mat4_perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> [[f32; 4]; 4] {
    let f = 1.0 / (0.5 * fov_y_rad).tan();
    let m00 = (f / aspect) as f32;
    let m11 = f as f32;
    let m22 = (far / (near - far)) as f32;
    let m23 = ((near * far) / (near - far)) as f32;

    // Column-major RH perspective, depth range [0, 1].
    [
        [m00, 0.0, 0.0, 0.0],
        [0.0, m11, 0.0, 0.0],
        [0.0, 0.0, m22, -1.0],
        [0.0, 0.0, m23, 0.0],
    ]
}

fn mat4_look_at_rh(eye: [f64; 3], target: [f64; 3], up: [f64; 3]) -> [[f32; 4]; 4] {
    let f = vec3_normalize(vec3_sub(target, eye));
    let s = vec3_normalize(vec3_cross(f, up));
    let u = vec3_cross(s, f);

    let ex = -vec3_dot(s, eye);
    let ey = -vec3_dot(u, eye);
    let ez = vec3_dot(f, eye);

    [
        [s[0] as f32, u[0] as f32, (-f[0]) as f32, 0.0],
        [s[1] as f32, u[1] as f32, (-f[1]) as f32, 0.0],
        [s[2] as f32, u[2] as f32, (-f[2]) as f32, 0.0],
        [ex as f32, ey as f32, ez as f32, 1.0],
    ]
}

fn vec3_sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn vec3_dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn vec3_cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn vec3_normalize(a: [f64; 3]) -> [f64; 3] {
    let n = vec3_dot(a, a).sqrt();
    if n > 1e-10 {
        [a[0] / n, a[1] / n, a[2] / n]
    } else {
        [0.0, 0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_sits_on_positive_z() {
        let cam = OrbitCamera::new();
        let eye = cam.eye_position();
        assert!((eye[0]).abs() < 1e-12);
        assert!((eye[1]).abs() < 1e-12);
        assert!((eye[2] - DEFAULT_DISTANCE).abs() < 1e-12);
    }

    #[test]
    fn zoom_in_clamps_at_near_bound() {
        let mut cam = OrbitCamera::new();
        for _ in 0..10_000 {
            cam.zoom_step(-1.0);
        }
        assert_eq!(cam.distance(), MIN_DISTANCE);
    }

    #[test]
    fn zoom_out_clamps_at_far_bound() {
        let mut cam = OrbitCamera::new();
        for _ in 0..10_000 {
            cam.zoom_step(1.0);
        }
        assert_eq!(cam.distance(), MAX_DISTANCE);
    }

    #[test]
    fn drag_orbits_and_clamps_pitch() {
        let mut cam = OrbitCamera::new();
        cam.on_pointer_down([100.0, 100.0], 0.0);
        cam.on_pointer_move([120.0, 100.0], 0.016);
        assert!(cam.yaw_rad() < 0.0);

        // A huge vertical drag must stop short of the pole.
        cam.on_pointer_move([120.0, 100_000.0], 0.032);
        assert!(cam.pitch_rad() <= 1.55);
    }

    #[test]
    fn release_coasts_then_damps_to_rest() {
        let mut cam = OrbitCamera::new();
        cam.on_pointer_down([0.0, 0.0], 0.0);
        for i in 1..=5 {
            cam.on_pointer_move([i as f64 * 20.0, 0.0], i as f64 * 0.016);
        }
        cam.on_pointer_up();
        assert!(cam.is_inertia_active());

        let yaw_at_release = cam.yaw_rad();
        cam.update(0.016);
        assert!(cam.yaw_rad() != yaw_at_release);

        // A few seconds of damping brings the camera to rest.
        for _ in 0..600 {
            cam.update(0.016);
        }
        assert!(!cam.is_inertia_active());

        let settled = cam.yaw_rad();
        cam.update(0.016);
        assert_eq!(cam.yaw_rad(), settled);
    }

    #[test]
    fn pointer_down_cancels_inertia() {
        let mut cam = OrbitCamera::new();
        cam.on_pointer_down([0.0, 0.0], 0.0);
        for i in 1..=5 {
            cam.on_pointer_move([i as f64 * 30.0, 0.0], i as f64 * 0.016);
        }
        cam.on_pointer_up();
        assert!(cam.is_inertia_active());

        cam.on_pointer_down([0.0, 0.0], 1.0);
        assert!(!cam.is_inertia_active());
    }

    #[test]
    fn view_proj_is_finite() {
        let cam = OrbitCamera::new();
        let m = cam.view_proj_matrix(16.0 / 9.0);
        for col in m {
            for v in col {
                assert!(v.is_finite());
            }
        }
    }
}
