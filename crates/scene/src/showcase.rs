//! Active-model state machine.
//!
//! Exactly one model is resident at a time. Starting a load discards the
//! previous model immediately; a finished load only applies if no newer load
//! has started since (each attempt carries a generation number, and stale
//! completions are dropped on the floor).

use catalog::PhoneRecord;

use crate::camera::mat4_mul;

/// Model yaw change per manual rotate command.
pub const ROTATION_SPEED: f64 = 0.02;

/// Model yaw change per auto-rotation frame.
pub const AUTO_ROTATION_SPEED: f64 = 0.005;

/// Lifecycle of the single displayed model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Empty,
    Loading,
    Loaded,
    PlaceholderActive,
}

/// Scale/position/rotation applied to the model, from its catalog record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f64,
    pub position: [f64; 3],
    pub rotation: [f64; 3],
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: [0.0; 3],
            rotation: [0.0; 3],
        }
    }
}

impl Placement {
    pub fn from_record(record: &PhoneRecord) -> Self {
        Self {
            scale: record.scale,
            position: record.position.to_array(),
            rotation: record.rotation.to_array(),
        }
    }
}

/// Handle for one load attempt. Redeeming a ticket after a newer load has
/// started yields [`LoadOutcome::Stale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Stale,
}

#[derive(Debug)]
pub struct Showcase {
    state: ModelState,
    placement: Placement,
    /// Turntable spin on top of the placement rotation, radians about +Y.
    spin_rad: f64,
    generation: u64,
}

impl Default for Showcase {
    fn default() -> Self {
        Self {
            state: ModelState::Empty,
            placement: Placement::default(),
            spin_rad: 0.0,
            generation: 0,
        }
    }
}

impl Showcase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn spin_rad(&self) -> f64 {
        self.spin_rad
    }

    pub fn has_model(&self) -> bool {
        matches!(self.state, ModelState::Loaded | ModelState::PlaceholderActive)
    }

    /// Start a new load. The previous model is gone as of this call.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = ModelState::Loading;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Apply a successful load, unless a newer load superseded it.
    pub fn finish_load(&mut self, ticket: LoadTicket, placement: Placement) -> LoadOutcome {
        if ticket.generation != self.generation {
            return LoadOutcome::Stale;
        }
        self.state = ModelState::Loaded;
        self.placement = placement;
        self.spin_rad = 0.0;
        LoadOutcome::Applied
    }

    /// Record a failed load: the placeholder takes over, unless a newer load
    /// superseded the attempt.
    pub fn fail_load(&mut self, ticket: LoadTicket) -> LoadOutcome {
        if ticket.generation != self.generation {
            return LoadOutcome::Stale;
        }
        self.state = ModelState::PlaceholderActive;
        self.placement = Placement::default();
        self.spin_rad = 0.0;
        LoadOutcome::Applied
    }

    /// Install the placeholder directly, superseding any load in flight.
    pub fn install_placeholder(&mut self) {
        self.generation += 1;
        self.state = ModelState::PlaceholderActive;
        self.placement = Placement::default();
        self.spin_rad = 0.0;
    }

    /// Manual spin. `direction` < 0 turns left, > 0 turns right.
    /// No-op while no model is resident.
    pub fn rotate(&mut self, direction: f64) {
        if self.has_model() {
            self.spin_rad += ROTATION_SPEED * direction.signum();
        }
    }

    /// One frame of auto-rotation.
    pub fn auto_rotate(&mut self) {
        if self.has_model() {
            self.spin_rad += AUTO_ROTATION_SPEED;
        }
    }

    /// Model matrix: translate * rotate (X, then Y plus spin, then Z) * scale,
    /// column-major.
    pub fn model_matrix(&self) -> [[f32; 4]; 4] {
        let p = self.placement;
        let [rx, ry, rz] = p.rotation;

        let m = mat4_mul(mat4_rotation_x(rx), mat4_rotation_y(ry + self.spin_rad));
        let m = mat4_mul(m, mat4_rotation_z(rz));
        let m = mat4_mul(m, mat4_scale(p.scale));
        mat4_mul(mat4_translation(p.position), m)
    }
}

fn mat4_scale(s: f64) -> [[f32; 4]; 4] {
    let s = s as f32;
    [
        [s, 0.0, 0.0, 0.0],
        [0.0, s, 0.0, 0.0],
        [0.0, 0.0, s, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

fn mat4_translation(t: [f64; 3]) -> [[f32; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [t[0] as f32, t[1] as f32, t[2] as f32, 1.0],
    ]
}

fn mat4_rotation_x(rad: f64) -> [[f32; 4]; 4] {
    let (s, c) = (rad.sin() as f32, rad.cos() as f32);
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, c, s, 0.0],
        [0.0, -s, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

fn mat4_rotation_y(rad: f64) -> [[f32; 4]; 4] {
    let (s, c) = (rad.sin() as f32, rad.cos() as f32);
    [
        [c, 0.0, -s, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

fn mat4_rotation_z(rad: f64) -> [[f32; 4]; 4] {
    let (s, c) = (rad.sin() as f32, rad.cos() as f32);
    [
        [c, s, 0.0, 0.0],
        [-s, c, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(scale: f64) -> Placement {
        Placement {
            scale,
            position: [0.0, -0.5, 0.0],
            rotation: [0.0, 0.3, 0.0],
        }
    }

    #[test]
    fn load_lifecycle() {
        let mut sc = Showcase::new();
        assert_eq!(sc.state(), ModelState::Empty);

        let ticket = sc.begin_load();
        assert_eq!(sc.state(), ModelState::Loading);
        assert!(!sc.has_model());

        assert_eq!(sc.finish_load(ticket, placement(2.0)), LoadOutcome::Applied);
        assert_eq!(sc.state(), ModelState::Loaded);
        assert_eq!(sc.placement().scale, 2.0);
    }

    #[test]
    fn failed_load_activates_placeholder() {
        let mut sc = Showcase::new();
        let ticket = sc.begin_load();
        assert_eq!(sc.fail_load(ticket), LoadOutcome::Applied);
        assert_eq!(sc.state(), ModelState::PlaceholderActive);
        assert!(sc.has_model());
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut sc = Showcase::new();
        let old = sc.begin_load();
        let new = sc.begin_load();

        // The slow first load resolving late must not clobber the newer one.
        assert_eq!(sc.finish_load(old, placement(9.0)), LoadOutcome::Stale);
        assert_eq!(sc.state(), ModelState::Loading);

        assert_eq!(sc.finish_load(new, placement(1.0)), LoadOutcome::Applied);
        assert_eq!(sc.placement().scale, 1.0);

        // Same for a stale failure: no placeholder over a loaded model.
        assert_eq!(sc.fail_load(old), LoadOutcome::Stale);
        assert_eq!(sc.state(), ModelState::Loaded);
    }

    #[test]
    fn placeholder_supersedes_pending_load() {
        let mut sc = Showcase::new();
        let ticket = sc.begin_load();
        sc.install_placeholder();
        assert_eq!(sc.state(), ModelState::PlaceholderActive);
        assert_eq!(sc.finish_load(ticket, placement(1.0)), LoadOutcome::Stale);
        assert_eq!(sc.state(), ModelState::PlaceholderActive);
    }

    #[test]
    fn rotate_is_noop_without_model() {
        let mut sc = Showcase::new();
        sc.rotate(1.0);
        sc.auto_rotate();
        assert_eq!(sc.spin_rad(), 0.0);

        sc.begin_load();
        sc.rotate(-1.0);
        assert_eq!(sc.spin_rad(), 0.0);
    }

    #[test]
    fn spin_steps_by_fixed_increments() {
        let mut sc = Showcase::new();
        let ticket = sc.begin_load();
        sc.finish_load(ticket, Placement::default());

        sc.rotate(-1.0);
        assert!((sc.spin_rad() + ROTATION_SPEED).abs() < 1e-12);
        sc.rotate(1.0);
        assert!(sc.spin_rad().abs() < 1e-12);

        sc.auto_rotate();
        assert!((sc.spin_rad() - AUTO_ROTATION_SPEED).abs() < 1e-12);
    }

    #[test]
    fn new_load_resets_spin() {
        let mut sc = Showcase::new();
        let ticket = sc.begin_load();
        sc.finish_load(ticket, Placement::default());
        sc.rotate(1.0);
        assert!(sc.spin_rad() != 0.0);

        let ticket = sc.begin_load();
        sc.finish_load(ticket, Placement::default());
        assert_eq!(sc.spin_rad(), 0.0);
    }

    #[test]
    fn model_matrix_applies_scale_and_translation() {
        let mut sc = Showcase::new();
        let ticket = sc.begin_load();
        sc.finish_load(
            ticket,
            Placement {
                scale: 2.0,
                position: [1.0, 2.0, 3.0],
                rotation: [0.0, 0.0, 0.0],
            },
        );
        let m = sc.model_matrix();
        assert_eq!(m[0][0], 2.0);
        assert_eq!(m[1][1], 2.0);
        assert_eq!(m[3][0], 1.0);
        assert_eq!(m[3][1], 2.0);
        assert_eq!(m[3][2], 3.0);
    }
}
