//! Hold-button flags and the per-frame control rule.
//!
//! Five booleans drive everything: four hold-buttons and the auto-rotation
//! toggle. Manual intent always wins: the frame rule clears auto-rotation
//! before any manual rotate or zoom command is applied, and a camera drag
//! clears it too.

use crate::camera::OrbitCamera;
use crate::showcase::Showcase;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InteractionState {
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
    pub auto_rotating: bool,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_auto_rotation(&mut self) {
        self.auto_rotating = true;
    }

    pub fn stop_auto_rotation(&mut self) {
        self.auto_rotating = false;
    }

    pub fn toggle_auto_rotation(&mut self) {
        self.auto_rotating = !self.auto_rotating;
    }

    /// Called when the user grabs the camera; manual intent cancels the tour.
    pub fn on_drag_start(&mut self) {
        self.auto_rotating = false;
    }

    fn any_manual_held(&self) -> bool {
        self.rotate_left || self.rotate_right || self.zoom_in || self.zoom_out
    }

    /// One animation-loop step.
    ///
    /// Flags are checked in fixed order (rotate-left, rotate-right, zoom-in,
    /// zoom-out, auto-rotate) and collapsed to at most one rotate and one
    /// zoom command per frame; with opposing directions somehow both held,
    /// the later flag wins. Auto-rotation only advances when it survived the
    /// suppression check this same frame.
    pub fn advance_frame(&mut self, showcase: &mut Showcase, camera: &mut OrbitCamera) {
        if self.any_manual_held() {
            self.auto_rotating = false;
        }

        let mut rotate = None;
        if self.rotate_left {
            rotate = Some(-1.0);
        }
        if self.rotate_right {
            rotate = Some(1.0);
        }

        let mut zoom = None;
        if self.zoom_in {
            zoom = Some(-1.0);
        }
        if self.zoom_out {
            zoom = Some(1.0);
        }

        if let Some(direction) = rotate {
            showcase.rotate(direction);
        }
        if let Some(direction) = zoom {
            camera.zoom_step(direction);
        }

        if self.auto_rotating {
            showcase.auto_rotate();
        }
    }
}
