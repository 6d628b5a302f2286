pub mod camera;
pub mod interaction;
pub mod lighting;
pub mod showcase;

pub use camera::OrbitCamera;
pub use interaction::InteractionState;
pub use lighting::LightRig;
pub use showcase::{LoadOutcome, LoadTicket, ModelState, Placement, Showcase};
