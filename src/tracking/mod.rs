pub mod advect;
pub mod comm;
pub mod inverse_map;
pub mod locator;
pub mod marker;
pub mod walker;

pub use advect::ButcherTableau;
pub use comm::{Communicator, SerialComm, ThreadComm};
pub use inverse_map::{forward_map, inverse_map, inverse_map_surface3, InverseMapOutcome};
pub use locator::{locate, serial_fallback, LocateOutcome, Located};
pub use marker::{Marker, MarkerSet, MarkerStatus, MaterialState};
pub use walker::{fast_forward, next_element_2d, next_element_3d, WalkStep};
