pub mod basis;
pub mod field;

pub use basis::BasisEval;
pub use field::{interpolate, NodalField, Solution};
