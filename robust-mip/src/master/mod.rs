//! Master problem (LP relaxation) management.

mod backend;
mod lp_backend;

pub use backend::{CutSource, LinearCut, MasterBackend, MasterResult, MasterStatus};
pub use lp_backend::MicroLpBackend;
