//! Lazy cut storage.

mod pool;

pub use pool::{CutPool, CutPoolStats, PooledCut};
