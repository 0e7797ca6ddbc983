//! Branch-and-bound search tree management.

mod branching;
mod node;
mod queue;
mod tree;

pub use branching::{BranchDecision, BranchingSelector};
pub use node::{BoundChange, BranchDirection, BranchRecord, SearchNode};
pub use queue::NodeQueue;
pub use tree::BranchAndBound;
