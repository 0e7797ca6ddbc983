//! Open-node queue ordered by the node selection rule.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SearchNode;
use crate::settings::NodeSelection;

/// Heap entry; the largest `key` is popped first.
struct Entry {
    key: f64,
    seq: u64,
    node: SearchNode,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal keys: the most recently pushed node wins
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// Open nodes of the branch-and-bound tree.
pub struct NodeQueue {
    rule: NodeSelection,
    heap: BinaryHeap<Entry>,
    pushed: u64,
}

impl NodeQueue {
    /// Empty queue using `rule`.
    pub fn new(rule: NodeSelection) -> Self {
        Self {
            rule,
            heap: BinaryHeap::new(),
            pushed: 0,
        }
    }

    /// Enqueue an open node.
    pub fn push(&mut self, node: SearchNode) {
        let key = self.key(&node);
        self.heap.push(Entry {
            key,
            seq: self.pushed,
            node,
        });
        self.pushed += 1;
    }

    /// Dequeue the next node to solve.
    pub fn pop(&mut self) -> Option<SearchNode> {
        self.heap.pop().map(|e| e.node)
    }

    /// Smallest dual bound among open nodes; `+inf` when empty.
    pub fn best_bound(&self) -> f64 {
        self.heap
            .iter()
            .map(|e| e.node.dual_bound)
            .fold(f64::INFINITY, f64::min)
    }

    /// Drop every node whose bound cannot beat `incumbent_obj`.
    ///
    /// Returns how many were dropped.
    pub fn prune_by_bound(&mut self, incumbent_obj: f64) -> usize {
        let before = self.heap.len();
        self.heap.retain(|e| !e.node.can_prune(incumbent_obj));
        before - self.heap.len()
    }

    /// No open nodes.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Open nodes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Nodes ever pushed.
    pub fn total_added(&self) -> u64 {
        self.pushed
    }

    fn key(&self, node: &SearchNode) -> f64 {
        let dive = node.depth as f64;
        let best_first = -node.dual_bound;
        match self.rule {
            NodeSelection::BestBound => best_first,
            NodeSelection::DepthFirst => dive,
            // Every dive_freq-th push is ranked by depth
            NodeSelection::Hybrid { dive_freq } => {
                if self.pushed % dive_freq.max(1) as u64 == 0 {
                    dive
                } else {
                    best_first
                }
            }
        }
    }
}
