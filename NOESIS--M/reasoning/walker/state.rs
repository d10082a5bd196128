use std::collections::{HashMap, VecDeque};

use noesis_graph::{NodeId, Position};
use serde::{Deserialize, Serialize};

/// Mutable state of one walk. Owned by the caller, never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkState {
    /// Node the walk is on.
    pub current: NodeId,
    /// Position of `current`, if known.
    pub current_position: Option<Position>,
    /// Position before the last step.
    pub previous_position: Option<Position>,
    /// Remaining energy in `[0, 1]`.
    pub energy: f64,
    /// Visited nodes in order, start included.
    pub trajectory: Vec<NodeId>,
    /// Visit counts per node.
    pub visits: HashMap<NodeId, u32>,
    /// Most recent nodes, oldest first.
    pub recent: VecDeque<NodeId>,
    /// Node the walk is attracted to.
    pub goal: Option<NodeId>,
    /// Position of `goal`, if known.
    pub goal_position: Option<Position>,
    /// Steps taken.
    pub steps: usize,
    /// Normalized confidence of every traversed edge.
    pub edge_confidences: Vec<f64>,
}

impl WalkState {
    /// Fresh state at `start`.
    #[must_use]
    pub fn new(start: NodeId, position: Option<Position>, energy: f64) -> Self {
        Self {
            current: start,
            current_position: position,
            previous_position: None,
            energy: energy.clamp(0.0, 1.0),
            trajectory: vec![start],
            visits: HashMap::from([(start, 1)]),
            recent: VecDeque::from([start]),
            goal: None,
            goal_position: None,
            steps: 0,
            edge_confidences: Vec::new(),
        }
    }

    /// Moves to `node`, spending `decay` energy. Energy never goes negative.
    pub fn advance(
        &mut self,
        node: NodeId,
        position: Option<Position>,
        confidence: f64,
        decay: f64,
        window: usize,
    ) {
        self.previous_position = self.current_position;
        self.current_position = position;
        self.current = node;
        self.energy = (self.energy - decay.max(0.0)).max(0.0);
        self.trajectory.push(node);
        *self.visits.entry(node).or_insert(0) += 1;
        self.recent.push_back(node);
        while self.recent.len() > window {
            self.recent.pop_front();
        }
        self.steps += 1;
        self.edge_confidences.push(confidence);
    }

    /// Times `node` has been visited.
    #[must_use]
    pub fn visits_of(&self, node: NodeId) -> u32 {
        self.visits.get(&node).copied().unwrap_or(0)
    }

    /// Geodesic distance from the current node to the goal, when both
    /// positions are known.
    #[must_use]
    pub fn distance_to_goal(&self) -> Option<f64> {
        match (&self.current_position, &self.goal_position) {
            (Some(current), Some(goal)) => Some(current.geodesic(goal)),
            _ => None,
        }
    }

    /// Mean normalized confidence of the traversed edges; zero before the
    /// first step.
    #[must_use]
    pub fn mean_confidence(&self) -> f64 {
        if self.edge_confidences.is_empty() {
            0.0
        } else {
            self.edge_confidences.iter().sum::<f64>() / self.edge_confidences.len() as f64
        }
    }
}
