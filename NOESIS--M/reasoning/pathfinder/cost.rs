use std::f64::consts::PI;

use noesis_graph::{Lookup, LookupError, Neighbor, NodeId, Position, ELO_CEILING};

/// Lower clamp on normalized confidence so no edge is free or infinite.
pub const MIN_NORMALIZED_CONFIDENCE: f64 = 0.001;
/// Observation counts saturate here.
pub const MAX_OBSERVATIONS: u64 = 10_000;

/// Traversal cost of an edge: `1 / (conf_norm * ln(1 + obs))`.
#[must_use]
pub fn edge_cost(edge: &Neighbor) -> f64 {
    let confidence = (edge.confidence / ELO_CEILING).clamp(MIN_NORMALIZED_CONFIDENCE, 1.0);
    let observations = edge.observations.clamp(1, MAX_OBSERVATIONS) as f64;
    1.0 / (confidence * observations.ln_1p())
}

/// Cheapest possible edge: full confidence at saturated observations.
#[must_use]
pub fn cost_floor() -> f64 {
    1.0 / (MAX_OBSERVATIONS as f64).ln_1p()
}

/// Geodesic distance to the nearest goal, in cost units.
///
/// Scaled by `cost_floor() / PI` the estimate never exceeds one edge, so it
/// stays admissible and consistent on any graph. If some goal has no
/// position the estimate is zero everywhere.
#[derive(Debug, Clone)]
pub struct GoalHeuristic {
    goals: Vec<Position>,
    scale: f64,
}

impl GoalHeuristic {
    /// Resolves goal positions through `lookup`.
    pub fn new(lookup: &dyn Lookup, goals: &[NodeId]) -> Result<Self, LookupError> {
        let mut positions = Vec::with_capacity(goals.len());
        for &goal in goals {
            match lookup.lookup_position(goal)? {
                Some(position) => positions.push(position),
                None => {
                    positions.clear();
                    break;
                }
            }
        }
        Ok(Self {
            goals: positions,
            scale: cost_floor() / PI,
        })
    }

    /// Unweighted estimate for a node at `position`.
    #[must_use]
    pub fn estimate(&self, position: Option<&Position>) -> f64 {
        let Some(position) = position else {
            return 0.0;
        };
        self.goals
            .iter()
            .map(|goal| position.geodesic(goal))
            .min_by(f64::total_cmp)
            .map_or(0.0, |angle| angle * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noesis_graph::MemoryGraph;

    #[test]
    fn cost_rewards_confidence_and_evidence() {
        let id = NodeId::from_raw(7);
        let strong = edge_cost(&Neighbor::new(id, 2900.0, 400));
        let weak = edge_cost(&Neighbor::new(id, 300.0, 2));
        assert!(strong < weak);
        assert!(edge_cost(&Neighbor::new(id, 0.0, 0)).is_finite());
        let best = edge_cost(&Neighbor::new(id, 9000.0, 1_000_000));
        assert!((best - cost_floor()).abs() < 1e-12);
    }

    #[test]
    fn estimate_never_exceeds_cost_floor() {
        let mut graph = MemoryGraph::new();
        let goal = graph.insert_node("north", Position::from_angles(0.0, 0.0, 0.0));
        let heuristic = GoalHeuristic::new(&graph, &[goal]).unwrap();
        let antipode = Position::new([-1.0, 0.0, 0.0, 0.0]).unwrap();
        let own = graph.node(goal).map(|node| node.position).unwrap();
        assert!(heuristic.estimate(Some(&antipode)) <= cost_floor() + 1e-12);
        assert!(heuristic.estimate(Some(&own)) < 1e-6);
        assert!(heuristic.estimate(None).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_goal_position_disables_estimate() {
        let mut graph = MemoryGraph::new();
        let known = graph.insert_node("known", Position::from_angles(0.4, 0.2, 0.1));
        let heuristic = GoalHeuristic::new(&graph, &[known, NodeId::from_raw(99)]).unwrap();
        let elsewhere = Position::from_angles(2.0, 1.0, 0.5);
        assert!(heuristic.estimate(Some(&elsewhere)).abs() < f64::EPSILON);
    }
}
