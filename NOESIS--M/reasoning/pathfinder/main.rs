//! Goal-directed best-first search over the knowledge graph.

/// Layered beam variant.
pub mod beam;
/// Edge costs and the goal heuristic.
pub mod cost;
/// Open-set ordering.
pub mod frontier;

use std::{
    collections::{BinaryHeap, HashMap, HashSet},
    sync::Arc,
};

use noesis_graph::{Lookup, Neighbor, NodeId, ELO_CEILING};
use serde::{Deserialize, Serialize};

use crate::error::ReasoningError;
use cost::{edge_cost, GoalHeuristic};
use frontier::FrontierEntry;

/// Per-call search options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Weight `w` in `f = g + w·h`; above 1 trades optimality for speed.
    pub heuristic_weight: f64,
    /// Expansion bound; hitting it reports `found = false`.
    pub max_expansions: usize,
    /// Zero for exact A*, otherwise the layer width of beam search.
    pub beam_width: usize,
    /// Edges rated below this are invisible.
    pub min_elo: f64,
    /// Edges observed fewer times are invisible.
    pub min_observations: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            heuristic_weight: 1.0,
            max_expansions: 10_000,
            beam_width: 0,
            min_elo: 0.0,
            min_observations: 0,
        }
    }
}

/// Search outcome. A miss is `found = false`, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Nodes from start to goal.
    pub nodes: Vec<NodeId>,
    /// Sum of edge costs.
    pub total_cost: f64,
    /// Mean raw confidence rating of the traversed edges.
    pub mean_confidence: f64,
    /// Mean observation count of the traversed edges.
    pub mean_observations: f64,
    /// Whether a goal was reached.
    pub found: bool,
    /// Nodes expanded, reported for diagnostics.
    pub nodes_expanded: usize,
}

impl Path {
    /// Empty miss.
    #[must_use]
    pub const fn not_found(nodes_expanded: usize) -> Self {
        Self {
            nodes: Vec::new(),
            total_cost: 0.0,
            mean_confidence: 0.0,
            mean_observations: 0.0,
            found: false,
            nodes_expanded,
        }
    }

    /// Zero-cost single-node path.
    #[must_use]
    pub fn trivial(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            total_cost: 0.0,
            mean_confidence: 0.0,
            mean_observations: 0.0,
            found: true,
            nodes_expanded: 0,
        }
    }

    /// Number of traversed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// Mean confidence on `[0, 1]`; a found path without edges is certain.
    #[must_use]
    pub fn normalized_confidence(&self) -> f64 {
        if !self.found {
            0.0
        } else if self.edge_count() == 0 {
            1.0
        } else {
            (self.mean_confidence / ELO_CEILING).clamp(0.0, 1.0)
        }
    }
}

/// Capability: find paths between nodes.
pub trait PathFinder: Send + Sync {
    /// Path from `start` to any node in `goals`.
    fn search_any(
        &self,
        start: NodeId,
        goals: &[NodeId],
        config: &SearchConfig,
    ) -> Result<Path, ReasoningError>;

    /// Path between two texts; a miss when either cannot be resolved.
    fn search_text(
        &self,
        start: &str,
        goal: &str,
        config: &SearchConfig,
    ) -> Result<Path, ReasoningError>;

    /// Path from `start` to `goal`.
    fn search(
        &self,
        start: NodeId,
        goal: NodeId,
        config: &SearchConfig,
    ) -> Result<Path, ReasoningError> {
        self.search_any(start, &[goal], config)
    }
}

/// Parent pointers: node to (predecessor, edge used).
type Parents = HashMap<NodeId, (NodeId, Neighbor)>;

/// Walks parent pointers back from `goal` and summarizes the edges.
fn reconstruct(start: NodeId, goal: NodeId, parents: &Parents, nodes_expanded: usize) -> Path {
    let mut nodes = vec![goal];
    let mut edges = Vec::new();
    let mut cursor = goal;
    while cursor != start {
        let Some(&(previous, edge)) = parents.get(&cursor) else {
            break;
        };
        edges.push(edge);
        nodes.push(previous);
        cursor = previous;
    }
    nodes.reverse();
    edges.reverse();
    if edges.is_empty() {
        return Path {
            nodes_expanded,
            ..Path::trivial(start)
        };
    }
    let count = edges.len() as f64;
    Path {
        nodes,
        total_cost: edges.iter().map(edge_cost).sum(),
        mean_confidence: edges.iter().map(|edge| edge.confidence).sum::<f64>() / count,
        mean_observations: edges.iter().map(|edge| edge.observations as f64).sum::<f64>() / count,
        found: true,
        nodes_expanded,
    }
}

/// A* over a [`Lookup`], with weighted and beam variants.
pub struct AStarPathFinder {
    lookup: Arc<dyn Lookup>,
}

impl AStarPathFinder {
    /// Creates a pathfinder over `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<dyn Lookup>) -> Self {
        Self { lookup }
    }

    fn estimate(&self, heuristic: &GoalHeuristic, node: NodeId) -> Result<f64, ReasoningError> {
        let position = self.lookup.lookup_position(node)?;
        Ok(heuristic.estimate(position.as_ref()))
    }

    fn visible_edges(
        &self,
        node: NodeId,
        config: &SearchConfig,
    ) -> Result<Vec<Neighbor>, ReasoningError> {
        Ok(self
            .lookup
            .get_neighbors(node, config.min_elo, config.min_observations)?
            .into_iter()
            .filter(|edge| edge.id != node)
            .collect())
    }

    fn astar(
        &self,
        start: NodeId,
        goals: &HashSet<NodeId>,
        heuristic: &GoalHeuristic,
        config: &SearchConfig,
    ) -> Result<Path, ReasoningError> {
        let weight = config.heuristic_weight;
        let mut open = BinaryHeap::new();
        let mut best_g: HashMap<NodeId, f64> = HashMap::from([(start, 0.0)]);
        let mut parents = Parents::new();
        let mut closed = HashSet::new();
        let mut seq = 0_u64;
        open.push(FrontierEntry {
            f: weight * self.estimate(heuristic, start)?,
            g: 0.0,
            node: start,
            seq,
        });

        let mut expanded = 0;
        while let Some(entry) = open.pop() {
            if closed.contains(&entry.node) {
                continue;
            }
            if goals.contains(&entry.node) {
                return Ok(reconstruct(start, entry.node, &parents, expanded));
            }
            if expanded >= config.max_expansions {
                tracing::debug!(
                    expanded,
                    frontier = open.len(),
                    "search stopped at expansion limit"
                );
                return Ok(Path::not_found(expanded));
            }
            closed.insert(entry.node);
            expanded += 1;

            for edge in self.visible_edges(entry.node, config)? {
                if closed.contains(&edge.id) {
                    continue;
                }
                let g = entry.g + edge_cost(&edge);
                if best_g.get(&edge.id).is_some_and(|&known| known <= g) {
                    continue;
                }
                best_g.insert(edge.id, g);
                parents.insert(edge.id, (entry.node, edge));
                seq += 1;
                open.push(FrontierEntry {
                    f: weight.mul_add(self.estimate(heuristic, edge.id)?, g),
                    g,
                    node: edge.id,
                    seq,
                });
            }
        }
        Ok(Path::not_found(expanded))
    }
}

impl PathFinder for AStarPathFinder {
    fn search_any(
        &self,
        start: NodeId,
        goals: &[NodeId],
        config: &SearchConfig,
    ) -> Result<Path, ReasoningError> {
        if goals.contains(&start) {
            return Ok(Path::trivial(start));
        }
        if goals.is_empty() {
            return Ok(Path::not_found(0));
        }
        let heuristic = GoalHeuristic::new(self.lookup.as_ref(), goals)?;
        let goal_set: HashSet<NodeId> = goals.iter().copied().collect();
        if config.beam_width > 0 {
            beam::search(self, start, &goal_set, &heuristic, config)
        } else {
            self.astar(start, &goal_set, &heuristic, config)
        }
    }

    fn search_text(
        &self,
        start: &str,
        goal: &str,
        config: &SearchConfig,
    ) -> Result<Path, ReasoningError> {
        let start = self.lookup.find_node(start)?;
        let goal = self.lookup.find_node(goal)?;
        let (Some(start), Some(goal)) = (start, goal) else {
            return Ok(Path::not_found(0));
        };
        self.search(start, goal, config)
    }
}
