use std::collections::{HashMap, HashSet};

use noesis_graph::{Neighbor, NodeId};

use super::{
    cost::{edge_cost, GoalHeuristic},
    frontier::FrontierEntry,
    reconstruct, AStarPathFinder, Parents, Path, SearchConfig,
};
use crate::error::ReasoningError;

/// Layered beam search: expands a whole layer, then keeps the best
/// `beam_width` successors by `(f, g)`. Cheaper than A*, not optimal.
pub(super) fn search(
    finder: &AStarPathFinder,
    start: NodeId,
    goals: &HashSet<NodeId>,
    heuristic: &GoalHeuristic,
    config: &SearchConfig,
) -> Result<Path, ReasoningError> {
    let weight = config.heuristic_weight;
    let mut visited = HashSet::from([start]);
    let mut parents = Parents::new();
    let mut layer = vec![(start, 0.0_f64)];
    let mut expanded = 0;
    let mut seq = 0_u64;

    while !layer.is_empty() {
        let mut successors: HashMap<NodeId, (FrontierEntry, NodeId, Neighbor)> = HashMap::new();
        for &(node, g) in &layer {
            if expanded >= config.max_expansions {
                tracing::debug!(expanded, "beam search stopped at expansion limit");
                return Ok(Path::not_found(expanded));
            }
            expanded += 1;
            for edge in finder.visible_edges(node, config)? {
                if visited.contains(&edge.id) {
                    continue;
                }
                let g = g + edge_cost(&edge);
                if successors
                    .get(&edge.id)
                    .is_some_and(|(entry, _, _)| entry.g <= g)
                {
                    continue;
                }
                seq += 1;
                let f = weight.mul_add(finder.estimate(heuristic, edge.id)?, g);
                let entry = FrontierEntry {
                    f,
                    g,
                    node: edge.id,
                    seq,
                };
                successors.insert(edge.id, (entry, node, edge));
            }
        }

        let mut ranked: Vec<_> = successors.into_values().collect();
        ranked.sort_by(|(a, _, _), (b, _, _)| a.rank(b));
        ranked.truncate(config.beam_width);

        let mut reached: Option<FrontierEntry> = None;
        for (entry, parent, edge) in &ranked {
            visited.insert(entry.node);
            parents.insert(entry.node, (*parent, *edge));
            if goals.contains(&entry.node) && reached.map_or(true, |best| entry.g < best.g) {
                reached = Some(*entry);
            }
        }
        if let Some(goal) = reached {
            return Ok(reconstruct(start, goal.node, &parents, expanded));
        }
        layer = ranked
            .into_iter()
            .map(|(entry, _, _)| (entry.node, entry.g))
            .collect();
    }
    Ok(Path::not_found(expanded))
}
