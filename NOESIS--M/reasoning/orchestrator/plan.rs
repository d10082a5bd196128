use noesis_graph::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::observe::Seed;
use crate::{
    decomposer::{DecompositionPlan, SubProblem},
    pathfinder::Path,
};

/// Priority of a seed-pair intention.
const SEED_PAIR_PRIORITY: f64 = 0.5;

/// A goal the Act phase tries to reach by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intention {
    /// Identifier.
    pub id: Uuid,
    /// What is being resolved.
    pub description: String,
    /// Default start node.
    pub start: NodeId,
    /// Node to reach.
    pub target: NodeId,
    /// Ordering weight; higher first.
    pub priority: f64,
    /// Set once a path was found.
    pub resolved: bool,
    /// Found path.
    pub path: Option<Path>,
    /// Sub-problem the intention came from.
    pub source: Option<Uuid>,
}

impl Intention {
    /// Records a search outcome.
    pub fn settle(&mut self, path: Path) {
        self.resolved = path.found;
        self.path = path.found.then_some(path);
    }
}

/// Solvable sub-problems rank above unsolvable ones; easy unsolvable ones
/// rank above hard ones.
#[must_use]
pub fn priority(sub: &SubProblem) -> f64 {
    let difficulty = f64::from(sub.difficulty) / 10.0;
    if sub.solvable {
        0.5f64.mul_add(difficulty, 0.5)
    } else {
        0.25 * (1.0 - difficulty)
    }
}

/// Decide phase: intentions from sub-problems, or from consecutive seeds
/// when decomposition produced nothing.
#[must_use]
pub fn decide(plan: &DecompositionPlan, seeds: &[Seed], max_intentions: usize) -> Vec<Intention> {
    let mut intentions: Vec<Intention> = if plan.sub_problems.is_empty() {
        seeds
            .windows(2)
            .filter(|pair| pair[0].node != pair[1].node)
            .map(|pair| Intention {
                id: Uuid::new_v4(),
                description: format!("{} → {}", pair[0].phrase, pair[1].phrase),
                start: pair[0].node,
                target: pair[1].node,
                priority: SEED_PAIR_PRIORITY,
                resolved: false,
                path: None,
                source: None,
            })
            .collect()
    } else {
        plan.sub_problems
            .iter()
            .map(|sub| Intention {
                id: Uuid::new_v4(),
                description: sub.description.clone(),
                start: sub.anchor,
                target: sub.node,
                priority: priority(sub),
                resolved: false,
                path: None,
                source: Some(sub.id),
            })
            .collect()
    };
    intentions.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    intentions.truncate(max_intentions);
    intentions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(difficulty: u8, solvable: bool, node: u128) -> SubProblem {
        SubProblem {
            id: Uuid::new_v4(),
            description: format!("sub {node}"),
            difficulty,
            solvable,
            prerequisites: Vec::new(),
            node: NodeId::from_raw(node),
            anchor: NodeId::from_raw(0),
            depth: 1,
        }
    }

    fn plan(sub_problems: Vec<SubProblem>) -> DecompositionPlan {
        DecompositionPlan {
            problem: "test".into(),
            root: Some(NodeId::from_raw(0)),
            sub_problems,
            gaps: Vec::new(),
            solvable: false,
            depth_reached: 1,
            nodes_visited: 1,
        }
    }

    #[test]
    fn solvable_work_outranks_unsolvable() {
        let intentions = decide(
            &plan(vec![sub(2, false, 1), sub(9, false, 2), sub(3, true, 3)]),
            &[],
            2,
        );
        let targets: Vec<u128> = intentions.iter().map(|i| i.target.raw()).collect();
        assert_eq!(targets, vec![3, 1]);
        assert!((intentions[0].priority - 0.65).abs() < 1e-12);
        assert!((intentions[1].priority - 0.2).abs() < 1e-12);
    }

    #[test]
    fn consecutive_seeds_are_linked_without_subproblems() {
        let seeds: Vec<Seed> = (1..=3)
            .map(|n| Seed {
                node: NodeId::from_raw(n),
                phrase: format!("seed{n}"),
            })
            .collect();
        let intentions = decide(&plan(Vec::new()), &seeds, 8);
        assert_eq!(intentions.len(), 2);
        assert_eq!(intentions[0].start, seeds[0].node);
        assert_eq!(intentions[1].target, seeds[2].node);
        assert!(decide(&plan(Vec::new()), &seeds[..1], 8).is_empty());
    }
}
