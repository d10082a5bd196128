//! Meta-reasoning over what the graph knows about a problem.

/// Evidence-density helpers.
pub mod evidence;

use std::{collections::HashSet, sync::Arc};

use noesis_graph::{Lookup, Neighbor, NodeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ReasoningError, lexicon};
use evidence::{difficulty, edge_strength, evidence_density};

/// Tuning for [`ProblemDecomposer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposerConfig {
    /// Deepest sub-problem level expanded below the root.
    pub max_depth: usize,
    /// Under-evidenced neighbors expanded per node.
    pub max_branching: usize,
    /// Total sub-problems per plan.
    pub max_subproblems: usize,
    /// Normalized confidence an edge needs to count as settled knowledge.
    pub solvable_confidence: f64,
    /// Observations an edge needs to count as settled knowledge.
    pub solvable_observations: u64,
    /// Concepts with fewer neighbors than this are knowledge gaps.
    pub gap_reference_threshold: usize,
    /// Observation count treated as fully evidenced.
    pub observation_reference: u64,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_branching: 4,
            max_subproblems: 16,
            solvable_confidence: 0.6,
            solvable_observations: 3,
            gap_reference_threshold: 2,
            observation_reference: 50,
        }
    }
}

/// A piece of the problem the graph does not settle directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubProblem {
    /// Identifier.
    pub id: Uuid,
    /// Text of the node to reach.
    pub description: String,
    /// 1 (trivial) to 10 (barely evidenced).
    pub difficulty: u8,
    /// Whether the node itself has settled knowledge.
    pub solvable: bool,
    /// Descriptions of the sub-problems expanded beneath this one.
    pub prerequisites: Vec<String>,
    /// Node the sub-problem is about.
    pub node: NodeId,
    /// Node it was expanded from.
    pub anchor: NodeId,
    /// Level below the root, starting at 1.
    pub depth: usize,
}

/// A concept the graph barely references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGap {
    /// Keyword or phrase.
    pub concept: String,
    /// Number of outgoing relations; 0 for unknown concepts.
    pub reference_count: usize,
    /// Mean normalized confidence of those relations.
    pub confidence: f64,
}

/// A settled relation about a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownFact {
    /// Topic text.
    pub subject: String,
    /// Related node text.
    pub object: String,
    /// Related node.
    pub object_node: NodeId,
    /// Confidence rating.
    pub confidence: f64,
    /// Observation count.
    pub observations: u64,
}

/// Output of [`Decomposer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionPlan {
    /// Problem text as given.
    pub problem: String,
    /// Node the problem resolved to.
    pub root: Option<NodeId>,
    /// Sub-problems in expansion order.
    pub sub_problems: Vec<SubProblem>,
    /// Poorly referenced concepts.
    pub gaps: Vec<KnowledgeGap>,
    /// Coarse solvability. An unresolvable root is trivially solvable:
    /// there is nothing to decompose.
    pub solvable: bool,
    /// Deepest level reached.
    pub depth_reached: usize,
    /// Distinct nodes inspected.
    pub nodes_visited: usize,
}

impl DecompositionPlan {
    fn empty(problem: &str) -> Self {
        Self {
            problem: problem.to_string(),
            root: None,
            sub_problems: Vec::new(),
            gaps: Vec::new(),
            solvable: true,
            depth_reached: 0,
            nodes_visited: 0,
        }
    }

    /// True when there is nothing to act on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sub_problems.is_empty()
    }
}

/// Capability: turn a problem statement into a plan.
pub trait Decomposer: Send + Sync {
    /// Full plan for `problem`. Never fails on unknown topics.
    fn analyze(&self, problem: &str) -> Result<DecompositionPlan, ReasoningError>;
}

struct Expansion {
    visited: HashSet<NodeId>,
    sub_problems: Vec<SubProblem>,
    depth_reached: usize,
}

/// Graph-backed decomposer with a depth cap and a visited set.
pub struct ProblemDecomposer {
    lookup: Arc<dyn Lookup>,
    config: DecomposerConfig,
}

impl ProblemDecomposer {
    /// Creates a decomposer over `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<dyn Lookup>, config: DecomposerConfig) -> Self {
        Self { lookup, config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    /// Settled relations of the topic's node, strongest first.
    pub fn query_known_facts(&self, topic: &str) -> Result<Vec<KnownFact>, ReasoningError> {
        let Some(root) = self.resolve_root(topic)? else {
            return Ok(Vec::new());
        };
        let subject = self.lookup.lookup_text(root)?;
        let mut strong: Vec<Neighbor> = self
            .lookup
            .get_neighbors(root, 0.0, self.config.solvable_observations)?
            .into_iter()
            .filter(|edge| edge.id != root && self.is_settled(edge))
            .collect();
        strong.sort_by(|a, b| edge_strength(b).total_cmp(&edge_strength(a)));
        let mut facts = Vec::with_capacity(strong.len());
        for edge in strong {
            let object = self.lookup.lookup_text(edge.id)?;
            if object.is_empty() {
                continue;
            }
            facts.push(KnownFact {
                subject: subject.clone(),
                object,
                object_node: edge.id,
                confidence: edge.confidence,
                observations: edge.observations,
            });
        }
        Ok(facts)
    }

    /// Keywords of `topic` that are unknown or referenced fewer than
    /// `gap_reference_threshold` times.
    pub fn identify_knowledge_gaps(
        &self,
        topic: &str,
    ) -> Result<Vec<KnowledgeGap>, ReasoningError> {
        let mut gaps = Vec::new();
        for concept in lexicon::extract_keywords(topic) {
            let Some(node) = self.lookup.find_node(&concept)? else {
                gaps.push(KnowledgeGap {
                    concept,
                    reference_count: 0,
                    confidence: 0.0,
                });
                continue;
            };
            let edges = self.lookup.get_neighbors(node, 0.0, 0)?;
            if edges.len() >= self.config.gap_reference_threshold {
                continue;
            }
            let confidence = if edges.is_empty() {
                0.0
            } else {
                edges.iter().map(Neighbor::normalized_confidence).sum::<f64>() / edges.len() as f64
            };
            gaps.push(KnowledgeGap {
                concept,
                reference_count: edges.len(),
                confidence,
            });
        }
        Ok(gaps)
    }

    /// Sub-problems of `problem`; empty when the root cannot be resolved.
    pub fn decompose(&self, problem: &str) -> Result<Vec<SubProblem>, ReasoningError> {
        Ok(self.analyze(problem)?.sub_problems)
    }

    /// Coarse solvability of `problem`.
    pub fn is_solvable(&self, problem: &str) -> Result<bool, ReasoningError> {
        Ok(self.analyze(problem)?.solvable)
    }

    /// Exact node for the whole problem, else the resolvable phrase with the
    /// strongest settled relation (first one on ties).
    fn resolve_root(&self, problem: &str) -> Result<Option<NodeId>, ReasoningError> {
        if let Some(node) = self.lookup.find_node(problem)? {
            return Ok(Some(node));
        }
        let mut best: Option<(NodeId, f64)> = None;
        for phrase in lexicon::candidate_phrases(problem) {
            let Some(node) = self.lookup.find_node(&phrase)? else {
                continue;
            };
            let strength = self.settled_edge(node)?.as_ref().map_or(0.0, edge_strength);
            if best.map_or(true, |(_, current)| strength > current) {
                best = Some((node, strength));
            }
        }
        Ok(best.map(|(node, _)| node))
    }

    fn is_settled(&self, edge: &Neighbor) -> bool {
        edge.normalized_confidence() >= self.config.solvable_confidence
            && edge.observations >= self.config.solvable_observations
    }

    /// Strongest settled relation leaving `node`, ignoring self-loops.
    fn settled_edge(&self, node: NodeId) -> Result<Option<Neighbor>, ReasoningError> {
        Ok(self
            .lookup
            .get_neighbors(node, 0.0, self.config.solvable_observations)?
            .into_iter()
            .filter(|edge| edge.id != node && self.is_settled(edge))
            .max_by(|a, b| edge_strength(a).total_cmp(&edge_strength(b))))
    }

    fn direct_plan(
        &self,
        problem: &str,
        root: NodeId,
        edge: Neighbor,
    ) -> Result<DecompositionPlan, ReasoningError> {
        let description = self.lookup.lookup_text(edge.id)?;
        Ok(DecompositionPlan {
            problem: problem.to_string(),
            root: Some(root),
            sub_problems: vec![SubProblem {
                id: Uuid::new_v4(),
                description,
                difficulty: difficulty(&edge, self.config.observation_reference),
                solvable: true,
                prerequisites: Vec::new(),
                node: edge.id,
                anchor: root,
                depth: 1,
            }],
            gaps: Vec::new(),
            solvable: true,
            depth_reached: 1,
            nodes_visited: 2,
        })
    }

    /// Expands the under-evidenced neighbors of `anchor` at `depth`, returning
    /// the descriptions of the sub-problems created directly beneath it.
    fn expand(
        &self,
        anchor: NodeId,
        depth: usize,
        state: &mut Expansion,
    ) -> Result<Vec<String>, ReasoningError> {
        if depth > self.config.max_depth || state.sub_problems.len() >= self.config.max_subproblems
        {
            return Ok(Vec::new());
        }
        let reference = self.config.observation_reference;
        let mut weak: Vec<Neighbor> = self
            .lookup
            .get_neighbors(anchor, 0.0, 0)?
            .into_iter()
            .filter(|edge| edge.id != anchor && !self.is_settled(edge))
            .collect();
        // Least evidenced first: those are the real unknowns.
        weak.sort_by(|a, b| {
            evidence_density(a, reference).total_cmp(&evidence_density(b, reference))
        });

        let mut created = Vec::new();
        let mut expanded = 0;
        for edge in weak {
            if expanded == self.config.max_branching
                || state.sub_problems.len() >= self.config.max_subproblems
            {
                break;
            }
            if !state.visited.insert(edge.id) {
                continue;
            }
            let description = self.lookup.lookup_text(edge.id)?;
            if description.is_empty() {
                continue;
            }
            expanded += 1;
            state.depth_reached = state.depth_reached.max(depth);
            let solvable = self.settled_edge(edge.id)?.is_some();
            let index = state.sub_problems.len();
            state.sub_problems.push(SubProblem {
                id: Uuid::new_v4(),
                description: description.clone(),
                difficulty: difficulty(&edge, reference),
                solvable,
                prerequisites: Vec::new(),
                node: edge.id,
                anchor,
                depth,
            });
            if !solvable {
                let prerequisites = self.expand(edge.id, depth + 1, state)?;
                state.sub_problems[index].prerequisites = prerequisites;
            }
            created.push(description);
        }
        Ok(created)
    }
}

impl Decomposer for ProblemDecomposer {
    fn analyze(&self, problem: &str) -> Result<DecompositionPlan, ReasoningError> {
        let Some(root) = self.resolve_root(problem)? else {
            tracing::debug!(problem, "decomposition root unresolved");
            return Ok(DecompositionPlan::empty(problem));
        };
        if let Some(edge) = self.settled_edge(root)? {
            return self.direct_plan(problem, root, edge);
        }
        let mut state = Expansion {
            visited: HashSet::from([root]),
            sub_problems: Vec::new(),
            depth_reached: 0,
        };
        self.expand(root, 1, &mut state)?;
        let gaps = self.identify_knowledge_gaps(problem)?;
        let solvable = state.sub_problems.iter().all(|sub| sub.solvable);
        Ok(DecompositionPlan {
            problem: problem.to_string(),
            root: Some(root),
            solvable,
            depth_reached: state.depth_reached,
            nodes_visited: state.visited.len(),
            sub_problems: state.sub_problems,
            gaps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noesis_graph::{MemoryGraph, Position};

    fn position(i: u32) -> Position {
        let t = f64::from(i);
        Position::from_angles(0.3 + t * 0.21, 0.7 + t * 0.13, t * 0.37)
    }

    fn decomposer(graph: MemoryGraph) -> ProblemDecomposer {
        ProblemDecomposer::new(Arc::new(graph), DecomposerConfig::default())
    }

    #[test]
    fn settled_root_yields_single_solvable_subproblem() {
        let mut graph = MemoryGraph::new();
        let france = graph.insert_node("France", position(0));
        let paris = graph.insert_node("Paris", position(1));
        graph.connect(france, paris, 2800.0, 60);
        let plan = decomposer(graph)
            .analyze("What is the capital of France?")
            .unwrap();
        assert!(plan.solvable);
        assert!(plan.gaps.is_empty());
        assert_eq!(plan.root, Some(france));
        assert_eq!(plan.sub_problems.len(), 1);
        assert_eq!(plan.sub_problems[0].node, paris);
        assert_eq!(plan.sub_problems[0].description, "Paris");
        assert!(plan.sub_problems[0].difficulty <= 2);
    }

    #[test]
    fn unknown_topic_yields_empty_plan() {
        let plan = decomposer(MemoryGraph::new())
            .analyze("Why do quasars flicker?")
            .unwrap();
        assert!(plan.is_empty());
        assert!(plan.solvable);
        assert!(plan.root.is_none());
        assert!(plan.gaps.is_empty());
    }

    #[test]
    fn weak_neighbors_expand_recursively_with_prerequisites() {
        let mut graph = MemoryGraph::new();
        let ids: Vec<NodeId> = ["entropy", "heat", "work", "energy"]
            .iter()
            .zip(0..)
            .map(|(text, i)| graph.insert_node(text, position(i)))
            .collect();
        graph.connect(ids[0], ids[1], 600.0, 1);
        graph.connect(ids[1], ids[2], 500.0, 1);
        graph.connect(ids[2], ids[3], 2900.0, 80);
        let plan = decomposer(graph).analyze("entropy").unwrap();
        let descriptions: Vec<&str> = plan
            .sub_problems
            .iter()
            .map(|sub| sub.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["heat", "work"]);
        assert_eq!(plan.sub_problems[0].prerequisites, vec!["work".to_string()]);
        assert!(!plan.sub_problems[0].solvable);
        assert!(plan.sub_problems[1].solvable);
        assert_eq!(plan.sub_problems[1].depth, 2);
        assert!(!plan.solvable);
        assert_eq!(plan.gaps.len(), 1);
        assert_eq!(plan.gaps[0].concept, "entropy");
    }

    #[test]
    fn self_loops_and_cycles_terminate_within_depth() {
        let mut graph = MemoryGraph::new();
        let ids: Vec<NodeId> = (0..6)
            .map(|i| graph.insert_node(&format!("node{i}"), position(i)))
            .collect();
        for (i, &id) in ids.iter().enumerate() {
            graph.connect(id, id, 100.0, 1);
            graph.connect(id, ids[(i + 1) % ids.len()], 200.0, 1);
            graph.connect(id, ids[(i + 3) % ids.len()], 150.0, 1);
        }
        let config = DecomposerConfig {
            max_depth: 2,
            ..DecomposerConfig::default()
        };
        let plan = ProblemDecomposer::new(Arc::new(graph), config)
            .analyze("node0")
            .unwrap();
        assert!(plan.depth_reached <= 2);
        assert!(plan.sub_problems.iter().all(|sub| sub.depth <= 2));
        assert!(plan.sub_problems.iter().all(|sub| sub.node != ids[0]));
        let mut seen = HashSet::new();
        assert!(plan.sub_problems.iter().all(|sub| seen.insert(sub.node)));
    }

    #[test]
    fn known_facts_and_gaps_follow_thresholds() {
        let mut graph = MemoryGraph::new();
        let rust = graph.insert_node("rust", position(0));
        let memory = graph.insert_node("memory safety", position(1));
        let crab = graph.insert_node("crab", position(2));
        graph.connect(rust, memory, 2600.0, 40);
        graph.connect(rust, crab, 400.0, 1);
        let decomposer = decomposer(graph);
        let facts = decomposer.query_known_facts("rust").unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].object, "memory safety");
        let gaps = decomposer
            .identify_knowledge_gaps("rust borrowck crab")
            .unwrap();
        let concepts: Vec<&str> = gaps.iter().map(|gap| gap.concept.as_str()).collect();
        assert_eq!(concepts, vec!["borrowck", "crab"]);
        assert_eq!(gaps[0].reference_count, 0);
        assert!(decomposer.is_solvable("rust").unwrap());
    }
}
