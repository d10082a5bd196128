use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::Position,
    lookup::{Lookup, LookupError},
    node::{normalize_text, Neighbor, Node, NodeId},
};

const LEADING_ARTICLES: [&str; 3] = ["the ", "a ", "an "];

/// Serializable description of a graph, used for fixtures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFixture {
    /// Nodes with explicit positions.
    #[serde(default)]
    pub nodes: Vec<NodeFixture>,
    /// Edges between node texts.
    #[serde(default)]
    pub edges: Vec<EdgeFixture>,
}

/// Node entry of a [`GraphFixture`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFixture {
    /// Node text.
    pub text: String,
    /// Coordinates, normalized on load.
    pub position: Position,
}

/// Edge entry of a [`GraphFixture`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeFixture {
    /// Source node text.
    pub from: String,
    /// Target node text.
    pub to: String,
    /// Confidence rating.
    pub confidence: f64,
    /// Observation count.
    pub observations: u64,
    /// Also insert the reverse edge.
    #[serde(default)]
    pub bidirectional: bool,
}

/// Immutable-after-build graph held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: IndexMap<NodeId, Node>,
    adjacency: HashMap<NodeId, Vec<Neighbor>>,
    by_text: HashMap<String, NodeId>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or repositions) the node for `text` and returns its id.
    pub fn insert_node(&mut self, text: &str, position: Position) -> NodeId {
        let id = NodeId::of_text(text);
        self.by_text.insert(normalize_text(text), id);
        self.nodes.insert(
            id,
            Node {
                id,
                text: text.trim().to_string(),
                position,
            },
        );
        id
    }

    /// Adds a directed edge. Re-adding an edge replaces its rating and count.
    pub fn connect(&mut self, from: NodeId, to: NodeId, confidence: f64, observations: u64) {
        let edges = self.adjacency.entry(from).or_default();
        let edge = Neighbor::new(to, confidence, observations);
        if let Some(existing) = edges.iter_mut().find(|n| n.id == to) {
            *existing = edge;
        } else {
            edges.push(edge);
        }
    }

    /// Adds edges in both directions.
    pub fn connect_both(&mut self, a: NodeId, b: NodeId, confidence: f64, observations: u64) {
        self.connect(a, b, confidence, observations);
        self.connect(b, a, confidence, observations);
    }

    /// Node record by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Builds a graph from a fixture. Edges must reference declared nodes.
    pub fn from_fixture(fixture: GraphFixture) -> Result<Self> {
        let mut graph = Self::new();
        for node in &fixture.nodes {
            graph.insert_node(&node.text, node.position);
        }
        for edge in &fixture.edges {
            let from = graph
                .resolve_exact(&edge.from)
                .with_context(|| format!("edge source `{}` is not a declared node", edge.from))?;
            let to = graph
                .resolve_exact(&edge.to)
                .with_context(|| format!("edge target `{}` is not a declared node", edge.to))?;
            if !edge.confidence.is_finite() {
                bail!("edge {} -> {} has a non-finite confidence", edge.from, edge.to);
            }
            if edge.bidirectional {
                graph.connect_both(from, to, edge.confidence, edge.observations);
            } else {
                graph.connect(from, to, edge.confidence, edge.observations);
            }
        }
        Ok(graph)
    }

    /// Parses a JSON fixture.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let fixture: GraphFixture = serde_json::from_str(raw).context("parsing graph fixture")?;
        Self::from_fixture(fixture)
    }

    /// Loads a JSON fixture from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading graph fixture {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading {}", path.display()))
    }

    fn resolve_exact(&self, text: &str) -> Option<NodeId> {
        self.by_text.get(&normalize_text(text)).copied()
    }

    /// Exact match first, then progressively looser spellings: surrounding
    /// punctuation, a leading article, a plural `s`.
    fn resolve_fuzzy(&self, text: &str) -> Option<NodeId> {
        let normalized = normalize_text(text);
        let trimmed = normalized
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        let mut candidates = vec![normalized, trimmed.clone()];
        if let Some(rest) = LEADING_ARTICLES
            .iter()
            .find_map(|article| trimmed.strip_prefix(article))
        {
            candidates.push(rest.to_string());
        }
        if let Some(singular) = trimmed.strip_suffix('s') {
            if !singular.is_empty() {
                candidates.push(singular.to_string());
            }
        }
        candidates
            .iter()
            .find_map(|candidate| self.by_text.get(candidate).copied())
    }
}

impl Lookup for MemoryGraph {
    fn lookup_text(&self, id: NodeId) -> Result<String, LookupError> {
        Ok(self
            .nodes
            .get(&id)
            .map(|node| node.text.clone())
            .unwrap_or_default())
    }

    fn lookup_position(&self, id: NodeId) -> Result<Option<Position>, LookupError> {
        Ok(self.nodes.get(&id).map(|node| node.position))
    }

    fn get_neighbors(
        &self,
        id: NodeId,
        min_confidence: f64,
        min_observations: u64,
    ) -> Result<Vec<Neighbor>, LookupError> {
        Ok(self
            .adjacency
            .get(&id)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|n| {
                        n.confidence >= min_confidence && n.observations >= min_observations
                    })
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_node(&self, text: &str) -> Result<Option<NodeId>, LookupError> {
        Ok(self.resolve_fuzzy(text))
    }
}
