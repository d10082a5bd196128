use std::sync::Arc;

use thiserror::Error;

use crate::{
    geometry::Position,
    node::{Neighbor, NodeId},
};

/// Failures of the graph store itself. Unknown nodes are not failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    /// The store could not be reached.
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
    /// The store returned data that violates the graph invariants.
    #[error("malformed record for node {id}: {reason}")]
    Malformed {
        /// Node whose record is malformed.
        id: NodeId,
        /// What was wrong with it.
        reason: String,
    },
}

/// Read-only query surface of a graph store.
///
/// Implementations must tolerate concurrent readers. Unknown ids and texts
/// are reported as empty values, never as errors.
pub trait Lookup: Send + Sync {
    /// Text of a node, or an empty string when unknown.
    fn lookup_text(&self, id: NodeId) -> Result<String, LookupError>;

    /// Sphere position of a node, if known.
    fn lookup_position(&self, id: NodeId) -> Result<Option<Position>, LookupError>;

    /// Outgoing edges whose confidence and observation count meet both minima.
    fn get_neighbors(
        &self,
        id: NodeId,
        min_confidence: f64,
        min_observations: u64,
    ) -> Result<Vec<Neighbor>, LookupError>;

    /// Node matching `text` exactly or after normalization.
    fn find_node(&self, text: &str) -> Result<Option<NodeId>, LookupError>;
}

impl<T: Lookup + ?Sized> Lookup for Arc<T> {
    fn lookup_text(&self, id: NodeId) -> Result<String, LookupError> {
        (**self).lookup_text(id)
    }

    fn lookup_position(&self, id: NodeId) -> Result<Option<Position>, LookupError> {
        (**self).lookup_position(id)
    }

    fn get_neighbors(
        &self,
        id: NodeId,
        min_confidence: f64,
        min_observations: u64,
    ) -> Result<Vec<Neighbor>, LookupError> {
        (**self).get_neighbors(id, min_confidence, min_observations)
    }

    fn find_node(&self, text: &str) -> Result<Option<NodeId>, LookupError> {
        (**self).find_node(text)
    }
}
