use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Position;

/// Upper end of the confidence rating scale used for normalization.
pub const ELO_CEILING: f64 = 3000.0;

/// Namespace for name-based node identities.
const NODE_NAMESPACE: Uuid = Uuid::from_u128(0x6e6f_6573_6973_0000_8000_636f_6d70_6f73);

/// 128-bit content hash identifying a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeId(u128);

impl NodeId {
    /// Wraps a raw hash value.
    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw hash value.
    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Identity of a text fragment. Texts equal after [`normalize_text`]
    /// share an id.
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        let normalized = normalize_text(text);
        Self(Uuid::new_v5(&NODE_NAMESPACE, normalized.as_bytes()).as_u128())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for NodeId {
    type Error = std::num::ParseIntError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        u128::from_str_radix(raw.trim(), 16).map(Self)
    }
}

/// Lowercases, trims, and collapses internal whitespace.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A hashed text fragment positioned on the unit sphere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Content hash.
    pub id: NodeId,
    /// Display text.
    pub text: String,
    /// Unit vector in R⁴.
    pub position: Position,
}

/// Weighted edge as surfaced by a neighbor query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Target node.
    pub id: NodeId,
    /// ELO-like confidence rating, typically 0-3000.
    pub confidence: f64,
    /// Times the relation has been evidenced.
    pub observations: u64,
}

impl Neighbor {
    /// Creates a neighbor record.
    #[must_use]
    pub const fn new(id: NodeId, confidence: f64, observations: u64) -> Self {
        Self {
            id,
            confidence,
            observations,
        }
    }

    /// Confidence mapped onto `[0, 1]`.
    #[must_use]
    pub fn normalized_confidence(&self) -> f64 {
        (self.confidence / ELO_CEILING).clamp(0.0, 1.0)
    }
}
