#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Content-addressed knowledge graph: identities, sphere geometry, the query
//! contract consumed by the reasoning engines, and a reference in-memory store.

/// Read-through text/position cache over any lookup.
#[path = "../cache.rs"]
pub mod cache;
/// Positions on the unit 3-sphere and geodesic distance.
#[path = "../geometry.rs"]
pub mod geometry;
/// Query contract implemented by graph stores.
#[path = "../lookup.rs"]
pub mod lookup;
/// In-memory graph store used for fixtures and tests.
#[path = "../memory.rs"]
pub mod memory;
/// Node identities and edge records.
#[path = "../node.rs"]
pub mod node;

pub use cache::{CacheStats, CachedLookup};
pub use geometry::{geodesic_distance, InvalidPosition, Position};
pub use lookup::{Lookup, LookupError};
pub use memory::{EdgeFixture, GraphFixture, MemoryGraph, NodeFixture};
pub use node::{normalize_text, Neighbor, Node, NodeId, ELO_CEILING};
