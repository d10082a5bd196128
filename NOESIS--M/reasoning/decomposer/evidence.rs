use noesis_graph::Neighbor;

/// Evidence density of an edge in `[0, 1]`: normalized confidence scaled by
/// how close the observation count is to `observation_reference`.
#[must_use]
pub fn evidence_density(edge: &Neighbor, observation_reference: u64) -> f64 {
    let reference = (observation_reference.max(1) as f64).ln_1p();
    let observed = (edge.observations as f64).ln_1p();
    edge.normalized_confidence() * (observed / reference).min(1.0)
}

/// Difficulty on the 1-10 scale; sparse evidence means hard.
#[must_use]
pub fn difficulty(edge: &Neighbor, observation_reference: u64) -> u8 {
    let density = evidence_density(edge, observation_reference);
    let scaled = 9.0f64.mul_add(1.0 - density, 1.0).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let level = scaled.clamp(1.0, 10.0) as u8;
    level
}

/// Ranking used to pick the best supporting edge.
#[must_use]
pub fn edge_strength(edge: &Neighbor) -> f64 {
    edge.normalized_confidence() * (edge.observations as f64).ln_1p()
}
