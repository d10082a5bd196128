//! Temperature-annealed stochastic traversal.

/// Gate, annealing, softmax and sampling primitives.
pub mod scoring;
/// Per-walk mutable state.
pub mod state;

use std::sync::Arc;

use noesis_graph::{Lookup, Neighbor, NodeId};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{error::ReasoningError, lexicon};
use scoring::{sample_index, sigmoid, softmax, temperature};
pub use state::WalkState;

/// Walk tuning. Weights shape the logit of each candidate edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkParams {
    /// Energy at the start of a walk, in `[0, 1]`.
    pub initial_energy: f64,
    /// Energy spent per step.
    pub energy_decay: f64,
    /// Temperature before annealing.
    pub temperature_start: f64,
    /// Lowest temperature.
    pub temperature_floor: f64,
    /// Step budget; also the annealing horizon.
    pub max_steps: usize,
    /// Weight of normalized confidence.
    pub confidence_weight: f64,
    /// Weight of the observation ratio.
    pub observation_weight: f64,
    /// Weight of the sigmoid relation gate.
    pub relation_weight: f64,
    /// Evidence level where the gate opens halfway.
    pub gate_midpoint: f64,
    /// Sharpness of the gate.
    pub gate_steepness: f64,
    /// Subtracted once per previous visit.
    pub repeat_penalty: f64,
    /// Length of the recent-node window.
    pub novelty_window: usize,
    /// Subtracted when the candidate is in the recent window.
    pub novelty_penalty: f64,
    /// Reward per radian gained toward the goal.
    pub goal_attraction: f64,
    /// Geodesic distance counted as arrival.
    pub goal_tolerance: f64,
    /// Edges rated below this are ignored.
    pub min_confidence: f64,
    /// Edges observed fewer times are ignored.
    pub min_observations: u64,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            initial_energy: 1.0,
            energy_decay: 0.08,
            temperature_start: 1.0,
            temperature_floor: 0.1,
            max_steps: 24,
            confidence_weight: 1.0,
            observation_weight: 0.5,
            relation_weight: 0.8,
            gate_midpoint: 1.5,
            gate_steepness: 2.0,
            repeat_penalty: 0.75,
            novelty_window: 6,
            novelty_penalty: 0.5,
            goal_attraction: 2.5,
            goal_tolerance: 0.02,
            min_confidence: 0.0,
            min_observations: 0,
        }
    }
}

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Energy reached zero.
    EnergyExhausted,
    /// The goal node, or a point within tolerance of it, was reached.
    GoalReached,
    /// No eligible neighbor remained.
    DeadEnd,
    /// The step budget ran out.
    StepBudget,
}

impl Termination {
    /// Short label for logs and traces.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::EnergyExhausted => "energy_exhausted",
            Self::GoalReached => "goal_reached",
            Self::DeadEnd => "dead_end",
            Self::StepBudget => "step_budget",
        }
    }
}

/// One taken step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Node moved to.
    pub node: NodeId,
    /// Probability it was chosen with.
    pub probability: f64,
    /// Temperature at the time.
    pub temperature: f64,
    /// Energy after the step.
    pub energy: f64,
    /// Normalized confidence of the traversed edge.
    pub confidence: f64,
}

/// Result of [`Walker::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The walk moved.
    Advanced(StepRecord),
    /// The walk stopped.
    Halted(Termination),
}

/// A scored next-node option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Neighbor node.
    pub id: NodeId,
    /// Its text.
    pub text: String,
    /// Unscaled score.
    pub logit: f64,
    /// Softmax probability at the current temperature.
    pub probability: f64,
    /// Edge leading to it.
    pub neighbor: Neighbor,
}

/// Summary of a finished walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Tokens joined with spaces.
    pub text: String,
    /// Trajectory words with consecutive repeats removed.
    pub tokens: Vec<String>,
    /// Visited nodes, start included.
    pub trajectory: Vec<NodeId>,
    /// Why the walk stopped.
    pub termination: Termination,
    /// Steps taken.
    pub steps: usize,
    /// Energy left.
    pub final_energy: f64,
    /// Mean normalized confidence of traversed edges.
    pub mean_confidence: f64,
}

impl Generation {
    fn empty(termination: Termination) -> Self {
        Self {
            text: String::new(),
            tokens: Vec::new(),
            trajectory: Vec::new(),
            termination,
            steps: 0,
            final_energy: 0.0,
            mean_confidence: 0.0,
        }
    }
}

/// Capability: stochastic traversal with injectable randomness.
pub trait Walker: Send + Sync {
    /// State positioned at `start`.
    fn init(&self, start: NodeId, initial_energy: f64) -> Result<WalkState, ReasoningError>;

    /// Attracts the walk toward `goal`.
    fn set_goal(&self, state: &mut WalkState, goal: NodeId) -> Result<(), ReasoningError>;

    /// Eligible next nodes with logits and probabilities.
    fn candidates(
        &self,
        state: &WalkState,
        params: &WalkParams,
    ) -> Result<Vec<Candidate>, ReasoningError>;

    /// Takes one step, or reports why the walk cannot continue.
    fn step(
        &self,
        state: &mut WalkState,
        params: &WalkParams,
        rng: &mut dyn RngCore,
    ) -> Result<StepOutcome, ReasoningError>;

    /// Steps until halted, with a budget of `max_steps`.
    fn walk(
        &self,
        state: &mut WalkState,
        params: &WalkParams,
        max_steps: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Generation, ReasoningError>;

    /// Resolves `prompt` to a start node and walks from it.
    fn generate(
        &self,
        prompt: &str,
        params: &WalkParams,
        max_steps: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Generation, ReasoningError>;

    /// Goal-attracted walk from `start` toward `goal`.
    fn bridge(
        &self,
        start: NodeId,
        goal: NodeId,
        params: &WalkParams,
        max_steps: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Generation, ReasoningError> {
        let mut state = self.init(start, params.initial_energy)?;
        self.set_goal(&mut state, goal)?;
        self.walk(&mut state, params, max_steps, rng)
    }
}

/// Halting checks in priority order: goal, energy, budget. Dead ends are
/// only known after candidate filtering.
fn halt_reason(state: &WalkState, params: &WalkParams) -> Option<Termination> {
    let at_goal = state.goal == Some(state.current)
        || state
            .distance_to_goal()
            .is_some_and(|distance| distance <= params.goal_tolerance);
    if at_goal {
        Some(Termination::GoalReached)
    } else if state.energy < 1e-12 {
        Some(Termination::EnergyExhausted)
    } else if state.steps >= params.max_steps {
        Some(Termination::StepBudget)
    } else {
        None
    }
}

/// Graph-backed walker.
pub struct GenerativeWalker {
    lookup: Arc<dyn Lookup>,
}

impl GenerativeWalker {
    /// Creates a walker over `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<dyn Lookup>) -> Self {
        Self { lookup }
    }

    fn summarize(
        &self,
        state: &WalkState,
        termination: Termination,
    ) -> Result<Generation, ReasoningError> {
        let mut texts = Vec::with_capacity(state.trajectory.len());
        for &node in &state.trajectory {
            texts.push(self.lookup.lookup_text(node)?);
        }
        let tokens = lexicon::join_fragments(texts.iter().map(String::as_str));
        Ok(Generation {
            text: tokens.join(" "),
            tokens,
            trajectory: state.trajectory.clone(),
            termination,
            steps: state.steps,
            final_energy: state.energy,
            mean_confidence: state.mean_confidence(),
        })
    }

    fn resolve_prompt(&self, prompt: &str) -> Result<Option<NodeId>, ReasoningError> {
        if let Some(node) = self.lookup.find_node(prompt)? {
            return Ok(Some(node));
        }
        for phrase in lexicon::candidate_phrases(prompt) {
            if let Some(node) = self.lookup.find_node(&phrase)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}

impl Walker for GenerativeWalker {
    fn init(&self, start: NodeId, initial_energy: f64) -> Result<WalkState, ReasoningError> {
        let position = self.lookup.lookup_position(start)?;
        Ok(WalkState::new(start, position, initial_energy))
    }

    fn set_goal(&self, state: &mut WalkState, goal: NodeId) -> Result<(), ReasoningError> {
        state.goal = Some(goal);
        state.goal_position = self.lookup.lookup_position(goal)?;
        Ok(())
    }

    fn candidates(
        &self,
        state: &WalkState,
        params: &WalkParams,
    ) -> Result<Vec<Candidate>, ReasoningError> {
        let edges = self.lookup.get_neighbors(
            state.current,
            params.min_confidence,
            params.min_observations,
        )?;
        let mut eligible = Vec::with_capacity(edges.len());
        for edge in edges {
            if edge.id == state.current {
                continue;
            }
            let text = self.lookup.lookup_text(edge.id)?;
            if text.trim().is_empty() || lexicon::is_stop_word(&text) {
                continue;
            }
            eligible.push((edge, text));
        }
        if eligible.is_empty() {
            return Ok(Vec::new());
        }

        let peak_observations = eligible
            .iter()
            .map(|(edge, _)| edge.observations.max(1))
            .max()
            .unwrap_or(1) as f64;
        let current_to_goal = state.distance_to_goal();
        let mut logits = Vec::with_capacity(eligible.len());
        for (edge, _) in &eligible {
            let confidence = edge.normalized_confidence();
            let observations = edge.observations as f64;
            let evidence = confidence * observations.ln_1p();
            let relation = sigmoid(params.gate_steepness * (evidence - params.gate_midpoint));
            let visits = f64::from(state.visits_of(edge.id));
            let novelty = if state.recent.contains(&edge.id) { 1.0 } else { 0.0 };
            let attraction = match (current_to_goal, &state.goal_position) {
                (Some(from_current), Some(goal)) => self
                    .lookup
                    .lookup_position(edge.id)?
                    .map_or(0.0, |position| from_current - position.geodesic(goal)),
                _ => 0.0,
            };
            let logit = params.confidence_weight * confidence
                + params.observation_weight * (observations / peak_observations)
                + params.relation_weight * relation
                - params.repeat_penalty * visits
                - params.novelty_penalty * novelty
                + params.goal_attraction * attraction;
            logits.push(logit);
        }

        let temperature = temperature(
            params.temperature_start,
            params.temperature_floor,
            state.steps,
            params.max_steps,
            state.energy,
        );
        let probabilities = softmax(&logits, temperature);
        Ok(eligible
            .into_iter()
            .zip(logits)
            .zip(probabilities)
            .map(|(((neighbor, text), logit), probability)| Candidate {
                id: neighbor.id,
                text,
                logit,
                probability,
                neighbor,
            })
            .collect())
    }

    fn step(
        &self,
        state: &mut WalkState,
        params: &WalkParams,
        rng: &mut dyn RngCore,
    ) -> Result<StepOutcome, ReasoningError> {
        if let Some(termination) = halt_reason(state, params) {
            return Ok(StepOutcome::Halted(termination));
        }
        let candidates = self.candidates(state, params)?;
        let probabilities: Vec<f64> = candidates.iter().map(|c| c.probability).collect();
        let Some(chosen) = sample_index(&probabilities, rng).and_then(|i| candidates.get(i)) else {
            return Ok(StepOutcome::Halted(Termination::DeadEnd));
        };
        let temperature = temperature(
            params.temperature_start,
            params.temperature_floor,
            state.steps,
            params.max_steps,
            state.energy,
        );
        let confidence = chosen.neighbor.normalized_confidence();
        let position = self.lookup.lookup_position(chosen.id)?;
        state.advance(
            chosen.id,
            position,
            confidence,
            params.energy_decay,
            params.novelty_window,
        );
        Ok(StepOutcome::Advanced(StepRecord {
            node: chosen.id,
            probability: chosen.probability,
            temperature,
            energy: state.energy,
            confidence,
        }))
    }

    fn walk(
        &self,
        state: &mut WalkState,
        params: &WalkParams,
        max_steps: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Generation, ReasoningError> {
        let params = WalkParams {
            max_steps,
            ..params.clone()
        };
        let termination = loop {
            if let StepOutcome::Halted(termination) = self.step(state, &params, rng)? {
                break termination;
            }
        };
        tracing::trace!(
            steps = state.steps,
            reason = termination.reason(),
            "walk halted"
        );
        self.summarize(state, termination)
    }

    fn generate(
        &self,
        prompt: &str,
        params: &WalkParams,
        max_steps: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Generation, ReasoningError> {
        let Some(start) = self.resolve_prompt(prompt)? else {
            return Ok(Generation::empty(Termination::DeadEnd));
        };
        let mut state = self.init(start, params.initial_energy)?;
        self.walk(&mut state, params, max_steps, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noesis_graph::{MemoryGraph, Position};
    use rand::{rngs::mock::StepRng, rngs::SmallRng, SeedableRng};

    fn position(i: u32) -> Position {
        let t = f64::from(i);
        Position::from_angles(0.2 + 0.3 * t, 0.4 + 0.17 * t, 0.1 * t)
    }

    /// Ring of `n` nodes, each linked to the next two.
    fn ring(n: u32) -> (Arc<MemoryGraph>, Vec<NodeId>) {
        let mut graph = MemoryGraph::new();
        let ids: Vec<NodeId> = (0..n)
            .map(|i| graph.insert_node(&format!("idea{i}"), position(i)))
            .collect();
        for (i, &id) in ids.iter().enumerate() {
            graph.connect(id, ids[(i + 1) % ids.len()], 1800.0, 12);
            graph.connect(id, ids[(i + 2) % ids.len()], 900.0, 3);
        }
        (Arc::new(graph), ids)
    }

    #[test]
    fn candidate_probabilities_sum_to_one() {
        let mut graph = MemoryGraph::new();
        let hub = graph.insert_node("hub", position(0));
        for i in 1..8 {
            let spoke = graph.insert_node(&format!("spoke{i}"), position(i));
            graph.connect(hub, spoke, f64::from(i) * 350.0, u64::from(i) * 7);
        }
        let walker = GenerativeWalker::new(Arc::new(graph));
        let state = walker.init(hub, 1.0).unwrap();
        let candidates = walker.candidates(&state, &WalkParams::default()).unwrap();
        assert_eq!(candidates.len(), 7);
        let total: f64 = candidates.iter().map(|c| c.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn energy_never_increases() {
        let (graph, ids) = ring(9);
        let walker = GenerativeWalker::new(graph);
        let params = WalkParams::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut state = walker.init(ids[0], params.initial_energy).unwrap();
        let mut previous = state.energy;
        while let StepOutcome::Advanced(record) =
            walker.step(&mut state, &params, &mut rng).unwrap()
        {
            assert!(record.energy <= previous);
            assert!(record.energy >= 0.0);
            assert!(record.temperature >= params.temperature_floor);
            previous = record.energy;
        }
        assert!(state.steps <= params.max_steps);
    }

    #[test]
    fn seeded_walks_are_reproducible() {
        let (graph, ids) = ring(12);
        let walker = GenerativeWalker::new(graph);
        let params = WalkParams::default();
        let run = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut state = walker.init(ids[0], 1.0).unwrap();
            walker.walk(&mut state, &params, 16, &mut rng).unwrap()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn stop_words_and_self_loops_lead_to_dead_end() {
        let mut graph = MemoryGraph::new();
        let lonely = graph.insert_node("lonely", position(0));
        let the = graph.insert_node("the", position(1));
        graph.connect(lonely, lonely, 3000.0, 100);
        graph.connect(lonely, the, 3000.0, 100);
        let walker = GenerativeWalker::new(Arc::new(graph));
        let mut state = walker.init(lonely, 1.0).unwrap();
        let outcome = walker
            .step(&mut state, &WalkParams::default(), &mut StepRng::new(0, 1))
            .unwrap();
        assert_eq!(outcome, StepOutcome::Halted(Termination::DeadEnd));
    }

    #[test]
    fn goal_attracted_walk_arrives() {
        let mut graph = MemoryGraph::new();
        let ids: Vec<NodeId> = (0..4)
            .map(|i| graph.insert_node(&format!("stage{i}"), position(i)))
            .collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], pair[1], 2000.0, 20);
        }
        let walker = GenerativeWalker::new(Arc::new(graph));
        let generation = walker
            .bridge(ids[0], ids[3], &WalkParams::default(), 10, &mut StepRng::new(0, 1))
            .unwrap();
        assert_eq!(generation.termination, Termination::GoalReached);
        assert_eq!(generation.trajectory, ids);
        assert_eq!(generation.steps, 3);
    }

    #[test]
    fn budget_and_energy_bound_the_walk() {
        let (graph, ids) = ring(6);
        let walker = GenerativeWalker::new(graph);
        let tireless = WalkParams {
            energy_decay: 0.0,
            ..WalkParams::default()
        };
        let mut rng = SmallRng::seed_from_u64(9);
        let mut state = walker.init(ids[0], 1.0).unwrap();
        let capped = walker.walk(&mut state, &tireless, 5, &mut rng).unwrap();
        assert_eq!(capped.termination, Termination::StepBudget);
        assert_eq!(capped.steps, 5);

        let draining = WalkParams {
            energy_decay: 0.5,
            ..WalkParams::default()
        };
        let mut state = walker.init(ids[0], 1.0).unwrap();
        let drained = walker.walk(&mut state, &draining, 50, &mut rng).unwrap();
        assert_eq!(drained.termination, Termination::EnergyExhausted);
        assert_eq!(drained.steps, 2);
        assert!(drained.final_energy.abs() < f64::EPSILON);
    }

    #[test]
    fn visited_nodes_are_penalized() {
        let mut graph = MemoryGraph::new();
        let hub = graph.insert_node("hub", position(0));
        let left = graph.insert_node("left", position(1));
        let right = graph.insert_node("right", position(1));
        graph.connect(hub, left, 1500.0, 10);
        graph.connect(hub, right, 1500.0, 10);
        let walker = GenerativeWalker::new(Arc::new(graph));
        let mut state = walker.init(hub, 1.0).unwrap();
        state.visits.insert(left, 2);
        let candidates = walker.candidates(&state, &WalkParams::default()).unwrap();
        let score = |id| candidates.iter().find(|c| c.id == id).map(|c| c.logit).unwrap();
        assert!((score(right) - score(left) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn generation_merges_overlapping_fragments() {
        let mut graph = MemoryGraph::new();
        let ny = graph.insert_node("New York", position(0));
        let city = graph.insert_node("York City", position(1));
        let harbor = graph.insert_node("harbor", position(2));
        graph.connect(ny, city, 2500.0, 30);
        graph.connect(city, harbor, 2500.0, 30);
        let walker = GenerativeWalker::new(Arc::new(graph));
        let generation = walker
            .generate("Tell me about New York", &WalkParams::default(), 8, &mut StepRng::new(0, 1))
            .unwrap();
        assert_eq!(generation.text, "New York City harbor");
        assert_eq!(generation.termination, Termination::DeadEnd);
    }

    #[test]
    fn unresolvable_prompt_generates_nothing() {
        let walker = GenerativeWalker::new(Arc::new(MemoryGraph::new()));
        let generation = walker
            .generate("Imagine a castle", &WalkParams::default(), 8, &mut StepRng::new(0, 1))
            .unwrap();
        assert!(generation.text.is_empty());
        assert_eq!(generation.steps, 0);
    }
}
