use std::sync::Arc;

use futures::future::join_all;
use noesis_graph::{Lookup, NodeId};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{
    assemble::{path_marker, Segment},
    plan::Intention,
};
use crate::{
    error::ReasoningError,
    lexicon::PromptIntent,
    pathfinder::{Path, PathFinder, SearchConfig},
    walker::{WalkParams, Walker},
};

/// Heuristic weight added per variant slot.
const WEIGHT_STEP: f64 = 0.5;

/// One candidate answer produced by an Act round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Variant index; selects seeds, weight and RNG stream.
    pub variant: usize,
    /// Intentions with their search outcomes.
    pub intentions: Vec<Intention>,
    /// Walker passages, bridges and free passages alike.
    pub passages: Vec<String>,
    /// Text segments in answer order.
    pub segments: Vec<Segment>,
    /// Reflect score in `[0, 1]`.
    pub quality: f64,
    /// Search expansions spent.
    pub nodes_expanded: usize,
}

impl Hypothesis {
    /// Intentions with a found path.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.intentions.iter().filter(|i| i.resolved).count()
    }

    /// Found paths in intention order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.intentions.iter().filter_map(|i| i.path.as_ref())
    }

    /// `[path: …]` markers of the resolved paths, in answer order.
    #[must_use]
    pub fn markers(&self) -> Vec<String> {
        self.segments.iter().filter_map(|s| s.marker.clone()).collect()
    }

    /// Higher quality wins; more resolved intentions break ties.
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        self.quality
            .total_cmp(&other.quality)
            .then_with(|| self.resolved().cmp(&other.resolved()))
            .is_gt()
    }
}

/// Everything a worker needs; shared read-only across one round.
pub(super) struct ActContext {
    pub(super) lookup: Arc<dyn Lookup>,
    pub(super) pathfinder: Arc<dyn PathFinder>,
    pub(super) walker: Arc<dyn Walker>,
    pub(super) search: SearchConfig,
    pub(super) walk: WalkParams,
    pub(super) intent: PromptIntent,
    pub(super) seeds: Vec<NodeId>,
    pub(super) intentions: Vec<Intention>,
    pub(super) width: usize,
    pub(super) seed: Option<u64>,
}

/// Runs `width` variants of one round on blocking workers.
pub(super) async fn act(
    context: Arc<ActContext>,
    round: usize,
) -> Result<Vec<Hypothesis>, ReasoningError> {
    let handles: Vec<_> = (0..context.width)
        .map(|index| {
            let context = Arc::clone(&context);
            let variant = index + round * context.width;
            tokio::task::spawn_blocking(move || evaluate(&context, variant))
        })
        .collect();
    let mut hypotheses = Vec::with_capacity(handles.len());
    for joined in join_all(handles).await {
        hypotheses.push(joined??);
    }
    Ok(hypotheses)
}

/// Non-empty texts of `nodes`, in order.
pub(super) fn node_texts(
    lookup: &dyn Lookup,
    nodes: &[NodeId],
) -> Result<Vec<String>, ReasoningError> {
    let mut texts = Vec::with_capacity(nodes.len());
    for &node in nodes {
        let text = lookup.lookup_text(node)?;
        if !text.trim().is_empty() {
            texts.push(text);
        }
    }
    Ok(texts)
}

/// Variant 0 starts from the intention's own anchor; later variants rotate
/// through the other seeds.
fn rotated_start(intention: &Intention, seeds: &[NodeId], variant: usize) -> NodeId {
    let mut options = vec![intention.start];
    options.extend(
        seeds
            .iter()
            .copied()
            .filter(|&seed| seed != intention.start && seed != intention.target),
    );
    options[variant % options.len()]
}

/// Questions answer with what lies beyond the start; creative text keeps the
/// whole path.
fn segment(intent: PromptIntent, texts: &[String]) -> String {
    match (intent, texts) {
        (PromptIntent::Question, [_, rest @ ..]) if !rest.is_empty() => rest.join(" "),
        _ => texts.join(" "),
    }
}

fn variant_rng(seed: Option<u64>, variant: usize) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(variant as u64)),
        None => SmallRng::from_entropy(),
    }
}

/// Resolves every intention in order, bridges gaps between consecutive
/// paths and scores the outcome.
pub(super) fn evaluate(context: &ActContext, variant: usize) -> Result<Hypothesis, ReasoningError> {
    let mut rng = variant_rng(context.seed, variant);
    let slot = variant % context.width.max(1);
    let search = SearchConfig {
        heuristic_weight: WEIGHT_STEP.mul_add(slot as f64, context.search.heuristic_weight),
        ..context.search.clone()
    };
    let lookup = context.lookup.as_ref();
    let walk = &context.walk;

    let mut intentions = context.intentions.clone();
    let mut passages = Vec::new();
    let mut segments = Vec::new();
    let mut nodes_expanded = 0;
    let mut previous_end: Option<NodeId> = None;

    for intention in &mut intentions {
        let start = rotated_start(intention, &context.seeds, variant);
        let path = context.pathfinder.search(start, intention.target, &search)?;
        nodes_expanded += path.nodes_expanded;
        intention.settle(path);
        let Some(path) = &intention.path else {
            continue;
        };
        let (Some(&first), Some(&last)) = (path.nodes.first(), path.nodes.last()) else {
            continue;
        };
        if let Some(end) = previous_end.filter(|&end| end != first) {
            let bridge = context
                .walker
                .bridge(end, first, walk, walk.max_steps, &mut rng)?;
            let interior: Vec<NodeId> = bridge
                .trajectory
                .iter()
                .copied()
                .skip(1)
                .filter(|&node| node != first)
                .collect();
            let texts = node_texts(lookup, &interior)?;
            if !texts.is_empty() {
                let passage = texts.join(" ");
                passages.push(passage.clone());
                segments.push(Segment::passage(passage));
            }
        }
        let texts = node_texts(lookup, &path.nodes)?;
        segments.push(Segment::path(segment(context.intent, &texts), path_marker(&texts)));
        previous_end = Some(last);
    }

    let mut walk_confidence = None;
    let free_passage = context.intent == PromptIntent::Creative || intentions.is_empty();
    if free_passage && !context.seeds.is_empty() {
        let start = context.seeds[variant % context.seeds.len()];
        let mut state = context.walker.init(start, walk.initial_energy)?;
        let generation = context
            .walker
            .walk(&mut state, walk, walk.max_steps, &mut rng)?;
        walk_confidence = Some(generation.mean_confidence);
        if !generation.text.is_empty() {
            passages.push(generation.text.clone());
            segments.push(Segment::passage(generation.text));
        }
    }

    let confidences: Vec<f64> = intentions
        .iter()
        .filter_map(|i| i.path.as_ref())
        .map(Path::normalized_confidence)
        .collect();
    let quality = if intentions.is_empty() {
        walk_confidence.unwrap_or(0.0)
    } else if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    Ok(Hypothesis {
        variant,
        intentions,
        passages,
        segments,
        quality,
        nodes_expanded,
    })
}
