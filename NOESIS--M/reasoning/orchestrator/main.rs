//! Observe → Orient → Decide → Act → Reflect → Assemble.

/// Segment stitching and path markers.
pub mod assemble;
/// Parallel hypothesis evaluation.
pub mod hypothesis;
/// Keyword, seed and intent extraction.
pub mod observe;
/// Intention prioritization.
pub mod plan;
/// Call results and traces.
pub mod result;

use std::sync::Arc;

use noesis_graph::{CacheStats, CachedLookup, Lookup, Neighbor};
use serde_json::{json, Value};
use shared_logging::LogLevel;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    config::ReasoningConfig,
    decomposer::{evidence::edge_strength, Decomposer, DecompositionPlan, ProblemDecomposer},
    error::ReasoningError,
    lexicon,
    pathfinder::{AStarPathFinder, PathFinder, SearchConfig},
    telemetry::ReasoningTelemetry,
    walker::{GenerativeWalker, Walker},
};
use assemble::{path_marker, Assembler, Segment};
use hypothesis::{act, node_texts, ActContext};
use observe::{observe, Observation};
use plan::decide;

pub use hypothesis::Hypothesis;
pub use observe::Seed;
pub use plan::Intention;
pub use result::{ReasoningResult, ReasoningTrace};

/// Builder for [`ReasoningOrchestrator`]. Engines left unset default to the
/// graph-backed implementations over the shared cache.
pub struct ReasoningOrchestratorBuilder {
    lookup: Arc<dyn Lookup>,
    cache_capacity: usize,
    decomposer: Option<Arc<dyn Decomposer>>,
    pathfinder: Option<Arc<dyn PathFinder>>,
    walker: Option<Arc<dyn Walker>>,
    telemetry: Option<ReasoningTelemetry>,
}

impl ReasoningOrchestratorBuilder {
    /// Starts a builder over the graph store.
    #[must_use]
    pub fn new(lookup: Arc<dyn Lookup>) -> Self {
        Self {
            lookup,
            cache_capacity: ReasoningConfig::default().cache_capacity,
            decomposer: None,
            pathfinder: None,
            walker: None,
            telemetry: None,
        }
    }

    /// Entries per text/position cache.
    #[must_use]
    pub const fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Replaces the decomposer.
    #[must_use]
    pub fn decomposer(mut self, decomposer: Arc<dyn Decomposer>) -> Self {
        self.decomposer = Some(decomposer);
        self
    }

    /// Replaces the pathfinder.
    #[must_use]
    pub fn pathfinder(mut self, pathfinder: Arc<dyn PathFinder>) -> Self {
        self.pathfinder = Some(pathfinder);
        self
    }

    /// Replaces the walker.
    #[must_use]
    pub fn walker(mut self, walker: Arc<dyn Walker>) -> Self {
        self.walker = Some(walker);
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: ReasoningTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Wraps the store in a cache and fills in default engines.
    #[must_use]
    pub fn build(self) -> ReasoningOrchestrator {
        let cache = Arc::new(CachedLookup::new(self.lookup, self.cache_capacity));
        let lookup: Arc<dyn Lookup> = cache.clone();
        let pathfinder = self
            .pathfinder
            .unwrap_or_else(|| Arc::new(AStarPathFinder::new(Arc::clone(&lookup))));
        let walker = self
            .walker
            .unwrap_or_else(|| Arc::new(GenerativeWalker::new(Arc::clone(&lookup))));
        ReasoningOrchestrator {
            lookup,
            cache,
            decomposer: self.decomposer,
            pathfinder,
            walker,
            telemetry: self.telemetry,
        }
    }
}

/// Multi-hypothesis reasoning over a knowledge graph.
pub struct ReasoningOrchestrator {
    lookup: Arc<dyn Lookup>,
    cache: Arc<CachedLookup>,
    decomposer: Option<Arc<dyn Decomposer>>,
    pathfinder: Arc<dyn PathFinder>,
    walker: Arc<dyn Walker>,
    telemetry: Option<ReasoningTelemetry>,
}

impl ReasoningOrchestrator {
    /// Orchestrator with default engines sized by `config`.
    #[must_use]
    pub fn new(lookup: Arc<dyn Lookup>, config: &ReasoningConfig) -> Self {
        ReasoningOrchestratorBuilder::new(lookup)
            .cache_capacity(config.cache_capacity)
            .build()
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder(lookup: Arc<dyn Lookup>) -> ReasoningOrchestratorBuilder {
        ReasoningOrchestratorBuilder::new(lookup)
    }

    /// Hit/miss counters of the shared cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Full reasoning cycle.
    #[instrument(skip_all, fields(prompt_words = prompt.split_whitespace().count()))]
    pub async fn reason(
        &self,
        prompt: &str,
        config: &ReasoningConfig,
    ) -> Result<ReasoningResult, ReasoningError> {
        config.validate()?;
        let call = Uuid::new_v4();
        let deliberation = self.deliberate(call, prompt, config).await?;
        Ok(self.assemble(call, deliberation, config, |_| true))
    }

    /// Reasons up to the chosen hypothesis, then assembles the answer one
    /// word at a time, handing each word to `on_token` as it is produced.
    /// Returning `false` stops assembly on the spot; the result then holds
    /// exactly the delivered words and is marked cancelled.
    #[instrument(skip_all, fields(prompt_words = prompt.split_whitespace().count()))]
    pub async fn reason_stream<F>(
        &self,
        prompt: &str,
        on_token: F,
        config: &ReasoningConfig,
    ) -> Result<ReasoningResult, ReasoningError>
    where
        F: FnMut(&str) -> bool + Send,
    {
        config.validate()?;
        let call = Uuid::new_v4();
        let deliberation = self.deliberate(call, prompt, config).await?;
        Ok(self.assemble(call, deliberation, config, on_token))
    }

    /// Direct answer from the strongest neighbor of the first seed, or from
    /// one search between the first two seeds, when confident enough.
    /// Otherwise the full cycle, charged with the expansions already spent.
    #[instrument(skip_all, fields(prompt_words = prompt.split_whitespace().count()))]
    pub async fn quick_answer(
        &self,
        prompt: &str,
        config: &ReasoningConfig,
    ) -> Result<ReasoningResult, ReasoningError> {
        config.validate()?;
        let call = Uuid::new_v4();
        let observation = observe(self.lookup.as_ref(), prompt)?;
        let spent = match self.direct_answer(&observation, config)? {
            Shortcut::Answered(result) => {
                self.emit(
                    call,
                    LogLevel::Info,
                    "reasoning.quick_answer.hit",
                    json!({ "confidence": result.confidence, "expanded": result.nodes_expanded }),
                );
                return Ok(*result);
            }
            Shortcut::Declined { nodes_expanded } => nodes_expanded,
        };
        let deliberation = self.deliberate(call, prompt, config).await?;
        let mut result = self.assemble(call, deliberation, config, |_| true);
        result.nodes_expanded += spent;
        Ok(result)
    }

    /// Observe, Orient, Decide, then Act and Reflect until a hypothesis is
    /// good enough or the rounds run out.
    async fn deliberate(
        &self,
        call: Uuid,
        prompt: &str,
        config: &ReasoningConfig,
    ) -> Result<Deliberation, ReasoningError> {
        let observation = observe(self.lookup.as_ref(), prompt)?;
        self.emit(
            call,
            LogLevel::Info,
            "reasoning.observe.completed",
            json!({
                "intent": observation.intent.label(),
                "keywords": observation.keywords.len(),
                "seeds": observation.seeds.len(),
            }),
        );

        let decomposer = self.decomposer_for(config);
        let problem = prompt.to_string();
        let plan = tokio::task::spawn_blocking(move || decomposer.analyze(&problem)).await??;
        self.emit(
            call,
            LogLevel::Info,
            "reasoning.orient.completed",
            json!({
                "sub_problems": plan.sub_problems.len(),
                "gaps": plan.gaps.len(),
                "solvable": plan.solvable,
            }),
        );

        let intentions = decide(&plan, &observation.seeds, config.max_intentions);
        self.emit(
            call,
            LogLevel::Info,
            "reasoning.decide.completed",
            json!({ "intentions": intentions.len() }),
        );

        let mut deliberation = Deliberation {
            observation,
            plan,
            best: None,
            round_scores: Vec::new(),
            nodes_expanded: 0,
            reflexion_rounds: 0,
        };
        let seeds = deliberation.observation.seed_nodes();
        if intentions.is_empty() && seeds.is_empty() {
            return Ok(deliberation);
        }

        let mut warm = seeds.clone();
        warm.extend(intentions.iter().flat_map(|i| [i.start, i.target]));
        self.cache.preload(&warm)?;

        let base = config.search_config();
        for round in 0..=config.max_reflexion_rounds {
            let context = Arc::new(ActContext {
                lookup: Arc::clone(&self.lookup),
                pathfinder: Arc::clone(&self.pathfinder),
                walker: Arc::clone(&self.walker),
                search: relaxed(&base, round),
                walk: config.walk_params(),
                intent: deliberation.observation.intent,
                seeds: seeds.clone(),
                intentions: intentions.clone(),
                width: config.beam_width,
                seed: config.seed,
            });
            let hypotheses = act(context, round).await?;
            deliberation.nodes_expanded +=
                hypotheses.iter().map(|h| h.nodes_expanded).sum::<usize>();
            deliberation
                .round_scores
                .push(hypotheses.iter().map(|h| h.quality).collect());
            for hypothesis in hypotheses {
                let better = match &deliberation.best {
                    Some(current) => hypothesis.outranks(current),
                    None => true,
                };
                if better {
                    deliberation.best = Some(hypothesis);
                }
            }
            let quality = deliberation.best.as_ref().map_or(0.0, |h| h.quality);
            self.emit(
                call,
                LogLevel::Info,
                "reasoning.act.round_completed",
                json!({
                    "round": round,
                    "quality": quality,
                    "expanded": deliberation.nodes_expanded,
                }),
            );
            if quality >= config.min_path_quality || round == config.max_reflexion_rounds {
                break;
            }
            deliberation.reflexion_rounds += 1;
            self.emit(
                call,
                LogLevel::Warn,
                "reasoning.reflect.retry",
                json!({ "round": round + 1, "quality": quality }),
            );
        }
        Ok(deliberation)
    }

    /// Assemble phase. Every word goes through `on_word` as soon as it is
    /// added; a `false` ends assembly with the words delivered so far.
    fn assemble<F>(
        &self,
        call: Uuid,
        deliberation: Deliberation,
        config: &ReasoningConfig,
        mut on_word: F,
    ) -> ReasoningResult
    where
        F: FnMut(&str) -> bool,
    {
        let Deliberation {
            observation,
            plan,
            best,
            round_scores,
            nodes_expanded,
            reflexion_rounds,
        } = deliberation;
        let mut assembler = Assembler::new(config.max_response_words);
        let mut cancelled = false;
        for segment in best.iter().flat_map(|h| &h.segments) {
            if !assembler.push(segment, &mut on_word) {
                cancelled = true;
                break;
            }
        }
        let words = assembler.word_count();
        let markers = assembler.markers().to_vec();
        let response = assembler.finish(config.enable_trace);
        let (confidence, resolved, total) = best
            .as_ref()
            .map_or((0.0, 0, 0), |h| (h.quality, h.resolved(), h.intentions.len()));

        if cancelled {
            self.emit(
                call,
                LogLevel::Info,
                "reasoning.stream.cancelled",
                json!({ "delivered": words }),
            );
        }
        self.emit(
            call,
            LogLevel::Info,
            "reasoning.assemble.completed",
            json!({
                "words": words,
                "confidence": confidence,
                "resolved": resolved,
                "cancelled": cancelled,
            }),
        );
        ReasoningResult {
            response,
            confidence,
            intentions_resolved: resolved,
            intentions_total: total,
            reflexion_rounds,
            nodes_expanded,
            trace: config
                .enable_trace
                .then(|| trace(&observation, &plan, round_scores, markers)),
            intent: observation.intent,
            cancelled,
            completed_at: chrono::Utc::now(),
        }
    }

    fn direct_answer(
        &self,
        observation: &Observation,
        config: &ReasoningConfig,
    ) -> Result<Shortcut, ReasoningError> {
        let Some(first) = observation.seeds.first() else {
            return Ok(Shortcut::Declined { nodes_expanded: 0 });
        };
        let mut strongest: Option<(Neighbor, String)> = None;
        for edge in self
            .lookup
            .get_neighbors(first.node, config.min_elo, config.min_observations)?
        {
            if edge.id == first.node
                || strongest
                    .as_ref()
                    .is_some_and(|(best, _)| edge_strength(best) >= edge_strength(&edge))
            {
                continue;
            }
            let text = self.lookup.lookup_text(edge.id)?;
            if !text.trim().is_empty() && !lexicon::is_stop_word(&text) {
                strongest = Some((edge, text));
            }
        }
        if let Some((edge, text)) = strongest {
            let confidence = edge.normalized_confidence();
            if confidence >= config.min_path_quality {
                let subject = self.lookup.lookup_text(first.node)?;
                let marker = path_marker(&[subject, text.clone()]);
                let result = quick_result(observation, config, &text, marker, confidence, 0);
                return Ok(Shortcut::Answered(Box::new(result)));
            }
        }

        let [from, to, ..] = observation.seeds.as_slice() else {
            return Ok(Shortcut::Declined { nodes_expanded: 0 });
        };
        let path = self
            .pathfinder
            .search(from.node, to.node, &config.search_config())?;
        let confidence = path.normalized_confidence();
        if !path.found || confidence < config.min_path_quality {
            return Ok(Shortcut::Declined {
                nodes_expanded: path.nodes_expanded,
            });
        }
        let texts = node_texts(self.lookup.as_ref(), &path.nodes)?;
        let answer = texts.get(1..).unwrap_or_default().join(" ");
        let marker = path_marker(&texts);
        Ok(Shortcut::Answered(Box::new(quick_result(
            observation,
            config,
            &answer,
            marker,
            confidence,
            path.nodes_expanded,
        ))))
    }

    fn decomposer_for(&self, config: &ReasoningConfig) -> Arc<dyn Decomposer> {
        self.decomposer.clone().unwrap_or_else(|| {
            Arc::new(ProblemDecomposer::new(
                Arc::clone(&self.lookup),
                config.decomposer_config(),
            ))
        })
    }

    fn emit(&self, call: Uuid, level: LogLevel, event_type: &str, payload: Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log_call(call, level, event_type, payload.clone());
            let _ = telemetry.event(event_type, payload);
        }
    }
}

/// State handed from Reflect to Assemble.
struct Deliberation {
    observation: Observation,
    plan: DecompositionPlan,
    best: Option<Hypothesis>,
    round_scores: Vec<Vec<f64>>,
    nodes_expanded: usize,
    reflexion_rounds: usize,
}

/// Outcome of the quick-answer fast path.
enum Shortcut {
    Answered(Box<ReasoningResult>),
    Declined { nodes_expanded: usize },
}

/// Reflexion rounds relax the edge filter and widen the expansion budget.
fn relaxed(base: &SearchConfig, round: usize) -> SearchConfig {
    let halvings = i32::try_from(round).unwrap_or(i32::MAX);
    SearchConfig {
        min_elo: base.min_elo / 2f64.powi(halvings),
        max_expansions: base.max_expansions.saturating_mul(round + 1),
        ..base.clone()
    }
}

fn trace(
    observation: &Observation,
    plan: &DecompositionPlan,
    round_scores: Vec<Vec<f64>>,
    path_markers: Vec<String>,
) -> ReasoningTrace {
    ReasoningTrace {
        intent: observation.intent,
        keywords: observation.keywords.clone(),
        seeds: observation.seeds.iter().map(|s| s.phrase.clone()).collect(),
        gaps: plan.gaps.iter().map(|g| g.concept.clone()).collect(),
        round_scores,
        path_markers,
    }
}

fn quick_result(
    observation: &Observation,
    config: &ReasoningConfig,
    answer: &str,
    marker: String,
    confidence: f64,
    nodes_expanded: usize,
) -> ReasoningResult {
    let mut assembler = Assembler::new(config.max_response_words);
    assembler.push(&Segment::path(answer, marker), &mut |_: &str| true);
    let markers = assembler.markers().to_vec();
    ReasoningResult {
        response: assembler.finish(config.enable_trace),
        confidence,
        intentions_resolved: 1,
        intentions_total: 1,
        nodes_expanded,
        trace: config.enable_trace.then(|| ReasoningTrace {
            intent: observation.intent,
            keywords: observation.keywords.clone(),
            seeds: observation.seeds.iter().map(|s| s.phrase.clone()).collect(),
            gaps: Vec::new(),
            round_scores: Vec::new(),
            path_markers: markers,
        }),
        ..ReasoningResult::empty(observation.intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexicon::PromptIntent, pathfinder::Path};
    use noesis_graph::{LookupError, MemoryGraph, NodeId, Position};
    use shared_event_bus::MemoryEventBus;
    use std::sync::Mutex;

    fn capital_graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let france = graph.insert_node("France", Position::from_angles(0.3, 0.4, 0.5));
        let paris = graph.insert_node("Paris", Position::from_angles(0.35, 0.45, 0.5));
        let capital = graph.insert_node("capital", Position::from_angles(1.3, 0.4, 0.5));
        graph.connect(france, paris, 2800.0, 60);
        graph.connect(capital, paris, 900.0, 2);
        graph
    }

    fn saga_graph() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let ids: Vec<NodeId> = ["dragons", "breathe", "fire", "across", "mountains"]
            .iter()
            .zip(0..)
            .map(|(text, i)| {
                let t = f64::from(i);
                graph.insert_node(text, Position::from_angles(0.2 + 0.25 * t, 0.6, 0.3))
            })
            .collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], pair[1], 2500.0, 40);
        }
        graph
    }

    fn seeded() -> ReasoningConfig {
        ReasoningConfig {
            seed: Some(7),
            ..ReasoningConfig::default()
        }
    }

    #[tokio::test]
    async fn capital_question_resolves_its_only_intention() {
        let orchestrator = ReasoningOrchestrator::new(Arc::new(capital_graph()), &seeded());
        let result = orchestrator
            .reason("What is the capital of France?", &seeded())
            .await
            .unwrap();
        assert_eq!(result.intent, PromptIntent::Question);
        assert_eq!(result.response, "Paris");
        assert_eq!((result.intentions_resolved, result.intentions_total), (1, 1));
        assert!(result.confidence > seeded().min_path_quality);
        assert_eq!(result.reflexion_rounds, 0);
        assert!(!result.cancelled);
        assert!(result.trace.is_none());
    }

    #[tokio::test]
    async fn trace_records_markers_and_rounds() {
        let config = ReasoningConfig {
            enable_trace: true,
            ..seeded()
        };
        let orchestrator = ReasoningOrchestrator::new(Arc::new(capital_graph()), &config);
        let result = orchestrator
            .reason("What is the capital of France?", &config)
            .await
            .unwrap();
        assert_eq!(result.response, "Paris [path: France→Paris]");
        let trace = result.trace.unwrap();
        assert_eq!(trace.seeds, vec!["capital", "france"]);
        assert_eq!(trace.path_markers, vec!["[path: France→Paris]"]);
        assert_eq!(trace.round_scores.len(), 1);
        assert_eq!(trace.round_scores[0].len(), config.beam_width);
    }

    struct CountingPathFinder {
        budgets: Mutex<Vec<usize>>,
    }

    impl PathFinder for CountingPathFinder {
        fn search_any(
            &self,
            _: NodeId,
            _: &[NodeId],
            config: &SearchConfig,
        ) -> Result<Path, ReasoningError> {
            self.budgets.lock().unwrap().push(config.max_expansions);
            Ok(Path::not_found(1))
        }

        fn search_text(&self, _: &str, _: &str, _: &SearchConfig) -> Result<Path, ReasoningError> {
            Ok(Path::not_found(0))
        }
    }

    #[tokio::test]
    async fn reflexion_is_bounded() {
        let counting = Arc::new(CountingPathFinder {
            budgets: Mutex::new(Vec::new()),
        });
        let config = ReasoningConfig {
            beam_width: 2,
            max_reflexion_rounds: 2,
            ..seeded()
        };
        let orchestrator = ReasoningOrchestrator::builder(Arc::new(capital_graph()))
            .pathfinder(counting.clone())
            .build();
        let result = orchestrator
            .reason("What is the capital of France?", &config)
            .await
            .unwrap();
        let mut budgets = counting.budgets.lock().unwrap().clone();
        assert_eq!(budgets.len(), 6);
        budgets.dedup();
        assert_eq!(budgets, vec![10_000, 20_000, 30_000]);
        assert_eq!(result.reflexion_rounds, 2);
        assert_eq!((result.intentions_resolved, result.intentions_total), (0, 1));
        assert!(result.confidence.abs() < f64::EPSILON);
        assert_eq!(result.nodes_expanded, 6);
    }

    #[tokio::test]
    async fn streaming_stops_on_the_third_token() {
        let orchestrator = ReasoningOrchestrator::new(Arc::new(saga_graph()), &seeded());
        let full = orchestrator
            .reason("Tell a story about dragons", &seeded())
            .await
            .unwrap();
        assert!(full.response.split_whitespace().count() > 3);

        let mut seen = Vec::new();
        let result = orchestrator
            .reason_stream(
                "Tell a story about dragons",
                |token| {
                    seen.push(token.to_string());
                    seen.len() < 3
                },
                &seeded(),
            )
            .await
            .unwrap();
        assert_eq!(seen.len(), 3);
        assert!(result.cancelled);
        assert_eq!(result.response, seen.join(" "));
    }

    struct NoPlan;

    impl Decomposer for NoPlan {
        fn analyze(&self, problem: &str) -> Result<DecompositionPlan, ReasoningError> {
            Ok(DecompositionPlan {
                problem: problem.to_string(),
                root: None,
                sub_problems: Vec::new(),
                gaps: Vec::new(),
                solvable: true,
                depth_reached: 0,
                nodes_visited: 0,
            })
        }
    }

    fn watershed() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let ids: Vec<NodeId> = ["rain", "river", "sea", "ocean"]
            .iter()
            .zip(0..)
            .map(|(text, i)| {
                let t = f64::from(i);
                graph.insert_node(text, Position::from_angles(0.3 + 0.2 * t, 0.4, 0.5))
            })
            .collect();
        for pair in ids.windows(2) {
            graph.connect(pair[0], pair[1], 2700.0, 80);
        }
        graph
    }

    #[tokio::test]
    async fn cancelling_the_first_token_stops_assembly() {
        let config = ReasoningConfig {
            enable_trace: true,
            ..seeded()
        };
        let orchestrator = ReasoningOrchestrator::builder(Arc::new(watershed()))
            .decomposer(Arc::new(NoPlan))
            .build();
        let full = orchestrator.reason("rain river ocean", &config).await.unwrap();
        assert_eq!(
            full.response,
            "river sea ocean [path: rain→river] [path: river→sea→ocean]"
        );

        let mut offered = 0;
        let result = orchestrator
            .reason_stream(
                "rain river ocean",
                |_| {
                    offered += 1;
                    false
                },
                &config,
            )
            .await
            .unwrap();
        assert_eq!(offered, 1);
        assert!(result.cancelled);
        assert_eq!(result.response, "river [path: rain→river]");
        let trace = result.trace.unwrap();
        assert_eq!(trace.path_markers, vec!["[path: rain→river]"]);
        assert_eq!((result.intentions_resolved, result.intentions_total), (2, 2));
    }

    #[tokio::test]
    async fn declined_shortcut_expansions_are_counted() {
        let chain = || {
            let mut graph = MemoryGraph::new();
            let alpha = graph.insert_node("alpha", Position::from_angles(0.2, 0.4, 0.5));
            let middle = graph.insert_node("middle", Position::from_angles(0.5, 0.4, 0.5));
            let beta = graph.insert_node("beta", Position::from_angles(0.8, 0.4, 0.5));
            graph.connect(alpha, middle, 300.0, 20);
            graph.connect(middle, beta, 300.0, 20);
            graph
        };
        let config = seeded();
        let direct = AStarPathFinder::new(Arc::new(chain()))
            .search_text("alpha", "beta", &config.search_config())
            .unwrap();
        assert!(direct.found);
        assert!(direct.normalized_confidence() < config.min_path_quality);

        let orchestrator = ReasoningOrchestrator::new(Arc::new(chain()), &config);
        let full = orchestrator.reason("alpha beta", &config).await.unwrap();
        let quick = orchestrator.quick_answer("alpha beta", &config).await.unwrap();
        assert!(direct.nodes_expanded > 0);
        assert_eq!(quick.nodes_expanded, full.nodes_expanded + direct.nodes_expanded);
    }

    #[tokio::test]
    async fn creative_prompt_adds_a_free_passage() {
        let orchestrator = ReasoningOrchestrator::new(Arc::new(saga_graph()), &seeded());
        let result = orchestrator
            .reason("Tell a story about dragons", &seeded())
            .await
            .unwrap();
        assert_eq!(result.intent, PromptIntent::Creative);
        assert!(result.response.starts_with("dragons breathe"));
        assert!(result.response.ends_with("mountains"));
        assert!(result.confidence > 0.5);
    }

    #[tokio::test]
    async fn quick_answer_uses_the_strongest_neighbor() {
        let orchestrator = ReasoningOrchestrator::new(Arc::new(capital_graph()), &seeded());
        let result = orchestrator
            .quick_answer("France capital city", &seeded())
            .await
            .unwrap();
        assert_eq!(result.response, "Paris");
        assert_eq!(result.nodes_expanded, 0);
        assert_eq!(result.reflexion_rounds, 0);
    }

    #[tokio::test]
    async fn weak_quick_answer_falls_back_to_the_full_cycle() {
        let mut graph = MemoryGraph::new();
        let france = graph.insert_node("France", Position::from_angles(0.3, 0.4, 0.5));
        let paris = graph.insert_node("Paris", Position::from_angles(0.35, 0.45, 0.5));
        graph.connect(france, paris, 600.0, 1);
        let config = seeded();
        let orchestrator = ReasoningOrchestrator::new(Arc::new(graph), &config);
        let result = orchestrator.quick_answer("France", &config).await.unwrap();
        assert_eq!(result.intentions_resolved, 1);
        assert_eq!(result.reflexion_rounds, config.max_reflexion_rounds);
        assert!(result.confidence < config.min_path_quality);
    }

    #[tokio::test]
    async fn unknown_prompt_is_an_honest_empty_result() {
        let orchestrator = ReasoningOrchestrator::new(Arc::new(MemoryGraph::new()), &seeded());
        let result = orchestrator
            .reason("Why do quasars flicker?", &seeded())
            .await
            .unwrap();
        assert!(result.response.is_empty());
        assert!(result.confidence.abs() < f64::EPSILON);
        assert_eq!((result.intentions_resolved, result.intentions_total), (0, 0));
        assert!(!result.is_grounded());
    }

    #[tokio::test]
    async fn phases_are_published_as_events() {
        let bus = Arc::new(MemoryEventBus::new(64));
        let telemetry = ReasoningTelemetry::builder("reasoning")
            .event_publisher(bus.clone())
            .build()
            .unwrap();
        let orchestrator = ReasoningOrchestrator::builder(Arc::new(capital_graph()))
            .telemetry(telemetry)
            .build();
        orchestrator
            .reason("What is the capital of France?", &seeded())
            .await
            .unwrap();
        for _ in 0..64 {
            if bus.snapshot().len() >= 5 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let types = bus.event_types();
        for expected in [
            "reasoning.observe.completed",
            "reasoning.orient.completed",
            "reasoning.decide.completed",
            "reasoning.act.round_completed",
            "reasoning.assemble.completed",
        ] {
            assert!(types.iter().any(|t| t == expected), "missing {expected}");
        }
        assert!(orchestrator.cache_stats().hits > 0);
    }

    struct FailingLookup;

    impl Lookup for FailingLookup {
        fn lookup_text(&self, _: NodeId) -> Result<String, LookupError> {
            Err(LookupError::Unavailable("down".into()))
        }
        fn lookup_position(&self, _: NodeId) -> Result<Option<Position>, LookupError> {
            Err(LookupError::Unavailable("down".into()))
        }
        fn get_neighbors(&self, _: NodeId, _: f64, _: u64) -> Result<Vec<Neighbor>, LookupError> {
            Err(LookupError::Unavailable("down".into()))
        }
        fn find_node(&self, _: &str) -> Result<Option<NodeId>, LookupError> {
            Err(LookupError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let orchestrator = ReasoningOrchestrator::new(Arc::new(FailingLookup), &seeded());
        let err = orchestrator
            .reason("What is the capital of France?", &seeded())
            .await
            .unwrap_err();
        assert!(matches!(err, ReasoningError::Lookup(_)));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_up_front() {
        let orchestrator = ReasoningOrchestrator::new(Arc::new(capital_graph()), &seeded());
        let config = ReasoningConfig {
            beam_width: 0,
            ..seeded()
        };
        let err = orchestrator.reason("France", &config).await.unwrap_err();
        assert!(matches!(err, ReasoningError::InvalidConfig(_)));
    }
}
