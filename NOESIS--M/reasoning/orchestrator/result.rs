use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lexicon::PromptIntent;

/// Diagnostics of one reasoning call, kept when tracing is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTrace {
    /// Classified intent.
    pub intent: PromptIntent,
    /// Prompt keywords.
    pub keywords: Vec<String>,
    /// Phrases that resolved to seed nodes.
    pub seeds: Vec<String>,
    /// Concepts the graph barely knows.
    pub gaps: Vec<String>,
    /// Hypothesis qualities per Act round.
    pub round_scores: Vec<Vec<f64>>,
    /// `[path: A→B]` markers of the chosen hypothesis.
    pub path_markers: Vec<String>,
}

/// Answer plus honest bookkeeping of how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResult {
    /// Assembled answer.
    pub response: String,
    /// Quality of the chosen hypothesis in `[0, 1]`.
    pub confidence: f64,
    /// Intentions that ended with a found path.
    pub intentions_resolved: usize,
    /// Intentions attempted.
    pub intentions_total: usize,
    /// Act rounds after the first.
    pub reflexion_rounds: usize,
    /// Search expansions across all rounds and hypotheses.
    pub nodes_expanded: usize,
    /// Present when tracing is enabled.
    pub trace: Option<ReasoningTrace>,
    /// Classified intent.
    pub intent: PromptIntent,
    /// Streaming stopped early at the caller's request.
    pub cancelled: bool,
    /// When the call finished.
    pub completed_at: DateTime<Utc>,
}

impl ReasoningResult {
    /// Result for a prompt nothing in the graph relates to.
    #[must_use]
    pub fn empty(intent: PromptIntent) -> Self {
        Self {
            response: String::new(),
            confidence: 0.0,
            intentions_resolved: 0,
            intentions_total: 0,
            reflexion_rounds: 0,
            nodes_expanded: 0,
            trace: None,
            intent,
            cancelled: false,
            completed_at: Utc::now(),
        }
    }

    /// True when at least one intention was resolved by search.
    #[must_use]
    pub const fn is_grounded(&self) -> bool {
        self.intentions_resolved > 0
    }
}
