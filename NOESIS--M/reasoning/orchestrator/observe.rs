use std::collections::HashSet;

use noesis_graph::{Lookup, NodeId};
use serde::{Deserialize, Serialize};

use crate::{
    error::ReasoningError,
    lexicon::{self, PromptIntent},
};

/// Prompt phrase resolved to a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    /// Resolved node.
    pub node: NodeId,
    /// Phrase that resolved.
    pub phrase: String,
}

/// What the Observe phase extracted from a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Question or creative.
    pub intent: PromptIntent,
    /// Content words in first-seen order.
    pub keywords: Vec<String>,
    /// Seed nodes, bigrams before unigrams.
    pub seeds: Vec<Seed>,
}

impl Observation {
    /// Seed nodes only.
    #[must_use]
    pub fn seed_nodes(&self) -> Vec<NodeId> {
        self.seeds.iter().map(|seed| seed.node).collect()
    }
}

/// Extracts keywords, resolves seeds and classifies intent.
///
/// A unigram is skipped when a resolved bigram already covers it, so
/// "new york" does not also seed "new" and "york".
pub fn observe(lookup: &dyn Lookup, prompt: &str) -> Result<Observation, ReasoningError> {
    let keywords = lexicon::extract_keywords(prompt);
    let mut seeds: Vec<Seed> = Vec::new();
    let mut nodes = HashSet::new();
    let mut covered: HashSet<String> = HashSet::new();
    for phrase in lexicon::candidate_phrases(prompt) {
        let is_bigram = phrase.contains(' ');
        if !is_bigram && covered.contains(&phrase) {
            continue;
        }
        let Some(node) = lookup.find_node(&phrase)? else {
            continue;
        };
        if is_bigram {
            covered.extend(phrase.split(' ').map(str::to_string));
        }
        if nodes.insert(node) {
            seeds.push(Seed { node, phrase });
        }
    }
    Ok(Observation {
        intent: lexicon::classify_intent(prompt),
        keywords,
        seeds,
    })
}
