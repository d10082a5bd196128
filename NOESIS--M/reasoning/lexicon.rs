use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Function words never used as graph seeds or walk tokens.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my", "no", "not", "of",
    "on", "or", "our", "she", "should", "so", "some", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "to", "too", "us", "was", "we", "were",
    "what", "when", "where", "which", "who", "whom", "whose", "why", "will", "with", "would",
    "you", "your",
];

/// Leading words marking a prompt as a question.
const INTERROGATIVES: &[&str] = &[
    "what", "who", "whom", "whose", "where", "when", "why", "how", "which", "is", "are", "was",
    "were", "do", "does", "did", "can", "could", "should", "would", "will", "shall", "may",
];

/// Imperative verbs that ask for generated text. Never seeds.
const IMPERATIVE_CUES: &[&str] = &[
    "write", "tell", "describe", "imagine", "compose", "create", "invent", "narrate", "generate",
];

/// Narrative words that mark a prompt as creative but may still be seeds.
const NARRATIVE_CUES: &[&str] = &["story", "poem", "tale", "once", "dream", "song"];

/// Coarse classification of what the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptIntent {
    /// Expects a grounded answer; resolved by pathfinding.
    Question,
    /// Expects generated narrative; walker-led.
    Creative,
}

impl PromptIntent {
    /// Label used in telemetry and traces.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Creative => "creative",
        }
    }
}

/// True for function words.
#[must_use]
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word.trim().to_lowercase().as_str())
}

/// Lowercased alphanumeric runs of `text`.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_content_word(token: &str) -> bool {
    let meaningful = token.chars().count() > 1 || token.chars().all(|c| c.is_ascii_digit());
    meaningful && !is_stop_word(token) && !IMPERATIVE_CUES.contains(&token)
}

/// Content words of `text` in first-seen order, without duplicates.
#[must_use]
pub fn extract_keywords(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| is_content_word(token))
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Phrases worth resolving against the graph: adjacent content-word pairs
/// first, then single keywords.
#[must_use]
pub fn candidate_phrases(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut phrases = IndexSet::new();
    for pair in tokens.windows(2) {
        if is_content_word(&pair[0]) && is_content_word(&pair[1]) {
            phrases.insert(format!("{} {}", pair[0], pair[1]));
        }
    }
    phrases.extend(extract_keywords(text));
    phrases.into_iter().collect()
}

/// Question vs. creative, from the leading word, a trailing `?`, and
/// imperative or narrative cues.
#[must_use]
pub fn classify_intent(prompt: &str) -> PromptIntent {
    let tokens = tokenize(prompt);
    let leading_interrogative = tokens
        .first()
        .is_some_and(|first| INTERROGATIVES.contains(&first.as_str()));
    if leading_interrogative || prompt.trim_end().ends_with('?') {
        return PromptIntent::Question;
    }
    let creative = tokens.iter().any(|token| {
        IMPERATIVE_CUES.contains(&token.as_str()) || NARRATIVE_CUES.contains(&token.as_str())
    });
    if creative {
        PromptIntent::Creative
    } else {
        PromptIntent::Question
    }
}

/// Case-insensitive word equality.
#[must_use]
pub fn same_word(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Drops a token equal (case-insensitively) to the one before it.
#[must_use]
pub fn dedup_consecutive(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let repeated = out.last().is_some_and(|last| same_word(last, &token));
        if !repeated {
            out.push(token);
        }
    }
    out
}

/// Whitespace-separated words of each text, flattened, with consecutive
/// repeats removed.
#[must_use]
pub fn join_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let words = fragments
        .into_iter()
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect();
    dedup_consecutive(words)
}
