use serde::{Deserialize, Serialize};

use crate::lexicon;

/// One stretch of answer text. Segments taken from a search path carry its
/// `[path: …]` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Answer text.
    pub text: String,
    /// Marker of the path the text came from.
    pub marker: Option<String>,
}

impl Segment {
    /// Walker text with no path behind it.
    #[must_use]
    pub fn passage(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marker: None,
        }
    }

    /// Text read off a search path.
    #[must_use]
    pub fn path(text: impl Into<String>, marker: String) -> Self {
        Self {
            text: text.into(),
            marker: Some(marker),
        }
    }
}

/// Builds the answer one word at a time. Consecutive repeats merge and
/// nothing is added past `max_words`.
#[derive(Debug, Clone)]
pub struct Assembler {
    words: Vec<String>,
    markers: Vec<String>,
    max_words: usize,
}

impl Assembler {
    /// Empty answer capped at `max_words`.
    #[must_use]
    pub const fn new(max_words: usize) -> Self {
        Self {
            words: Vec::new(),
            markers: Vec::new(),
            max_words,
        }
    }

    /// Word cap reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.words.len() >= self.max_words
    }

    /// Words assembled so far.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Markers of the segments assembly has reached.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Appends the words of `segment`, handing each to `on_word` as soon as
    /// it is added. Returns `false` the moment `on_word` does; the rest of
    /// the segment is left unassembled.
    pub fn push<F>(&mut self, segment: &Segment, on_word: &mut F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        if self.is_full() {
            return true;
        }
        if let Some(marker) = &segment.marker {
            self.markers.push(marker.clone());
        }
        for word in segment.text.split_whitespace() {
            if self.is_full() {
                break;
            }
            if self.words.last().is_some_and(|last| lexicon::same_word(last, word)) {
                continue;
            }
            self.words.push(word.to_string());
            if !on_word(word) {
                return false;
            }
        }
        true
    }

    /// Assembled text, with markers appended when `annotate` is set.
    #[must_use]
    pub fn finish(self, annotate: bool) -> String {
        let body = self.words.join(" ");
        if annotate {
            with_markers(body, &self.markers)
        } else {
            body
        }
    }
}

/// `[path: A→B→C]` marker for a sequence of node texts.
#[must_use]
pub fn path_marker(texts: &[String]) -> String {
    format!("[path: {}]", texts.join("→"))
}

/// Appends markers after the body, separated by spaces.
#[must_use]
pub fn with_markers(body: String, markers: &[String]) -> String {
    markers.iter().fold(body, |mut text, marker| {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(marker);
        text
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stitch(texts: &[&str], max_words: usize) -> String {
        let mut assembler = Assembler::new(max_words);
        for &text in texts {
            assert!(assembler.push(&Segment::passage(text), &mut |_: &str| true));
        }
        assembler.finish(false)
    }

    #[test]
    fn stitching_merges_and_trims() {
        let segments = ["Paris", "Paris is lovely", "in spring"];
        assert_eq!(stitch(&segments, 10), "Paris is lovely in spring");
        assert_eq!(stitch(&segments, 3), "Paris is lovely");
        assert_eq!(stitch(&[], 3), "");
    }

    #[test]
    fn markers_follow_the_body() {
        let marker = path_marker(&["France".to_string(), "Paris".to_string()]);
        assert_eq!(marker, "[path: France→Paris]");
        assert_eq!(
            with_markers("Paris".into(), &[marker.clone()]),
            "Paris [path: France→Paris]"
        );
        assert_eq!(with_markers(String::new(), &[marker]), "[path: France→Paris]");
    }

    #[test]
    fn refused_word_halts_assembly() {
        let segments = vec![
            Segment::path("Paris is", "[path: France→Paris]".into()),
            Segment::passage("lovely"),
            Segment::path("in spring", "[path: Paris→spring]".into()),
        ];
        let mut offered = Vec::new();
        let mut assembler = Assembler::new(10);
        let mut on_word = |word: &str| {
            offered.push(word.to_string());
            offered.len() < 2
        };
        let mut reached = 0;
        for segment in &segments {
            reached += 1;
            if !assembler.push(segment, &mut on_word) {
                break;
            }
        }
        assert_eq!(reached, 1);
        assert_eq!(offered, vec!["Paris", "is"]);
        assert_eq!(assembler.word_count(), 2);
        assert_eq!(assembler.markers(), ["[path: France→Paris]"]);
        assert_eq!(assembler.finish(true), "Paris is [path: France→Paris]");
    }

    #[test]
    fn segments_past_the_cap_leave_no_marker() {
        let segments = vec![
            Segment::path("France Paris", "[path: France→Paris]".into()),
            Segment::path("Lyon", "[path: France→Lyon]".into()),
        ];
        let mut assembler = Assembler::new(2);
        for segment in &segments {
            assert!(assembler.push(segment, &mut |_: &str| true));
        }
        assert!(assembler.is_full());
        assert_eq!(assembler.finish(true), "France Paris [path: France→Paris]");
    }
}
