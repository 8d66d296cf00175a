//! Fuzzy trail-name matching.
//!
//! Names typed in chat rarely match the catalog exactly ("mailbox" for
//! "Mailbox Peak", "rattlesnake ledg"), so candidates are scored with a
//! normalised Levenshtein similarity, with whole-word containment treated
//! as a strong match.

use regex::Regex;

/// Score given to a candidate that contains the query as whole words (or vice versa).
const CONTAINMENT_SCORE: f64 = 0.9;

/// Case-insensitive whole-word match against a fixed list of words or phrases.
///
/// "ice" matches "Ice on the bridge" but not "nice" or "icefield".
#[derive(Debug, Clone)]
pub struct KeywordSet {
    pattern: Regex,
}

impl KeywordSet {
    pub fn new(words: &[&str]) -> Self {
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .unwrap_or_else(|e| panic!("invalid keyword pattern: {e}"));
        Self { pattern }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Lowercase, strip punctuation and collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    let mut prev: Vec<usize> = (0..=s2_chars.len()).collect();
    let mut curr = vec![0; s2_chars.len() + 1];

    for (i, c1) in s1_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[s2_chars.len()]
}

/// `1 - distance / max_len`, in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let max_len = a.chars().count().max(b.chars().count()) as f64;
    1.0 - levenshtein_distance(a, b) as f64 / max_len
}

fn contains_words(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let padded = format!(" {haystack} ");
    padded.contains(&format!(" {needle} "))
}

/// Match score between free text and a candidate name.
pub fn match_score(query: &str, candidate: &str) -> f64 {
    let q = normalize(query);
    let c = normalize(candidate);
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }

    let mut score = similarity(&q, &c);
    if contains_words(&c, &q) || contains_words(&q, &c) {
        score = score.max(CONTAINMENT_SCORE);
    }
    score
}

/// Best-scoring candidate strictly above `threshold`. Ties keep the first candidate.
pub fn best_match<'a, T, I>(query: &str, candidates: I, threshold: f64) -> Option<(&'a T, f64)>
where
    I: IntoIterator<Item = (&'a str, &'a T)>,
{
    let mut best: Option<(&'a T, f64)> = None;
    for (name, item) in candidates {
        let score = match_score(query, name);
        if score > threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((item, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_punctuation_and_case() {
        assert_eq!(normalize("  Mount   Rainier (Skyline Trail) "), "mount rainier skyline trail");
    }

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn containment_beats_raw_distance() {
        assert!(match_score("mailbox", "Mailbox Peak") >= 0.9);
        assert!(match_score("Mount Si", "Mount Si") > 0.99);
        assert!(match_score("si", "Mount Si") >= 0.9);
        // partial words are not containment
        assert!(match_score("ma", "Mailbox Peak") < 0.5);
    }

    #[test]
    fn best_match_respects_threshold() {
        let names = ["Mailbox Peak", "Lake Serene", "Mount Si"];
        let items: Vec<(&str, &&str)> = names.iter().map(|n| (*n, n)).collect();

        let (hit, _) = best_match("lake serine", items.clone(), 0.7).unwrap();
        assert_eq!(*hit, "Lake Serene");

        assert!(best_match("Half Dome", items, 0.7).is_none());
    }

    #[test]
    fn keyword_sets_match_whole_words_and_phrases() {
        let words = KeywordSet::new(&["car", "let's go"]);
        assert!(words.is_match("I have a CAR"));
        assert!(words.is_match("ok, let's go!"));
        assert!(!words.is_match("that descent was scary"));
        assert!(!words.is_match("carpool later"));
    }
}
