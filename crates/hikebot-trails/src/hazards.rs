//! Keyword scan over trip-report or chat text.

use once_cell::sync::Lazy;

use crate::matching::KeywordSet;

const SNOW_WORDS: &[&str] = &[
    "snow",
    "snowy",
    "ice",
    "icy",
    "microspikes",
    "spikes",
    "crampons",
];
const MUD_WORDS: &[&str] = &["mud", "muddy", "slippery"];
const WILDLIFE_WORDS: &[&str] = &["bear", "bears", "cougar", "cougars", "goat", "goats"];
const BUG_WORDS: &[&str] = &["bug", "bugs", "mosquito", "mosquitos", "mosquitoes", "flies"];

/// Checked in order; each rule contributes at most one note.
static HAZARD_RULES: Lazy<[(KeywordSet, &str); 4]> = Lazy::new(|| {
    [
        (
            KeywordSet::new(SNOW_WORDS),
            "Snow/Ice detected (Spikes recommended)",
        ),
        (
            KeywordSet::new(MUD_WORDS),
            "Muddy trail (Gaiters/Boots recommended)",
        ),
        (KeywordSet::new(WILDLIFE_WORDS), "Wildlife activity reported"),
        (KeywordSet::new(BUG_WORDS), "Bugs reported (Bug spray needed)"),
    ]
});

/// Returns hazard notes in a fixed order: snow/ice, mud, wildlife, bugs.
pub fn check_hazards<S: AsRef<str>>(reports: &[S]) -> Vec<String> {
    HAZARD_RULES
        .iter()
        .filter(|(words, _)| reports.iter().any(|r| words.is_match(r.as_ref())))
        .map(|(_, note)| note.to_string())
        .collect()
}
