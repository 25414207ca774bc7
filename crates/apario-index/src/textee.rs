//! Text analysis over one page of OCR output: surface words mapped to their
//! gematria transforms, plus raw token counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gematria::Gematria;

/// Analysis of a single page's text. `gematrias` maps each distinct surface
/// word (lowercased, stripped of surrounding punctuation) to its transforms;
/// `substrings` counts the raw whitespace-delimited tokens as they appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Textee {
    pub input: String,
    pub gematrias: BTreeMap<String, Gematria>,
    pub substrings: BTreeMap<String, u32>,
}

impl Textee {
    /// Analyze `input`. Pure and deterministic: the same text always yields
    /// the same maps regardless of platform locale (Unicode lowercase is the
    /// pinned folding rule).
    pub fn new(input: &str) -> Self {
        let mut substrings: BTreeMap<String, u32> = BTreeMap::new();
        let mut gematrias: BTreeMap<String, Gematria> = BTreeMap::new();
        for raw in input.split_whitespace() {
            let token = raw.to_lowercase();
            *substrings.entry(token.clone()).or_insert(0) += 1;
            let word: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
            if word.is_empty() || !word.chars().any(|c| c.is_alphabetic()) {
                continue;
            }
            gematrias
                .entry(word.clone())
                .or_insert_with(|| Gematria::of(&word));
        }
        Textee {
            input: input.to_string(),
            gematrias,
            substrings,
        }
    }

    /// When analysis produced no surface words but did see substrings (pages
    /// of pure digits or punctuation), index the substrings themselves.
    pub fn backfill_from_substrings(&mut self) {
        if !self.gematrias.is_empty() || self.substrings.is_empty() {
            return;
        }
        for sub in self.substrings.keys() {
            self.gematrias.insert(sub.clone(), Gematria::of(sub));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_counts_and_lowercases() {
        let t = Textee::new("Alpha beta alpha.\nGamma");
        assert_eq!(t.substrings.get("alpha"), Some(&1));
        assert_eq!(t.substrings.get("alpha."), Some(&1));
        assert_eq!(t.substrings.get("beta"), Some(&1));
        assert_eq!(t.substrings.get("gamma"), Some(&1));
        // "Alpha" and "alpha." fold to the same surface word.
        assert_eq!(t.gematrias.len(), 3);
        assert!(t.gematrias.contains_key("alpha"));
        assert_eq!(t.gematrias["alpha"], Gematria::of("alpha"));
    }

    #[test]
    fn numeric_tokens_are_not_words() {
        let t = Textee::new("1234 5678");
        assert!(t.gematrias.is_empty());
        assert_eq!(t.substrings.len(), 2);
    }

    #[test]
    fn backfill_kicks_in_for_wordless_pages() {
        let mut t = Textee::new("12 34 12");
        assert!(t.gematrias.is_empty());
        t.backfill_from_substrings();
        assert_eq!(t.gematrias.len(), 2);
        assert_eq!(t.gematrias["12"], Gematria::of("12"));
    }

    #[test]
    fn backfill_is_a_noop_when_words_exist() {
        let mut t = Textee::new("alpha 99");
        let before = t.gematrias.clone();
        t.backfill_from_substrings();
        assert_eq!(t.gematrias, before);
    }

    #[test]
    fn deterministic() {
        let a = Textee::new("The quick brown fox. THE QUICK!");
        let b = Textee::new("The quick brown fox. THE QUICK!");
        assert_eq!(a, b);
    }
}
