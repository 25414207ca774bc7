// Copyright 2025 Apario Search Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The six numeric transforms tracked for every indexed word.

use serde::{Deserialize, Serialize};

/// Names of the transforms, in the order they appear in typed index keys.
pub const GEMATRIA_TYPES: [&str; 6] = [
    "english", "simple", "jewish", "mystery", "majestic", "eights",
];

/// A record of six unsigned numeric transforms of a word. Immutable once
/// computed; only letters contribute, everything else counts zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gematria {
    pub english: u64,
    pub simple: u64,
    pub jewish: u64,
    pub mystery: u64,
    pub majestic: u64,
    pub eights: u64,
}

impl Gematria {
    /// Compute all six transforms of `word`. Input is folded with Unicode
    /// lowercase so that callers and the index builder agree on keys.
    pub fn of(word: &str) -> Self {
        let mut g = Gematria::default();
        for c in word.to_lowercase().chars() {
            let ord = ordinal(c);
            if ord == 0 {
                continue;
            }
            g.simple += ord;
            g.english += ord * 6;
            g.eights += ord * 8;
            g.jewish += jewish(c);
            g.mystery += reduced(ord);
            g.majestic += 27 - ord;
        }
        g
    }

    /// Value of the transform named `kind`, if known.
    pub fn get(&self, kind: &str) -> Option<u64> {
        match kind {
            "english" => Some(self.english),
            "simple" => Some(self.simple),
            "jewish" => Some(self.jewish),
            "mystery" => Some(self.mystery),
            "majestic" => Some(self.majestic),
            "eights" => Some(self.eights),
            _ => None,
        }
    }

    /// The six `(type, value)` pairs backing typed index keys.
    pub fn typed_values(&self) -> [(&'static str, u64); 6] {
        [
            ("english", self.english),
            ("simple", self.simple),
            ("jewish", self.jewish),
            ("mystery", self.mystery),
            ("majestic", self.majestic),
            ("eights", self.eights),
        ]
    }
}

/// a=1 .. z=26 for ASCII letters, 0 otherwise.
fn ordinal(c: char) -> u64 {
    match c {
        'a'..='z' => c as u64 - 'a' as u64 + 1,
        _ => 0,
    }
}

/// The common Jewish-cipher mapping for latin letters.
fn jewish(c: char) -> u64 {
    match c {
        'a' => 1,
        'b' => 2,
        'c' => 3,
        'd' => 4,
        'e' => 5,
        'f' => 6,
        'g' => 7,
        'h' => 8,
        'i' => 9,
        'j' => 600,
        'k' => 10,
        'l' => 20,
        'm' => 30,
        'n' => 40,
        'o' => 50,
        'p' => 60,
        'q' => 70,
        'r' => 80,
        's' => 90,
        't' => 100,
        'u' => 200,
        'v' => 700,
        'w' => 900,
        'x' => 300,
        'y' => 400,
        'z' => 500,
        _ => 0,
    }
}

/// Pythagorean digit reduction of an ordinal: 1..=9 cycling, 9 stays 9.
fn reduced(ord: u64) -> u64 {
    let r = ord % 9;
    if r == 0 {
        9
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter() {
        let g = Gematria::of("a");
        assert_eq!(g.simple, 1);
        assert_eq!(g.english, 6);
        assert_eq!(g.eights, 8);
        assert_eq!(g.jewish, 1);
        assert_eq!(g.mystery, 1);
        assert_eq!(g.majestic, 26);
    }

    #[test]
    fn sums_over_letters() {
        let g = Gematria::of("abc");
        assert_eq!(g.simple, 6);
        assert_eq!(g.english, 36);
        assert_eq!(g.eights, 48);
        assert_eq!(g.jewish, 6);
        assert_eq!(g.mystery, 6);
        assert_eq!(g.majestic, 26 + 25 + 24);
    }

    #[test]
    fn reduction_wraps_at_nine() {
        // j is the 10th letter and reduces back to 1; r (18th) reduces to 9.
        assert_eq!(Gematria::of("j").mystery, 1);
        assert_eq!(Gematria::of("r").mystery, 9);
        assert_eq!(Gematria::of("z").mystery, 8);
    }

    #[test]
    fn case_folded_and_punctuation_ignored() {
        assert_eq!(Gematria::of("Alpha"), Gematria::of("alpha"));
        assert_eq!(Gematria::of("al-pha!"), Gematria::of("alpha"));
        assert_eq!(Gematria::of("1234"), Gematria::default());
        assert_eq!(Gematria::of(""), Gematria::default());
    }

    #[test]
    fn typed_values_cover_all_types() {
        let g = Gematria::of("word");
        for (kind, value) in g.typed_values() {
            assert_eq!(g.get(kind), Some(value));
        }
        assert_eq!(g.get("unknown"), None);
    }
}
