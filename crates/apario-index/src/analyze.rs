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

//! Query analysis: lowering free-form query text into a canonical Boolean
//! form of AND clauses, NOT clauses, and numbered OR groups. The analyzer
//! is pure, deterministic, and total: degenerate input yields an empty
//! analysis, never an error.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Balanced parenthetical groups, one level of nesting deep.
static GROUPING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((?:[^()]+|\([^()]*\))+\)").expect("grouping regex"));

/// The analyzed form of a query. OR groups are numbered from 1 in order of
/// appearance; clauses referencing a group carry its parenthesized interior
/// verbatim.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalysis {
    pub ands: Vec<String>,
    pub nots: Vec<String>,
    pub ors: BTreeMap<u32, String>,
}

impl QueryAnalysis {
    pub fn is_empty(&self) -> bool {
        self.ands.is_empty() && self.nots.is_empty()
    }

    /// Reconstruct a query string that re-analyzes to this analysis.
    pub fn canonical_form(&self) -> String {
        let mut parts = Vec::with_capacity(self.ands.len() + self.nots.len());
        for clause in &self.ands {
            parts.push(format!("and {}", clause));
        }
        for clause in &self.nots {
            parts.push(format!("not {}", clause));
        }
        parts.join(" ")
    }
}

impl PartialEq for QueryAnalysis {
    /// Group ids are positional bookkeeping: two analyses are equal when
    /// their clause lists agree and their group interiors agree as a
    /// multiset, regardless of numbering.
    fn eq(&self, other: &Self) -> bool {
        let mut a: Vec<&str> = self.ors.values().map(String::as_str).collect();
        let mut b: Vec<&str> = other.ors.values().map(String::as_str).collect();
        a.sort_unstable();
        b.sort_unstable();
        self.ands == other.ands && self.nots == other.nots && a == b
    }
}

/// Analyze a free-form query.
pub fn analyze(query: &str) -> QueryAnalysis {
    // Normalize operator spellings and grouping characters.
    let mut q = query.to_lowercase();
    q = q.replace(" && ", " and ");
    q = q.replace(" & ", " and ");
    q = q.replace(" !", " not ");
    q = q.replace(", ", " or ");
    q = q.replace(',', " or ");
    q = q.replace("||", " or ");
    q = q.replace('{', "(");
    q = q.replace('}', ")");
    q = q.replace('[', "(");
    q = q.replace(']', ")");
    q = format!("and {}", q);

    // Lift OR groups out of the token stream.
    let mut ors: BTreeMap<u32, String> = BTreeMap::new();
    let mut or_counter = 0u32;
    let groups: Vec<String> = GROUPING.find_iter(&q).map(|m| m.as_str().to_string()).collect();
    for group in groups {
        if group.contains(" or ") {
            or_counter += 1;
            ors.insert(or_counter, group[1..group.len() - 1].to_string());
            q = q.replacen(&group, &format!("OR_{}", or_counter), 1);
        }
    }

    // Scan tokens under a polarity flag.
    let mut ands: Vec<String> = Vec::new();
    let mut nots: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut add_to_and = true;
    for word in q.split_whitespace() {
        match word {
            "and" => {
                flush(&mut buffer, add_to_and, &mut ands, &mut nots);
                add_to_and = true;
            }
            "not" => {
                flush(&mut buffer, add_to_and, &mut ands, &mut nots);
                add_to_and = false;
            }
            "or" => {} // already lifted into groups
            _ => {
                if let Some(id) = word.strip_prefix("OR_").and_then(|s| s.parse::<u32>().ok()) {
                    flush(&mut buffer, add_to_and, &mut ands, &mut nots);
                    if let Some(interior) = ors.get(&id) {
                        let clause = format!("({})", interior);
                        if add_to_and {
                            ands.push(clause);
                        } else {
                            nots.push(clause);
                        }
                    }
                } else {
                    buffer.push(' ');
                    buffer.push_str(word);
                }
            }
        }
    }
    flush(&mut buffer, add_to_and, &mut ands, &mut nots);

    dedup_preserving(&mut ands);
    dedup_preserving(&mut nots);
    log::debug!(
        "analyzed query: ands={:?} nots={:?} ors={:?}",
        ands,
        nots,
        ors
    );
    QueryAnalysis { ands, nots, ors }
}

fn flush(buffer: &mut String, add_to_and: bool, ands: &mut Vec<String>, nots: &mut Vec<String>) {
    let clause = buffer.trim().to_string();
    buffer.clear();
    if clause.is_empty() {
        return;
    }
    if add_to_and {
        ands.push(clause);
    } else {
        nots.push(clause);
    }
}

fn dedup_preserving(items: &mut Vec<String>) {
    let mut seen = HashSet::new();
    items.retain(|s| seen.insert(s.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_word_is_an_and_clause() {
        let a = analyze("alpha");
        assert_eq!(a.ands, vec!["alpha"]);
        assert!(a.nots.is_empty());
        assert!(a.ors.is_empty());
    }

    #[test]
    fn operator_spellings_normalize() {
        assert_eq!(analyze("alpha && beta"), analyze("alpha and beta"));
        assert_eq!(analyze("alpha & beta"), analyze("alpha and beta"));
        let a = analyze("alpha !beta");
        assert_eq!(a.ands, vec!["alpha"]);
        assert_eq!(a.nots, vec!["beta"]);
    }

    #[test]
    fn commas_and_pipes_become_or_phrases() {
        // Without parentheses no group is lifted; "or" tokens vanish and the
        // clause becomes a phrase.
        let a = analyze("alpha, beta");
        assert_eq!(a.ands, vec!["alpha beta"]);
        assert!(a.ors.is_empty());
        assert_eq!(analyze("alpha || beta"), analyze("alpha, beta"));
    }

    #[test]
    fn braces_and_brackets_group_like_parens() {
        let a = analyze("{alpha or beta}");
        assert_eq!(a.ands, vec!["(alpha or beta)"]);
        assert_eq!(a.ors.get(&1).map(String::as_str), Some("alpha or beta"));
        assert_eq!(analyze("[alpha or beta]"), a);
    }

    #[test]
    fn groups_keep_their_polarity() {
        let a = analyze("(alpha or delta) and not gamma");
        assert_eq!(a.ands, vec!["(alpha or delta)"]);
        assert_eq!(a.nots, vec!["gamma"]);

        let b = analyze("beta not (alpha or delta)");
        assert_eq!(b.ands, vec!["beta"]);
        assert_eq!(b.nots, vec!["(alpha or delta)"]);
    }

    #[test]
    fn group_without_or_stays_literal() {
        let a = analyze("(alpha beta) and gamma");
        assert_eq!(a.ands, vec!["(alpha beta)", "gamma"]);
        assert!(a.ors.is_empty());
    }

    #[test]
    fn duplicates_collapse_preserving_first_occurrence() {
        let a = analyze("alpha and beta and alpha");
        assert_eq!(a.ands, vec!["alpha", "beta"]);
    }

    #[test]
    fn degenerate_inputs_yield_empty_analyses() {
        assert!(analyze("").is_empty());
        assert!(analyze("   ").is_empty());
        assert!(analyze("and and not").is_empty());
    }

    #[test]
    fn unbalanced_parens_never_fail() {
        let a = analyze("(alpha and beta");
        assert_eq!(a.ands, vec!["(alpha", "beta"]);
        let b = analyze("alpha) or beta");
        assert!(!b.is_empty());
    }

    #[test]
    fn only_nots_leave_ands_empty() {
        let a = analyze("not alpha");
        assert!(a.ands.is_empty());
        assert_eq!(a.nots, vec!["alpha"]);
    }

    #[test]
    fn analysis_is_stable_under_canonicalization() {
        for q in [
            "alpha",
            "alpha and beta",
            "alpha, beta",
            "(alpha or delta) and not gamma",
            "not (alpha or beta) and (gamma or delta)",
            "alpha !beta and (x or y)",
        ] {
            let once = analyze(q);
            let twice = analyze(&once.canonical_form());
            assert_eq!(once, twice, "unstable for {:?}", q);
        }
    }
}
