//! Word segmentation over a frequency-ranked dictionary
//!
//! Some hosts encode media identity only as a concatenated-word slug with no
//! delimiter (`purplechickenmonkey`). This module splits such slugs into the
//! most probable word sequence under a Zipf-weighted dictionary: the cost of
//! a word at rank `r` in a dictionary of `n` words is `ln((r + 1) * ln(n))`,
//! and the split minimizing total cost wins.
//!
//! The model is immutable and explicitly constructed — it is loaded once at
//! startup and passed to the resolver rules that need it.

use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;

/// Cost assigned to a character that is not part of any dictionary word
///
/// High enough that any real word beats a run of unknown characters, but
/// finite so segmentation always completes. Adjacent unknown characters are
/// merged back into a single token after the split.
const UNKNOWN_CHAR_COST: f64 = 1.0e3;

/// Immutable word-frequency model for slug segmentation
#[derive(Debug, Clone)]
pub struct LanguageModel {
    costs: HashMap<String, f64>,
    max_word_len: usize,
}

impl LanguageModel {
    /// Build a model from words ordered most-frequent-first
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        let n = words.len().max(2) as f64;
        let mut costs = HashMap::with_capacity(words.len());
        let mut max_word_len = 1;
        for (rank, word) in words.into_iter().enumerate() {
            max_word_len = max_word_len.max(word.chars().count());
            // First insert wins: earlier rank means cheaper, keep it.
            costs
                .entry(word)
                .or_insert(((rank as f64 + 1.0) * n.ln()).ln());
        }
        Self {
            costs,
            max_word_len,
        }
    }

    /// Load a model from a plain-text word list, one word per line,
    /// most frequent first
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_words(raw.lines()))
    }

    /// A model with no dictionary
    ///
    /// Splitting against it returns the whole slug as a single token, so
    /// slug-derived rules degrade to first-letter capitalization.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            costs: HashMap::new(),
            max_word_len: 1,
        }
    }

    /// Split a slug into the most probable sequence of dictionary words
    ///
    /// Substrings that match no dictionary word are passed through as single
    /// merged tokens rather than dropped.
    #[must_use]
    pub fn split(&self, slug: &str) -> Vec<String> {
        let chars: Vec<char> = slug.to_lowercase().chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        // best[i] = minimal cost of segmenting chars[..i]; cut[i] = start of
        // the final token in that segmentation.
        let len = chars.len();
        let mut best = vec![0.0_f64; len + 1];
        let mut cut = vec![0_usize; len + 1];
        for i in 1..=len {
            let window_start = i.saturating_sub(self.max_word_len);
            let mut chosen = (best[i - 1] + UNKNOWN_CHAR_COST, i - 1);
            for j in window_start..i {
                let candidate: String = chars[j..i].iter().collect();
                if let Some(&cost) = self.costs.get(&candidate) {
                    let total = best[j] + cost;
                    if total < chosen.0 {
                        chosen = (total, j);
                    }
                }
            }
            best[i] = chosen.0;
            cut[i] = chosen.1;
        }

        // Walk the cuts backwards, then merge adjacent out-of-dictionary
        // tokens so an unknown region comes out as one token.
        let mut tokens: Vec<(String, bool)> = Vec::new();
        let mut end = len;
        while end > 0 {
            let start = cut[end];
            let token: String = chars[start..end].iter().collect();
            let known = self.costs.contains_key(&token);
            tokens.push((token, known));
            end = start;
        }
        tokens.reverse();

        let mut merged: Vec<String> = Vec::with_capacity(tokens.len());
        let mut last_unknown = false;
        for (token, known) in tokens {
            if !known && last_unknown {
                if let Some(tail) = merged.last_mut() {
                    tail.push_str(&token);
                    continue;
                }
            }
            last_unknown = !known;
            merged.push(token);
        }
        merged
    }

    /// Segment a slug and re-join it in title-cased form
    ///
    /// The first character of each of the first three words is uppercased,
    /// later words are left as segmented, and everything is concatenated
    /// with no delimiter: `purplechickenmonkey` -> `PurpleChickenMonkey`.
    #[must_use]
    pub fn camel_slug(&self, slug: &str) -> String {
        let mut out = String::with_capacity(slug.len());
        for (idx, word) in self.split(slug).into_iter().enumerate() {
            if idx < 3 {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            } else {
                out.push_str(&word);
            }
        }
        out
    }
}
