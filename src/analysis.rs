// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Frequency based keywords and extractive summaries

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::AnalysisConfig;

/// Keywords and summary for one text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAnalysis {
    /// Most frequent tokens, highest count first
    pub keywords: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct KeywordSummarizer {
    keyword_count: usize,
    summary_sentences: usize,
    min_token_length: usize,
    stopwords: HashSet<String>,
}

impl KeywordSummarizer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            keyword_count: config.keyword_count,
            summary_sentences: config.summary_sentences.max(1),
            min_token_length: config.min_token_length,
            stopwords: config.stopwords.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn analyze(&self, text: &str) -> TextAnalysis {
        if text.trim().is_empty() {
            return TextAnalysis::default();
        }

        let frequencies = self.frequencies(text);
        TextAnalysis {
            keywords: self.top_keywords(&frequencies),
            summary: self.summarize(text, &frequencies),
        }
    }

    /// Lowercased tokens with stopwords and short tokens removed
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let normalized: String = text
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
            .collect::<String>()
            .to_lowercase();

        normalized
            .split_whitespace()
            .map(str::to_string)
            .filter(|t| t.chars().count() >= self.min_token_length && !self.stopwords.contains(t))
            .collect()
    }

    fn frequencies(&self, text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for token in self.tokens(text) {
            *counts.entry(token).or_insert(0) += 1;
        }
        counts
    }

    /// Count descending, ties broken by token ascending
    fn top_keywords(&self, frequencies: &HashMap<String, usize>) -> Vec<String> {
        let mut ranked: Vec<(&String, &usize)> = frequencies.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(self.keyword_count)
            .map(|(token, _)| token.clone())
            .collect()
    }

    /// Highest scoring sentences, kept in source order
    fn summarize(&self, text: &str, frequencies: &HashMap<String, usize>) -> String {
        let sentences = split_sentences(text);
        if sentences.len() < 2 || sentences.len() <= self.summary_sentences {
            return sentences.join(" ");
        }

        let mut scored: Vec<(usize, usize)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let score = self.tokens(s).iter().map(|t| frequencies.get(t).copied().unwrap_or(0)).sum::<usize>();
                (i, score)
            })
            .collect();

        // Stable sort keeps earlier sentences ahead on equal scores
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut chosen: Vec<usize> = scored
            .into_iter()
            .take(self.summary_sentences)
            .map(|(i, _)| i)
            .collect();
        chosen.sort_unstable();

        chosen
            .into_iter()
            .map(|i| sentences[i].as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for KeywordSummarizer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

/// Split on `.`, `!` or `?` followed by whitespace or the end of text.
///
/// Whitespace is collapsed first; terminators stay with their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();

    let mut sentences = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        current.push(c);
        let is_terminator = matches!(c, '.' | '!' | '?');
        let at_boundary = chars.get(i + 1).map_or(true, |next| next.is_whitespace());
        if is_terminator && at_boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}
