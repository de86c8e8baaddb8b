//! Text normalization and TF-IDF cosine similarity for SQL comparison.

use std::collections::{HashMap, HashSet};

/// Lowercase and collapse all whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// TF-IDF cosine similarity over the two-document corpus `{a, b}`.
///
/// Tokens are runs of two or more word characters; term weights use the
/// smoothed idf `ln((1 + n) / (1 + df)) + 1` and l2-normalized vectors.
/// Either document tokenizing to nothing yields 0.0.
pub fn tfidf_cosine_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let counts_a = term_counts(&tokens_a);
    let counts_b = term_counts(&tokens_b);
    let vocabulary: HashSet<&str> = counts_a.keys().chain(counts_b.keys()).copied().collect();

    // Two documents in the corpus: df is 1 or 2 per term.
    let n = 2.0_f64;
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for term in vocabulary {
        let tf_a = counts_a.get(term).copied().unwrap_or(0) as f64;
        let tf_b = counts_b.get(term).copied().unwrap_or(0) as f64;
        let df = (tf_a > 0.0) as u32 + (tf_b > 0.0) as u32;
        let idf = ((1.0 + n) / (1.0 + f64::from(df))).ln() + 1.0;
        let w_a = tf_a * idf;
        let w_b = tf_b * idf;
        dot += w_a * w_b;
        norm_a += w_a * w_a;
        norm_b += w_b * w_b;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Word tokens of length two or more, lowercased.
fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in lowered.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            current.push(ch);
        } else if !current.is_empty() {
            if current.chars().count() >= 2 {
                tokens.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if current.chars().count() >= 2 {
        tokens.push(current);
    }
    tokens
}

fn term_counts(tokens: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    counts
}
