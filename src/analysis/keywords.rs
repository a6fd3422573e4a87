use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Summary used when a document has nothing worth counting
pub const NO_CONTENT_SUMMARY: &str = "No readable text content was found in the document.";

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "in", "to", "of", "and", "is", "for", "with", "on", "it", "that", "this",
    "are", "was", "were", "be", "been", "being", "by", "from", "as", "at", "or", "but", "not",
    "no", "yes", "you", "your", "our", "ours", "we", "they", "them", "their", "his", "her",
    "she", "him", "its", "has", "have", "had", "will", "would", "can", "could", "should",
    "shall", "may", "might", "must", "all", "any", "each", "which", "who", "whom", "what",
    "when", "where", "why", "how", "than", "then", "there", "these", "those", "into", "onto",
    "over", "under", "about", "also", "such", "only", "other", "some", "more", "most", "very",
    "just", "out", "off", "per", "via", "did", "does", "doing", "done", "here", "upon",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Tuning for the keyword fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Shortest token (in characters) that still counts as a word
    pub min_word_len: usize,
    /// Number of keywords kept
    pub top_n: usize,
    /// Number of keywords named in the synthetic summary
    pub summary_words: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            min_word_len: 3,
            top_n: 10,
            summary_words: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordAnalysis {
    pub keywords: Vec<Keyword>,
    pub summary: String,
}

/// Count the most frequent non-trivial words in `text`.
///
/// Keywords come back by descending count; equal counts keep the order in
/// which the words first appeared.
pub fn analyze(text: &str, config: &KeywordConfig) -> KeywordAnalysis {
    let lower = text.to_lowercase();
    let stop = stop_words();

    // word -> (count, first position)
    let mut counts: HashMap<&str, (u32, usize)> = HashMap::new();
    let tokens = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= config.min_word_len)
        .filter(|t| !stop.contains(t))
        .filter(|t| !t.chars().all(|c| c.is_numeric()));

    for (position, token) in tokens.enumerate() {
        counts.entry(token).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, u32, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(config.top_n);

    let keywords: Vec<Keyword> = ranked
        .into_iter()
        .map(|(word, count, _)| Keyword {
            word: word.to_string(),
            count,
        })
        .collect();

    let summary = summarize(&keywords, config.summary_words);
    KeywordAnalysis { keywords, summary }
}

fn summarize(keywords: &[Keyword], words: usize) -> String {
    if keywords.is_empty() {
        return NO_CONTENT_SUMMARY.to_string();
    }
    let named: Vec<&str> = keywords
        .iter()
        .take(words.max(1))
        .map(|k| k.word.as_str())
        .collect();
    format!("Document discusses: {}", named.join(", "))
}
