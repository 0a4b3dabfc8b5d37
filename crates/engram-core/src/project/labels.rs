//! Cluster labelling.
//!
//! Labels come from the words people actually used: the most frequent
//! meaningful tokens in the cluster's conversation titles, falling back to
//! topic tags, and finally to a numbered placeholder.

use std::collections::HashMap;

/// Words that never make a good theme label.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "it", "its", "my", "me", "i", "this", "that", "how", "what", "why", "when",
    "where", "who", "which", "can", "do", "does", "did", "will", "would", "could", "should",
    "be", "been", "being", "have", "has", "had", "help", "about", "using", "get", "got", "make",
    "making", "made", "just", "like", "also", "so", "up", "out", "if", "no", "not", "vs", "into",
    "over", "than", "then", "your", "you", "we", "our", "their", "some", "any", "all", "each",
];

const MIN_TOKEN_CHARS: usize = 3;

/// Derive a label for each cluster id present in `assignments`.
///
/// `assignments`, `titles`, and `topics` are parallel per-conversation
/// slices. Returns a map of cluster id to label.
pub fn label_clusters(
    assignments: &[usize],
    titles: &[String],
    topics: &[Vec<String>],
) -> HashMap<usize, String> {
    let mut cluster_titles: HashMap<usize, Vec<&str>> = HashMap::new();
    let mut cluster_topics: HashMap<usize, Vec<&str>> = HashMap::new();

    for (idx, &cluster) in assignments.iter().enumerate() {
        if let Some(title) = titles.get(idx) {
            if !title.is_empty() {
                cluster_titles.entry(cluster).or_default().push(title);
            }
        }
        if let Some(conversation_topics) = topics.get(idx) {
            cluster_topics
                .entry(cluster)
                .or_default()
                .extend(conversation_topics.iter().map(String::as_str));
        }
    }

    let mut labels = HashMap::new();
    let mut cluster_ids: Vec<usize> = assignments.to_vec();
    cluster_ids.sort_unstable();
    cluster_ids.dedup();

    for cluster in cluster_ids {
        // Strategy 1: theme words from titles
        if let Some(titles_for_cluster) = cluster_titles.get(&cluster) {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for title in titles_for_cluster {
                for token in tokenize(title) {
                    *counts.entry(token).or_insert(0) += 1;
                }
            }
            if let Some(label) = top_two_label(&counts) {
                labels.insert(cluster, label);
                continue;
            }
        }

        // Strategy 2: topic tags
        if let Some(topics_for_cluster) = cluster_topics.get(&cluster) {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for topic in topics_for_cluster {
                let lowered = topic.trim().to_lowercase();
                if !lowered.is_empty() {
                    *counts.entry(lowered).or_insert(0) += 1;
                }
            }
            if let Some(label) = top_two_label(&counts) {
                labels.insert(cluster, label);
                continue;
            }
        }

        labels.insert(cluster, format!("Cluster {}", cluster));
    }

    labels
}

/// Lower-case, split on whitespace and hyphens, strip punctuation, drop
/// stop words and short tokens.
fn tokenize(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .replace('-', " ")
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| ".,!?()[]{}\"':#".contains(c)).to_string())
        .filter(|w| w.chars().count() >= MIN_TOKEN_CHARS && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// "Top1 & Top2" title-cased, ties broken lexically. `None` when no tokens.
fn top_two_label(counts: &HashMap<String, usize>) -> Option<String> {
    if counts.is_empty() {
        return None;
    }

    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let top: Vec<String> = ranked.iter().take(2).map(|(w, _)| title_case(w)).collect();
    Some(top.join(" & "))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_noise() {
        let tokens = tokenize("How to fix the Borrow-Checker error?");
        assert_eq!(tokens, vec!["fix", "borrow", "checker", "error"]);
    }

    #[test]
    fn test_title_words_win() {
        let assignments = vec![0, 0, 0];
        let titles = vec![
            "Rust borrow checker".to_string(),
            "Rust lifetimes explained".to_string(),
            "Rust async borrow".to_string(),
        ];
        let topics = vec![vec![], vec![], vec![]];

        let labels = label_clusters(&assignments, &titles, &topics);
        assert_eq!(labels[&0], "Rust & Borrow");
    }

    #[test]
    fn test_tie_breaks_lexically() {
        let assignments = vec![0];
        let titles = vec!["zebra alpha".to_string()];
        let topics = vec![vec![]];

        // Both tokens appear once; lexical order decides
        let labels = label_clusters(&assignments, &titles, &topics);
        assert_eq!(labels[&0], "Alpha & Zebra");
    }

    #[test]
    fn test_topic_fallback() {
        let assignments = vec![0, 0];
        // Titles made entirely of stop words / short tokens yield nothing
        let titles = vec!["how to do it".to_string(), "why me".to_string()];
        let topics = vec![
            vec!["cooking".to_string(), "pasta".to_string()],
            vec!["cooking".to_string()],
        ];

        let labels = label_clusters(&assignments, &titles, &topics);
        assert_eq!(labels[&0], "Cooking & Pasta");
    }

    #[test]
    fn test_numbered_fallback() {
        let assignments = vec![0, 1];
        let titles = vec!["it".to_string(), "so".to_string()];
        let topics = vec![vec![], vec![]];

        let labels = label_clusters(&assignments, &titles, &topics);
        assert_eq!(labels[&0], "Cluster 0");
        assert_eq!(labels[&1], "Cluster 1");
    }

    #[test]
    fn test_single_token_label() {
        let assignments = vec![0];
        let titles = vec!["kubernetes".to_string()];
        let topics = vec![vec![]];

        let labels = label_clusters(&assignments, &titles, &topics);
        assert_eq!(labels[&0], "Kubernetes");
    }

    #[test]
    fn test_clusters_labelled_independently() {
        let assignments = vec![0, 1];
        let titles = vec!["rust programming".to_string(), "sourdough baking".to_string()];
        let topics = vec![vec![], vec![]];

        let labels = label_clusters(&assignments, &titles, &topics);
        assert_eq!(labels[&0], "Programming & Rust");
        assert_eq!(labels[&1], "Baking & Sourdough");
    }
}
