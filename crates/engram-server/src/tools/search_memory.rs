//! search_memory tool
//!
//! Semantic search over the corpus, formatted as a text block. When a
//! relevance gate is configured every result is judged per item; gate
//! failures allow the item through, and a tally of suppressed results is
//! appended.

use engram_core::retrieval::SearchParams;
use engram_core::SearchResultItem;
use serde::Deserialize;
use serde_json::Value;

use crate::state::AppState;

/// Default result count for the tool surface.
const DEFAULT_LIMIT: usize = 5;

/// Preview length in characters.
const PREVIEW_CHARS: usize = 300;

/// Input schema for the search_memory tool
pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query to find relevant chat history"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of results to return",
                "default": 5,
                "minimum": 1,
                "maximum": 25
            }
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
struct SearchMemoryArgs {
    query: String,
    limit: Option<usize>,
}

pub async fn execute(state: &AppState, args: Option<Value>) -> Result<String, String> {
    let args: SearchMemoryArgs = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {e}"))?,
        None => return Err("Missing arguments".to_string()),
    };

    if args.query.trim().is_empty() {
        return Err("Query cannot be empty".to_string());
    }
    let limit = args.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 25);

    let outcome = state
        .retrieval
        .search(SearchParams {
            limit,
            ..SearchParams::new(args.query.clone())
        })
        .await
        .map_err(|e| e.to_string())?;

    // Optional per-item relevance gating; the gate fails open
    let mut kept: Vec<&SearchResultItem> = Vec::with_capacity(outcome.results.len());
    let mut suppressed = 0usize;
    match &state.gate {
        Some(gate) => {
            for item in &outcome.results {
                let summary = item.summary.as_deref().unwrap_or("");
                if gate.allows(&outcome.query, &item.title, summary).await {
                    kept.push(item);
                } else {
                    suppressed += 1;
                }
            }
        }
        None => kept.extend(outcome.results.iter()),
    }

    if kept.is_empty() {
        let mut text = format!(
            "No relevant conversations found for '{}'.",
            outcome.query
        );
        if suppressed > 0 {
            text.push_str(&format!(
                "\n({suppressed} result(s) suppressed by the relevance gate)"
            ));
        }
        return Ok(text);
    }

    let mut blocks: Vec<String> = Vec::with_capacity(kept.len());
    for (rank, item) in kept.iter().enumerate() {
        blocks.push(format_result(rank + 1, item));
    }

    let mut text = format!(
        "Found {} relevant conversation(s) in {:.0}ms:\n\n{}",
        kept.len(),
        outcome.search_time_ms,
        blocks.join("\n\n")
    );
    if suppressed > 0 {
        text.push_str(&format!(
            "\n\n({suppressed} result(s) suppressed by the relevance gate)"
        ));
    }

    Ok(text)
}

fn format_result(rank: usize, item: &SearchResultItem) -> String {
    // Snippets carry document newlines; previews stay on one line
    let preview: String = item
        .snippet
        .replace('\n', " ")
        .chars()
        .take(PREVIEW_CHARS)
        .collect();
    format!(
        "{rank}. [score {score:.2}] {title}\n   ID: {id}\n   Summary: {summary}\n   Topics: {topics}\n   Cluster: {cluster}\n   Messages: {count}\n   Preview: {preview}",
        rank = rank,
        score = item.score,
        title = item.title,
        id = item.conversation_id,
        summary = item.summary.as_deref().unwrap_or("No summary available"),
        topics = if item.topics.is_empty() {
            "none".to_string()
        } else {
            item.topics.join(", ")
        },
        cluster = item.cluster_label.as_deref().unwrap_or("Unclustered"),
        count = item.message_count,
        preview = preview,
    )
}
