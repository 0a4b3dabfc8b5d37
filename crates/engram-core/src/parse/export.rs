//! Generic transcript parser.
//!
//! Accepts the common export shape: conversation containers (class
//! `conversation` or a `data-conversation` attribute) holding message
//! elements annotated with `data-role`. A document with message elements
//! but no containers is treated as a single conversation.

use scraper::{ElementRef, Html, Selector};

use crate::types::{ParsedConversation, ParsedMessage};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Parse every conversation found in the document.
///
/// Conversations with zero messages are kept; the pipeline reports them as
/// per-item failures rather than silently dropping them.
pub fn parse_all(html: &str) -> Vec<ParsedConversation> {
    let document = Html::parse_document(html);
    let container_selector = selector(".conversation, [data-conversation]");
    let message_selector = selector("[data-role]");

    let containers: Vec<ElementRef<'_>> = document.select(&container_selector).collect();

    if containers.is_empty() {
        // No containers: the whole document is one conversation, if it has
        // any messages at all.
        let messages = collect_messages(document.select(&message_selector));
        if messages.is_empty() {
            return vec![];
        }
        return vec![ParsedConversation {
            title: document_title(&document),
            timestamp: None,
            messages,
        }];
    }

    containers
        .into_iter()
        .map(|container| ParsedConversation {
            title: container_title(&container),
            timestamp: container.value().attr("data-timestamp").map(String::from),
            messages: collect_messages(container.select(&message_selector)),
        })
        .collect()
}

fn collect_messages<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Vec<ParsedMessage> {
    elements
        .filter_map(|el| {
            let role = el.value().attr("data-role")?.to_string();
            let content: String = el.text().collect::<Vec<_>>().join(" ");
            Some(ParsedMessage { role, content })
        })
        .collect()
}

fn container_title(container: &ElementRef<'_>) -> Option<String> {
    if let Some(title) = container.value().attr("data-title") {
        return Some(title.to_string());
    }

    let heading_selector = selector("h1, h2, h3");
    container
        .select(&heading_selector)
        .next()
        .map(|heading| heading.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|title| !title.is_empty())
}

fn document_title(document: &Html) -> Option<String> {
    let title_selector = selector("title");
    document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}
