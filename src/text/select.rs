use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use super::normalize;
use crate::config::SelectorSettings;

static CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main, article, section, div").unwrap());

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "svg"];

/// Pick the densest text blocks out of raw page markup.
///
/// Short blocks are navigation or boilerplate; only containers whose visible
/// text is longer than `min_chars` are ranked. Never fails: markup with no
/// qualifying block yields an empty string and the caller keeps its own
/// description.
pub fn select_main_text(raw_markup: &str, settings: &SelectorSettings) -> String {
    if raw_markup.trim().is_empty() {
        return String::new();
    }
    let document = Html::parse_document(raw_markup);

    let mut chunks: Vec<(usize, String)> = document
        .select(&CONTAINER_SEL)
        .filter(|el| !inside_hidden(el))
        .take(settings.max_candidates)
        .filter_map(|el| {
            let text = visible_text(el);
            let len = text.chars().count();
            (len > settings.min_chars).then_some((len, text))
        })
        .collect();

    // stable: equal lengths keep document order
    chunks.sort_by(|a, b| b.0.cmp(&a.0));
    let joined = chunks
        .into_iter()
        .take(settings.top_k)
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join(" ");

    normalize(&joined).chars().take(settings.max_chars).collect()
}

/// Text nodes under `el`, trimmed and space-joined, skipping non-visible subtrees.
pub fn visible_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(el, &mut parts);
    parts.join(" ")
}

fn collect_text<'a>(el: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    parts.push(t);
                }
            }
            Node::Element(e) if HIDDEN_TAGS.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, parts);
                }
            }
            _ => {}
        }
    }
}

fn inside_hidden(el: &ElementRef<'_>) -> bool {
    el.ancestors().any(|node| match node.value() {
        Node::Element(e) => HIDDEN_TAGS.contains(&e.name()),
        _ => false,
    })
}
