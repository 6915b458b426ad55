use scraper::{Html, Node};

use crate::normalize::collapse_whitespace;

const HIDDEN: [&str; 4] = ["script", "style", "noscript", "template"];

/// Visible text of an HTML document, whitespace-collapsed.
///
/// Text nodes are joined with a space so adjacent block elements never glue
/// their words together. Malformed markup is parsed leniently, never fails.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => HIDDEN.contains(&el.name()),
            _ => false,
        });
        if !hidden {
            parts.push(&**text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}
