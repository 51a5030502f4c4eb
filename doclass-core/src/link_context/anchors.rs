use crate::tokenizer::tokenize;
use crate::types::TokenSet;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, BTreeSet};

// Compile-time constant selector; parse() only fails on invalid CSS.
static HREF_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[href]").unwrap());

/// Tokens of the link text pointing at each target URL.
///
/// Every element carrying an `href` equal to a target (exact string match
/// after entity decoding) contributes the tokens of its full descendant
/// text. Targets with no matching element are absent from the result.
pub fn anchor_tokens(html: &str, targets: &BTreeSet<String>) -> BTreeMap<String, TokenSet> {
    let document = Html::parse_document(html);
    let mut found: BTreeMap<String, TokenSet> = BTreeMap::new();

    for element in document.select(&HREF_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !targets.contains(href) {
            continue;
        }
        let text: String = element.text().collect();
        found
            .entry(href.to_string())
            .or_default()
            .extend(tokenize(&text));
    }

    found
}

/// Single-target form of [`anchor_tokens`].
pub fn link_text_tokens(html: &str, document_url: &str) -> TokenSet {
    let targets = BTreeSet::from([document_url.to_string()]);
    anchor_tokens(html, &targets)
        .remove(document_url)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "https://x.org/docs/agenda.pdf";

    #[test]
    fn test_matching_anchor_text_is_tokenized() {
        let html = r#"<html><body>
            <a href="https://x.org/docs/agenda.pdf">March Agenda</a>
            <a href="https://x.org/docs/minutes.pdf">March Minutes</a>
        </body></html>"#;
        let tokens = link_text_tokens(html, DOC);
        assert_eq!(tokens, TokenSet::from(["agenda".to_string(), "march".to_string()]));
    }

    #[test]
    fn test_href_match_is_exact() {
        let html = r#"<a href="/docs/agenda.pdf">Relative</a>
            <a href="https://x.org/docs/agenda.pdf?v=2">Query</a>
            <a href="HTTPS://x.org/docs/agenda.pdf">Case</a>"#;
        assert!(link_text_tokens(html, DOC).is_empty());
    }

    #[test]
    fn test_nested_text_and_multiple_anchors_union() {
        let html = r#"<ul>
            <li><a href="https://x.org/docs/agenda.pdf"><b>Council</b> Agenda (PDF)</a></li>
            <li><a href="https://x.org/docs/agenda.pdf">Download agenda</a></li>
        </ul>"#;
        let tokens = link_text_tokens(html, DOC);
        let expected: TokenSet = ["agenda", "council", "download", "pdf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_entities_in_href_are_decoded_before_matching() {
        let html = r#"<a href="https://x.org/get?id=1&amp;type=pdf">Annual Report</a>"#;
        let tokens = link_text_tokens(html, "https://x.org/get?id=1&type=pdf");
        assert!(tokens.contains("annual"));
    }

    #[test]
    fn test_non_anchor_href_elements_count() {
        let html = r#"<area href="https://x.org/docs/agenda.pdf" alt="map"><link href="https://x.org/docs/agenda.pdf">"#;
        // Elements without text contribute nothing but do not break matching
        assert!(link_text_tokens(html, DOC).is_empty());

        let html = r#"<span href="https://x.org/docs/agenda.pdf">Board Notice</span>"#;
        assert!(link_text_tokens(html, DOC).contains("notice"));
    }

    #[test]
    fn test_several_targets_in_one_pass() {
        let html = r#"<a href="https://x.org/a.pdf">Alpha</a><a href="https://x.org/b.pdf">Beta</a>"#;
        let targets = BTreeSet::from([
            "https://x.org/a.pdf".to_string(),
            "https://x.org/b.pdf".to_string(),
            "https://x.org/c.pdf".to_string(),
        ]);
        let found = anchor_tokens(html, &targets);
        assert_eq!(found.len(), 2);
        assert!(found["https://x.org/a.pdf"].contains("alpha"));
        assert!(found["https://x.org/b.pdf"].contains("beta"));
    }

    #[test]
    fn test_malformed_html_is_tolerated() {
        let html = r#"<div><a href="https://x.org/docs/agenda.pdf">Budget <i>Memo</a"#;
        let tokens = link_text_tokens(html, DOC);
        assert!(tokens.contains("budget"));
    }
}
