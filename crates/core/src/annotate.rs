//! Copy host-internal citation URLs onto marker attributes.
//!
//! Block markup is re-parsed before rendering, which loses anything the host
//! keeps only in component state. Markers whose URLs the resolver can read
//! get them written into [`CITATION_URLS_ATTR`] first.

use std::cell::Cell;

use crate::host::{CitationUrlResolver, MarkerContext};
use crate::profile::CITATION_URLS_ATTR;

/// Annotate every marker in one block's markup.
///
/// Markers that already carry the attribute are left alone. A selector
/// `lol_html` cannot parse is skipped, and on a rewriter error the markup is
/// returned unchanged.
pub fn annotate_markers(
    html: &str, marker_selectors: &[String], block_index: usize, block_key: Option<&str>,
    resolver: &dyn CitationUrlResolver,
) -> String {
    let counter = Cell::new(0usize);
    let ordinal = &counter;
    let selectors: Vec<&String> = marker_selectors
        .iter()
        .filter(|selector| match selector.parse::<lol_html::Selector>() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("skipping marker selector {:?}: {}", selector, e);
                false
            }
        })
        .collect();
    if selectors.is_empty() {
        return html.to_string();
    }

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: selectors
                .iter()
                .map(move |selector| {
                    lol_html::element!(selector.as_str(), move |el| {
                        let current = ordinal.get();
                        ordinal.set(current + 1);

                        if el.get_attribute(CITATION_URLS_ATTR).is_none() {
                            let marker = MarkerContext { block_index, block_key, ordinal: current };
                            if let Some(urls) = resolver.resolve(&marker)
                                && !urls.is_empty()
                            {
                                el.set_attribute(CITATION_URLS_ATTR, &urls.join(" ")).ok();
                            }
                        }
                        Ok(())
                    })
                })
                .collect(),
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoInternalState;
    use crate::parse::Document;

    struct SecondMarkerOnly;

    impl CitationUrlResolver for SecondMarkerOnly {
        fn resolve(&self, marker: &MarkerContext<'_>) -> Option<Vec<String>> {
            (marker.ordinal == 1 && marker.block_key == Some("t2")).then(|| {
                vec!["https://a.example/".to_string(), "https://b.example/".to_string()]
            })
        }
    }

    fn markers() -> Vec<String> {
        vec!["a.citation".to_string(), "span.citation".to_string()]
    }

    #[test]
    fn test_resolved_marker_gets_attribute() {
        let html = r#"<p>One<a class="citation" href="https://x.example/">x</a> two<span class="citation">y+1</span></p>"#;
        let out = annotate_markers(html, &markers(), 1, Some("t2"), &SecondMarkerOnly);

        let doc = Document::fragment(&out);
        let spans = doc.select_str("span.citation").unwrap();
        assert_eq!(spans[0].attr(CITATION_URLS_ATTR), Some("https://a.example/ https://b.example/"));
        let links = doc.select_str("a.citation").unwrap();
        assert_eq!(links[0].attr(CITATION_URLS_ATTR), None);
    }

    #[test]
    fn test_existing_attribute_kept() {
        let html = r#"<a class="citation">a</a><a class="citation" data-citation-urls="https://keep.example/">b</a>"#;
        let out = annotate_markers(html, &markers(), 0, Some("t2"), &SecondMarkerOnly);
        assert!(out.contains(r#"data-citation-urls="https://keep.example/""#));
        assert!(!out.contains("https://a.example/"));
    }

    #[test]
    fn test_no_internal_state_is_identity() {
        let html = r#"<p>Text<a class="citation" href="https://x.example/">x</a></p>"#;
        assert_eq!(annotate_markers(html, &markers(), 0, None, &NoInternalState), html);
    }

    #[test]
    fn test_unparseable_selectors_skipped() {
        let html = "<p>Text</p>";
        let out = annotate_markers(html, &["[[bad".to_string()], 0, None, &SecondMarkerOnly);
        assert_eq!(out, html);
    }
}
