use crate::consts;

/// An internal `[[target|text]]` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WikiLink<'a> {
    /// The complete markup, brackets included.
    pub raw: &'a str,
    pub target: &'a str,
    pub text: Option<&'a str>,
}
impl<'a> WikiLink<'a> {
    /// What a reader sees: the piped text if there is one, otherwise the target.
    pub fn display(&self) -> &'a str {
        self.text.unwrap_or(self.target)
    }
}

/// An external link, either `[url label]` or a bare URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalLink<'a> {
    pub raw: &'a str,
    pub url: &'a str,
    pub label: Option<&'a str>,
}

/// All wiki-links in `text`, in order of appearance.
pub fn wikilinks(text: &str) -> Vec<WikiLink<'_>> {
    consts::WIKILINK_REGEX
        .captures_iter(text)
        .filter_map(|captures| {
            Some(WikiLink {
                raw: captures.get(0)?.as_str(),
                target: captures.get(1)?.as_str().trim(),
                text: captures.get(2).map(|m| m.as_str().trim()),
            })
        })
        .collect()
}

/// All external links in `text`, in order of appearance.
pub fn external_links(text: &str) -> Vec<ExternalLink<'_>> {
    consts::EXTERNAL_LINK_REGEX
        .captures_iter(text)
        .filter_map(|captures| {
            let raw = captures.get(0)?.as_str();
            if let Some(url) = captures.get(1) {
                let label = captures.get(2).map(|m| m.as_str().trim()).filter(|label| !label.is_empty());
                Some(ExternalLink { raw, url: url.as_str(), label })
            } else {
                Some(ExternalLink { raw, url: captures.get(3)?.as_str(), label: None })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("[[iOS 10.1 beta 1]]", "iOS 10.1 beta 1", None)]
    #[case("[[N104AP|iPhone12,1]]", "N104AP", Some("iPhone12,1"))]
    #[case("[[ Telluride 18A5301v (iPhone12,1) | iPhone12,1 ]]", "Telluride 18A5301v (iPhone12,1)", Some("iPhone12,1"))]
    fn test_wikilink_parts(#[case] markup: &str, #[case] target: &str, #[case] text: Option<&str>) {
        let links = wikilinks(markup);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].raw, markup);
        assert_eq!(links[0].target, target);
        assert_eq!(links[0].text, text);
    }

    #[test]
    fn test_display_prefers_text() {
        let links = wikilinks("[[N104AP|iPhone12,1]] and [[iPhone12,3]]<ref>[[Footnote]]</ref>");
        let displayed: Vec<_> = links.iter().map(WikiLink::display).collect();
        assert_eq!(displayed, vec!["iPhone12,1", "iPhone12,3", "Footnote"]);
    }

    #[test]
    fn test_external_links_in_order() {
        let text = "[http://example/a.ipsw a] then https://example/b.ipsw and [https://example/c.zip]";
        let links = external_links(text);
        let urls: Vec<_> = links.iter().map(|link| link.url).collect();
        assert_eq!(urls, vec!["http://example/a.ipsw", "https://example/b.ipsw", "https://example/c.zip"]);
        assert_eq!(links[0].label, Some("a"));
        assert_eq!(links[1].label, None);
        assert_eq!(links[2].label, None);
    }

    #[test]
    fn test_no_external_links() {
        assert!(external_links("5,432,100,000 [[iPhone12,1]]").is_empty());
    }
}
