pub mod info_table;
pub mod member;
pub mod party;
pub mod roster;

use scraper::ElementRef;
use url::Url;

use crate::fetch::FetchedPage;
use crate::legislator::Chamber;
use member::ParsedMember;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No name line (td.SiteNames) on member page {url}")]
    MissingNameLine { url: String },
    #[error("Unknown party ({marker}) for {name}")]
    UnknownParty { marker: String, name: String },
    #[error("Invalid url '{url}': {source}")]
    BadUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Member page → record (or drop). Pure; logging happens inside.
pub fn process_page(
    page: &FetchedPage,
    term: &str,
    default_chamber: Chamber,
) -> Result<ParsedMember, ParseError> {
    member::parse_member(&page.html, page.url.as_str(), default_chamber, term)
}

/// Percent-escape a link so it is safe to fetch. Spaces and other unsafe
/// bytes in the path and query are encoded; `:/?&=` and existing escapes
/// are kept.
pub fn urlescape(url: &str) -> Result<Url, ParseError> {
    Url::parse(url.trim()).map_err(|source| ParseError::BadUrl {
        url: url.to_string(),
        source,
    })
}

/// Escape `href`, resolving it against `base` when it is relative.
pub fn urlescape_relative(base: &Url, href: &str) -> Result<Url, ParseError> {
    base.join(href.trim()).map_err(|source| ParseError::BadUrl {
        url: href.to_string(),
        source,
    })
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_spaces_in_path_and_query() {
        let url = urlescape("http://www.arkleg.state.ar.us/assembly/2013/2013R/Pages/MemberProfile.aspx?member=J. Doe").unwrap();
        assert_eq!(
            url.as_str(),
            "http://www.arkleg.state.ar.us/assembly/2013/2013R/Pages/MemberProfile.aspx?member=J.%20Doe"
        );
    }

    #[test]
    fn keeps_existing_escapes() {
        let url = urlescape("http://example.com/a%20b?x=1&y=2").unwrap();
        assert_eq!(url.as_str(), "http://example.com/a%20b?x=1&y=2");
    }

    #[test]
    fn resolves_relative_links() {
        let base = Url::parse("http://example.com/assembly/2013/2013R/Pages/LegislatorSearchResults.aspx").unwrap();
        let url = urlescape_relative(&base, "MemberProfile.aspx?member=Amy Lee").unwrap();
        assert_eq!(
            url.as_str(),
            "http://example.com/assembly/2013/2013R/Pages/MemberProfile.aspx?member=Amy%20Lee"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(urlescape("not a url"), Err(ParseError::BadUrl { .. })));
    }

    #[test]
    fn whitespace_normalized() {
        assert_eq!(normalize_whitespace("  Jane\u{a0}Q.\n Doe "), "Jane Q. Doe");
    }
}
