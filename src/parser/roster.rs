use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::urlescape_relative;

static DATA_ROW_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table.dxgvTable > tbody > tr.dxgvDataRow, table.dxgvTable > tr.dxgvDataRow")
        .unwrap()
});
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Parsed search-results page. Rows are only walked when `member_links` is consumed.
pub struct RosterPage {
    doc: Html,
}

impl RosterPage {
    pub fn parse(html: &str) -> Self {
        RosterPage {
            doc: Html::parse_document(html),
        }
    }

    /// Member profile links from the first column of each data row, in page order.
    /// Header/pager rows and rows without a link are skipped; a page without
    /// the grid yields nothing.
    pub fn member_links<'a>(&'a self, base: &'a Url) -> impl Iterator<Item = Url> + 'a {
        self.doc.select(&DATA_ROW_SEL).filter_map(move |row| {
            let href = first_cell(row)?
                .select(&LINK_SEL)
                .next()?
                .value()
                .attr("href")?;
            match urlescape_relative(base, href) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Skipping roster link: {}", e);
                    None
                }
            }
        })
    }
}

/// All member links on a roster page. The page is parsed and its rows walked
/// up front, so the returned iterator owns its links and outlives `html`.
/// `RosterPage::member_links` is the on-demand form.
pub fn extract_member_links(html: &str, base: &Url) -> impl Iterator<Item = Url> + 'static {
    let page = RosterPage::parse(html);
    let links: Vec<Url> = page.member_links(base).collect();
    debug!("Roster page lists {} members", links.len());
    links.into_iter()
}

fn first_cell(row: ElementRef) -> Option<ElementRef> {
    row.children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == "td")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse(
            "http://www.arkleg.state.ar.us/assembly/2013/2013R/Pages/LegislatorSearchResults.aspx?member=&committee=All&chamber=",
        )
        .unwrap()
    }

    #[test]
    fn fixture_rows_in_order() {
        let html = std::fs::read_to_string("tests/fixtures/roster.html").unwrap();
        let links: Vec<Url> = extract_member_links(&html, &base()).collect();
        assert_eq!(links.len(), 3);
        assert_eq!(
            links[0].as_str(),
            "http://www.arkleg.state.ar.us/assembly/2013/2013R/Pages/MemberProfile.aspx?member=Doe"
        );
        assert!(links[1].as_str().ends_with("member=Smith"));
        assert!(links[2].as_str().ends_with("member=Lee%20Green"));
    }

    #[test]
    fn no_table_is_empty() {
        let html = "<html><body><p>Nothing here</p></body></html>";
        assert_eq!(extract_member_links(html, &base()).count(), 0);
    }

    #[test]
    fn table_without_data_rows_is_empty() {
        let html = r#"<table class="dxgvTable"><tr class="dxgvHeader"><td><a href="x">Name</a></td></tr></table>"#;
        assert_eq!(extract_member_links(html, &base()).count(), 0);
    }

    #[test]
    fn only_first_column_link() {
        let html = r#"<table class="dxgvTable">
            <tr class="dxgvDataRow_Aqua dxgvDataRow"><td><a href="/a">A</a></td><td><a href="/b">B</a></td></tr>
            <tr class="dxgvDataRow"><td>no link</td><td><a href="/c">C</a></td></tr>
        </table>"#;
        let links: Vec<Url> = extract_member_links(html, &base()).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].path(), "/a");
    }

    #[test]
    fn other_tables_ignored() {
        let html = r#"<table class="layout"><tr class="dxgvDataRow"><td><a href="/x">X</a></td></tr></table>"#;
        assert_eq!(extract_member_links(html, &base()).count(), 0);
    }

    #[test]
    fn extracted_links_outlive_html() {
        let mut links = {
            let html = String::from(r#"<table class="dxgvTable"><tr class="dxgvDataRow"><td><a href="/m?id=2">M</a></td></tr></table>"#);
            extract_member_links(&html, &base())
        };
        assert_eq!(links.next().map(|u| u.path().to_string()).as_deref(), Some("/m"));
        assert!(links.next().is_none());
    }

    #[test]
    fn lazy_iterator_borrows_page() {
        let page = RosterPage::parse(r#"<table class="dxgvTable"><tr class="dxgvDataRow"><td><a href="/m?id=1">M</a></td></tr></table>"#);
        let base = base();
        let mut links = page.member_links(&base);
        assert_eq!(links.next().map(|u| u.query().map(str::to_string)), Some(Some("id=1".to_string())));
        assert!(links.next().is_none());
    }
}
